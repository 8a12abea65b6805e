pub mod handlers;
pub mod response;
pub mod router;
pub mod types;

pub use handlers::AppState;
pub use response::ApiResponse;
pub use router::create_router;
