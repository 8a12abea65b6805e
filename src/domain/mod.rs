pub mod audit;
pub mod catalog;
pub mod errors;
pub mod lending;
pub mod notification;
pub mod preferences;
pub mod users;
pub mod value_objects;

pub use audit::*;
pub use errors::*;
pub use value_objects::*;
