pub mod error;
pub mod memory;
pub mod postgres;
mod staging;

pub use error::StoreError;
