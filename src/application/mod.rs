pub mod catalog;
pub mod dependencies;
pub mod errors;
pub mod lending;
mod lookup;
pub mod membership;
pub mod notifications;
pub mod result;
pub mod validation;

pub use dependencies::{LendingPolicy, ServiceDependencies};
pub use errors::{ApplicationError, FailureKind};
pub use result::OperationResult;
