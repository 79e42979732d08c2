//! Token value types and the capability interface the lifecycle manager depends on.

pub mod authority;
pub mod secret;
pub mod validation;

pub use authority::*;
pub use secret::*;
pub use validation::*;
