pub mod runtime;
pub mod validation;

pub use runtime::{Runtime, RuntimeError};
pub use validation::{Violation, Violations};
