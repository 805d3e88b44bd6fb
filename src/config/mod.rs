//! Configuration module
//!
//! Loading and validation of funnel configuration files: timings, counter
//! seeds, the social proof name pool, and collaborator endpoints.

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{ConfigLoader, LoadResult, LoadWarning, LoaderOptions};
pub use schema::*;
pub use validation::{MAX_DURATION, ValidationResult, Validator};
