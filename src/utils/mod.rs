// Shared utilities

pub mod service_error;

pub use service_error::{ErrorResponse, GenerationError};
