// Public modules
pub mod error;
pub mod regen;

// Public modules for CLI access
pub mod defaults;
pub mod paths;

// Re-export common types for convenience
pub use error::{Error, ErrorCode, Result};
