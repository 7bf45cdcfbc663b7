pub mod shared;
pub mod snapshot;

// Re-export the main types for easy access
pub use shared::*;
pub use snapshot::*;
