// Named counters and document codes
pub mod counter;

// Quote and order records
pub mod document;

// Domain-specific error types
pub mod errors;

// Repository traits
pub mod repositories;
