// Wiring from configuration to services
pub mod bootstrap;

// Legacy code migration
pub mod backfill;

// Sequential COT-/ORD- codes
pub mod code_generator;

// Quote and order creation
pub mod documents;
