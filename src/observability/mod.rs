//! Observability module providing structured logging initialization.

mod tracing_init;

pub use tracing_init::init_tracing;
