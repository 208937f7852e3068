pub mod metrics;
pub mod runtime;
