// Delivery diagnostics — counters and rates for a pipeline session.

pub mod stats;

pub use stats::{DiagnosticSnapshot, DiagnosticStats};
