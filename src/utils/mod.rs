// Utility modules for the edge gateway

pub mod service_error;

pub use service_error::EdgeError;
