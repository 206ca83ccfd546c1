// Middleware modules for the edge gateway

pub mod session_guard;

pub use session_guard::{session_guard_middleware, GuardOutcome, GuardSettings, SessionGuard};
