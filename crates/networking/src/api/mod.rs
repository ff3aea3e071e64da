//! High-level API wrappers for the rewards backend
//!
//! Convenience functions around the raw HTTP client, adding input
//! validation and the degraded-mode defaults the UI layer expects.

pub mod rewards;
pub mod session;

pub use rewards::*;
pub use session::*;
