//! # Middleware Modules
//!
//! Wrappers composed around the router, outermost first:
//!
//! ```text
//! request_log → cors → Router
//! ```

pub mod cors;
pub mod request_log;
