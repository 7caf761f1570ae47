#![deny(missing_docs)]

//! # geode-core: Foundational Types for geode
//!
//! The domain vocabulary shared by every geode crate. It has no internal
//! crate dependencies: only `serde`, `thiserror`, `chrono`, and `uuid`
//! from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** A [`UserId`] is not a bare
//!    `Uuid`; it can only be obtained through validated construction, so a
//!    nil identifier never reaches the store.
//!
//! 2. **One position per user.** [`GeoPosition`] is the whole stored state
//!    for a user. There is no history type and no version counter.
//!
//! 3. **Structured errors.** [`ValidationError`] is built with `thiserror`;
//!    no `.unwrap()` outside tests.

pub mod error;
pub mod identity;
pub mod position;

pub use error::ValidationError;
pub use identity::UserId;
pub use position::{Coordinates, GeoPosition};
