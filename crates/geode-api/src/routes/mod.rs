//! # Route Modules
//!
//! | Method | Path       | Module            | Auth   |
//! |--------|------------|-------------------|--------|
//! | POST   | `/geo`     | [`geo`]           | Bearer |
//! | GET    | `/healthy` | [`health`]        | none   |

pub mod geo;
pub mod health;
