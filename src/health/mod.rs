//! Health classification of finished requests.
//!
//! # Data Flow
//! ```text
//! final response status
//!     → classify.rs (status range checks)
//!     → HealthFlags { error, throttle, fault }
//!     → copied onto the request segment before close
//! ```
//!
//! # Design Decisions
//! - 4xx are errors (client side), 5xx are faults (server side)
//! - 429 is both an error and a throttle
//! - Pure function, no configuration

pub mod classify;

pub use classify::{classify, HealthFlags};
