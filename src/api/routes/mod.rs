//! API Routes
//!
//! Route handlers organized by functionality.

pub mod datasets;
pub mod health;
pub mod query;
