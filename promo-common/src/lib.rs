//! # Promo Common Library
//!
//! Shared code for the promotion allocation workspace including:
//! - Typed data model (candidates, vendor caps, allocations, campaigns)
//! - Record store contract and its in-memory / JSON snapshot implementations
//! - Configuration loading
//! - Utility functions

pub mod config;
pub mod error;
pub mod models;
pub mod store;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use models::{
    Allocation, Campaign, Candidate, CandidateId, Platform, VendorCaps, VendorId, ZeroCapPolicy,
};
