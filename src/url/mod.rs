//! URL handling module for Ripple-Crawl
//!
//! This module provides URL normalization (the dedup key) and domain
//! extraction (the pacing key).

mod domain;
mod normalize;

// Re-export main functions
pub use domain::{domain_of, extract_domain};
pub use normalize::normalize_url;
