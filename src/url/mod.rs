//! URL handling module for Shelf-Mapper
//!
//! This module provides URL normalization (used for seed checking and the
//! optional seen-URL set) and resolution of relative links found on pages.

mod normalize;

pub use normalize::{normalize_url, resolve_link};
