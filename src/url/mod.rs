//! URL handling module for Site-Indexer
//!
//! This module provides URL normalization and the site scope that decides
//! which discovered links belong to a site and how they are keyed.

mod normalize;
mod scope;

pub use normalize::{normalize_parsed, normalize_site_root, normalize_url};
pub use scope::{ScopedUrl, SiteScope};
