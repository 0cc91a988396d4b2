//! State module for tracking indexing progress
//!
//! # Components
//!
//! - `SiteStatus`: lifecycle of one site job (indexing, indexed, failed)
//! - `IndexingStatus`: process-wide running/stopped flag

mod indexing_status;
mod site_status;

pub use indexing_status::IndexingStatus;
pub use site_status::SiteStatus;
