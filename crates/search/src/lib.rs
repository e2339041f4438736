//! Web search for ZooGent.
//!
//! - [`GoogleSearch`]: a [`SearchBackend`](zoogent_core::SearchBackend) over
//!   the Google Custom Search JSON API
//! - [`DomainSearch`]: runs one query across a domain allowlist and returns a
//!   title-deduplicated [`CandidateSet`](zoogent_core::CandidateSet)

pub mod domain;
pub mod google;

pub use domain::{DomainFailurePolicy, DomainSearch};
pub use google::{GoogleSearch, site_restricted_query};
