//! Clients for the two arXiv publication feeds.
//!
//! Both clients are pure transport-plus-normalization: they turn one network
//! exchange into a batch of canonical [`Paper`]s and never touch the store.
//! Persistence is the caller's job (see [`crate::harvest`]).
//!
//! - [`atom`] - the windowed query feed: one bounded page, sorted by
//!   submission date, filtered to a recency window.
//! - [`oai`] - the OAI-PMH incremental feed: resumption-token pagination over
//!   a date range, suitable for checkpointed harvesting.
//!
//! Error policy is shared: a transport failure or malformed top-level
//! response fails the whole call; a malformed individual entry is skipped by
//! the normalizer and the batch continues.

use quick_xml::de::from_str;

pub mod atom;
pub mod oai;

pub use atom::ArxivClient;
pub use oai::OaiClient;

use super::*;
