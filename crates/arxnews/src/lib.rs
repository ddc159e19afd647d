//! A library for harvesting arXiv announcements into a local triage store.
//!
//! arxnews pulls bibliographic records from arXiv's two publication feeds,
//! normalizes them into one canonical [`paper::Paper`] shape, and upserts
//! them into a SQLite store keyed by `(arxiv_id, version)`:
//!
//! - the **windowed fetch** ([`clients::ArxivClient`]) polls the Atom query
//!   feed for a recency window, and
//! - the **incremental harvest** ([`clients::OaiClient`] driven by
//!   [`harvest::run_category`]) walks the OAI-PMH feed with resumption
//!   tokens and per-category checkpoints, so interrupted runs resume
//!   without gaps.
//!
//! On top of the store sit small read-side helpers: the announcement-date
//! schedule ([`announce`]), BM25 relevance ranking ([`rank`]), and daily
//! digest rendering ([`digest`]).
//!
//! # Example
//! ```rust,no_run
//! use arxnews::{clients::ArxivClient, database::Database, harvest};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!   let db = Database::open(Database::default_path()).await?;
//!   let options = harvest::IngestOptions::default();
//!   let count = harvest::ingest_window(&db, &ArxivClient::new(), &options).await?;
//!   println!("Ingested {count} papers");
//!
//!   Ok(())
//! }
//! ```

#![warn(missing_docs, clippy::missing_docs_in_private_items)]

use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

pub mod announce;
pub mod clients;
pub mod database;
pub mod digest;
pub mod errors;
pub mod harvest;
pub mod normalize;
pub mod paper;
pub mod rank;

use errors::ArxnewsError;
use paper::{Paper, PaperState};
