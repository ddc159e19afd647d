//! Client for the arXiv Atom query feed (the "windowed" fetch path).
//!
//! This client performs a single bounded query against arXiv's Atom API
//! (https://export.arxiv.org/api/query) for a boolean OR of categories,
//! sorted by submission date descending, and normalizes each entry through
//! [`crate::normalize`]. There is no pagination: one page of at most
//! `max_results` entries, filtered to a recency window on the caller's side
//! of the wire.
//!
//! # Examples
//!
//! ```no_run
//! use arxnews::clients::ArxivClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ArxivClient::new();
//! let cats = vec!["cs.CV".to_string(), "cs.LG".to_string()];
//! let papers = client.fetch_window(&cats, 1, 200).await?;
//! println!("Fetched {} papers", papers.len());
//! # Ok(())
//! # }
//! ```

use super::*;
use crate::normalize::{normalize, RawRecord};

/// Query endpoint of the arXiv Atom API.
const ATOM_BASE: &str = "https://export.arxiv.org/api/query";

/// Top-level Atom feed response.
#[derive(Debug, Deserialize)]
pub struct Feed {
  /// Entries of the feed; absent entirely for an empty result page
  #[serde(rename = "entry", default)]
  pub entries: Vec<Entry>,
}

/// One `<entry>` of the Atom feed, deserialized leniently.
///
/// Every field is optional so that a sparse or partially malformed entry
/// still deserializes; validation happens in the normalizer, which skips
/// entries it cannot use instead of failing the batch.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Entry {
  /// Absolute-URL identifier, e.g. "http://arxiv.org/abs/2501.01234v2"
  pub id:         Option<String>,
  /// Paper title (may contain hard line wraps)
  pub title:      Option<String>,
  /// Paper abstract (may contain hard line wraps)
  pub summary:    Option<String>,
  /// First-submission timestamp
  pub published:  Option<String>,
  /// Last-update timestamp
  pub updated:    Option<String>,
  /// Author elements, in feed order
  #[serde(rename = "author")]
  pub authors:    Vec<EntryAuthor>,
  /// Category elements, in feed order; the first is the primary category
  #[serde(rename = "category")]
  pub categories: Vec<EntryCategory>,
  /// Link elements; relations distinguish abstract page from PDF
  #[serde(rename = "link")]
  pub links:      Vec<EntryLink>,
}

/// An `<author>` element.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EntryAuthor {
  /// The author's display name
  pub name: Option<String>,
}

/// A `<category>` element; the token lives in the `term` attribute.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EntryCategory {
  /// Category token, e.g. "cs.CV"
  #[serde(rename = "@term")]
  pub term: Option<String>,
}

/// A `<link>` element.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct EntryLink {
  /// Target URL
  #[serde(rename = "@href")]
  pub href: Option<String>,
  /// Link relation: "alternate" is the abstract page, "related" the PDF
  #[serde(rename = "@rel")]
  pub rel:  Option<String>,
  /// MIME type; a "related" link ending in "pdf" is the PDF rendering
  #[serde(rename = "@type")]
  pub kind: Option<String>,
}

/// Client for the arXiv Atom query feed.
pub struct ArxivClient {
  /// Internal web client used to connect to the API.
  client:   reqwest::Client,
  /// The base URL to use for the client.
  base_url: String,
}

impl ArxivClient {
  /// Creates a new client against the public arXiv endpoint.
  pub fn new() -> Self { Self::with_base_url(ATOM_BASE) }

  /// Creates a client against an alternative endpoint, mainly for tests.
  pub fn with_base_url(base_url: impl Into<String>) -> Self {
    Self { client: reqwest::Client::new(), base_url: base_url.into() }
  }

  /// Fetches recent papers for a set of categories.
  ///
  /// Performs one query for the OR of `cats`, sorted by submission date
  /// descending and bounded by `max_results`, then keeps only entries whose
  /// published *or* updated timestamp falls within the last `days` days.
  ///
  /// # Errors
  ///
  /// A transport failure, non-success status, or unparseable top-level feed
  /// fails the whole call; no partial batch is returned. Malformed
  /// individual entries are skipped silently.
  pub async fn fetch_window(
    &self,
    cats: &[String],
    days: i64,
    max_results: u32,
  ) -> Result<Vec<Paper>, ArxnewsError> {
    let mut cat_query =
      cats.iter().map(|c| format!("cat:{c}")).collect::<Vec<String>>().join(" OR ");
    if cats.len() > 1 {
      // Parenthesize to be safe with operator precedence on the server.
      cat_query = format!("({cat_query})");
    }

    let cutoff = Utc::now() - Duration::days(days);
    debug!("Atom window query: {cat_query} cutoff={cutoff}");

    let feed = self
      .query(&[
        ("search_query", cat_query.as_str()),
        ("sortBy", "submittedDate"),
        ("sortOrder", "descending"),
        ("start", "0"),
        ("max_results", &max_results.to_string()),
      ])
      .await?;

    let total = feed.entries.len();
    let papers: Vec<Paper> = feed
      .entries
      .iter()
      .filter_map(|entry| normalize(RawRecord::Windowed { entry, cutoff: Some(cutoff) }))
      .collect();
    info!("Fetched {} entries from arXiv (total_seen={total}, window_days={days})", papers.len());
    Ok(papers)
  }

  /// Fetches specific papers by id, without any window filtering.
  ///
  /// Useful for targeted ingestion of a paper the window query has already
  /// rotated past. Unknown ids simply produce no entry.
  pub async fn fetch_by_ids(&self, ids: &[String]) -> Result<Vec<Paper>, ArxnewsError> {
    if ids.is_empty() {
      return Ok(Vec::new());
    }

    let id_list = ids.join(",");
    debug!("Atom id query: {id_list}");
    let feed = self.query(&[("id_list", id_list.as_str())]).await?;

    let papers: Vec<Paper> = feed
      .entries
      .iter()
      .filter_map(|entry| normalize(RawRecord::Windowed { entry, cutoff: None }))
      .collect();
    info!("Fetched {} entries by id from arXiv", papers.len());
    Ok(papers)
  }

  /// Issues one GET against the feed and parses the top-level response.
  async fn query(&self, params: &[(&str, &str)]) -> Result<Feed, ArxnewsError> {
    let response =
      self.client.get(&self.base_url).query(params).send().await?.error_for_status()?;
    let text = response.text().await?;
    from_str(&text).map_err(|e| ArxnewsError::Api(format!("failed to parse Atom feed: {e}")))
  }
}

impl Default for ArxivClient {
  fn default() -> Self { Self::new() }
}
