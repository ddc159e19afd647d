//! Client for the arXiv OAI-PMH feed (the incremental harvest path).
//!
//! This client drives `verb=ListRecords` pagination over a date range for one
//! category set: the first request carries the range parameters, every
//! follow-up carries only the resumption token handed back by the server,
//! with a polite fixed delay in between. Pagination state lives entirely in
//! memory for the duration of one [`OaiClient::harvest`] call; resumption
//! across process restarts happens at whole-pass granularity via the
//! checkpoint store, not mid-page.
//!
//! The overall call is cancellable: the inter-page delay is a plain
//! `tokio::time::sleep`, so wrapping `harvest` in `tokio::time::timeout`
//! caps the whole pass.

use std::time::Duration as StdDuration;

use super::*;
use crate::normalize::{normalize, RawRecord};

/// Endpoint of the arXiv OAI-PMH interface.
const OAI_BASE: &str = "https://oaipmh.arxiv.org/oai";

/// Delay between continuation pages, per arXiv's politeness guidance.
const PAGE_DELAY: StdDuration = StdDuration::from_secs(3);

/// Root response structure for the OAI-PMH protocol.
#[derive(Debug, Deserialize)]
pub struct OaiResponse {
  /// The record list, when the request succeeded
  #[serde(rename = "ListRecords")]
  pub list_records: Option<ListRecords>,
  /// Error details, if the request failed at the protocol level
  pub error:        Option<OaiError>,
}

/// Error information from the OAI-PMH response.
#[derive(Debug, Deserialize)]
pub struct OaiError {
  /// Standard OAI-PMH error code
  #[serde(rename = "@code")]
  pub code:    String,
  /// Human-readable error message
  #[serde(rename = "$text")]
  pub message: Option<String>,
}

/// Payload of a `ListRecords` response: one page of records plus an optional
/// continuation token.
#[derive(Debug, Deserialize)]
pub struct ListRecords {
  /// Records of this page
  #[serde(rename = "record", default)]
  pub records:          Vec<Record>,
  /// Continuation token; absent or empty means this was the last page
  #[serde(rename = "resumptionToken")]
  pub resumption_token: Option<ResumptionToken>,
}

/// The `<resumptionToken>` element; an empty body means "no more pages".
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ResumptionToken {
  /// The opaque token value
  #[serde(rename = "$text")]
  pub value: Option<String>,
}

/// One `<record>` of the feed, deserialized leniently.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Record {
  /// Record header: identifier, datestamp, deletion status
  pub header:   Option<RecordHeader>,
  /// Metadata block wrapping the arXiv-specific element
  pub metadata: Option<RecordMetadata>,
}

/// The `<header>` of a record.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RecordHeader {
  /// "deleted" marks a record withdrawn upstream
  #[serde(rename = "@status")]
  pub status:     Option<String>,
  /// Composite identifier, e.g. "oai:arXiv.org:2501.01234"
  pub identifier: Option<String>,
  /// Date this record last changed on the server
  pub datestamp:  Option<String>,
}

/// The `<metadata>` wrapper around the arXiv-specific element.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RecordMetadata {
  /// The arXiv metadata element
  #[serde(rename = "arXiv")]
  pub arxiv: Option<ArxivMetadata>,
}

/// The arXiv-specific metadata of one record.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ArxivMetadata {
  /// Paper title
  pub title:         Option<String>,
  /// Paper abstract
  #[serde(rename = "abstract")]
  pub abstract_text: Option<String>,
  /// Author list
  pub authors:       Option<AuthorList>,
  /// Whitespace-separated category tokens
  pub categories:    Option<String>,
  /// Date the first version was created
  pub created:       Option<String>,
  /// Version history
  pub versions:      Option<VersionList>,
}

/// The `<authors>` container.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct AuthorList {
  /// Individual author entries
  #[serde(rename = "author")]
  pub authors: Vec<OaiAuthor>,
}

/// One `<author>` entry; carries either a full name or given/family parts.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OaiAuthor {
  /// Full display name, preferred when present
  pub name:      Option<String>,
  /// Family name
  pub keyname:   Option<String>,
  /// Given name(s)
  pub forenames: Option<String>,
}

/// The `<versions>` container.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct VersionList {
  /// Individual version entries, typically in submission order
  #[serde(rename = "version")]
  pub versions: Vec<OaiVersion>,
}

/// One `<version>` entry of the version history.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct OaiVersion {
  /// Version label like "v2"
  #[serde(rename = "@version")]
  pub label: Option<String>,
  /// Date this version was submitted
  pub date:  Option<String>,
}

/// Client for the arXiv OAI-PMH ListRecords feed.
///
/// # Examples
///
/// ```no_run
/// use arxnews::clients::OaiClient;
/// use chrono::NaiveDate;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = OaiClient::new();
/// let since = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
/// let until = NaiveDate::from_ymd_opt(2025, 1, 7).unwrap();
/// let papers = client.harvest("cs.CV", since, until).await?;
/// println!("Harvested {} papers", papers.len());
/// # Ok(())
/// # }
/// ```
pub struct OaiClient {
  /// Internal web client used to connect to the API.
  client:     reqwest::Client,
  /// The base URL to use for the client.
  base_url:   String,
  /// Delay inserted between continuation pages.
  page_delay: StdDuration,
}

impl OaiClient {
  /// Creates a new client against the public arXiv OAI endpoint.
  pub fn new() -> Self { Self::with_base_url(OAI_BASE) }

  /// Creates a client against an alternative endpoint, mainly for tests.
  pub fn with_base_url(base_url: impl Into<String>) -> Self {
    Self { client: reqwest::Client::new(), base_url: base_url.into(), page_delay: PAGE_DELAY }
  }

  /// Overrides the inter-page politeness delay.
  pub fn with_page_delay(mut self, delay: StdDuration) -> Self {
    self.page_delay = delay;
    self
  }

  /// Harvests one category over a date range, following resumption tokens
  /// until the server stops returning one.
  ///
  /// `since` and `until` are date-only to match arXiv's datestamp
  /// granularity; the coarse range tolerates upstream clock skew and
  /// re-covers same-day revisions. All pages are concatenated and returned
  /// in feed order.
  ///
  /// # Errors
  ///
  /// A transport failure or protocol error on *any* page fails the whole
  /// call; the caller's checkpoint must not advance in that case (see
  /// [`crate::harvest::run_category`]). A `noRecordsMatch` protocol reply is
  /// an empty harvest, not an error.
  pub async fn harvest(
    &self,
    category: &str,
    since: NaiveDate,
    until: NaiveDate,
  ) -> Result<Vec<Paper>, ArxnewsError> {
    let set_spec = format!("cs:{}", category.replace('.', ":"));
    let mut params: Vec<(String, String)> = vec![
      ("verb".to_string(), "ListRecords".to_string()),
      ("metadataPrefix".to_string(), "arXiv".to_string()),
      ("set".to_string(), set_spec),
      ("from".to_string(), since.to_string()),
      ("until".to_string(), until.to_string()),
    ];

    let mut all = Vec::new();
    let mut page = 0u32;
    loop {
      page += 1;
      let (mut rows, token) = self.list_records(&params).await?;
      all.append(&mut rows);
      info!("OAI {category}: fetched page {page}, total={}", all.len());
      match token {
        Some(token) => {
          // Follow-up requests carry only the token.
          params = vec![
            ("verb".to_string(), "ListRecords".to_string()),
            ("resumptionToken".to_string(), token),
          ];
          tokio::time::sleep(self.page_delay).await;
        },
        None => break,
      }
    }
    Ok(all)
  }

  /// Issues one ListRecords request and parses the page.
  ///
  /// Returns the page's normalized papers and the continuation token, if
  /// the server returned a non-empty one.
  async fn list_records(
    &self,
    params: &[(String, String)],
  ) -> Result<(Vec<Paper>, Option<String>), ArxnewsError> {
    debug!("OAI request params: {params:?}");
    let response =
      self.client.get(&self.base_url).query(params).send().await?.error_for_status()?;
    let text = response.text().await?;

    let parsed: OaiResponse = from_str(&text)
      .map_err(|e| ArxnewsError::Api(format!("failed to parse OAI response: {e}")))?;

    if let Some(error) = parsed.error {
      // An empty window is a normal outcome, not a failed pass.
      if error.code == "noRecordsMatch" {
        return Ok((Vec::new(), None));
      }
      return Err(ArxnewsError::Api(format!(
        "OAI error {}: {}",
        error.code,
        error.message.unwrap_or_default()
      )));
    }

    let list = parsed
      .list_records
      .ok_or_else(|| ArxnewsError::Api("OAI response missing ListRecords".to_string()))?;

    let papers: Vec<Paper> = list
      .records
      .iter()
      .filter_map(|record| normalize(RawRecord::Incremental { record }))
      .collect();

    let token = list
      .resumption_token
      .and_then(|t| t.value)
      .map(|s| s.trim().to_string())
      .filter(|s| !s.is_empty());

    Ok((papers, token))
  }
}

impl Default for OaiClient {
  fn default() -> Self { Self::new() }
}
