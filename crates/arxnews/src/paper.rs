//! Canonical paper record and workflow types.
//!
//! Every component of the pipeline produces or consumes [`Paper`]: the
//! normalizer emits it, the store persists it, and the digest/ranking helpers
//! read it back. One `Paper` is one *version* of one arXiv submission; the
//! natural key `(arxiv_id, version)` is unique in the store.
//!
//! Fields split into two groups with different ownership:
//! - **Ingestion fields** (title, abstract, authors, categories, timestamps,
//!   links) are overwritten wholesale whenever the same key is re-ingested.
//! - **Workflow fields** ([`Paper::state`], [`Paper::tags`], [`Paper::extra`])
//!   belong to the reader and survive re-ingestion untouched.

use std::str::FromStr;

use super::*;

/// Triage state of a paper in the reading workflow.
///
/// New papers always enter as [`PaperState::Triage`]; the other states are
/// only ever set by explicit user action and are never touched by ingestion.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaperState {
  /// Freshly ingested, not yet looked at
  Triage,
  /// Marked as worth reading
  Shortlist,
  /// Seen and set aside
  Archived,
  /// Seen and suppressed from listings
  Hidden,
}

impl std::fmt::Display for PaperState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      PaperState::Triage => write!(f, "triage"),
      PaperState::Shortlist => write!(f, "shortlist"),
      PaperState::Archived => write!(f, "archived"),
      PaperState::Hidden => write!(f, "hidden"),
    }
  }
}

impl FromStr for PaperState {
  type Err = ArxnewsError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match &s.to_lowercase() as &str {
      "triage" => Ok(PaperState::Triage),
      "shortlist" => Ok(PaperState::Shortlist),
      "archived" => Ok(PaperState::Archived),
      "hidden" => Ok(PaperState::Hidden),
      s => Err(ArxnewsError::InvalidState(s.to_owned())),
    }
  }
}

/// One version of one arXiv paper in canonical form.
///
/// # Examples
///
/// ```no_run
/// use arxnews::clients::atom::ArxivClient;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let cats = vec!["cs.CV".to_string()];
/// let papers = ArxivClient::new().fetch_window(&cats, 1, 200).await?;
/// for paper in &papers {
///   println!("{} v{}: {}", paper.arxiv_id, paper.version, paper.title);
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paper {
  /// Stable arXiv identifier, independent of revision (e.g. "2501.01234")
  pub arxiv_id:         String,
  /// Revision counter for this identifier, starting at 1
  pub version:          i64,
  /// The paper's title, whitespace-collapsed
  pub title:            String,
  /// Display form of the author list, joined with ", "
  pub authors:          String,
  /// The paper's abstract, whitespace-collapsed
  pub abstract_text:    String,
  /// Category tokens in feed order (e.g. \["cs.CV", "cs.LG"\])
  pub categories:       Vec<String>,
  /// First of [`Paper::categories`], or "unknown" when the feed gave none
  pub primary_category: String,
  /// ISO-8601 UTC submission timestamp, when the feed provided one
  pub submitted_at:     Option<String>,
  /// ISO-8601 UTC last-update timestamp, when the feed provided one
  pub updated_at:       Option<String>,
  /// URL of the PDF rendering (synthesized when the feed omits it)
  pub link_pdf:         String,
  /// URL of the abstract page (synthesized when the feed omits it)
  pub link_abs:         String,
  /// URL of the ar5iv HTML rendering, always synthesized from the id
  pub link_html:        String,
  /// Open key-value bag for user notes; never touched by ingestion
  pub extra:            serde_json::Value,
  /// User tags; never touched by ingestion
  pub tags:             Vec<String>,
  /// Workflow state; never touched by ingestion
  pub state:            PaperState,
}

impl Paper {
  /// Builds a fresh record from ingestion fields, with workflow fields at
  /// their defaults. Both normalizer dialects funnel through this.
  #[allow(clippy::too_many_arguments)]
  pub(crate) fn from_ingest(
    arxiv_id: String,
    version: i64,
    title: String,
    authors: String,
    abstract_text: String,
    categories: Vec<String>,
    submitted_at: Option<String>,
    updated_at: Option<String>,
    link_pdf: Option<String>,
    link_abs: Option<String>,
  ) -> Self {
    let primary_category =
      categories.first().cloned().unwrap_or_else(|| "unknown".to_string());
    let link_pdf =
      link_pdf.unwrap_or_else(|| format!("https://arxiv.org/pdf/{arxiv_id}.pdf"));
    let link_abs = link_abs.unwrap_or_else(|| format!("https://arxiv.org/abs/{arxiv_id}"));
    let link_html = format!("https://ar5iv.org/html/{arxiv_id}");
    Self {
      arxiv_id,
      version,
      title,
      authors,
      abstract_text,
      categories,
      primary_category,
      submitted_at,
      updated_at,
      link_pdf,
      link_abs,
      link_html,
      extra: serde_json::Value::Object(serde_json::Map::new()),
      tags: Vec::new(),
      state: PaperState::Triage,
    }
  }

  /// The public announcement date of this paper, computed on read from
  /// [`Paper::submitted_at`]. See [`crate::announce::announced_date`].
  pub fn announced_date(&self) -> Option<String> {
    announce::announced_date(self.submitted_at.as_deref())
  }
}
