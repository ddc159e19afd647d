//! Normalization of raw feed payloads into the canonical [`Paper`] shape.
//!
//! arXiv exposes the same papers through two very different wire formats: the
//! Atom query feed (used by the windowed fetcher) and the OAI-PMH ListRecords
//! feed (used by the incremental harvester). Rather than two record
//! hierarchies, each format gets one pure conversion function and a tagged
//! [`RawRecord`] dispatches between them.
//!
//! Both conversions are total over garbage input: a malformed entry yields
//! `None` and is skipped by the caller, so one bad entry can never abort a
//! batch. Only the *top-level* response failing to parse is an error, and
//! that is raised by the clients, not here.

use lazy_static::lazy_static;
use regex::Regex;

use super::*;
use crate::clients::{atom, oai};

lazy_static! {
  /// Matches new-style ids inside an abs URL, e.g. ".../abs/2501.01234v2".
  /// Old-style ids (math.AG/0601001) deliberately don't match and the entry
  /// is skipped; the polling feed no longer emits them for current papers.
  static ref ABS_ID: Regex = Regex::new(r"/abs/(\d{4}\.\d{4,5})(v(\d+))?").unwrap();
}

/// A raw record from one of the two upstream dialects, awaiting conversion.
#[derive(Debug)]
pub enum RawRecord<'a> {
  /// An Atom `<entry>` from the windowed query feed, together with the
  /// recency cutoff to apply (`None` disables window filtering, as for
  /// fetch-by-id requests).
  Windowed {
    /// The deserialized entry
    entry:  &'a atom::Entry,
    /// Drop entries whose published *and* updated timestamps predate this
    cutoff: Option<DateTime<Utc>>,
  },
  /// An OAI-PMH `<record>` from the incremental feed.
  Incremental {
    /// The deserialized record
    record: &'a oai::Record,
  },
}

/// Converts a raw record into a canonical [`Paper`].
///
/// Returns `None` when the record should be skipped: unparseable id, outside
/// the recency window, or flagged deleted upstream. Skipping is silent by
/// design; the feeds routinely contain entries we don't ingest.
pub fn normalize(raw: RawRecord<'_>) -> Option<Paper> {
  match raw {
    RawRecord::Windowed { entry, cutoff } => windowed(entry, cutoff),
    RawRecord::Incremental { record } => incremental(record),
  }
}

/// Collapses all interior whitespace runs to single spaces and trims.
///
/// Atom titles and abstracts arrive with hard line wraps and indentation.
fn collapse_whitespace(s: &str) -> String {
  s.split_whitespace().collect::<Vec<&str>>().join(" ")
}

/// Dialect A: one Atom entry from the windowed query feed.
fn windowed(entry: &atom::Entry, cutoff: Option<DateTime<Utc>>) -> Option<Paper> {
  let caps = ABS_ID.captures(entry.id.as_deref().unwrap_or_default())?;
  let arxiv_id = caps.get(1)?.as_str().to_string();
  let version = caps.get(3).and_then(|m| m.as_str().parse::<i64>().ok()).unwrap_or(1);

  let published = entry.published.as_deref().and_then(announce::parse_utc);
  let updated = entry.updated.as_deref().and_then(announce::parse_utc);
  if let Some(cutoff) = cutoff {
    // Include when either timestamp is on-or-after the cutoff; an entry with
    // no parseable timestamp at all is excluded.
    let in_window =
      published.is_some_and(|t| t >= cutoff) || updated.is_some_and(|t| t >= cutoff);
    if !in_window {
      debug!("Dropping {arxiv_id}v{version}: outside recency window");
      return None;
    }
  }

  let title = collapse_whitespace(entry.title.as_deref().unwrap_or_default());
  let abstract_text = collapse_whitespace(entry.summary.as_deref().unwrap_or_default());
  let categories: Vec<String> =
    entry.categories.iter().filter_map(|c| c.term.clone()).collect();
  let authors = entry
    .authors
    .iter()
    .filter_map(|a| a.name.as_deref())
    .collect::<Vec<&str>>()
    .join(", ");

  let mut link_pdf = None;
  let mut link_abs = None;
  for link in &entry.links {
    match link.rel.as_deref() {
      Some("alternate") => link_abs = link.href.clone(),
      Some("related") if link.kind.as_deref().unwrap_or_default().ends_with("pdf") =>
        link_pdf = link.href.clone(),
      _ => {},
    }
  }

  Some(Paper::from_ingest(
    arxiv_id,
    version,
    title,
    authors,
    abstract_text,
    categories,
    published.map(|t| t.to_rfc3339()),
    updated.map(|t| t.to_rfc3339()),
    link_pdf,
    link_abs,
  ))
}

/// Dialect B: one OAI-PMH record from the incremental feed.
fn incremental(record: &oai::Record) -> Option<Paper> {
  let header = record.header.as_ref()?;
  if header.status.as_deref() == Some("deleted") {
    // Deletions are dropped outright, not tombstoned.
    return None;
  }

  // Identifier like "oai:arXiv.org:2501.01234"; keep the suffix.
  let identifier = header.identifier.as_deref().unwrap_or_default().trim();
  if identifier.is_empty() {
    return None;
  }
  let arxiv_id = identifier.rsplit(':').next()?.to_string();

  let meta = record.metadata.as_ref()?.arxiv.as_ref()?;

  let mut versions: Vec<(i64, String)> = Vec::new();
  if let Some(history) = &meta.versions {
    for v in &history.versions {
      let number = v
        .label
        .as_deref()
        .and_then(|label| label.strip_prefix('v'))
        .and_then(|digits| digits.parse::<i64>().ok())
        .unwrap_or(0);
      versions.push((number, v.date.clone().unwrap_or_default()));
    }
  }
  versions.sort_by_key(|(number, _)| *number);

  let version = versions.iter().map(|(number, _)| *number).max().unwrap_or(1);
  let created = meta.created.clone().filter(|s| !s.is_empty());
  let datestamp = header.datestamp.clone().filter(|s| !s.is_empty());
  let (submitted_at, updated_at) = match (versions.first(), versions.last()) {
    (Some((_, earliest)), Some((_, latest))) => (
      Some(earliest.clone()).filter(|s| !s.is_empty()).or(created),
      Some(latest.clone()).filter(|s| !s.is_empty()).or(datestamp),
    ),
    _ => (created, datestamp),
  };

  let categories: Vec<String> = meta
    .categories
    .as_deref()
    .unwrap_or_default()
    .split_whitespace()
    .map(str::to_string)
    .collect();

  let mut author_names: Vec<String> = Vec::new();
  if let Some(list) = &meta.authors {
    for author in &list.authors {
      let full = author.name.as_deref().unwrap_or_default().trim();
      let name = if full.is_empty() {
        format!(
          "{} {}",
          author.forenames.as_deref().unwrap_or_default().trim(),
          author.keyname.as_deref().unwrap_or_default().trim()
        )
        .trim()
        .to_string()
      } else {
        full.to_string()
      };
      if !name.is_empty() {
        author_names.push(name);
      }
    }
  }

  Some(Paper::from_ingest(
    arxiv_id,
    version,
    collapse_whitespace(meta.title.as_deref().unwrap_or_default()),
    author_names.join(", "),
    collapse_whitespace(meta.abstract_text.as_deref().unwrap_or_default()),
    categories,
    submitted_at,
    updated_at,
    None,
    None,
  ))
}
