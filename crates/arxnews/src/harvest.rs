//! Ingestion orchestration: wiring the feed clients to the store.
//!
//! The clients in [`crate::clients`] are pure transforms; this module owns
//! persistence and the checkpoint discipline. The key property is in
//! [`run_category`]: the watermark for a category advances only after a
//! harvest pass finishes without transport error, so a failed or cancelled
//! pass is retried over the same range on the next run. At-least-once,
//! never at-most-once.

use super::*;
use crate::{
  clients::{ArxivClient, OaiClient},
  database::Database,
};

/// Caller-supplied ingestion parameters.
///
/// The library reads no ambient configuration; whoever invokes ingestion
/// decides categories, window, and bounds and passes them in explicitly.
#[derive(Debug, Clone)]
pub struct IngestOptions {
  /// Categories to ingest, e.g. \["cs.CV", "cs.LG"\]
  pub categories:       Vec<String>,
  /// Recency window in days for the windowed fetch
  pub window_days:      i64,
  /// Upper bound on entries returned by one windowed fetch
  pub max_results:      u32,
  /// Fallback range in days for a category with no recorded checkpoint
  pub oai_default_days: i64,
}

impl Default for IngestOptions {
  fn default() -> Self {
    Self {
      categories:       vec!["cs.CV".to_string(), "cs.LG".to_string(), "cs.RO".to_string()],
      window_days:      1,
      max_results:      200,
      oai_default_days: 3,
    }
  }
}

/// Fetches the recent window for all configured categories and upserts the
/// result. Returns the number of records ingested.
pub async fn ingest_window(
  db: &Database,
  client: &ArxivClient,
  options: &IngestOptions,
) -> Result<usize, ArxnewsError> {
  let papers =
    client.fetch_window(&options.categories, options.window_days, options.max_results).await?;
  db.upsert_papers(&papers).await?;
  Ok(papers.len())
}

/// Fetches one specific paper by id and upserts it (all versions the feed
/// returns for that id). Returns the number of records ingested.
pub async fn ingest_by_id(
  db: &Database,
  client: &ArxivClient,
  arxiv_id: &str,
) -> Result<usize, ArxnewsError> {
  let papers = client.fetch_by_ids(&[arxiv_id.to_string()]).await?;
  db.upsert_papers(&papers).await?;
  Ok(papers.len())
}

/// Runs one checkpointed harvest pass for a single category.
///
/// The range starts at the stored watermark (or `now - oai_default_days`
/// when none exists) and ends at today's UTC date. On success, even with
/// zero records, the watermark advances to the end of the range; on a
/// transport error the watermark is left untouched and the error
/// propagates, so the next invocation retries the same range.
pub async fn run_category(
  db: &Database,
  client: &OaiClient,
  category: &str,
  default_days: i64,
) -> Result<usize, ArxnewsError> {
  let until = Utc::now().date_naive();
  let fallback = until - Duration::days(default_days);
  let since = match db.get_checkpoint(category).await? {
    Some(datestamp) =>
      NaiveDate::parse_from_str(&datestamp, "%Y-%m-%d").unwrap_or(fallback),
    None => fallback,
  };

  info!("OAI harvest start: category={category} from={since} until={until}");
  let papers = client.harvest(category, since, until).await?;

  let count = papers.len();
  db.upsert_papers(&papers).await?;
  db.set_checkpoint(category, &until.to_string()).await?;
  info!("OAI harvest done: category={category} ingested={count} watermark={until}");
  Ok(count)
}

/// Runs checkpointed harvest passes for every configured category, one at a
/// time. Returns the total number of records ingested.
///
/// Categories are processed sequentially; a failure in one category stops
/// the run and leaves later categories (and the failed category's
/// watermark) for the next invocation.
pub async fn ingest_oai(
  db: &Database,
  client: &OaiClient,
  options: &IngestOptions,
) -> Result<usize, ArxnewsError> {
  let mut total = 0;
  for category in &options.categories {
    total += run_category(db, client, category, options.oai_default_days).await?;
  }
  Ok(total)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_default_options_match_shipped_config() {
    let options = IngestOptions::default();
    assert_eq!(options.categories, vec!["cs.CV", "cs.LG", "cs.RO"]);
    assert_eq!(options.window_days, 1);
    assert_eq!(options.max_results, 200);
    assert_eq!(options.oai_default_days, 3);
  }
}
