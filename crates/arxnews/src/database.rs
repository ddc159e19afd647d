//! SQLite-backed store for papers and harvest checkpoints.
//!
//! Two contracts live here. The **upsert/dedup store** keeps one row per
//! `(arxiv_id, version)`: re-ingesting a key overwrites every ingestion
//! column in place while leaving the workflow columns (`state`, `tags`,
//! `extra`) untouched, so overlapping harvests are safe no-ops on reader
//! state. The **checkpoint store** records, per category, the last date an
//! incremental harvest pass fully covered; callers advance it only after a
//! pass succeeds.
//!
//! The upsert relies on SQLite's native `ON CONFLICT ... DO UPDATE`, which
//! is atomic per row; no extra locking is needed even when harvesters for
//! different categories race on the store.

use std::{
  collections::BTreeSet,
  path::{Path, PathBuf},
  str::FromStr,
};

use rusqlite::{params, OptionalExtension};
use tokio_rusqlite::Connection;

use super::*;

/// Ingestion-facing column list, shared by every paper SELECT.
const PAPER_COLUMNS: &str = "arxiv_id, version, title, authors, abstract_text, categories, \
                             primary_category, submitted_at, updated_at, link_pdf, link_abs, \
                             link_html, extra, tags, state";

/// Database handle for arxnews
pub struct Database {
  /// Async handle to the underlying SQLite connection
  conn: Connection,
}

/// Maps one SELECTed row (in [`PAPER_COLUMNS`] order) back to a [`Paper`].
///
/// Reads are lenient: undecodable workflow columns fall back to their
/// defaults instead of poisoning the whole listing.
fn row_to_paper(row: &rusqlite::Row<'_>) -> rusqlite::Result<Paper> {
  let categories: String = row.get(5)?;
  let extra: String = row.get(12)?;
  let tags: String = row.get(13)?;
  let state: String = row.get(14)?;
  Ok(Paper {
    arxiv_id:         row.get(0)?,
    version:          row.get(1)?,
    title:            row.get(2)?,
    authors:          row.get(3)?,
    abstract_text:    row.get(4)?,
    categories:       categories.split(',').filter(|s| !s.is_empty()).map(str::to_string).collect(),
    primary_category: row.get(6)?,
    submitted_at:     row.get(7)?,
    updated_at:       row.get(8)?,
    link_pdf:         row.get(9)?,
    link_abs:         row.get(10)?,
    link_html:        row.get(11)?,
    extra:            serde_json::from_str(&extra)
      .unwrap_or_else(|_| serde_json::Value::Object(serde_json::Map::new())),
    tags:             serde_json::from_str(&tags).unwrap_or_default(),
    state:            PaperState::from_str(&state).unwrap_or(PaperState::Triage),
  })
}

impl Database {
  /// Open or create a database at the specified path
  pub async fn open(path: impl AsRef<Path>) -> Result<Self, ArxnewsError> {
    let conn = Connection::open(path.as_ref()).await?;

    // Initialize schema
    conn
      .call(|conn| {
        conn.execute_batch(include_str!(concat!(
          env!("CARGO_MANIFEST_DIR"),
          "/migrations/init.sql"
        )))?;
        Ok(())
      })
      .await?;

    Ok(Self { conn })
  }

  /// Get default database path in user's data directory
  pub fn default_path() -> PathBuf {
    dirs::data_dir().unwrap_or_else(|| PathBuf::from(".")).join("arxnews").join("arxnews.db")
  }

  /// Upserts a batch of papers keyed by `(arxiv_id, version)`.
  ///
  /// Existing rows get every ingestion column overwritten; `state`, `tags`,
  /// and `extra` keep whatever the reader set. New rows start with workflow
  /// defaults regardless of what the incoming record carries. The whole
  /// batch commits in one transaction; re-running the same batch is a
  /// no-op on stored state.
  ///
  /// Returns the number of records written.
  pub async fn upsert_papers(&self, papers: &[Paper]) -> Result<usize, ArxnewsError> {
    let papers = papers.to_vec();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        {
          let mut stmt = tx.prepare_cached(
            "INSERT INTO papers (
                            arxiv_id, version, title, authors, abstract_text,
                            categories, primary_category, submitted_at, updated_at,
                            link_pdf, link_abs, link_html
                        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                        ON CONFLICT(arxiv_id, version) DO UPDATE SET
                            title            = excluded.title,
                            authors          = excluded.authors,
                            abstract_text    = excluded.abstract_text,
                            categories       = excluded.categories,
                            primary_category = excluded.primary_category,
                            submitted_at     = excluded.submitted_at,
                            updated_at       = excluded.updated_at,
                            link_pdf         = excluded.link_pdf,
                            link_abs         = excluded.link_abs,
                            link_html        = excluded.link_html",
          )?;

          for paper in &papers {
            stmt.execute(params![
              &paper.arxiv_id,
              paper.version,
              &paper.title,
              &paper.authors,
              &paper.abstract_text,
              paper.categories.join(","),
              &paper.primary_category,
              &paper.submitted_at,
              &paper.updated_at,
              &paper.link_pdf,
              &paper.link_abs,
              &paper.link_html,
            ])?;
          }
        }
        tx.commit()?;
        Ok(papers.len())
      })
      .await
      .map_err(ArxnewsError::from)
  }

  /// Get a paper by its natural key
  pub async fn get_paper(
    &self,
    arxiv_id: &str,
    version: i64,
  ) -> Result<Option<Paper>, ArxnewsError> {
    let arxiv_id = arxiv_id.to_string();
    self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(&format!(
          "SELECT {PAPER_COLUMNS} FROM papers WHERE arxiv_id = ?1 AND version = ?2"
        ))?;
        let paper =
          stmt.query_row(params![arxiv_id, version], row_to_paper).optional()?;
        Ok(paper)
      })
      .await
      .map_err(ArxnewsError::from)
  }

  /// Lists papers, optionally filtered by state, newest id first then
  /// highest version first.
  pub async fn list_papers(
    &self,
    state: Option<PaperState>,
  ) -> Result<Vec<Paper>, ArxnewsError> {
    self
      .conn
      .call(move |conn| {
        let order = "ORDER BY arxiv_id DESC, version DESC";
        let papers = match state {
          Some(state) => {
            let mut stmt = conn.prepare_cached(&format!(
              "SELECT {PAPER_COLUMNS} FROM papers WHERE state = ?1 {order}"
            ))?;
            let rows = stmt.query_map([state.to_string()], row_to_paper)?;
            rows.collect::<Result<Vec<Paper>, _>>()?
          },
          None => {
            let mut stmt =
              conn.prepare_cached(&format!("SELECT {PAPER_COLUMNS} FROM papers {order}"))?;
            let rows = stmt.query_map([], row_to_paper)?;
            rows.collect::<Result<Vec<Paper>, _>>()?
          },
        };
        Ok(papers)
      })
      .await
      .map_err(ArxnewsError::from)
  }

  /// Total number of stored paper rows.
  pub async fn count_papers(&self) -> Result<i64, ArxnewsError> {
    self
      .conn
      .call(|conn| {
        let count = conn.query_row("SELECT COUNT(*) FROM papers", [], |row| row.get(0))?;
        Ok(count)
      })
      .await
      .map_err(ArxnewsError::from)
  }

  /// Search papers using FTS over title and abstract
  pub async fn search_papers(&self, query: &str) -> Result<Vec<Paper>, ArxnewsError> {
    let query = query.to_string();
    self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(&format!(
          "SELECT {} FROM papers p
                     JOIN papers_fts f ON p.id = f.rowid
                     WHERE papers_fts MATCH ?1
                     ORDER BY rank",
          PAPER_COLUMNS
            .split(", ")
            .map(|c| format!("p.{c}"))
            .collect::<Vec<String>>()
            .join(", ")
        ))?;
        let rows = stmt.query_map([query], row_to_paper)?;
        Ok(rows.collect::<Result<Vec<Paper>, _>>()?)
      })
      .await
      .map_err(ArxnewsError::from)
  }

  /// Sets the workflow state for every stored version of a paper.
  ///
  /// Returns the number of rows touched; zero means the paper is unknown.
  pub async fn set_state(
    &self,
    arxiv_id: &str,
    state: PaperState,
  ) -> Result<usize, ArxnewsError> {
    let arxiv_id = arxiv_id.to_string();
    self
      .conn
      .call(move |conn| {
        let count = conn.execute(
          "UPDATE papers SET state = ?1 WHERE arxiv_id = ?2",
          params![state.to_string(), arxiv_id],
        )?;
        Ok(count)
      })
      .await
      .map_err(ArxnewsError::from)
  }

  /// Adds and removes tags on every stored version of a paper, returning
  /// the resulting tag list (sorted, deduplicated).
  pub async fn update_tags(
    &self,
    arxiv_id: &str,
    add: &[String],
    remove: &[String],
  ) -> Result<Vec<String>, ArxnewsError> {
    let arxiv_id = arxiv_id.to_string();
    let add = add.to_vec();
    let remove = remove.to_vec();
    self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let stored: Option<String> = tx
          .prepare_cached(
            "SELECT tags FROM papers WHERE arxiv_id = ?1 ORDER BY version DESC LIMIT 1",
          )?
          .query_row([&arxiv_id], |row| row.get(0))
          .optional()?;

        let mut tags: BTreeSet<String> = stored
          .and_then(|s| serde_json::from_str::<Vec<String>>(&s).ok())
          .unwrap_or_default()
          .into_iter()
          .collect();
        for tag in add {
          let tag = tag.trim().to_string();
          if !tag.is_empty() {
            tags.insert(tag);
          }
        }
        for tag in remove {
          tags.remove(tag.trim());
        }

        let tags: Vec<String> = tags.into_iter().collect();
        let json = serde_json::to_string(&tags)
          .map_err(|e| tokio_rusqlite::Error::Other(Box::new(e)))?;
        tx.execute("UPDATE papers SET tags = ?1 WHERE arxiv_id = ?2", params![json, arxiv_id])?;
        tx.commit()?;
        Ok(tags)
      })
      .await
      .map_err(ArxnewsError::from)
  }

  /// Reads the harvest watermark for a category, if one has been recorded.
  pub async fn get_checkpoint(&self, category: &str) -> Result<Option<String>, ArxnewsError> {
    let category = category.to_string();
    self
      .conn
      .call(move |conn| {
        let datestamp = conn
          .prepare_cached("SELECT datestamp FROM checkpoints WHERE category = ?1")?
          .query_row([category], |row| row.get(0))
          .optional()?;
        Ok(datestamp)
      })
      .await
      .map_err(ArxnewsError::from)
  }

  /// Records the harvest watermark for a category.
  ///
  /// Callers must only invoke this after a harvest pass completed without
  /// transport error; a failed pass leaves the previous watermark in place
  /// so the next run re-covers the same range.
  pub async fn set_checkpoint(
    &self,
    category: &str,
    datestamp: &str,
  ) -> Result<(), ArxnewsError> {
    let category = category.to_string();
    let datestamp = datestamp.to_string();
    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO checkpoints (category, datestamp) VALUES (?1, ?2)
                     ON CONFLICT(category) DO UPDATE SET datestamp = excluded.datestamp",
          params![category, datestamp],
        )?;
        Ok(())
      })
      .await
      .map_err(ArxnewsError::from)
  }
}

#[cfg(test)]
mod tests {
  use tempfile::tempdir;
  use tracing_test::traced_test;

  use super::*;

  /// Helper function to create a test paper
  fn create_test_paper(arxiv_id: &str, version: i64) -> Paper {
    Paper::from_ingest(
      arxiv_id.to_string(),
      version,
      "Neural Harvesting at Scale".to_string(),
      "Ada Lovelace, Charles Babbage".to_string(),
      "We harvest feeds with neural networks.".to_string(),
      vec!["cs.CV".to_string(), "cs.LG".to_string()],
      Some("2025-01-03T12:00:00+00:00".to_string()),
      Some("2025-01-06T09:30:00+00:00".to_string()),
      None,
      None,
    )
  }

  /// Helper function to set up a test database
  async fn setup_test_db() -> (Database, tempfile::TempDir) {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let db = Database::open(&db_path).await.unwrap();
    (db, dir)
  }

  #[traced_test]
  #[tokio::test]
  async fn test_database_creation() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");

    let _db = Database::open(&db_path).await.unwrap();

    assert!(db_path.exists());
  }

  #[traced_test]
  #[tokio::test]
  async fn test_upsert_and_retrieve_paper() -> Result<(), ArxnewsError> {
    let (db, _dir) = setup_test_db().await;
    let paper = create_test_paper("2501.01234", 2);

    db.upsert_papers(std::slice::from_ref(&paper)).await?;

    let retrieved = db.get_paper("2501.01234", 2).await?.expect("Paper should exist");
    assert_eq!(retrieved.title, paper.title);
    assert_eq!(retrieved.authors, paper.authors);
    assert_eq!(retrieved.categories, paper.categories);
    assert_eq!(retrieved.primary_category, "cs.CV");
    assert_eq!(retrieved.submitted_at, paper.submitted_at);
    assert_eq!(retrieved.link_pdf, "https://arxiv.org/pdf/2501.01234.pdf");
    assert_eq!(retrieved.state, PaperState::Triage);
    assert!(retrieved.tags.is_empty());

    assert!(db.get_paper("2501.01234", 1).await?.is_none());
    Ok(())
  }

  #[traced_test]
  #[tokio::test]
  async fn test_upsert_is_idempotent() -> Result<(), ArxnewsError> {
    let (db, _dir) = setup_test_db().await;
    let batch = vec![create_test_paper("2501.01234", 1), create_test_paper("2501.05678", 1)];

    db.upsert_papers(&batch).await?;
    db.upsert_papers(&batch).await?;

    assert_eq!(db.count_papers().await?, 2);
    Ok(())
  }

  #[traced_test]
  #[tokio::test]
  async fn test_versions_are_distinct_rows() -> Result<(), ArxnewsError> {
    let (db, _dir) = setup_test_db().await;

    db.upsert_papers(&[create_test_paper("2501.01234", 1), create_test_paper("2501.01234", 2)])
      .await?;

    assert_eq!(db.count_papers().await?, 2);
    assert!(db.get_paper("2501.01234", 1).await?.is_some());
    assert!(db.get_paper("2501.01234", 2).await?.is_some());
    Ok(())
  }

  #[traced_test]
  #[tokio::test]
  async fn test_reingest_preserves_workflow_fields() -> Result<(), ArxnewsError> {
    let (db, _dir) = setup_test_db().await;
    db.upsert_papers(&[create_test_paper("2501.01234", 1)]).await?;

    db.set_state("2501.01234", PaperState::Shortlist).await?;
    db.update_tags("2501.01234", &["tracking".to_string()], &[]).await?;

    // Same key arrives again with a revised title.
    let mut revised = create_test_paper("2501.01234", 1);
    revised.title = "Neural Harvesting at Scale (revised)".to_string();
    db.upsert_papers(&[revised]).await?;

    let stored = db.get_paper("2501.01234", 1).await?.unwrap();
    assert_eq!(stored.title, "Neural Harvesting at Scale (revised)");
    assert_eq!(stored.state, PaperState::Shortlist);
    assert_eq!(stored.tags, vec!["tracking".to_string()]);
    Ok(())
  }

  #[traced_test]
  #[tokio::test]
  async fn test_list_ordering_and_state_filter() -> Result<(), ArxnewsError> {
    let (db, _dir) = setup_test_db().await;
    db.upsert_papers(&[
      create_test_paper("2501.01234", 1),
      create_test_paper("2501.01234", 2),
      create_test_paper("2501.09999", 1),
    ])
    .await?;
    db.set_state("2501.01234", PaperState::Archived).await?;

    let all = db.list_papers(None).await?;
    let keys: Vec<(String, i64)> =
      all.iter().map(|p| (p.arxiv_id.clone(), p.version)).collect();
    assert_eq!(keys, vec![
      ("2501.09999".to_string(), 1),
      ("2501.01234".to_string(), 2),
      ("2501.01234".to_string(), 1),
    ]);

    let archived = db.list_papers(Some(PaperState::Archived)).await?;
    assert_eq!(archived.len(), 2);
    assert!(archived.iter().all(|p| p.arxiv_id == "2501.01234"));
    Ok(())
  }

  #[traced_test]
  #[tokio::test]
  async fn test_full_text_search() -> Result<(), ArxnewsError> {
    let (db, _dir) = setup_test_db().await;

    let mut paper1 = create_test_paper("2501.00001", 1);
    paper1.title = "Neural Networks in Machine Learning".to_string();
    paper1.abstract_text = "This paper discusses deep learning".to_string();

    let mut paper2 = create_test_paper("2501.00002", 1);
    paper2.title = "Advanced Algorithms".to_string();
    paper2.abstract_text = "Classical computer science topics".to_string();

    db.upsert_papers(&[paper1, paper2]).await?;

    let results = db.search_papers("neural").await?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].arxiv_id, "2501.00001");

    let results = db.search_papers("algorithms").await?;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].arxiv_id, "2501.00002");
    Ok(())
  }

  #[traced_test]
  #[tokio::test]
  async fn test_update_tags_add_remove() -> Result<(), ArxnewsError> {
    let (db, _dir) = setup_test_db().await;
    db.upsert_papers(&[create_test_paper("2501.01234", 1)]).await?;

    let tags = db
      .update_tags("2501.01234", &["vision".to_string(), "  slam ".to_string()], &[])
      .await?;
    assert_eq!(tags, vec!["slam".to_string(), "vision".to_string()]);

    let tags = db.update_tags("2501.01234", &[], &["slam".to_string()]).await?;
    assert_eq!(tags, vec!["vision".to_string()]);

    let stored = db.get_paper("2501.01234", 1).await?.unwrap();
    assert_eq!(stored.tags, vec!["vision".to_string()]);
    Ok(())
  }

  #[traced_test]
  #[tokio::test]
  async fn test_checkpoint_round_trip() -> Result<(), ArxnewsError> {
    let (db, _dir) = setup_test_db().await;

    assert_eq!(db.get_checkpoint("cs.CV").await?, None);

    db.set_checkpoint("cs.CV", "2025-01-05").await?;
    assert_eq!(db.get_checkpoint("cs.CV").await?.as_deref(), Some("2025-01-05"));
    assert_eq!(db.get_checkpoint("cs.LG").await?, None);

    db.set_checkpoint("cs.CV", "2025-01-08").await?;
    assert_eq!(db.get_checkpoint("cs.CV").await?.as_deref(), Some("2025-01-08"));
    Ok(())
  }
}
