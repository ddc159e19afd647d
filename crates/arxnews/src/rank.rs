//! Relevance ranking of in-memory paper sets against a free-text query.
//!
//! Ranking is a collaborator, not a core concern: the pipeline only needs
//! "given these `(id, text)` pairs and a query, which ids matter, in what
//! order". The [`Ranker`] trait captures exactly that, and [`Bm25Ranker`]
//! provides the default implementation on top of the `bm25` crate. Callers
//! that want persistent search use the FTS index in
//! [`crate::database::Database::search_papers`] instead.

use bm25::{Document, Language, SearchEngineBuilder};

use super::*;

/// Orders document ids by relevance to a query, most relevant first.
///
/// Implementations may omit documents with no relevance to the query; ids
/// absent from the result are simply filtered out by callers. No tie-break
/// order is guaranteed.
pub trait Ranker {
  /// Ranks `docs` against `query`, returning ids in descending relevance.
  fn rank(&self, docs: &[(i64, String)], query: &str) -> Vec<i64>;
}

/// BM25-backed [`Ranker`] over an ephemeral in-memory index.
///
/// The index is rebuilt per call; the sets ranked here are small (one
/// listing page worth of papers), so build cost is negligible.
#[derive(Debug, Default)]
pub struct Bm25Ranker;

impl Ranker for Bm25Ranker {
  fn rank(&self, docs: &[(i64, String)], query: &str) -> Vec<i64> {
    if docs.is_empty() {
      return Vec::new();
    }
    let engine = SearchEngineBuilder::<i64>::with_documents(
      Language::English,
      docs.iter().map(|(id, text)| Document::new(*id, text.clone())),
    )
    .build();
    engine.search(query, docs.len()).into_iter().map(|hit| hit.document.id).collect()
  }
}

/// Narrows and reorders a paper list by query relevance over title+abstract.
///
/// Papers the ranker leaves out are dropped; the rest come back in ranked
/// order. An empty input yields an empty output without consulting the
/// ranker.
pub fn filter_by_query(ranker: &dyn Ranker, papers: Vec<Paper>, query: &str) -> Vec<Paper> {
  let docs: Vec<(i64, String)> = papers
    .iter()
    .enumerate()
    .map(|(i, p)| (i as i64, format!("{} {}", p.title, p.abstract_text)))
    .collect();
  let ranked = ranker.rank(&docs, query);

  let mut slots: Vec<Option<Paper>> = papers.into_iter().map(Some).collect();
  ranked
    .into_iter()
    .filter_map(|i| slots.get_mut(i as usize).and_then(Option::take))
    .collect()
}
