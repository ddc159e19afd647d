//! Daily digest rendering.
//!
//! A digest is a markdown snapshot of one announcement day: papers whose
//! submission or update falls on the given date, shortlisted papers first,
//! topped up with triage papers until `top_k` is reached. Archived and
//! hidden papers never appear.

use super::*;

/// Selects up to `top_k` papers for a digest: shortlist first, then triage.
fn pick_top(papers: &[&Paper], top_k: usize) -> Vec<Paper> {
  let mut picked: Vec<Paper> = papers
    .iter()
    .filter(|p| p.state == PaperState::Shortlist)
    .take(top_k)
    .map(|p| (*p).clone())
    .collect();
  if picked.len() < top_k {
    picked.extend(
      papers
        .iter()
        .filter(|p| p.state == PaperState::Triage)
        .take(top_k - picked.len())
        .map(|p| (*p).clone()),
    );
  }
  picked
}

/// Renders the markdown digest for one day.
///
/// A paper belongs to the day when either stored timestamp starts with the
/// date's `YYYY-MM-DD` prefix; date-only and full timestamps both match.
pub fn daily_digest(papers: &[Paper], date: NaiveDate, top_k: usize) -> String {
  let day = date.format("%Y-%m-%d").to_string();
  let day_papers: Vec<&Paper> = papers
    .iter()
    .filter(|p| {
      p.submitted_at.as_deref().is_some_and(|s| s.starts_with(&day))
        || p.updated_at.as_deref().is_some_and(|s| s.starts_with(&day))
    })
    .collect();
  let top = pick_top(&day_papers, top_k);

  let mut md = format!("# arXiv Daily Digest — {day}\n\n");
  for (i, p) in top.iter().enumerate() {
    md.push_str(&format!(
      "{}. **{}**  \n   {}  \n   `[{}]` — [abs]({}) · [pdf]({})\n\n",
      i + 1,
      p.title,
      p.authors,
      p.primary_category,
      p.link_abs,
      p.link_pdf
    ));
  }
  md
}

#[cfg(test)]
mod tests {
  use super::*;

  fn paper(arxiv_id: &str, submitted: &str, state: PaperState) -> Paper {
    let mut paper = Paper::from_ingest(
      arxiv_id.to_string(),
      1,
      format!("Paper {arxiv_id}"),
      "Ada Lovelace".to_string(),
      "Abstract.".to_string(),
      vec!["cs.CV".to_string()],
      Some(submitted.to_string()),
      None,
      None,
      None,
    );
    paper.state = state;
    paper
  }

  #[test]
  fn test_digest_filters_by_day() {
    let papers = vec![
      paper("2501.00001", "2025-01-06T10:00:00+00:00", PaperState::Triage),
      paper("2501.00002", "2025-01-07T10:00:00+00:00", PaperState::Triage),
    ];
    let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
    let md = daily_digest(&papers, date, 10);
    assert!(md.contains("Paper 2501.00001"));
    assert!(!md.contains("Paper 2501.00002"));
  }

  #[test]
  fn test_digest_prefers_shortlist() {
    let papers = vec![
      paper("2501.00001", "2025-01-06T10:00:00+00:00", PaperState::Triage),
      paper("2501.00002", "2025-01-06T11:00:00+00:00", PaperState::Shortlist),
      paper("2501.00003", "2025-01-06T12:00:00+00:00", PaperState::Hidden),
    ];
    let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
    let md = daily_digest(&papers, date, 1);
    assert!(md.contains("Paper 2501.00002"));
    assert!(!md.contains("Paper 2501.00001"));
    assert!(!md.contains("Paper 2501.00003"));
  }

  #[test]
  fn test_digest_matches_date_only_timestamps() {
    let papers = vec![paper("2501.00001", "2025-01-06", PaperState::Triage)];
    let date = NaiveDate::from_ymd_opt(2025, 1, 6).unwrap();
    assert!(daily_digest(&papers, date, 10).contains("Paper 2501.00001"));
  }
}
