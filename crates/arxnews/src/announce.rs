//! Announcement-date computation for arXiv submissions.
//!
//! arXiv lists new submissions on a weekly cadence with a 14:00 US-Eastern
//! cutoff, so the day a reader sees a paper "announced" usually differs from
//! its literal submission timestamp. This module reproduces that schedule as
//! a pure function of the submission timestamp:
//!
//! | Submitted (ET)      | Announced           |
//! |---------------------|---------------------|
//! | Mon-Wed before 14:00 | same day           |
//! | Mon-Wed at/after 14:00 | next day         |
//! | Thu before 14:00    | same day            |
//! | Thu at/after 14:00  | next Sunday         |
//! | Fri before 14:00    | next Sunday         |
//! | Fri at/after 14:00  | next Monday         |
//! | Sat or Sun          | next Monday         |
//!
//! The result is never persisted; it is recomputed on read so a policy fix
//! retroactively corrects every stored paper.

use chrono::{Datelike, NaiveTime, Weekday};
use chrono_tz::America::New_York;

use super::*;

/// The local publication cutoff: submissions at or after this time roll over.
const CUTOFF: NaiveTime = match NaiveTime::from_hms_opt(14, 0, 0) {
  Some(t) => t,
  None => unreachable!(),
};

/// Parses a stored timestamp string into a UTC instant.
///
/// Accepts RFC 3339 with any offset, a naive `YYYY-MM-DDTHH:MM:SS` (assumed
/// UTC, as the Atom feed emits), or a bare `YYYY-MM-DD` (midnight UTC, as the
/// OAI version history emits). Returns `None` for anything else.
pub(crate) fn parse_utc(s: &str) -> Option<DateTime<Utc>> {
  if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
    return Some(dt.with_timezone(&Utc));
  }
  if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S") {
    return Some(Utc.from_utc_datetime(&naive));
  }
  if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
    return Some(Utc.from_utc_datetime(&date.and_hms_opt(0, 0, 0)?));
  }
  None
}

/// Days ahead to the next occurrence of `target` from `current`, modulo 7.
///
/// Deliberately *not* strict-future: when `current` already is the target
/// weekday this yields 0, i.e. "next Sunday" computed on a Sunday is that
/// same Sunday. The announcement table depends on exactly this behavior, so
/// resist the temptation to make it strictly positive.
fn days_until(current: Weekday, target: Weekday) -> i64 {
  i64::from((target.num_days_from_monday() + 7 - current.num_days_from_monday()) % 7)
}

/// Computes the public announcement date for a submission timestamp.
///
/// The timestamp is converted to US-Eastern civil time regardless of its
/// original offset, then the weekday/cutoff table above is applied. Returns
/// the announcement date as a `YYYY-MM-DD` string.
///
/// Any parse failure (or a missing timestamp) yields `None` rather than an
/// error: callers treat the date as unknown and filter nulls out.
///
/// # Examples
///
/// ```
/// use arxnews::announce::announced_date;
///
/// // Friday 13:59 ET rolls forward to Sunday
/// assert_eq!(
///   announced_date(Some("2024-09-20T17:59:00+00:00")),
///   Some("2024-09-22".to_string())
/// );
/// assert_eq!(announced_date(None), None);
/// assert_eq!(announced_date(Some("not a timestamp")), None);
/// ```
pub fn announced_date(submitted_at: Option<&str>) -> Option<String> {
  let utc = parse_utc(submitted_at?)?;
  let local = utc.with_timezone(&New_York);
  let date = local.date_naive();
  let weekday = local.weekday();
  let late = local.time() >= CUTOFF;

  let announced = match weekday {
    Weekday::Mon | Weekday::Tue | Weekday::Wed =>
      if late {
        date.succ_opt()?
      } else {
        date
      },
    Weekday::Thu =>
      if late {
        date + Duration::days(days_until(weekday, Weekday::Sun))
      } else {
        date
      },
    Weekday::Fri =>
      if late {
        date + Duration::days(days_until(weekday, Weekday::Mon))
      } else {
        date + Duration::days(days_until(weekday, Weekday::Sun))
      },
    Weekday::Sat | Weekday::Sun => date + Duration::days(days_until(weekday, Weekday::Mon)),
  };

  Some(announced.format("%Y-%m-%d").to_string())
}
