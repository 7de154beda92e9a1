use chrono::NaiveDate;

use crate::domain::StreakState;

/// Advance a daily study streak to `today`.
///
/// Dates are calendar days (UTC). Same day leaves the streak alone, the next
/// day extends it, any longer gap restarts it at 1.
pub fn advance_streak(previous: StreakState, today: NaiveDate) -> StreakState {
  let current = match previous.last_study_date {
    None => 1,
    Some(last) => match (today - last).num_days() {
      // Same day, or a stored date ahead of today
      d if d <= 0 => {
        return StreakState {
          current: previous.current.max(1),
          longest: previous.longest.max(previous.current.max(1)),
          last_study_date: Some(last.max(today)),
        };
      }
      1 => previous.current + 1,
      _ => 1,
    },
  };

  StreakState {
    current,
    longest: previous.longest.max(current),
    last_study_date: Some(today),
  }
}

/// Streak as it should be displayed on `today`: a streak whose last study day
/// is older than yesterday is already broken
pub fn effective_streak(state: StreakState, today: NaiveDate) -> i64 {
  match state.last_study_date {
    Some(last) if (today - last).num_days() <= 1 => state.current,
    _ => 0,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 5, d).unwrap()
  }

  fn fresh() -> StreakState {
    StreakState {
      current: 0,
      longest: 0,
      last_study_date: None,
    }
  }

  #[test]
  fn test_three_consecutive_days() {
    let s1 = advance_streak(fresh(), day(1));
    let s2 = advance_streak(s1, day(2));
    let s3 = advance_streak(s2, day(3));
    assert_eq!([s1.current, s2.current, s3.current], [1, 2, 3]);
    assert_eq!(s3.longest, 3);
  }

  #[test]
  fn test_skipped_day_resets() {
    let s = advance_streak(advance_streak(fresh(), day(1)), day(2));
    let s = advance_streak(s, day(4));
    assert_eq!(s.current, 1);
    assert_eq!(s.longest, 2);
    assert_eq!(s.last_study_date, Some(day(4)));
  }

  #[test]
  fn test_same_day_unchanged() {
    let s = advance_streak(advance_streak(fresh(), day(1)), day(2));
    let again = advance_streak(s, day(2));
    assert_eq!(again, s);
  }

  #[test]
  fn test_future_last_date_is_treated_as_same_day() {
    let s = StreakState {
      current: 4,
      longest: 6,
      last_study_date: Some(day(10)),
    };
    let next = advance_streak(s, day(9));
    assert_eq!(next.current, 4);
    assert_eq!(next.last_study_date, Some(day(10)));
  }

  #[test]
  fn test_longest_tracks_maximum() {
    let mut s = fresh();
    for d in 1..=5 {
      s = advance_streak(s, day(d));
    }
    s = advance_streak(s, day(20));
    s = advance_streak(s, day(21));
    assert_eq!(s.current, 2);
    assert_eq!(s.longest, 5);
  }

  #[test]
  fn test_effective_streak() {
    let s = StreakState {
      current: 5,
      longest: 5,
      last_study_date: Some(day(10)),
    };
    assert_eq!(effective_streak(s, day(10)), 5);
    assert_eq!(effective_streak(s, day(11)), 5);
    assert_eq!(effective_streak(s, day(12)), 0);
    assert_eq!(effective_streak(fresh(), day(1)), 0);
  }
}
