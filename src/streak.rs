use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use crate::calendar::WeekKey;

/// Counts consecutive ISO weeks with at least one completion, ending at
/// the current week, or at last week while the current week is still
/// empty. Backward iteration stops after `safety_cap` steps.
pub fn compute_weekly_streak(
    completed_dates: &[DateTime<Utc>],
    now: DateTime<Utc>,
    safety_cap: u32,
) -> u32 {
    let active_weeks: HashSet<WeekKey> = completed_dates.iter().copied().map(WeekKey::of).collect();
    if active_weeks.is_empty() {
        return 0;
    }

    let one_week = Duration::days(7);
    let last_week = now - one_week;
    let mut anchor = if active_weeks.contains(&WeekKey::of(now)) {
        now
    } else if active_weeks.contains(&WeekKey::of(last_week)) {
        last_week
    } else {
        return 0;
    };

    let mut streak: u32 = 1;
    for _ in 0..safety_cap {
        anchor -= one_week;
        if !active_weeks.contains(&WeekKey::of(anchor)) {
            return streak;
        }
        streak += 1;
    }

    tracing::debug!(streak, safety_cap, "weekly streak hit the safety cap");
    streak
}
