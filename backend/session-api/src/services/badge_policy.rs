//! Achievement badge thresholds.
//!
//! Evaluated against the account service's cumulative stats after a score
//! update has landed. Pure: the caller reads the stats, this module only
//! decides which badge names are newly earned.

use crate::models::AccountSnapshot;

/// Quiz-count badges fire on exact equality. Crossing a count without
/// landing on it (out-of-band corrections) skips the badge for good.
const COUNT_BADGES: &[(i64, &str)] = &[
    (1, "First Quiz"),
    (5, "Quiz Novice"),
    (30, "Quiz Master"),
];

/// Score badges fire once the cumulative score reaches the threshold.
const SCORE_BADGES: &[(i64, &str)] = &[
    (30, "30 Points Club"),
    (100, "100 Points Club"),
    (200, "200 Points Club"),
];

/// Returns the badge names earned by `stats` that are not already present
/// in `stats.badges`. Awarding is monotonic: a badge is proposed at most
/// once, and the account service stores badges as a set.
pub fn new_badges(stats: &AccountSnapshot) -> Vec<String> {
    let mut earned = Vec::new();

    for (count, badge) in COUNT_BADGES {
        if stats.quizzes_completed == *count && !stats.badges.iter().any(|b| b == badge) {
            earned.push((*badge).to_string());
        }
    }

    for (threshold, badge) in SCORE_BADGES {
        if stats.total_score >= *threshold && !stats.badges.iter().any(|b| b == badge) {
            earned.push((*badge).to_string());
        }
    }

    earned
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats(quizzes_completed: i64, total_score: i64, badges: &[&str]) -> AccountSnapshot {
        AccountSnapshot {
            total_score,
            quizzes_completed,
            badges: badges.iter().map(|b| b.to_string()).collect(),
        }
    }

    #[test]
    fn first_quiz_awarded_on_exact_count() {
        assert_eq!(new_badges(&stats(1, 5, &[])), vec!["First Quiz"]);
        // Count already past one: the count badge is gone, nothing fires
        assert!(new_badges(&stats(2, 5, &[])).is_empty());
    }

    #[test]
    fn score_badges_use_thresholds_not_equality() {
        assert_eq!(new_badges(&stats(2, 31, &[])), vec!["30 Points Club"]);
        assert_eq!(
            new_badges(&stats(2, 250, &[])),
            vec!["30 Points Club", "100 Points Club", "200 Points Club"]
        );
    }

    #[test]
    fn already_held_badges_are_never_proposed_again() {
        let earned = new_badges(&stats(1, 40, &["First Quiz"]));
        assert_eq!(earned, vec!["30 Points Club"]);
    }

    #[test]
    fn count_and_score_badges_combine() {
        assert_eq!(
            new_badges(&stats(5, 100, &["First Quiz", "30 Points Club"])),
            vec!["Quiz Novice", "100 Points Club"]
        );
    }

    #[test]
    fn no_badges_below_every_threshold() {
        assert!(new_badges(&stats(2, 10, &[])).is_empty());
    }
}
