//! Final standings, computed locally from the fetched participant rows.

use serde::Serialize;

use crate::dao::models::ParticipantRecord;

/// One ranked line of the leaderboard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based rank after sorting.
    pub rank: usize,
    /// Participant display name.
    pub username: String,
    /// Final (or current) score.
    pub score: i32,
    /// Completed run time in seconds; `None` while still playing.
    pub time_secs: Option<i32>,
}

/// Rank rows by score descending, ties broken by faster completion.
///
/// Unfinished participants have no completion time and sort after finished
/// ones at the same score.
pub fn rank(rows: Vec<ParticipantRecord>) -> Vec<LeaderboardEntry> {
    let mut rows = rows;
    rows.sort_by(|a, b| {
        b.score.cmp(&a.score).then_with(|| {
            match (a.completion_time, b.completion_time) {
                (Some(ta), Some(tb)) => ta.cmp(&tb),
                (Some(_), None) => std::cmp::Ordering::Less,
                (None, Some(_)) => std::cmp::Ordering::Greater,
                (None, None) => std::cmp::Ordering::Equal,
            }
        })
    });

    rows.into_iter()
        .enumerate()
        .map(|(i, row)| LeaderboardEntry {
            rank: i + 1,
            username: row.username,
            score: row.score,
            time_secs: row.completion_time,
        })
        .collect()
}

/// Render seconds as zero-padded `MM:SS`.
pub fn format_time(total_secs: u32) -> String {
    format!("{:02}:{:02}", total_secs / 60, total_secs % 60)
}
