use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;
use uuid::Uuid;

/// One vote per (slide, voter), upserted on change. Tallies are computed by
/// counting rows, never by incrementing a stored counter.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PollVote {
    pub slide_id: Uuid,
    pub presentation_id: Uuid,
    pub voter_id: Uuid,
    pub choice: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Aggregated tally for one mcq slide; counts is indexed by option.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PollTally {
    pub slide_id: Uuid,
    pub total: i64,
    pub counts: Vec<i64>,
}

impl PollTally {
    /// Folds (choice, votes) rows into a dense per-option count vector.
    /// Rows referencing a choice outside the option range are ignored; they
    /// can appear after an instructor edits the option list mid-session.
    pub fn from_rows(slide_id: Uuid, option_count: usize, rows: &[(i32, i64)]) -> Self {
        let mut counts = vec![0i64; option_count];
        for (choice, votes) in rows {
            if let Ok(index) = usize::try_from(*choice) {
                if index < option_count {
                    counts[index] += votes;
                }
            }
        }
        let total = counts.iter().sum();
        Self {
            slide_id,
            total,
            counts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tally_folds_rows_into_dense_counts() {
        let slide_id = Uuid::new_v4();
        let tally = PollTally::from_rows(slide_id, 3, &[(0, 2), (2, 5)]);
        assert_eq!(tally.counts, vec![2, 0, 5]);
        assert_eq!(tally.total, 7);
    }

    #[test]
    fn tally_ignores_out_of_range_choices() {
        let tally = PollTally::from_rows(Uuid::new_v4(), 2, &[(0, 1), (5, 9), (-1, 3)]);
        assert_eq!(tally.counts, vec![1, 0]);
        assert_eq!(tally.total, 1);
    }

    #[test]
    fn tally_of_no_votes_is_zeroed() {
        let tally = PollTally::from_rows(Uuid::new_v4(), 4, &[]);
        assert_eq!(tally.counts, vec![0, 0, 0, 0]);
        assert_eq!(tally.total, 0);
    }
}
