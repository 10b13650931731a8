use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;

use crate::cache::collection::Level;
use crate::error::CacheResult;
use crate::leaderboard::{HistoryEntry, Leaderboard, LeaderboardEntry, LeaderboardType};
use crate::level::LevelInfo;
use crate::utils::group_by;

/// When the current score of a user first showed up as the level record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BecameTop {
    At(DateTime<Utc>),
    /// Matched on the oldest retained snapshot, the record may be older.
    AtOrBefore(DateTime<Utc>),
    /// The score never appears as a record in the retained history.
    Unknown,
}

impl BecameTop {
    pub fn time(&self) -> Option<DateTime<Utc>> {
        match self {
            BecameTop::At(time) | BecameTop::AtOrBefore(time) => Some(*time),
            BecameTop::Unknown => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordHolding {
    pub latest_score: LeaderboardEntry,
    pub became_top: BecameTop,
}

/// For every entry of the current top list, find the earliest snapshot in
/// which that user held rank 1 with that exact value. `None` when the
/// leaderboard keeps no history.
pub fn time_user_became_top(board: &Leaderboard) -> Option<Vec<RecordHolding>> {
    let history = board.top_history.as_ref()?;

    let mut records = history
        .iter()
        .filter(|snapshot| snapshot.entry.rank <= 1)
        .collect::<Vec<_>>();
    // stable, equal times keep their append order
    records.sort_by_key(|snapshot| snapshot.time);
    let oldest = records.first().map(|snapshot| snapshot.time);

    let by_user: HashMap<String, Vec<&HistoryEntry>> =
        group_by(records, |snapshot| snapshot.entry.owner.id.clone())
            .into_iter()
            .collect();

    let holdings = board
        .top
        .iter()
        .map(|entry| {
            let first_match = by_user.get(&entry.owner.id).and_then(|snapshots| {
                snapshots
                    .iter()
                    .find(|snapshot| snapshot.entry.value == entry.value)
            });
            let became_top = match first_match {
                Some(snapshot) if Some(snapshot.time) == oldest => {
                    BecameTop::AtOrBefore(snapshot.time)
                }
                Some(snapshot) => BecameTop::At(snapshot.time),
                None => BecameTop::Unknown,
            };
            RecordHolding {
                latest_score: entry.clone(),
                became_top,
            }
        })
        .collect();

    Some(holdings)
}

/// Record holding times of a cached level, fetching it first if needed.
pub async fn level_record_history<I: LevelInfo>(
    level: &Level<I>,
    kind: LeaderboardType,
) -> CacheResult<Option<Vec<RecordHolding>>> {
    let leaderboards = level.get().await?;
    Ok(time_user_became_top(leaderboards.get(kind)))
}
