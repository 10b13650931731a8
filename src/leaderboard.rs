use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use strum::{Display, EnumIter, EnumString};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Display, EnumString, EnumIter,
)]
#[strum(serialize_all = "lowercase")]
pub enum LeaderboardType {
    #[default]
    Any,
    Unbroken,
}

// unique identifier for a player appearing on leaderboards
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserRef {
    pub id: String,
    pub display_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub owner: UserRef,
    pub value: f64,
    // Filled in from the entry position when the payload carries no rank
    #[serde(default)]
    pub rank: u32,
}

/// Snapshot of a leaderboard entry at the time it was recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    #[serde(flatten)]
    pub entry: LeaderboardEntry,
    pub time: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Leaderboard {
    #[serde(rename = "top1000", default)]
    pub top: Vec<LeaderboardEntry>,
    #[serde(default)]
    pub top_history: Option<Vec<HistoryEntry>>,
    #[serde(default)]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Both leaderboard variants of a level, cached together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelLeaderboards {
    pub any: Leaderboard,
    pub unbroken: Leaderboard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    Id(String),
    // case-insensitive display name
    Name(String),
}

impl UserFilter {
    pub fn matches(&self, user: &UserRef) -> bool {
        match self {
            UserFilter::Id(id) => &user.id == id,
            UserFilter::Name(name) => user.display_name.to_lowercase() == name.to_lowercase(),
        }
    }
}

impl Leaderboard {
    pub fn new(top: Vec<LeaderboardEntry>) -> Self {
        Leaderboard {
            top,
            top_history: None,
            metadata: serde_json::Map::new(),
        }
    }

    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.top_history = Some(history);
        self
    }

    /// Remote payloads may omit ranks; entries are already ordered best first.
    pub fn assign_missing_ranks(&mut self) {
        self.top
            .iter_mut()
            .enumerate()
            .filter(|(_, entry)| entry.rank == 0)
            .for_each(|(index, entry)| entry.rank = index as u32 + 1);
    }

    /// The rank 1 entry, if the leaderboard has any entry at all.
    pub fn best(&self) -> Option<&LeaderboardEntry> {
        self.top
            .iter()
            .find(|e| e.rank == 1)
            .or_else(|| self.top.first())
    }

    /// Best entry of the first user matching the filter.
    pub fn entry_for(&self, filter: &UserFilter) -> Option<&LeaderboardEntry> {
        self.top
            .iter()
            .filter(|e| filter.matches(&e.owner))
            .min_by_key(|e| e.rank)
    }

    /// One entry per user (their best one), keeping leaderboard order.
    pub fn best_per_user(&self) -> Vec<&LeaderboardEntry> {
        let mut seen = HashSet::new();
        let mut entries = self.top.iter().collect::<Vec<_>>();
        entries.sort_by_key(|e| e.rank);
        entries
            .into_iter()
            .filter(|e| seen.insert(&e.owner.id))
            .collect()
    }
}

impl LevelLeaderboards {
    pub fn get(&self, kind: LeaderboardType) -> &Leaderboard {
        match kind {
            LeaderboardType::Any => &self.any,
            LeaderboardType::Unbroken => &self.unbroken,
        }
    }
}
