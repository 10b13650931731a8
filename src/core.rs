//! Read-only aggregations over the cached leaderboards.

pub mod global;
pub mod history;
pub mod profile;
pub mod sum_of_best;

use std::ops::RangeInclusive;
use std::sync::Arc;
use tracing::warn;

use crate::cache::collection::Level;
use crate::cache::CacheManager;
use crate::leaderboard::LevelLeaderboards;
use crate::level::{LevelCategory, LevelInfo, LevelKey};

/// Which levels an aggregation runs over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelSelection {
    pub category: LevelCategory,
    /// Restricts campaign levels to these worlds. Weekly levels have no world
    /// and are left out whenever this is set.
    pub worlds: Option<RangeInclusive<u32>>,
}

impl LevelSelection {
    pub fn category(category: LevelCategory) -> Self {
        LevelSelection {
            category,
            worlds: None,
        }
    }

    pub fn all() -> Self {
        LevelSelection::category(LevelCategory::All)
    }

    pub fn matches<I: LevelInfo>(&self, info: &I) -> bool {
        let world_matches = match (&self.worlds, info.world()) {
            (None, _) => true,
            (Some(worlds), Some(world)) => worlds.contains(&world),
            (Some(_), None) => false,
        };
        world_matches && self.category.includes(info.category())
    }
}

/// A level's metadata together with the leaderboards cached at read time.
#[derive(Debug, Clone)]
pub struct LevelSnapshot {
    pub key: LevelKey,
    pub name: String,
    pub category: LevelCategory,
    pub budget: Option<f64>,
    pub leaderboards: Arc<LevelLeaderboards>,
}

fn snapshots_of<I: LevelInfo>(
    levels: Vec<Arc<Level<I>>>,
    selection: &LevelSelection,
) -> Vec<LevelSnapshot> {
    levels
        .iter()
        .filter(|level| selection.matches(&level.info))
        .filter_map(|level| match level.cached() {
            Some(leaderboards) => Some(LevelSnapshot {
                key: level.key(),
                name: level.info.name().to_string(),
                category: level.info.category(),
                budget: level.info.budget(),
                leaderboards,
            }),
            None => {
                warn!("Leaving {} out of the aggregation, it was never loaded.", level.key());
                None
            }
        })
        .collect()
}

/// Bring the cache up to date, then read the cached leaderboards of every
/// selected level: campaign levels in catalog order, then weekly levels by
/// week. Levels whose leaderboards could never be fetched are left out.
pub async fn select_levels(cache: &CacheManager, selection: &LevelSelection) -> Vec<LevelSnapshot> {
    cache.maybe_reload().await;

    let mut snapshots = snapshots_of(cache.campaign().levels(), selection);
    snapshots.extend(snapshots_of(cache.weekly().levels(), selection));
    snapshots
}
