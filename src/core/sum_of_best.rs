use serde::Serialize;
use tracing::debug;

use crate::cache::CacheManager;
use crate::core::{select_levels, LevelSelection, LevelSnapshot};
use crate::leaderboard::LeaderboardType;
use crate::level::{LevelCategory, LevelKey};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelBest {
    pub key: LevelKey,
    /// Rank 1 value, `None` when the leaderboard is empty.
    pub best: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SumOfBest {
    pub total: f64,
    pub levels: Vec<LevelBest>,
}

impl SumOfBest {
    /// Levels that had a top entry and so contributed to the total.
    pub fn counted_levels(&self) -> usize {
        self.levels.iter().filter(|level| level.best.is_some()).count()
    }
}

pub fn compute_sum_of_best(levels: &[LevelSnapshot], kind: LeaderboardType) -> SumOfBest {
    let levels = levels
        .iter()
        .map(|level| LevelBest {
            key: level.key.clone(),
            best: level.leaderboards.get(kind).best().map(|entry| entry.value),
        })
        .collect::<Vec<_>>();

    SumOfBest {
        total: levels.iter().filter_map(|level| level.best).sum(),
        levels,
    }
}

pub async fn sum_of_best(
    cache: &CacheManager,
    kind: LeaderboardType,
    category: LevelCategory,
) -> SumOfBest {
    let levels = select_levels(cache, &LevelSelection::category(category)).await;
    let sum = compute_sum_of_best(&levels, kind);
    debug!(
        "Sum of best {kind} over {} {category} levels: {}",
        sum.counted_levels(),
        sum.total
    );
    sum
}
