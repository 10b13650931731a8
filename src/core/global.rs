use itertools::Itertools;
use serde::Serialize;
use std::collections::HashMap;
use std::ops::RangeInclusive;
use strum::{Display, EnumString};
use tracing::info;

use crate::cache::CacheManager;
use crate::core::{select_levels, LevelSelection, LevelSnapshot};
use crate::error::{CacheError, CacheResult};
use crate::leaderboard::{LeaderboardType, UserFilter, UserRef};
use crate::level::LevelCategory;

/// How a user's money spent on a level is counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum MoneyAggregation {
    /// Only the user's best entry on each level counts.
    #[default]
    BestPerLevel,
    /// Every entry of the user on a level is added up.
    AllEntries,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScoreComputer {
    /// Sum of the user's rank on each level, absent levels cost `unranked_penalty`.
    Rank { unranked_penalty: u32 },
    /// Sum of money spent on each level, absent levels cost the level budget.
    MoneySpent { aggregation: MoneyAggregation },
}

impl ScoreComputer {
    pub fn rank(unranked_penalty: u32) -> Self {
        ScoreComputer::Rank { unranked_penalty }
    }

    pub fn money_spent() -> Self {
        ScoreComputer::MoneySpent {
            aggregation: MoneyAggregation::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalOptions {
    pub kind: LeaderboardType,
    pub category: LevelCategory,
    pub worlds: Option<RangeInclusive<u32>>,
    pub score: ScoreComputer,
}

impl GlobalOptions {
    pub fn new(kind: LeaderboardType, category: LevelCategory, score: ScoreComputer) -> Self {
        GlobalOptions {
            kind,
            category,
            worlds: None,
            score,
        }
    }

    pub fn selection(&self) -> LevelSelection {
        LevelSelection {
            category: self.category,
            worlds: self.worlds.clone(),
        }
    }

    /// Money spent needs a budget for every level, weekly levels have none.
    pub fn validate(&self) -> CacheResult<()> {
        let includes_weekly = self.worlds.is_none() && self.category.includes(LevelCategory::Weekly);
        match self.score {
            ScoreComputer::MoneySpent { .. } if includes_weekly => Err(CacheError::InvalidQuery(
                format!("money spent ranking is not available for {} levels", self.category),
            )),
            _ => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GlobalEntry {
    pub user: UserRef,
    pub value: f64,
    pub rank: u32,
    /// Matched levels on which the user appears.
    pub levels_count: usize,
}

struct Contribution {
    user: UserRef,
    // value minus absent cost, summed over the levels the user appears on
    delta: f64,
    levels_count: usize,
}

/// Merge the given levels into one ranked board. Levels without a budget
/// must be filtered out beforehand in money spent mode.
pub fn compute_global(
    levels: &[LevelSnapshot],
    kind: LeaderboardType,
    score: ScoreComputer,
) -> CacheResult<Vec<GlobalEntry>> {
    let mut contributions: HashMap<String, Contribution> = HashMap::new();
    let mut total_absent_cost = 0.0;

    for level in levels {
        let board = level.leaderboards.get(kind);
        let absent_cost = match score {
            ScoreComputer::Rank { unranked_penalty } => unranked_penalty as f64,
            ScoreComputer::MoneySpent { .. } => level.budget.ok_or_else(|| {
                CacheError::InvalidQuery(format!("level {} has no budget", level.key))
            })?,
        };
        total_absent_cost += absent_cost;

        let level_values = match score {
            ScoreComputer::Rank { .. } => board
                .best_per_user()
                .into_iter()
                .map(|e| (&e.owner, e.rank as f64))
                .collect::<Vec<_>>(),
            ScoreComputer::MoneySpent {
                aggregation: MoneyAggregation::BestPerLevel,
            } => board
                .best_per_user()
                .into_iter()
                .map(|e| (&e.owner, e.value))
                .collect(),
            ScoreComputer::MoneySpent {
                aggregation: MoneyAggregation::AllEntries,
            } => board
                .top
                .iter()
                .into_group_map_by(|e| &e.owner.id)
                .into_values()
                .map(|entries| {
                    let spent = entries.iter().map(|e| e.value).sum::<f64>();
                    (&entries[0].owner, spent)
                })
                .collect(),
        };

        for (owner, value) in level_values {
            let contribution = contributions
                .entry(owner.id.clone())
                .or_insert_with(|| Contribution {
                    user: owner.clone(),
                    delta: 0.0,
                    levels_count: 0,
                });
            contribution.delta += value - absent_cost;
            contribution.levels_count += 1;
        }
    }

    let entries = contributions
        .into_values()
        .map(|c| GlobalEntry {
            user: c.user,
            value: total_absent_cost + c.delta,
            rank: 0,
            levels_count: c.levels_count,
        })
        .sorted_by(|a, b| {
            a.value
                .total_cmp(&b.value)
                .then_with(|| a.user.id.cmp(&b.user.id))
        })
        .enumerate()
        .map(|(index, entry)| GlobalEntry {
            rank: index as u32 + 1,
            ..entry
        })
        .collect();

    Ok(entries)
}

/// Build the global leaderboard across every level matching the options.
pub async fn global_leaderboard(
    cache: &CacheManager,
    options: &GlobalOptions,
) -> CacheResult<Vec<GlobalEntry>> {
    options.validate()?;

    let levels = select_levels(cache, &options.selection()).await;
    let board = compute_global(&levels, options.kind, options.score)?;
    info!(
        "Global {} leaderboard over {} {} levels: {} users",
        options.kind,
        levels.len(),
        options.category,
        board.len()
    );
    Ok(board)
}

pub fn find_user<'a>(board: &'a [GlobalEntry], filter: &UserFilter) -> Option<&'a GlobalEntry> {
    board.iter().find(|entry| filter.matches(&entry.user))
}
