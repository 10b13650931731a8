use serde::Serialize;
use std::collections::BTreeMap;
use strum::IntoEnumIterator;
use tracing::debug;

use crate::cache::CacheManager;
use crate::config::Settings;
use crate::core::global::{compute_global, find_user, GlobalEntry, ScoreComputer};
use crate::core::{select_levels, LevelSelection, LevelSnapshot};
use crate::error::CacheResult;
use crate::leaderboard::{LeaderboardEntry, LeaderboardType, UserFilter, UserRef};
use crate::level::{LevelCategory, LevelKey};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileOptions {
    pub kind: LeaderboardType,
    pub thresholds: Vec<u32>,
    pub unranked_penalty: u32,
}

impl ProfileOptions {
    pub fn from_settings(kind: LeaderboardType, settings: &Settings) -> Self {
        ProfileOptions {
            kind,
            thresholds: settings.score_count_thresholds.clone(),
            unranked_penalty: settings.unranked_penalty(),
        }
    }
}

/// Number of levels, per category, on which a user ranks within a threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ScoreCount {
    pub overall: usize,
    pub regular: usize,
    pub challenge: usize,
    pub weekly: usize,
    pub bonus: usize,
}

impl ScoreCount {
    fn add(&mut self, category: LevelCategory) {
        self.overall += 1;
        match category {
            LevelCategory::Regular => self.regular += 1,
            LevelCategory::Challenge => self.challenge += 1,
            LevelCategory::Weekly => self.weekly += 1,
            LevelCategory::Bonus => self.bonus += 1,
            LevelCategory::All => {}
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelScore {
    pub key: LevelKey,
    pub name: String,
    pub category: LevelCategory,
    pub entry: LeaderboardEntry,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProfileStats {
    /// The user's entry on the rank based global board of each category.
    pub global_positions: BTreeMap<LevelCategory, GlobalEntry>,
    pub score_counts: BTreeMap<u32, ScoreCount>,
    pub level_scores: Vec<LevelScore>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Profile {
    pub user: UserRef,
    pub stats: ProfileStats,
}

pub fn compute_profile(
    levels: &[LevelSnapshot],
    filter: &UserFilter,
    options: &ProfileOptions,
) -> CacheResult<Option<Profile>> {
    // a name may match several users, the first one found is the profile owner
    let user = match levels
        .iter()
        .find_map(|level| level.leaderboards.get(options.kind).entry_for(filter))
    {
        Some(entry) => entry.owner.clone(),
        None => return Ok(None),
    };
    let by_id = UserFilter::Id(user.id.clone());

    let level_scores = levels
        .iter()
        .filter_map(|level| {
            level
                .leaderboards
                .get(options.kind)
                .entry_for(&by_id)
                .map(|entry| LevelScore {
                    key: level.key.clone(),
                    name: level.name.clone(),
                    category: level.category,
                    entry: entry.clone(),
                })
        })
        .collect::<Vec<_>>();

    let score_counts = options
        .thresholds
        .iter()
        .map(|&threshold| {
            let mut count = ScoreCount::default();
            level_scores
                .iter()
                .filter(|score| score.entry.rank <= threshold)
                .for_each(|score| count.add(score.category));
            (threshold, count)
        })
        .collect();

    let mut global_positions = BTreeMap::new();
    for category in LevelCategory::iter() {
        let category_levels = levels
            .iter()
            .filter(|level| category.includes(level.category))
            .cloned()
            .collect::<Vec<_>>();
        let board = compute_global(
            &category_levels,
            options.kind,
            ScoreComputer::rank(options.unranked_penalty),
        )?;
        if let Some(entry) = find_user(&board, &by_id) {
            global_positions.insert(category, entry.clone());
        }
    }

    Ok(Some(Profile {
        user,
        stats: ProfileStats {
            global_positions,
            score_counts,
            level_scores,
        },
    }))
}

/// Profile of the user matching the filter, `None` if the user is on no
/// level's top list.
pub async fn get_profile(
    cache: &CacheManager,
    filter: &UserFilter,
    options: &ProfileOptions,
) -> CacheResult<Option<Profile>> {
    let levels = select_levels(cache, &LevelSelection::all()).await;
    let profile = compute_profile(&levels, filter, options)?;
    debug!("Profile lookup for {filter:?} over {} levels", levels.len());
    Ok(profile)
}
