//! In-memory leaderboard source and fixtures shared by the unit tests.

use chrono::{DateTime, TimeZone, Utc};
use futures::future::{BoxFuture, FutureExt};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::cache::buckets::CampaignBuckets;
use crate::cache::CacheManager;
use crate::client::LeaderboardSource;
use crate::clock::ManualClock;
use crate::config::Settings;
use crate::error::{CacheError, CacheResult};
use crate::leaderboard::LevelLeaderboards;
use crate::level::{CampaignLevelInfo, LevelCode, LevelIdentity, WeeklyLevelInfo};

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap()
}

pub fn campaign_info(id: &str, code: &str, budget: f64) -> CampaignLevelInfo {
    CampaignLevelInfo {
        id: id.to_string(),
        code: LevelCode::parse(code).unwrap(),
        name: format!("Level {code}"),
        budget,
        bonus: false,
    }
}

pub fn bonus_info(id: &str, code: &str, budget: f64) -> CampaignLevelInfo {
    CampaignLevelInfo {
        bonus: true,
        ..campaign_info(id, code, budget)
    }
}

pub fn weekly_info(id: &str, week: u32) -> WeeklyLevelInfo {
    WeeklyLevelInfo {
        id: id.to_string(),
        title: format!("Week {week}"),
        week,
        payload: String::new(),
        preview: String::new(),
    }
}

#[derive(Default)]
struct MockState {
    catalog: Vec<CampaignLevelInfo>,
    weekly: Vec<WeeklyLevelInfo>,
    boards: HashMap<String, LevelLeaderboards>,
    buckets: CampaignBuckets,
    failing_levels: HashSet<String>,
    delays: HashMap<String, Duration>,
    fail_weekly_index: bool,
    fetches: HashMap<String, usize>,
    weekly_index_calls: usize,
    buckets_calls: usize,
}

/// Serves whatever the test put in it, levels without a board get empty ones.
#[derive(Default)]
pub struct MockSource {
    state: Mutex<MockState>,
}

impl MockSource {
    pub fn set_catalog(&self, catalog: Vec<CampaignLevelInfo>) {
        self.state.lock().unwrap().catalog = catalog;
    }

    pub fn set_weekly(&self, weekly: Vec<WeeklyLevelInfo>) {
        self.state.lock().unwrap().weekly = weekly;
    }

    pub fn set_board(&self, level_id: &str, boards: LevelLeaderboards) {
        self.state
            .lock()
            .unwrap()
            .boards
            .insert(level_id.to_string(), boards);
    }

    pub fn fail_level(&self, level_id: &str, fail: bool) {
        let mut state = self.state.lock().unwrap();
        match fail {
            true => state.failing_levels.insert(level_id.to_string()),
            false => state.failing_levels.remove(level_id),
        };
    }

    /// Leaderboard fetches of the level complete only after `delay`.
    pub fn delay_level(&self, level_id: &str, delay: Duration) {
        self.state
            .lock()
            .unwrap()
            .delays
            .insert(level_id.to_string(), delay);
    }

    pub fn fail_weekly_index(&self, fail: bool) {
        self.state.lock().unwrap().fail_weekly_index = fail;
    }

    pub fn fetch_count(&self, level_id: &str) -> usize {
        *self.state.lock().unwrap().fetches.get(level_id).unwrap_or(&0)
    }

    pub fn weekly_index_calls(&self) -> usize {
        self.state.lock().unwrap().weekly_index_calls
    }

    pub fn buckets_calls(&self) -> usize {
        self.state.lock().unwrap().buckets_calls
    }
}

impl LeaderboardSource for MockSource {
    fn fetch_leaderboards<'a>(
        &'a self,
        level: &'a LevelIdentity,
    ) -> BoxFuture<'a, CacheResult<LevelLeaderboards>> {
        let (result, delay) = {
            let mut state = self.state.lock().unwrap();
            *state.fetches.entry(level.id().to_string()).or_insert(0) += 1;
            let result = match state.failing_levels.contains(level.id()) {
                true => Err(CacheError::Http(format!("timeout fetching {}", level.id()))),
                false => Ok(state.boards.get(level.id()).cloned().unwrap_or_default()),
            };
            (result, state.delays.get(level.id()).copied())
        };
        async move {
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        }
        .boxed()
    }

    fn fetch_level_catalog(&self) -> BoxFuture<'_, CacheResult<Vec<CampaignLevelInfo>>> {
        let catalog = self.state.lock().unwrap().catalog.clone();
        async move { Ok(catalog) }.boxed()
    }

    fn fetch_weekly_index(&self) -> BoxFuture<'_, CacheResult<Vec<WeeklyLevelInfo>>> {
        let result = {
            let mut state = self.state.lock().unwrap();
            state.weekly_index_calls += 1;
            match state.fail_weekly_index {
                true => Err(CacheError::Http("502 Bad Gateway".to_string())),
                false => Ok(state.weekly.clone()),
            }
        };
        async move { result }.boxed()
    }

    fn fetch_buckets(&self) -> BoxFuture<'_, CacheResult<CampaignBuckets>> {
        let buckets = {
            let mut state = self.state.lock().unwrap();
            state.buckets_calls += 1;
            state.buckets.clone()
        };
        async move { Ok(buckets) }.boxed()
    }
}

/// Cache manager over a mock source, with a manual clock at `start_time`.
pub fn cache_with(source: &Arc<MockSource>) -> CacheManager {
    CacheManager::new(
        source.clone(),
        Arc::new(ManualClock::new(start_time())),
        &Settings::default(),
    )
}
