use futures::future::{BoxFuture, FutureExt};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::info;

use crate::cache::collection::{Level, LevelCollection};
use crate::cache::resource::{Fetcher, ReloadReport, Reloadable, RemoteResource};
use crate::client::LeaderboardSource;
use crate::clock::SharedClock;
use crate::error::CacheResult;
use crate::level::WeeklyLevelInfo;

pub type WeeklyLevel = Level<WeeklyLevelInfo>;

struct WeeklyIndexFetcher {
    source: Arc<dyn LeaderboardSource>,
}

impl Fetcher<Vec<WeeklyLevelInfo>> for WeeklyIndexFetcher {
    fn fetch(&self) -> BoxFuture<'_, CacheResult<Vec<WeeklyLevelInfo>>> {
        self.source.fetch_weekly_index()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct WeeklyIntervals {
    /// Interval of the most recent levels, still actively played.
    pub hot: Duration,
    pub inactive: Duration,
    /// How many of the most recent levels are considered hot.
    pub hot_count: usize,
}

/// Weekly levels, listed by an independently cached index. The most recent
/// levels reload often, older ones are close to frozen.
pub struct WeeklyManager {
    index: RemoteResource<Vec<WeeklyLevelInfo>>,
    levels: LevelCollection<WeeklyLevelInfo>,
    intervals: WeeklyIntervals,
    // index content the levels were last built from
    populated_from: Mutex<Option<Arc<Vec<WeeklyLevelInfo>>>>,
}

impl WeeklyManager {
    pub fn new(
        source: Arc<dyn LeaderboardSource>,
        clock: SharedClock,
        index_reload_interval: Duration,
        intervals: WeeklyIntervals,
    ) -> Self {
        WeeklyManager {
            index: RemoteResource::new(
                "weekly index",
                WeeklyIndexFetcher {
                    source: source.clone(),
                },
                index_reload_interval,
                clock.clone(),
            ),
            levels: LevelCollection::new(source, clock),
            intervals,
            populated_from: Mutex::new(None),
        }
    }

    pub fn index(&self) -> &RemoteResource<Vec<WeeklyLevelInfo>> {
        &self.index
    }

    pub async fn populate(&self) -> CacheResult<()> {
        if self.index.needs_reload() {
            if let Err(e) = self.index.reload().await {
                // an older index is still good enough to build from
                if self.index.cached().is_none() {
                    return Err(e);
                }
            }
        }
        let index = self.index.get().await?;

        let mut infos = index.as_ref().clone();
        infos.sort_by_key(|info| info.week);
        let hot_from = infos.len().saturating_sub(self.intervals.hot_count);

        info!(
            "Populating {} weekly levels, {} of them hot",
            infos.len(),
            infos.len() - hot_from
        );
        self.levels.rebuild(
            infos
                .into_iter()
                .enumerate()
                .map(|(i, info)| match i >= hot_from {
                    true => (info, self.intervals.hot),
                    false => (info, self.intervals.inactive),
                })
                .collect(),
        );
        *self
            .populated_from
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(index);
        Ok(())
    }

    fn index_changed(&self) -> bool {
        let populated_from = self
            .populated_from
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match (populated_from, self.index.cached()) {
            (Some(previous), Some(current)) => previous != current,
            (None, _) => true,
            (Some(_), None) => false,
        }
    }

    pub async fn maybe_reload(&self) -> ReloadReport {
        let mut report = self.index.maybe_reload().await;

        if self.levels.is_empty() || self.index_changed() {
            if let Err(e) = self.populate().await {
                report.merge(ReloadReport::failed("weekly levels", e));
            }
        }
        report.merge(self.levels.bulk_maybe_reload().await);
        report
    }

    pub fn time_until_next_reload(&self) -> Option<Duration> {
        [
            Some(self.index.time_until_next_reload()),
            self.levels.time_until_next_reload(),
        ]
        .into_iter()
        .flatten()
        .min()
    }

    /// The level with the highest week number.
    pub async fn get_latest(&self) -> Option<Arc<WeeklyLevel>> {
        self.maybe_reload().await;
        self.levels
            .levels()
            .into_iter()
            .max_by_key(|level| level.info.week)
    }

    pub async fn get_by_week(&self, week: u32) -> Option<Arc<WeeklyLevel>> {
        self.maybe_reload().await;
        self.levels.find(|info| info.week == week)
    }

    /// Current levels sorted by week, without checking freshness.
    pub fn levels(&self) -> Vec<Arc<WeeklyLevel>> {
        self.levels.levels()
    }
}

impl Reloadable for WeeklyManager {
    fn time_until_next_reload(&self) -> Option<Duration> {
        WeeklyManager::time_until_next_reload(self)
    }

    fn maybe_reload(&self) -> BoxFuture<'_, ReloadReport> {
        WeeklyManager::maybe_reload(self).boxed()
    }
}
