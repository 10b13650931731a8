use futures::future::{BoxFuture, FutureExt};
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use crate::cache::resource::{
    bulk_maybe_reload, min_time_until_next_reload, Fetcher, ReloadReport, RemoteResource,
};
use crate::client::LeaderboardSource;
use crate::clock::SharedClock;
use crate::error::CacheResult;
use crate::leaderboard::LevelLeaderboards;
use crate::level::{LevelIdentity, LevelInfo, LevelKey};

struct LevelFetcher {
    source: Arc<dyn LeaderboardSource>,
    identity: LevelIdentity,
}

impl Fetcher<LevelLeaderboards> for LevelFetcher {
    fn fetch(&self) -> BoxFuture<'_, CacheResult<LevelLeaderboards>> {
        self.source.fetch_leaderboards(&self.identity)
    }
}

/// A level and its cached leaderboards.
pub struct Level<I> {
    pub info: I,
    leaderboards: RemoteResource<LevelLeaderboards>,
}

impl<I: LevelInfo> Level<I> {
    pub fn new(
        info: I,
        reload_interval: Duration,
        source: Arc<dyn LeaderboardSource>,
        clock: SharedClock,
    ) -> Self {
        let identity = info.identity();
        let leaderboards = RemoteResource::new(
            format!("level {identity}"),
            LevelFetcher { source, identity },
            reload_interval,
            clock,
        );
        Level { info, leaderboards }
    }

    pub fn key(&self) -> LevelKey {
        self.info.key()
    }
}

impl<I> Deref for Level<I> {
    type Target = RemoteResource<LevelLeaderboards>;

    fn deref(&self) -> &Self::Target {
        &self.leaderboards
    }
}

/// Keyed set of levels sharing one source. Rebuilding the set keeps the
/// resources (and cached leaderboards) of levels that are still listed.
pub struct LevelCollection<I> {
    source: Arc<dyn LeaderboardSource>,
    clock: SharedClock,
    levels: RwLock<Vec<Arc<Level<I>>>>,
}

impl<I: LevelInfo> LevelCollection<I> {
    pub fn new(source: Arc<dyn LeaderboardSource>, clock: SharedClock) -> Self {
        LevelCollection {
            source,
            clock,
            levels: RwLock::new(vec![]),
        }
    }

    pub fn levels(&self) -> Vec<Arc<Level<I>>> {
        self.levels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn len(&self) -> usize {
        self.levels.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, predicate: impl Fn(&I) -> bool) -> Option<Arc<Level<I>>> {
        self.levels
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .find(|level| predicate(&level.info))
            .cloned()
    }

    /// Replace the set of levels, in the given order, each with its interval.
    pub fn rebuild(&self, infos: Vec<(I, Duration)>) {
        let mut existing = self
            .levels()
            .into_iter()
            .map(|level| (level.key(), level))
            .collect::<HashMap<LevelKey, Arc<Level<I>>>>();

        let levels = infos
            .into_iter()
            .map(|(info, interval)| match existing.remove(&info.key()) {
                Some(level) if level.info == info => {
                    level.set_reload_interval(interval);
                    level
                }
                _ => Arc::new(Level::new(
                    info,
                    interval,
                    self.source.clone(),
                    self.clock.clone(),
                )),
            })
            .collect::<Vec<_>>();

        *self.levels.write().unwrap_or_else(PoisonError::into_inner) = levels;
    }

    pub fn time_until_next_reload(&self) -> Option<Duration> {
        let levels = self.levels();
        min_time_until_next_reload(levels.iter().map(|level| &level.leaderboards))
    }

    pub fn bulk_maybe_reload(&self) -> BoxFuture<'_, ReloadReport> {
        async move {
            let levels = self.levels();
            bulk_maybe_reload(levels.iter().map(|level| &level.leaderboards)).await
        }
        .boxed()
    }
}
