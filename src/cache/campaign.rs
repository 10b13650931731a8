use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use crate::cache::collection::{Level, LevelCollection};
use crate::cache::resource::{ReloadReport, Reloadable};
use crate::client::LeaderboardSource;
use crate::clock::SharedClock;
use crate::error::CacheResult;
use crate::level::{CampaignLevelInfo, LevelCode};

pub type CampaignLevel = Level<CampaignLevelInfo>;

/// Campaign levels, built once from the static catalog, all sharing the same
/// reload interval.
pub struct CampaignManager {
    source: Arc<dyn LeaderboardSource>,
    levels: LevelCollection<CampaignLevelInfo>,
    reload_interval: Duration,
}

impl CampaignManager {
    pub fn new(
        source: Arc<dyn LeaderboardSource>,
        clock: SharedClock,
        reload_interval: Duration,
    ) -> Self {
        CampaignManager {
            levels: LevelCollection::new(source.clone(), clock),
            source,
            reload_interval,
        }
    }

    pub async fn populate(&self) -> CacheResult<()> {
        let infos = self.source.fetch_level_catalog().await?;
        info!("Populating {} campaign levels", infos.len());
        self.levels.rebuild(
            infos
                .into_iter()
                .map(|info| (info, self.reload_interval))
                .collect(),
        );
        Ok(())
    }

    pub async fn maybe_reload(&self) -> ReloadReport {
        let mut report = ReloadReport::default();
        if self.levels.is_empty() {
            if let Err(e) = self.populate().await {
                report.merge(ReloadReport::failed("campaign catalog", e));
            }
        }
        report.merge(self.levels.bulk_maybe_reload().await);
        report
    }

    pub fn time_until_next_reload(&self) -> Option<Duration> {
        self.levels.time_until_next_reload()
    }

    /// Level for a textual code such as "2-5c". Unparseable codes find nothing.
    pub async fn get_by_code(&self, code: &str) -> Option<Arc<CampaignLevel>> {
        let code = LevelCode::parse(code)?;
        self.get_by_level_code(code).await
    }

    pub async fn get_by_level_code(&self, code: LevelCode) -> Option<Arc<CampaignLevel>> {
        self.maybe_reload().await;
        self.levels.find(|info| info.code == code)
    }

    /// Current levels in catalog order, without checking freshness.
    pub fn levels(&self) -> Vec<Arc<CampaignLevel>> {
        self.levels.levels()
    }
}

impl Reloadable for CampaignManager {
    fn time_until_next_reload(&self) -> Option<Duration> {
        CampaignManager::time_until_next_reload(self)
    }

    fn maybe_reload(&self) -> BoxFuture<'_, ReloadReport> {
        CampaignManager::maybe_reload(self).boxed()
    }
}
