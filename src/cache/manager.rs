use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::cache::buckets::{campaign_buckets, CampaignBuckets};
use crate::cache::campaign::CampaignManager;
use crate::cache::resource::{
    min_time_until_next_reload, ReloadReport, Reloadable, RemoteResource,
};
use crate::cache::weekly::{WeeklyIntervals, WeeklyManager};
use crate::client::LeaderboardSource;
use crate::clock::SharedClock;
use crate::config::Settings;

/// Owns every cached collection and keeps them fresh. Built once at startup
/// and shared with whoever needs to read the cache.
pub struct CacheManager {
    campaign: CampaignManager,
    weekly: WeeklyManager,
    buckets: RemoteResource<CampaignBuckets>,
    clock: SharedClock,
    idle_poll_interval: Duration,
    retry_delay: Duration,
}

impl CacheManager {
    pub fn new(source: Arc<dyn LeaderboardSource>, clock: SharedClock, settings: &Settings) -> Self {
        CacheManager {
            campaign: CampaignManager::new(
                source.clone(),
                clock.clone(),
                settings.campaign_reload_interval(),
            ),
            weekly: WeeklyManager::new(
                source.clone(),
                clock.clone(),
                settings.weekly_index_reload_interval(),
                WeeklyIntervals {
                    hot: settings.weekly_reload_interval(),
                    inactive: settings.inactive_weekly_reload_interval(),
                    hot_count: settings.hot_weekly_count,
                },
            ),
            buckets: campaign_buckets(source, clock.clone(), settings.buckets_reload_interval()),
            clock,
            idle_poll_interval: settings.idle_poll_interval(),
            retry_delay: settings.retry_delay(),
        }
    }

    pub fn campaign(&self) -> &CampaignManager {
        &self.campaign
    }

    pub fn weekly(&self) -> &WeeklyManager {
        &self.weekly
    }

    pub fn buckets(&self) -> &RemoteResource<CampaignBuckets> {
        &self.buckets
    }

    fn tracked(&self) -> [&dyn Reloadable; 3] {
        [&self.campaign, &self.weekly, &self.buckets]
    }

    /// Initial population of the level collections. Failures are logged, the
    /// next reload pass retries them.
    pub async fn populate(&self) {
        if let Err(e) = self.campaign.populate().await {
            error!("Could not populate campaign levels. {e}");
        }
        if let Err(e) = self.weekly.populate().await {
            error!("Could not populate weekly levels. {e}");
        }
    }

    /// Refresh whatever is due. Safe to call at any time, as often as needed.
    pub async fn maybe_reload(&self) -> ReloadReport {
        let mut report = ReloadReport::default();
        for reloadable in self.tracked() {
            report.merge(reloadable.maybe_reload().await);
        }
        report
    }

    /// Time until the soonest tracked resource becomes stale.
    pub fn next_reload_in(&self) -> Duration {
        min_time_until_next_reload(self.tracked()).unwrap_or(self.idle_poll_interval)
    }

    /// Keep the cache fresh until cancelled: sleep until the soonest resource
    /// is due, reload everything due, repeat. After a pass with failures the
    /// sleep lasts at least `retry_delay`.
    pub async fn background_update(&self, cancel: CancellationToken) {
        self.populate().await;
        let mut min_sleep = Duration::ZERO;

        loop {
            let next_reload = self.next_reload_in().max(min_sleep);
            info!("[CacheManager] Next reload in {}s", next_reload.as_secs_f64());

            tokio::select! {
                _ = cancel.cancelled() => {
                    info!("[CacheManager] Background update stopped");
                    return;
                }
                _ = self.clock.sleep(next_reload) => {}
            }

            let report = self.maybe_reload().await;
            min_sleep = match report.is_success() {
                true => {
                    info!("[CacheManager] Reloaded {} resources", report.reloaded);
                    Duration::ZERO
                }
                false => {
                    warn!(
                        "[CacheManager] Reloaded {} resources, {} failed, retrying in at least {}s",
                        report.reloaded,
                        report.failures.len(),
                        self.retry_delay.as_secs()
                    );
                    self.retry_delay
                }
            };
        }
    }
}
