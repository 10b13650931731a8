use futures::future::BoxFuture;

use crate::cache::buckets::CampaignBuckets;
use crate::error::CacheResult;
use crate::leaderboard::LevelLeaderboards;
use crate::level::{CampaignLevelInfo, LevelIdentity, WeeklyLevelInfo};

/// Where the cache gets its data from. Every call may fail and must be safe
/// to repeat.
pub trait LeaderboardSource: Send + Sync {
    /// Both the "any" and "unbroken" leaderboards of a level.
    fn fetch_leaderboards<'a>(
        &'a self,
        level: &'a LevelIdentity,
    ) -> BoxFuture<'a, CacheResult<LevelLeaderboards>>;

    fn fetch_level_catalog(&self) -> BoxFuture<'_, CacheResult<Vec<CampaignLevelInfo>>>;

    fn fetch_weekly_index(&self) -> BoxFuture<'_, CacheResult<Vec<WeeklyLevelInfo>>>;

    fn fetch_buckets(&self) -> BoxFuture<'_, CacheResult<CampaignBuckets>>;
}
