use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

use crate::cache::resource::{Fetcher, RemoteResource};
use crate::client::LeaderboardSource;
use crate::clock::SharedClock;
use crate::error::CacheResult;
use crate::leaderboard::LeaderboardType;

/// A slice of a level's full score distribution, including scores beyond the
/// top entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    pub start_rank: u32,
    pub end_rank: u32,
    pub start_value: f64,
    pub end_value: f64,
    #[serde(default)]
    pub count: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LevelBuckets {
    #[serde(default)]
    pub any: Vec<Bucket>,
    #[serde(default)]
    pub unbroken: Vec<Bucket>,
}

/// Precomputed score buckets of every campaign level, keyed by level id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CampaignBuckets(HashMap<String, LevelBuckets>);

impl CampaignBuckets {
    pub fn new(buckets: HashMap<String, LevelBuckets>) -> Self {
        CampaignBuckets(buckets)
    }

    pub fn for_level(&self, level_id: &str, kind: LeaderboardType) -> Option<&[Bucket]> {
        self.0.get(level_id).map(|buckets| match kind {
            LeaderboardType::Any => buckets.any.as_slice(),
            LeaderboardType::Unbroken => buckets.unbroken.as_slice(),
        })
    }

    /// Rank range a score would fall in on a level, lower values being better.
    pub fn rank_range_for(
        &self,
        level_id: &str,
        kind: LeaderboardType,
        value: f64,
    ) -> Option<(u32, u32)> {
        self.for_level(level_id, kind)?
            .iter()
            .find(|bucket| value >= bucket.start_value && value <= bucket.end_value)
            .map(|bucket| (bucket.start_rank, bucket.end_rank))
    }
}

impl Deref for CampaignBuckets {
    type Target = HashMap<String, LevelBuckets>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

struct BucketsFetcher {
    source: Arc<dyn LeaderboardSource>,
}

impl Fetcher<CampaignBuckets> for BucketsFetcher {
    fn fetch(&self) -> BoxFuture<'_, CacheResult<CampaignBuckets>> {
        self.source.fetch_buckets()
    }
}

pub fn campaign_buckets(
    source: Arc<dyn LeaderboardSource>,
    clock: SharedClock,
    reload_interval: Duration,
) -> RemoteResource<CampaignBuckets> {
    RemoteResource::new(
        "campaign buckets",
        BucketsFetcher { source },
        reload_interval,
        clock,
    )
}
