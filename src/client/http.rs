use futures::future::{BoxFuture, FutureExt};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::{fmt, path::PathBuf, time::Duration};
use tracing::debug;

use crate::{
    cache::buckets::CampaignBuckets,
    client::{local::load_campaign_level_infos, source::LeaderboardSource},
    config::Settings,
    error::{CacheError, CacheResult},
    leaderboard::{Leaderboard, LeaderboardType, LevelLeaderboards},
    level::{CampaignLevelInfo, LevelIdentity, WeeklyLevelInfo},
};

enum Endpoint<'a> {
    Leaderboard(&'a str, LeaderboardType),
    WeeklyIndex,
    CampaignBuckets,
}

impl fmt::Display for Endpoint<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Endpoint::Leaderboard(id, LeaderboardType::Any) => {
                write!(f, "/manifests/leaderboards/scoreboard/{}.json", id)
            }
            Endpoint::Leaderboard(id, LeaderboardType::Unbroken) => {
                write!(f, "/manifests/leaderboards/scoreboard/{}_unbroken.json", id)
            }
            Endpoint::WeeklyIndex => {
                write!(f, "/manifests/weeklyChallenges.json")
            }
            Endpoint::CampaignBuckets => {
                write!(f, "/manifests/leaderboards/buckets/campaign.json")
            }
        }
    }
}

/// Leaderboard source backed by the public leaderboard manifests, with the
/// campaign catalog read from the local metadata file.
pub struct HttpSource {
    http_client: Client,
    base_url: String,
    campaign_levels_path: PathBuf,
}

impl HttpSource {
    pub fn new(
        base_url: String,
        timeout: Duration,
        campaign_levels_path: PathBuf,
    ) -> CacheResult<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            base_url,
            campaign_levels_path,
        })
    }

    pub fn from_settings(settings: &Settings) -> CacheResult<Self> {
        HttpSource::new(
            settings.api_base_url.clone(),
            settings.api_timeout(),
            PathBuf::from(&settings.campaign_levels_path),
        )
    }

    async fn get(&self, endpoint: &Endpoint<'_>) -> CacheResult<String> {
        let url = format!("{}{}", self.base_url, endpoint);
        debug!("GET {url}");

        let response = self.http_client.get(&url).send().await?;

        match response.status() {
            StatusCode::OK => response
                .text()
                .await
                .map_err(|e| CacheError::Parse(e.to_string())),
            StatusCode::NOT_FOUND => Err(CacheError::Fetch(format!("{} not found", url))),
            _ => Err(CacheError::Http(format!("{} for {}", response.status(), url))),
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &Endpoint<'_>) -> CacheResult<T> {
        let body = self.get(endpoint).await?;
        Ok(serde_json::from_str::<T>(&body)?)
    }

    async fn get_leaderboard(&self, id: &str, kind: LeaderboardType) -> CacheResult<Leaderboard> {
        let mut leaderboard = self
            .get_json::<Leaderboard>(&Endpoint::Leaderboard(id, kind))
            .await?;
        leaderboard.assign_missing_ranks();
        Ok(leaderboard)
    }
}

impl LeaderboardSource for HttpSource {
    fn fetch_leaderboards<'a>(
        &'a self,
        level: &'a LevelIdentity,
    ) -> BoxFuture<'a, CacheResult<LevelLeaderboards>> {
        async move {
            let (any, unbroken) = futures::try_join!(
                self.get_leaderboard(level.id(), LeaderboardType::Any),
                self.get_leaderboard(level.id(), LeaderboardType::Unbroken),
            )?;
            Ok(LevelLeaderboards { any, unbroken })
        }
        .boxed()
    }

    fn fetch_level_catalog(&self) -> BoxFuture<'_, CacheResult<Vec<CampaignLevelInfo>>> {
        async move { Ok(load_campaign_level_infos(&self.campaign_levels_path).await) }.boxed()
    }

    fn fetch_weekly_index(&self) -> BoxFuture<'_, CacheResult<Vec<WeeklyLevelInfo>>> {
        async move { self.get_json(&Endpoint::WeeklyIndex).await }.boxed()
    }

    fn fetch_buckets(&self) -> BoxFuture<'_, CacheResult<CampaignBuckets>> {
        async move { self.get_json(&Endpoint::CampaignBuckets).await }.boxed()
    }
}
