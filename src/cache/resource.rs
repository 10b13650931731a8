//! Time-to-live wrapper around a remotely fetched value.
//!
//! A [`RemoteResource`] is lazy: it only fetches when asked to, either through
//! [`RemoteResource::get`] on an empty cache or through an explicit reload
//! driven by the cache manager. A failed reload keeps the previous value and
//! timestamp so the next check retries it.

use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture, FutureExt};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tracing::{debug, error, warn};

use crate::clock::{to_chrono, to_std, SharedClock};
use crate::error::{CacheError, CacheResult};

const MIN_RELOAD_INTERVAL: Duration = Duration::from_millis(1);

/// Produces a fresh value for a [`RemoteResource`].
pub trait Fetcher<T>: Send + Sync {
    fn fetch(&self) -> BoxFuture<'_, CacheResult<T>>;
}

/// Adapter turning a closure into a [`Fetcher`].
pub struct FnFetcher<F>(pub F);

impl<T, F> Fetcher<T> for FnFetcher<F>
where
    F: Fn() -> BoxFuture<'static, CacheResult<T>> + Send + Sync,
{
    fn fetch(&self) -> BoxFuture<'_, CacheResult<T>> {
        (self.0)()
    }
}

/// Anything the cache manager can keep fresh.
pub trait Reloadable: Send + Sync {
    /// `None` when there is nothing to reload yet.
    fn time_until_next_reload(&self) -> Option<Duration>;

    fn maybe_reload(&self) -> BoxFuture<'_, ReloadReport>;
}

/// Outcome of a (bulk) reload pass.
#[derive(Debug, Default)]
pub struct ReloadReport {
    pub reloaded: usize,
    pub failures: Vec<(String, CacheError)>,
}

impl ReloadReport {
    pub fn failed(name: &str, error: CacheError) -> Self {
        ReloadReport {
            reloaded: 0,
            failures: vec![(name.to_string(), error)],
        }
    }

    pub fn merge(&mut self, other: ReloadReport) {
        self.reloaded += other.reloaded;
        self.failures.extend(other.failures);
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}

struct ResourceState<T> {
    value: Option<Arc<T>>,
    last_fetch: Option<DateTime<Utc>>,
    reload_interval: Duration,
    // number of completed reloads, used to skip redundant ones
    generation: u64,
}

pub struct RemoteResource<T> {
    name: String,
    fetcher: Box<dyn Fetcher<T>>,
    clock: SharedClock,
    state: Mutex<ResourceState<T>>,
    reload_lock: tokio::sync::Mutex<()>,
}

impl<T: Send + Sync + 'static> RemoteResource<T> {
    pub fn new(
        name: impl Into<String>,
        fetcher: impl Fetcher<T> + 'static,
        reload_interval: Duration,
        clock: SharedClock,
    ) -> Self {
        RemoteResource {
            name: name.into(),
            fetcher: Box::new(fetcher),
            clock,
            state: Mutex::new(ResourceState {
                value: None,
                last_fetch: None,
                reload_interval: reload_interval.max(MIN_RELOAD_INTERVAL),
                generation: 0,
            }),
            reload_lock: tokio::sync::Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn state(&self) -> MutexGuard<'_, ResourceState<T>> {
        // The state is only ever replaced wholesale, a poisoned lock still holds
        // a consistent value.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn needs_reload(&self) -> bool {
        let state = self.state();
        match state.last_fetch {
            None => true,
            Some(last_fetch) => {
                to_std(self.clock.now() - last_fetch) >= state.reload_interval
            }
        }
    }

    /// Zero when a reload is already due.
    pub fn time_until_next_reload(&self) -> Duration {
        let state = self.state();
        match state.last_fetch {
            None => Duration::ZERO,
            Some(last_fetch) => {
                to_std(last_fetch + to_chrono(state.reload_interval) - self.clock.now())
            }
        }
    }

    pub fn reload_interval(&self) -> Duration {
        self.state().reload_interval
    }

    pub fn set_reload_interval(&self, reload_interval: Duration) {
        self.state().reload_interval = reload_interval.max(MIN_RELOAD_INTERVAL);
    }

    pub fn last_reload_time(&self) -> Option<DateTime<Utc>> {
        self.state().last_fetch
    }

    /// Cached value without triggering any fetch.
    pub fn cached(&self) -> Option<Arc<T>> {
        self.state().value.clone()
    }

    /// Fetch and swap in a new value. Concurrent calls are collapsed: a caller
    /// that waited for another reload to succeed does not fetch again.
    pub async fn reload(&self) -> CacheResult<()> {
        let generation = self.state().generation;
        let _guard = self.reload_lock.lock().await;
        if self.state().generation != generation {
            debug!("{} was reloaded while waiting, skipping", self.name);
            return Ok(());
        }

        let value = self.fetcher.fetch().await?;
        let now = self.clock.now();

        let mut state = self.state();
        state.value = Some(Arc::new(value));
        state.last_fetch = Some(state.last_fetch.map_or(now, |last| last.max(now)));
        state.generation += 1;
        debug!("Reloaded {}", self.name);
        Ok(())
    }

    /// Cached value, fetched first if the resource was never loaded.
    pub async fn get(&self) -> CacheResult<Arc<T>> {
        if let Some(value) = self.cached() {
            return Ok(value);
        }
        self.reload().await?;
        self.cached()
            .ok_or_else(|| CacheError::Fetch(format!("{} has no cached value", self.name)))
    }
}

impl<T: Send + Sync + 'static> Reloadable for RemoteResource<T> {
    fn time_until_next_reload(&self) -> Option<Duration> {
        Some(RemoteResource::time_until_next_reload(self))
    }

    fn maybe_reload(&self) -> BoxFuture<'_, ReloadReport> {
        async move {
            if !self.needs_reload() {
                return ReloadReport::default();
            }
            match self.reload().await {
                Ok(()) => ReloadReport {
                    reloaded: 1,
                    failures: vec![],
                },
                Err(e) => ReloadReport::failed(&self.name, e),
            }
        }
        .boxed()
    }
}

/// Reload, concurrently, every resource that is due. A failing resource never
/// prevents its siblings from being reloaded.
pub async fn bulk_maybe_reload<'a, R, I>(resources: I) -> ReloadReport
where
    R: Reloadable + ?Sized + 'a,
    I: IntoIterator<Item = &'a R>,
{
    let reports = join_all(resources.into_iter().map(|r| r.maybe_reload())).await;

    reports
        .into_iter()
        .fold(ReloadReport::default(), |mut acc, report| {
            for (name, e) in report.failures.iter() {
                match e.is_transient() {
                    true => warn!("Could not reload {name}, will retry. {e}"),
                    false => error!("Could not reload {name}. {e}"),
                }
            }
            acc.merge(report);
            acc
        })
}

/// Soonest reload across several reloadables, `None` if none tracks anything.
pub fn min_time_until_next_reload<'a, R, I>(reloadables: I) -> Option<Duration>
where
    R: Reloadable + ?Sized + 'a,
    I: IntoIterator<Item = &'a R>,
{
    reloadables
        .into_iter()
        .filter_map(|r| r.time_until_next_reload())
        .min()
}


#[cfg(test)]
mod tests {
    use super::testing::CountingFetcher;
    use super::*;
    use crate::clock::{Clock, ManualClock};
    use chrono::TimeZone;

    fn clock() -> ManualClock {
        ManualClock::new(Utc.with_ymd_and_hms(2023, 6, 1, 12, 0, 0).unwrap())
    }

    fn resource(
        fetcher: &CountingFetcher,
        interval: Duration,
        clock: &ManualClock,
    ) -> RemoteResource<usize> {
        RemoteResource::new("test", fetcher.clone(), interval, Arc::new(clock.clone()))
    }

    #[tokio::test]
    async fn fresh_after_reload_and_stale_after_interval() {
        let clock = clock();
        let fetcher = CountingFetcher::default();
        let resource = resource(&fetcher, Duration::from_secs(60), &clock);

        assert!(resource.needs_reload());
        assert_eq!(resource.time_until_next_reload(), Duration::ZERO);

        resource.reload().await.unwrap();
        assert!(!resource.needs_reload());
        assert_eq!(resource.time_until_next_reload(), Duration::from_secs(60));

        clock.advance(Duration::from_secs(59));
        assert!(!resource.needs_reload());
        assert_eq!(resource.time_until_next_reload(), Duration::from_secs(1));

        clock.advance(Duration::from_secs(1));
        assert!(resource.needs_reload());
        assert_eq!(resource.time_until_next_reload(), Duration::ZERO);
    }

    #[tokio::test]
    async fn get_fetches_only_when_empty() {
        let clock = clock();
        let fetcher = CountingFetcher::default();
        let resource = resource(&fetcher, Duration::from_secs(60), &clock);

        assert!(resource.cached().is_none());
        assert_eq!(*resource.get().await.unwrap(), 1);
        clock.advance(Duration::from_secs(3600));
        // stale, but get still serves the cached value
        assert_eq!(*resource.get().await.unwrap(), 1);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn failed_reload_keeps_value_and_timestamp() {
        let clock = clock();
        let fetcher = CountingFetcher::default();
        let resource = resource(&fetcher, Duration::from_secs(60), &clock);

        resource.reload().await.unwrap();
        let fetched_at = resource.last_reload_time();
        clock.advance(Duration::from_secs(120));

        fetcher.set_failing(true);
        assert!(resource.reload().await.is_err());
        assert_eq!(*resource.cached().unwrap(), 1);
        assert_eq!(resource.last_reload_time(), fetched_at);
        assert!(resource.needs_reload());

        fetcher.set_failing(false);
        resource.reload().await.unwrap();
        assert_eq!(*resource.cached().unwrap(), 3);
        assert_eq!(resource.last_reload_time(), Some(clock.now()));
    }

    #[tokio::test]
    async fn get_on_empty_resource_surfaces_fetch_error() {
        let clock = clock();
        let fetcher = CountingFetcher::default();
        fetcher.set_failing(true);
        let resource = resource(&fetcher, Duration::from_secs(60), &clock);

        assert!(matches!(resource.get().await, Err(CacheError::Http(_))));
        assert!(resource.last_reload_time().is_none());
    }

    #[tokio::test]
    async fn interval_change_is_picked_up_immediately() {
        let clock = clock();
        let fetcher = CountingFetcher::default();
        let resource = resource(&fetcher, Duration::from_secs(3600), &clock);

        resource.reload().await.unwrap();
        clock.advance(Duration::from_secs(600));
        assert!(!resource.needs_reload());

        resource.set_reload_interval(Duration::from_secs(300));
        assert!(resource.needs_reload());

        resource.set_reload_interval(Duration::ZERO);
        assert_eq!(resource.reload_interval(), MIN_RELOAD_INTERVAL);
    }

    #[tokio::test]
    async fn concurrent_reloads_fetch_once() {
        let clock = clock();
        let fetcher = CountingFetcher {
            delay: Some(Duration::from_millis(20)),
            ..Default::default()
        };
        let resource = resource(&fetcher, Duration::from_secs(60), &clock);

        let results = join_all((0..5).map(|_| resource.reload())).await;

        assert!(results.iter().all(|r| r.is_ok()));
        assert_eq!(fetcher.calls(), 1);
        assert_eq!(*resource.cached().unwrap(), 1);
    }

    #[tokio::test]
    async fn bulk_reload_isolates_failures() {
        let clock = clock();
        let healthy = CountingFetcher::default();
        let broken = CountingFetcher::default();
        broken.set_failing(true);

        let resources = vec![
            resource(&healthy, Duration::from_secs(60), &clock),
            resource(&broken, Duration::from_secs(60), &clock),
            resource(&healthy, Duration::from_secs(60), &clock),
        ];

        let report = bulk_maybe_reload(resources.iter()).await;

        assert_eq!(report.reloaded, 2);
        assert_eq!(report.failures.len(), 1);
        assert!(resources[0].cached().is_some());
        assert!(resources[1].cached().is_none());
        assert!(resources[2].cached().is_some());

        // nothing due anymore except the broken one
        let report = bulk_maybe_reload(resources.iter()).await;
        assert_eq!(report.reloaded, 0);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(healthy.calls(), 2);
    }

    #[tokio::test]
    async fn closures_can_be_used_as_fetchers() {
        let clock = clock();
        let resource = RemoteResource::new(
            "closure",
            FnFetcher(|| async { Ok::<_, CacheError>("hello".to_string()) }.boxed()),
            Duration::from_secs(1),
            Arc::new(clock),
        );
        assert_eq!(resource.get().await.unwrap().as_str(), "hello");
    }

    #[test]
    fn min_time_ignores_empty_reloadables() {
        struct Fixed(Option<Duration>);

        impl Reloadable for Fixed {
            fn time_until_next_reload(&self) -> Option<Duration> {
                self.0
            }

            fn maybe_reload(&self) -> BoxFuture<'_, ReloadReport> {
                async { ReloadReport::default() }.boxed()
            }
        }

        let reloadables: Vec<Box<dyn Reloadable>> = vec![
            Box::new(Fixed(None)),
            Box::new(Fixed(Some(Duration::from_secs(30)))),
            Box::new(Fixed(Some(Duration::from_secs(10)))),
        ];
        assert_eq!(
            min_time_until_next_reload(reloadables.iter().map(|r| r.as_ref())),
            Some(Duration::from_secs(10))
        );
        assert_eq!(min_time_until_next_reload::<Fixed, _>([]), None);
    }
}
