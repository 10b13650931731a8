use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::cache::CacheManager;

/// Runs the cache background update as a tokio task that can be stopped.
pub struct Scheduler {
    cache: Arc<CacheManager>,
    token: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl Scheduler {
    pub fn new(cache: Arc<CacheManager>) -> Self {
        Scheduler {
            cache,
            token: CancellationToken::new(),
            handle: None,
        }
    }

    pub fn cache(&self) -> &Arc<CacheManager> {
        &self.cache
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().map_or(false, |h| !h.is_finished())
    }

    /// Start the background update. Calling it again while running is a no-op.
    pub fn start(&mut self) {
        if self.is_running() {
            return;
        }
        info!("Starting cache background update.");
        let cache = self.cache.clone();
        let token = self.token.child_token();
        self.handle = Some(tokio::spawn(async move {
            cache.background_update(token).await
        }));
    }

    /// Stop the background update and wait for it to finish.
    pub async fn shutdown(mut self) {
        self.token.cancel();
        if let Some(handle) = self.handle.take() {
            if let Err(e) = handle.await {
                error!("Cache background update ended abnormally. {e}");
            }
        }
        info!("Cache background update shut down.");
    }
}
