//! Bounded upload workers with an outer wait timeout

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tracing::{debug, warn};

use crate::error::{AppError, Result};
use crate::storage::ObjectStore;

/// Runs store puts as detached tasks, at most `workers` at a time.
///
/// The timeout passed to [`UploadPool::put`] bounds how long the caller
/// waits. It does not cancel the upload: a put that outlives the wait keeps
/// running and may still land in the store with no catalog entry.
pub struct UploadPool {
    store: Arc<dyn ObjectStore>,
    permits: Arc<Semaphore>,
}

impl UploadPool {
    pub fn new(store: Arc<dyn ObjectStore>, workers: usize) -> Self {
        Self {
            store,
            permits: Arc::new(Semaphore::new(workers)),
        }
    }

    pub fn store(&self) -> &Arc<dyn ObjectStore> {
        &self.store
    }

    /// Hand the put to a worker and wait up to `timeout` for its result
    pub async fn put(
        &self,
        data: Vec<u8>,
        key: String,
        content_type: &'static str,
        timeout: Duration,
    ) -> Result<String> {
        let store = self.store.clone();
        let permits = self.permits.clone();
        let task_key = key.clone();

        let handle = tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| AppError::Internal("upload pool closed".to_string()))?;
            store.put(data, &task_key, content_type).await
        });

        let url = match tokio::time::timeout(timeout, handle).await {
            Ok(Ok(result)) => result?,
            Ok(Err(join_error)) => {
                return Err(AppError::Internal(format!(
                    "upload task for {} aborted: {}",
                    key, join_error
                )));
            }
            Err(_) => {
                warn!(
                    key = %key,
                    timeout_secs = timeout.as_secs_f64(),
                    "Stopped waiting for upload, it may still complete"
                );
                return Err(AppError::RelayFailed(format!(
                    "upload of {} timed out after {:?}",
                    key, timeout
                )));
            }
        };

        debug!(key = %key, url = %url, "Upload finished");
        Ok(url)
    }
}
