use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Keyed async locks held across lookup-then-create.
///
/// Only serializes callers sharing this value inside one process. Other
/// processes racing on the same names can still create duplicates.
#[derive(Debug, Clone, Default)]
pub struct CreationLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl CreationLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: impl Into<String>) -> OwnedMutexGuard<()> {
        let slot = {
            let mut map = self.inner.lock().await;
            // Entries nobody holds or waits on can go.
            map.retain(|_, m| Arc::strong_count(m) > 1);
            map.entry(key.into()).or_default().clone()
        };
        slot.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = CreationLocks::new();
        let guard = locks.lock("application:foo").await;

        let other = locks.clone();
        let waiter = tokio::spawn(async move {
            let _g = other.lock("application:foo").await;
        });
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should acquire after release")
            .unwrap();
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = CreationLocks::new();
        let _a = locks.lock("application:a").await;
        tokio::time::timeout(Duration::from_millis(200), locks.lock("application:b"))
            .await
            .expect("unrelated key must not wait");
    }
}
