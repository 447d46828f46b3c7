// =============================================================================
// CACHE MODULE
// =============================================================================
// Redis-backed shared state for the gateway:
// - the order sync checkpoint (when the last run finished) and its report
// - short-lived locks: one reconciliation at a time, one decision per
//   payment verification at a time
//
// Locks are `SET key <owner> NX PX <ttl>`; extend and release only touch
// the key if it still holds our owner token, so an expired lock taken over
// by another replica is never extended or released by us.
//
// The sync and the payment decisions only see the `Coordination` trait.
// =============================================================================

use chrono::{DateTime, Utc};
use redis::{aio::ConnectionManager, RedisError};
use serde::{de::DeserializeOwned, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use uuid::Uuid;

use crate::metrics;
use crate::models::SyncReport;

pub const LAST_ORDER_SYNC_KEY: &str = "admin:order-sync:last-run-at";
pub const LAST_SYNC_REPORT_KEY: &str = "admin:order-sync:last-report";
pub const RECONCILE_LOCK: &str = "admin:lock:inventory-reconcile";

const RELEASE_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("DEL", KEYS[1])
else
    return 0
end
"#;

const EXTEND_SCRIPT: &str = r#"
if redis.call("GET", KEYS[1]) == ARGV[1] then
    return redis.call("PEXPIRE", KEYS[1], ARGV[2])
else
    return 0
end
"#;

/// Key of the lock guarding decisions on one payment verification
pub fn verification_lock_key(id: &str) -> String {
    format!("admin:lock:payment-verification:{}", id)
}

// -----------------------------------------------------------------------------
// LOCK GUARD
// -----------------------------------------------------------------------------
/// Proof of holding a lock; hand it back to `Coordination::release`
#[derive(Debug)]
pub struct LockGuard {
    key: String,
    owner: Uuid,
}

impl LockGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

fn ttl_millis(ttl: Duration) -> u64 {
    ttl.as_millis().clamp(1, u64::MAX as u128) as u64
}

// -----------------------------------------------------------------------------
// COORDINATION
// -----------------------------------------------------------------------------
/// Locks and the order sync checkpoint shared between gateway replicas
pub trait Coordination: Send + Sync {
    /// Try to take `key` for at most `ttl`. `None` means someone else holds it.
    fn try_lock(
        &self,
        key: &str,
        ttl: Duration,
    ) -> impl Future<Output = Result<Option<LockGuard>, RedisError>> + Send;

    /// Push the expiry of a held lock out to `ttl` from now.
    /// `false` means the lock expired and may belong to someone else.
    fn extend(
        &self,
        guard: &LockGuard,
        ttl: Duration,
    ) -> impl Future<Output = Result<bool, RedisError>> + Send;

    /// Release a lock if we still own it
    fn release(&self, guard: LockGuard) -> impl Future<Output = Result<(), RedisError>> + Send;

    fn last_order_sync(
        &self,
    ) -> impl Future<Output = Result<Option<DateTime<Utc>>, RedisError>> + Send;

    fn set_last_order_sync(
        &self,
        at: DateTime<Utc>,
    ) -> impl Future<Output = Result<(), RedisError>> + Send;

    fn set_last_sync_report(
        &self,
        report: &SyncReport,
    ) -> impl Future<Output = Result<(), RedisError>> + Send;
}

// -----------------------------------------------------------------------------
// CACHE WRAPPER
// -----------------------------------------------------------------------------
#[derive(Clone)]
pub struct Cache {
    conn: ConnectionManager,
}

impl Cache {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    // -------------------------------------------------------------------------
    // JSON VALUES
    // -------------------------------------------------------------------------

    async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, RedisError> {
        let start = Instant::now();
        let raw: Option<String> = redis::cmd("GET")
            .arg(key)
            .query_async(&mut self.conn.clone())
            .await?;
        metrics::record_redis_operation("get", start.elapsed().as_secs_f64());

        // A value we can't parse is treated as absent
        Ok(raw.and_then(|json| match serde_json::from_str(&json) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::warn!(key = key, error = %err, "Discarding unreadable cached value");
                None
            }
        }))
    }

    async fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<(), RedisError> {
        let json = serde_json::to_string(value).map_err(|e| {
            RedisError::from((
                redis::ErrorKind::TypeError,
                "failed to serialize value",
                e.to_string(),
            ))
        })?;

        let start = Instant::now();
        let _: () = redis::cmd("SET")
            .arg(key)
            .arg(json)
            .query_async(&mut self.conn.clone())
            .await?;
        metrics::record_redis_operation("set", start.elapsed().as_secs_f64());
        Ok(())
    }

    pub async fn last_sync_report(&self) -> Result<Option<SyncReport>, RedisError> {
        self.get_json(LAST_SYNC_REPORT_KEY).await
    }

    // -------------------------------------------------------------------------
    // HEALTH CHECK
    // -------------------------------------------------------------------------
    pub async fn ping(&self) -> bool {
        redis::cmd("PING")
            .query_async::<_, String>(&mut self.conn.clone())
            .await
            .is_ok()
    }
}

impl Coordination for Cache {
    async fn try_lock(&self, key: &str, ttl: Duration) -> Result<Option<LockGuard>, RedisError> {
        let owner = Uuid::new_v4();
        let start = Instant::now();

        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(owner.to_string())
            .arg("NX")
            .arg("PX")
            .arg(ttl_millis(ttl))
            .query_async(&mut self.conn.clone())
            .await?;
        metrics::record_redis_operation("lock", start.elapsed().as_secs_f64());

        Ok(reply.map(|_| LockGuard {
            key: key.to_string(),
            owner,
        }))
    }

    async fn extend(&self, guard: &LockGuard, ttl: Duration) -> Result<bool, RedisError> {
        let script = redis::Script::new(EXTEND_SCRIPT);
        let start = Instant::now();
        let extended: i32 = script
            .key(&guard.key)
            .arg(guard.owner.to_string())
            .arg(ttl_millis(ttl))
            .invoke_async(&mut self.conn.clone())
            .await?;
        metrics::record_redis_operation("extend", start.elapsed().as_secs_f64());

        Ok(extended == 1)
    }

    async fn release(&self, guard: LockGuard) -> Result<(), RedisError> {
        let script = redis::Script::new(RELEASE_SCRIPT);
        let start = Instant::now();
        let released: i32 = script
            .key(&guard.key)
            .arg(guard.owner.to_string())
            .invoke_async(&mut self.conn.clone())
            .await?;
        metrics::record_redis_operation("unlock", start.elapsed().as_secs_f64());

        if released == 0 {
            tracing::warn!(key = %guard.key, "Lock expired before it was released");
        }
        Ok(())
    }

    async fn last_order_sync(&self) -> Result<Option<DateTime<Utc>>, RedisError> {
        self.get_json(LAST_ORDER_SYNC_KEY).await
    }

    async fn set_last_order_sync(&self, at: DateTime<Utc>) -> Result<(), RedisError> {
        self.set_json(LAST_ORDER_SYNC_KEY, &at).await
    }

    async fn set_last_sync_report(&self, report: &SyncReport) -> Result<(), RedisError> {
        self.set_json(LAST_SYNC_REPORT_KEY, report).await
    }
}

// -----------------------------------------------------------------------------
// IN-MEMORY COORDINATION (tests)
// -----------------------------------------------------------------------------
#[cfg(test)]
pub mod test_support {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Single-process stand-in for Redis. Lock expiry is simulated with
    /// `expire`, which drops the key as if its TTL had run out.
    #[derive(Default)]
    pub struct MemoryCoordination {
        locks: Mutex<HashMap<String, Uuid>>,
        checkpoint: Mutex<Option<DateTime<Utc>>>,
        report: Mutex<Option<SyncReport>>,
    }

    impl MemoryCoordination {
        pub fn expire(&self, key: &str) {
            self.locks.lock().unwrap().remove(key);
        }

        pub fn is_locked(&self, key: &str) -> bool {
            self.locks.lock().unwrap().contains_key(key)
        }

        pub fn checkpoint(&self) -> Option<DateTime<Utc>> {
            *self.checkpoint.lock().unwrap()
        }

        pub fn report(&self) -> Option<SyncReport> {
            self.report.lock().unwrap().clone()
        }
    }

    impl Coordination for MemoryCoordination {
        async fn try_lock(&self, key: &str, _ttl: Duration) -> Result<Option<LockGuard>, RedisError> {
            let mut locks = self.locks.lock().unwrap();
            if locks.contains_key(key) {
                return Ok(None);
            }
            let owner = Uuid::new_v4();
            locks.insert(key.to_string(), owner);
            Ok(Some(LockGuard {
                key: key.to_string(),
                owner,
            }))
        }

        async fn extend(&self, guard: &LockGuard, _ttl: Duration) -> Result<bool, RedisError> {
            Ok(self.locks.lock().unwrap().get(&guard.key) == Some(&guard.owner))
        }

        async fn release(&self, guard: LockGuard) -> Result<(), RedisError> {
            let mut locks = self.locks.lock().unwrap();
            if locks.get(&guard.key) == Some(&guard.owner) {
                locks.remove(&guard.key);
            }
            Ok(())
        }

        async fn last_order_sync(&self) -> Result<Option<DateTime<Utc>>, RedisError> {
            Ok(self.checkpoint())
        }

        async fn set_last_order_sync(&self, at: DateTime<Utc>) -> Result<(), RedisError> {
            *self.checkpoint.lock().unwrap() = Some(at);
            Ok(())
        }

        async fn set_last_sync_report(&self, report: &SyncReport) -> Result<(), RedisError> {
            *self.report.lock().unwrap() = Some(report.clone());
            Ok(())
        }
    }
}
