//! Keyed ephemeral store fronting LedgerStore for admission control (§4.B). Best-effort: every
//! decision made from it is re-checked inside the LedgerStore transaction before it is allowed to
//! have a durable effect, so a cache outage degrades admission control, never ledger correctness.

use crate::{balance, database, user};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("cache unavailable")]
pub struct Unavailable;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Active,
    Locked,
}

#[derive(Clone)]
pub struct SessionCache {
    conn: ConnectionManager,
}

impl SessionCache {
    pub async fn connect(host: &str, port: u16, password: Option<&str>) -> Self {
        let url = match password {
            Some(password) => format!("redis://:{}@{}:{}", password, host, port),
            None => format!("redis://{}:{}", host, port),
        };
        let client = redis::Client::open(url).unwrap();
        let conn = ConnectionManager::new(client).await.unwrap();
        Self { conn }
    }

    /// Idempotent overwrite (§4.B).
    pub async fn set_challenge(
        &self,
        k1: &str,
        user_id: &user::Id,
        ttl: Duration,
    ) -> Result<(), Unavailable> {
        self.conn
            .clone()
            .set_ex(challenge_key(k1), user_id.as_str(), ttl.as_secs() as usize)
            .await
            .map_err(|_| Unavailable)
    }

    /// Missing or expired both return `None` (§4.B).
    pub async fn get_challenge(&self, k1: &str) -> Result<Option<user::Id>, Unavailable> {
        let raw: Option<String> = self
            .conn
            .clone()
            .get(challenge_key(k1))
            .await
            .map_err(|_| Unavailable)?;
        Ok(raw.and_then(user::Id::new))
    }

    pub async fn delete_challenge(&self, k1: &str) -> Result<(), Unavailable> {
        self.conn
            .clone()
            .del(challenge_key(k1))
            .await
            .map_err(|_| Unavailable)
    }

    /// A cache miss falls straight through to a pooled read of the authoritative balance, since
    /// SessionCache is "a best-effort accelerator for admission control" (§4.B), never the source
    /// of truth. Stored in the `balance` field of the `{userid}::session` hash (§3).
    pub async fn get_balance_snapshot(&self, db: &database::Database, user_id: &user::Id) -> i64 {
        let mut conn = self.conn.clone();
        let cached: Option<i64> = conn
            .hget(session_key(user_id), "balance")
            .await
            .unwrap_or(None);
        if let Some(amount) = cached {
            return amount;
        }
        let amount = balance::get_pool(db, user_id).await.amount().0;
        let _: Result<(), _> = conn.hset(session_key(user_id), "balance", amount).await;
        amount
    }

    /// Stored in the `status` field of the `{userid}::session` hash (§3).
    pub async fn set_session_status(
        &self,
        user_id: &user::Id,
        status: Status,
    ) -> Result<(), Unavailable> {
        let value = match status {
            Status::Active => "active",
            Status::Locked => "locked",
        };
        self.conn
            .clone()
            .hset(session_key(user_id), "status", value)
            .await
            .map_err(|_| Unavailable)
    }

    /// Locks the session and returns a guard that unlocks it again on drop, regardless of which
    /// exit path the enclosing request takes (§5 "Session lock", §10.E). `Drop` cannot run async
    /// code directly, so the unlock itself is a detached task; the guard's only job is to make
    /// sure that task always gets spawned.
    pub async fn lock_session(&self, user_id: &user::Id) -> Result<SessionLockGuard, Unavailable> {
        self.set_session_status(user_id, Status::Locked).await?;
        Ok(SessionLockGuard {
            cache: self.clone(),
            user_id: user_id.clone(),
        })
    }
}

pub struct SessionLockGuard {
    cache: SessionCache,
    user_id: user::Id,
}

impl Drop for SessionLockGuard {
    fn drop(&mut self) {
        let cache = self.cache.clone();
        let user_id = self.user_id.clone();
        tokio::spawn(async move {
            if let Err(e) = cache.set_session_status(&user_id, Status::Active).await {
                log::warn!("failed to unlock session for user {}: {}", user_id, e);
            }
        });
    }
}

fn challenge_key(k1: &str) -> String {
    format!("challenge:{}", k1)
}

/// The `{userid}::session` hash holding the `balance` and `status` fields (§3).
fn session_key(user_id: &user::Id) -> String {
    format!("{}::session", user_id.as_str())
}
