use std::time::Duration;

use redis::aio::{ConnectionManager, ConnectionManagerConfig};
use redis::{AsyncCommands, Client, Script};
use uuid::Uuid;

use crate::models::Appointment;

/// Writes `body` only when `version` is newer than what the hash already holds.
const STORE_IF_NEWER: &str = r"
local current = redis.call('HGET', KEYS[1], 'version')
if current and tonumber(current) >= tonumber(ARGV[1]) then
    return 0
end
redis.call('HSET', KEYS[1], 'version', ARGV[1], 'body', ARGV[2])
redis.call('EXPIRE', KEYS[1], ARGV[3])
return 1
";

/// Best-effort Redis cache for single appointment lookups.
///
/// Entries are versioned by `updated_at`, so a reader that loaded a row before
/// a concurrent mutation cannot overwrite the mutation's newer entry. Redis
/// errors are logged and swallowed; a broken cache only costs a database
/// round trip.
#[derive(Clone)]
pub struct AppointmentCache {
    conn: Option<ConnectionManager>,
    store: Script,
    ttl_secs: u64,
}

impl AppointmentCache {
    pub fn disabled() -> Self {
        Self {
            conn: None,
            store: Script::new(STORE_IF_NEWER),
            ttl_secs: 0,
        }
    }

    pub async fn connect(redis_url: &str, ttl_secs: u64) -> Result<Self, redis::RedisError> {
        let config = ConnectionManagerConfig::new()
            .set_number_of_retries(1)
            .set_connection_timeout(Duration::from_millis(500));

        let client = Client::open(redis_url)?;
        let conn = client.get_connection_manager_with_config(config).await?;

        Ok(Self {
            conn: Some(conn),
            store: Script::new(STORE_IF_NEWER),
            ttl_secs,
        })
    }

    pub async fn get(&self, id: Uuid) -> Option<Appointment> {
        let mut conn = self.conn.clone()?;
        let raw = match conn.hget::<_, _, Option<String>>(key(id), "body").await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!("Cache read failed for {id}: {e}");
                return None;
            }
        };

        raw.and_then(|s| match serde_json::from_str(&s) {
            Ok(appointment) => Some(appointment),
            Err(e) => {
                tracing::warn!("Discarding unreadable cache entry for {id}: {e}");
                None
            }
        })
    }

    /// Store the row unless the cache already holds the same or a newer version.
    /// Returns whether the entry was written.
    pub async fn put(&self, appointment: &Appointment) -> bool {
        let Some(mut conn) = self.conn.clone() else {
            return false;
        };

        let payload = match serde_json::to_string(appointment) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("Failed to serialize appointment {}: {e}", appointment.id);
                return false;
            }
        };

        let written: Result<i32, _> = self
            .store
            .key(key(appointment.id))
            .arg(version(appointment))
            .arg(payload)
            .arg(self.ttl_secs)
            .invoke_async(&mut conn)
            .await;

        match written {
            Ok(n) => n == 1,
            Err(e) => {
                tracing::warn!("Cache write failed for {}: {e}", appointment.id);
                false
            }
        }
    }

    /// `None` when no cache is configured.
    pub async fn ping(&self) -> Option<bool> {
        let mut conn = self.conn.clone()?;
        let pong: Result<String, _> = redis::cmd("PING").query_async(&mut conn).await;
        Some(pong.is_ok())
    }
}

pub fn key(id: Uuid) -> String {
    format!("appointment:{id}")
}

fn version(appointment: &Appointment) -> i64 {
    appointment.updated_at.timestamp_micros()
}
