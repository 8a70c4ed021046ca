use std::time::Duration;

use orch_types::run::Station;
use sqlx::PgPool;
use tokio::task::JoinHandle;
use uuid::Uuid;

/// `runs.heartbeat_at` is refreshed on this cadence while a station is in
/// progress.
pub const HEARTBEAT_PERIOD: Duration = Duration::from_secs(5);

/// A `running` run whose heartbeat (or, absent a heartbeat, `started_at`) is
/// at least this old is eligible for takeover.
pub const STALE_THRESHOLD: Duration = Duration::from_secs(30);

/// Owns the background ticker task spawned by [`spawn`]. Scoped to a single
/// station's execution, so `Drop` aborts the task on every exit path
/// (`?`, early return, or panic) without requiring a manual teardown call
/// at each call site.
pub struct HeartbeatGuard {
    handle: JoinHandle<()>,
}

impl Drop for HeartbeatGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Spawn a ticker that refreshes `(current_station, heartbeat_at)` every
/// [`HEARTBEAT_PERIOD`] while the returned guard is alive. A failed write is
/// logged and the loop continues — the next tick tries again.
pub fn spawn(pool: PgPool, run_id: Uuid, station: Station) -> HeartbeatGuard {
    let handle = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(HEARTBEAT_PERIOD);
        ticker.tick().await; // first tick fires immediately; skip it
        loop {
            ticker.tick().await;
            if let Err(err) = orch_store::run::touch_heartbeat(&pool, run_id, station).await {
                tracing::warn!(%run_id, station = station.as_str(), error = %err, "heartbeat write failed");
            }
        }
    });
    HeartbeatGuard { handle }
}
