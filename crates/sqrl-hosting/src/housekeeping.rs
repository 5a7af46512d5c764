use super::*;
use sqrl_engine::AuthStateMonitor;
use sqrl_store::Persistence;
use std::time::Duration;

/// Spawns the periodic expired-entry purge. No-op when cleanup is disabled
/// in the config; the embedder then owns expiry.
pub fn spawn_cleanup<P>(operations: Arc<SqrlOperations<P>>)
where
    P: Persistence + Send + Sync + 'static,
{
    let Some(period) = operations.config().cleanup_interval else {
        log::info!("cleanup task disabled by config");
        return;
    };
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = operations.clean_expired(now_ms()) {
                log::error!("cleanup round failed: {}", e);
            }
        }
    });
}

/// Spawns the listener notification loop: every period, reportable status
/// changes on watched attempts are pushed to the monitor's listener.
pub fn spawn_monitor<P>(monitor: Arc<AuthStateMonitor>, store: Arc<P>, period: Duration)
where
    P: Persistence + Send + Sync + 'static,
{
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        loop {
            ticker.tick().await;
            if let Err(e) = monitor.tick(store.as_ref()) {
                log::error!("monitor round failed: {}", e);
            }
        }
    });
}
