//! Heartbeat scheduler
//!
//! A dedicated task ticking at the period the server dictated in Hello. Each
//! tick is scheduled relative to the fixed period, not to how long the
//! previous tick took to handle; missed ticks are skipped rather than
//! bursted, so drift never compounds. The scheduler does not track
//! acknowledgement; only the session knows what "acknowledged" means.

use crate::core::session::SessionEvent;
use std::time::Duration;
use tokio::sync::mpsc::UnboundedSender;
use tokio::sync::oneshot;
use tracing::debug;

/// Handle to a running heartbeat task
#[derive(Debug)]
pub struct HeartbeatHandle {
    period: Duration,
    shutdown_tx: oneshot::Sender<()>,
}

impl HeartbeatHandle {
    /// Period this scheduler was started with
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Stop ticking. Consumes the handle; dropping it has the same effect.
    pub fn stop(self) {
        let _ = self.shutdown_tx.send(());
    }
}

/// Spawn a heartbeat task posting `HeartbeatTick` into the session queue
/// every `period`. The first immediate tick is skipped; the first event
/// arrives one full period after start.
pub fn spawn_heartbeat(
    period: Duration,
    events_tx: UnboundedSender<SessionEvent>,
) -> HeartbeatHandle {
    let (shutdown_tx, mut shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        // Skip the immediate first tick - wait for the first full period
        ticker.tick().await;
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        debug!("Heartbeat task started with period {:?}", period);

        loop {
            tokio::select! {
                // Shutdown must win over a simultaneously ready tick
                biased;
                _ = &mut shutdown_rx => {
                    debug!("Heartbeat task received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    if events_tx.send(SessionEvent::HeartbeatTick).is_err() {
                        debug!("Session queue closed, shutting down heartbeat task");
                        break;
                    }
                }
            }
        }

        debug!("Heartbeat task exiting");
    });

    HeartbeatHandle {
        period,
        shutdown_tx,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;
    use tokio::time::{timeout, Instant};

    #[tokio::test]
    async fn test_first_tick_arrives_after_one_period() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let started = Instant::now();
        let handle = spawn_heartbeat(Duration::from_millis(50), tx);

        let event = timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("tick should arrive")
            .expect("channel open");
        assert!(matches!(event, SessionEvent::HeartbeatTick));
        assert!(started.elapsed() >= Duration::from_millis(45));

        handle.stop();
    }

    #[tokio::test]
    async fn test_ticks_repeat() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_heartbeat(Duration::from_millis(20), tx);

        for _ in 0..3 {
            timeout(Duration::from_millis(500), rx.recv())
                .await
                .expect("tick should arrive")
                .expect("channel open");
        }

        handle.stop();
    }

    #[tokio::test]
    async fn test_stop_halts_ticking() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let handle = spawn_heartbeat(Duration::from_millis(20), tx);

        timeout(Duration::from_millis(500), rx.recv())
            .await
            .expect("tick should arrive")
            .expect("channel open");
        handle.stop();

        // Drain anything already queued, then expect silence
        tokio::time::sleep(Duration::from_millis(60)).await;
        while rx.try_recv().is_ok() {}
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_period_is_recorded() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let handle = spawn_heartbeat(Duration::from_millis(41250), tx);
        assert_eq!(handle.period(), Duration::from_millis(41250));
        handle.stop();
    }
}
