//! Background epoch scheduler
//!
//! Polls the epoch clock on a fixed interval and settles every epoch that has
//! closed since the last pass, oldest first.

use std::sync::Arc;

use log::{debug, error, info};
use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, unbounded_channel};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Duration, MissedTickBehavior, interval};
use veritas_core::Epoch;

use crate::config::SchedulerConfig;
use crate::orchestrator::EpochReport;
use crate::service::SettlementService;

/// Handle to a running scheduler
pub struct SchedulerHandle {
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<Option<Epoch>>,
}

impl SchedulerHandle {
    /// Stop the scheduler and return the last epoch it settled
    pub async fn shutdown(self) -> Option<Epoch> {
        let _ = self.shutdown_tx.send(());
        match self.task.await {
            Ok(last) => last,
            Err(e) => {
                error!("[SETTLEMENT] Scheduler task failed: {}", e);
                None
            }
        }
    }
}

pub struct EpochScheduler {
    service: Arc<SettlementService>,
    config: SchedulerConfig,
}

impl EpochScheduler {
    pub fn new(service: Arc<SettlementService>, config: SchedulerConfig) -> Self {
        Self { service, config }
    }

    /// Spawn the scheduler loop
    ///
    /// Epochs are settled from the clock's epoch at start onward, once each
    /// has closed. Reports are sent on the returned channel.
    pub fn start(self) -> (SchedulerHandle, UnboundedReceiver<EpochReport>) {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let (report_tx, report_rx) = unbounded_channel();

        let start_epoch = self.service.current_epoch();
        let task = tokio::spawn(Self::run(
            self.service,
            start_epoch,
            self.config.tick_interval_ms,
            report_tx,
            shutdown_rx,
        ));

        (SchedulerHandle { shutdown_tx, task }, report_rx)
    }

    async fn run(
        service: Arc<SettlementService>,
        start_epoch: Epoch,
        interval_ms: u64,
        report_tx: UnboundedSender<EpochReport>,
        mut shutdown_rx: oneshot::Receiver<()>,
    ) -> Option<Epoch> {
        let mut next_epoch = start_epoch;
        let mut last_settled = None;
        info!(
            "[SETTLEMENT] Scheduler starting at epoch {} with interval of {}ms",
            next_epoch, interval_ms
        );

        let mut tick_interval = interval(Duration::from_millis(interval_ms.max(1)));
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = &mut shutdown_rx => break,
                _ = tick_interval.tick() => {
                    let current = service.current_epoch();
                    debug!("[SETTLEMENT] Scheduler tick at epoch {}", current);
                    while next_epoch < current {
                        let report = service.process_epoch(Some(next_epoch));
                        last_settled = Some(next_epoch);
                        next_epoch += 1;
                        // Receiver may be gone; settlement continues regardless
                        let _ = report_tx.send(report);
                    }
                }
            }
        }

        info!("[SETTLEMENT] Scheduler stopped (last settled: {:?})", last_settled);
        last_settled
    }
}
