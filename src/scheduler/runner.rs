use chrono::Utc;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::error::AppResult;
use crate::operations::{OperationDispatcher, OperationRegistry};
use crate::scheduler::pipeline::{due_indices, Pipeline, PipelineState, PipelineStore};

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub tick_interval: Duration,
    pub operations_path: PathBuf,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1000),
            operations_path: PathBuf::from("data/pipelines/operations.json"),
        }
    }
}

/// What a single tick did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Dispatched this many pipelines
    Ran(usize),
    /// Active pipelines exist but none is due yet
    Idle,
    /// No active pipeline is left
    Exhausted,
}

/// Poll, dispatch, reschedule.
///
/// Dispatches run one after another; a long confirmation wait delays every
/// later pipeline in the same tick.
pub struct Scheduler {
    config: SchedulerConfig,
    store: PipelineStore,
    dispatcher: Arc<OperationDispatcher>,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        store: PipelineStore,
        dispatcher: Arc<OperationDispatcher>,
    ) -> Self {
        Self {
            config,
            store,
            dispatcher,
        }
    }

    /// Run ticks until no active pipeline remains
    pub async fn run(&self) -> AppResult<()> {
        info!("🚀 Worker on process: {}", std::process::id());

        loop {
            let now = Utc::now().timestamp();
            match self.run_tick(now).await? {
                TickOutcome::Exhausted => {
                    info!("No active pipelines, exiting");
                    return Ok(());
                }
                TickOutcome::Idle => debug!("Nothing due at {}", now),
                TickOutcome::Ran(count) => info!("Tick finished, {} pipelines dispatched", count),
            }

            tokio::time::sleep(self.config.tick_interval).await;
        }
    }

    /// One poll-dispatch-reschedule pass with `now` as the due cutoff.
    ///
    /// Every dispatched pipeline is rescheduled and written back before the
    /// next one starts, whatever the dispatch returned.
    pub async fn run_tick(&self, now: i64) -> AppResult<TickOutcome> {
        let registry = OperationRegistry::load(&self.config.operations_path)?;
        self.dispatcher.reload_identities();
        let mut pipelines = self.store.load();

        let due = due_indices(&pipelines, now);
        if due.is_empty() {
            return Ok(if pipelines.iter().any(|p| p.is_active()) {
                TickOutcome::Idle
            } else {
                TickOutcome::Exhausted
            });
        }

        let names: Vec<&str> = due.iter().map(|&i| pipelines[i].name.as_str()).collect();
        info!("⏰ Running pipelines: {}", names.join(", "));

        let mut dispatched = 0;
        for &i in &due {
            if pipelines[i].next_exec_after(now, 0).is_none() {
                self.deactivate(&mut pipelines, i);
                continue;
            }

            let operation_id = pipelines[i].operation_id;
            dispatched += 1;
            if let Err(e) = self.dispatcher.dispatch(&registry, operation_id).await {
                error!(
                    "❌ Pipeline {} (operation {}) failed: {}",
                    pipelines[i].name, operation_id, e
                );
            }

            let base = Utc::now().timestamp().max(now);
            let jitter = pipelines[i].random_jitter();
            match pipelines[i].next_exec_after(base, jitter) {
                Some(next_exec) => pipelines[i].next_exec = next_exec,
                None => {
                    self.deactivate(&mut pipelines, i);
                    continue;
                }
            }
            info!(
                "Pipeline {} next runs at {}",
                pipelines[i].name, pipelines[i].next_exec
            );

            if let Err(e) = self.store.save(&pipelines) {
                error!("❌ Failed to persist pipeline {}: {}", pipelines[i].name, e);
            }
        }

        Ok(TickOutcome::Ran(dispatched))
    }

    /// Switch off a pipeline whose cadence overflows a timestamp
    fn deactivate(&self, pipelines: &mut [Pipeline], i: usize) {
        warn!(
            "⚠️ Pipeline {} has an out-of-range cadence (every {}s ±{}s), deactivating",
            pipelines[i].name, pipelines[i].repeat_every_time, pipelines[i].diff_time
        );
        pipelines[i].state = PipelineState::Inactive;
        if let Err(e) = self.store.save(pipelines) {
            error!("❌ Failed to persist pipeline {}: {}", pipelines[i].name, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AppError, RegistryError};
    use crate::execution::mock::{MockBridge, MockChainClient, MockSwap, MockTransfer};
    use crate::ledger::models::Network;
    use crate::operations::WorkflowConfig;
    use crate::scheduler::pipeline::{Pipeline, PipelineState};
    use crate::wallet::{AccountManager, IdentityTable, WalletRole};
    use serde_json::json;

    struct Harness {
        dir: tempfile::TempDir,
        store: PipelineStore,
        swap: Arc<MockSwap>,
        scheduler: Scheduler,
    }

    fn harness(operations: serde_json::Value, pipelines: Vec<Pipeline>) -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let operations_path = dir.path().join("operations.json");
        std::fs::write(&operations_path, serde_json::to_vec(&operations).unwrap()).unwrap();

        let store = PipelineStore::new(dir.path().join("pipelines.json"));
        store.save(&pipelines).unwrap();

        let funding = Arc::new(AccountManager::new(
            WalletRole::Funding,
            IdentityTable::new(dir.path().join("funding.json")),
            Arc::new(MockChainClient::new(Network::Base)),
        ));
        let farming = Arc::new(AccountManager::new(
            WalletRole::Farming,
            IdentityTable::new(dir.path().join("farming.json")),
            Arc::new(MockChainClient::new(Network::Secondary)),
        ));
        farming.create_and_persist().unwrap();

        let swap = Arc::new(MockSwap::default());
        let dispatcher = Arc::new(OperationDispatcher::new(
            WorkflowConfig::default(),
            funding,
            farming,
            Arc::new(MockBridge::default()),
            swap.clone(),
            Arc::new(MockTransfer::default()),
        ));

        let scheduler = Scheduler::new(
            SchedulerConfig {
                tick_interval: Duration::from_millis(1),
                operations_path,
            },
            store.clone(),
            dispatcher,
        );

        Harness {
            dir,
            store,
            swap,
            scheduler,
        }
    }

    fn pipeline(name: &str, operation_id: i64, state: PipelineState, next_exec: i64) -> Pipeline {
        Pipeline {
            name: name.to_string(),
            operation_id,
            state,
            repeat_every_time: 3600,
            diff_time: 300,
            next_exec,
        }
    }

    fn operations() -> serde_json::Value {
        json!([
            {"id": 1, "name": "swap", "details": {"swap_fraction": 0.5}},
            {"id": 2, "name": "stake", "details": {}},
            {"id": 3, "name": "transfer",
             "details": {"to": format!("0x{}", "11".repeat(20)), "amount": 0.1}}
        ])
    }

    #[tokio::test]
    async fn test_tick_dispatches_due_and_reschedules() {
        let now = Utc::now().timestamp();
        let h = harness(
            operations(),
            vec![
                pipeline("due", 1, PipelineState::Active, now - 10),
                pipeline("later", 1, PipelineState::Active, now + 10_000),
                pipeline("off", 1, PipelineState::Inactive, now - 10),
            ],
        );

        let outcome = h.scheduler.run_tick(now).await.unwrap();
        let after = Utc::now().timestamp();

        assert_eq!(outcome, TickOutcome::Ran(1));
        assert_eq!(h.swap.requests.lock().len(), 1);

        let rows = h.store.load();
        assert!(rows[0].next_exec >= now + 3600 - 300);
        assert!(rows[0].next_exec <= after + 3600 + 300);
        assert_eq!(rows[1].next_exec, now + 10_000);
        assert_eq!(rows[2].next_exec, now - 10);
    }

    #[tokio::test]
    async fn test_unknown_and_failing_operations_still_advance() {
        let now = Utc::now().timestamp();
        let h = harness(
            operations(),
            vec![
                pipeline("unknown_kind", 2, PipelineState::Active, now - 1),
                pipeline("missing_op", 77, PipelineState::Active, now - 1),
                // No funding identity exists, so the transfer errors.
                pipeline("failing", 3, PipelineState::Active, now - 1),
            ],
        );

        let outcome = h.scheduler.run_tick(now).await.unwrap();

        assert_eq!(outcome, TickOutcome::Ran(3));
        assert!(h.store.load().iter().all(|p| p.next_exec > now));
    }

    #[tokio::test]
    async fn test_out_of_range_cadence_is_deactivated() {
        let now = Utc::now().timestamp();
        let mut broken = pipeline("broken", 1, PipelineState::Active, now - 1);
        broken.repeat_every_time = u64::MAX;
        broken.diff_time = u64::MAX;
        let h = harness(
            operations(),
            vec![broken, pipeline("ok", 1, PipelineState::Active, now - 1)],
        );

        let outcome = h.scheduler.run_tick(now).await.unwrap();

        assert_eq!(outcome, TickOutcome::Ran(1));
        assert_eq!(h.swap.requests.lock().len(), 1);
        let rows = h.store.load();
        assert_eq!(rows[0].state, PipelineState::Inactive);
        assert_eq!(rows[0].next_exec, now - 1);
        assert!(rows[1].next_exec > now);
    }

    #[tokio::test]
    async fn test_idle_and_exhausted() {
        let now = Utc::now().timestamp();
        let idle = harness(
            operations(),
            vec![pipeline("later", 1, PipelineState::Active, now + 60)],
        );
        assert_eq!(idle.scheduler.run_tick(now).await.unwrap(), TickOutcome::Idle);

        let done = harness(
            operations(),
            vec![pipeline("off", 1, PipelineState::Inactive, now - 60)],
        );
        assert_eq!(done.scheduler.run_tick(now).await.unwrap(), TickOutcome::Exhausted);
        assert!(done.scheduler.run().await.is_ok());
    }

    #[tokio::test]
    async fn test_corrupt_pipeline_store_terminates() {
        let h = harness(operations(), vec![]);
        std::fs::write(h.store.path(), "garbage").unwrap();

        assert_eq!(
            h.scheduler.run_tick(Utc::now().timestamp()).await.unwrap(),
            TickOutcome::Exhausted
        );
    }

    #[tokio::test]
    async fn test_missing_registry_is_fatal() {
        let now = Utc::now().timestamp();
        let h = harness(
            operations(),
            vec![pipeline("due", 1, PipelineState::Active, now - 1)],
        );
        std::fs::remove_file(h.dir.path().join("operations.json")).unwrap();

        assert!(matches!(
            h.scheduler.run_tick(now).await,
            Err(AppError::Registry(RegistryError::Empty(_)))
        ));
        assert_eq!(h.store.load()[0].next_exec, now - 1);
    }

    #[tokio::test]
    async fn test_registry_edits_apply_next_tick() {
        let now = Utc::now().timestamp();
        let h = harness(
            json!([{"id": 1, "name": "stake", "details": {}}]),
            vec![pipeline("p", 1, PipelineState::Active, now - 1)],
        );
        h.scheduler.run_tick(now).await.unwrap();
        assert!(h.swap.requests.lock().is_empty());

        std::fs::write(
            h.dir.path().join("operations.json"),
            serde_json::to_vec(&operations()).unwrap(),
        )
        .unwrap();
        let mut rows = h.store.load();
        rows[0].next_exec = now - 1;
        h.store.save(&rows).unwrap();

        h.scheduler.run_tick(now).await.unwrap();
        assert_eq!(h.swap.requests.lock().len(), 1);
    }
}
