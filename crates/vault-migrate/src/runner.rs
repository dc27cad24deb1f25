use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{debug, info, warn};
use vault_db::DocumentStore;

use crate::error::{MigrateError, MigrateResult};
use crate::ledger::MigrationLedger;

/// A single, uniquely identified migration step.
///
/// Steps run in ascending `id` order, so ids are usually date-prefixed
/// (`2025-10-05-001-init`). A step is applied at most once per store.
#[async_trait]
pub trait Migration: Send + Sync {
    fn id(&self) -> &str;

    fn description(&self) -> &str {
        ""
    }

    async fn apply(&self, store: &DocumentStore) -> anyhow::Result<()>;
}

/// A migration built from an id and an async closure.
pub struct FnMigration<F> {
    id: String,
    description: String,
    f: F,
}

/// Build a [`Migration`] from a closure receiving a store handle.
pub fn migration<F, Fut>(id: impl Into<String>, f: F) -> FnMigration<F>
where
    F: Fn(DocumentStore) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    FnMigration {
        id: id.into(),
        description: String::new(),
        f,
    }
}

impl<F> FnMigration<F> {
    pub fn describe(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

#[async_trait]
impl<F, Fut> Migration for FnMigration<F>
where
    F: Fn(DocumentStore) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<()>> + Send,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn apply(&self, store: &DocumentStore) -> anyhow::Result<()> {
        (self.f)(store.clone()).await
    }
}

/// Lifecycle of one step within a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MigrationState {
    /// Not yet applied to this store.
    Pending,
    /// `apply` is running.
    Applying,
    Applied,
    /// Found in the ledger; skipped.
    AlreadyApplied,
    /// `apply` failed; the id stays out of the ledger and is retried on the
    /// next run.
    Failed(String),
}

impl fmt::Display for MigrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Applying => write!(f, "applying"),
            Self::Applied => write!(f, "applied"),
            Self::AlreadyApplied => write!(f, "already applied"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Final state of every step, in execution order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MigrationReport {
    pub outcomes: Vec<(String, MigrationState)>,
}

impl MigrationReport {
    fn ids_in(&self, wanted: impl Fn(&MigrationState) -> bool) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter(|(_, state)| wanted(state))
            .map(|(id, _)| id.as_str())
            .collect()
    }

    /// Ids applied during this run.
    pub fn applied(&self) -> Vec<&str> {
        self.ids_in(|s| *s == MigrationState::Applied)
    }

    /// Ids skipped because the ledger already had them.
    pub fn skipped(&self) -> Vec<&str> {
        self.ids_in(|s| *s == MigrationState::AlreadyApplied)
    }

    pub fn pending(&self) -> Vec<&str> {
        self.ids_in(|s| *s == MigrationState::Pending)
    }

    pub fn failed(&self) -> Vec<&str> {
        self.ids_in(|s| matches!(s, MigrationState::Failed(_)))
    }

    pub fn is_success(&self) -> bool {
        self.failed().is_empty()
    }
}

/// Callback invoked on every state transition.
pub type Observer = Arc<dyn Fn(&str, &MigrationState) + Send + Sync>;

/// Applies migrations in id order, recording each in the ledger.
///
/// The ledger is saved after every successful step, so an interrupted run
/// never re-applies a step that finished. With `stop_on_error` (the
/// default) the first failure aborts the run; otherwise failures are
/// logged and later steps still run.
pub struct MigrationRunner {
    store: DocumentStore,
    stop_on_error: bool,
    observer: Option<Observer>,
}

impl MigrationRunner {
    pub fn new(store: DocumentStore) -> Self {
        Self {
            store,
            stop_on_error: true,
            observer: None,
        }
    }

    pub fn stop_on_error(mut self, stop: bool) -> Self {
        self.stop_on_error = stop;
        self
    }

    pub fn with_observer(mut self, observer: Observer) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    pub async fn ledger(&self) -> MigrateResult<MigrationLedger> {
        MigrationLedger::load(&self.store).await
    }

    /// Report each step as `AlreadyApplied` or `Pending` without running
    /// anything.
    pub async fn status(&self, steps: &[Box<dyn Migration>]) -> MigrateResult<MigrationReport> {
        let ordered = sorted_unique(steps)?;
        let ledger = self.ledger().await?;
        let outcomes = ordered
            .into_iter()
            .map(|step| {
                let state = if ledger.contains(step.id()) {
                    MigrationState::AlreadyApplied
                } else {
                    MigrationState::Pending
                };
                (step.id().to_string(), state)
            })
            .collect();
        Ok(MigrationReport { outcomes })
    }

    /// Apply every step not yet in the ledger.
    pub async fn run(&self, steps: &[Box<dyn Migration>]) -> MigrateResult<MigrationReport> {
        let ordered = sorted_unique(steps)?;
        let mut ledger = self.ledger().await?;
        let mut report = MigrationReport::default();

        for step in ordered {
            let id = step.id();
            if ledger.contains(id) {
                debug!(id, "migration already applied");
                self.transition(id, &MigrationState::AlreadyApplied);
                report.outcomes.push((id.to_string(), MigrationState::AlreadyApplied));
                continue;
            }

            self.transition(id, &MigrationState::Applying);
            info!(id, description = step.description(), "applying migration");
            match step.apply(&self.store).await {
                Ok(()) => {
                    ledger.record(id, Utc::now());
                    ledger.save(&self.store).await?;
                    self.transition(id, &MigrationState::Applied);
                    report.outcomes.push((id.to_string(), MigrationState::Applied));
                }
                Err(source) if self.stop_on_error => {
                    let state = MigrationState::Failed(format!("{source:#}"));
                    self.transition(id, &state);
                    warn!(id, error = %format!("{source:#}"), "migration failed; stopping");
                    return Err(MigrateError::Step {
                        id: id.to_string(),
                        source,
                    });
                }
                Err(source) => {
                    let reason = format!("{source:#}");
                    warn!(id, error = %reason, "migration failed; continuing");
                    let state = MigrationState::Failed(reason);
                    self.transition(id, &state);
                    report.outcomes.push((id.to_string(), state));
                }
            }
        }

        info!(
            applied = report.applied().len(),
            skipped = report.skipped().len(),
            failed = report.failed().len(),
            "migration run finished"
        );
        Ok(report)
    }

    fn transition(&self, id: &str, state: &MigrationState) {
        if let Some(observer) = &self.observer {
            observer(id, state);
        }
    }
}

fn sorted_unique(steps: &[Box<dyn Migration>]) -> MigrateResult<Vec<&dyn Migration>> {
    let mut seen = HashSet::new();
    for step in steps {
        if !seen.insert(step.id()) {
            return Err(MigrateError::DuplicateStep(step.id().to_string()));
        }
    }
    let mut ordered: Vec<&dyn Migration> = steps.iter().map(|s| s.as_ref()).collect();
    ordered.sort_by(|a, b| a.id().cmp(b.id()));
    Ok(ordered)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;
    use vault_db::VaultConfig;
    use vault_types::Value;

    fn store() -> DocumentStore {
        DocumentStore::in_memory("pw", VaultConfig::default().with_kdf_iterations(10)).unwrap()
    }

    fn marker(id: &'static str) -> Box<dyn Migration> {
        Box::new(migration(id, move |store: DocumentStore| async move {
            store
                .put("marks", id, Value::from(json!({"by": id})))
                .await?;
            anyhow::Ok(())
        }))
    }

    fn failing(id: &'static str) -> Box<dyn Migration> {
        Box::new(migration(id, |_store: DocumentStore| async {
            Err::<(), _>(anyhow::anyhow!("boom"))
        }))
    }

    #[tokio::test]
    async fn applies_in_id_order() {
        let store = store();
        let log = Arc::new(Mutex::new(Vec::new()));
        let seen = log.clone();
        let runner = MigrationRunner::new(store.clone()).with_observer(Arc::new(move |id: &str, state: &MigrationState| {
            if *state == MigrationState::Applying {
                seen.lock().unwrap().push(id.to_string());
            }
        }));

        let report = runner.run(&[marker("002"), marker("001")]).await.unwrap();
        assert_eq!(report.applied(), ["001", "002"]);
        assert_eq!(*log.lock().unwrap(), ["001", "002"]);
        assert_eq!(runner.ledger().await.unwrap().applied(), ["001", "002"]);
        assert!(store.exists("marks", "001").await.unwrap());
    }

    #[tokio::test]
    async fn second_run_is_a_noop() {
        let runner = MigrationRunner::new(store());
        let steps = [marker("001"), marker("002")];
        runner.run(&steps).await.unwrap();

        let again = runner.run(&steps).await.unwrap();
        assert!(again.applied().is_empty());
        assert_eq!(again.skipped(), ["001", "002"]);
        assert_eq!(runner.ledger().await.unwrap().applied().len(), 2);
    }

    #[tokio::test]
    async fn stop_on_error_aborts() {
        let store = store();
        let runner = MigrationRunner::new(store.clone());
        let err = runner
            .run(&[marker("001"), failing("002"), marker("003")])
            .await
            .unwrap_err();
        match err {
            MigrateError::Step { id, source } => {
                assert_eq!(id, "002");
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(runner.ledger().await.unwrap().applied(), ["001"]);
        assert!(!store.exists("marks", "003").await.unwrap());
    }

    #[tokio::test]
    async fn continue_past_failure_and_retry_later() {
        let store = store();
        let runner = MigrationRunner::new(store.clone()).stop_on_error(false);
        let report = runner
            .run(&[marker("001"), failing("002"), marker("003")])
            .await
            .unwrap();
        assert_eq!(report.applied(), ["001", "003"]);
        assert_eq!(report.failed(), ["002"]);
        assert!(!report.is_success());
        assert_eq!(runner.ledger().await.unwrap().applied(), ["001", "003"]);

        // Fixed step is picked up on the next run.
        let report = runner
            .run(&[marker("001"), marker("002"), marker("003")])
            .await
            .unwrap();
        assert_eq!(report.applied(), ["002"]);
        assert_eq!(report.skipped(), ["001", "003"]);
    }

    #[tokio::test]
    async fn duplicate_ids_rejected_before_applying() {
        let store = store();
        let runner = MigrationRunner::new(store.clone());
        let err = runner.run(&[marker("001"), marker("001")]).await.unwrap_err();
        assert!(matches!(err, MigrateError::DuplicateStep(id) if id == "001"));
        assert!(!store.exists("marks", "001").await.unwrap());
    }

    #[tokio::test]
    async fn status_does_not_apply() {
        let store = store();
        let runner = MigrationRunner::new(store.clone());
        runner.run(&[marker("001")]).await.unwrap();

        let status = runner.status(&[marker("002"), marker("001")]).await.unwrap();
        assert_eq!(status.skipped(), ["001"]);
        assert_eq!(status.pending(), ["002"]);
        assert!(!store.exists("marks", "002").await.unwrap());
    }

    #[test]
    fn description_and_state_display() {
        let m = migration("x", |_s: DocumentStore| async { anyhow::Ok(()) }).describe("seed users");
        assert_eq!(m.description(), "seed users");
        assert_eq!(MigrationState::Failed("e".into()).to_string(), "failed: e");
    }
}
