//! Ordered, idempotent data migrations for Vault.
//!
//! A [`MigrationRunner`] applies [`Migration`] steps against a
//! [`DocumentStore`](vault_db::DocumentStore) in ascending id order and
//! records each applied id in a [`MigrationLedger`] stored inside the same
//! store at `_meta/migrations`. Re-running the same step list is a no-op.
//!
//! Each step moves through `Pending → Applying → Applied`. A failing step
//! either aborts the run (the default) or, with `stop_on_error(false)`, is
//! reported as `Failed` and retried on the next run.

pub mod error;
pub mod ledger;
pub mod runner;

pub use error::{MigrateError, MigrateResult};
pub use ledger::{MigrationLedger, LEDGER_COLLECTION, LEDGER_ID};
pub use runner::{
    migration, FnMigration, Migration, MigrationReport, MigrationRunner, MigrationState, Observer,
};
