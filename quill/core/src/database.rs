use std::sync::Arc;

use quill_catalog::catalog::Catalog;
use quill_catalog::database_manager::DatabaseManager;
use quill_catalog::info::{CreateInfoBase, CreateSchemaInfo};
use quill_common::constants::DEFAULT_SCHEMA;
use quill_common::{IsolationLevel, Transaction};
use quill_context::database::DatabaseContext;
use rayon::ThreadPoolBuilder;
use tracing::debug;

use crate::builtins;
use crate::error::Result;
use crate::session::Session;

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub num_threads: usize,
    /// Name of the initial attached database.
    pub database_name: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            num_threads: 1,
            database_name: "memory".to_string(),
        }
    }
}

pub struct Database {
    context: Arc<DatabaseContext>,
    default_database: String,
}

impl Database {
    /// Open an in-memory instance: build the system catalog from the
    /// built-in function table, seal it, and attach one empty database.
    pub fn open_in_memory(config: &DatabaseConfig) -> Result<Self> {
        let manager = Arc::new(DatabaseManager::new()?);
        populate_system_catalog(&manager)?;
        manager.seal_system();

        let initial = Arc::new(Catalog::new(config.database_name.clone()));
        let txn = manager
            .txn_manager()
            .begin_transaction(IsolationLevel::Snapshot)?;
        initial.create_schema(&txn, &CreateSchemaInfo {
            base: CreateInfoBase::new(DEFAULT_SCHEMA),
        })?;
        txn.commit().map_err(quill_catalog::CatalogError::from)?;
        manager.attach(initial)?;

        let runtime = ThreadPoolBuilder::new()
            .num_threads(config.num_threads)
            .build()?;
        let context = Arc::new(DatabaseContext::new(manager, runtime));
        Ok(Self {
            context,
            default_database: config.database_name.clone(),
        })
    }

    pub fn session(&self) -> Result<Session> {
        Session::new(self.context.clone(), self.default_database.clone())
    }

    #[inline]
    pub fn context(&self) -> &Arc<DatabaseContext> {
        &self.context
    }
}

fn populate_system_catalog(manager: &Arc<DatabaseManager>) -> Result<()> {
    let system = manager.system();
    let txn = manager
        .txn_manager()
        .begin_transaction(IsolationLevel::Snapshot)?;
    for info in builtins::builtin_functions() {
        system.create_function(&txn, &info)?;
    }
    for info in builtins::builtin_table_functions() {
        system.create_table_function(&txn, &info)?;
    }
    for info in builtins::builtin_pragma_functions() {
        system.create_pragma_function(&txn, &info)?;
    }
    for info in builtins::builtin_copy_functions() {
        system.create_copy_function(&txn, &info)?;
    }
    for info in builtins::builtin_collations() {
        system.create_collation(&txn, &info)?;
    }
    txn.commit().map_err(quill_catalog::CatalogError::from)?;
    debug!("system catalog populated");
    Ok(())
}
