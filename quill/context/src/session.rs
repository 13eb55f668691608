use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use quill_catalog::catalog::Catalog;
use quill_catalog::error::{CatalogError, CatalogResult};
use quill_catalog::info::{CreateInfoBase, CreateSchemaInfo, OnCreateConflict};
use quill_catalog::resolve::ResolveContext;
use quill_catalog::search_path::{CatalogSearchEntry, CatalogSearchPath};
use quill_catalog::txn::catalog_txn::CatalogTxn;
use quill_common::constants::DEFAULT_SCHEMA;
use quill_common::{IsolationLevel, Transaction};

use crate::database::DatabaseContext;

/// Per-session state: the session-local temporary catalog, the search
/// path, the selected default database, the current explicit transaction
/// and the interrupt flag.
#[derive(Debug)]
pub struct SessionContext {
    database: Arc<DatabaseContext>,
    temp_catalog: Arc<Catalog>,
    search_path: CatalogSearchPath,
    default_database: String,
    current_txn: Option<Arc<CatalogTxn>>,
    interrupted: Arc<AtomicBool>,
    isolation_level: Option<IsolationLevel>,
}

impl SessionContext {
    pub fn new(
        database: Arc<DatabaseContext>,
        default_database: impl Into<String>,
    ) -> CatalogResult<Self> {
        // The temporary catalog lives and dies with this session; give it
        // the standard main schema so unqualified temp names resolve.
        let temp_catalog = Arc::new(Catalog::new_temporary());
        let txn = database
            .manager()
            .txn_manager()
            .begin_transaction(IsolationLevel::Snapshot)?;
        temp_catalog.create_schema(&txn, &CreateSchemaInfo {
            base: CreateInfoBase::new(DEFAULT_SCHEMA).with_on_conflict(OnCreateConflict::Ignore),
        })?;
        txn.commit()?;
        Ok(Self {
            database,
            temp_catalog,
            search_path: CatalogSearchPath::new(),
            default_database: default_database.into(),
            current_txn: None,
            interrupted: Arc::new(AtomicBool::new(false)),
            isolation_level: None,
        })
    }

    #[inline]
    pub fn database(&self) -> &Arc<DatabaseContext> {
        &self.database
    }

    #[inline]
    pub fn temp_catalog(&self) -> &Arc<Catalog> {
        &self.temp_catalog
    }

    #[inline]
    pub fn default_database(&self) -> &str {
        &self.default_database
    }

    pub fn set_default_database(&mut self, name: impl Into<String>) -> CatalogResult<()> {
        let name = name.into();
        self.database.manager().get_or_fail(&name)?;
        self.default_database = name;
        Ok(())
    }

    #[inline]
    pub fn search_path(&self) -> &CatalogSearchPath {
        &self.search_path
    }

    pub fn set_search_path(&mut self, entries: Vec<CatalogSearchEntry>) -> CatalogResult<()> {
        self.search_path.set(entries)
    }

    /// Bundle of everything the resolver needs from this session.
    pub fn resolve_ctx(&self) -> ResolveContext<'_> {
        ResolveContext {
            manager: self.database.manager(),
            search_path: &self.search_path,
            temp_catalog: &self.temp_catalog,
            default_database: &self.default_database,
        }
    }

    /// Signal cancellation; the next catalog operation on this session
    /// fails with `Cancelled`.
    pub fn interrupt(&self) {
        self.interrupted.store(true, Ordering::SeqCst);
    }

    pub fn clear_interrupt(&self) {
        self.interrupted.store(false, Ordering::SeqCst);
    }

    /// Default isolation level for implicitly created transactions.
    #[inline]
    pub fn set_default_isolation(&mut self, iso: IsolationLevel) {
        self.isolation_level = Some(iso);
    }

    fn begin_txn(&self) -> CatalogResult<Arc<CatalogTxn>> {
        let iso = self.isolation_level.unwrap_or(IsolationLevel::Snapshot);
        Ok(self
            .database
            .manager()
            .txn_manager()
            .begin_transaction_with(iso, Some(self.interrupted.clone()))?)
    }

    #[inline]
    pub fn current_txn(&self) -> Option<&Arc<CatalogTxn>> {
        self.current_txn.as_ref()
    }

    /// Current transaction if present, otherwise begin one and store it.
    pub fn get_or_begin_txn(&mut self) -> CatalogResult<Arc<CatalogTxn>> {
        if let Some(txn) = &self.current_txn {
            return Ok(txn.clone());
        }
        let txn = self.begin_txn()?;
        self.current_txn = Some(txn.clone());
        Ok(txn)
    }

    /// Drop the session-level reference without committing or rolling
    /// back; used after auto-commit so a finished transaction is never
    /// reused.
    #[inline]
    pub fn clear_current_txn(&mut self) {
        self.current_txn = None;
    }

    pub fn begin_explicit_txn(&mut self) -> CatalogResult<()> {
        if self.current_txn.is_some() {
            return Err(CatalogError::InvalidArgument {
                reason: "a transaction is already active".to_string(),
            });
        }
        let txn = self.begin_txn()?;
        self.current_txn = Some(txn);
        Ok(())
    }

    pub fn commit_explicit_txn(&mut self) -> CatalogResult<()> {
        let Some(txn) = self.current_txn.take() else {
            return Err(CatalogError::InvalidArgument {
                reason: "no transaction is active".to_string(),
            });
        };
        txn.commit()?;
        Ok(())
    }

    pub fn rollback_explicit_txn(&mut self) -> CatalogResult<()> {
        let Some(txn) = self.current_txn.take() else {
            return Err(CatalogError::InvalidArgument {
                reason: "no transaction is active".to_string(),
            });
        };
        txn.abort()?;
        Ok(())
    }

    /// Run one statement under the current explicit transaction, or under a
    /// fresh auto-committed one.
    pub fn with_statement_txn<T>(
        &mut self,
        f: impl FnOnce(&ResolveContext<'_>, &CatalogTxn) -> CatalogResult<T>,
    ) -> CatalogResult<T> {
        if let Some(txn) = self.current_txn.clone() {
            let ctx = self.resolve_ctx();
            return f(&ctx, &txn);
        }
        let txn = self.begin_txn()?;
        let result = {
            let ctx = self.resolve_ctx();
            f(&ctx, &txn)
        };
        match result {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(err) => {
                let _ = txn.abort();
                Err(err)
            }
        }
    }
}
