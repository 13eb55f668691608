//! The process-wide set of attached catalogs, plus the sealed system
//! catalog and the transaction manager shared by every session.

use std::sync::{Arc, RwLock};

use quill_common::IsolationLevel;
use quill_common::Transaction;
use quill_common::constants::{DEFAULT_SCHEMA, SYSTEM_CATALOG, TEMP_CATALOG};
use tracing::info;

use crate::catalog::Catalog;
use crate::error::{CatalogError, CatalogResult};
use crate::info::{CreateInfoBase, CreateSchemaInfo, OnCreateConflict};
use crate::settings::SettingRegistry;
use crate::txn::manager::CatalogTxnManager;

#[derive(Debug)]
pub struct DatabaseManager {
    /// Attached catalogs in attach order; reads vastly outnumber attaches.
    databases: RwLock<Vec<Arc<Catalog>>>,
    system: Arc<Catalog>,
    txn_manager: CatalogTxnManager,
    settings: SettingRegistry,
}

impl DatabaseManager {
    /// Create the manager with an unsealed system catalog holding an empty
    /// `main` schema. The caller registers built-ins and then calls
    /// [`DatabaseManager::seal_system`].
    pub fn new() -> CatalogResult<Self> {
        let txn_manager = CatalogTxnManager::new();
        let system = Arc::new(Catalog::new_system());
        let txn = txn_manager.begin_transaction(IsolationLevel::Snapshot)?;
        system.create_schema(&txn, &CreateSchemaInfo {
            base: CreateInfoBase::new(DEFAULT_SCHEMA)
                .with_on_conflict(OnCreateConflict::Ignore),
        })?;
        txn.commit()?;
        Ok(Self {
            databases: RwLock::new(Vec::new()),
            system,
            txn_manager,
            settings: SettingRegistry::new(),
        })
    }

    #[inline]
    pub fn system(&self) -> &Arc<Catalog> {
        &self.system
    }

    /// Freeze the system catalog; every later write fails.
    pub fn seal_system(&self) {
        self.system.seal();
    }

    #[inline]
    pub fn txn_manager(&self) -> &CatalogTxnManager {
        &self.txn_manager
    }

    #[inline]
    pub fn settings(&self) -> &SettingRegistry {
        &self.settings
    }

    /// Register a catalog under its name. Reserved names are rejected.
    pub fn attach(&self, catalog: Arc<Catalog>) -> CatalogResult<()> {
        let name = catalog.name().to_string();
        if name.is_empty() || name == SYSTEM_CATALOG || name == TEMP_CATALOG {
            return Err(CatalogError::InvalidArgument {
                reason: format!("\"{name}\" is a reserved database name"),
            });
        }
        let mut guard = self.databases.write().expect("poisoned database list");
        if guard.iter().any(|c| c.name() == name) {
            return Err(CatalogError::DatabaseAlreadyExists { name });
        }
        info!(database = %name, "attach database");
        guard.push(catalog);
        Ok(())
    }

    pub fn detach(&self, name: &str) -> CatalogResult<()> {
        let mut guard = self.databases.write().expect("poisoned database list");
        let Some(pos) = guard.iter().position(|c| c.name() == name) else {
            return Err(CatalogError::CatalogNotFound {
                name: name.to_string(),
            });
        };
        info!(database = %name, "detach database");
        guard.remove(pos);
        Ok(())
    }

    /// Attached catalog by exact name; `system` resolves too.
    pub fn get(&self, name: &str) -> Option<Arc<Catalog>> {
        if name == SYSTEM_CATALOG {
            return Some(self.system.clone());
        }
        let guard = self.databases.read().expect("poisoned database list");
        guard.iter().find(|c| c.name() == name).cloned()
    }

    pub fn get_or_fail(&self, name: &str) -> CatalogResult<Arc<Catalog>> {
        self.get(name).ok_or_else(|| CatalogError::CatalogNotFound {
            name: name.to_string(),
        })
    }

    /// Attached catalogs in attach order (system and temp excluded).
    pub fn list(&self) -> Vec<Arc<Catalog>> {
        self.databases
            .read()
            .expect("poisoned database list")
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attach_detach_roundtrip() {
        let manager = DatabaseManager::new().unwrap();
        manager.attach(Arc::new(Catalog::new("db1"))).unwrap();
        assert!(manager.get("db1").is_some());

        let err = manager.attach(Arc::new(Catalog::new("db1"))).unwrap_err();
        assert!(matches!(err, CatalogError::DatabaseAlreadyExists { .. }));

        manager.detach("db1").unwrap();
        assert!(manager.get("db1").is_none());
        let err = manager.detach("db1").unwrap_err();
        assert_eq!(err.to_string(), "Catalog \"db1\" does not exist!");
    }

    #[test]
    fn reserved_names_rejected() {
        let manager = DatabaseManager::new().unwrap();
        let err = manager
            .attach(Arc::new(Catalog::new(SYSTEM_CATALOG)))
            .unwrap_err();
        assert!(matches!(err, CatalogError::InvalidArgument { .. }));
    }

    #[test]
    fn system_catalog_always_resolves() {
        let manager = DatabaseManager::new().unwrap();
        let system = manager.get(SYSTEM_CATALOG).unwrap();
        assert!(system.is_system());
    }
}
