use std::sync::Arc;

use quill_catalog::DatabaseManager;
use rayon::ThreadPool;

/// Process-wide state shared by every session: the attached-catalog set and
/// the worker pool.
pub struct DatabaseContext {
    manager: Arc<DatabaseManager>,
    runtime: ThreadPool,
}

impl DatabaseContext {
    pub fn new(manager: Arc<DatabaseManager>, runtime: ThreadPool) -> Self {
        Self { manager, runtime }
    }

    #[inline]
    pub fn manager(&self) -> &Arc<DatabaseManager> {
        &self.manager
    }

    #[inline]
    pub fn runtime(&self) -> &ThreadPool {
        &self.runtime
    }
}

impl std::fmt::Debug for DatabaseContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseContext").finish()
    }
}
