use serde::{Deserialize, Serialize};

/// A named query. The catalog stores the SQL text; binding happens in the
/// planner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewEntry {
    pub sql: String,
    /// Optional column aliases exposed instead of the query's own names.
    pub column_aliases: Vec<String>,
}

impl ViewEntry {
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            column_aliases: Vec::new(),
        }
    }
}
