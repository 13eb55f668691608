use quill_common::data_type::LogicalType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub ty: LogicalType,
    /// SQL text of the default expression, if any.
    pub default_value: Option<String>,
}

impl ColumnDefinition {
    pub fn new(name: impl Into<String>, ty: LogicalType) -> Self {
        Self {
            name: name.into(),
            ty,
            default_value: None,
        }
    }
}

/// Column layout of a base table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TableEntry {
    pub columns: Vec<ColumnDefinition>,
}

impl TableEntry {
    pub fn new(columns: Vec<ColumnDefinition>) -> Self {
        Self { columns }
    }

    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Copy with an extra column appended; `None` if the name is taken.
    pub fn with_column(&self, column: ColumnDefinition) -> Option<TableEntry> {
        if self.column(&column.name).is_some() {
            return None;
        }
        let mut columns = self.columns.clone();
        columns.push(column);
        Some(TableEntry { columns })
    }

    /// Copy with the default of one column replaced; `None` if the column
    /// does not exist.
    pub fn with_default(&self, name: &str, default_value: Option<String>) -> Option<TableEntry> {
        let idx = self.columns.iter().position(|c| c.name == name)?;
        let mut columns = self.columns.clone();
        columns[idx].default_value = default_value;
        Some(TableEntry { columns })
    }
}
