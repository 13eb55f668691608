use quill_common::data_type::LogicalType;
use serde::{Deserialize, Serialize};

/// A user-defined type; today that means enums and aliases over built-in
/// types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeEntry {
    pub ty: LogicalType,
}

impl TypeEntry {
    pub fn new(ty: LogicalType) -> Self {
        Self { ty }
    }
}
