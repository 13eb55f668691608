use serde::{Deserialize, Serialize};

/// A named collation; the comparison routine itself is resolved by name in
/// the expression layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollationEntry {
    /// Name of the comparison routine to bind.
    pub function: String,
    /// Combinable with other collations (e.g. `nocase.noaccent`).
    pub combinable: bool,
}

impl CollationEntry {
    pub fn new(function: impl Into<String>, combinable: bool) -> Self {
        Self {
            function: function.into(),
            combinable,
        }
    }
}
