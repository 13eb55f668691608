//! Function entry payloads. The catalog stores descriptors only; the bodies
//! of built-in functions live with the expression executor and are resolved
//! by name at bind time.

use quill_common::data_type::LogicalType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub parameters: Vec<LogicalType>,
    pub return_type: LogicalType,
    pub varargs: bool,
}

impl FunctionSignature {
    pub fn new(parameters: Vec<LogicalType>, return_type: LogicalType) -> Self {
        Self {
            parameters,
            return_type,
            varargs: false,
        }
    }
}

fn merge_overloads<T: Clone + PartialEq>(old: &[T], new: &[T]) -> Vec<T> {
    let mut merged = old.to_vec();
    for overload in new {
        if !merged.contains(overload) {
            merged.push(overload.clone());
        }
    }
    merged
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScalarFunctionEntry {
    pub overloads: Vec<FunctionSignature>,
}

impl ScalarFunctionEntry {
    pub fn new(overloads: Vec<FunctionSignature>) -> Self {
        Self { overloads }
    }

    pub fn merged(&self, other: &ScalarFunctionEntry) -> ScalarFunctionEntry {
        ScalarFunctionEntry {
            overloads: merge_overloads(&self.overloads, &other.overloads),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregateFunctionEntry {
    pub overloads: Vec<FunctionSignature>,
}

impl AggregateFunctionEntry {
    pub fn new(overloads: Vec<FunctionSignature>) -> Self {
        Self { overloads }
    }

    pub fn merged(&self, other: &AggregateFunctionEntry) -> AggregateFunctionEntry {
        AggregateFunctionEntry {
            overloads: merge_overloads(&self.overloads, &other.overloads),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableFunctionSignature {
    pub parameters: Vec<LogicalType>,
    pub named_parameters: Vec<(String, LogicalType)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableFunctionEntry {
    pub overloads: Vec<TableFunctionSignature>,
}

impl TableFunctionEntry {
    pub fn new(overloads: Vec<TableFunctionSignature>) -> Self {
        Self { overloads }
    }

    pub fn merged(&self, other: &TableFunctionEntry) -> TableFunctionEntry {
        TableFunctionEntry {
            overloads: merge_overloads(&self.overloads, &other.overloads),
        }
    }
}

/// Pragmas are callable either as statements or with call arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PragmaFunctionEntry {
    pub parameters: Vec<LogicalType>,
}

impl PragmaFunctionEntry {
    pub fn new(parameters: Vec<LogicalType>) -> Self {
        Self { parameters }
    }
}

/// A registered COPY format (e.g. `csv`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyFunctionEntry {
    pub format: String,
}

impl CopyFunctionEntry {
    pub fn new(format: impl Into<String>) -> Self {
        Self {
            format: format.into(),
        }
    }
}

/// One macro overload: positional parameter names plus the body text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MacroDefinition {
    pub parameters: Vec<String>,
    pub body: String,
}

/// SQL macros; several overloads may share one name, distinguished by
/// parameter count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MacroEntry {
    pub overloads: Vec<MacroDefinition>,
}

impl MacroEntry {
    pub fn new(overloads: Vec<MacroDefinition>) -> Self {
        Self { overloads }
    }

    pub fn merged(&self, other: &MacroEntry) -> MacroEntry {
        MacroEntry {
            overloads: merge_overloads(&self.overloads, &other.overloads),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merged_deduplicates_overloads() {
        let sig_int = FunctionSignature::new(vec![LogicalType::Int64], LogicalType::Int64);
        let sig_str = FunctionSignature::new(vec![LogicalType::Varchar], LogicalType::Varchar);
        let old = ScalarFunctionEntry::new(vec![sig_int.clone()]);
        let new = ScalarFunctionEntry::new(vec![sig_int, sig_str]);
        assert_eq!(old.merged(&new).overloads.len(), 2);
    }
}
