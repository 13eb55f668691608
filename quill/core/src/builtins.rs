//! Descriptors of the built-in functions registered into the system
//! catalog at startup. Only signatures live here; the bodies are bound by
//! name in the expression layer.

use quill_catalog::entry::{
    AggregateFunctionEntry, FunctionSignature, ScalarFunctionEntry, TableFunctionSignature,
};
use quill_catalog::info::{
    CreateCollationInfo, CreateCopyFunctionInfo, CreateFunctionInfo, CreateInfoBase,
    CreatePragmaFunctionInfo, CreateTableFunctionInfo, FunctionDescriptor, OnCreateConflict,
};
use quill_common::data_type::LogicalType;

fn base(name: &str) -> CreateInfoBase {
    let mut base = CreateInfoBase::new(name).with_on_conflict(OnCreateConflict::AlterOnConflict);
    base.internal = true;
    base
}

fn sig(parameters: Vec<LogicalType>, return_type: LogicalType) -> FunctionSignature {
    FunctionSignature::new(parameters, return_type)
}

fn scalar(name: &str, overloads: Vec<FunctionSignature>) -> CreateFunctionInfo {
    CreateFunctionInfo {
        base: base(name),
        function: FunctionDescriptor::Scalar(ScalarFunctionEntry::new(overloads)),
    }
}

fn aggregate(name: &str, overloads: Vec<FunctionSignature>) -> CreateFunctionInfo {
    CreateFunctionInfo {
        base: base(name),
        function: FunctionDescriptor::Aggregate(AggregateFunctionEntry::new(overloads)),
    }
}

/// Scalar and aggregate built-ins.
pub fn builtin_functions() -> Vec<CreateFunctionInfo> {
    use LogicalType::*;
    let numeric_unary = |name: &str| {
        scalar(name, vec![
            sig(vec![Int64], Int64),
            sig(vec![Float64], Float64),
        ])
    };
    vec![
        numeric_unary("abs"),
        numeric_unary("ceil"),
        numeric_unary("floor"),
        numeric_unary("round"),
        scalar("length", vec![sig(vec![Varchar], Int64)]),
        scalar("lower", vec![sig(vec![Varchar], Varchar)]),
        scalar("upper", vec![sig(vec![Varchar], Varchar)]),
        scalar("trim", vec![sig(vec![Varchar], Varchar)]),
        scalar("concat", vec![{
            let mut s = sig(vec![Varchar], Varchar);
            s.varargs = true;
            s
        }]),
        scalar("substring", vec![sig(vec![Varchar, Int64, Int64], Varchar)]),
        // Component extraction over every temporal type.
        scalar("date_part", vec![
            sig(vec![Varchar, Date], Int64),
            sig(vec![Varchar, Timestamp], Int64),
            sig(vec![Varchar, Time], Int64),
            sig(vec![Varchar, Interval], Int64),
        ]),
        scalar("date_trunc", vec![
            sig(vec![Varchar, Date], Date),
            sig(vec![Varchar, Timestamp], Timestamp),
        ]),
        scalar("now", vec![sig(vec![], Timestamp)]),
        aggregate("count", vec![{
            let mut s = sig(vec![], Int64);
            s.varargs = true;
            s
        }]),
        aggregate("sum", vec![
            sig(vec![Int64], Int64),
            sig(vec![Float64], Float64),
        ]),
        aggregate("avg", vec![sig(vec![Float64], Float64)]),
        aggregate("min", vec![
            sig(vec![Int64], Int64),
            sig(vec![Float64], Float64),
            sig(vec![Varchar], Varchar),
        ]),
        aggregate("max", vec![
            sig(vec![Int64], Int64),
            sig(vec![Float64], Float64),
            sig(vec![Varchar], Varchar),
        ]),
        aggregate("string_agg", vec![sig(vec![Varchar, Varchar], Varchar)]),
    ]
}

pub fn builtin_table_functions() -> Vec<CreateTableFunctionInfo> {
    use LogicalType::*;
    let table = |name: &str, parameters: Vec<LogicalType>| CreateTableFunctionInfo {
        base: base(name),
        overloads: vec![TableFunctionSignature {
            parameters,
            named_parameters: vec![],
        }],
    };
    vec![
        table("range", vec![Int64, Int64, Int64]),
        table("glob", vec![Varchar]),
        CreateTableFunctionInfo {
            base: base("read_csv"),
            overloads: vec![TableFunctionSignature {
                parameters: vec![Varchar],
                named_parameters: vec![
                    ("header".to_string(), Boolean),
                    ("delim".to_string(), Varchar),
                ],
            }],
        },
    ]
}

pub fn builtin_pragma_functions() -> Vec<CreatePragmaFunctionInfo> {
    use LogicalType::*;
    vec![
        CreatePragmaFunctionInfo {
            base: base("database_list"),
            parameters: vec![],
        },
        CreatePragmaFunctionInfo {
            base: base("show_tables"),
            parameters: vec![],
        },
        CreatePragmaFunctionInfo {
            base: base("table_info"),
            parameters: vec![Varchar],
        },
        CreatePragmaFunctionInfo {
            base: base("version"),
            parameters: vec![],
        },
    ]
}

pub fn builtin_copy_functions() -> Vec<CreateCopyFunctionInfo> {
    vec![CreateCopyFunctionInfo {
        base: base("csv"),
        format: "csv".to_string(),
    }]
}

pub fn builtin_collations() -> Vec<CreateCollationInfo> {
    vec![
        CreateCollationInfo {
            base: base("nocase"),
            function: "lower".to_string(),
            combinable: true,
        },
        CreateCollationInfo {
            base: base("noaccent"),
            function: "strip_accents".to_string(),
            combinable: true,
        },
    ]
}
