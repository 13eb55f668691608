use std::fmt;

use arrow::datatypes::DataType;
use serde::{Deserialize, Serialize};

/// Logical column type as seen by the binder and the catalog.
///
/// Maps onto arrow's physical types for execution; user-defined types are
/// registered in the catalog and referenced by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LogicalType {
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    Float32,
    Float64,
    Decimal { precision: u8, scale: i8 },
    Varchar,
    Blob,
    Date,
    Time,
    Timestamp,
    Interval,
    List(Box<LogicalType>),
    Struct(Vec<(String, LogicalType)>),
    /// Closed set of string values; the payload of a user-defined enum type.
    Enum(Vec<String>),
}

impl LogicalType {
    /// Arrow representation used by the execution layer.
    pub fn to_arrow(&self) -> DataType {
        match self {
            LogicalType::Boolean => DataType::Boolean,
            LogicalType::Int8 => DataType::Int8,
            LogicalType::Int16 => DataType::Int16,
            LogicalType::Int32 => DataType::Int32,
            LogicalType::Int64 => DataType::Int64,
            LogicalType::Float32 => DataType::Float32,
            LogicalType::Float64 => DataType::Float64,
            LogicalType::Decimal { precision, scale } => {
                DataType::Decimal128(*precision, *scale)
            }
            LogicalType::Varchar => DataType::Utf8,
            LogicalType::Blob => DataType::Binary,
            LogicalType::Date => DataType::Date32,
            LogicalType::Time => DataType::Time64(arrow::datatypes::TimeUnit::Microsecond),
            LogicalType::Timestamp => {
                DataType::Timestamp(arrow::datatypes::TimeUnit::Microsecond, None)
            }
            LogicalType::Interval => {
                DataType::Interval(arrow::datatypes::IntervalUnit::MonthDayNano)
            }
            LogicalType::List(inner) => DataType::List(
                arrow::datatypes::Field::new("item", inner.to_arrow(), true).into(),
            ),
            LogicalType::Struct(fields) => DataType::Struct(
                fields
                    .iter()
                    .map(|(name, ty)| arrow::datatypes::Field::new(name, ty.to_arrow(), true))
                    .collect(),
            ),
            // Enums are dictionary-encoded strings at execution time.
            LogicalType::Enum(_) => DataType::Dictionary(
                Box::new(DataType::UInt32),
                Box::new(DataType::Utf8),
            ),
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Boolean => write!(f, "BOOLEAN"),
            LogicalType::Int8 => write!(f, "TINYINT"),
            LogicalType::Int16 => write!(f, "SMALLINT"),
            LogicalType::Int32 => write!(f, "INTEGER"),
            LogicalType::Int64 => write!(f, "BIGINT"),
            LogicalType::Float32 => write!(f, "FLOAT"),
            LogicalType::Float64 => write!(f, "DOUBLE"),
            LogicalType::Decimal { precision, scale } => {
                write!(f, "DECIMAL({precision},{scale})")
            }
            LogicalType::Varchar => write!(f, "VARCHAR"),
            LogicalType::Blob => write!(f, "BLOB"),
            LogicalType::Date => write!(f, "DATE"),
            LogicalType::Time => write!(f, "TIME"),
            LogicalType::Timestamp => write!(f, "TIMESTAMP"),
            LogicalType::Interval => write!(f, "INTERVAL"),
            LogicalType::List(inner) => write!(f, "{inner}[]"),
            LogicalType::Struct(fields) => {
                write!(f, "STRUCT(")?;
                for (i, (name, ty)) in fields.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name} {ty}")?;
                }
                write!(f, ")")
            }
            LogicalType::Enum(values) => write!(f, "ENUM({} values)", values.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arrow_mapping_roundtrips_scalars() {
        assert_eq!(LogicalType::Int64.to_arrow(), DataType::Int64);
        assert_eq!(LogicalType::Varchar.to_arrow(), DataType::Utf8);
    }

    #[test]
    fn display_is_sql_ish() {
        assert_eq!(LogicalType::Int32.to_string(), "INTEGER");
        assert_eq!(
            LogicalType::List(Box::new(LogicalType::Varchar)).to_string(),
            "VARCHAR[]"
        );
    }
}
