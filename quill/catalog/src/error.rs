use thiserror::Error;

use crate::entry::EntryKind;
use crate::txn::error::CatalogTxnError;

pub type CatalogResult<T> = Result<T, CatalogError>;

/// Errors surfaced by catalog operations. Message prefixes are part of the
/// user-visible contract and tested literally.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Lookup miss; `suggestion` is the preformatted "did you mean" tail or
    /// an empty string.
    #[error("{kind} with name {name} does not exist!{suggestion}")]
    EntryNotFound {
        kind: EntryKind,
        name: String,
        suggestion: String,
    },

    #[error(
        "{what} with name \"{name}\" is not in the catalog, but it exists in the {extension} extension.\n\nTo install and load the extension, run:\nINSTALL {extension};\nLOAD {extension};"
    )]
    NotInCatalogButInExtension {
        what: String,
        name: String,
        extension: String,
    },

    #[error("Catalog \"{name}\" does not exist!")]
    CatalogNotFound { name: String },

    #[error("CatalogElement \"{schema}.{name}\" does not exist!")]
    ElementNotFound { schema: String, name: String },

    #[error("unrecognized configuration parameter \"{name}\"{candidates}")]
    UnrecognizedConfigurationParameter { name: String, candidates: String },

    #[error("{kind} with name \"{name}\" already exists!")]
    AlreadyExists { kind: EntryKind, name: String },

    #[error("database with name \"{name}\" already exists!")]
    DatabaseAlreadyExists { name: String },

    #[error("existing entry \"{name}\" is of type {existing}, not {requested}")]
    TypeMismatch {
        name: String,
        existing: EntryKind,
        requested: EntryKind,
    },

    #[error(
        "cannot drop {kind} \"{name}\" because there are entries that depend on it. Use DROP...CASCADE to drop them as well"
    )]
    HasDependents { kind: EntryKind, name: String },

    #[error("{reason}")]
    PermissionDenied { reason: String },

    #[error("serialization conflict: a concurrent transaction modified \"{name}\"")]
    SerializationFailure { name: String },

    #[error("operation was cancelled")]
    Cancelled,

    #[error("invalid argument: {reason}")]
    InvalidArgument { reason: String },

    #[error("transaction error: {0}")]
    Transaction(CatalogTxnError),
}

impl CatalogError {
    /// Plain not-found without a suggestion tail.
    pub fn not_found(kind: EntryKind, name: impl Into<String>) -> Self {
        CatalogError::EntryNotFound {
            kind,
            name: name.into(),
            suggestion: String::new(),
        }
    }

    pub fn read_only_catalog(name: &str) -> Self {
        CatalogError::PermissionDenied {
            reason: format!("cannot modify catalog \"{name}\": it is read-only"),
        }
    }

    pub fn protected_entry(kind: EntryKind, name: &str) -> Self {
        CatalogError::PermissionDenied {
            reason: format!("cannot drop {kind} \"{name}\": it is a built-in entry"),
        }
    }
}

impl From<CatalogTxnError> for CatalogError {
    fn from(err: CatalogTxnError) -> Self {
        match err {
            CatalogTxnError::WriteConflict { key } => {
                CatalogError::SerializationFailure { name: key }
            }
            CatalogTxnError::Interrupted => CatalogError::Cancelled,
            other => CatalogError::Transaction(other),
        }
    }
}
