use miette::Diagnostic;
use quill_catalog::error::CatalogError;
use quill_catalog::txn::error::CatalogTxnError;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum Error {
    #[error(transparent)]
    #[diagnostic(code(quill::catalog))]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    #[diagnostic(code(quill::transaction))]
    Transaction(#[from] CatalogTxnError),

    #[error("session is closed")]
    #[diagnostic(code(quill::session_closed))]
    SessionClosed,

    #[error("failed to build the worker pool: {0}")]
    #[diagnostic(code(quill::runtime))]
    Runtime(#[from] rayon::ThreadPoolBuildError),
}

pub type Result<T> = std::result::Result<T, Error>;
