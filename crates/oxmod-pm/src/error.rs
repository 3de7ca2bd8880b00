use thiserror::Error;

use oxmod_atom::AtomError;

#[derive(Error, Debug)]
pub enum OxmodError {
    // Atom/version parsing errors
    #[error("Invalid atom: {0}")]
    Atom(#[from] AtomError),

    // USE-string / dependency-string errors
    #[error("Invalid use-conditional expression: {message} (near token {position})")]
    InvalidExpression { message: String, position: usize },

    // Lookup errors: recoverable by the caller ("no install plan for this atom")
    #[error("No candidates found for atom: {atom}")]
    PackageNotFound { atom: String },

    // Metadata errors
    #[error("Failed to parse package metadata: {0}")]
    JsonParse(#[from] serde_json::Error),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, OxmodError>;
