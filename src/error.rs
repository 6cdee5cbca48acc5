use std::path::PathBuf;

use thiserror::Error;

/// Coarse failure category, one per class of problem a caller may want to
/// react to differently.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The request itself is unusable: the target exists, or a table payload is malformed.
    Precondition,
    /// A referenced image file is missing or unreadable.
    ResourceNotFound,
    /// The content does not fit the page, or asks for a layout that does not exist.
    LayoutConstraint,
    /// The PDF could not be produced or written.
    Rendering,
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("Output file already exists: {}", .0.display())]
    OutputExists(PathBuf),

    #[error("Invalid table definition: {0}")]
    InvalidTable(#[from] serde_json::Error),

    #[error("Table row {row} has no value for column \"{column}\"")]
    MissingRowValue { row: usize, column: String },

    #[error("Table row {row} has a non-text value for column \"{column}\"")]
    InvalidRowValue { row: usize, column: String },

    #[error("Image not found from path: {}", .0.display())]
    ImageNotFound(PathBuf),

    #[error("Path to header graphics was empty or the file does not exist: {}", .0.display())]
    MissingGraphics(PathBuf),

    #[error("Unsupported or corrupt image {}: {reason}", path.display())]
    InvalidImage { path: PathBuf, reason: String },

    #[error(
        "Page allows table to be {allowed_cm} cm wide. Provided table's width is larger than that, {required_cm} cm."
    )]
    TableTooWide { allowed_cm: f64, required_cm: f64 },

    #[error("Cannot insert {0} without proper style choice.")]
    UnknownHeaderFooterStyle(&'static str),

    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::OutputExists(_)
            | Error::InvalidTable(_)
            | Error::MissingRowValue { .. }
            | Error::InvalidRowValue { .. } => ErrorKind::Precondition,
            Error::ImageNotFound(_) | Error::MissingGraphics(_) | Error::InvalidImage { .. } => {
                ErrorKind::ResourceNotFound
            }
            Error::TableTooWide { .. } | Error::UnknownHeaderFooterStyle(_) => {
                ErrorKind::LayoutConstraint
            }
            Error::Render(_) | Error::Io(_) => ErrorKind::Rendering,
        }
    }
}
