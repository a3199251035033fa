use std::io;

use crate::codes::Category;

/// Errors surfaced to callers of this crate.
///
/// Stream translation problems are never surfaced through this type by the
/// wrapper itself. They are logged and absorbed so that wrapping an output
/// stream cannot change whether a program succeeds.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("unknown {category} name '{name}'")]
    UnknownName { category: Category, name: String },

    #[error(
        "unrecognized category '{0}': valid categories are: \
         palette, fore, back, style, cursor"
    )]
    UnknownCategory(String),

    #[error(
        "unrecognized color choice '{0}': valid choices are: \
         always, always-ansi, never, auto"
    )]
    InvalidChoice(String),

    #[error("invalid style '{given}': {reason}")]
    InvalidStyle { given: String, reason: &'static str },

    #[error("{operation} has no native equivalent on this console")]
    UnsupportedPlatformOperation { operation: &'static str },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns true for errors a console backend reports when it simply
    /// cannot perform an operation.
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Error::UnsupportedPlatformOperation { .. })
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> io::Error {
        let kind = if err.is_unsupported() {
            io::ErrorKind::Unsupported
        } else {
            io::ErrorKind::InvalidInput
        };
        io::Error::new(kind, err)
    }
}

/// Builds the `io::Error` a console backend returns for an operation it
/// cannot emulate.
pub(crate) fn unsupported(operation: &'static str) -> io::Error {
    Error::UnsupportedPlatformOperation { operation }.into()
}
