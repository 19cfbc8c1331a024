use crate::Error;
use std::fmt::{self, Display, Formatter};

/// Category of a failure surfaced by the core.
///
/// The kind travels as [`anyhow`] context on top of the originating error, so the
/// full cause chain stays available through `{:#}` formatting while callers can
/// branch on the category with [`ErrorKind::of`]. When several kinds are stacked
/// (an aborted batch over a storage failure), the outermost one is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The pool could not open a connection to the backend.
    Connection,
    /// The pool stayed at capacity for longer than the acquire timeout.
    ResourceExhausted,
    /// The filter expression or the projection of a read cannot be translated.
    InvalidPredicate,
    /// The backend rejected a statement.
    Storage,
    /// One member of an atomic batch failed and the whole batch was rolled back.
    TransactionAborted,
}

impl ErrorKind {
    pub fn of(error: &Error) -> Option<ErrorKind> {
        error.downcast_ref::<ErrorKind>().copied()
    }

    pub fn is(self, error: &Error) -> bool {
        Self::of(error) == Some(self)
    }

    /// Tag `error` with this kind.
    pub fn wrap(self, error: Error) -> Error {
        error.context(self)
    }

    pub fn msg<M>(self, message: M) -> Error
    where
        M: Display + fmt::Debug + Send + Sync + 'static,
    {
        Error::msg(message).context(self)
    }
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ErrorKind::Connection => "connection error",
            ErrorKind::ResourceExhausted => "resource exhausted",
            ErrorKind::InvalidPredicate => "invalid predicate",
            ErrorKind::Storage => "storage error",
            ErrorKind::TransactionAborted => "transaction aborted",
        })
    }
}
