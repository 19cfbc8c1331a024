use crate::{Connection, Result};
use std::future::Future;

/// Entry point of a storage backend: knows how to open sessions.
///
/// A driver is created once and handed to a [`Pool`](crate::Pool), which is the
/// only component calling `connect`.
pub trait Driver: Send + Sync + 'static {
    type Connection: Connection;

    const NAME: &'static str;

    /// Open a new session with the backend.
    fn connect(&self) -> impl Future<Output = Result<Self::Connection>> + Send;
}
