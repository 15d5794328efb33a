// ── SDK events ──
//
// Everything the SDK reports asynchronously arrives on one broadcast
// channel. Events may be sent from any worker thread.

use std::sync::Arc;

use crate::error::CoreError;
use crate::model::RecordKey;

/// A notification from an [`Sdk`](crate::Sdk) instance.
#[derive(Debug, Clone)]
pub enum SdkEvent {
    /// Whether the server answered the baseline probe.
    ConnectionValid(bool),
    /// Whether a login is currently in effect.
    LoginValid(bool),
    /// Records now available in the cache, as one batch.
    Records(Vec<RecordKey>),
    /// A save was accepted; the record is clean again.
    Saved(RecordKey),
    /// A new record was created and cached under this handle.
    Created(RecordKey),
    Error(Arc<CoreError>),
    /// The server connection was invalidated.
    Disconnected,
    /// Every request started so far has finished.
    OperationComplete,
}

impl SdkEvent {
    pub(crate) fn error(err: CoreError) -> Self {
        Self::Error(Arc::new(err))
    }
}
