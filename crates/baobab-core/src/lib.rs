// baobab-core: Record cache, response parsing, and session orchestration
// between baobab-api and consumers.

pub mod config;
pub mod error;
pub mod event;
pub mod model;
mod operation;
pub mod parse;
pub mod sdk;
pub mod session;
pub mod store;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{LoginCredentials, SdkConfig, TlsVerification};
pub use error::{CoreError, ErrorCategory};
pub use event::SdkEvent;
pub use sdk::{CHUNK_SIZE, EVENT_CHANNEL_SIZE, Sdk};
pub use session::ConnectionState;
pub use store::RecordCache;

pub use model::{
    AddressElements, ChangeRecord, CommonFields, Coordinate, DataFields, Database, Fields,
    LoginFields, Payload, PayloadKind, Permissions, PlaceFields, Record, RecordBody, RecordKey,
    RecordKind, SecurityFields, ThingFields, UserFields,
};
