// ── Record model ──
//
// Identity, the typed record hierarchy, and per-record change tracking.

pub mod data;
pub mod kind;
pub mod payload;
pub mod record;
pub mod security;
pub mod variants;

pub use data::{Coordinate, DataFields};
pub use kind::{Database, RecordKey, RecordKind};
pub use payload::{Payload, PayloadKind};
pub use record::{ChangeRecord, CommonFields, Fields, Record, RecordBody};
pub use security::{ANY_AUTHENTICATED_TOKEN, LoginFields, Permissions, SecurityFields};
pub use variants::{AddressElements, PlaceFields, ThingFields, UserFields};
