//! Session persistence
//!
//! Features:
//! - Session records created on first play, finalized on game over
//! - Store contract for the external persistence collaborator
//! - In-memory and LocalStorage stores
//! - Fail-open questionnaire gating

pub mod record;
pub mod store;
pub mod sync;

pub use record::{SessionFilter, SessionMeta, SessionRecord, SessionStatus, SessionUpdate};
#[cfg(target_arch = "wasm32")]
pub use store::LocalStorageStore;
pub use store::{MemoryStore, SessionStore, StoreError};
pub use sync::{SessionContext, SessionSync};
