//! Diagram state: the document model, its encodings, and the store that
//! keeps editor content, storage, and the shareable link in sync.
//!
//! - [`document`]: `DiagramDocument`, `Theme`, and the wire JSON shape
//! - [`codec`]: compressed, URL-safe link payloads
//! - [`storage`]: the local-storage capability
//! - [`location`]: the address-bar capability
//! - [`store`]: bootstrap, persistence, and debounced link sync

pub mod codec;
pub mod document;
pub mod location;
pub mod storage;
pub mod store;

pub use codec::{decode, encode, share_url};
pub use document::{DEFAULT_DIAGRAM_CODE, DiagramDocument, FORMAT_VERSION, Theme};
pub use location::{AddressBar, DATA_PARAM, InvalidUrl, Location};
pub use storage::{
    FileStorage, MemoryStorage, STORAGE_KEY, Storage, StorageError, default_storage_dir,
};
pub use store::{BootstrapSource, DiagramState, DiagramStore, LINK_DEBOUNCE_MS, StoreDefaults};

/// Why a link payload or storage record could not be turned into a document.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload could not be decompressed")]
    Decompress,
    #[error("payload is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload does not match the document schema: {0}")]
    Schema(String),
}
