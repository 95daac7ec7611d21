//! # portcullis-store
//!
//! `DurableStore` implementations for the portcullis session mirror.
//!
//! - [`MemoryStore`] keeps entries in process memory.
//! - [`FileStore`] keeps entries in a JSON file, the way a browser keeps
//!   local storage across restarts.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use portcullis_store::FileStore;
//!
//! let store = Arc::new(FileStore::open(".portcullis/session.json")?);
//! let session = AuthzSession::new(source, store);
//! session.hydrate();
//! ```

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// ── Tests ─────────────────────────────────────────────────────────────────────
