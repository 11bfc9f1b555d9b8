//! Folio document engine
//!
//! The storage core of an e-book reader: a pooled in-memory document tree,
//! stable cross-version addresses into it, a fingerprint-keyed disk cache
//! that makes reopening large books fast, and the range/word machinery that
//! selections and highlights are built from. Format importers and the
//! layout engine live behind the traits in [`traits`]; this crate never
//! parses markup or measures text itself.

pub mod address;
pub mod cache;
pub mod context;
pub mod dom;
pub mod error;
pub mod geom;
pub mod range;
pub mod serial;
pub mod toc;
pub mod traits;
pub mod words;

pub use address::Address;
pub use cache::{CacheLookup, DocCache, Fingerprint};
pub use context::{EngineConfig, EngineContext, DOM_VERSION_CURRENT, DOM_VERSION_NORMALIZED_ADDRESSES};
pub use dom::{Document, NodeId, OpenOutcome};
pub use error::{EngineError, Result};
pub use geom::{MoveDirection, Point, Rect};
pub use range::{MarkedRange, Range};
pub use serial::SerialBuf;
pub use toc::{PageMapItem, TocItem};
pub use traits::{ImportSink, Importer, LayoutProvider};
pub use words::{Word, WordList};
