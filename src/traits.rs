//! Collaborator interfaces
//!
//! The engine never parses source formats or computes layout itself; both
//! live behind these traits. Format importers populate the tree and report
//! format identification early, so a cache hit can cut the parse short.
//! The layout provider answers geometry queries for addresses; the range
//! and word components treat its answers as opaque rectangles.

use crate::address::Address;
use crate::dom::Document;
use crate::error::Result;
use crate::geom::{Point, Rect};

/// Callback handed to an importer while it parses
pub trait ImportSink {
    /// Called once the importer has identified the source format, before
    /// the full parse completes. `format_flags` captures every option that
    /// affects parse output. Returning `false` tells the importer a valid
    /// cache entry exists and parsing may stop.
    fn format_detected(&mut self, format_flags: u32) -> bool;
}

/// A format-specific parser that fills a fresh document tree
pub trait Importer {
    /// Parse `source` into `doc`. Must call `sink.format_detected` exactly
    /// once, as early as format identification allows, and honor a `false`
    /// return by stopping with `Ok`.
    fn populate(
        &mut self,
        doc: &mut Document,
        source: &[u8],
        sink: &mut dyn ImportSink,
    ) -> Result<()>;
}

/// Rendered geometry supplied by the layout engine
pub trait LayoutProvider {
    /// Screen point of a document position; `None` if not laid out
    fn point_of(&self, doc: &Document, addr: &Address) -> Option<Point>;

    /// Rectangles of the rendered lines between two positions, top to
    /// bottom in reading order
    fn line_rects(&self, doc: &Document, start: &Address, end: &Address) -> Vec<Rect>;

    /// Bounding rectangle of `len` characters of text starting at `start`
    fn text_rect(&self, doc: &Document, start: &Address, len: u32) -> Option<Rect>;
}
