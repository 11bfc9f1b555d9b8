//! Ranges
//!
//! A range is an ordered pair of addresses with a flag set. Ranges are
//! value snapshots like the addresses they hold: operations return new
//! ranges instead of mutating in place, `sorted` being the one that may
//! swap the endpoints.

pub mod marked;

use std::ops::ControlFlow;

use serde::{Deserialize, Serialize};

use crate::address::resolve::{uses_normalized, view_children};
use crate::address::Address;
use crate::dom::{Document, NodeId};
use crate::geom::Point;
use crate::serial::SerialBuf;
use crate::traits::LayoutProvider;

pub use marked::{MarkedRange, RANGE_FLAGS_ENHANCED};

/// A span between two document positions
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub start: Address,
    pub end: Address,
    /// Rendering flags, shared with the marked ranges projected from this
    /// range; values below [`RANGE_FLAGS_ENHANCED`] select legacy geometry
    pub flags: u32,
}

impl Range {
    pub fn new(start: Address, end: Address) -> Self {
        Range {
            start,
            end,
            flags: 0,
        }
    }

    pub fn with_flags(start: Address, end: Address, flags: u32) -> Self {
        Range { start, end, flags }
    }

    /// The tighter of two ranges: later start, earlier end. May be empty
    /// when the inputs do not overlap.
    pub fn intersection(a: &Range, b: &Range) -> Range {
        Range {
            start: a.start.clone().max(b.start.clone()),
            end: a.end.clone().min(b.end.clone()),
            flags: a.flags,
        }
    }

    /// Endpoints in document order
    pub fn sorted(&self) -> Range {
        if !self.start.is_null() && !self.end.is_null() && self.start > self.end {
            Range {
                start: self.end.clone(),
                end: self.start.clone(),
                flags: self.flags,
            }
        } else {
            self.clone()
        }
    }

    /// True for null endpoints or a start past the end
    pub fn is_empty(&self) -> bool {
        self.start.is_null() || self.end.is_null() || self.start > self.end
    }

    /// Closed-interval overlap test; symmetric, false for empty ranges
    pub fn check_intersection(&self, other: &Range) -> bool {
        if self.is_empty() || other.is_empty() {
            return false;
        }
        self.start <= other.end && other.start <= self.end
    }

    pub fn serialize(&self, buf: &mut SerialBuf) {
        self.start.serialize(buf);
        self.end.serialize(buf);
        buf.write_u32(self.flags);
    }

    pub fn deserialize(buf: &mut SerialBuf) -> Option<Range> {
        let start = Address::deserialize(buf)?;
        let end = Address::deserialize(buf)?;
        let flags = buf.read_u32();
        if buf.error() {
            return None;
        }
        Some(Range { start, end, flags })
    }

    /// Cut overlapping ranges at each other's boundaries. The result is
    /// pairwise disjoint (segments may share a single boundary position),
    /// ordered, and covers exactly the union of the inputs. A segment
    /// covered by several inputs carries the OR of their flags; a
    /// zero-length input stays in the output unless a wider segment
    /// already covers its position.
    pub fn split_into_non_overlapping(ranges: &[Range]) -> Vec<Range> {
        let sorted: Vec<Range> = ranges
            .iter()
            .map(Range::sorted)
            .filter(|r| !r.is_empty())
            .collect();
        let mut bounds: Vec<Address> = Vec::with_capacity(sorted.len() * 2);
        for r in &sorted {
            bounds.push(r.start.clone());
            bounds.push(r.end.clone());
        }
        bounds.sort();
        bounds.dedup();

        let mut out = Vec::new();
        for pair in bounds.windows(2) {
            let mut flags = None;
            for r in &sorted {
                if r.start <= pair[0] && pair[1] <= r.end {
                    flags = Some(flags.unwrap_or(0) | r.flags);
                }
            }
            if let Some(flags) = flags {
                out.push(Range {
                    start: pair[0].clone(),
                    end: pair[1].clone(),
                    flags,
                });
            }
        }
        // a zero-length input occupies a single position; keep it unless a
        // segment already covers that position
        for r in &sorted {
            if r.start != r.end {
                continue;
            }
            if out.iter().any(|s| s.start <= r.start && r.start <= s.end) {
                continue;
            }
            let mut flags = 0;
            for o in &sorted {
                if o.start <= r.start && r.start <= o.end {
                    flags |= o.flags;
                }
            }
            out.push(Range {
                start: r.start.clone(),
                end: r.end.clone(),
                flags,
            });
        }
        out.sort_by(|a, b| a.start.cmp(&b.start).then(a.end.cmp(&b.end)));
        out
    }

    /// Walk the visible text between the endpoints in document order. `f`
    /// receives each text node with the clipped slice and the slice's
    /// starting character offset within the node; a start or end that falls
    /// mid-text clips the slice rather than dropping the node. The
    /// `keep_going` check runs at block boundaries; returns `false` when it
    /// cancelled the walk.
    pub fn for_each_text(
        &self,
        doc: &Document,
        keep_going: &dyn Fn() -> bool,
        f: &mut dyn FnMut(NodeId, &str, u32),
    ) -> bool {
        let range = self.sorted();
        if range.is_empty() {
            return true;
        }
        let normalized = uses_normalized(doc);
        let walk = walk_node(doc, doc.root(), &range, normalized, keep_going, f);
        !matches!(walk, ControlFlow::Break(Cancelled))
    }

    /// Concatenated visible text between the endpoints
    pub fn text(&self, doc: &Document) -> String {
        let mut out = String::new();
        self.for_each_text(doc, &|| true, &mut |_, s, _| out.push_str(s));
        out
    }

    /// Markup rendition of the covered content: tags of every element the
    /// range touches, text clipped at the endpoints
    pub fn html(&self, doc: &Document) -> String {
        let range = self.sorted();
        let mut out = String::new();
        if range.is_empty() {
            return out;
        }
        let normalized = uses_normalized(doc);
        html_node(doc, doc.root(), &range, normalized, &mut out);
        out
    }

    /// Project onto rendered lines: one marked range per line the selection
    /// touches. The first line starts at the selection's start point, the
    /// last ends at its end point, whole lines in between span edge to edge.
    pub fn marked_ranges(&self, doc: &Document, layout: &dyn LayoutProvider) -> Vec<MarkedRange> {
        let range = self.sorted();
        if range.is_empty() {
            return Vec::new();
        }
        let lines = layout.line_rects(doc, &range.start, &range.end);
        if lines.is_empty() {
            return Vec::new();
        }
        let start_point = layout.point_of(doc, &range.start);
        let end_point = layout.point_of(doc, &range.end);

        let mut out = Vec::with_capacity(lines.len());
        let last = lines.len() - 1;
        for (i, line) in lines.iter().enumerate() {
            let start = match (i, start_point) {
                (0, Some(p)) => Point::new(p.x, line.top),
                _ => line.top_left(),
            };
            let end = match (i == last, end_point) {
                (true, Some(p)) => Point::new(p.x, line.bottom),
                _ => line.bottom_right(),
            };
            let mr = MarkedRange::new(start, end, range.flags);
            if !mr.is_empty() {
                out.push(mr);
            }
        }
        out
    }
}

struct Cancelled;

fn clip_text(
    doc: &Document,
    node: NodeId,
    addr: &Address,
    range: &Range,
    f: &mut dyn FnMut(NodeId, &str, u32),
) {
    let Some(text) = doc.text(node) else { return };
    let chars: Vec<char> = text.chars().collect();
    let from = if addr.without_offset() == range.start.without_offset() {
        range.start.offset.unwrap_or(0) as usize
    } else {
        0
    };
    let until = if addr.without_offset() == range.end.without_offset() {
        (range.end.offset.unwrap_or(chars.len() as u32) as usize).min(chars.len())
    } else {
        chars.len()
    };
    if from >= until {
        return;
    }
    let slice: String = chars[from..until].iter().collect();
    f(node, &slice, from as u32);
}

fn walk_node(
    doc: &Document,
    node: NodeId,
    range: &Range,
    normalized: bool,
    keep_going: &dyn Fn() -> bool,
    f: &mut dyn FnMut(NodeId, &str, u32),
) -> ControlFlow<Cancelled> {
    if node.is_element() && doc.is_hidden(node) {
        return ControlFlow::Continue(());
    }
    let addr = Address::from_node(doc, node, None);
    if node != doc.root() {
        if addr > range.end {
            return ControlFlow::Continue(());
        }
        // a subtree entirely before the start holds nothing of interest
        if addr < range.start.without_offset() && !addr.is_prefix_of(&range.start) {
            return ControlFlow::Continue(());
        }
    }
    if node.is_text() {
        clip_text(doc, node, &addr, range, f);
        return ControlFlow::Continue(());
    }
    // safe cancellation point between blocks
    if doc.is_block(node) && !keep_going() {
        return ControlFlow::Break(Cancelled);
    }
    for child in view_children(doc, node, normalized) {
        walk_node(doc, child, range, normalized, keep_going, f)?;
    }
    ControlFlow::Continue(())
}

fn html_node(doc: &Document, node: NodeId, range: &Range, normalized: bool, out: &mut String) {
    if node.is_element() && doc.is_hidden(node) {
        return;
    }
    let addr = Address::from_node(doc, node, None);
    if node != doc.root() {
        if addr > range.end {
            return;
        }
        if addr < range.start.without_offset() && !addr.is_prefix_of(&range.start) {
            return;
        }
    }
    if node.is_text() {
        clip_text(doc, node, &addr, range, &mut |_, s, _| {
            out.push_str(&html_escape::encode_text(s));
        });
        return;
    }
    let name = if node == doc.root() {
        None
    } else {
        doc.element_name(node)
    };
    if let Some(name) = &name {
        out.push('<');
        out.push_str(name);
        for (attr, value) in doc.attributes(node) {
            out.push(' ');
            out.push_str(&attr);
            out.push_str("=\"");
            out.push_str(&html_escape::encode_double_quoted_attribute(&value));
            out.push('"');
        }
        out.push('>');
    }
    for child in view_children(doc, node, normalized) {
        html_node(doc, child, range, normalized, out);
    }
    if let Some(name) = &name {
        out.push_str("</");
        out.push_str(name);
        out.push('>');
    }
}
