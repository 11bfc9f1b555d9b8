//! Address construction and resolution against a document
//!
//! The encoding-appropriate child view is the single point where legacy and
//! normalized addresses differ: the legacy view is the raw child sequence,
//! the normalized view flattens synthetic wrapper elements so their children
//! count as children of the nearest authored ancestor.

use tracing::debug;

use crate::address::parser::{self, StepName};
use crate::address::Address;
use crate::context::DOM_VERSION_NORMALIZED_ADDRESSES;
use crate::dom::{Document, NodeId};

/// Whether a document uses the normalized (V2) address encoding
pub fn uses_normalized(doc: &Document) -> bool {
    doc.dom_version_requested() >= DOM_VERSION_NORMALIZED_ADDRESSES
}

/// Children of `parent` in the requested view
pub fn view_children(doc: &Document, parent: NodeId, normalized: bool) -> Vec<NodeId> {
    if !normalized {
        return doc.children(parent);
    }
    let mut out = Vec::new();
    collect_unboxed(doc, parent, &mut out);
    out
}

fn collect_unboxed(doc: &Document, parent: NodeId, out: &mut Vec<NodeId>) {
    for c in doc.children(parent) {
        if c.is_element() && doc.is_boxing(c) {
            collect_unboxed(doc, c, out);
        } else {
            out.push(c);
        }
    }
}

/// Parent of `id` in the requested view: the nearest non-wrapper ancestor
/// when normalized, the direct parent otherwise
pub fn view_parent(doc: &Document, id: NodeId, normalized: bool) -> Option<NodeId> {
    let mut p = doc.parent(id)?;
    if normalized {
        while doc.is_boxing(p) {
            p = doc.parent(p)?;
        }
    }
    Some(p)
}

impl Address {
    /// Build the address of a node in the document's encoding. Wrapper nodes
    /// are not addressable under the normalized encoding; the nearest
    /// authored ancestor is addressed instead.
    pub fn from_node(doc: &Document, node: NodeId, offset: Option<u32>) -> Address {
        if !doc.is_live(node) {
            return Address::null();
        }
        let normalized = uses_normalized(doc);
        let mut cur = node;
        if normalized {
            while doc.is_boxing(cur) {
                match doc.parent(cur) {
                    Some(p) => cur = p,
                    None => return Address::null(),
                }
            }
        }
        let mut steps = Vec::new();
        while cur != doc.root() {
            let Some(parent) = view_parent(doc, cur, normalized) else {
                return Address::null();
            };
            let siblings = view_children(doc, parent, normalized);
            let Some(idx) = siblings.iter().position(|&c| c == cur) else {
                return Address::null();
            };
            steps.push(idx as u32);
            cur = parent;
        }
        steps.reverse();
        Address { steps, offset }
    }

    /// Resolve to a node; `None` when the path no longer matches the tree
    pub fn resolve(&self, doc: &Document) -> Option<NodeId> {
        if self.is_null() {
            return None;
        }
        let normalized = uses_normalized(doc);
        let mut cur = doc.root();
        for &step in &self.steps {
            cur = view_children(doc, cur, normalized)
                .get(step as usize)
                .copied()?;
        }
        Some(cur)
    }

    /// Render as a slash-delimited path of name/index steps, for example
    /// `/body/p[2]/text().5`. Indices are 1-based among same-named siblings
    /// and omitted when first. `None` when the address does not resolve.
    /// The encoding follows the document's requested version.
    pub fn to_path_string(&self, doc: &Document) -> Option<String> {
        self.render(doc, uses_normalized(doc))
    }

    /// Legacy (V1) text form: wrapper elements appear as path steps
    pub fn to_path_string_v1(&self, doc: &Document) -> Option<String> {
        self.render(doc, false)
    }

    /// Normalized (V2) text form: wrapper elements are skipped
    pub fn to_path_string_v2(&self, doc: &Document) -> Option<String> {
        self.render(doc, true)
    }

    fn render(&self, doc: &Document, normalized: bool) -> Option<String> {
        let mut node = self.resolve(doc)?;
        if normalized {
            // wrapper nodes have no place in a normalized path
            while doc.is_boxing(node) {
                node = doc.parent(node)?;
            }
        }
        let mut parts = Vec::new();
        let mut cur = node;
        while cur != doc.root() {
            let parent = view_parent(doc, cur, normalized)?;
            let siblings = view_children(doc, parent, normalized);
            if cur.is_text() {
                let idx = siblings
                    .iter()
                    .filter(|c| c.is_text())
                    .position(|&c| c == cur)?;
                parts.push(if idx == 0 {
                    "text()".to_string()
                } else {
                    format!("text()[{}]", idx + 1)
                });
            } else {
                let name = doc.element_name(cur)?;
                let idx = siblings
                    .iter()
                    .filter(|&&c| c.is_element() && doc.element_name(c).as_deref() == Some(&name))
                    .position(|&c| c == cur)?;
                parts.push(if idx == 0 {
                    name
                } else {
                    format!("{name}[{}]", idx + 1)
                });
            }
            cur = parent;
        }
        let mut out = String::new();
        for p in parts.iter().rev() {
            out.push('/');
            out.push_str(p);
        }
        if let Some(o) = self.offset {
            out.push('.');
            out.push_str(&o.to_string());
        }
        Some(out)
    }

    /// Parse and resolve a path string. Returns the null address when the
    /// text is malformed or names a node the tree no longer has.
    pub fn from_path_string(doc: &Document, text: &str) -> Address {
        let parsed = match parser::parse(text) {
            Ok(p) => p,
            Err(e) => {
                debug!(error = %e, text, "unparseable address path");
                return Address::null();
            }
        };
        let normalized = uses_normalized(doc);
        let mut cur = doc.root();
        for step in &parsed.steps {
            let siblings = view_children(doc, cur, normalized);
            let mut matching = siblings.iter().filter(|&&c| match &step.name {
                StepName::Text => c.is_text(),
                StepName::Element(name) => {
                    c.is_element() && doc.element_name(c).as_deref() == Some(name.as_str())
                }
            });
            match matching.nth(step.index as usize - 1) {
                Some(&next) => cur = next,
                None => return Address::null(),
            }
        }
        Address::from_node(doc, cur, parsed.offset)
    }
}
