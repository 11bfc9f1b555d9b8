//! Address-level navigation
//!
//! Every operation is a pure transformation from one address to the next:
//! it resolves the address, walks the tree, and returns a fresh address (or
//! `None` for "no move", leaving the input untouched). No cursor state
//! exists outside the address itself, so any step sequence is reproducible
//! after a serialize/deserialize round trip.
//!
//! "Visible" steps skip subtrees the layout collaborator marked hidden.
//! With the `this_block_only` constraint set, a step never leaves the
//! nearest block ancestor of the starting node.

use crate::address::resolve::{uses_normalized, view_children, view_parent};
use crate::address::Address;
use crate::dom::{Document, NodeId};

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric()
}

fn is_sentence_end(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '\u{2026}')
}

/// Nearest block ancestor of `id`, `id` itself included
fn owning_block(doc: &Document, id: NodeId) -> Option<NodeId> {
    let mut cur = Some(id);
    while let Some(n) = cur {
        if n.is_element() && doc.is_block(n) {
            return Some(n);
        }
        cur = doc.parent(n);
    }
    None
}

fn is_inside(doc: &Document, id: NodeId, ancestor: NodeId) -> bool {
    let mut cur = Some(id);
    while let Some(n) = cur {
        if n == ancestor {
            return true;
        }
        cur = doc.parent(n);
    }
    false
}

/// Document-order successor in the view, skipping hidden subtrees entirely
fn dfs_next(doc: &Document, id: NodeId, normalized: bool) -> Option<NodeId> {
    if !doc.is_hidden(id) {
        if let Some(&first) = view_children(doc, id, normalized).first() {
            return Some(first);
        }
    }
    let mut cur = id;
    loop {
        let parent = view_parent(doc, cur, normalized)?;
        let siblings = view_children(doc, parent, normalized);
        let pos = siblings.iter().position(|&c| c == cur)?;
        if let Some(&next) = siblings.get(pos + 1) {
            return Some(next);
        }
        cur = parent;
    }
}

/// Document-order predecessor in the view
fn dfs_prev(doc: &Document, id: NodeId, normalized: bool) -> Option<NodeId> {
    let parent = view_parent(doc, id, normalized)?;
    let siblings = view_children(doc, parent, normalized);
    let pos = siblings.iter().position(|&c| c == id)?;
    if pos == 0 {
        return Some(parent);
    }
    // deepest visible last descendant of the previous sibling
    let mut cur = siblings[pos - 1];
    loop {
        if doc.is_hidden(cur) {
            return Some(cur);
        }
        match view_children(doc, cur, normalized).last() {
            Some(&last) => cur = last,
            None => return Some(cur),
        }
    }
}

fn is_visible(doc: &Document, id: NodeId) -> bool {
    let mut cur = Some(id);
    while let Some(n) = cur {
        if n.is_element() && doc.is_hidden(n) {
            return false;
        }
        cur = doc.parent(n);
    }
    true
}

/// Leaf block: renders its content as lines rather than nested blocks
fn is_final_block(doc: &Document, id: NodeId) -> bool {
    id.is_element()
        && doc.is_block(id)
        && doc.children(id).iter().all(|&c| !(c.is_element() && doc.is_block(c)))
}

/// Ordered visible text nodes of the subtree under `scope`
fn visible_text_nodes(doc: &Document, scope: NodeId, normalized: bool) -> Vec<NodeId> {
    let mut out = Vec::new();
    let mut cur = Some(scope);
    while let Some(n) = cur {
        if n != scope && !is_inside(doc, n, scope) {
            break;
        }
        if n.is_text() && is_visible(doc, n) {
            out.push(n);
        }
        cur = dfs_next(doc, n, normalized);
    }
    out
}

impl Address {
    /// Step to the parent node; fails at the root
    pub fn parent_step(&self, doc: &Document) -> Option<Address> {
        self.resolve(doc)?;
        if self.steps.is_empty() {
            return None;
        }
        let mut steps = self.steps.clone();
        steps.pop();
        Some(Address::new(steps, None))
    }

    /// Step to the first child; fails on leaves
    pub fn child_step(&self, doc: &Document, index: u32) -> Option<Address> {
        let node = self.resolve(doc)?;
        let normalized = uses_normalized(doc);
        if (index as usize) >= view_children(doc, node, normalized).len() {
            return None;
        }
        let mut steps = self.steps.clone();
        steps.push(index);
        Some(Address::new(steps, None))
    }

    /// Step to the next sibling; fails past the last one instead of wrapping
    pub fn next_sibling(&self, doc: &Document) -> Option<Address> {
        let node = self.resolve(doc)?;
        let normalized = uses_normalized(doc);
        let parent = view_parent(doc, node, normalized)?;
        let last = self.steps.last().copied()?;
        if (last as usize + 1) >= view_children(doc, parent, normalized).len() {
            return None;
        }
        let mut steps = self.steps.clone();
        *steps.last_mut()? = last + 1;
        Some(Address::new(steps, None))
    }

    /// Step to the previous sibling; fails before the first one
    pub fn prev_sibling(&self, doc: &Document) -> Option<Address> {
        self.resolve(doc)?;
        let last = self.steps.last().copied()?;
        if last == 0 {
            return None;
        }
        let mut steps = self.steps.clone();
        *steps.last_mut()? = last - 1;
        Some(Address::new(steps, None))
    }

    /// Next visible element in document order
    pub fn next_visible_element(&self, doc: &Document, this_block_only: bool) -> Option<Address> {
        self.walk_visible(doc, this_block_only, dfs_next, |d, n| n.is_element() && is_visible(d, n))
    }

    /// Previous visible element in document order
    pub fn prev_visible_element(&self, doc: &Document, this_block_only: bool) -> Option<Address> {
        self.walk_visible(doc, this_block_only, dfs_prev, |d, n| n.is_element() && is_visible(d, n))
    }

    /// Next leaf block (a block element with no block children)
    pub fn next_final_block(&self, doc: &Document) -> Option<Address> {
        self.walk_visible(doc, false, dfs_next, |d, n| {
            is_final_block(d, n) && is_visible(d, n)
        })
    }

    /// Previous leaf block
    pub fn prev_final_block(&self, doc: &Document) -> Option<Address> {
        self.walk_visible(doc, false, dfs_prev, |d, n| {
            is_final_block(d, n) && is_visible(d, n)
        })
    }

    fn walk_visible(
        &self,
        doc: &Document,
        this_block_only: bool,
        step: fn(&Document, NodeId, bool) -> Option<NodeId>,
        accept: fn(&Document, NodeId) -> bool,
    ) -> Option<Address> {
        let start = self.resolve(doc)?;
        let normalized = uses_normalized(doc);
        let block = if this_block_only {
            owning_block(doc, start)
        } else {
            None
        };
        let mut cur = start;
        loop {
            cur = step(doc, cur, normalized)?;
            if let Some(block) = block {
                if !is_inside(doc, cur, block) {
                    return None;
                }
            }
            if accept(doc, cur) {
                return Some(Address::from_node(doc, cur, None));
            }
        }
    }

    /// Start of the next word among the document's visible text
    pub fn next_word(&self, doc: &Document) -> Option<Address> {
        self.word_move(doc, true)
    }

    /// Start of the previous word
    pub fn prev_word(&self, doc: &Document) -> Option<Address> {
        self.word_move(doc, false)
    }

    fn word_move(&self, doc: &Document, forward: bool) -> Option<Address> {
        let node = self.resolve(doc)?;
        let normalized = uses_normalized(doc);
        let texts = visible_text_nodes(doc, doc.root(), normalized);
        let here = if node.is_text() {
            texts.iter().position(|&t| t == node)?
        } else {
            // start scanning from the first text inside (after) the node
            let inside = visible_text_nodes(doc, node, normalized);
            match inside.first() {
                Some(&first) => texts.iter().position(|&t| t == first)?,
                None => return None,
            }
        };
        let offset = self.offset.unwrap_or(0) as usize;

        if forward {
            for (ti, &t) in texts.iter().enumerate().skip(here) {
                let chars: Vec<char> = doc.text(t)?.chars().collect();
                let from = if ti == here { offset + 1 } else { 0 };
                let mut prev_is_word = if from > 0 {
                    chars.get(from - 1).copied().map(is_word_char).unwrap_or(false)
                } else {
                    false
                };
                for (i, &c) in chars.iter().enumerate().skip(from.min(chars.len())) {
                    if is_word_char(c) && !prev_is_word {
                        return Some(Address::from_node(doc, t, Some(i as u32)));
                    }
                    prev_is_word = is_word_char(c);
                }
            }
        } else {
            for ti in (0..=here).rev() {
                let t = texts[ti];
                let chars: Vec<char> = doc.text(t)?.chars().collect();
                let until = if ti == here {
                    offset.min(chars.len())
                } else {
                    chars.len()
                };
                for i in (0..until).rev() {
                    let starts_word = is_word_char(chars[i])
                        && (i == 0 || !is_word_char(chars[i - 1]));
                    if starts_word {
                        return Some(Address::from_node(doc, t, Some(i as u32)));
                    }
                }
            }
        }
        None
    }

    /// Start of the next sentence (first word character after a terminator)
    pub fn next_sentence_start(&self, doc: &Document) -> Option<Address> {
        let node = self.resolve(doc)?;
        let normalized = uses_normalized(doc);
        let texts = visible_text_nodes(doc, doc.root(), normalized);
        let here = texts.iter().position(|&t| t == node)?;
        let offset = self.offset.unwrap_or(0) as usize;

        let mut seen_end = false;
        let mut block = owning_block(doc, node);
        for (ti, &t) in texts.iter().enumerate().skip(here) {
            // a block boundary always ends a sentence
            let t_block = owning_block(doc, t);
            if t_block != block {
                seen_end = true;
                block = t_block;
            }
            let chars: Vec<char> = doc.text(t)?.chars().collect();
            let from = if ti == here { offset } else { 0 };
            for (i, &c) in chars.iter().enumerate().skip(from.min(chars.len())) {
                if seen_end && is_word_char(c) {
                    return Some(Address::from_node(doc, t, Some(i as u32)));
                }
                if is_sentence_end(c) {
                    seen_end = true;
                }
            }
        }
        None
    }

    /// Start of the current (or previous) sentence
    pub fn prev_sentence_start(&self, doc: &Document) -> Option<Address> {
        let node = self.resolve(doc)?;
        let normalized = uses_normalized(doc);
        let texts = visible_text_nodes(doc, doc.root(), normalized);
        let here = texts.iter().position(|&t| t == node)?;
        let offset = self.offset.unwrap_or(0) as usize;

        let mut candidate: Option<(NodeId, usize)> = None;
        let mut new_sentence = true;
        let mut block = None;
        'outer: for (ti, &t) in texts.iter().enumerate().take(here + 1) {
            let t_block = owning_block(doc, t);
            if t_block != block {
                new_sentence = true;
                block = t_block;
            }
            let chars: Vec<char> = doc.text(t)?.chars().collect();
            let until = if ti == here {
                offset.min(chars.len())
            } else {
                chars.len()
            };
            for (i, &c) in chars.iter().enumerate() {
                if ti == here && i >= until {
                    break 'outer;
                }
                if is_word_char(c) && new_sentence {
                    candidate = Some((t, i));
                    new_sentence = false;
                }
                if is_sentence_end(c) {
                    new_sentence = true;
                }
            }
        }
        candidate.map(|(t, i)| Address::from_node(doc, t, Some(i as u32)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::EngineConfig;

    /// body > h1("Title"), p("One two. Three four."), p[hidden]("ghost"),
    /// p("Five.")
    fn nav_doc() -> Document {
        let mut doc = Document::new(EngineConfig::default());
        let body = doc.create_element(doc.root(), "body", None).unwrap();
        let h1 = doc.create_element(body, "h1", None).unwrap();
        doc.create_text(h1, "Title").unwrap();
        let p1 = doc.create_element(body, "p", None).unwrap();
        doc.create_text(p1, "One two. Three four.").unwrap();
        let hidden = doc.create_element(body, "p", None).unwrap();
        doc.create_text(hidden, "ghost").unwrap();
        doc.set_hidden(hidden, true);
        let p3 = doc.create_element(body, "p", None).unwrap();
        doc.create_text(p3, "Five.").unwrap();
        doc
    }

    fn path(doc: &Document, s: &str) -> Address {
        let a = Address::from_path_string(doc, s);
        assert!(!a.is_null(), "{s} did not resolve");
        a
    }

    #[test]
    fn test_sibling_steps_do_not_wrap() {
        let doc = nav_doc();
        let h1 = path(&doc, "/body/h1");
        let next = h1.next_sibling(&doc).unwrap();
        assert_eq!(next.to_path_string(&doc).as_deref(), Some("/body/p"));
        assert!(h1.prev_sibling(&doc).is_none());
        let last = path(&doc, "/body/p[3]");
        assert!(last.next_sibling(&doc).is_none());
    }

    #[test]
    fn test_parent_and_child_steps() {
        let doc = nav_doc();
        let p = path(&doc, "/body/p");
        assert_eq!(
            p.parent_step(&doc).unwrap().to_path_string(&doc).as_deref(),
            Some("/body")
        );
        let body = path(&doc, "/body");
        assert_eq!(
            body.child_step(&doc, 0)
                .unwrap()
                .to_path_string(&doc)
                .as_deref(),
            Some("/body/h1")
        );
        assert!(body.child_step(&doc, 10).is_none());
    }

    #[test]
    fn test_visible_element_skips_hidden() {
        let doc = nav_doc();
        let p1 = path(&doc, "/body/p");
        let next = p1.next_visible_element(&doc, false).unwrap();
        // the hidden p[2] is skipped
        assert_eq!(next.to_path_string(&doc).as_deref(), Some("/body/p[3]"));
        let back = next.prev_visible_element(&doc, false).unwrap();
        assert_eq!(back.to_path_string(&doc).as_deref(), Some("/body/p"));
    }

    #[test]
    fn test_this_block_only_constraint() {
        let doc = nav_doc();
        let h1_text = path(&doc, "/body/h1/text()");
        // no further element inside h1
        assert!(h1_text.next_visible_element(&doc, true).is_none());
        assert!(h1_text.next_visible_element(&doc, false).is_some());
    }

    #[test]
    fn test_word_steps() {
        let doc = nav_doc();
        let start = path(&doc, "/body/p/text()");
        // "One two. Three four." — word starts at 0, 4, 9, 15
        let w1 = start.next_word(&doc).unwrap();
        assert_eq!(w1.offset, Some(4));
        let w2 = w1.next_word(&doc).unwrap();
        assert_eq!(w2.offset, Some(9));
        assert_eq!(w2.prev_word(&doc).unwrap().offset, Some(4));
        // crossing into the next paragraph, skipping the hidden one
        let last = path(&doc, "/body/p/text().15");
        let next = last.next_word(&doc).unwrap();
        assert_eq!(
            next.to_path_string(&doc).as_deref(),
            Some("/body/p[3]/text().0")
        );
    }

    #[test]
    fn test_sentence_steps() {
        let doc = nav_doc();
        let start = path(&doc, "/body/p/text()");
        let next = start.next_sentence_start(&doc).unwrap();
        // "Three" follows the first period
        assert_eq!(next.offset, Some(9));
        let back = path(&doc, "/body/p/text().15").prev_sentence_start(&doc).unwrap();
        assert_eq!(back.offset, Some(9));
    }

    #[test]
    fn test_final_block_steps() {
        let doc = nav_doc();
        let h1 = path(&doc, "/body/h1");
        let next = h1.next_final_block(&doc).unwrap();
        assert_eq!(next.to_path_string(&doc).as_deref(), Some("/body/p"));
        assert_eq!(
            next.prev_final_block(&doc)
                .unwrap()
                .to_path_string(&doc)
                .as_deref(),
            Some("/body/h1")
        );
    }
}
