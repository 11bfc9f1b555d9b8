//! Word locator
//!
//! Enumerates the visible words inside a range, in document order, each
//! with its screen geometry, and drives word-level selection: nearest-word
//! picking by direction-weighted distance and incremental pattern search
//! for type-ahead selection.

use tracing::trace;

use crate::address::Address;
use crate::dom::Document;
use crate::geom::MoveDirection;
use crate::range::{MarkedRange, Range};
use crate::traits::LayoutProvider;

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '\'' || c == '-'
}

/// One visible word with its position and geometry
#[derive(Debug, Clone)]
pub struct Word {
    pub text: String,
    /// Addresses of the word's first and one-past-last character
    pub range: Range,
    /// Screen projection, when the layout collaborator has one
    pub mark: Option<MarkedRange>,
}

impl Word {
    fn matches_pattern(&self, pattern: &[String]) -> bool {
        let mut chars = self.text.chars().flat_map(char::to_lowercase);
        for slot in pattern {
            let Some(c) = chars.next() else { return false };
            if !slot.chars().flat_map(char::to_lowercase).any(|p| p == c) {
                return false;
            }
        }
        true
    }
}

/// Words of a range, with a current selection and a type-ahead pattern
#[derive(Debug, Default)]
pub struct WordList {
    words: Vec<Word>,
    selected: Option<usize>,
    /// One candidate-character set per typed position
    pattern: Vec<String>,
}

impl WordList {
    /// Collect the words of `range` with geometry from `layout`
    pub fn from_range(doc: &Document, range: &Range, layout: &dyn LayoutProvider) -> WordList {
        let mut words = Vec::new();
        range.for_each_text(doc, &|| true, &mut |node, slice, base| {
            let chars: Vec<char> = slice.chars().collect();
            let mut i = 0;
            while i < chars.len() {
                if !is_word_char(chars[i]) {
                    i += 1;
                    continue;
                }
                let begin = i;
                while i < chars.len() && is_word_char(chars[i]) {
                    i += 1;
                }
                let start = Address::from_node(doc, node, Some(base + begin as u32));
                let end = Address::from_node(doc, node, Some(base + i as u32));
                let len = (i - begin) as u32;
                let mark = layout
                    .text_rect(doc, &start, len)
                    .map(|r| MarkedRange::new(r.top_left(), r.bottom_right(), range.flags));
                words.push(Word {
                    text: chars[begin..i].iter().collect(),
                    range: Range::with_flags(start, end, range.flags),
                    mark,
                });
            }
        });
        trace!(count = words.len(), "word list built");
        WordList {
            words,
            selected: None,
            pattern: Vec::new(),
        }
    }

    pub fn words(&self) -> &[Word] {
        &self.words
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn selected(&self) -> Option<&Word> {
        self.selected.and_then(|i| self.words.get(i))
    }

    pub fn select_word(&mut self, index: usize) -> Option<&Word> {
        if index < self.words.len() {
            self.selected = Some(index);
        }
        self.selected()
    }

    /// Move the selection forward; stays put at the last word
    pub fn select_next_word(&mut self) -> Option<&Word> {
        let next = match self.selected {
            Some(i) => (i + 1).min(self.words.len().saturating_sub(1)),
            None => 0,
        };
        self.select_word(next)
    }

    /// Move the selection backward; stays put at the first word
    pub fn select_prev_word(&mut self) -> Option<&Word> {
        let prev = match self.selected {
            Some(i) => i.saturating_sub(1),
            None => 0,
        };
        self.select_word(prev)
    }

    /// Select the word in the middle of the list, a good starting point for
    /// keyboard-driven selection
    pub fn select_middle_word(&mut self) -> Option<&Word> {
        if self.words.is_empty() {
            return None;
        }
        self.select_word(self.words.len() / 2)
    }

    /// Index of the word nearest to a screen point for the given motion.
    /// Left/right motion prefers words on the same line; vertical motion
    /// weighs vertical distance heavily (see [`MarkedRange::calc_distance`]).
    pub fn find_nearest_word(&self, x: i32, y: i32, dir: MoveDirection) -> Option<usize> {
        if self.words.is_empty() {
            return None;
        }
        let marked: Vec<(usize, &MarkedRange)> = self
            .words
            .iter()
            .enumerate()
            .filter_map(|(i, w)| w.mark.as_ref().map(|m| (i, m)))
            .collect();
        if marked.is_empty() {
            return None;
        }

        match dir {
            MoveDirection::Left | MoveDirection::Right => {
                let on_line = |m: &MarkedRange| m.start.y <= y && y < m.end.y;
                let same_line = marked.iter().filter(|(_, m)| on_line(m));
                // compare against word edges so a point inside a word still
                // moves to its neighbor
                let picked = if dir == MoveDirection::Left {
                    same_line
                        .filter(|(_, m)| m.end.x <= x)
                        .max_by_key(|(_, m)| m.end.x)
                } else {
                    same_line
                        .filter(|(_, m)| m.start.x >= x)
                        .min_by_key(|(_, m)| m.start.x)
                };
                if let Some((i, _)) = picked {
                    return Some(*i);
                }
                // fall back to the nearest word on an adjacent line
                let fallback = if dir == MoveDirection::Left {
                    marked
                        .iter()
                        .filter(|(_, m)| m.middle_point().y < y)
                        .min_by_key(|(_, m)| m.calc_distance(x, y, dir))
                } else {
                    marked
                        .iter()
                        .filter(|(_, m)| m.middle_point().y > y)
                        .min_by_key(|(_, m)| m.calc_distance(x, y, dir))
                };
                match fallback {
                    Some((i, _)) => Some(*i),
                    // default to the far end in the motion's direction
                    None if dir == MoveDirection::Left => marked.last().map(|(i, _)| *i),
                    None => marked.first().map(|(i, _)| *i),
                }
            }
            MoveDirection::Up | MoveDirection::Down | MoveDirection::Any => marked
                .iter()
                .min_by_key(|(_, m)| m.calc_distance(x, y, dir))
                .map(|(i, _)| *i),
        }
    }

    /// Select the nearest word to a screen point
    pub fn select_nearest_word(&mut self, x: i32, y: i32, dir: MoveDirection) -> Option<&Word> {
        let i = self.find_nearest_word(x, y, dir)?;
        self.select_word(i)
    }

    /// Narrow the pattern with a candidate-character set for the next typed
    /// position. When no word matches the longer pattern, the set is popped
    /// back off and the previous selection stands; returns whether the
    /// pattern grew.
    pub fn append_pattern(&mut self, candidates: &str) -> bool {
        if candidates.is_empty() {
            return false;
        }
        self.pattern.push(candidates.to_string());
        match self.first_match() {
            Some(i) => {
                self.selected = Some(i);
                true
            }
            None => {
                self.pattern.pop();
                false
            }
        }
    }

    /// Drop the last typed position, widening the match set
    pub fn reduce_pattern(&mut self) {
        self.pattern.pop();
        if let Some(i) = self.first_match() {
            self.selected = Some(i);
        }
    }

    pub fn pattern_len(&self) -> usize {
        self.pattern.len()
    }

    fn first_match(&self) -> Option<usize> {
        if self.pattern.is_empty() {
            return self.selected;
        }
        self.words
            .iter()
            .position(|w| w.matches_pattern(&self.pattern))
    }
}
