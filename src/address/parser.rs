//! Address path parser
//!
//! Parses the slash-delimited text form of an address into structured steps.
//!
//! Grammar (simplified):
//! ```text
//! path   = step+ [offset]
//! step   = "/" name [index]
//! name   = element name | "text()"
//! index  = "[" number "]"        (1-based; omitted means first)
//! offset = "." number
//! ```
//!
//! Example: `/body/p[2]/text().5` — second `p` under `body`, its first text
//! child, character offset 5.

use thiserror::Error;

/// Address path parsing errors
#[derive(Debug, Error)]
pub enum AddressParseError {
    #[error("Empty address path")]
    Empty,

    #[error("Address path must start with '/'")]
    MissingLeadingSlash,

    #[error("Expected step name at position {0}")]
    ExpectedName(usize),

    #[error("Expected number at position {0}")]
    ExpectedNumber(usize),

    #[error("Unclosed index bracket at position {0}")]
    UnclosedBracket(usize),

    #[error("Index must be at least 1 at position {0}")]
    ZeroIndex(usize),

    #[error("Unexpected character '{0}' at position {1}")]
    UnexpectedChar(char, usize),
}

/// What a parsed step selects among a node's children
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepName {
    /// Element children with this name
    Element(String),
    /// Text children (`text()`)
    Text,
}

/// One step of a parsed path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathStep {
    pub name: StepName,
    /// 1-based position among same-kind siblings
    pub index: u32,
}

/// A fully parsed address path
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedPath {
    pub steps: Vec<PathStep>,
    pub offset: Option<u32>,
}

/// Parser state
struct Parser<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.pos += ch.len_utf8();
        Some(ch)
    }

    fn skip_if(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn starts_with(&self, s: &str) -> bool {
        self.input[self.pos..].starts_with(s)
    }

    fn skip_str(&mut self, s: &str) -> bool {
        if self.starts_with(s) {
            self.pos += s.len();
            true
        } else {
            false
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    fn parse_number(&mut self) -> Result<u32, AddressParseError> {
        let start = self.pos;
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                self.advance();
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(AddressParseError::ExpectedNumber(start));
        }
        self.input[start..self.pos]
            .parse()
            .map_err(|_| AddressParseError::ExpectedNumber(start))
    }

    /// Parse the optional `[n]` index suffix; omitted means 1
    fn parse_index(&mut self) -> Result<u32, AddressParseError> {
        if !self.skip_if('[') {
            return Ok(1);
        }
        let start = self.pos;
        let index = self.parse_number()?;
        if index == 0 {
            return Err(AddressParseError::ZeroIndex(start));
        }
        if !self.skip_if(']') {
            return Err(AddressParseError::UnclosedBracket(start));
        }
        Ok(index)
    }

    fn parse_step(&mut self) -> Result<PathStep, AddressParseError> {
        let name = if self.skip_str("text()") {
            StepName::Text
        } else {
            let start = self.pos;
            while let Some(ch) = self.peek() {
                if ch == '/' || ch == '[' || ch == '.' {
                    break;
                }
                self.advance();
            }
            if self.pos == start {
                return Err(AddressParseError::ExpectedName(start));
            }
            StepName::Element(self.input[start..self.pos].to_string())
        };
        let index = self.parse_index()?;
        Ok(PathStep { name, index })
    }

    fn parse_path(&mut self) -> Result<ParsedPath, AddressParseError> {
        if !self.skip_if('/') {
            return Err(AddressParseError::MissingLeadingSlash);
        }
        let mut steps = vec![self.parse_step()?];
        while self.skip_if('/') {
            steps.push(self.parse_step()?);
        }
        let offset = if self.skip_if('.') {
            Some(self.parse_number()?)
        } else {
            None
        };
        Ok(ParsedPath { steps, offset })
    }
}

/// Parse an address path string into structured steps
pub fn parse(input: &str) -> Result<ParsedPath, AddressParseError> {
    let input = input.trim();
    if input.is_empty() {
        return Err(AddressParseError::Empty);
    }

    let mut parser = Parser::new(input);
    let path = parser.parse_path()?;

    // Ensure we consumed all input
    if !parser.at_end() {
        return Err(AddressParseError::UnexpectedChar(
            parser.peek().unwrap_or('\0'),
            parser.pos,
        ));
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_path() {
        let path = parse("/body/p/text()").unwrap();
        assert_eq!(path.steps.len(), 3);
        assert_eq!(path.steps[0].name, StepName::Element("body".to_string()));
        assert_eq!(path.steps[0].index, 1);
        assert_eq!(path.steps[2].name, StepName::Text);
        assert_eq!(path.offset, None);
    }

    #[test]
    fn test_parse_indices_and_offset() {
        let path = parse("/body/p[2]/text()[1].5").unwrap();
        assert_eq!(path.steps[1].index, 2);
        assert_eq!(path.steps[2].index, 1);
        assert_eq!(path.offset, Some(5));
    }

    #[test]
    fn test_parse_element_offset() {
        // an offset may follow an element step too
        let path = parse("/body/p[3].0").unwrap();
        assert_eq!(path.steps.len(), 2);
        assert_eq!(path.offset, Some(0));
    }

    #[test]
    fn test_error_empty() {
        assert!(matches!(parse(""), Err(AddressParseError::Empty)));
        assert!(matches!(parse("   "), Err(AddressParseError::Empty)));
    }

    #[test]
    fn test_error_missing_slash() {
        assert!(matches!(
            parse("body/p"),
            Err(AddressParseError::MissingLeadingSlash)
        ));
    }

    #[test]
    fn test_error_zero_index() {
        assert!(matches!(
            parse("/body/p[0]"),
            Err(AddressParseError::ZeroIndex(_))
        ));
    }

    #[test]
    fn test_error_unclosed_bracket() {
        assert!(matches!(
            parse("/body/p[2"),
            Err(AddressParseError::UnclosedBracket(_))
        ));
    }

    #[test]
    fn test_error_trailing_garbage() {
        assert!(matches!(
            parse("/body/p]"),
            Err(AddressParseError::UnexpectedChar(']', _))
        ));
    }

    #[test]
    fn test_error_double_slash() {
        assert!(matches!(
            parse("/body//p"),
            Err(AddressParseError::ExpectedName(_))
        ));
    }
}
