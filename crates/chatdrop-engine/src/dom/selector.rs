//! Compound CSS selector matching for the in-memory document.
//!
//! Supports a single compound selector: an optional type (or `*`), `#id`,
//! `.class` and attribute filters with `=`, `*=`, `^=` and `$=`. Combinators
//! and selector lists are rejected as invalid.

use super::DomError;
use std::collections::BTreeMap;
use std::iter::Peekable;
use std::str::Chars;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrOp {
    Equals,
    Contains,
    Prefix,
    Suffix,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeFilter {
    pub name: String,
    pub condition: Option<(AttrOp, String)>,
}

impl AttributeFilter {
    fn matches(&self, attributes: &BTreeMap<String, String>) -> bool {
        let Some(actual) = attributes.get(&self.name) else {
            return false;
        };
        match &self.condition {
            None => true,
            Some((AttrOp::Equals, expected)) => actual == expected,
            // An empty operand never matches for substring operators.
            Some((_, expected)) if expected.is_empty() => false,
            Some((AttrOp::Contains, expected)) => actual.contains(expected.as_str()),
            Some((AttrOp::Prefix, expected)) => actual.starts_with(expected.as_str()),
            Some((AttrOp::Suffix, expected)) => actual.ends_with(expected.as_str()),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selector {
    pub tag: Option<String>,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub attributes: Vec<AttributeFilter>,
}

impl Selector {
    pub fn parse(input: &str) -> Result<Self, DomError> {
        let trimmed = input.trim();
        let invalid = || DomError::InvalidSelector(input.to_string());
        if trimmed.is_empty() {
            return Err(invalid());
        }

        let mut selector = Selector::default();
        let mut chars = trimmed.chars().peekable();

        match chars.peek() {
            Some('*') => {
                chars.next();
            }
            Some(c) if is_ident_char(*c) => {
                selector.tag = Some(read_ident(&mut chars).to_ascii_lowercase());
            }
            _ => {}
        }

        while let Some(c) = chars.next() {
            match c {
                '#' => {
                    let id = read_ident(&mut chars);
                    if id.is_empty() {
                        return Err(invalid());
                    }
                    selector.id = Some(id);
                }
                '.' => {
                    let class = read_ident(&mut chars);
                    if class.is_empty() {
                        return Err(invalid());
                    }
                    selector.classes.push(class);
                }
                '[' => {
                    let filter = read_attribute(&mut chars).ok_or_else(invalid)?;
                    selector.attributes.push(filter);
                }
                _ => return Err(invalid()),
            }
        }

        Ok(selector)
    }

    pub fn matches(&self, tag: &str, attributes: &BTreeMap<String, String>) -> bool {
        if let Some(expected) = &self.tag {
            if !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if attributes.get("id") != Some(id) {
                return false;
            }
        }
        if !self.classes.is_empty() {
            let class_attr = attributes.get("class").map(String::as_str).unwrap_or("");
            let present: Vec<&str> = class_attr.split_whitespace().collect();
            if !self.classes.iter().all(|c| present.contains(&c.as_str())) {
                return false;
            }
        }
        self.attributes.iter().all(|f| f.matches(attributes))
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}

fn read_ident(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut ident = String::new();
    while let Some(&c) = chars.peek() {
        if !is_ident_char(c) {
            break;
        }
        ident.push(c);
        chars.next();
    }
    ident
}

fn skip_whitespace(chars: &mut Peekable<Chars<'_>>) {
    while chars.peek().is_some_and(|c| c.is_whitespace()) {
        chars.next();
    }
}

/// Parses the remainder of `[name op value]` after the opening bracket.
fn read_attribute(chars: &mut Peekable<Chars<'_>>) -> Option<AttributeFilter> {
    skip_whitespace(chars);
    let name = read_ident(chars).to_ascii_lowercase();
    if name.is_empty() {
        return None;
    }
    skip_whitespace(chars);

    let op = match chars.next()? {
        ']' => {
            return Some(AttributeFilter {
                name,
                condition: None,
            });
        }
        '=' => AttrOp::Equals,
        prefix @ ('*' | '^' | '$') => {
            if chars.next()? != '=' {
                return None;
            }
            match prefix {
                '*' => AttrOp::Contains,
                '^' => AttrOp::Prefix,
                _ => AttrOp::Suffix,
            }
        }
        _ => return None,
    };

    skip_whitespace(chars);
    let value = match chars.peek().copied()? {
        quote @ ('"' | '\'') => {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next()? {
                    c if c == quote => break,
                    '\\' => value.push(chars.next()?),
                    c => value.push(c),
                }
            }
            value
        }
        _ => {
            let value = read_ident(chars);
            if value.is_empty() {
                return None;
            }
            value
        }
    };
    skip_whitespace(chars);
    if chars.next()? != ']' {
        return None;
    }

    Some(AttributeFilter {
        name,
        condition: Some((op, value)),
    })
}
