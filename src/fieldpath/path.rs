//! Path element and path types.

use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// PathElement represents one level of path navigation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PathElement {
    /// Field name of a record or map entry.
    FieldName(String),
    /// Position inside a sequence.
    Index(usize),
}

impl PathElement {
    /// Creates a new field name path element.
    pub fn field_name(name: impl Into<String>) -> Self {
        PathElement::FieldName(name.into())
    }

    /// Creates a new index path element.
    pub fn index(i: usize) -> Self {
        PathElement::Index(i)
    }

    /// Returns true if this is a field name element.
    pub fn is_field_name(&self) -> bool {
        matches!(self, PathElement::FieldName(_))
    }

    /// Returns the field name if this is a field name element.
    pub fn as_field_name(&self) -> Option<&str> {
        match self {
            PathElement::FieldName(name) => Some(name),
            _ => None,
        }
    }

    /// Returns the index if this is an index element.
    pub fn as_index(&self) -> Option<usize> {
        match self {
            PathElement::Index(i) => Some(*i),
            _ => None,
        }
    }
}

/// PathParseError is returned for malformed paths and patterns.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathParseError {
    #[error("{input:?}: empty segment at offset {offset}")]
    EmptySegment { input: String, offset: usize },

    #[error("{input:?}: unterminated '[' at offset {offset}")]
    Unterminated { input: String, offset: usize },

    #[error("{input:?}: invalid index {index:?}")]
    InvalidIndex { input: String, index: String },

    #[error("{input:?}: unexpected {found:?} at offset {offset}")]
    Unexpected {
        input: String,
        offset: usize,
        found: char,
    },

    #[error("{input:?}: index wildcards are only allowed in patterns")]
    WildcardInPath { input: String },
}

/// Raw token produced by the shared path/pattern grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Segment {
    Field(String),
    Index(usize),
    AnyIndex,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    Start,
    AfterDot,
    AfterSegment,
}

/// Tokenizes `Field.Other[3].Leaf` style input. `[]` and `[*]` yield
/// [`Segment::AnyIndex`]; callers decide whether that is allowed.
pub(crate) fn parse_segments(input: &str) -> Result<Vec<Segment>, PathParseError> {
    let mut segments = Vec::new();
    let mut state = State::Start;
    let mut chars = input.char_indices().peekable();

    while let Some(&(offset, c)) = chars.peek() {
        match c {
            '.' => {
                if state != State::AfterSegment {
                    return Err(PathParseError::EmptySegment {
                        input: input.to_string(),
                        offset,
                    });
                }
                chars.next();
                state = State::AfterDot;
            }
            '[' => {
                if state == State::AfterDot {
                    return Err(PathParseError::EmptySegment {
                        input: input.to_string(),
                        offset,
                    });
                }
                chars.next();
                let mut content = String::new();
                let mut closed = false;
                for (_, c) in chars.by_ref() {
                    if c == ']' {
                        closed = true;
                        break;
                    }
                    content.push(c);
                }
                if !closed {
                    return Err(PathParseError::Unterminated {
                        input: input.to_string(),
                        offset,
                    });
                }
                let content = content.trim();
                if content.is_empty() || content == "*" {
                    segments.push(Segment::AnyIndex);
                } else {
                    let index = content.parse::<usize>().map_err(|_| PathParseError::InvalidIndex {
                        input: input.to_string(),
                        index: content.to_string(),
                    })?;
                    segments.push(Segment::Index(index));
                }
                state = State::AfterSegment;
            }
            ']' => {
                return Err(PathParseError::Unexpected {
                    input: input.to_string(),
                    offset,
                    found: c,
                });
            }
            _ => {
                if state == State::AfterSegment {
                    return Err(PathParseError::Unexpected {
                        input: input.to_string(),
                        offset,
                        found: c,
                    });
                }
                let mut name = String::new();
                while let Some(&(_, c)) = chars.peek() {
                    if matches!(c, '.' | '[' | ']') {
                        break;
                    }
                    name.push(c);
                    chars.next();
                }
                let name = name.trim();
                if name.is_empty() {
                    return Err(PathParseError::EmptySegment {
                        input: input.to_string(),
                        offset,
                    });
                }
                segments.push(Segment::Field(name.to_string()));
                state = State::AfterSegment;
            }
        }
    }

    if state == State::AfterDot {
        return Err(PathParseError::EmptySegment {
            input: input.to_string(),
            offset: input.len(),
        });
    }

    Ok(segments)
}

/// Path represents a complete path to a nested field.
///
/// Displays as `Address.Street` or `PhoneNumbers[0]`; the root is the empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Path {
    elements: Vec<PathElement>,
}

impl Path {
    /// Creates a new empty path.
    pub fn new() -> Self {
        Path {
            elements: Vec::new(),
        }
    }

    /// Creates a path from a vector of elements.
    pub fn from_elements(elements: Vec<PathElement>) -> Self {
        Path { elements }
    }

    /// Parses a concrete path such as `PhoneNumbers[0].Number`.
    pub fn parse(input: &str) -> Result<Self, PathParseError> {
        parse_segments(input)?
            .into_iter()
            .map(|segment| match segment {
                Segment::Field(name) => Ok(PathElement::FieldName(name)),
                Segment::Index(i) => Ok(PathElement::Index(i)),
                Segment::AnyIndex => Err(PathParseError::WildcardInPath {
                    input: input.to_string(),
                }),
            })
            .collect()
    }

    /// Returns the number of elements in the path.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns true if the path is empty.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Returns an iterator over the path elements.
    pub fn iter(&self) -> impl Iterator<Item = &PathElement> {
        self.elements.iter()
    }

    /// Appends a path element.
    pub fn push(&mut self, element: PathElement) {
        self.elements.push(element);
    }

    /// Removes and returns the last path element.
    pub fn pop(&mut self) -> Option<PathElement> {
        self.elements.pop()
    }

    /// Returns the last path element.
    pub fn last(&self) -> Option<&PathElement> {
        self.elements.last()
    }

    /// Creates a new path with the given element appended.
    pub fn with(&self, element: PathElement) -> Self {
        let mut new_path = self.clone();
        new_path.push(element);
        new_path
    }

    /// Creates a new path with a field name appended.
    pub fn field(&self, name: impl Into<String>) -> Self {
        self.with(PathElement::field_name(name))
    }

    /// Creates a new path with an index appended.
    pub fn index(&self, i: usize) -> Self {
        self.with(PathElement::index(i))
    }

    /// Returns a slice of the path elements.
    pub fn as_slice(&self) -> &[PathElement] {
        &self.elements
    }
}

impl FromStr for Path {
    type Err = PathParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl FromIterator<PathElement> for Path {
    fn from_iter<T: IntoIterator<Item = PathElement>>(iter: T) -> Self {
        Path {
            elements: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for Path {
    type Item = PathElement;
    type IntoIter = std::vec::IntoIter<PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.into_iter()
    }
}

impl<'a> IntoIterator for &'a Path {
    type Item = &'a PathElement;
    type IntoIter = std::slice::Iter<'a, PathElement>;

    fn into_iter(self) -> Self::IntoIter {
        self.elements.iter()
    }
}

impl fmt::Display for PathElement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathElement::FieldName(name) => write!(f, "{}", name),
            PathElement::Index(i) => write!(f, "[{}]", i),
        }
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            if i > 0 && element.is_field_name() {
                write!(f, ".")?;
            }
            write!(f, "{}", element)?;
        }
        Ok(())
    }
}

impl Serialize for Path {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
