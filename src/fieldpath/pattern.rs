//! Ignore / always-include pattern matching.
//!
//! Patterns are matched segment by segment against concrete paths. Field
//! names compare case-insensitively and an index wildcard (`[]` or `[*]`)
//! matches any position inside a sequence. A pattern made of a single field
//! name is also a shorthand rule that matches that field at any depth, with
//! lower precedence than a fully qualified match.

use super::path::{parse_segments, Path, PathElement, PathParseError, Segment};
use std::fmt;

fn fold_case(name: &str) -> impl Iterator<Item = char> + '_ {
    name.chars().flat_map(char::to_lowercase)
}

/// Compares two field names the way patterns do: per-character Unicode
/// lowercase, without allocating.
pub fn eq_ignore_case(a: &str, b: &str) -> bool {
    fold_case(a).eq(fold_case(b))
}

/// PatternElement is one segment of a [`Pattern`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PatternElement {
    /// Field name, stored lowercased.
    Field(String),
    /// Exactly this index.
    Index(usize),
    /// Any index.
    AnyIndex,
}

impl PatternElement {
    fn matches(&self, element: &PathElement) -> bool {
        match (self, element) {
            (PatternElement::Field(expected), PathElement::FieldName(name)) => {
                fold_case(name).eq(expected.chars())
            }
            (PatternElement::Index(expected), PathElement::Index(i)) => expected == i,
            (PatternElement::AnyIndex, PathElement::Index(_)) => true,
            _ => false,
        }
    }
}

/// How specifically a pattern matched a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
    /// Matched by field name alone, somewhere below the root.
    Shorthand,
    /// Matched segment by segment from the root.
    Exact,
}

/// Pattern is a path whose indices may be wildcards.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Pattern {
    elements: Vec<PatternElement>,
}

impl Pattern {
    /// Parses a pattern such as `PhoneNumbers[].Number` or `Role`.
    pub fn parse(input: &str) -> Result<Self, PathParseError> {
        let elements = parse_segments(input)?
            .into_iter()
            .map(|segment| match segment {
                Segment::Field(name) => PatternElement::Field(fold_case(&name).collect()),
                Segment::Index(i) => PatternElement::Index(i),
                Segment::AnyIndex => PatternElement::AnyIndex,
            })
            .collect::<Vec<_>>();
        if elements.is_empty() {
            return Err(PathParseError::EmptySegment {
                input: input.to_string(),
                offset: 0,
            });
        }
        Ok(Pattern { elements })
    }

    /// Returns the pattern elements.
    pub fn elements(&self) -> &[PatternElement] {
        &self.elements
    }

    /// Returns true if this pattern is a bare field name.
    pub fn is_shorthand(&self) -> bool {
        matches!(self.elements.as_slice(), [PatternElement::Field(_)])
    }

    /// Matches a concrete path, reporting how specific the match was.
    pub fn match_path(&self, path: &Path) -> Option<Precedence> {
        let elements = path.as_slice();
        if elements.len() == self.elements.len()
            && self
                .elements
                .iter()
                .zip(elements)
                .all(|(pattern, element)| pattern.matches(element))
        {
            return Some(Precedence::Exact);
        }

        if let ([name @ PatternElement::Field(_)], Some(last)) =
            (self.elements.as_slice(), elements.last())
        {
            if name.matches(last) {
                return Some(Precedence::Shorthand);
            }
        }

        None
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, element) in self.elements.iter().enumerate() {
            match element {
                PatternElement::Field(name) => {
                    if i > 0 {
                        write!(f, ".")?;
                    }
                    write!(f, "{}", name)?;
                }
                PatternElement::Index(idx) => write!(f, "[{}]", idx)?,
                PatternElement::AnyIndex => write!(f, "[]")?,
            }
        }
        Ok(())
    }
}

impl Path {
    /// Returns the index-agnostic pattern of this path: every index becomes
    /// a wildcard and field names are lowercased.
    pub fn wildcarded(&self) -> Pattern {
        Pattern {
            elements: self
                .iter()
                .map(|element| match element {
                    PathElement::FieldName(name) => PatternElement::Field(fold_case(name).collect()),
                    PathElement::Index(_) => PatternElement::AnyIndex,
                })
                .collect(),
        }
    }
}

/// PatternSet is an unordered collection of patterns.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PatternSet {
    patterns: Vec<Pattern>,
}

impl PatternSet {
    /// Creates a new empty set.
    pub fn new() -> Self {
        PatternSet {
            patterns: Vec::new(),
        }
    }

    /// Parses every input as a pattern.
    pub fn parse<I, S>(inputs: I) -> Result<Self, PathParseError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = PatternSet::new();
        for input in inputs {
            set.insert(Pattern::parse(input.as_ref())?);
        }
        Ok(set)
    }

    /// Adds a pattern; duplicates are dropped.
    pub fn insert(&mut self, pattern: Pattern) {
        if !self.patterns.contains(&pattern) {
            self.patterns.push(pattern);
        }
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Pattern> {
        self.patterns.iter()
    }

    /// Returns the most specific match of any pattern against `path`.
    pub fn best_match(&self, path: &Path) -> Option<Precedence> {
        if path.is_empty() {
            return None;
        }
        self.patterns.iter().filter_map(|p| p.match_path(path)).max()
    }

    /// Returns true if any pattern matches `path`.
    pub fn matches(&self, path: &Path) -> bool {
        self.best_match(path).is_some()
    }
}

/// What the traversal should do at a path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// No rule applies; compare normally.
    Compare,
    /// Skip the path and everything below it.
    Ignore,
    /// Report the path from configuration and do not descend.
    AlwaysInclude,
}

/// PathMatcher resolves the ignore and always-include sets into a [`Rule`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathMatcher {
    ignore: PatternSet,
    always_include: PatternSet,
}

impl PathMatcher {
    pub fn new(ignore: PatternSet, always_include: PatternSet) -> Self {
        PathMatcher {
            ignore,
            always_include,
        }
    }

    pub fn ignore(&self) -> &PatternSet {
        &self.ignore
    }

    pub fn always_include(&self) -> &PatternSet {
        &self.always_include
    }

    /// An exact match beats a shorthand match; on a tie, ignore wins.
    pub fn rule(&self, path: &Path) -> Rule {
        match (
            self.ignore.best_match(path),
            self.always_include.best_match(path),
        ) {
            (None, None) => Rule::Compare,
            (Some(_), None) => Rule::Ignore,
            (None, Some(_)) => Rule::AlwaysInclude,
            (Some(ignored), Some(included)) => {
                if included > ignored {
                    Rule::AlwaysInclude
                } else {
                    Rule::Ignore
                }
            }
        }
    }
}
