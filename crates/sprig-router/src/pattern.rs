//! Route pattern compilation.
//!
//! A pattern such as `/users/:id/files/*path` is compiled into a canonical
//! byte string in which every marker is replaced by a sentinel byte:
//!
//! - `:name` captures one path segment (up to the next `/`)
//! - `*name` captures the rest of the path, `/` included
//!
//! The marker may follow a literal prefix inside a segment (`user:id`), and
//! the name may be omitted (`/:`, `/*`): the capture still occupies a
//! positional slot but cannot be looked up by name.

use crate::error::{Result, RouterError};

/// Marker for a single-segment capture in pattern text.
pub const WILDCARD_MARKER: char = ':';
/// Marker for a rest-of-path capture in pattern text.
pub const CATCH_ALL_MARKER: char = '*';

/// Sentinel standing in for a single-segment capture.
///
/// Neither sentinel can occur in UTF-8 text, so both sort after every
/// literal path byte: literal < wildcard < catch-all.
pub(crate) const WILDCARD: u8 = 0xFE;
/// Sentinel standing in for a rest-of-path capture.
pub(crate) const CATCH_ALL: u8 = 0xFF;

const MARKERS: [char; 2] = [WILDCARD_MARKER, CATCH_ALL_MARKER];

/// Returns true for bytes that belong to the wildcard class.
#[inline]
pub(crate) const fn is_wildcard_class(b: u8) -> bool {
    b >= WILDCARD
}

/// Variable names of a compiled pattern, each mapped to its capture index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VarMap {
    names: Vec<(String, usize)>,
}

impl VarMap {
    /// Returns the capture index of `name`.
    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names
            .iter()
            .find(|(n, _)| n == name)
            .map(|&(_, index)| index)
    }

    /// Returns the declared names in capture order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(|(n, _)| n.as_str())
    }

    /// Returns the number of named variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Returns true if the pattern declares no named variable.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    fn insert(&mut self, name: &str, index: usize) -> bool {
        if self.index_of(name).is_some() {
            return false;
        }
        self.names.push((name.to_string(), index));
        true
    }
}

/// A route pattern compiled into its canonical matcher form.
#[derive(Debug, Clone)]
pub struct CompiledPattern {
    pattern: String,
    matcher: Vec<u8>,
    vars: VarMap,
    captures: usize,
}

impl CompiledPattern {
    /// Compiles `pattern`.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::InvalidPattern`] when the pattern does not
    /// start with `/`, when a segment holds more than one marker, when a
    /// catch-all is followed by further segments, or when a variable name
    /// is declared twice.
    ///
    /// # Example
    ///
    /// ```
    /// use sprig_router::CompiledPattern;
    ///
    /// let compiled = CompiledPattern::compile("/posts/:post/comments/:id").unwrap();
    /// assert_eq!(compiled.vars().index_of("post"), Some(0));
    /// assert_eq!(compiled.vars().index_of("id"), Some(1));
    /// assert_eq!(compiled.display_matcher(), "/posts/:/comments/:");
    /// ```
    pub fn compile(pattern: &str) -> Result<Self> {
        let pattern = pattern.trim();
        if !pattern.starts_with('/') {
            return Err(RouterError::invalid_pattern(pattern, "must start with '/'"));
        }
        let body = if pattern.len() > 1 {
            pattern.strip_suffix('/').unwrap_or(pattern)
        } else {
            pattern
        };

        let mut matcher = Vec::with_capacity(body.len());
        let mut vars = VarMap::default();
        let mut captures = 0;
        let mut segments = body[1..].split('/').peekable();

        while let Some(segment) = segments.next() {
            matcher.push(b'/');
            let Some(at) = segment.rfind(MARKERS) else {
                matcher.extend_from_slice(segment.as_bytes());
                continue;
            };

            let (literal, rest) = segment.split_at(at);
            if literal.contains(MARKERS) {
                return Err(RouterError::invalid_pattern(
                    pattern,
                    format!("segment {segment:?} holds more than one marker"),
                ));
            }
            let sentinel = if rest.starts_with(CATCH_ALL_MARKER) {
                if segments.peek().is_some() {
                    return Err(RouterError::invalid_pattern(
                        pattern,
                        "a catch-all must be the last segment",
                    ));
                }
                CATCH_ALL
            } else {
                WILDCARD
            };

            let name = &rest[1..];
            if !name.is_empty() && !vars.insert(name, captures) {
                return Err(RouterError::invalid_pattern(
                    pattern,
                    format!("variable {name:?} declared twice"),
                ));
            }
            captures += 1;

            matcher.extend_from_slice(literal.as_bytes());
            matcher.push(sentinel);
        }

        Ok(Self {
            pattern: pattern.to_string(),
            matcher,
            vars,
            captures,
        })
    }

    /// Returns the pattern text as registered.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the canonical matcher bytes.
    #[must_use]
    pub fn matcher(&self) -> &[u8] {
        &self.matcher
    }

    /// Returns the variable map.
    #[must_use]
    pub fn vars(&self) -> &VarMap {
        &self.vars
    }

    /// Returns the number of positional captures, named or not.
    #[must_use]
    pub fn captures(&self) -> usize {
        self.captures
    }

    /// Renders the matcher with sentinels shown as their markers.
    #[must_use]
    pub fn display_matcher(&self) -> String {
        render(&self.matcher)
    }

    pub(crate) fn into_parts(self) -> (String, Vec<u8>, VarMap) {
        (self.pattern, self.matcher, self.vars)
    }
}

/// Renders canonical bytes back into pattern notation.
pub(crate) fn render(bytes: &[u8]) -> String {
    let mut out = Vec::with_capacity(bytes.len());
    for &b in bytes {
        out.push(match b {
            WILDCARD => b':',
            CATCH_ALL => b'*',
            other => other,
        });
    }
    String::from_utf8_lossy(&out).into_owned()
}
