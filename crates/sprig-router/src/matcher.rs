//! Read-only walks over the route tree.
//!
//! All walks compare the path byte by byte against node segments. A
//! wildcard sentinel consumes the path up to the next `/`; a catch-all
//! sentinel consumes the rest of the path and ends the walk. When a segment
//! is exhausted the walk continues into the child whose first byte equals
//! the next path byte, falling back to the wildcard-class child. There is
//! no backtracking: once a literal branch is taken, a failure below it is a
//! failure of the whole walk.

use std::ops::Range;

use crate::pattern::{CATCH_ALL, WILDCARD};
use crate::tree::Node;

/// Receives the span of every wildcard and catch-all capture.
pub(crate) trait Captures {
    fn capture(&mut self, span: Range<usize>);
}

/// Discards captures.
impl Captures for () {
    #[inline]
    fn capture(&mut self, _span: Range<usize>) {}
}

impl Captures for Vec<Range<usize>> {
    #[inline]
    fn capture(&mut self, span: Range<usize>) {
        self.push(span);
    }
}

/// Outcome of matching one node's segment.
enum Segment {
    /// The segment matched; the path continues at the cursor.
    Matched(usize),
    /// A catch-all consumed the rest of the path.
    CatchAll,
    Miss,
}

/// Outcome of one [`Node::match_step`].
pub(crate) enum Step<'t> {
    /// This node matched; continue with `next` at `cursor`.
    Descend { next: &'t Node, cursor: usize },
    /// The path ends at this node.
    Done(&'t Node),
    /// This node matched but no branch takes the rest of the path.
    Stranded(&'t Node),
    /// This node's segment does not match.
    Miss,
}

impl Node {
    fn match_segment<C: Captures>(
        &self,
        path: &[u8],
        mut cursor: usize,
        caps: &mut C,
    ) -> Segment {
        for &c in &self.segment {
            let Some(&p) = path.get(cursor) else {
                return Segment::Miss;
            };
            if c == p {
                cursor += 1;
            } else if c == WILDCARD {
                let start = cursor;
                cursor = path[cursor..]
                    .iter()
                    .position(|&b| b == b'/')
                    .map_or(path.len(), |i| cursor + i);
                caps.capture(start..cursor);
            } else if c == CATCH_ALL {
                caps.capture(cursor..path.len());
                return Segment::CatchAll;
            } else {
                return Segment::Miss;
            }
        }
        Segment::Matched(cursor)
    }

    /// Full walk; returns the node the whole path ends on.
    fn walk<C: Captures>(&self, path: &str, caps: &mut C) -> Option<&Self> {
        let path = path.as_bytes();
        let mut node = self;
        let mut cursor = 0;
        loop {
            match node.match_segment(path, cursor, caps) {
                Segment::Matched(next) if next == path.len() => return Some(node),
                Segment::Matched(next) => {
                    cursor = next;
                    node = node.child_for(path[cursor])?;
                }
                Segment::CatchAll => return Some(node),
                Segment::Miss => return None,
            }
        }
    }

    /// Finds the node `path` ends on, without recording captures.
    pub(crate) fn match_only(&self, path: &str) -> Option<&Self> {
        self.walk(path, &mut ())
    }

    /// Finds the node `path` ends on, appending capture spans to `values`
    /// in traversal order. On a miss `values` is restored to its prior
    /// length.
    pub(crate) fn match_one(
        &self,
        path: &str,
        values: &mut Vec<Range<usize>>,
    ) -> Option<&Self> {
        let start = values.len();
        let found = self.walk(path, values);
        if found.is_none() {
            values.truncate(start);
        }
        found
    }

    /// Matches this node's segment against `path` from `cursor` and picks
    /// the node to continue with.
    pub(crate) fn match_step(
        &self,
        path: &str,
        cursor: usize,
        values: &mut Vec<Range<usize>>,
    ) -> Step<'_> {
        let path = path.as_bytes();
        match self.match_segment(path, cursor, values) {
            Segment::Matched(next) if next == path.len() => Step::Done(self),
            Segment::Matched(next) => match self.child_for(path[next]) {
                Some(child) => Step::Descend {
                    next: child,
                    cursor: next,
                },
                None => Step::Stranded(self),
            },
            Segment::CatchAll => Step::Done(self),
            Segment::Miss => Step::Miss,
        }
    }
}
