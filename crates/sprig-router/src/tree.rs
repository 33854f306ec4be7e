//! Compressed prefix tree holding the route table.
//!
//! Every node stores the longest prefix shared by all canonical patterns
//! passing through it. Children are kept sorted by their first byte, which
//! puts literal branches before the wildcard branch and the wildcard branch
//! before the catch-all branch. A node has at most one wildcard-class
//! branch: two of them would make it undecidable which one consumes the
//! next segment.

use std::io;

use crate::pattern::{is_wildcard_class, render};
use crate::processor::RouteProcessor;

/// Separator between tree levels in [`Node::print`] output.
const PRINT_SEP: &str = "-";

/// Insertion would create a second wildcard-class branch at one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Conflict;

#[derive(Default)]
pub(crate) struct Node {
    pub(crate) segment: Vec<u8>,
    /// First byte of each child, ascending; parallel to `children`.
    pub(crate) indices: Vec<u8>,
    pub(crate) children: Vec<Node>,
    pub(crate) processor: Option<RouteProcessor>,
}

impl Node {
    fn leaf(segment: &[u8]) -> Self {
        Self {
            segment: segment.to_vec(),
            ..Self::default()
        }
    }

    /// Inserts a canonical path and returns the node representing it.
    ///
    /// Inserting a path that is already present returns its node. On
    /// conflict the tree is left untouched.
    pub(crate) fn insert(&mut self, path: &[u8]) -> Result<&mut Self, Conflict> {
        if self.segment.is_empty() && self.children.is_empty() {
            self.segment = path.to_vec();
            return Ok(self);
        }

        let common = common_prefix_len(&self.segment, path);
        if common == path.len() {
            if common < self.segment.len() {
                self.split(common);
            }
            return Ok(self);
        }

        let first = path[common];
        if common == self.segment.len() {
            if let Some(i) = self.indices.iter().position(|&b| b == first) {
                return self.children[i].insert(&path[common..]);
            }
            if !self.accepts_branch(first) {
                return Err(Conflict);
            }
        } else {
            // After the split the only other branch is the old remainder.
            let existing = self.segment[common];
            if is_wildcard_class(existing) && is_wildcard_class(first) {
                return Err(Conflict);
            }
            self.split(common);
        }

        let at = self.add_child(first, Self::leaf(&path[common..]));
        Ok(&mut self.children[at])
    }

    /// Pushes everything past `at` down into a single new child.
    fn split(&mut self, at: usize) {
        let suffix = self.segment.split_off(at);
        let first = suffix[0];
        let child = Self {
            segment: suffix,
            indices: std::mem::take(&mut self.indices),
            children: std::mem::take(&mut self.children),
            processor: self.processor.take(),
        };
        self.indices = vec![first];
        self.children = vec![child];
    }

    fn accepts_branch(&self, first: u8) -> bool {
        !(is_wildcard_class(first)
            && self
                .indices
                .last()
                .is_some_and(|&b| is_wildcard_class(b)))
    }

    /// Adds a child keeping `indices` sorted; returns its position.
    fn add_child(&mut self, first: u8, child: Self) -> usize {
        let at = self.indices.partition_point(|&b| b < first);
        self.indices.insert(at, first);
        self.children.insert(at, child);
        at
    }

    /// Returns the child to descend into for the next path byte: the
    /// literal branch for that byte, else the wildcard-class branch.
    #[inline]
    pub(crate) fn child_for(&self, byte: u8) -> Option<&Self> {
        self.indices
            .iter()
            .position(|&b| b == byte || is_wildcard_class(b))
            .map(|i| &self.children[i])
    }

    pub(crate) fn processor_mut(&mut self) -> &mut RouteProcessor {
        self.processor.get_or_insert_with(RouteProcessor::default)
    }

    /// Collects the processors of the subtree in pre-order (node first,
    /// then children in branch order).
    pub(crate) fn processors_mut(&mut self) -> Vec<&mut RouteProcessor> {
        let mut out = Vec::new();
        collect_processors(self, &mut out);
        out
    }

    /// Writes one line per node: ancestor segments and the node's own,
    /// joined by `-`, with sentinels shown as their markers.
    pub(crate) fn print(&self, w: &mut dyn io::Write) -> io::Result<()> {
        self.print_with_parent(w, "")
    }

    fn print_with_parent(&self, w: &mut dyn io::Write, parent: &str) -> io::Result<()> {
        let line = if parent.is_empty() {
            render(&self.segment)
        } else {
            format!("{parent}{PRINT_SEP}{}", render(&self.segment))
        };
        writeln!(w, "{line}")?;
        for child in &self.children {
            child.print_with_parent(w, &line)?;
        }
        Ok(())
    }
}

fn collect_processors<'a>(node: &'a mut Node, out: &mut Vec<&'a mut RouteProcessor>) {
    let Node {
        processor,
        children,
        ..
    } = node;
    if let Some(p) = processor.as_mut() {
        out.push(p);
    }
    for child in children {
        collect_processors(child, out);
    }
}

/// Find the length of the common prefix between two byte strings.
#[inline]
fn common_prefix_len(a: &[u8], b: &[u8]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}
