//! Pooled access to the variables captured by a lookup.

use std::fmt;
use std::ops::Range;
use std::str::FromStr;

use parking_lot::Mutex;

use crate::error::{Result, RouterError};
use crate::pattern::VarMap;
use crate::request::PathParams;

/// Default number of idle capture buffers a router keeps.
pub const DEFAULT_POOL_CAPACITY: usize = 64;

/// Free list of capture buffers shared by all lookups of one router.
pub(crate) struct VarPool {
    free: Mutex<Vec<Vec<Range<usize>>>>,
    capacity: usize,
}

impl VarPool {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            capacity,
        }
    }

    pub(crate) fn acquire(&self) -> Vec<Range<usize>> {
        self.free.lock().pop().unwrap_or_default()
    }

    /// Takes a buffer back; it is dropped if the pool is full.
    pub(crate) fn release(&self, mut buf: Vec<Range<usize>>) {
        buf.clear();
        let mut free = self.free.lock();
        if free.len() < self.capacity {
            free.push(buf);
        }
    }

    #[cfg(test)]
    pub(crate) fn idle(&self) -> usize {
        self.free.lock().len()
    }
}

/// Name → value view over the variables captured by one lookup.
///
/// The indexer borrows its capture buffer from the router's pool and hands
/// it back when dropped, so it should be released as soon as the values
/// have been consumed (copy them out with [`to_params`](Self::to_params)
/// if they must outlive the lookup).
pub struct VarIndexer<'r, 'p> {
    path: &'p str,
    vars: Option<&'r VarMap>,
    values: Vec<Range<usize>>,
    pool: &'r VarPool,
}

impl<'r, 'p> VarIndexer<'r, 'p> {
    pub(crate) fn new(pool: &'r VarPool, path: &'p str) -> Self {
        Self {
            path,
            vars: None,
            values: pool.acquire(),
            pool,
        }
    }

    pub(crate) fn values_mut(&mut self) -> &mut Vec<Range<usize>> {
        &mut self.values
    }

    pub(crate) fn bind(&mut self, vars: &'r VarMap) {
        self.vars = Some(vars);
    }

    /// Returns the value of the named variable.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&'p str> {
        let index = self.vars?.index_of(name)?;
        self.value(index)
    }

    /// Returns the value of the named variable, or `default`.
    #[must_use]
    pub fn get_or<'a>(&self, name: &str, default: &'a str) -> &'a str
    where
        'p: 'a,
    {
        self.get(name).unwrap_or(default)
    }

    /// Parses the named variable.
    ///
    /// # Errors
    ///
    /// Returns [`RouterError::MissingVar`] if the route declares no such
    /// variable, and [`RouterError::InvalidVar`] if its value does not
    /// parse.
    pub fn parse<T: FromStr>(&self, name: &str) -> Result<T> {
        let value = self
            .get(name)
            .ok_or_else(|| RouterError::MissingVar(name.to_string()))?;
        value.parse().map_err(|_| RouterError::InvalidVar {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    /// Returns the capture at `index`, named or not.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&'p str> {
        let span = self.values.get(index)?;
        self.path.get(span.clone())
    }

    /// Returns all captures in path order.
    pub fn values(&self) -> impl Iterator<Item = &'p str> + '_ {
        let path = self.path;
        self.values.iter().filter_map(move |span| path.get(span.clone()))
    }

    /// Returns the number of captures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns true if nothing was captured.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Copies the named variables out.
    #[must_use]
    pub fn to_params(&self) -> PathParams {
        let mut params = PathParams::new();
        if let Some(vars) = self.vars {
            for name in vars.names() {
                if let Some(value) = self.get(name) {
                    params.insert(name, value);
                }
            }
        }
        params
    }
}

impl Drop for VarIndexer<'_, '_> {
    fn drop(&mut self) {
        self.pool.release(std::mem::take(&mut self.values));
    }
}

impl fmt::Debug for VarIndexer<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VarIndexer")
            .field("path", &self.path)
            .field("values", &self.values().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
