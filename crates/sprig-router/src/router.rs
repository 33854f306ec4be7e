//! Route table construction and lookup.
//!
//! Routes are registered on a [`RouterBuilder`] during a single-threaded
//! build phase. [`RouterBuilder::build`] freezes the tree into a
//! [`Router`], which only offers read-only lookups (plus the exclusive
//! `init`/`destroy` lifecycle calls) and can be shared between threads
//! without locking.

use std::fmt;
use std::future::Future;
use std::io;
use std::ops::{ControlFlow, Range};
use std::panic::Location;

use tracing::{debug, warn};

use crate::component::{
    self, Component, ComponentMut, Filter, HandleFunc, Handler, MethodHandler, TaskHandler,
    WebSocketHandler,
};
use crate::error::{Result, RouterError, SlotKind};
use crate::indexer::{VarIndexer, VarPool, DEFAULT_POOL_CAPACITY};
use crate::matcher::Step;
use crate::pattern::{CompiledPattern, VarMap};
use crate::processor::{Endpoint, RouteProcessor, Slot};
use crate::request::{Method, Request};
use crate::response::Response;
use crate::tree::{Conflict, Node};

/// Registration calls shared by [`RouterBuilder`] and [`Group`].
///
/// Every call reports the caller's source location in
/// [`RouterError::HandlerExists`].
pub trait Routes {
    /// Registers `component` under `pattern`.
    ///
    /// # Errors
    ///
    /// Fails with [`RouterError::InvalidPattern`] if the pattern does not
    /// compile, [`RouterError::Conflict`] if it branches ambiguously
    /// against an existing wildcard or catch-all, and
    /// [`RouterError::HandlerExists`] if the route already holds a
    /// handler, websocket handler or task handler of the same kind. The
    /// route table is unchanged by a failed registration.
    #[track_caller]
    fn handle(&mut self, pattern: &str, component: Component) -> Result<&mut Self>;

    /// Registers `func` for `method` under `pattern`. Calls with the same
    /// pattern add methods to one handler.
    ///
    /// # Errors
    ///
    /// As [`handle`](Self::handle); also fails with
    /// [`RouterError::HandlerExists`] when `method` is already served.
    #[track_caller]
    fn method(&mut self, pattern: &str, method: Method, func: HandleFunc) -> Result<&mut Self>;

    /// Registers routes below `prefix`.
    ///
    /// # Errors
    ///
    /// Returns the first error raised inside `f`.
    fn group<F>(&mut self, prefix: &str, f: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Group<'_>) -> Result<()>;

    /// Registers a request handler.
    ///
    /// # Errors
    ///
    /// See [`handle`](Self::handle).
    #[track_caller]
    fn handler(&mut self, pattern: &str, handler: impl Handler + 'static) -> Result<&mut Self> {
        self.handle(pattern, Component::handler(handler))
    }

    /// Registers a filter.
    ///
    /// # Errors
    ///
    /// See [`handle`](Self::handle).
    #[track_caller]
    fn filter(&mut self, pattern: &str, filter: impl Filter + 'static) -> Result<&mut Self> {
        self.handle(pattern, Component::filter(filter))
    }

    /// Registers a websocket handler.
    ///
    /// # Errors
    ///
    /// See [`handle`](Self::handle).
    #[track_caller]
    fn websocket(
        &mut self,
        pattern: &str,
        handler: impl WebSocketHandler + 'static,
    ) -> Result<&mut Self> {
        self.handle(pattern, Component::websocket(handler))
    }

    /// Registers a task handler.
    ///
    /// # Errors
    ///
    /// See [`handle`](Self::handle).
    #[track_caller]
    fn task(&mut self, pattern: &str, handler: impl TaskHandler + 'static) -> Result<&mut Self> {
        self.handle(pattern, Component::task(handler))
    }

    /// Registers an async function for `method`.
    ///
    /// # Errors
    ///
    /// See [`method`](Self::method).
    #[track_caller]
    fn handle_func<F, Fut>(&mut self, pattern: &str, method: Method, f: F) -> Result<&mut Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.method(pattern, method, component::handle_func(f))
    }

    /// Registers a GET function.
    ///
    /// # Errors
    ///
    /// See [`method`](Self::method).
    #[track_caller]
    fn get<F, Fut>(&mut self, pattern: &str, f: F) -> Result<&mut Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.handle_func(pattern, Method::Get, f)
    }

    /// Registers a POST function.
    ///
    /// # Errors
    ///
    /// See [`method`](Self::method).
    #[track_caller]
    fn post<F, Fut>(&mut self, pattern: &str, f: F) -> Result<&mut Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.handle_func(pattern, Method::Post, f)
    }

    /// Registers a PUT function.
    ///
    /// # Errors
    ///
    /// See [`method`](Self::method).
    #[track_caller]
    fn put<F, Fut>(&mut self, pattern: &str, f: F) -> Result<&mut Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.handle_func(pattern, Method::Put, f)
    }

    /// Registers a PATCH function.
    ///
    /// # Errors
    ///
    /// See [`method`](Self::method).
    #[track_caller]
    fn patch<F, Fut>(&mut self, pattern: &str, f: F) -> Result<&mut Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.handle_func(pattern, Method::Patch, f)
    }

    /// Registers a DELETE function.
    ///
    /// # Errors
    ///
    /// See [`method`](Self::method).
    #[track_caller]
    fn delete<F, Fut>(&mut self, pattern: &str, f: F) -> Result<&mut Self>
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.handle_func(pattern, Method::Delete, f)
    }
}

/// Mutable route table used during the build phase.
pub struct RouterBuilder {
    root: Node,
    has_filters: bool,
    pool_capacity: usize,
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RouterBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouterBuilder")
            .field("has_filters", &self.has_filters)
            .field("pool_capacity", &self.pool_capacity)
            .finish_non_exhaustive()
    }
}

impl RouterBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self {
            root: Node::default(),
            has_filters: false,
            pool_capacity: DEFAULT_POOL_CAPACITY,
        }
    }

    /// Sets how many idle capture buffers the router keeps for reuse.
    #[must_use]
    pub fn pool_capacity(mut self, capacity: usize) -> Self {
        self.pool_capacity = capacity;
        self
    }

    /// Writes the current tree; see [`Router::print_tree`].
    ///
    /// # Errors
    ///
    /// Returns any error raised by `w`.
    pub fn print_tree<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        self.root.print(w)
    }

    /// Freezes the route table.
    #[must_use]
    pub fn build(self) -> Router {
        debug!(
            has_filters = self.has_filters,
            pool_capacity = self.pool_capacity,
            "route table built"
        );
        Router {
            root: self.root,
            has_filters: self.has_filters,
            pool: VarPool::new(self.pool_capacity),
        }
    }

    fn attach(
        &mut self,
        pattern: &str,
        component: Component,
        location: &Location<'_>,
    ) -> Result<()> {
        let (pattern, vars, node) = route_node(&mut self.root, pattern)?;
        let rp = node.processor_mut();
        match component {
            Component::Handler(handler) => {
                ensure_vacant(rp.handler.is_some(), SlotKind::Handler, &pattern, location)?;
                rp.handler = Some(Slot {
                    component: Endpoint::Custom(handler),
                    vars,
                    pattern,
                });
            }
            Component::Filter(filter) => {
                rp.filters.push(filter);
                self.has_filters = true;
            }
            Component::WebSocket(handler) => {
                ensure_vacant(rp.websocket.is_some(), SlotKind::WebSocket, &pattern, location)?;
                rp.websocket = Some(Slot {
                    component: handler,
                    vars,
                    pattern,
                });
            }
            Component::Task(handler) => {
                ensure_vacant(rp.task.is_some(), SlotKind::Task, &pattern, location)?;
                rp.task = Some(Slot {
                    component: handler,
                    vars,
                    pattern,
                });
            }
        }
        Ok(())
    }

    fn attach_method(
        &mut self,
        pattern: &str,
        method: Method,
        func: HandleFunc,
        location: &Location<'_>,
    ) -> Result<()> {
        let (pattern, vars, node) = route_node(&mut self.root, pattern)?;
        let rp = node.processor_mut();
        match &mut rp.handler {
            None => {
                let mut methods = MethodHandler::new();
                methods.insert(method, func);
                rp.handler = Some(Slot {
                    component: Endpoint::Methods(methods),
                    vars,
                    pattern,
                });
                Ok(())
            }
            // Same variables means the same route written the same way, so
            // the method joins the existing handler.
            Some(Slot {
                component: Endpoint::Methods(methods),
                vars: existing,
                ..
            }) if *existing == vars => {
                if methods.insert(method, func) {
                    Ok(())
                } else {
                    let route = format!("{method} {pattern}");
                    Err(handler_exists(SlotKind::Handler, &route, location))
                }
            }
            Some(_) => Err(handler_exists(SlotKind::Handler, &pattern, location)),
        }
    }
}

/// Compiles `pattern` and returns the node it ends on.
fn route_node<'n>(root: &'n mut Node, pattern: &str) -> Result<(String, VarMap, &'n mut Node)> {
    let (pattern, matcher, vars) = CompiledPattern::compile(pattern)?.into_parts();
    match root.insert(&matcher) {
        Ok(node) => Ok((pattern, vars, node)),
        Err(Conflict) => Err(RouterError::Conflict { pattern }),
    }
}

fn ensure_vacant(
    occupied: bool,
    kind: SlotKind,
    pattern: &str,
    location: &Location<'_>,
) -> Result<()> {
    if occupied {
        Err(handler_exists(kind, pattern, location))
    } else {
        Ok(())
    }
}

fn handler_exists(kind: SlotKind, pattern: &str, location: &Location<'_>) -> RouterError {
    RouterError::HandlerExists {
        kind,
        pattern: pattern.to_string(),
        location: location.to_string(),
    }
}

fn log_registration(pattern: &str, kind: &str, result: &Result<()>) {
    match result {
        Ok(()) => debug!(pattern, kind, "registered route"),
        Err(error) => warn!(pattern, kind, %error, "route registration rejected"),
    }
}

impl Routes for RouterBuilder {
    #[track_caller]
    fn handle(&mut self, pattern: &str, component: Component) -> Result<&mut Self> {
        let location = Location::caller();
        let kind = component.kind_name();
        let result = self.attach(pattern, component, location);
        log_registration(pattern, kind, &result);
        result.map(|()| self)
    }

    #[track_caller]
    fn method(&mut self, pattern: &str, method: Method, func: HandleFunc) -> Result<&mut Self> {
        let location = Location::caller();
        let result = self.attach_method(pattern, method, func, location);
        log_registration(pattern, method.as_str(), &result);
        result.map(|()| self)
    }

    fn group<F>(&mut self, prefix: &str, f: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Group<'_>) -> Result<()>,
    {
        f(&mut Group::new(self, prefix))?;
        Ok(self)
    }
}

/// Registers routes below a common prefix.
///
/// ```
/// use sprig_router::{Response, RouterBuilder, Routes};
///
/// let mut builder = RouterBuilder::new();
/// builder
///     .group("/api/v1", |api| {
///         api.get("/users", |_req| async { Response::text("users") })?;
///         api.get("/users/:id", |_req| async { Response::text("user") })?;
///         Ok(())
///     })
///     .unwrap();
/// let router = builder.build();
/// assert!(router.match_handler_filters("/api/v1/users/7").handler.is_some());
/// ```
pub struct Group<'b> {
    builder: &'b mut RouterBuilder,
    prefix: String,
}

impl fmt::Debug for Group<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Group")
            .field("prefix", &self.prefix)
            .finish_non_exhaustive()
    }
}

impl<'b> Group<'b> {
    fn new(builder: &'b mut RouterBuilder, prefix: &str) -> Self {
        Self {
            builder,
            prefix: prefix.trim().trim_end_matches('/').to_string(),
        }
    }

    /// Returns the prefix prepended to every pattern of this group.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn full(&self, pattern: &str) -> String {
        format!("{}{}", self.prefix, pattern.trim())
    }
}

impl Routes for Group<'_> {
    #[track_caller]
    fn handle(&mut self, pattern: &str, component: Component) -> Result<&mut Self> {
        let full = self.full(pattern);
        self.builder.handle(&full, component)?;
        Ok(self)
    }

    #[track_caller]
    fn method(&mut self, pattern: &str, method: Method, func: HandleFunc) -> Result<&mut Self> {
        let full = self.full(pattern);
        self.builder.method(&full, method, func)?;
        Ok(self)
    }

    fn group<F>(&mut self, prefix: &str, f: F) -> Result<&mut Self>
    where
        F: FnOnce(&mut Group<'_>) -> Result<()>,
    {
        let full = self.full(prefix);
        f(&mut Group::new(&mut *self.builder, &full))?;
        Ok(self)
    }
}

/// Result of [`Router::match_handler_filters`].
pub struct HandlerMatch<'r, 'p> {
    /// Handler of the matched route, if any.
    pub handler: Option<&'r dyn Handler>,
    /// Pattern the handler was registered under.
    pub route: Option<&'r str>,
    /// Captured path variables.
    pub vars: VarIndexer<'r, 'p>,
    /// Filters of every node along the matched path, root first.
    pub filters: Vec<&'r dyn Filter>,
}

/// Frozen route table.
///
/// Lookups take `&self` and never write to the tree, so a `Router` can be
/// shared across threads. The only shared mutable state is the pool of
/// capture buffers behind each [`VarIndexer`].
pub struct Router {
    root: Node,
    has_filters: bool,
    pool: VarPool,
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field("has_filters", &self.has_filters)
            .finish_non_exhaustive()
    }
}

impl Router {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Resolves the handler for `path`, the variables it captures and the
    /// filters registered along it.
    ///
    /// Filters are collected from every node whose segment the path
    /// matched, root first, in registration order within a node. They are
    /// returned even when no handler matches.
    ///
    /// ```
    /// use sprig_router::{Response, RouterBuilder, Routes};
    ///
    /// let mut builder = RouterBuilder::new();
    /// builder.get("/user/:id", |_req| async { Response::ok() }).unwrap();
    /// let router = builder.build();
    ///
    /// let matched = router.match_handler_filters("/user/42");
    /// assert!(matched.handler.is_some());
    /// assert_eq!(matched.vars.get("id"), Some("42"));
    /// assert!(matched.filters.is_empty());
    /// ```
    #[must_use]
    pub fn match_handler_filters<'p>(&self, path: &'p str) -> HandlerMatch<'_, 'p> {
        let mut vars = VarIndexer::new(&self.pool, path);
        let mut filters = Vec::new();
        let node = if self.has_filters {
            self.step_with_filters(path, vars.values_mut(), &mut filters)
        } else {
            self.root.match_one(path, vars.values_mut())
        };
        let slot = node
            .and_then(|n| n.processor.as_ref())
            .and_then(|p| p.handler.as_ref());
        if let Some(slot) = slot {
            vars.bind(&slot.vars);
        }
        HandlerMatch {
            handler: slot.map(|slot| slot.component.as_handler()),
            route: slot.map(|slot| slot.pattern.as_str()),
            vars,
            filters,
        }
    }

    fn step_with_filters<'r>(
        &'r self,
        path: &str,
        values: &mut Vec<Range<usize>>,
        filters: &mut Vec<&'r dyn Filter>,
    ) -> Option<&'r Node> {
        let mut node = &self.root;
        let mut cursor = 0;
        loop {
            match node.match_step(path, cursor, values) {
                Step::Descend { next, cursor: at } => {
                    extend_filters(filters, node);
                    node = next;
                    cursor = at;
                }
                Step::Done(end) => {
                    extend_filters(filters, end);
                    return Some(end);
                }
                Step::Stranded(last) => {
                    extend_filters(filters, last);
                    values.clear();
                    return None;
                }
                Step::Miss => {
                    values.clear();
                    return None;
                }
            }
        }
    }

    /// Resolves the websocket handler for `path`. Filters do not apply to
    /// websocket routes.
    #[must_use]
    pub fn match_websocket_handler<'p>(
        &self,
        path: &'p str,
    ) -> (Option<&dyn WebSocketHandler>, VarIndexer<'_, 'p>) {
        let mut vars = VarIndexer::new(&self.pool, path);
        let handler = self
            .root
            .match_one(path, vars.values_mut())
            .and_then(|n| n.processor.as_ref())
            .and_then(|p| p.websocket.as_ref())
            .map(|slot| {
                vars.bind(&slot.vars);
                slot.component.as_ref()
            });
        (handler, vars)
    }

    /// Resolves the task handler for `path`.
    #[must_use]
    pub fn match_task_handler(&self, path: &str) -> Option<&dyn TaskHandler> {
        self.root
            .match_only(path)
            .and_then(|n| n.processor.as_ref())
            .and_then(|p| p.task.as_ref())
            .map(|slot| slot.component.as_ref())
    }

    /// Writes the tree, one line per node. Each line joins the segments
    /// from the root down to the node with `-`; wildcards print as `:` and
    /// catch-alls as `*`.
    ///
    /// # Errors
    ///
    /// Returns any error raised by `w`.
    pub fn print_tree<W: io::Write>(&self, w: &mut W) -> io::Result<()> {
        self.root.print(w)
    }

    /// Visits every registered component: nodes in pre-order, and within a
    /// node the handler, the filters, the websocket handler and the task
    /// handler. The first `Break` stops the walk and is returned.
    pub fn init<B, F>(&mut self, mut f: F) -> ControlFlow<B>
    where
        F: FnMut(ComponentMut<'_>) -> ControlFlow<B>,
    {
        for processor in self.root.processors_mut() {
            processor.visit(&mut f)?;
        }
        ControlFlow::Continue(())
    }

    /// Calls `destroy` on every registered component, in the order of
    /// [`init`](Self::init), and empties the route table's slots.
    pub fn destroy(&mut self) {
        let destroyed: usize = self
            .root
            .processors_mut()
            .into_iter()
            .map(RouteProcessor::destroy)
            .sum();
        debug!(destroyed, "route table destroyed");
    }
}

fn extend_filters<'r>(filters: &mut Vec<&'r dyn Filter>, node: &'r Node) {
    if let Some(p) = &node.processor {
        filters.extend(p.filters.iter().map(|f| f.as_ref() as &dyn Filter));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{BoxFuture, FilterResult};

    fn ok_builder(patterns: &[&str]) -> RouterBuilder {
        let mut builder = RouterBuilder::new();
        for &p in patterns {
            builder.get(p, |_req| async { Response::ok() }).unwrap();
        }
        builder
    }

    struct Pass;

    impl Filter for Pass {
        fn before<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, FilterResult> {
            Box::pin(async move { FilterResult::Continue(req.clone()) })
        }
    }

    #[test]
    fn test_filter_walk_matches_fast_path() {
        let patterns = ["/", "/a/:x", "/a/:x/c", "/a/b", "/f/*rest"];
        let plain = ok_builder(&patterns).build();
        let mut filtered = ok_builder(&patterns);
        filtered.filter("/zzz", Pass).unwrap();
        let filtered = filtered.build();
        assert!(!plain.has_filters);
        assert!(filtered.has_filters);

        for path in ["/", "/a/1", "/a/1/c", "/a/b", "/f/x/y", "/a", "/q", "/a/b/c"] {
            let a = plain.match_handler_filters(path);
            let b = filtered.match_handler_filters(path);
            assert_eq!(a.route, b.route, "path {path}");
            assert_eq!(
                a.vars.values().collect::<Vec<_>>(),
                b.vars.values().collect::<Vec<_>>(),
                "path {path}"
            );
        }
    }

    #[test]
    fn test_debug_output() {
        let mut builder = RouterBuilder::new().pool_capacity(3);
        let err = builder.filter("nope", Pass).unwrap_err();
        assert!(matches!(err, RouterError::InvalidPattern { .. }));
        assert_eq!(
            format!("{builder:?}"),
            "RouterBuilder { has_filters: false, pool_capacity: 3, .. }"
        );
        builder
            .group("/v1/", |g| {
                assert_eq!(format!("{g:?}"), "Group { prefix: \"/v1\", .. }");
                Ok(())
            })
            .unwrap();
        assert_eq!(
            format!("{:?}", builder.build()),
            "Router { has_filters: false, .. }"
        );
    }

    #[test]
    fn test_lookups_recycle_buffers() {
        let router = ok_builder(&["/u/:id"]).pool_capacity(2).build();
        for _ in 0..10 {
            let matched = router.match_handler_filters("/u/1");
            assert_eq!(matched.vars.get("id"), Some("1"));
        }
        assert_eq!(router.pool.idle(), 1);

        let held: Vec<_> = (0..4)
            .map(|_| router.match_websocket_handler("/u/1").1)
            .collect();
        assert_eq!(router.pool.idle(), 0);
        drop(held);
        assert_eq!(router.pool.idle(), 2);
    }

    #[test]
    fn test_miss_after_partial_capture_clears_values() {
        let mut builder = ok_builder(&["/a/:x/b"]);
        builder.filter("/a", Pass).unwrap();
        let router = builder.build();
        let matched = router.match_handler_filters("/a/1/c");
        assert!(matched.handler.is_none());
        assert!(matched.vars.is_empty());
    }
}
