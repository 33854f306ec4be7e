//! Routable components: handlers, filters, websocket and task handlers.
//!
//! The router does not care what a component does with a request. It only
//! needs to know which slot a component belongs to, which is carried by
//! the [`Component`] tag at registration time, and it calls `destroy` once
//! when the route table is torn down.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::{Method, Request};
use crate::response::Response;

/// A boxed future for async component operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A boxed async function serving one method of a route.
pub type HandleFunc = Arc<dyn Fn(Request) -> BoxFuture<'static, Response> + Send + Sync>;

/// Wraps an async function into a [`HandleFunc`].
pub fn handle_func<F, Fut>(f: F) -> HandleFunc
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |req: Request| -> BoxFuture<'static, Response> { Box::pin(f(req)) })
}

/// Serves requests for a route.
pub trait Handler: Send + Sync {
    /// Returns the function serving `method`, if this handler supports it.
    fn handle_func(&self, method: Method) -> Option<&HandleFunc>;

    /// Releases resources held by the handler.
    fn destroy(&mut self) {}
}

/// Result of running a filter.
pub enum FilterResult {
    /// Continue to the next filter/handler.
    Continue(Request),
    /// Stop processing and return this response.
    Response(Response),
}

/// Intercepts requests on every route below the pattern it is registered
/// on.
///
/// # Example
///
/// ```ignore
/// struct RequireToken;
///
/// impl Filter for RequireToken {
///     fn before<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, FilterResult> {
///         Box::pin(async move {
///             if req.get_header("Authorization").is_some() {
///                 FilterResult::Continue(req.clone())
///             } else {
///                 FilterResult::Response(Response::new(401))
///             }
///         })
///     }
/// }
/// ```
pub trait Filter: Send + Sync {
    /// Called before the request handler.
    ///
    /// Can modify the request or short-circuit with a response.
    fn before<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, FilterResult>;

    /// Called after the request handler, in reverse filter order.
    fn after<'a>(&'a self, res: Response) -> BoxFuture<'a, Response> {
        Box::pin(async move { res })
    }

    /// Releases resources held by the filter.
    fn destroy(&mut self) {}
}

/// Serves upgraded websocket connections for a route.
pub trait WebSocketHandler: Send + Sync {
    /// Called once the connection for `req` has been upgraded.
    fn serve<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, ()>;

    /// Releases resources held by the handler.
    fn destroy(&mut self) {}
}

/// Runs background tasks submitted under a route path.
pub trait TaskHandler: Send + Sync {
    /// Runs one task.
    fn run(&self, payload: serde_json::Value) -> BoxFuture<'_, ()>;

    /// Releases resources held by the handler.
    fn destroy(&mut self) {}
}

/// A component tagged with the slot it is registered into.
pub enum Component {
    /// Request handler; one per route node.
    Handler(Box<dyn Handler>),
    /// Filter; any number per route node, kept in registration order.
    Filter(Box<dyn Filter>),
    /// Websocket handler; one per route node.
    WebSocket(Box<dyn WebSocketHandler>),
    /// Task handler; one per route node.
    Task(Box<dyn TaskHandler>),
}

impl Component {
    /// Tags a request handler.
    pub fn handler(handler: impl Handler + 'static) -> Self {
        Self::Handler(Box::new(handler))
    }

    /// Tags a filter.
    pub fn filter(filter: impl Filter + 'static) -> Self {
        Self::Filter(Box::new(filter))
    }

    /// Tags a websocket handler.
    pub fn websocket(handler: impl WebSocketHandler + 'static) -> Self {
        Self::WebSocket(Box::new(handler))
    }

    /// Tags a task handler.
    pub fn task(handler: impl TaskHandler + 'static) -> Self {
        Self::Task(Box::new(handler))
    }

    pub(crate) const fn kind_name(&self) -> &'static str {
        match self {
            Self::Handler(_) => "handler",
            Self::Filter(_) => "filter",
            Self::WebSocket(_) => "websocket",
            Self::Task(_) => "task",
        }
    }
}

/// Mutable access to one registered component, handed out by
/// [`Router::init`](crate::Router::init).
pub enum ComponentMut<'a> {
    /// A request handler.
    Handler(&'a mut dyn Handler),
    /// A filter.
    Filter(&'a mut dyn Filter),
    /// A websocket handler.
    WebSocket(&'a mut dyn WebSocketHandler),
    /// A task handler.
    Task(&'a mut dyn TaskHandler),
}

/// A handler dispatching on the request method.
///
/// Built by the method-scoped registration calls on
/// [`RouterBuilder`](crate::RouterBuilder); every call for the same pattern
/// adds one method.
#[derive(Default)]
pub struct MethodHandler {
    funcs: HashMap<Method, HandleFunc>,
}

impl MethodHandler {
    /// Creates an empty method handler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the function for `method`, returning false if one was already
    /// set.
    pub fn insert(&mut self, method: Method, func: HandleFunc) -> bool {
        if self.funcs.contains_key(&method) {
            return false;
        }
        self.funcs.insert(method, func);
        true
    }

    /// Returns the methods this handler serves.
    pub fn methods(&self) -> impl Iterator<Item = Method> + '_ {
        self.funcs.keys().copied()
    }
}

impl Handler for MethodHandler {
    fn handle_func(&self, method: Method) -> Option<&HandleFunc> {
        self.funcs.get(&method)
    }

    fn destroy(&mut self) {
        self.funcs.clear();
    }
}
