//! # sprig-router
//!
//! A radix-tree path router.
//!
//! Route patterns are plain paths in which a segment may start with a
//! wildcard (`:name`, matching one segment) or, as the last segment, a
//! catch-all (`*name`, matching the rest of the path). The name may be
//! omitted. Each route node can carry one request handler, one websocket
//! handler, one task handler and any number of filters.
//!
//! Routes are registered on a [`RouterBuilder`], which is then frozen into
//! an immutable [`Router`] that can be shared between threads.
//!
//! ## Quick Start
//!
//! ```
//! use sprig_router::{Request, Response, RouterBuilder, Routes};
//!
//! let mut builder = RouterBuilder::new();
//! builder
//!     .get("/", |_req| async { Response::text("home") })
//!     .unwrap()
//!     .get("/user/:id", |req: Request| async move {
//!         let id = req.params.get("id").unwrap_or("unknown").to_string();
//!         Response::text(id)
//!     })
//!     .unwrap();
//! let router = builder.build();
//!
//! let matched = router.match_handler_filters("/user/42");
//! assert!(matched.handler.is_some());
//! assert_eq!(matched.vars.get("id"), Some("42"));
//! ```
//!
//! ## Dispatch
//!
//! [`Router::handle`] runs filters and the handler for a request:
//!
//! ```ignore
//! let response = router.handle(Request::get("/user/42")).await;
//! assert_eq!(response.body_string().unwrap(), "42");
//! ```
//!
//! ## Lifecycle
//!
//! [`Router::init`] visits every registered component once and stops at
//! the first `ControlFlow::Break`. [`Router::destroy`] calls each
//! component's `destroy` exactly once.

mod component;
mod dispatch;
mod error;
mod indexer;
mod matcher;
mod pattern;
mod processor;
mod request;
mod response;
mod router;
mod tree;

pub use component::{
    handle_func, BoxFuture, Component, ComponentMut, Filter, FilterResult, HandleFunc, Handler,
    MethodHandler, TaskHandler, WebSocketHandler,
};
pub use error::{Result, RouterError, SlotKind};
pub use indexer::{VarIndexer, DEFAULT_POOL_CAPACITY};
pub use pattern::{CompiledPattern, VarMap, CATCH_ALL_MARKER, WILDCARD_MARKER};
pub use request::{Method, PathParams, Request, UnknownMethod};
pub use response::Response;
pub use router::{Group, HandlerMatch, Router, RouterBuilder, Routes};
