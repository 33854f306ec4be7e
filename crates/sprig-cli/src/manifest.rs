//! JSON route manifests.
//!
//! A manifest lists routes and the kind of component each one registers.
//! Components are stand-ins identified by their name: handlers answer with
//! their name, filters append theirs to the `X-Sprig-Filters` request
//! header, websocket and task handlers log what they receive.

use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::info;

use sprig_router::{
    BoxFuture, Filter, FilterResult, Method, Request, Response, RouterBuilder, RouterError,
    Routes, TaskHandler, WebSocketHandler,
};

/// Request header filled in by manifest filters.
pub const FILTERS_HEADER: &str = "X-Sprig-Filters";

/// Kind of component a route registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RouteKind {
    Handler,
    Filter,
    WebSocket,
    Task,
}

/// One route of a manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteEntry {
    pub kind: RouteKind,
    pub pattern: String,
    pub name: String,
    /// Methods served by a handler; ignored for other kinds.
    #[serde(default = "default_methods")]
    pub methods: Vec<Method>,
}

fn default_methods() -> Vec<Method> {
    vec![Method::Get]
}

/// A route the router refused.
#[derive(Debug)]
pub struct Rejected {
    pub index: usize,
    pub pattern: String,
    pub error: RouterError,
}

/// A parsed route manifest.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    pub routes: Vec<RouteEntry>,
}

impl Manifest {
    /// Reads a manifest from a JSON file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest {}", path.display()))?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed to parse manifest {}", path.display()))
    }

    /// Registers every route, returning the ones that were rejected.
    pub fn register(&self, builder: &mut RouterBuilder) -> Vec<Rejected> {
        let mut rejected = Vec::new();
        for (index, entry) in self.routes.iter().enumerate() {
            if let Err(error) = entry.register(builder) {
                rejected.push(Rejected {
                    index,
                    pattern: entry.pattern.clone(),
                    error,
                });
            }
        }
        rejected
    }
}

impl RouteEntry {
    fn register(&self, builder: &mut RouterBuilder) -> sprig_router::Result<()> {
        let name = self.name.clone();
        match self.kind {
            RouteKind::Handler => {
                for &method in &self.methods {
                    let name = name.clone();
                    builder.handle_func(&self.pattern, method, move |req: Request| {
                        let body = name.clone();
                        async move { echo(&req, body) }
                    })?;
                }
            }
            RouteKind::Filter => {
                builder.filter(&self.pattern, NamedFilter { name })?;
            }
            RouteKind::WebSocket => {
                builder.websocket(&self.pattern, NamedSocket { name })?;
            }
            RouteKind::Task => {
                builder.task(&self.pattern, NamedTask { name })?;
            }
        }
        Ok(())
    }
}

fn echo(req: &Request, name: String) -> Response {
    let res = Response::text(name);
    match req.get_header(FILTERS_HEADER) {
        Some(filters) => res.header(FILTERS_HEADER, filters),
        None => res,
    }
}

struct NamedFilter {
    name: String,
}

impl Filter for NamedFilter {
    fn before<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, FilterResult> {
        Box::pin(async move {
            let seen = match req.get_header(FILTERS_HEADER) {
                Some(prev) => format!("{prev},{}", self.name),
                None => self.name.clone(),
            };
            FilterResult::Continue(req.clone().header(FILTERS_HEADER, seen))
        })
    }
}

struct NamedSocket {
    name: String,
}

impl WebSocketHandler for NamedSocket {
    fn serve<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            info!(handler = %self.name, path = %req.path, "websocket");
        })
    }
}

struct NamedTask {
    name: String,
}

impl TaskHandler for NamedTask {
    fn run(&self, payload: serde_json::Value) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            info!(handler = %self.name, %payload, "task");
        })
    }
}
