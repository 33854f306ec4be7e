#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use sprig_router::{
    BoxFuture, Filter, FilterResult, HandleFunc, Handler, Request, Response, Router,
    RouterBuilder, TaskHandler, WebSocketHandler,
};

/// Shared event log written by the recording components.
pub type Log = Arc<Mutex<Vec<String>>>;

pub fn log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn recorded(log: &Log) -> Vec<String> {
    log.lock().unwrap().clone()
}

/// Handler that answers every method with its name.
pub struct NamedHandler {
    pub name: &'static str,
    pub log: Log,
    func: HandleFunc,
}

impl NamedHandler {
    pub fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: log.clone(),
            func: sprig_router::handle_func(move |_req| async move { Response::text(name) }),
        }
    }
}

impl Handler for NamedHandler {
    fn handle_func(&self, _method: sprig_router::Method) -> Option<&HandleFunc> {
        Some(&self.func)
    }

    fn destroy(&mut self) {
        self.log.lock().unwrap().push(format!("destroy {}", self.name));
    }
}

/// Filter recording its hooks; answers with 403 when `deny` is set.
pub struct RecordingFilter {
    pub name: &'static str,
    pub log: Log,
    pub deny: bool,
}

impl RecordingFilter {
    pub fn new(name: &'static str, log: &Log) -> Self {
        Self {
            name,
            log: log.clone(),
            deny: false,
        }
    }

    pub fn denying(name: &'static str, log: &Log) -> Self {
        Self {
            deny: true,
            ..Self::new(name, log)
        }
    }
}

impl Filter for RecordingFilter {
    fn before<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, FilterResult> {
        Box::pin(async move {
            self.log.lock().unwrap().push(format!("before {}", self.name));
            if self.deny {
                FilterResult::Response(Response::new(403))
            } else {
                FilterResult::Continue(req.clone())
            }
        })
    }

    fn after<'a>(&'a self, res: Response) -> BoxFuture<'a, Response> {
        Box::pin(async move {
            self.log.lock().unwrap().push(format!("after {}", self.name));
            res
        })
    }

    fn destroy(&mut self) {
        self.log.lock().unwrap().push(format!("destroy {}", self.name));
    }
}

pub struct RecordingSocket {
    pub name: &'static str,
    pub log: Log,
}

impl WebSocketHandler for RecordingSocket {
    fn serve<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, ()> {
        Box::pin(async move {
            self.log
                .lock()
                .unwrap()
                .push(format!("serve {} {}", self.name, req.path));
        })
    }

    fn destroy(&mut self) {
        self.log.lock().unwrap().push(format!("destroy {}", self.name));
    }
}

pub struct RecordingTask {
    pub name: &'static str,
    pub log: Log,
}

impl TaskHandler for RecordingTask {
    fn run(&self, payload: serde_json::Value) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.log
                .lock()
                .unwrap()
                .push(format!("run {} {payload}", self.name));
        })
    }

    fn destroy(&mut self) {
        self.log.lock().unwrap().push(format!("destroy {}", self.name));
    }
}

/// Builds a router with one named handler per pattern.
pub fn router_with(patterns: &[&'static str]) -> Router {
    use sprig_router::Routes;

    let log = log();
    let mut builder = RouterBuilder::new();
    for &pattern in patterns {
        builder
            .handler(pattern, NamedHandler::new(pattern, &log))
            .unwrap_or_else(|e| panic!("Failed to register {pattern}: {e}"));
    }
    builder.build()
}

/// Returns the name of the handler serving `path`, if any.
pub fn resolve(router: &Router, path: &str) -> Option<String> {
    let matched = router.match_handler_filters(path);
    matched.route.map(str::to_string)
}
