mod common;

use std::sync::Arc;
use std::thread;

use common::{
    log, resolve, router_with, NamedHandler, RecordingFilter, RecordingSocket, RecordingTask,
};
use sprig_router::{RouterBuilder, Routes};

// =============================================================================
// Handler lookup
// =============================================================================

#[test]
fn test_wildcard_binds_variable() {
    let router = router_with(&["/user/:id"]);
    let matched = router.match_handler_filters("/user/42");
    assert!(matched.handler.is_some());
    assert_eq!(matched.route, Some("/user/:id"));
    assert_eq!(matched.vars.get("id"), Some("42"));
}

#[test]
fn test_literal_branch_wins_over_wildcard() {
    let router = router_with(&["/user/:id", "/user/list"]);
    assert_eq!(resolve(&router, "/user/list").as_deref(), Some("/user/list"));
    assert_eq!(resolve(&router, "/user/7").as_deref(), Some("/user/:id"));
}

#[test]
fn test_unregistered_path_is_not_found() {
    let router = router_with(&["/user/:id"]);
    let matched = router.match_handler_filters("/nonexistent");
    assert!(matched.handler.is_none());
    assert!(matched.route.is_none());
    assert!(matched.vars.is_empty());
    assert!(matched.filters.is_empty());
}

#[test]
fn test_empty_router_finds_nothing() {
    let router = RouterBuilder::new().build();
    assert!(router.match_handler_filters("/").handler.is_none());
    assert!(router.match_handler_filters("/x").handler.is_none());
    assert!(router.match_task_handler("/x").is_none());
}

#[test]
fn test_catch_all_binds_rest_of_path() {
    let router = router_with(&["/files/*rest", "/files/meta"]);
    let matched = router.match_handler_filters("/files/a/b/c.txt");
    assert_eq!(matched.route, Some("/files/*rest"));
    assert_eq!(matched.vars.get("rest"), Some("a/b/c.txt"));
}

#[test]
fn test_every_registered_pattern_resolves_to_itself() {
    let patterns = [
        "/",
        "/api",
        "/api/users",
        "/api/users/:id",
        "/api/users/:id/posts/:post",
        "/api/items/*path",
        "/static/v:version/app.js",
        "/team",
        "/test",
    ];
    let router = router_with(&patterns);
    let cases = [
        ("/", "/", vec![]),
        ("/api", "/api", vec![]),
        ("/api/users", "/api/users", vec![]),
        ("/api/users/9", "/api/users/:id", vec![("id", "9")]),
        (
            "/api/users/9/posts/abc",
            "/api/users/:id/posts/:post",
            vec![("id", "9"), ("post", "abc")],
        ),
        ("/api/items/x/y", "/api/items/*path", vec![("path", "x/y")]),
        ("/static/v2/app.js", "/static/v:version/app.js", vec![("version", "2")]),
        ("/team", "/team", vec![]),
        ("/test", "/test", vec![]),
    ];
    for (path, route, vars) in cases {
        let matched = router.match_handler_filters(path);
        assert_eq!(matched.route, Some(route), "path {path}");
        for (name, value) in vars {
            assert_eq!(matched.vars.get(name), Some(value), "{name} in {path}");
        }
    }
}

#[test]
fn test_trailing_slash_is_ignored_in_patterns() {
    let router = router_with(&["/about/"]);
    assert!(router.match_handler_filters("/about").handler.is_some());
}

#[test]
fn test_unnamed_captures_are_positional() {
    let router = router_with(&["/:/:name"]);
    let matched = router.match_handler_filters("/en/docs");
    assert_eq!(matched.vars.get("name"), Some("docs"));
    assert_eq!(matched.vars.value(0), Some("en"));
    assert_eq!(matched.vars.values().collect::<Vec<_>>(), ["en", "docs"]);
    assert_eq!(matched.vars.to_params().len(), 1);
}

// =============================================================================
// Filters
// =============================================================================

#[test]
fn test_filters_accumulate_root_to_leaf() {
    let events = log();
    let mut builder = RouterBuilder::new();
    builder
        .filter("/api", RecordingFilter::new("api", &events))
        .unwrap()
        .filter("/api/users/:id", RecordingFilter::new("user", &events))
        .unwrap()
        .handler("/api/users/:id", NamedHandler::new("h", &events))
        .unwrap();
    let router = builder.build();

    let matched = router.match_handler_filters("/api/users/42");
    assert!(matched.handler.is_some());
    assert_eq!(matched.vars.get("id"), Some("42"));
    assert_eq!(matched.filters.len(), 2);
}

#[test]
fn test_root_filter_applies_to_nested_handler() {
    let events = log();
    let mut builder = RouterBuilder::new();
    builder
        .filter("/", RecordingFilter::new("root", &events))
        .unwrap()
        .handler("/a/b", NamedHandler::new("h", &events))
        .unwrap();
    let router = builder.build();

    let matched = router.match_handler_filters("/a/b");
    assert_eq!(matched.route, Some("/a/b"));
    assert_eq!(matched.filters.len(), 1);
}

#[test]
fn test_filters_off_the_path_are_skipped() {
    let events = log();
    let mut builder = RouterBuilder::new();
    builder
        .filter("/admin", RecordingFilter::new("admin", &events))
        .unwrap()
        .handler("/api/users", NamedHandler::new("h", &events))
        .unwrap();
    let router = builder.build();

    let matched = router.match_handler_filters("/api/users");
    assert!(matched.handler.is_some());
    assert!(matched.filters.is_empty());
}

#[test]
fn test_filters_returned_without_handler() {
    let events = log();
    let mut builder = RouterBuilder::new();
    builder
        .filter("/", RecordingFilter::new("root", &events))
        .unwrap();
    let router = builder.build();

    let matched = router.match_handler_filters("/");
    assert!(matched.handler.is_none());
    assert_eq!(matched.filters.len(), 1);
}

#[test]
fn test_root_filter_applies_to_unrouted_sibling() {
    let events = log();
    let mut builder = RouterBuilder::new();
    builder
        .filter("/", RecordingFilter::new("root", &events))
        .unwrap()
        .handler("/a", NamedHandler::new("a", &events))
        .unwrap();
    let router = builder.build();

    assert_eq!(router.match_handler_filters("/a").filters.len(), 1);
    let matched = router.match_handler_filters("/b");
    assert!(matched.handler.is_none());
    assert!(matched.vars.is_empty());
    assert_eq!(matched.filters.len(), 1);
}

#[test]
fn test_inner_filter_applies_when_path_runs_past_leaf() {
    let events = log();
    let mut builder = RouterBuilder::new();
    builder
        .filter("/api", RecordingFilter::new("api", &events))
        .unwrap()
        .filter("/api/users/:id", RecordingFilter::new("user", &events))
        .unwrap();
    let router = builder.build();

    let matched = router.match_handler_filters("/api/users/7/avatar");
    assert!(matched.handler.is_none());
    assert_eq!(matched.filters.len(), 2);
}

// =============================================================================
// Websocket and task handlers
// =============================================================================

#[test]
fn test_websocket_and_task_lookup() {
    let events = log();
    let mut builder = RouterBuilder::new();
    builder
        .websocket(
            "/ws/:room",
            RecordingSocket {
                name: "chat",
                log: events.clone(),
            },
        )
        .unwrap()
        .task(
            "/jobs/*kind",
            RecordingTask {
                name: "jobs",
                log: events.clone(),
            },
        )
        .unwrap()
        .filter("/ws", RecordingFilter::new("ws", &events))
        .unwrap();
    let router = builder.build();

    let (socket, vars) = router.match_websocket_handler("/ws/lobby");
    assert!(socket.is_some());
    assert_eq!(vars.get("room"), Some("lobby"));

    let (socket, vars) = router.match_websocket_handler("/jobs/x");
    assert!(socket.is_none());
    assert!(vars.get("room").is_none());

    assert!(router.match_task_handler("/jobs/mail/daily").is_some());
    assert!(router.match_task_handler("/ws/lobby").is_none());
    assert!(router.match_handler_filters("/ws/lobby").handler.is_none());
}

#[test]
fn test_slots_on_one_node_keep_their_own_variables() {
    let events = log();
    let mut builder = RouterBuilder::new();
    builder
        .handler("/r/:id", NamedHandler::new("h", &events))
        .unwrap()
        .websocket(
            "/r/:room",
            RecordingSocket {
                name: "ws",
                log: events.clone(),
            },
        )
        .unwrap();
    let router = builder.build();

    let matched = router.match_handler_filters("/r/5");
    assert_eq!(matched.vars.get("id"), Some("5"));
    assert_eq!(matched.vars.get("room"), None);

    let (_, vars) = router.match_websocket_handler("/r/5");
    assert_eq!(vars.get("room"), Some("5"));
    assert_eq!(vars.get("id"), None);
}

// =============================================================================
// Diagnostics and sharing
// =============================================================================

#[test]
fn test_print_tree() {
    let router = router_with(&["/", "/user/:id", "/user/list", "/files/*rest"]);
    let mut out = Vec::new();
    router.print_tree(&mut out).unwrap();
    assert_eq!(
        String::from_utf8(out).unwrap(),
        "/\n/-files/*\n/-user/\n/-user/-list\n/-user/-:\n"
    );
}

#[test]
fn test_concurrent_lookups() {
    let router = Arc::new(router_with(&["/user/:id", "/user/list", "/files/*rest"]));
    let workers: Vec<_> = (0..8)
        .map(|t| {
            let router = Arc::clone(&router);
            thread::spawn(move || {
                for i in 0..200 {
                    let path = format!("/user/{t}-{i}");
                    let matched = router.match_handler_filters(&path);
                    let expected = format!("{t}-{i}");
                    assert_eq!(matched.vars.get("id"), Some(expected.as_str()));
                    assert_eq!(
                        resolve(&router, "/user/list").as_deref(),
                        Some("/user/list")
                    );
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }
}
