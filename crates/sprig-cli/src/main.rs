//! sprig CLI
//!
//! Command-line tool for checking route manifests and resolving paths
//! against them.

mod manifest;

use std::convert::Infallible;
use std::io;
use std::ops::ControlFlow;
use std::path::PathBuf;

use anyhow::bail;
use clap::{Parser, Subcommand};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

use sprig_router::{ComponentMut, Method, Request, Router, RouterBuilder};

use crate::manifest::{Manifest, FILTERS_HEADER};

/// Radix-tree route table inspector.
#[derive(Parser)]
#[command(name = "sprig")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Route manifest (JSON).
    #[arg(short, long, env = "SPRIG_MANIFEST", default_value = "routes.json")]
    manifest: PathBuf,

    /// Enable verbose output.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register every route and report the ones that are rejected.
    Check,

    /// Print the compressed route tree.
    Tree,

    /// Resolve a path against the route table.
    Resolve {
        /// Request path.
        path: String,

        /// Request method.
        #[arg(short, long, default_value = "GET")]
        method: Method,
    },
}

#[derive(Default)]
struct Census {
    handlers: usize,
    filters: usize,
    websockets: usize,
    tasks: usize,
}

impl Census {
    /// Counts the registered components by kind.
    fn take(router: &mut Router) -> Self {
        let mut census = Self::default();
        let flow = router.init(|component| {
            match component {
                ComponentMut::Handler(_) => census.handlers += 1,
                ComponentMut::Filter(_) => census.filters += 1,
                ComponentMut::WebSocket(_) => census.websockets += 1,
                ComponentMut::Task(_) => census.tasks += 1,
            }
            ControlFlow::<Infallible>::Continue(())
        });
        match flow {
            ControlFlow::Continue(()) => census,
            ControlFlow::Break(never) => match never {},
        }
    }
}

fn build(manifest: &Manifest) -> anyhow::Result<Router> {
    let mut builder = RouterBuilder::new();
    let rejected = manifest.register(&mut builder);
    if let Some(first) = rejected.into_iter().next() {
        bail!(
            "route #{} ({}) rejected: {}",
            first.index,
            first.pattern,
            first.error
        );
    }
    Ok(builder.build())
}

fn check(manifest: &Manifest) -> anyhow::Result<()> {
    let mut builder = RouterBuilder::new();
    let rejected = manifest.register(&mut builder);
    for r in &rejected {
        error!("route #{} ({}): {}", r.index, r.pattern, r.error);
    }
    if !rejected.is_empty() {
        bail!(
            "{} of {} routes rejected",
            rejected.len(),
            manifest.routes.len()
        );
    }

    let mut router = builder.build();
    let census = Census::take(&mut router);
    info!(
        "{} routes ok: {} handlers, {} filters, {} websocket handlers, {} task handlers",
        manifest.routes.len(),
        census.handlers,
        census.filters,
        census.websockets,
        census.tasks
    );
    router.destroy();
    Ok(())
}

async fn resolve(router: &Router, path: &str, method: Method) {
    let matched = router.match_handler_filters(path);
    match matched.route {
        Some(route) => {
            println!("handler:   {route}");
            for (name, value) in matched.vars.to_params().iter() {
                println!("  {name} = {value}");
            }
        }
        None => println!("handler:   none"),
    }
    println!("filters:   {}", matched.filters.len());
    drop(matched);

    let request = Request::new(method, path);
    let response = router.handle(request.clone()).await;
    println!(
        "response:  {} {}",
        response.status,
        response.body_string().unwrap_or_default()
    );
    if let Some(filters) = response.headers.get(FILTERS_HEADER) {
        println!("  via {filters}");
    }

    let (socket, vars) = router.match_websocket_handler(path);
    match socket {
        Some(socket) => {
            println!("websocket: yes ({} captures)", vars.len());
            socket.serve(&request).await;
        }
        None => println!("websocket: none"),
    }
    drop(vars);

    match router.match_task_handler(path) {
        Some(task) => {
            println!("task:      yes");
            task.run(serde_json::json!({ "path": path })).await;
        }
        None => println!("task:      none"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let log_level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let manifest = Manifest::load(&cli.manifest)?;

    match cli.command {
        Commands::Check => check(&manifest)?,

        Commands::Tree => {
            let router = build(&manifest)?;
            router.print_tree(&mut io::stdout().lock())?;
        }

        Commands::Resolve { path, method } => {
            let mut router = build(&manifest)?;
            resolve(&router, &path, method).await;
            router.destroy();
        }
    }

    Ok(())
}
