use clap::Parser;
use tracing_subscriber::EnvFilter;

use dynpages::{catalog, Dispatcher, Outcome, ServerConfig};

/// Render a dynamic page (or list the route catalog) from the command line.
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Directory served as the confined root.
    #[arg(long, default_value = ".")]
    root: std::path::PathBuf,
    /// URL path to dispatch, e.g. `/docs/intro`. Empty serves the home page.
    #[arg(default_value = "/")]
    url: String,
    /// Server display name exposed to pages.
    #[arg(long)]
    server_name: Option<String>,
    /// Print the discovered routes instead of dispatching.
    #[arg(long)]
    routes: bool,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let mut config = ServerConfig::default();
    if let Some(name) = args.server_name {
        config.server_name = name;
    }

    if args.routes {
        for (name, path) in catalog::discover_routes(&args.root, &config) {
            println!("{name}\t{}", path.display());
        }
        return;
    }

    match Dispatcher::new(&args.root, config).dispatch(&args.url).await {
        Outcome::Page(text) => println!("{text}"),
        Outcome::Listing(html) => println!("{html}"),
        Outcome::File(path) => println!("[static file] {}", path.display()),
        Outcome::NotFound(msg) => {
            eprintln!("404: {msg}");
            std::process::exit(1);
        }
        Outcome::Denied(msg) => {
            eprintln!("403: {msg}");
            std::process::exit(1);
        }
        Outcome::ServerError(msg) => {
            eprintln!("500: {msg}");
            std::process::exit(2);
        }
    }
}
