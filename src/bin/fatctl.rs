//! fatctl - manual driver for the FatStd HTTP test double
//!
//! Starts a capturing server and prints every request it receives, or shows
//! the configuration the exports would load from the current directory.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fatstd::config::FatConfig;
use fatstd::{logging, HttpServer, Status};

#[derive(Parser)]
#[command(name = "fatctl")]
#[command(version)]
#[command(about = "Drive the FatStd handle library from the command line", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP test server and print captured requests
    Serve {
        /// Address to bind (port 0 picks a free port)
        #[arg(long, default_value = "127.0.0.1:0")]
        addr: String,

        /// Poll timeout per request in milliseconds (negative waits forever)
        #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
        timeout_ms: i64,

        /// Stop after this many requests
        #[arg(long)]
        count: Option<usize>,

        /// Status code of the static response
        #[arg(long, default_value_t = 200)]
        status: u16,

        /// Body of the static response
        #[arg(long, default_value = "")]
        body: String,

        /// Content type of the static response
        #[arg(long, default_value = "")]
        content_type: String,
    },

    /// Print the effective configuration as TOML
    Config,

    /// Print the library version
    Version,
}

fn main() -> Result<()> {
    logging::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            addr,
            timeout_ms,
            count,
            status,
            body,
            content_type,
        } => cmd_serve(&addr, timeout_ms, count, status, &body, &content_type),
        Commands::Config => cmd_config(),
        Commands::Version => {
            println!("fatstd {}", fatstd::VERSION);
            Ok(())
        }
    }
}

fn cmd_serve(
    addr: &str,
    timeout_ms: i64,
    count: Option<usize>,
    status: u16,
    body: &str,
    content_type: &str,
) -> Result<()> {
    let server = HttpServer::bind(addr).with_context(|| format!("failed to bind {}", addr))?;
    server.set_static_response(status, body.as_bytes(), content_type);
    println!("listening on http://{}", server.addr());

    let mut seen = 0usize;
    while count.map_or(true, |limit| seen < limit) {
        match server.next_request(timeout_ms) {
            Ok(req) => {
                seen += 1;
                println!("{} {}", req.method, req.path);
                for (name, value) in req.headers.iter() {
                    println!("  {}: {}", name, value);
                }
                if !req.body.is_empty() {
                    println!("  ({} body bytes)", req.body.len());
                    println!("{}", String::from_utf8_lossy(&req.body));
                }
            }
            Err(e) if e.status == Status::Eof => {
                println!("no request within {} ms", timeout_ms);
                break;
            }
            Err(e) => return Err(e).context("polling for requests"),
        }
    }

    let dropped = server.dropped_requests();
    if dropped > 0 {
        println!("{} requests dropped at capacity", dropped);
    }
    server.close().context("closing server")?;
    Ok(())
}

fn cmd_config() -> Result<()> {
    let config = FatConfig::load_from_env().context("loading fatstd.toml")?;
    let text = toml::to_string_pretty(&config).context("serializing config")?;
    print!("{}", text);
    Ok(())
}
