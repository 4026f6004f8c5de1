//! # ctxstack CLI Entry Point
//!
//! Main binary for the ctxstack context services. Provides a command-line
//! interface for starting the context server and the relay, and for making
//! single calls.
//!
//! ## Usage
//!
//! ```bash
//! # Start a context server
//! ctxstack server -b 0.0.0.0:8000
//!
//! # Start a relay in front of it
//! ctxstack relay -b 0.0.0.0:8080 -u http://127.0.0.1:8000
//!
//! # Push a context (outputs raw JSON)
//! ctxstack call http://127.0.0.1:8000 push_context -a '{"key": "s1", "context": {"a": 1}}'
//! ```
//!
//! ## URL Format
//!
//! All URLs must include the `http://` or `https://` prefix:
//! - ✅ `http://127.0.0.1:8000`
//! - ✅ `https://ctx.example.com`
//! - ❌ `127.0.0.1:8000`

use std::sync::Arc;

use anyhow::Result;
use argh::FromArgs;
use ctxstack_cli::config::{self, process_env, validate_http_url, RelayOptions};
use tokio::net::TcpListener;

/// Main CLI structure parsed from command-line arguments.
#[derive(FromArgs)]
/// ctxstack - per-key context stacks over HTTP
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

/// Available CLI subcommands.
///
/// - **Server**: Start the context server
/// - **Relay**: Start a relay in front of a context server
/// - **Call**: Make a single call (unix-friendly JSON output)
#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Server(ServerArgs),
    Relay(RelayArgs),
    Call(CallArgs),
}

/// Arguments for starting the context server.
///
/// # Example
///
/// ```bash
/// ctxstack server -b 0.0.0.0:8000 --max-entry-bytes 65536
/// ```
#[derive(FromArgs)]
#[argh(subcommand, name = "server")]
/// start the context server
struct ServerArgs {
    /// address to bind the server to
    ///
    /// Defaults to 0.0.0.0:$PORT when PORT is set, otherwise 0.0.0.0:8000.
    #[argh(option, short = 'b')]
    bind: Option<String>,

    /// longest accepted context key in bytes
    #[argh(option, long = "max-key-bytes", default = "256")]
    max_key_bytes: usize,

    /// largest accepted context entry in bytes, measured as serialized JSON
    ///
    /// Defaults to 1048576 (1 MiB).
    #[argh(option, long = "max-entry-bytes", default = "1048576")]
    max_entry_bytes: usize,

    /// largest accepted request body in bytes
    ///
    /// Defaults to 2097152 (2 MiB). Never enforced below what a maximal
    /// entry needs.
    #[argh(option, long = "max-body-bytes", default = "2097152")]
    max_body_bytes: usize,
}

/// Arguments for starting a relay.
///
/// The relay forwards `POST /proxy/{function}` to `{upstream}/mcp/{function}`
/// without the caller's `Authorization` header, optionally authenticating to
/// the upstream with HTTP Basic credentials.
///
/// # Example
///
/// ```bash
/// ctxstack relay -u https://ctx.example.com \
///   --upstream-user relay --upstream-password secret \
///   --public-url https://relay.example.com
/// ```
#[derive(FromArgs)]
#[argh(subcommand, name = "relay")]
/// start a relay in front of a context server
struct RelayArgs {
    /// address to bind the relay to
    ///
    /// Defaults to 0.0.0.0:$PORT when PORT is set, otherwise 0.0.0.0:8080.
    #[argh(option, short = 'b')]
    bind: Option<String>,

    /// base URL of the upstream context server
    ///
    /// Falls back to UPSTREAM_URL, then http://127.0.0.1:8000.
    /// Must include the http:// or https:// prefix.
    #[argh(option, short = 'u')]
    upstream: Option<String>,

    /// username for HTTP Basic auth to the upstream (env: UPSTREAM_USER)
    #[argh(option, long = "upstream-user")]
    upstream_user: Option<String>,

    /// password for HTTP Basic auth to the upstream (env: UPSTREAM_PASSWORD)
    #[argh(option, long = "upstream-password")]
    upstream_password: Option<String>,

    /// name shown in the documentation (env: SERVICE_NAME, default: ctxstack)
    #[argh(option, long = "service-name")]
    service_name: Option<String>,

    /// URL the relay is reachable at, used in the landing page examples
    ///
    /// Falls back to CTXSTACK_PUBLIC_URL, then http://{bind}.
    #[argh(option, long = "public-url")]
    public_url: Option<String>,

    /// upstream request timeout in milliseconds
    #[argh(option, long = "timeout-ms", default = "30000")]
    timeout_ms: u64,

    /// retries for upstream connection failures
    #[argh(option, long = "max-retries", default = "2")]
    max_retries: usize,

    /// largest accepted request body in bytes
    #[argh(option, long = "max-body-bytes", default = "2097152")]
    max_body_bytes: usize,
}

/// Arguments for making a single call.
///
/// Outputs the result as raw JSON (no pretty-printing) to stdout. Errors are
/// reported to stderr with a non-zero exit code.
///
/// # Examples
///
/// ```bash
/// # List keys
/// ctxstack call http://127.0.0.1:8000 list_contexts
///
/// # Pop through a relay
/// ctxstack call --relay http://127.0.0.1:8080 pop_context -a '{"key": "s1"}'
///
/// # Pipe output to jq
/// ctxstack call http://127.0.0.1:8000 get_context -a '{"key": "s1"}' | jq '.[0]'
/// ```
#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
/// call a context function
struct CallArgs {
    /// address of the context server (or relay, with --relay)
    ///
    /// Must include the http:// or https:// prefix.
    #[argh(positional)]
    server_address: String,

    /// name of the function to call (e.g. push_context)
    #[argh(positional)]
    function: String,

    /// JSON object with the function's parameters
    ///
    /// Defaults to `{}`.
    #[argh(option, short = 'a', long = "args", default = "\"{}\".into()")]
    args: String,

    /// the address is a relay (calls go to /proxy/ instead of /mcp/)
    #[argh(switch)]
    relay: bool,

    /// request timeout in milliseconds
    #[argh(option, long = "timeout-ms", default = "30000")]
    timeout_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // call: keep stdout clean for piping to jq and friends
    if !matches!(cli.command, Commands::Call(_)) {
        let env_filter = tracing_subscriber::EnvFilter::try_new(config::log_directive(&process_env))
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command {
        Commands::Server(args) => run_server(args).await,
        Commands::Relay(args) => run_relay(args).await,
        Commands::Call(args) => run_call(args).await,
    }
}

async fn run_server(args: ServerArgs) -> Result<()> {
    let addr = config::resolve_bind(args.bind.as_deref(), &process_env, config::DEFAULT_SERVER_PORT)?;

    let limits = ctxstack_server::ResourceLimits::new()
        .with_max_key_bytes(args.max_key_bytes)
        .with_max_entry_bytes(args.max_entry_bytes)
        .with_max_body_bytes(args.max_body_bytes);
    tracing::info!(
        "Starting context server (max entry {} bytes, max body {} bytes)",
        limits.max_entry_bytes,
        limits.effective_body_limit()
    );

    let store = Arc::new(ctxstack_server::ContextStore::with_limits(limits));
    let server = ctxstack_server::HttpServer::new(store);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;
    server.serve(listener, shutdown_signal()).await?;
    Ok(())
}

async fn run_relay(args: RelayArgs) -> Result<()> {
    let opts = RelayOptions {
        bind: args.bind,
        upstream: args.upstream,
        upstream_user: args.upstream_user,
        upstream_password: args.upstream_password,
        service_name: args.service_name,
        public_url: args.public_url,
        timeout_ms: args.timeout_ms,
        max_retries: args.max_retries,
        max_body_bytes: args.max_body_bytes,
    };
    let (addr, relay_config) = config::relay_settings(opts, &process_env)?;

    tracing::info!("Starting relay for upstream {}", relay_config.upstream_url);
    if relay_config.credentials.is_some() {
        tracing::info!("Upstream Basic authentication enabled");
    }

    let server = ctxstack_relay::HttpServer::new(relay_config)?;
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;
    server.serve(listener, shutdown_signal()).await?;
    Ok(())
}

/// Executes the `call` subcommand.
///
/// # Errors
///
/// Returns an error if:
/// - The address is not an http(s) URL
/// - The args string is not valid JSON
/// - The call fails (transport error or an error answer)
async fn run_call(args: CallArgs) -> Result<()> {
    validate_http_url(&args.server_address, "server address")?;

    let params: serde_json::Value = serde_json::from_str(&args.args)
        .map_err(|e| anyhow::anyhow!("Invalid JSON in args: {}", e))?;

    let client = if args.relay {
        ctxstack_client::ContextClient::via_relay(&args.server_address)?
    } else {
        ctxstack_client::ContextClient::new(&args.server_address)?
    }
    .with_timeout_ms(args.timeout_ms)?;

    let result = client.call(&args.function, params).await?;

    // Output raw JSON to stdout
    println!("{}", serde_json::to_string(&result)?);

    Ok(())
}

/// Resolves on Ctrl-C.
async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
