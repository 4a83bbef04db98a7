//! # minirpc CLI Entry Point
//!
//! ## Usage
//!
//! ```bash
//! # Serve the demo methods
//! minirpc serve -b 127.0.0.1:8800
//!
//! # Make an RPC call (outputs raw JSON)
//! minirpc call 127.0.0.1:8800 add -a '[2, 3]'
//! minirpc call 127.0.0.1:8800 sum -a '[[1, 2, 3]]' -k '{"start": 10}'
//! ```

use std::future::Future;

use anyhow::Result;
use argh::FromArgs;
use minirpc_server::{
    RpcServer, ServerConfig, ShutdownHandle, DEFAULT_BIND, DEFAULT_MAX_MESSAGE_SIZE,
};
use tokio::task::JoinHandle;

/// Environment variable consulted for the bind address when `-b` is absent.
const BIND_ENV: &str = "MINIRPC_BIND";

#[derive(FromArgs)]
/// minirpc - minimal RPC over TCP
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeArgs),
    Call(CallArgs),
}

/// Arguments for running a server.
///
/// The server handles one connection at a time and stops on Ctrl-C once the
/// connection in progress (if any) is done.
#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// serve the demo methods
struct ServeArgs {
    /// address to bind to
    ///
    /// Falls back to the MINIRPC_BIND environment variable, then to
    /// localhost:8800.
    #[argh(option, short = 'b')]
    bind: Option<String>,

    /// largest request accepted, in bytes (0 for no limit)
    #[argh(option, long = "max-message-size", default = "DEFAULT_MAX_MESSAGE_SIZE")]
    max_message_size: usize,
}

/// Arguments for making a single RPC call.
///
/// Outputs the raw JSON result to stdout. Errors are reported to stderr with a
/// non-zero exit code.
#[derive(FromArgs)]
#[argh(subcommand, name = "call")]
/// call a method on a server
struct CallArgs {
    /// address of the server (host:port)
    #[argh(positional)]
    server_address: String,

    /// name of the method to call
    #[argh(positional)]
    method: String,

    /// positional arguments as a JSON array
    #[argh(option, short = 'a', long = "args", default = "\"[]\".into()")]
    args: String,

    /// keyword arguments as a JSON object
    #[argh(option, short = 'k', long = "kwargs", default = "\"{}\".into()")]
    kwargs: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli: Cli = argh::from_env();

    // `call` keeps stdout and stderr clean for piping into other tools.
    if !matches!(cli.command, Commands::Call(_)) {
        let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    match cli.command {
        Commands::Serve(args) => run_serve(args).await,
        Commands::Call(args) => run_call(args).await,
    }
}

fn server_config(args: &ServeArgs) -> ServerConfig {
    let bind = args
        .bind
        .clone()
        .or_else(|| std::env::var(BIND_ENV).ok())
        .unwrap_or_else(|| DEFAULT_BIND.to_string());

    let config = ServerConfig::new(bind);
    match args.max_message_size {
        0 => config.without_message_limit(),
        max => config.with_max_message_size(max),
    }
}

/// Executes the `serve` subcommand.
///
/// The accept loop is blocking, so it runs on the blocking pool while this
/// task waits for either the loop to end or Ctrl-C.
async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = server_config(&args);
    tracing::info!("Binding to: {}", config.bind);

    let mut server = RpcServer::with_dispatcher(config, minirpc_cli::demo::dispatcher())?;
    tracing::info!("Methods: {:?}", server.dispatcher().methods());

    let handle = server.shutdown_handle();
    let serving = tokio::task::spawn_blocking(move || server.run());

    serve_until(serving, handle, tokio::signal::ctrl_c()).await
}

/// Waits for the accept loop to end, shutting it down once `stop` resolves.
///
/// If `stop` fails (no signal handler could be installed) the server keeps
/// running until its loop ends on its own.
async fn serve_until(
    mut serving: JoinHandle<minirpc_common::Result<()>>,
    handle: ShutdownHandle,
    stop: impl Future<Output = std::io::Result<()>>,
) -> Result<()> {
    tokio::select! {
        result = &mut serving => {
            result??;
        }
        signal = stop => {
            match signal {
                Ok(()) => {
                    tracing::info!("Shutting down");
                    handle.shutdown();
                }
                Err(e) => tracing::warn!("Failed to listen for Ctrl-C: {}", e),
            }
            serving.await??;
        }
    }

    Ok(())
}

/// Executes the `call` subcommand.
///
/// # Errors
///
/// Returns an error if the arguments are not valid JSON of the right shape,
/// the server cannot be reached, or the call itself fails.
async fn run_call(args: CallArgs) -> Result<()> {
    let positional = minirpc_cli::parse_positional(&args.args)?;
    let keywords = minirpc_cli::parse_keywords(&args.kwargs)?;

    let client = minirpc_client::RpcClient::connect_to(args.server_address);
    let method = args.method;
    let result = tokio::task::spawn_blocking(move || client.call(&method, positional, keywords))
        .await??;

    println!("{}", serde_json::to_string(&result)?);

    Ok(())
}
