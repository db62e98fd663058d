use clap::{ArgGroup, Args, Subcommand};
use std::path::PathBuf;

use crate::exit::CliResult;
use crate::output::OutputFormat;

pub mod proxy;
pub mod send;
pub mod version;
pub mod work;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the fan-out proxy until the sentinel arrives.
    Proxy(ProxyArgs),
    /// Send one object frame or the sentinel to a proxy inbound socket.
    ///
    /// Each invocation opens its own producer connection. Messages from
    /// separate connections are not ordered relative to each other, so a
    /// sentinel sent right after data from another `send` may overtake it.
    Send(SendArgs),
    /// Connect as a worker and print payloads until the sentinel arrives.
    Work(WorkArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Proxy(args) => proxy::run(args, format),
        Command::Send(args) => send::run(args),
        Command::Work(args) => work::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct ProxyArgs {
    /// Number of downstream workers.
    #[arg(long, env = "FANOUT_WORKERS")]
    pub workers: Option<usize>,
    /// Inbound socket path (producers connect here).
    #[arg(long, env = "FANOUT_INBOUND")]
    pub inbound: Option<String>,
    /// Outbound socket path (workers connect here).
    #[arg(long, env = "FANOUT_OUTBOUND")]
    pub outbound: Option<String>,
    /// JSON config file; flags and environment override its values.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("payload").required(true).args(["json", "terminate"])))]
pub struct SendArgs {
    /// Inbound socket path to connect to.
    pub path: PathBuf,
    /// JSON value to send as an object frame.
    #[arg(long, conflicts_with = "terminate")]
    pub json: Option<String>,
    /// Send the termination sentinel.
    #[arg(long)]
    pub terminate: bool,
    /// zlib level for the object frame (0-9).
    #[arg(long, requires = "json", value_parser = clap::value_parser!(u32).range(0..=9))]
    pub level: Option<u32>,
}

#[derive(Args, Debug)]
pub struct WorkArgs {
    /// Outbound socket path to connect to.
    pub path: PathBuf,
    /// Exit after receiving N data payloads.
    #[arg(long)]
    pub count: Option<u64>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}
