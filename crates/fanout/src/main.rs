mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "fanout", version, about = "Fan-out proxy and worker tools")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", global = true)]
    format: Option<OutputFormat>,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    let format = cli.format.unwrap_or_else(OutputFormat::default_for_stdout);
    let result = cmd::run(cli.command, format);

    match result {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_proxy_subcommand() {
        let cli = Cli::try_parse_from([
            "fanout",
            "proxy",
            "--workers",
            "3",
            "--inbound",
            "/tmp/in.sock",
            "--outbound",
            "/tmp/out.sock",
        ])
        .expect("proxy args should parse");

        let Command::Proxy(args) = cli.command else {
            panic!("expected proxy command");
        };
        assert_eq!(args.workers, Some(3));
        assert_eq!(args.inbound.as_deref(), Some("/tmp/in.sock"));
    }

    #[test]
    fn send_requires_a_payload() {
        let err = Cli::try_parse_from(["fanout", "send", "/tmp/in.sock"])
            .expect_err("missing payload should fail");
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
    }

    #[test]
    fn rejects_conflicting_payload_args() {
        let err = Cli::try_parse_from([
            "fanout",
            "send",
            "/tmp/in.sock",
            "--json",
            "{\"x\":1}",
            "--terminate",
        ])
        .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_work_subcommand() {
        let cli = Cli::try_parse_from(["fanout", "work", "/tmp/out.sock", "--count", "2"])
            .expect("work args should parse");
        assert!(matches!(cli.command, Command::Work(_)));
    }
}
