use std::fs;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fanout_channel::{SendPayloadExt, UdsChannel, UdsProducer};
use fanout_proxy::{FanOutProxy, ProxyConfig};
use tracing::{info, warn};

use crate::cmd::ProxyArgs;
use crate::exit::{io_error, proxy_error, CliError, CliResult, CONFIG_INVALID, INTERNAL, SUCCESS};
use crate::output::{print_report, OutputFormat};

pub fn run(args: ProxyArgs, format: OutputFormat) -> CliResult<i32> {
    let config = resolve_config(&args)?;
    config
        .validate()
        .map_err(|err| proxy_error("invalid config", err))?;

    let workers = config.workers;
    let inbound = config.inbound.clone();
    let channel = UdsChannel::new().with_min_consumers(workers);
    let proxy = FanOutProxy::bind(&channel, config).map_err(|err| proxy_error("bind failed", err))?;
    info!(workers, "waiting for workers; send the sentinel or press Ctrl-C to stop");

    install_ctrlc_handler(inbound)?;

    let handle = proxy
        .spawn()
        .map_err(|err| io_error("failed to start proxy thread", err))?;
    let report = handle
        .join()
        .map_err(|_| CliError::new(INTERNAL, "proxy thread panicked"))?
        .map_err(|err| proxy_error("proxy failed", err))?;

    print_report(workers, &report, format);
    Ok(SUCCESS)
}

/// Start from the config file (or defaults) and apply flag/env overrides.
fn resolve_config(args: &ProxyArgs) -> CliResult<ProxyConfig> {
    let mut config = match &args.config {
        Some(path) => {
            let text = fs::read_to_string(path).map_err(|err| {
                io_error(&format!("failed reading {}", path.display()), err)
            })?;
            serde_json::from_str::<ProxyConfig>(&text).map_err(|err| {
                CliError::new(
                    CONFIG_INVALID,
                    format!("invalid config {}: {err}", path.display()),
                )
            })?
        }
        None => ProxyConfig::default(),
    };

    if let Some(workers) = args.workers {
        config.workers = workers;
    }
    if let Some(inbound) = &args.inbound {
        config.inbound = inbound.clone();
    }
    if let Some(outbound) = &args.outbound {
        config.outbound = outbound.clone();
    }
    Ok(config)
}

/// Ctrl-C injects the sentinel into our own inbound socket, so shutdown goes
/// through the normal drain.
fn install_ctrlc_handler(inbound: String) -> CliResult<()> {
    let fired = Arc::new(AtomicBool::new(false));
    ctrlc::set_handler(move || {
        if fired.swap(true, Ordering::SeqCst) {
            return;
        }
        info!("interrupt received; sending sentinel");
        let sent = UdsProducer::connect(&inbound).and_then(|mut producer| producer.send_sentinel());
        if let Err(err) = sent {
            warn!(error = %err, "failed to inject sentinel");
        }
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    fn args() -> ProxyArgs {
        ProxyArgs {
            workers: None,
            inbound: None,
            outbound: None,
            config: None,
        }
    }

    #[test]
    fn defaults_without_flags() {
        assert_eq!(resolve_config(&args()).unwrap(), ProxyConfig::default());
    }

    #[test]
    fn flags_override_config_file() {
        let path = std::env::temp_dir().join(format!("fanout-config-{}.json", std::process::id()));
        fs::write(&path, r#"{"workers": 2, "inbound": "/tmp/a.sock", "outbound": "/tmp/b.sock"}"#)
            .unwrap();

        let config = resolve_config(&ProxyArgs {
            workers: Some(5),
            config: Some(path.clone()),
            ..args()
        })
        .unwrap();
        assert_eq!(config.workers, 5);
        assert_eq!(config.inbound, "/tmp/a.sock");
        assert_eq!(config.outbound, "/tmp/b.sock");

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn malformed_config_file_is_config_error() {
        let path = std::env::temp_dir().join(format!("fanout-bad-{}.json", std::process::id()));
        fs::write(&path, "{workers: 2").unwrap();

        let err = resolve_config(&ProxyArgs {
            config: Some(path.clone()),
            ..args()
        })
        .unwrap_err();
        assert_eq!(err.code, CONFIG_INVALID);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_config_file_is_reported() {
        let err = resolve_config(&ProxyArgs {
            config: Some(PathBuf::from("/nonexistent-fanout/config.json")),
            ..args()
        })
        .unwrap_err();
        assert!(err.message.contains("failed reading"));
    }
}
