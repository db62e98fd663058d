use fanout_channel::{OutboundEndpoint, SendPayloadExt, UdsProducer};
use fanout_codec::{encode_object, encode_object_with_level};
use serde_json::Value;
use tracing::debug;

use crate::cmd::SendArgs;
use crate::exit::{channel_error, CliError, CliResult, DATA_INVALID, SUCCESS, USAGE};

pub fn run(args: SendArgs) -> CliResult<i32> {
    let frame = match &args.json {
        Some(json) => Some(encode_json(json, args.level)?),
        None => None,
    };

    let mut producer =
        UdsProducer::connect(&args.path).map_err(|err| channel_error("connect failed", err))?;
    let sent = match frame {
        Some(frame) => {
            debug!(bytes = frame.len(), "sending object frame");
            producer.send(&frame)
        }
        None => {
            debug!("sending sentinel");
            producer.send_sentinel()
        }
    };
    sent.map_err(|err| channel_error("send failed", err))?;

    producer
        .close()
        .map_err(|err| channel_error("close failed", err))?;
    Ok(SUCCESS)
}

fn encode_json(json: &str, level: Option<u32>) -> CliResult<Vec<u8>> {
    let value: Value = serde_json::from_str(json)
        .map_err(|err| CliError::new(USAGE, format!("--json is not valid JSON: {err}")))?;
    let encoded = match level {
        Some(level) => encode_object_with_level(&value, level),
        None => encode_object(&value),
    };
    encoded.map_err(|err| CliError::new(DATA_INVALID, format!("encode failed: {err}")))
}
