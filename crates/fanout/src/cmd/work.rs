use fanout_channel::{ChannelError, InboundEndpoint, RecvPayloadExt, UdsWorker};
use fanout_codec::Payload;
use serde_json::Value;
use tracing::{debug, info};

use crate::cmd::WorkArgs;
use crate::exit::{channel_error, CliError, CliResult, FAILURE, SUCCESS};
use crate::output::{print_payload, OutputFormat};

pub fn run(args: WorkArgs, format: OutputFormat) -> CliResult<i32> {
    let mut worker =
        UdsWorker::connect(&args.path).map_err(|err| channel_error("connect failed", err))?;
    info!(path = %args.path.display(), "worker connected");

    let mut seq = 0u64;
    loop {
        let payload = match worker.recv_payload::<Value>() {
            Ok(payload) => payload,
            Err(ChannelError::Closed) => {
                return Err(CliError::new(
                    FAILURE,
                    "proxy closed the connection before the sentinel",
                ))
            }
            Err(err) => return Err(channel_error("receive failed", err)),
        };
        seq += 1;
        print_payload(seq, &payload, format);

        if let Payload::Terminate = payload {
            debug!(received = seq - 1, "sentinel received");
            break;
        }
        if args.count.is_some_and(|count| seq >= count) {
            debug!(received = seq, "count reached");
            break;
        }
    }

    worker
        .close()
        .map_err(|err| channel_error("close failed", err))?;
    Ok(SUCCESS)
}
