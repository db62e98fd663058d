//! In-process pipeline: one producer, a proxy and three workers.
//!
//! Run with:
//!   cargo run --example pipeline

use std::thread;

use fanout::channel::{MemoryChannel, RecvPayloadExt, SendPayloadExt};
use fanout::{FanOutProxy, NdArray, Payload, ProxyConfig};
use serde_json::{json, Value};

const WORKERS: usize = 3;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let channel = MemoryChannel::new().with_min_consumers(WORKERS);
    let config = ProxyConfig {
        workers: WORKERS,
        inbound: "jobs".to_string(),
        outbound: "workers".to_string(),
    };
    let proxy = FanOutProxy::bind(&channel, config)?;

    let mut workers = Vec::with_capacity(WORKERS);
    for id in 0..WORKERS {
        let mut endpoint = channel.connect_worker("workers")?;
        workers.push(thread::spawn(move || loop {
            match endpoint.recv_payload::<Value>() {
                Ok(Payload::Terminate) => {
                    eprintln!("worker {id}: terminating");
                    break;
                }
                Ok(Payload::Object(value)) => eprintln!("worker {id}: object {value}"),
                Ok(Payload::Array(array)) => {
                    eprintln!("worker {id}: {} array {:?}", array.dtype(), array.shape())
                }
                Err(e) => {
                    eprintln!("worker {id}: {e}");
                    break;
                }
            }
        }));
    }

    let proxy = proxy.spawn()?;

    let mut producer = channel.connect_producer("jobs")?;
    producer.send_object(&json!({"x": 1}))?;
    producer.send_object(&json!([1, 2, 3]))?;
    producer.send_array(&NdArray::from_slice(&[0.5f64; 6], vec![2, 3])?)?;
    producer.send_sentinel()?;

    let report = proxy.join().map_err(|_| "proxy thread panicked")??;
    for worker in workers {
        let _ = worker.join();
    }
    eprintln!(
        "forwarded {} messages, sent {} sentinels",
        report.forwarded, report.sentinels_sent
    );
    Ok(())
}
