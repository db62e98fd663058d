use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use fanout_codec::Payload;
use fanout_proxy::ProxyReport;
use serde::Serialize;
use serde_json::Value;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

#[derive(Serialize)]
struct PayloadOutput<'a> {
    seq: u64,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    value: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dtype: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    shape: Option<&'a [usize]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    bytes: Option<usize>,
}

impl<'a> PayloadOutput<'a> {
    fn new(seq: u64, payload: &'a Payload<Value>) -> Self {
        let mut out = Self {
            seq,
            kind: payload_kind(payload),
            value: None,
            dtype: None,
            shape: None,
            bytes: None,
        };
        match payload {
            Payload::Object(value) => out.value = Some(value),
            Payload::Array(array) => {
                out.dtype = Some(array.dtype().as_str());
                out.shape = Some(array.shape());
                out.bytes = Some(array.as_bytes().len());
            }
            Payload::Terminate => {}
        }
        out
    }

    fn detail(&self) -> String {
        match (self.value, self.dtype, self.shape) {
            (Some(value), _, _) => value.to_string(),
            (_, Some(dtype), Some(shape)) => {
                format!("{dtype} {shape:?} ({} bytes)", self.bytes.unwrap_or(0))
            }
            _ => String::new(),
        }
    }
}

fn payload_kind(payload: &Payload<Value>) -> &'static str {
    match payload {
        Payload::Terminate => "terminate",
        Payload::Object(_) => "object",
        Payload::Array(_) => "array",
    }
}

pub fn print_payload(seq: u64, payload: &Payload<Value>, format: OutputFormat) {
    let out = PayloadOutput::new(seq, payload);
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["SEQ", "KIND", "DETAIL"])
                .add_row(vec![out.seq.to_string(), out.kind.to_string(), out.detail()]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!("#{} {} {}", out.seq, out.kind, out.detail());
        }
    }
}

#[derive(Serialize)]
struct ReportOutput {
    workers: usize,
    forwarded: u64,
    sentinels_sent: usize,
}

pub fn print_report(workers: usize, report: &ProxyReport, format: OutputFormat) {
    let out = ReportOutput {
        workers,
        forwarded: report.forwarded,
        sentinels_sent: report.sentinels_sent,
    };
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["WORKERS", "FORWARDED", "SENTINELS"])
                .add_row(vec![
                    out.workers.to_string(),
                    out.forwarded.to_string(),
                    out.sentinels_sent.to_string(),
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "workers={} forwarded={} sentinels={}",
                out.workers, out.forwarded, out.sentinels_sent
            );
        }
    }
}
