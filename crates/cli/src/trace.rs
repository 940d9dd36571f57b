use alloy_primitives::{Address, Bytes, B256, U256};
use eyre::WrapErr as _;
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write as _};
use std::path::{Path, PathBuf};
use stf_transition::{ExecutionError, ExecutionOutcome, Tracer};
use stf_types::Message;
use tracing::warn;

#[derive(Debug, Serialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
enum TraceEvent<'a> {
    Start {
        tx_hash: B256,
        from: Address,
        #[serde(skip_serializing_if = "Option::is_none")]
        to: Option<Address>,
        nonce: u64,
        gas: u64,
        value: U256,
        input: &'a Bytes,
    },
    End {
        tx_hash: B256,
        #[serde(skip_serializing_if = "Option::is_none")]
        gas_used: Option<u64>,
        failed: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<&'a Bytes>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// Writes one JSON object per line into `trace-<index>-<hash>.jsonl`.
#[derive(Debug)]
pub struct JsonLinesTracer {
    path: PathBuf,
    out: BufWriter<File>,
}

impl JsonLinesTracer {
    pub fn file_name(index: u64, tx_hash: B256) -> String {
        format!("trace-{index}-{tx_hash}.jsonl")
    }

    pub fn create(dir: &Path, index: u64, tx_hash: B256) -> eyre::Result<Self> {
        let path = dir.join(Self::file_name(index, tx_hash));
        let file = File::create(&path)
            .wrap_err_with(|| format!("failed creating trace file {path:?}"))?;
        Ok(Self {
            path,
            out: BufWriter::new(file),
        })
    }

    fn emit(&mut self, event: &TraceEvent<'_>) {
        let written = serde_json::to_writer(&mut self.out, event)
            .map_err(std::io::Error::from)
            .and_then(|()| self.out.write_all(b"\n"))
            .and_then(|()| self.out.flush());
        if let Err(error) = written {
            warn!(path = ?self.path, %error, "Failed writing trace event");
        }
    }
}

impl Tracer for JsonLinesTracer {
    fn on_tx_start(&mut self, tx_hash: B256, msg: &Message) {
        self.emit(&TraceEvent::Start {
            tx_hash,
            from: msg.from,
            to: msg.to,
            nonce: msg.nonce,
            gas: msg.gas_limit,
            value: msg.value,
            input: &msg.input,
        });
    }

    fn on_tx_end(&mut self, tx_hash: B256, result: Result<&ExecutionOutcome, &ExecutionError>) {
        let event = match result {
            Ok(outcome) => TraceEvent::End {
                tx_hash,
                gas_used: Some(outcome.gas_used),
                failed: outcome.failed,
                output: Some(&outcome.return_data),
                error: None,
            },
            Err(error) => TraceEvent::End {
                tx_hash,
                gas_used: None,
                failed: true,
                output: None,
                error: Some(error.to_string()),
            },
        };
        self.emit(&event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_writes_one_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let hash = B256::with_last_byte(0xaa);
        let msg = Message {
            from: Address::with_last_byte(1),
            to: Some(Address::with_last_byte(2)),
            nonce: 0,
            value: U256::from(3_u64),
            gas_limit: 21_000,
            gas_price: 1,
            input: Bytes::new(),
        };

        let mut tracer = JsonLinesTracer::create(dir.path(), 0, hash).unwrap();
        tracer.on_tx_start(hash, &msg);
        tracer.on_tx_end(
            hash,
            Ok(&ExecutionOutcome {
                gas_used: 21_000,
                ..Default::default()
            }),
        );
        tracer.on_tx_end(hash, Err(&ExecutionError::GasUintOverflow));

        let path = dir.path().join(JsonLinesTracer::file_name(0, hash));
        assert!(path.ends_with(format!("trace-0-{hash}.jsonl")));
        let lines: Vec<serde_json::Value> = std::fs::read_to_string(path)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["event"], "start");
        assert_eq!(lines[0]["gas"], 21_000);
        assert_eq!(lines[0]["value"], "0x3");
        assert_eq!(lines[1]["event"], "end");
        assert_eq!(lines[1]["gasUsed"], 21_000);
        assert_eq!(lines[1]["failed"], false);
        assert_eq!(lines[2]["error"], "gas uint64 overflow");
        assert!(lines[2].get("gasUsed").is_none());
    }
}
