//! Access pattern loading and generation
//!
//! A trace is a JSON-lines file with one access record per line.

use anyhow::{Context, Result};
use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tiersim_common::{ObjectId, Operation};
use tracing::{info, warn};

/// Size assumed for records that omit one (KB)
pub const DEFAULT_OBJECT_SIZE_KB: u64 = 100;

const fn default_size() -> u64 {
    DEFAULT_OBJECT_SIZE_KB
}

/// One operation of an access pattern
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRecord {
    pub file_id: ObjectId,
    #[serde(default = "default_size")]
    pub size: u64,
    pub operation_type: Operation,
    /// Wall time of the request (ms), informational only
    #[serde(default)]
    pub time: u64,
    /// Logical timestamp used for temperature decay
    #[serde(default)]
    pub operation_num: u64,
}

/// Load a trace, skipping malformed lines
///
/// A missing file yields an empty pattern.
pub fn load(path: &Path) -> Result<Vec<AccessRecord>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "access pattern not found, replaying nothing");
            return Ok(Vec::new());
        }
        Err(e) => {
            return Err(e).with_context(|| format!("failed to open {}", path.display()));
        }
    };

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (lineno, bytes) in BufReader::new(file).split(b'\n').enumerate() {
        let bytes = bytes.with_context(|| format!("failed to read {}", path.display()))?;
        let line = match std::str::from_utf8(&bytes) {
            Ok(line) => line,
            Err(e) => {
                skipped += 1;
                warn!(line = lineno + 1, error = %e, "skipping non-UTF-8 access record");
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<AccessRecord>(line) {
            Ok(record) => records.push(record),
            Err(e) => {
                skipped += 1;
                warn!(line = lineno + 1, error = %e, "skipping malformed access record");
            }
        }
    }

    info!(path = %path.display(), records = records.len(), skipped, "access pattern loaded");
    Ok(records)
}

/// Build a synthetic pattern
///
/// Every file is written once up front, then gets between one and
/// `max_followups` reads or deletes in shuffled order.
pub fn generate(
    files: usize,
    max_followups: usize,
    size_range: (u64, u64),
    rng: &mut impl Rng,
) -> Vec<AccessRecord> {
    let (min_size, max_size) = if size_range.0 <= size_range.1 {
        size_range
    } else {
        (size_range.1, size_range.0)
    };

    let mut writes = Vec::with_capacity(files);
    let mut followups = Vec::new();
    for i in 1..=files {
        let file_id = ObjectId::new(i.to_string());
        writes.push((file_id.clone(), Operation::Write, rng.gen_range(min_size..=max_size)));
        for _ in 0..rng.gen_range(1..=max_followups.max(1)) {
            let op = if rng.gen_bool(0.5) {
                Operation::Read
            } else {
                Operation::Delete
            };
            followups.push((file_id.clone(), op, 0));
        }
    }
    followups.shuffle(rng);

    writes
        .into_iter()
        .chain(followups)
        .enumerate()
        .map(|(n, (file_id, operation_type, size))| AccessRecord {
            file_id,
            size: if size == 0 { DEFAULT_OBJECT_SIZE_KB } else { size },
            operation_type,
            time: 0,
            operation_num: n as u64,
        })
        .collect()
}

/// Write a pattern as JSON lines
pub fn save(path: &Path, records: &[AccessRecord]) -> Result<()> {
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut out = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut out, record)?;
        out.write_all(b"\n")?;
    }
    out.flush()?;
    Ok(())
}
