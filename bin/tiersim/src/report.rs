//! Result artifacts
//!
//! Each run appends one line to `summary.jsonl` and one tier snapshot line
//! to `tiers.jsonl` in the output directory.

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tiersim_common::format_size;
use tiersim_storage::{RunSummary, TierReport};
use tracing::info;

pub const SUMMARY_FILE: &str = "summary.jsonl";
pub const TIERS_FILE: &str = "tiers.jsonl";

/// Tier snapshot line of one run
#[derive(Debug, Serialize)]
pub struct TierSnapshot<'a> {
    pub strategy: &'a str,
    pub tiers: &'a [TierReport],
}

/// Appends run artifacts under a directory
#[derive(Debug, Clone)]
pub struct ReportWriter {
    dir: PathBuf,
}

impl ReportWriter {
    /// Create the output directory if needed
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create output directory {}", dir.display()))?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn write_run(&self, summary: &RunSummary, tiers: &[TierReport]) -> Result<()> {
        append_line(&self.dir.join(SUMMARY_FILE), summary)?;
        append_line(
            &self.dir.join(TIERS_FILE),
            &TierSnapshot {
                strategy: &summary.strategy,
                tiers,
            },
        )
    }
}

fn append_line<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut line = serde_json::to_vec(value)?;
    line.push(b'\n');
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut f| f.write_all(&line))
        .with_context(|| format!("failed to append to {}", path.display()))
}

/// Log a run summary the way operators read it
pub fn log_summary(summary: &RunSummary, tiers: &[TierReport]) {
    info!(
        strategy = %summary.strategy,
        optimization = summary.optimization,
        esr = summary.estimated_system_response,
        total_cost = summary.total_cost,
        response_time_ms = summary.total_response_time_ms,
        unavailable = summary.node_unavailability,
        successful_writes = summary.successful_writes,
        unsuccessful_writes = summary.unsuccessful_writes,
        successful_reads = summary.successful_reads,
        unsuccessful_reads = summary.unsuccessful_reads,
        "run finished"
    );
    info!(
        total = %format_size(summary.total_capacity),
        available = %format_size(summary.available_capacity),
        "cluster capacity"
    );
    for tier in tiers {
        info!(
            tier = %tier.tier,
            used = %format_size(tier.used_capacity),
            available = %format_size(tier.available_capacity),
            total = %format_size(tier.total_capacity),
            data = %format_size(tier.total_data_size),
            objects = tier.objects.len(),
            "tier usage"
        );
    }
}
