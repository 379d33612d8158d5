//! Trace replay against a fresh storage system per strategy

use crate::trace::AccessRecord;
use anyhow::Result;
use tiersim_common::{Config, Operation};
use tiersim_placement::{PlacementStrategy, StrategyKind, build_strategy};
use tiersim_storage::{RunSummary, StorageSystem, TierReport};
use tracing::{debug, info, warn};

/// Everything a finished run reports
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub tiers: Vec<TierReport>,
}

/// Replay `records` on a new cluster built from `config` using `kind`
pub fn run_strategy(
    config: &Config,
    kind: StrategyKind,
    records: &[AccessRecord],
) -> Result<RunOutcome> {
    let mut system = StorageSystem::from_config(config.clone())?;
    let mut strategy = build_strategy(kind, system.replication_factor(), config.cluster.seed);

    info!(strategy = %kind, operations = records.len(), "replaying access pattern");
    replay(&mut system, strategy.as_mut(), records);

    let metrics = system.metrics();
    Ok(RunOutcome {
        summary: metrics.summary(strategy.name()),
        tiers: metrics.tier_reports(),
    })
}

/// Feed every record to the system
///
/// Failed operations are logged and counted by the engine; none stops the
/// replay.
pub fn replay(
    system: &mut StorageSystem,
    strategy: &mut dyn PlacementStrategy,
    records: &[AccessRecord],
) {
    for record in records {
        let id = &record.file_id;
        let timestamp = record.operation_num;
        let result = match record.operation_type {
            Operation::Read => system.read(id, timestamp),
            Operation::Write => system
                .place(strategy, id, record.size, timestamp)
                .map(|(tier, elapsed)| {
                    debug!(%id, %tier, size_kb = record.size, "write placed");
                    elapsed
                }),
            Operation::Delete => system.delete(id, timestamp),
        };
        if let Err(err) = result {
            warn!(
                operation = %record.operation_type,
                %id,
                operation_num = timestamp,
                %err,
                "operation failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::generate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tiersim_common::{ObjectId, Tier};

    fn reliable_config(capacity_kb: u64) -> Config {
        let mut config = Config::default();
        config.cluster.seed = Some(7);
        for tier in Tier::ALL {
            let node = config.tier_mut(tier);
            node.availability = 1.0;
            node.failure_rate = 0.0;
            let medium = config.medium_mut(tier.medium_kind());
            medium.capacity_kb = capacity_kb;
            medium.availability = 1.0;
            medium.error_rate = 0.0;
        }
        config
    }

    fn record(id: &str, operation_type: Operation, size: u64, n: u64) -> AccessRecord {
        AccessRecord {
            file_id: ObjectId::from(id),
            size,
            operation_type,
            time: 0,
            operation_num: n,
        }
    }

    #[test]
    fn test_every_strategy_accounts_for_every_write() {
        let records = generate(30, 3, (10, 200), &mut StdRng::seed_from_u64(11));
        let writes = records
            .iter()
            .filter(|r| r.operation_type == Operation::Write)
            .count() as u64;

        for kind in StrategyKind::ALL {
            let outcome = run_strategy(&reliable_config(2000), kind, &records).unwrap();
            let summary = &outcome.summary;
            assert_eq!(summary.strategy, kind.as_str());
            assert_eq!(
                summary.successful_writes + summary.unsuccessful_writes,
                writes,
                "{kind}"
            );
            assert_eq!(outcome.tiers.len(), 3);
            assert!(summary.total_cost > 0.0);
        }
    }

    #[test]
    fn test_full_cluster_counts_unplaced_writes() {
        // each tier holds 3 x 100 KB, one 100 KB object with rf 3
        let records = vec![
            record("a", Operation::Write, 100, 0),
            record("b", Operation::Write, 100, 1),
            record("c", Operation::Write, 100, 2),
            record("d", Operation::Write, 100, 3),
            record("a", Operation::Read, 100, 4),
            record("missing", Operation::Read, 100, 5),
        ];
        let outcome = run_strategy(&reliable_config(100), StrategyKind::TimeGreedy, &records).unwrap();

        assert_eq!(outcome.summary.successful_writes, 3);
        assert_eq!(outcome.summary.unsuccessful_writes, 1);
        assert_eq!(outcome.summary.successful_reads, 1);
        assert_eq!(outcome.summary.unsuccessful_reads, 1);
        assert!(outcome.tiers.iter().all(|t| t.available_capacity == 0));
    }

    #[test]
    fn test_empty_trace() {
        let outcome = run_strategy(&reliable_config(100), StrategyKind::Random, &[]).unwrap();
        assert_eq!(outcome.summary.total_files, 0);
        assert!(outcome.summary.estimated_system_response.abs() < f64::EPSILON);
    }
}
