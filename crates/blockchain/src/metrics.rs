use crate::ChainError;
use ember_storage::{InsertOutcome, SetHeadOutcome};

#[derive(Debug, Clone)]
pub(crate) struct Metrics;

impl Metrics {
    pub(crate) const CHAIN_HEAD_NUMBER: &'static str = "ember_chain_head_number";
    pub(crate) const CHAIN_INSERTED_BLOCKS_TOTAL: &'static str =
        "ember_chain_inserted_blocks_total";
    pub(crate) const CHAIN_REORGS_TOTAL: &'static str = "ember_chain_reorgs_total";
    pub(crate) const CHAIN_REORG_DEPTH: &'static str = "ember_chain_reorg_depth";
    pub(crate) const CHAIN_SET_HEAD_TOTAL: &'static str = "ember_chain_set_head_total";

    const OUTCOMES: [&'static str; 5] = ["known", "extended", "reorged", "side", "error"];

    pub(crate) fn init() {
        Self::describe();
        Self::zero();
    }

    fn describe() {
        metrics::describe_gauge!(
            Self::CHAIN_HEAD_NUMBER,
            metrics::Unit::Count,
            "Number of the canonical head block",
        );

        metrics::describe_counter!(
            Self::CHAIN_INSERTED_BLOCKS_TOTAL,
            metrics::Unit::Count,
            "Total number of blocks handed to the chain, labelled by outcome",
        );

        metrics::describe_counter!(
            Self::CHAIN_REORGS_TOTAL,
            metrics::Unit::Count,
            "Total number of canonical chain reorganisations",
        );

        metrics::describe_histogram!(
            Self::CHAIN_REORG_DEPTH,
            metrics::Unit::Count,
            "Number of canonical blocks displaced by a reorganisation",
        );

        metrics::describe_counter!(
            Self::CHAIN_SET_HEAD_TOTAL,
            metrics::Unit::Count,
            "Total number of forced head rewinds",
        );
    }

    fn zero() {
        for outcome in Self::OUTCOMES {
            metrics::counter!(Self::CHAIN_INSERTED_BLOCKS_TOTAL, "outcome" => outcome)
                .increment(0);
        }

        metrics::counter!(Self::CHAIN_REORGS_TOTAL).increment(0);

        metrics::histogram!(Self::CHAIN_REORG_DEPTH).record(0);

        metrics::counter!(Self::CHAIN_SET_HEAD_TOTAL).increment(0);
    }

    pub(crate) fn record_head(number: u64) {
        metrics::gauge!(Self::CHAIN_HEAD_NUMBER).set(number as f64);
    }

    pub(crate) fn record_insert(result: &Result<InsertOutcome, ChainError>) {
        match result {
            Ok(outcome) => {
                metrics::counter!(
                    Self::CHAIN_INSERTED_BLOCKS_TOTAL,
                    "outcome" => outcome.as_str(),
                )
                .increment(1);

                match outcome {
                    InsertOutcome::Extended { head } => Self::record_head(head.number),
                    InsertOutcome::Reorged { head, depth, .. } => {
                        Self::record_head(head.number);
                        metrics::counter!(Self::CHAIN_REORGS_TOTAL).increment(1);
                        metrics::histogram!(Self::CHAIN_REORG_DEPTH).record(*depth as f64);
                    }
                    InsertOutcome::AlreadyKnown | InsertOutcome::SideChain { .. } => {}
                }
            }
            Err(_) => {
                metrics::counter!(Self::CHAIN_INSERTED_BLOCKS_TOTAL, "outcome" => "error")
                    .increment(1);
            }
        }
    }

    pub(crate) fn record_set_head(outcome: &SetHeadOutcome) {
        metrics::counter!(Self::CHAIN_SET_HEAD_TOTAL).increment(1);
        Self::record_head(outcome.head.number);
    }
}
