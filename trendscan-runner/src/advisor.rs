//! Batch sell advice for a list of held positions.

use std::sync::Arc;

use tracing::{info, warn};
use trendscan_core::data::{FetchFailure, MarketDataFetcher};
use trendscan_core::domain::{BarStore, Position};
use trendscan_core::sell::{Decision, SellAction, SellEngine};

use crate::pool::WorkerPool;

/// What happened to one position.
#[derive(Debug, Clone)]
pub enum AdviceOutcome {
    Decided {
        store: Arc<BarStore>,
        decision: Decision,
    },
    FetchFailed(FetchFailure),
    TimedOut,
}

#[derive(Debug, Clone)]
pub struct AdviceRow {
    pub position: Position,
    pub outcome: AdviceOutcome,
}

impl AdviceRow {
    pub fn decision(&self) -> Option<&Decision> {
        match &self.outcome {
            AdviceOutcome::Decided { decision, .. } => Some(decision),
            _ => None,
        }
    }
}

/// Rows are in input order.
#[derive(Debug, Clone, Default)]
pub struct AdviceReport {
    pub rows: Vec<AdviceRow>,
}

impl AdviceReport {
    pub fn failed(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| matches!(r.outcome, AdviceOutcome::FetchFailed(_)))
            .count()
    }

    pub fn abandoned(&self) -> usize {
        self.rows
            .iter()
            .filter(|r| matches!(r.outcome, AdviceOutcome::TimedOut))
            .count()
    }

    /// Positions with a sell-type decision.
    pub fn sells(&self) -> usize {
        self.rows
            .iter()
            .filter_map(AdviceRow::decision)
            .filter(|d| d.action.is_sell())
            .count()
    }
}

pub struct Advisor {
    fetcher: Arc<MarketDataFetcher>,
    engine: Arc<SellEngine>,
    pool: WorkerPool,
}

impl Advisor {
    pub fn new(fetcher: Arc<MarketDataFetcher>, engine: SellEngine, pool: WorkerPool) -> Self {
        Self {
            fetcher,
            engine: Arc::new(engine),
            pool,
        }
    }

    pub fn advise(&self, positions: Vec<Position>) -> AdviceReport {
        let fetcher = Arc::clone(&self.fetcher);
        let engine = Arc::clone(&self.engine);
        let outcomes = self.pool.run(positions.clone(), move |position: Position| {
            match fetcher.fetch(position.symbol()) {
                Ok(fetched) => {
                    let decision = engine.decide(&position, &fetched.store);
                    AdviceOutcome::Decided {
                        store: fetched.store,
                        decision,
                    }
                }
                Err(failure) => AdviceOutcome::FetchFailed(failure),
            }
        });

        let rows: Vec<AdviceRow> = positions
            .into_iter()
            .zip(outcomes)
            .map(|(position, slot)| AdviceRow {
                position,
                outcome: slot.unwrap_or(AdviceOutcome::TimedOut),
            })
            .collect();

        for row in &rows {
            match &row.outcome {
                AdviceOutcome::FetchFailed(failure) => {
                    warn!(symbol = row.position.symbol(), error = %failure, "no data for position")
                }
                AdviceOutcome::TimedOut => {
                    warn!(symbol = row.position.symbol(), "advice task abandoned")
                }
                AdviceOutcome::Decided { .. } => {}
            }
        }

        let report = AdviceReport { rows };
        let holds = report
            .rows
            .iter()
            .filter_map(AdviceRow::decision)
            .filter(|d| d.action == SellAction::Hold)
            .count();
        info!(
            positions = report.rows.len(),
            sells = report.sells(),
            holds,
            failed = report.failed(),
            abandoned = report.abandoned(),
            "advice complete"
        );
        report
    }
}
