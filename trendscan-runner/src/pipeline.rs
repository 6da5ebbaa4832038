//! Parallel screening of a universe.
//!
//! Two passes through the worker pool:
//! 1. fetch + prefilter for every symbol in the universe
//! 2. full filter for the prefilter survivors, reusing the fetched bars
//!
//! Fetch failures and rejections never abort the run; they are counted in the
//! [`ScanReport`].

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{info, warn};
use trendscan_core::data::{DataSource, FetchFailure, MarketDataFetcher, Universe, UniverseEntry};
use trendscan_core::domain::BarStore;
use trendscan_core::screen::{sort_candidates, CandidateRecord, RejectReason, Screener};

use crate::pool::WorkerPool;

/// Outcome of one universe scan.
#[derive(Debug, Clone, Default)]
pub struct ScanReport {
    pub universe_size: usize,
    /// Symbols that passed the prefilter.
    pub prefiltered: usize,
    /// Sorted: triggers first, then distance to the 52-week high.
    pub candidates: Vec<CandidateRecord>,
    pub failures: Vec<FetchFailure>,
    pub rejects: BTreeMap<RejectReason, usize>,
    /// Fetches served by the secondary provider.
    pub secondary_hits: usize,
    /// Tasks that did not finish within the per-task timeout.
    pub abandoned: usize,
}

impl ScanReport {
    pub fn rejected(&self) -> usize {
        self.rejects.values().sum()
    }

    /// Every symbol is accounted for exactly once.
    pub fn accounted(&self) -> usize {
        self.candidates.len() + self.failures.len() + self.rejected() + self.abandoned
    }
}

enum Prefiltered {
    Passed(UniverseEntry, Arc<BarStore>, DataSource),
    Rejected(RejectReason, DataSource),
    Failed(FetchFailure),
}

pub struct ScanPipeline {
    fetcher: Arc<MarketDataFetcher>,
    screener: Arc<Screener>,
    pool: WorkerPool,
}

impl ScanPipeline {
    pub fn new(fetcher: Arc<MarketDataFetcher>, screener: Screener, pool: WorkerPool) -> Self {
        Self {
            fetcher,
            screener: Arc::new(screener),
            pool,
        }
    }

    pub fn run(&self, universe: &Universe) -> ScanReport {
        let started = Instant::now();
        let mut report = ScanReport {
            universe_size: universe.len(),
            ..ScanReport::default()
        };

        let fetcher = Arc::clone(&self.fetcher);
        let screener = Arc::clone(&self.screener);
        let first = self.pool.run(universe.entries().to_vec(), move |entry: UniverseEntry| {
            match fetcher.fetch(&entry.symbol) {
                Err(failure) => Prefiltered::Failed(failure),
                Ok(fetched) => match screener.prefilter(&fetched.store) {
                    Ok(_) => Prefiltered::Passed(entry, fetched.store, fetched.source),
                    Err(reason) => Prefiltered::Rejected(reason, fetched.source),
                },
            }
        });

        let mut survivors = Vec::new();
        for slot in first {
            let Some(outcome) = slot else {
                report.abandoned += 1;
                continue;
            };
            let source = match outcome {
                Prefiltered::Passed(entry, store, source) => {
                    survivors.push((entry, store));
                    source
                }
                Prefiltered::Rejected(reason, source) => {
                    *report.rejects.entry(reason).or_default() += 1;
                    source
                }
                Prefiltered::Failed(failure) => {
                    warn!(symbol = %failure.symbol, error = %failure, "skipping symbol");
                    report.failures.push(failure);
                    continue;
                }
            };
            if source == DataSource::Stooq {
                report.secondary_hits += 1;
            }
        }
        report.prefiltered = survivors.len();

        let screener = Arc::clone(&self.screener);
        let second = self.pool.run(survivors, move |(entry, store): (UniverseEntry, Arc<BarStore>)| {
            screener.evaluate(&entry.name, &store)
        });
        for slot in second {
            match slot {
                Some(Ok(record)) => report.candidates.push(record),
                Some(Err(reason)) => *report.rejects.entry(reason).or_default() += 1,
                None => report.abandoned += 1,
            }
        }
        sort_candidates(&mut report.candidates);

        if report.abandoned > 0 {
            warn!(abandoned = report.abandoned, "some symbols timed out");
        }
        info!(
            universe = report.universe_size,
            prefiltered = report.prefiltered,
            candidates = report.candidates.len(),
            rejected = report.rejected(),
            failed = report.failures.len(),
            secondary = report.secondary_hits,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "scan complete"
        );
        report
    }
}
