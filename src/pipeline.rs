use std::fmt;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::acquire::AcquisitionManager;
use crate::cache::{CacheEntry, MetricCache};
use crate::config::Settings;
use crate::domain::{MetricKind, PdbId};
use crate::error::KiraError;
use crate::filter::{FilterCriteria, satisfies};
use crate::metadata::MetadataService;
use crate::metrics;
use crate::rcsb::RcsbClient;
use crate::record::MetricRecord;
use crate::store::Store;
use crate::structure::Structure;
use crate::toolkit::StructureToolkit;

#[derive(Debug, Clone, PartialEq)]
pub enum SkipReason {
    DownloadFailed,
    LowResolution(f64),
    TooLarge,
    Unreadable(String),
    NoMetric(MetricKind),
    Failed(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::DownloadFailed => write!(f, "download failed"),
            SkipReason::LowResolution(value) => write!(f, "resolution {value} above cutoff"),
            SkipReason::TooLarge => write!(f, "unprepared structure exceeds relaxed size bounds"),
            SkipReason::Unreadable(message) => write!(f, "unreadable structure: {message}"),
            SkipReason::NoMetric(kind) => write!(f, "no {kind} metric"),
            SkipReason::Failed(message) => write!(f, "{message}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Accepted,
    Rejected,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum SizeSource {
    #[default]
    Structure,
    Metadata,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct BatchReport {
    pub input: usize,
    pub accepted: Vec<PdbId>,
    pub rejected: usize,
    pub skipped: usize,
}

enum Preparation {
    Ready(Structure),
    Skip(SkipReason),
}

pub struct Pipeline<R: RcsbClient, T: StructureToolkit> {
    client: R,
    toolkit: T,
    store: Store,
    cache: MetricCache,
    settings: Settings,
    criteria: FilterCriteria,
    size_source: SizeSource,
}

impl<R: RcsbClient, T: StructureToolkit> Pipeline<R, T> {
    pub fn new(
        client: R,
        toolkit: T,
        store: Store,
        settings: Settings,
        criteria: FilterCriteria,
    ) -> Self {
        Self {
            client,
            toolkit,
            cache: MetricCache::new(store.clone()),
            store,
            settings,
            criteria,
            size_source: SizeSource::default(),
        }
    }

    pub fn with_size_source(mut self, size_source: SizeSource) -> Self {
        self.size_source = size_source;
        self
    }

    pub fn cache(&self) -> &MetricCache {
        &self.cache
    }

    pub fn run_batch(&self, ids: &[PdbId]) -> Result<BatchReport, KiraError> {
        self.store.ensure_layout()?;
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.settings.jobs.max(1))
            .build()
            .map_err(|err| KiraError::WorkerPool(err.to_string()))?;

        let outcomes = pool.install(|| {
            ids.par_iter()
                .map(|id| self.process(id))
                .collect::<Result<Vec<_>, KiraError>>()
        })?;

        let mut report = BatchReport {
            input: ids.len(),
            ..BatchReport::default()
        };
        for (id, outcome) in ids.iter().zip(outcomes) {
            match outcome {
                Outcome::Accepted => report.accepted.push(id.clone()),
                Outcome::Rejected => report.rejected += 1,
                Outcome::Skipped(_) => report.skipped += 1,
            }
        }
        info!(
            input = report.input,
            accepted = report.accepted.len(),
            rejected = report.rejected,
            skipped = report.skipped,
            "batch finished"
        );
        Ok(report)
    }

    /// One identifier to a terminal state. Only batch-fatal errors are
    /// returned; anything else becomes [`Outcome::Skipped`].
    pub fn process(&self, id: &PdbId) -> Result<Outcome, KiraError> {
        match self.run_stages(id) {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.is_batch_fatal() => Err(err),
            Err(err) => Ok(self.skip(id, SkipReason::Failed(err.to_string()))),
        }
    }

    fn run_stages(&self, id: &PdbId) -> Result<Outcome, KiraError> {
        let mut records = Vec::new();
        let mut missing = Vec::new();
        for kind in self.criteria.kinds() {
            match self.cache.load(id, kind)? {
                Some(CacheEntry::Record(record)) => records.push(record),
                Some(CacheEntry::NoMetric) => {
                    return Ok(self.skip(id, SkipReason::NoMetric(kind)));
                }
                None => missing.push(kind),
            }
        }

        if self.size_source == SizeSource::Metadata && missing.contains(&MetricKind::Size) {
            let service = MetadataService::new(
                &self.client,
                self.settings.retry_budget,
                self.settings.retry_delay(),
            );
            let record = MetricRecord::Size(service.size_summary(id)?);
            self.cache.save(id, &record)?;
            records.push(record);
            missing.retain(|kind| *kind != MetricKind::Size);
        }

        if !missing.is_empty() {
            let structure = match self.prepare(id, &missing)? {
                Preparation::Ready(structure) => structure,
                Preparation::Skip(reason) => return Ok(self.skip(id, reason)),
            };
            for kind in missing {
                let derived = metrics::derive(
                    kind,
                    &structure,
                    &self.toolkit,
                    self.settings.identity_cutoff,
                );
                let Some(record) = derived else {
                    self.cache.save_no_metric(id, kind)?;
                    return Ok(self.skip(id, SkipReason::NoMetric(kind)));
                };
                self.cache.save(id, &record)?;
                records.push(record);
            }
        }

        if records
            .iter()
            .all(|record| satisfies(record, &self.criteria))
        {
            Ok(Outcome::Accepted)
        } else {
            Ok(Outcome::Rejected)
        }
    }

    fn prepare(&self, id: &PdbId, kinds: &[MetricKind]) -> Result<Preparation, KiraError> {
        let prepared_path = self.store.prepared_path(id);
        if prepared_path.as_std_path().is_file() {
            return Ok(match soft(self.toolkit.parse(prepared_path.as_std_path()))? {
                Ok(structure) => Preparation::Ready(structure),
                Err(reason) => Preparation::Skip(reason),
            });
        }

        let acquisition = AcquisitionManager::new(
            &self.client,
            &self.store,
            self.settings.retry_budget,
            self.settings.retry_delay(),
        );
        let Some(archive) = acquisition.acquire_path(id)? else {
            return Ok(Preparation::Skip(SkipReason::DownloadFailed));
        };

        match soft(self.toolkit.resolution_of(archive.as_std_path()))? {
            Ok(Some(resolution)) if resolution > self.settings.max_resolution => {
                return Ok(Preparation::Skip(SkipReason::LowResolution(resolution)));
            }
            Ok(_) => {}
            Err(reason) => return Ok(Preparation::Skip(reason)),
        }

        let raw = match soft(self.toolkit.parse(archive.as_std_path()))? {
            Ok(structure) => structure,
            Err(reason) => return Ok(Preparation::Skip(reason)),
        };

        if let (Some(factor), Some(size), true) = (
            self.settings.early_exit_factor,
            self.criteria.size,
            kinds.contains(&MetricKind::Size),
        ) {
            let estimate = metrics::size_metrics(&raw);
            if !size.relaxed(factor).accepts(&estimate) {
                return Ok(Preparation::Skip(SkipReason::TooLarge));
            }
        }

        let prepared = self.toolkit.clean(raw);
        self.toolkit.save(prepared_path.as_std_path(), &prepared)?;
        Ok(Preparation::Ready(prepared))
    }

    fn skip(&self, id: &PdbId, reason: SkipReason) -> Outcome {
        warn!(%id, "skipping: {reason}");
        Outcome::Skipped(reason)
    }
}

fn soft<V>(result: Result<V, KiraError>) -> Result<Result<V, SkipReason>, KiraError> {
    match result {
        Ok(value) => Ok(Ok(value)),
        Err(err) if err.is_batch_fatal() => Err(err),
        Err(err) => Ok(Err(SkipReason::Unreadable(err.to_string()))),
    }
}
