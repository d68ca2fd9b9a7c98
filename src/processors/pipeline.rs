use crate::error::Result;
use crate::models::Table;
use crate::processors::count_normalizer::CountNormalizer;
use crate::processors::data_merger::{DataMerger, MergeOutput};
use crate::processors::integrity_checker::JoinIntegrityReport;
use crate::processors::measurement_normalizer::MeasurementNormalizer;
use crate::settings::PipelineConfig;
use crate::utils::progress::ProgressReporter;
use std::collections::BTreeMap;
use tracing::info;

/// Everything one pipeline run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub counts: Table,
    pub measurements: Table,
    pub merged: Table,
    pub streets: BTreeMap<String, Table>,
    pub report: JoinIntegrityReport,
}

/// Both normalised sources, before merging.
#[derive(Debug, Clone)]
pub struct NormalizedSources {
    pub counts: Table,
    pub measurements: Table,
}

pub struct TrafficPipeline {
    config: PipelineConfig,
}

impl TrafficPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Normalise both sources, then merge and partition them.
    pub fn run(&self, progress: Option<&ProgressReporter>) -> Result<PipelineOutput> {
        let NormalizedSources {
            counts,
            measurements,
        } = self.normalize_sources(progress)?;

        if let Some(p) = progress {
            p.set_message("Merging sources...");
        }
        let MergeOutput {
            merged,
            streets,
            report,
        } = DataMerger::from_config(&self.config).run(&counts, &measurements)?;

        info!(
            counts = counts.height(),
            measurements = measurements.height(),
            merged = merged.height(),
            streets = streets.len(),
            "Pipeline finished"
        );

        Ok(PipelineOutput {
            counts,
            measurements,
            merged,
            streets,
            report,
        })
    }

    /// Run only the two normalisers.
    pub fn normalize_sources(&self, progress: Option<&ProgressReporter>) -> Result<NormalizedSources> {
        if let Some(p) = progress {
            p.set_message("Normalising vehicle counts...");
        }
        let counts = CountNormalizer::from_config(&self.config)?.run()?;

        if let Some(p) = progress {
            p.set_message("Normalising station measurements...");
        }
        let measurements = MeasurementNormalizer::from_config(&self.config)?.run()?;

        Ok(NormalizedSources {
            counts,
            measurements,
        })
    }
}
