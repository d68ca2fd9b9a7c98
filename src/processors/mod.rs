pub mod count_normalizer;
pub mod data_merger;
pub mod integrity_checker;
pub mod measurement_normalizer;
pub mod pipeline;

pub use count_normalizer::CountNormalizer;
pub use data_merger::{DataMerger, MergeOutput};
pub use integrity_checker::{IntegrityChecker, JoinIntegrityReport};
pub use measurement_normalizer::MeasurementNormalizer;
pub use pipeline::{NormalizedSources, PipelineOutput, TrafficPipeline};
