//! Annotation consensus and reliability services
//!
//! - [`task_sampler`]: calibration-vs-normal task selection
//! - [`reliability_tracker`]: lifetime calibration accuracy per annotator
//! - [`annotation_recorder`]: annotation log + calibration scoring
//! - [`consensus_aggregator`]: reliability-weighted voting
//! - [`image_locks`]: per-image critical sections for voting
//! - [`task_dispatcher`]: sampler + blob store + AI predictor glue
//! - [`blob_store`], [`predictor`]: external collaborator seams
//! - [`ingest`]: folder ingestion into the pool
//! - [`reset`]: empty the pool and its blobs

pub mod annotation_recorder;
pub mod blob_store;
pub mod consensus_aggregator;
pub mod image_locks;
pub mod ingest;
pub mod predictor;
pub mod reliability_tracker;
pub mod reset;
pub mod task_dispatcher;
pub mod task_sampler;

pub use annotation_recorder::{AnnotationRecorder, Submission, SubmissionReceipt};
pub use blob_store::{BlobStore, FsBlobStore};
pub use consensus_aggregator::{ConsensusAggregator, ConsensusOutcome, ConsensusTally};
pub use image_locks::ImageLocks;
pub use ingest::{ingest_folder, IngestSummary};
pub use predictor::{NoopPredictor, SpeciesPredictor};
pub use reliability_tracker::{AnnotatorDetails, ReliabilityReport, ReliabilityTracker};
pub use reset::{reset_pool, ResetSummary};
pub use task_dispatcher::{Task, TaskDispatcher};
pub use task_sampler::{SampledTask, TaskSampler};
