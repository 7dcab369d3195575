//! fclab-ce library - Annotation Consensus & Reliability Engine
//!
//! Four components behind a thin HTTP adapter:
//! - [`services::TaskSampler`] picks calibration or normal images
//! - [`services::ReliabilityTracker`] scores annotators on calibration answers
//! - [`services::AnnotationRecorder`] logs annotations
//! - [`services::ConsensusAggregator`] turns weighted votes into ground truth

use axum::Router;
use chrono::{DateTime, Utc};
use fclab_common::EngineParams;
use sqlx::SqlitePool;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod api;
pub mod db;
pub mod error;
pub mod services;

pub use error::{ApiError, ApiResult};

use services::{
    AnnotationRecorder, BlobStore, ConsensusAggregator, ReliabilityTracker, SpeciesPredictor,
    TaskDispatcher, TaskSampler,
};

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: SqlitePool,
    /// Engine parameters loaded at startup
    pub params: EngineParams,
    pub dispatcher: Arc<TaskDispatcher>,
    pub recorder: Arc<AnnotationRecorder>,
    pub aggregator: Arc<ConsensusAggregator>,
    pub tracker: ReliabilityTracker,
    /// Server start time
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    /// Wire the engine components around one pool
    pub fn new(
        db: SqlitePool,
        params: EngineParams,
        blobs: Arc<dyn BlobStore>,
        predictor: Arc<dyn SpeciesPredictor>,
    ) -> Self {
        let tracker = ReliabilityTracker::new(db.clone());
        let sampler = TaskSampler::new(db.clone(), params);

        Self {
            dispatcher: Arc::new(TaskDispatcher::new(db.clone(), sampler, blobs, predictor)),
            recorder: Arc::new(AnnotationRecorder::new(db.clone(), tracker.clone())),
            aggregator: Arc::new(ConsensusAggregator::new(db.clone(), params)),
            tracker,
            db,
            params,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/api/task", get(api::request_task))
        .route("/api/annotations", post(api::submit_annotation))
        .route("/api/votes", post(api::cast_vote))
        .route("/api/annotators/:id", get(api::get_reliability))
        .route("/api/annotators/:id/details", get(api::get_annotator_details))
        .route("/api/stats/remaining", get(api::get_remaining))
        .route("/api/stats/summary", get(api::get_pool_summary))
        .route("/api/stats/predictions", get(api::get_prediction_stats))
        .merge(api::health_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
