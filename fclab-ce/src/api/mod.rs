//! HTTP API handlers for fclab-ce

pub mod annotations;
pub mod annotators;
pub mod health;
pub mod stats;
pub mod tasks;
pub mod votes;

pub use annotations::submit_annotation;
pub use annotators::{get_annotator_details, get_reliability};
pub use health::health_routes;
pub use stats::{get_pool_summary, get_prediction_stats, get_remaining};
pub use tasks::request_task;
pub use votes::cast_vote;
