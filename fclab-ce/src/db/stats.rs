//! Pool-wide counters

use fclab_common::Result;
use serde::Serialize;
use sqlx::{Executor, Sqlite};

/// Snapshot of the labeling pool
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow)]
pub struct PoolSummary {
    pub images: i64,
    pub validated: i64,
    pub with_ground_truth: i64,
    pub annotations: i64,
    pub votes: i64,
    pub annotators: i64,
}

pub async fn pool_summary<'e, E>(executor: E) -> Result<PoolSummary>
where
    E: Executor<'e, Database = Sqlite>,
{
    let summary: PoolSummary = sqlx::query_as(
        r#"
        SELECT
            (SELECT COUNT(*) FROM images) AS images,
            (SELECT COUNT(*) FROM images WHERE validated = 1) AS validated,
            (SELECT COUNT(*) FROM images WHERE ground_truth IS NOT NULL) AS with_ground_truth,
            (SELECT COUNT(*) FROM annotations) AS annotations,
            (SELECT COUNT(*) FROM votes) AS votes,
            (SELECT COUNT(*) FROM annotators) AS annotators
        "#,
    )
    .fetch_one(executor)
    .await?;

    Ok(summary)
}
