//! Repository layer over the shared SQLite database
//!
//! Every function is generic over the sqlx executor so the same query can run
//! against the pool or inside a transaction (`&mut *tx`).

pub mod annotations;
pub mod annotators;
pub mod images;
pub mod predictions;
pub mod stats;
pub mod votes;
