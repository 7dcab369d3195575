//! Test Helper Utilities
//!
//! Shared utilities for testing fclab-ce

#![allow(dead_code)]

pub mod db_utils;

pub use db_utils::{
    add_image, annotator_with_record, create_test_db, seed_vote, vote_count,
};
