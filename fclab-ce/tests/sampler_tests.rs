//! Integration tests for the Task Sampler

mod helpers;

use fclab_ce::db;
use fclab_ce::services::{AnnotationRecorder, ReliabilityTracker, Submission, TaskSampler};
use fclab_common::{EngineParams, Error};
use helpers::{add_image, create_test_db};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet};

fn sampler(pool: &SqlitePool, params: EngineParams) -> TaskSampler {
    TaskSampler::with_rng(pool.clone(), params, StdRng::seed_from_u64(7))
}

/// Answer a sampled task the way a client would
async fn answer(pool: &SqlitePool, sampled: &fclab_ce::services::SampledTask, annotator_id: &str) {
    let recorder = AnnotationRecorder::new(pool.clone(), ReliabilityTracker::new(pool.clone()));
    recorder
        .submit(Submission {
            image_id: sampled.image.id,
            annotator_id: annotator_id.to_string(),
            label: sampled.expected_label.clone().unwrap_or_else(|| "ABL".to_string()),
            is_calibration: sampled.is_calibration,
            expected_label: sampled.expected_label.clone(),
        })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_sampler_never_repeats_an_image() {
    let (_dir, pool) = create_test_db().await.unwrap();
    for i in 0..4 {
        add_image(&pool, &format!("abl_{}.jpg", i), Some("ABL")).await.unwrap();
    }
    for i in 0..6 {
        add_image(&pool, &format!("img_{}.jpg", i), None).await.unwrap();
    }
    let sampler = sampler(&pool, EngineParams::default());

    let mut seen = HashSet::new();
    loop {
        match sampler.next_task("ann").await {
            Ok(sampled) => {
                assert!(seen.insert(sampled.image.id), "image served twice");
                answer(&pool, &sampled, "ann").await;
            }
            Err(Error::NoTaskAvailable(id)) => {
                assert_eq!(id, "ann");
                break;
            }
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    assert_eq!(seen.len(), 10);
}

#[tokio::test]
async fn test_unanswered_task_may_be_served_again() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let only = add_image(&pool, "img_0.jpg", None).await.unwrap();
    let sampler = sampler(&pool, EngineParams::default());

    // Exclusion is driven by the annotation log only
    assert_eq!(sampler.next_task("ann").await.unwrap().image.id, only);
    assert_eq!(sampler.next_task("ann").await.unwrap().image.id, only);
}

#[tokio::test]
async fn test_calibration_first_until_quota() {
    let (_dir, pool) = create_test_db().await.unwrap();
    for i in 0..3 {
        add_image(&pool, &format!("ang_{}.jpg", i), Some("ANG")).await.unwrap();
    }
    for i in 0..3 {
        add_image(&pool, &format!("img_{}.jpg", i), None).await.unwrap();
    }
    let sampler = sampler(&pool, EngineParams::default());

    for _ in 0..3 {
        let sampled = sampler.next_task("ann").await.unwrap();
        assert!(sampled.is_calibration);
        assert_eq!(sampled.expected_label.as_deref(), Some("ANG"));
        assert_eq!(sampled.image.ground_truth.as_deref(), Some("ANG"));
        answer(&pool, &sampled, "ann").await;
    }

    // Quota (5) still unmet but calibration images are exhausted
    for _ in 0..3 {
        let sampled = sampler.next_task("ann").await.unwrap();
        assert!(!sampled.is_calibration);
        assert_eq!(sampled.expected_label, None);
        assert_eq!(sampled.image.ground_truth, None);
        answer(&pool, &sampled, "ann").await;
    }

    assert_eq!(db::annotations::count_calibrations(&pool, "ann").await.unwrap(), 3);
}

#[tokio::test]
async fn test_closed_gate_hides_known_answers() {
    let (_dir, pool) = create_test_db().await.unwrap();
    add_image(&pool, "sil_0.jpg", Some("SIL")).await.unwrap();
    let params = EngineParams {
        calibration_quota: 0,
        calibration_chance: 0.0,
        ..EngineParams::default()
    };
    let sampler = sampler(&pool, params);

    // Served from the normal pool, so the known answer stays hidden
    let sampled = sampler.next_task("ann").await.unwrap();
    assert!(!sampled.is_calibration);
    assert_eq!(sampled.expected_label, None);
}

#[tokio::test]
async fn test_quota_met_always_calibration_with_full_chance() {
    let (_dir, pool) = create_test_db().await.unwrap();
    for i in 0..5 {
        add_image(&pool, &format!("hot_{}.jpg", i), Some("HOT")).await.unwrap();
        add_image(&pool, &format!("img_{}.jpg", i), None).await.unwrap();
    }
    let params = EngineParams {
        calibration_quota: 0,
        calibration_chance: 1.0,
        ..EngineParams::default()
    };
    let sampler = sampler(&pool, params);

    for _ in 0..5 {
        let sampled = sampler.next_task("ann").await.unwrap();
        assert!(sampled.is_calibration);
        answer(&pool, &sampled, "ann").await;
    }
    let sampled = sampler.next_task("ann").await.unwrap();
    assert!(!sampled.is_calibration);
}

#[tokio::test]
async fn test_validated_images_leave_the_normal_pool() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let image_id = add_image(&pool, "img_0.jpg", None).await.unwrap();
    db::images::validate_with_consensus(&pool, image_id, "BAF").await.unwrap();
    // Gate closed: only the normal pool is consulted
    let params = EngineParams {
        calibration_quota: 0,
        calibration_chance: 0.0,
        ..EngineParams::default()
    };
    let sampler = sampler(&pool, params);

    assert!(matches!(
        sampler.next_task("ann").await,
        Err(Error::NoTaskAvailable(_))
    ));
    assert_eq!(db::images::count_unvalidated_unseen(&pool, "ann").await.unwrap(), 0);
}

#[tokio::test]
async fn test_consensus_validated_image_serves_as_calibration() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let image_id = add_image(&pool, "img_0.jpg", None).await.unwrap();
    db::images::validate_with_consensus(&pool, image_id, "BAF").await.unwrap();
    let sampler = sampler(&pool, EngineParams::default());

    // Quota unmet: any image with a ground truth is a calibration candidate
    let sampled = sampler.next_task("ann").await.unwrap();
    assert_eq!(sampled.image.id, image_id);
    assert!(sampled.is_calibration);
    assert!(sampled.image.validated);
    assert_eq!(sampled.expected_label.as_deref(), Some("BAF"));

    answer(&pool, &sampled, "ann").await;
    assert!(matches!(
        sampler.next_task("ann").await,
        Err(Error::NoTaskAvailable(_))
    ));
}

#[tokio::test]
async fn test_draws_are_uniform_over_candidates() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let mut images = Vec::new();
    for i in 0..4 {
        images.push(add_image(&pool, &format!("img_{}.jpg", i), None).await.unwrap());
    }
    let sampler = sampler(&pool, EngineParams::default());

    // Unanswered tasks stay eligible, so every draw sees all four images
    let draws = 2000;
    let mut hits = HashMap::new();
    for _ in 0..draws {
        let sampled = sampler.next_task("ann").await.unwrap();
        *hits.entry(sampled.image.id).or_insert(0usize) += 1;
    }

    assert_eq!(hits.len(), images.len());
    for image_id in &images {
        let share = hits[image_id] as f64 / draws as f64;
        assert!((share - 0.25).abs() < 0.05, "image drawn with share {}", share);
    }
}

#[tokio::test]
async fn test_calibration_chance_after_quota() {
    let (_dir, pool) = create_test_db().await.unwrap();
    for i in 0..3 {
        add_image(&pool, &format!("abl_{}.jpg", i), Some("ABL")).await.unwrap();
        add_image(&pool, &format!("img_{}.jpg", i), None).await.unwrap();
    }
    let params = EngineParams {
        calibration_quota: 0,
        calibration_chance: 0.5,
        ..EngineParams::default()
    };
    let sampler = sampler(&pool, params);

    let requests = 2000;
    let mut calibration = 0usize;
    for _ in 0..requests {
        let sampled = sampler.next_task("ann").await.unwrap();
        if sampled.is_calibration {
            assert!(sampled.expected_label.is_some());
            calibration += 1;
        } else {
            assert_eq!(sampled.expected_label, None);
        }
    }

    let rate = calibration as f64 / requests as f64;
    assert!((rate - 0.5).abs() < 0.05, "calibration rate {}", rate);
}

#[tokio::test]
async fn test_empty_pool() {
    let (_dir, pool) = create_test_db().await.unwrap();
    let sampler = sampler(&pool, EngineParams::default());

    assert!(matches!(
        sampler.next_task("ann").await,
        Err(Error::NoTaskAvailable(_))
    ));
}
