use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::*;

const GRID: [f32; 9] = [-8.0, -4.0, -1.0, -0.5, 0.0, 0.5, 1.0, 4.0, 8.0];

fn assert_monotone_positive(p: PolynomialFalloff) {
    let mut previous = p.correction(0.0);
    for i in 1..=1000 {
        let r = i as f32 / 1000.0;
        let current = p.correction(r);
        assert!(current > 0.0, "{p:?}: p({r}) = {current}");
        assert!(
            current >= previous - 1e-4 * previous.abs().max(1.0),
            "{p:?}: p decreases at r = {r} ({previous} -> {current})"
        );
        previous = current;
    }
}

#[test]
fn test_check_with_only_quadratic_term() {
    for a in GRID {
        assert_eq!(check(a, 0.0, 0.0), a > 0.0, "a = {a}");
    }
    let mut rng = StdRng::seed_from_u64(11);
    for _ in 0..1000 {
        let a: f32 = rng.random_range(-20.0..20.0);
        assert_eq!(check(a, 0.0, 0.0), a > 0.0, "a = {a}");
    }
}

#[test]
fn test_check_branches() {
    // c = 0, b > 0 needs a >= 0
    assert!(check(0.0, 1.0, 0.0));
    assert!(!check(-0.1, 1.0, 0.0));
    // c = 0, b < 0 needs a + 2b >= 0
    assert!(check(2.0, -1.0, 0.0));
    assert!(!check(1.9, -1.0, 0.0));
    // c > 0 without real stationary points
    assert!(check(1.0, 0.0, 1.0));
    assert!(check(0.0, 0.0, 8.0));
    // c < 0 is never monotone over the whole range
    assert!(!check(0.0, 0.0, -8.0));
    assert!(!check(8.0, 8.0, -0.5));
    // c > 0 with both stationary points inside (0, 1)
    assert!(!check(0.5, -1.5, 1.0));
}

#[test]
fn test_feasible_grid_triples_are_monotone() {
    let mut feasible = 0;
    for a in GRID {
        for b in GRID {
            for c in GRID {
                if check(a, b, c) {
                    feasible += 1;
                    assert_monotone_positive(PolynomialFalloff::new(a, b, c));
                }
            }
        }
    }
    assert!(feasible > 50, "only {feasible} feasible triples");
}

#[test]
fn test_feasible_random_triples_are_monotone() {
    let mut rng = StdRng::seed_from_u64(42);
    let mut feasible = 0;
    for _ in 0..5000 {
        let a: f32 = rng.random_range(-10.0..10.0);
        let b: f32 = rng.random_range(-10.0..10.0);
        let c: f32 = rng.random_range(-10.0..10.0);
        if check(a, b, c) {
            feasible += 1;
            assert_monotone_positive(PolynomialFalloff::new(a, b, c));
        }
    }
    assert!(feasible > 100);
}

#[test]
fn test_identity_is_feasible_but_not_checked() {
    assert!(!check(0.0, 0.0, 0.0));
    assert!(PolynomialFalloff::IDENTITY.is_feasible());
    assert_eq!(PolynomialFalloff::IDENTITY.correction(0.7), 1.0);
    assert_eq!(PolynomialFalloff::IDENTITY.gain(1.0), 1.0);
}

#[test]
fn test_gain_is_reciprocal_of_correction() {
    let p = PolynomialFalloff::new(0.5, 0.25, 0.125);
    let r = 0.8;
    let q: f32 = 0.64;
    let expected = 1.0 + 0.5 * q + 0.25 * q * q + 0.125 * q * q * q;
    assert!((p.correction(r) - expected).abs() < 1e-5);
    assert!((p.gain(r) * p.correction(r) - 1.0).abs() < 1e-6);
}

#[test]
fn test_neighbors_order() {
    let n = PolynomialFalloff::new(1.0, 2.0, 3.0).neighbors(0.5);
    assert_eq!(n[0], PolynomialFalloff::new(1.5, 2.0, 3.0));
    assert_eq!(n[1], PolynomialFalloff::new(0.5, 2.0, 3.0));
    assert_eq!(n[3], PolynomialFalloff::new(1.0, 1.5, 3.0));
    assert_eq!(n[5], PolynomialFalloff::new(1.0, 2.0, 2.5));
}

fn sample_profile() -> RadialProfile {
    RadialProfile::new(vec![1.0, 0.9, 0.8], 0.5).unwrap()
}

#[test]
fn test_profile_interpolates_between_rings() {
    let profile = sample_profile();
    assert_eq!(profile.at_ring(0.0), 1.0);
    assert!((profile.at_ring(0.5) - 0.95).abs() < 1e-6);
    assert!((profile.at_ring(1.25) - 0.875).abs() < 1e-6);
    // Pixel radius 3 is ring 1.5
    assert!((profile.gain(3.0) - 0.85).abs() < 1e-6);
}

#[test]
fn test_profile_last_ring_and_beyond() {
    let profile = sample_profile();
    assert_eq!(profile.at_ring(2.0), 0.8);
    assert_eq!(profile.at_ring(2.0001), 0.8);
    assert_eq!(profile.at_ring(1.0e9), 0.8);
    assert_eq!(profile.at_ring(f32::MAX), 0.8);
    assert_eq!(profile.at_ring(f32::INFINITY), 0.8);
    assert_eq!(profile.gain(1.0e12), 0.8);
}

#[test]
fn test_profile_negative_or_nan_radius_uses_first_ring() {
    let profile = sample_profile();
    assert_eq!(profile.at_ring(-3.0), 1.0);
    assert_eq!(profile.at_ring(f32::NAN), 1.0);
}

#[test]
fn test_single_ring_profile_is_constant() {
    let profile = RadialProfile::new(vec![1.0], 1.0).unwrap();
    assert_eq!(profile.at_ring(0.0), 1.0);
    assert_eq!(profile.at_ring(40.0), 1.0);
}

#[test]
fn test_profile_from_log_gains_normalizes_first_ring() {
    let profile = RadialProfile::from_log_gains(&[0.3, 0.2, -0.1], 1.0).unwrap();
    assert_eq!(profile.gains()[0], 1.0);
    assert!((profile.gains()[1] - (-0.1f64).exp() as f32).abs() < 1e-6);
    assert!((profile.gains()[2] - (-0.4f64).exp() as f32).abs() < 1e-6);
    assert!(RadialProfile::from_log_gains(&[], 1.0).is_err());
}

#[test]
fn test_profile_rejects_bad_values() {
    assert!(RadialProfile::new(vec![], 1.0).is_err());
    assert!(RadialProfile::new(vec![1.0, -0.2], 1.0).is_err());
    assert!(RadialProfile::new(vec![1.0, f32::NAN], 1.0).is_err());
    assert!(RadialProfile::new(vec![1.0], 0.0).is_err());
}

#[test]
fn test_polynomial_model_rejects_infeasible_and_bad_channel_counts() {
    let center = OpticalCenter::new(10.0, 10.0);
    let good = PolynomialFalloff::new(0.5, 0.0, 0.0);
    assert!(FalloffModel::polynomial(center, 14.0, vec![good]).is_ok());
    assert!(FalloffModel::polynomial(center, 14.0, vec![good; 3]).is_ok());
    assert!(FalloffModel::polynomial(center, 14.0, vec![good; 2]).is_err());
    assert!(
        FalloffModel::polynomial(center, 14.0, vec![PolynomialFalloff::new(-1.0, 0.0, 0.0)])
            .is_err()
    );
    assert!(FalloffModel::polynomial(center, 0.0, vec![good]).is_err());
}

#[test]
fn test_model_gain_uses_pixel_radius() {
    let center = OpticalCenter::new(0.0, 0.0);
    let poly = FalloffModel::polynomial(center, 10.0, vec![PolynomialFalloff::new(1.0, 0.0, 0.0)])
        .unwrap();
    // r = 5 / 10 = 0.5, p = 1.25
    assert!((poly.correction(0, 5.0) - 1.25).abs() < 1e-6);
    assert!((poly.gain(0, 5.0) - 0.8).abs() < 1e-6);

    let profile = FalloffModel::profile(center, sample_profile());
    assert!((profile.gain(0, 2.0) - 0.9).abs() < 1e-6);
    assert!((profile.correction(0, 2.0) - 1.0 / 0.9).abs() < 1e-5);
}

#[test]
fn test_channel_compatibility() {
    let center = OpticalCenter::new(0.0, 0.0);
    let rgb = FalloffModel::polynomial(
        center,
        1.0,
        vec![PolynomialFalloff::new(0.2, 0.0, 0.0); 3],
    )
    .unwrap();
    assert!(rgb.ensure_channels(3).is_ok());
    assert!(rgb.ensure_channels(1).is_err());
    assert_eq!(rgb.curve_index(2), 2);

    let shared = FalloffModel::profile(center, sample_profile());
    assert!(shared.ensure_channels(1).is_ok());
    assert!(shared.ensure_channels(3).is_ok());
    assert_eq!(shared.curve_index(2), 0);
}

#[test]
fn test_fingerprint_tracks_center_and_curves() {
    let center = OpticalCenter::new(5.0, 5.0);
    let a = FalloffModel::profile(center, sample_profile());
    let b = FalloffModel::profile(center, sample_profile());
    assert_eq!(a.fingerprint(), b.fingerprint());

    let moved = FalloffModel::profile(OpticalCenter::new(5.0, 6.0), sample_profile());
    assert_ne!(a.fingerprint(), moved.fingerprint());

    let other = FalloffModel::profile(center, RadialProfile::new(vec![1.0, 0.9], 0.5).unwrap());
    assert_ne!(a.fingerprint(), other.fingerprint());
}

#[test]
fn test_identity_model() {
    let model = FalloffModel::identity(OpticalCenter::new(3.0, 4.0));
    assert!(model.is_identity());
    assert_eq!(model.correction(0, 1000.0), 1.0);
    assert!(model.validate().is_ok());
}

#[test]
fn test_record_restores_polynomial_model() {
    let model = FalloffModel::polynomial(
        OpticalCenter::new(820.0, 616.0),
        1026.0,
        vec![
            PolynomialFalloff::new(0.5, 0.25, 0.0),
            PolynomialFalloff::new(0.375, 0.0, 0.125),
            PolynomialFalloff::IDENTITY,
        ],
    )
    .unwrap();
    let yaml = model.to_record(FileFormat::Yaml).unwrap();
    assert!(yaml.contains("kind: polynomial"));
    assert_eq!(FalloffModel::from_record(&yaml, FileFormat::Yaml).unwrap(), model);
}

#[test]
fn test_record_with_infeasible_coefficients_is_rejected() {
    let record = r#"{
        "center": { "u0": 10.0, "v0": 10.0 },
        "falloff": {
            "kind": "polynomial",
            "radius_scale": 14.0,
            "channels": [ { "a": -2.0, "b": 0.0, "c": 0.0 } ]
        }
    }"#;
    let err = FalloffModel::from_record(record, FileFormat::Json).unwrap_err();
    assert!(matches!(err, Error::InvalidInput { .. }));
}

#[test]
fn test_save_and_load_profile_model() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("lens.json");
    let model = FalloffModel::profile(OpticalCenter::new(37.5, 28.0), sample_profile());
    model.save(&path).unwrap();
    assert_eq!(FalloffModel::load(&path).unwrap(), model);

    let err = model.save(dir.path().join("lens.txt")).unwrap_err();
    assert!(matches!(err, Error::ModelFormat { .. }));
}
