use nuq_core::OscParams;

#[test]
fn standard_parameters_match_expected_values() {
    let params = OscParams::standard(3);
    assert_eq!(params.dim(), 3);
    assert_eq!(params.angle(0, 1).unwrap(), 0.583996);
    assert_eq!(params.angle(0, 2).unwrap(), 0.148190);
    assert_eq!(params.angle(1, 2).unwrap(), 0.737324);
    assert_eq!(params.splitting(1).unwrap(), 7.5e-5);
    assert_eq!(params.splitting(2).unwrap(), 2.57e-3);
    assert_eq!(params.phase(0, 2).unwrap(), 0.0);
}

#[test]
fn pair_indexing_rejects_bad_pairs() {
    let mut params = OscParams::standard(3);
    assert!(params.set_angle(1, 1, 0.1).is_err());
    assert!(params.set_angle(2, 1, 0.1).is_err());
    assert!(params.set_angle(0, 3, 0.1).is_err());
    assert!(params.set_splitting(0, 1.0).is_err());
    assert!(params.set_splitting(3, 1.0).is_err());
}

#[test]
fn cp_flip_is_a_pure_copy() {
    let mut params = OscParams::standard(3);
    params.set_phase(0, 2, 1.25).unwrap();
    let flipped = params.flipped_cp();
    assert_eq!(flipped.phase(0, 2).unwrap(), -1.25);
    // the original set is untouched
    assert_eq!(params.phase(0, 2).unwrap(), 1.25);
    // flipping twice restores the original
    assert_eq!(flipped.flipped_cp(), params);
}

#[test]
fn serde_roundtrip_preserves_parameters() {
    let params = OscParams::standard(4);
    let json = serde_json::to_string(&params).unwrap();
    let restored: OscParams = serde_json::from_str(&json).unwrap();
    assert_eq!(params, restored);
}

#[test]
fn pairs_cover_upper_triangle() {
    let params = OscParams::zeroed(4);
    let pairs: Vec<_> = params.pairs().collect();
    assert_eq!(pairs.len(), 6);
    assert_eq!(pairs[0], (0, 1));
    assert_eq!(pairs[5], (2, 3));
}
