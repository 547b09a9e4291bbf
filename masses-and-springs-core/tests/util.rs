use masses_and_springs_core::util::ease_cubic_in_out;

#[test]
fn ease_is_symmetric_and_pinned() {
    assert_eq!(ease_cubic_in_out(0.0), 0.0);
    assert_eq!(ease_cubic_in_out(0.5), 0.5);
    assert_eq!(ease_cubic_in_out(1.0), 1.0);

    let mut previous = 0.0;
    for i in 1..=100 {
        let t = i as f64 / 100.0;
        let eased = ease_cubic_in_out(t);
        assert!(eased >= previous);
        assert!((eased + ease_cubic_in_out(1.0 - t) - 1.0).abs() < 1e-12);
        previous = eased;
    }
}
