/// Cubic ease-in-out over `t` in [0, 1].
pub fn ease_cubic_in_out(t: f64) -> f64 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        let u = 1.0 - t;
        1.0 - 4.0 * u * u * u
    }
}
