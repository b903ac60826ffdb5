//! Score helpers shared by adapters and the ranker.

/// Clamps a score into `[0, 1]`, mapping NaN and infinities to zero.
pub fn clamp_unit(score: f32) -> f32 {
	if !score.is_finite() {
		return 0.0;
	}

	score.clamp(0.0, 1.0)
}

/// Maps an unbounded non-negative score onto `[0, 1)` with `raw / (raw + half)`.
///
/// `half` is the raw score that lands at 0.5. The mapping is monotonic, so adapters keep their
/// own ordering after normalization.
pub fn saturate(raw: f32, half: f32) -> f32 {
	if !raw.is_finite() || raw <= 0.0 || !half.is_finite() || half <= 0.0 {
		return 0.0;
	}

	clamp_unit(raw / (raw + half))
}
