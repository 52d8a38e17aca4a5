//! Frequency-response curves for display.

/// Number of magnitude bins in a published curve.
pub const RESPONSE_BINS: usize = 200;
pub const RESPONSE_MIN_HZ: f32 = 30.0;
pub const RESPONSE_MAX_HZ: f32 = 20000.0;
/// Top of the display range, dB.
pub const DISPLAY_MAX_DB: f32 = 5.0;
/// Bottom of the display range, dB.
pub const DISPLAY_MIN_DB: f32 = -35.0;

const HEADER: [f32; 4] = [RESPONSE_MIN_HZ, RESPONSE_MAX_HZ, DISPLAY_MAX_DB, DISPLAY_MIN_DB];

/// Log-spaced magnitude curve with a four-value display header.
///
/// Both buffers are sized at construction, so [`compute`](Self::compute) is
/// safe to call from the audio thread.
#[derive(Debug, Clone)]
pub struct FrequencyResponse {
    frequencies: Vec<f32>,
    vector: Vec<f32>,
}

impl Default for FrequencyResponse {
    fn default() -> Self {
        Self::new()
    }
}

impl FrequencyResponse {
    pub fn new() -> Self {
        let ratio = (RESPONSE_MAX_HZ / RESPONSE_MIN_HZ).ln();
        let frequencies = (0..RESPONSE_BINS)
            .map(|i| {
                let t = i as f32 / (RESPONSE_BINS - 1) as f32;
                RESPONSE_MIN_HZ * (ratio * t).exp()
            })
            .collect();
        let mut vector = vec![0.0; HEADER.len() + RESPONSE_BINS];
        vector[..HEADER.len()].copy_from_slice(&HEADER);
        Self {
            frequencies,
            vector,
        }
    }

    pub fn frequencies(&self) -> &[f32] {
        &self.frequencies
    }

    /// Fill the curve with `magnitude(f) * trim` at every bin and return the
    /// header plus bins, ready to publish.
    pub fn compute(&mut self, mut magnitude: impl FnMut(f32) -> f32, trim: f32) -> &[f32] {
        let bins = &mut self.vector[HEADER.len()..];
        for (out, &f) in bins.iter_mut().zip(&self.frequencies) {
            *out = magnitude(f) * trim;
        }
        &self.vector
    }

    /// The last computed vector.
    pub fn vector(&self) -> &[f32] {
        &self.vector
    }

    /// Just the magnitude bins of the last computed vector.
    pub fn bins(&self) -> &[f32] {
        &self.vector[HEADER.len()..]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_bins_span_range() {
        let r = FrequencyResponse::new();
        let f = r.frequencies();
        assert_eq!(f.len(), RESPONSE_BINS);
        assert_relative_eq!(f[0], 30.0, epsilon = 1e-3);
        assert_relative_eq!(f[RESPONSE_BINS - 1], 20000.0, max_relative = 1e-4);
        assert!(f.windows(2).all(|w| w[1] > w[0]));
    }

    #[test]
    fn test_compute_applies_trim_and_header() {
        let mut r = FrequencyResponse::new();
        let v = r.compute(|_| 0.5, 2.0);
        assert_eq!(v.len(), 4 + RESPONSE_BINS);
        assert_eq!(&v[..4], &[30.0, 20000.0, 5.0, -35.0]);
        assert!(v[4..].iter().all(|&m| m == 1.0));
    }

    #[test]
    fn test_compute_is_repeatable() {
        let mut r = FrequencyResponse::new();
        let first = r.compute(|f| 1.0 / (1.0 + f / 1000.0), 1.0).to_vec();
        let second = r.compute(|f| 1.0 / (1.0 + f / 1000.0), 1.0);
        assert_eq!(first.as_slice(), second);
    }
}
