use num_complex::Complex32;
use rustfft::{num_traits::Zero, Fft, FftPlanner};
use std::sync::Arc;

/// Wraps a forward/inverse `rustfft` plan pair of a fixed size.
pub struct FftHelper {
    forward: Arc<dyn Fft<f32>>,
    inverse: Arc<dyn Fft<f32>>,
    size: usize,
}

impl FftHelper {
    pub fn new(size: usize) -> Self {
        let mut planner = FftPlanner::new();
        let forward = planner.plan_fft_forward(size);
        let inverse = planner.plan_fft_inverse(size);
        Self {
            forward,
            inverse,
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Transforms `input`, zero-padded or truncated to the plan size.
    pub fn forward(&self, input: &[f32]) -> Vec<Complex32> {
        let mut buffer: Vec<Complex32> = input
            .iter()
            .take(self.size)
            .map(|&value| Complex32::new(value, 0.0))
            .collect();
        buffer.resize(self.size, Complex32::zero());
        self.forward.process(&mut buffer);
        buffer
    }

    /// Inverse transform returning the normalised real part.
    pub fn inverse(&self, spectrum: &[Complex32]) -> Vec<f32> {
        let mut buffer = spectrum.to_vec();
        buffer.resize(self.size, Complex32::zero());
        self.inverse.process(&mut buffer);
        let scale = 1.0 / self.size.max(1) as f32;
        buffer.iter().map(|c| c.re * scale).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fft_helper_returns_same_length() {
        let helper = FftHelper::new(4);
        let output = helper.forward(&[1.0, 0.0, -1.0, 0.0]);
        assert_eq!(output.len(), 4);
    }

    #[test]
    fn inverse_restores_signal() {
        let helper = FftHelper::new(8);
        let signal = [0.5, -1.0, 2.0, 0.0, 1.5, -0.5, 0.25, 3.0];
        let restored = helper.inverse(&helper.forward(&signal));
        for (a, b) in signal.iter().zip(restored.iter()) {
            assert!((a - b).abs() < 1e-4);
        }
    }
}
