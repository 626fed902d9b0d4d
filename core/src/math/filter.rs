use crate::math::fft::FftHelper;
use num_complex::Complex32;
use rustfft::num_traits::Zero;

/// Frequency-domain band-pass: bins outside `[low_hz, high_hz]` are zeroed.
pub struct BandPass {
    low_hz: f32,
    high_hz: f32,
    sample_rate: u32,
    fft: Option<FftHelper>,
}

impl BandPass {
    pub fn new(low_hz: f32, high_hz: f32, sample_rate: u32) -> Self {
        Self {
            low_hz,
            high_hz,
            sample_rate,
            fft: None,
        }
    }

    pub fn apply(&mut self, samples: &[i16]) -> Vec<i16> {
        let len = samples.len();
        if len == 0 || self.sample_rate == 0 {
            return samples.to_vec();
        }
        // Plans are reused while the block size stays the same.
        if self.fft.as_ref().map(FftHelper::size) != Some(len) {
            self.fft = Some(FftHelper::new(len));
        }
        let Some(fft) = self.fft.as_ref() else {
            return samples.to_vec();
        };

        let input: Vec<f32> = samples.iter().map(|&s| s as f32).collect();
        let mut spectrum = fft.forward(&input);
        let resolution = self.sample_rate as f32 / len as f32;
        for (bin, value) in spectrum.iter_mut().enumerate() {
            let mirrored = if bin <= len / 2 { bin } else { len - bin };
            let frequency = mirrored as f32 * resolution;
            if frequency < self.low_hz || frequency > self.high_hz {
                *value = Complex32::zero();
            }
        }

        fft.inverse(&spectrum)
            .into_iter()
            .map(|v| v.round().clamp(i16::MIN as f32, i16::MAX as f32) as i16)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::stats::StatsHelper;
    use std::f32::consts::PI;

    fn tone(frequency: f32, amplitude: f32, sample_rate: u32, len: usize) -> Vec<i16> {
        (0..len)
            .map(|i| (amplitude * (2.0 * PI * frequency * i as f32 / sample_rate as f32).sin()) as i16)
            .collect()
    }

    #[test]
    fn passes_in_band_tone() {
        let mut filter = BandPass::new(500.0, 4000.0, 44_100);
        let filtered = filter.apply(&tone(1000.0, 10_000.0, 44_100, 4410));
        assert!(StatsHelper::peak_amplitude(&filtered) > 9_000);
    }

    #[test]
    fn removes_out_of_band_tone() {
        let mut filter = BandPass::new(500.0, 4000.0, 44_100);
        let filtered = filter.apply(&tone(100.0, 10_000.0, 44_100, 4410));
        assert!(StatsHelper::peak_amplitude(&filtered) < 500);
    }

    #[test]
    fn empty_block_is_returned_unchanged() {
        let mut filter = BandPass::new(500.0, 4000.0, 44_100);
        assert!(filter.apply(&[]).is_empty());
    }
}
