pub struct StatsHelper;

impl StatsHelper {
    /// Largest absolute sample value.
    pub fn peak_amplitude(samples: &[i16]) -> u16 {
        samples.iter().map(|v| v.unsigned_abs()).max().unwrap_or(0)
    }

    /// `20 * log10(amplitude)`; silence maps to negative infinity.
    pub fn amplitude_to_db(amplitude: f32) -> f32 {
        if amplitude <= 0.0 {
            return f32::NEG_INFINITY;
        }
        20.0 * amplitude.log10()
    }

    pub fn db_to_amplitude(db: f32) -> f32 {
        10f32.powf(db / 20.0)
    }
}
