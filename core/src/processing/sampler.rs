use chrono::{DateTime, Local};

/// How often a background sample is requested.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cadence {
    Disabled,
    /// Every Nth processed cycle, counting from 1.
    Frames(u64),
    /// Whenever at least this many seconds passed since the last sample.
    Seconds(f64),
}

/// Interval timer for "normal activity" snapshots, independent of debouncing.
#[derive(Debug, Clone)]
pub struct BackgroundSampler {
    cadence: Cadence,
    cycle: u64,
    last_capture: Option<DateTime<Local>>,
}

impl BackgroundSampler {
    pub fn new(cadence: Cadence) -> Self {
        Self {
            cadence,
            cycle: 0,
            last_capture: None,
        }
    }

    pub fn cadence(&self) -> Cadence {
        self.cadence
    }

    pub fn cycles(&self) -> u64 {
        self.cycle
    }

    /// Advances one cycle and reports whether a background sample is due. A
    /// cycle in which an event fired never yields a background sample.
    pub fn tick(&mut self, now: DateTime<Local>, event_fired: bool) -> bool {
        self.cycle += 1;
        match self.cadence {
            Cadence::Disabled => false,
            Cadence::Frames(0) => false,
            Cadence::Frames(every) => !event_fired && self.cycle % every == 0,
            Cadence::Seconds(interval) => {
                if event_fired {
                    return false;
                }
                // The first cycle always samples, as if the last capture was long ago.
                let due = match self.last_capture {
                    Some(last) => {
                        now.signed_duration_since(last).num_milliseconds() as f64 / 1000.0
                            >= interval
                    }
                    None => true,
                };
                if due {
                    self.last_capture = Some(now);
                }
                due
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn frame_cadence_samples_every_nth_cycle() {
        let mut sampler = BackgroundSampler::new(Cadence::Frames(30));
        let now = Local::now();
        let sampled: Vec<u64> = (1..=90)
            .filter(|_| sampler.tick(now, false))
            .collect();
        assert_eq!(sampled, vec![30, 60, 90]);
    }

    #[test]
    fn event_cycle_suppresses_background() {
        let mut sampler = BackgroundSampler::new(Cadence::Frames(2));
        let now = Local::now();
        assert!(!sampler.tick(now, false));
        assert!(!sampler.tick(now, true));
        assert!(!sampler.tick(now, false));
        assert!(sampler.tick(now, false));
    }

    #[test]
    fn time_cadence_waits_for_interval() {
        let mut sampler = BackgroundSampler::new(Cadence::Seconds(5.0));
        let start = Local::now();
        assert!(sampler.tick(start, false));
        assert!(!sampler.tick(start + Duration::seconds(4), false));
        assert!(!sampler.tick(start + Duration::seconds(6), true));
        assert!(sampler.tick(start + Duration::seconds(6), false));
        assert!(!sampler.tick(start + Duration::seconds(10), false));
        assert!(sampler.tick(start + Duration::seconds(11), false));
    }

    #[test]
    fn disabled_cadence_never_samples() {
        let mut sampler = BackgroundSampler::new(Cadence::Disabled);
        assert!(!(0..100).any(|_| sampler.tick(Local::now(), false)));
        assert_eq!(sampler.cycles(), 100);
    }
}
