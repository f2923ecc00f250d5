use std::time::{Duration, Instant};

const WINDOW: usize = 16;

/// Rolling frame-rate average over the last 16 frames
#[derive(Debug, Clone)]
pub struct FpsMeter {
    samples: [f32; WINDOW],
    count: usize,
    last: Option<Instant>,
}

impl Default for FpsMeter {
    fn default() -> Self {
        Self::new()
    }
}

impl FpsMeter {
    pub fn new() -> Self {
        Self {
            samples: [0.0; WINDOW],
            count: 0,
            last: None,
        }
    }

    /// Mark a finished frame now and return the current average
    pub fn tick(&mut self) -> f32 {
        let now = Instant::now();
        if let Some(last) = self.last.replace(now) {
            self.record(now - last);
        }
        self.average()
    }

    /// Record one frame interval. Zero-length intervals are ignored.
    pub fn record(&mut self, interval: Duration) {
        let secs = interval.as_secs_f32();
        if secs <= 0.0 {
            return;
        }
        self.samples[self.count % WINDOW] = 1.0 / secs;
        self.count += 1;
    }

    pub fn average(&self) -> f32 {
        let filled = self.count.min(WINDOW);
        if filled == 0 {
            return 0.0;
        }
        self.samples[..filled].iter().sum::<f32>() / filled as f32
    }

    /// Frames recorded since creation
    pub fn frames(&self) -> usize {
        self.count
    }
}
