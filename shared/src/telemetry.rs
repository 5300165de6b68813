use std::time::{Duration, Instant};

/// Wall-clock timing for the pipeline phases reported by the CLI.
pub struct Telemetry {
    start: Instant,
    last_mark: Instant,
    phases: Vec<(String, Duration)>,
}

impl Telemetry {
    pub fn new() -> Self {
        let now = Instant::now();
        Self {
            start: now,
            last_mark: now,
            phases: Vec::new(),
        }
    }

    /// Close the current phase under `label` and start timing the next one.
    pub fn mark(&mut self, label: &str) {
        let now = Instant::now();
        self.phases
            .push((label.to_string(), now.duration_since(self.last_mark)));
        self.last_mark = now;
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }

    pub fn phases(&self) -> &[(String, Duration)] {
        &self.phases
    }
}

impl Default for Telemetry {
    fn default() -> Self {
        Self::new()
    }
}
