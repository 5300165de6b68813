use std::collections::VecDeque;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{sleep, sleep_until, Instant};

const WINDOW: Duration = Duration::from_secs(60);

/// Throttle for outbound provider calls: a minimum gap between calls plus
/// a sliding 60-second window cap. One instance is built per client
/// configuration and shared via `Arc`; state lives for the whole process.
pub struct RateLimiter {
    min_gap: Duration,
    per_minute: usize,
    state: Mutex<LimiterState>,
}

#[derive(Default)]
struct LimiterState {
    last_request: Option<Instant>,
    window: VecDeque<Instant>,
}

impl RateLimiter {
    pub fn new(requests_per_second: u32, requests_per_minute: u32) -> Self {
        let per_second = requests_per_second.max(1);
        Self {
            min_gap: Duration::from_secs_f64(1.0 / f64::from(per_second)),
            per_minute: requests_per_minute.max(1) as usize,
            state: Mutex::new(LimiterState::default()),
        }
    }

    /// Suspend until the next call is allowed, then record it. The lock is
    /// held across the waits so prune/check/append happens as one atomic
    /// unit; concurrent callers queue behind the mutex. Only the waiting
    /// task suspends, never the runtime.
    pub async fn acquire(&self) {
        let mut state = self.state.lock().await;

        if let Some(last) = state.last_request {
            let since = last.elapsed();
            if since < self.min_gap {
                sleep(self.min_gap - since).await;
            }
        }

        let mut now = Instant::now();
        Self::prune(&mut state.window, now);
        while state.window.len() >= self.per_minute {
            if let Some(&oldest) = state.window.front() {
                sleep_until(oldest + WINDOW).await;
            }
            now = Instant::now();
            Self::prune(&mut state.window, now);
        }

        state.window.push_back(now);
        state.last_request = Some(now);
    }

    fn prune(window: &mut VecDeque<Instant>, now: Instant) {
        while let Some(&front) = window.front() {
            if now.duration_since(front) >= WINDOW {
                window.pop_front();
            } else {
                break;
            }
        }
    }
}
