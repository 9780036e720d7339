//! Per-thread scheduling-state intervals.
//!
//! `sched_switch`/`sched_wakeup` events record state change points; the
//! interval between two consecutive points carries the earlier point's state,
//! and the last interval is open-ended. Slice completion joins this data back
//! into the slice as the time it actually spent on-CPU.

/// Coarse thread scheduling state, mapped from a `prev_state` token.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SchedulingState {
    Running,
    Runnable,
    Sleeping,
    UninterruptibleSleep,
    Waking,
    Unknown,
}

impl SchedulingState {
    /// Map a `sched_switch` `prev_state` token (`R`, `R+`, `S`, `D|K`, ...).
    /// Only the leading byte matters; modifier suffixes are kernel detail.
    pub fn from_prev_state(token: &[u8]) -> Self {
        match token.first() {
            Some(b'R') => SchedulingState::Runnable,
            Some(b'S') => SchedulingState::Sleeping,
            Some(b'D') => SchedulingState::UninterruptibleSleep,
            _ => SchedulingState::Unknown,
        }
    }
}

/// One state change point. The state holds until the next point.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SchedStatePoint {
    pub timestamp: f64,
    pub state: SchedulingState,
}

#[derive(Debug, Default)]
pub struct SchedStateBuilder {
    points: Vec<SchedStatePoint>,
}

impl SchedStateBuilder {
    /// Record a state change at `timestamp`. Consecutive identical states
    /// collapse into the earlier point.
    pub fn switch_state(&mut self, timestamp: f64, state: SchedulingState) {
        if let Some(last) = self.points.last() {
            if last.state == state {
                return;
            }
        }
        self.points.push(SchedStatePoint { timestamp, state });
    }

    pub fn points(&self) -> &[SchedStatePoint] {
        &self.points
    }

    /// Total time spent `Running` inside `[start, end]`. The last recorded
    /// state is treated as extending to `end`.
    pub fn running_time_between(&self, start: f64, end: f64) -> f64 {
        if self.points.is_empty() || end <= start {
            return 0.0;
        }
        // First point that could overlap: the one in effect at `start`.
        let first = self
            .points
            .partition_point(|p| p.timestamp <= start)
            .saturating_sub(1);
        let mut total = 0.0;
        for (i, point) in self.points.iter().enumerate().skip(first) {
            if point.timestamp >= end {
                break;
            }
            if point.state != SchedulingState::Running {
                continue;
            }
            let until = self
                .points
                .get(i + 1)
                .map(|next| next.timestamp)
                .unwrap_or(end);
            let lo = point.timestamp.max(start);
            let hi = until.min(end);
            if hi > lo {
                total += hi - lo;
            }
        }
        total
    }
}
