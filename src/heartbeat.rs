//! Application-level keep-alive.
//!
//! While armed, a `ping` frame is due every interval. Pongs are only counted;
//! a missing pong never closes the connection. Dead connections are detected
//! by the transport's own close event.

use std::time::Duration;

use crate::timer::{Scheduler, TimerKind, TimerToken, TimerTokens};

pub const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeartbeatState {
    Idle,
    Armed { next_tick: TimerToken },
}

/// Ping/pong counters since the monitor was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeartbeatStats {
    pub pings_sent: u64,
    pub pongs_received: u64,
}

#[derive(Debug)]
pub struct HeartbeatMonitor {
    interval: Duration,
    state: HeartbeatState,
    stats: HeartbeatStats,
}

impl HeartbeatMonitor {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            state: HeartbeatState::Idle,
            stats: HeartbeatStats::default(),
        }
    }

    pub fn state(&self) -> HeartbeatState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        matches!(self.state, HeartbeatState::Armed { .. })
    }

    pub fn stats(&self) -> HeartbeatStats {
        self.stats
    }

    /// Arm the monitor, replacing any tick already scheduled.
    pub fn start(&mut self, scheduler: &mut impl Scheduler, tokens: &mut TimerTokens) {
        self.stop(scheduler);
        self.arm(scheduler, tokens);
    }

    /// Disarm and cancel the pending tick. Idempotent.
    pub fn stop(&mut self, scheduler: &mut impl Scheduler) {
        if let HeartbeatState::Armed { next_tick } = self.state {
            scheduler.cancel(next_tick);
            self.state = HeartbeatState::Idle;
        }
    }

    /// Handle a fired heartbeat timer.
    ///
    /// Returns `true` when a ping is due. Stale tokens (from a tick that was
    /// cancelled or replaced) return `false` and leave the schedule untouched.
    pub fn on_tick(
        &mut self,
        token: TimerToken,
        scheduler: &mut impl Scheduler,
        tokens: &mut TimerTokens,
    ) -> bool {
        match self.state {
            HeartbeatState::Armed { next_tick } if next_tick == token => {
                self.arm(scheduler, tokens);
                true
            }
            _ => false,
        }
    }

    pub fn record_ping(&mut self) {
        self.stats.pings_sent += 1;
    }

    pub fn record_pong(&mut self) {
        self.stats.pongs_received += 1;
    }

    fn arm(&mut self, scheduler: &mut impl Scheduler, tokens: &mut TimerTokens) {
        let next_tick = tokens.issue(TimerKind::Heartbeat);
        scheduler.schedule(next_tick, self.interval);
        self.state = HeartbeatState::Armed { next_tick };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingScheduler {
        scheduled: Vec<(TimerToken, Duration)>,
        cancelled: Vec<TimerToken>,
    }

    impl Scheduler for RecordingScheduler {
        fn schedule(&mut self, token: TimerToken, delay: Duration) {
            self.scheduled.push((token, delay));
        }

        fn cancel(&mut self, token: TimerToken) {
            self.cancelled.push(token);
        }
    }

    #[test]
    fn start_schedules_first_tick_at_interval() {
        let mut scheduler = RecordingScheduler::default();
        let mut tokens = TimerTokens::default();
        let mut hb = HeartbeatMonitor::new(Duration::from_secs(30));

        hb.start(&mut scheduler, &mut tokens);
        assert!(hb.is_armed());
        assert_eq!(scheduler.scheduled.len(), 1);
        assert_eq!(scheduler.scheduled[0].1, Duration::from_secs(30));
    }

    #[test]
    fn tick_rearms_and_requests_ping() {
        let mut scheduler = RecordingScheduler::default();
        let mut tokens = TimerTokens::default();
        let mut hb = HeartbeatMonitor::new(Duration::from_millis(5));

        hb.start(&mut scheduler, &mut tokens);
        let first = scheduler.scheduled[0].0;
        assert!(hb.on_tick(first, &mut scheduler, &mut tokens));
        assert_eq!(scheduler.scheduled.len(), 2);

        // the old token is now stale
        assert!(!hb.on_tick(first, &mut scheduler, &mut tokens));
        assert_eq!(scheduler.scheduled.len(), 2);
    }

    #[test]
    fn stop_is_idempotent() {
        let mut scheduler = RecordingScheduler::default();
        let mut tokens = TimerTokens::default();
        let mut hb = HeartbeatMonitor::new(Duration::from_secs(1));

        hb.stop(&mut scheduler);
        assert!(scheduler.cancelled.is_empty());

        hb.start(&mut scheduler, &mut tokens);
        hb.stop(&mut scheduler);
        hb.stop(&mut scheduler);
        assert_eq!(scheduler.cancelled.len(), 1);
        assert_eq!(hb.state(), HeartbeatState::Idle);
    }

    #[test]
    fn tick_after_stop_is_ignored() {
        let mut scheduler = RecordingScheduler::default();
        let mut tokens = TimerTokens::default();
        let mut hb = HeartbeatMonitor::new(Duration::from_secs(1));

        hb.start(&mut scheduler, &mut tokens);
        let token = scheduler.scheduled[0].0;
        hb.stop(&mut scheduler);
        assert!(!hb.on_tick(token, &mut scheduler, &mut tokens));
    }

    #[test]
    fn restart_cancels_previous_tick() {
        let mut scheduler = RecordingScheduler::default();
        let mut tokens = TimerTokens::default();
        let mut hb = HeartbeatMonitor::new(Duration::from_secs(1));

        hb.start(&mut scheduler, &mut tokens);
        let first = scheduler.scheduled[0].0;
        hb.start(&mut scheduler, &mut tokens);
        assert_eq!(scheduler.cancelled, vec![first]);
    }

    #[test]
    fn pongs_are_only_counted() {
        let mut hb = HeartbeatMonitor::new(Duration::from_secs(1));
        hb.record_ping();
        hb.record_pong();
        hb.record_pong();
        assert_eq!(
            hb.stats(),
            HeartbeatStats {
                pings_sent: 1,
                pongs_received: 2
            }
        );
    }
}
