//! Cancellable one-shot timers for the heartbeat and reconnection delays.
//!
//! The session never sleeps itself. It asks a [`Scheduler`] to deliver a
//! [`TimerToken`] back after a delay and compares the token when it fires, so
//! a timer that was cancelled (or replaced) after it had already fired is
//! recognised as stale and ignored.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerKind {
    Heartbeat,
    Reconnect,
}

/// Identity of one scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerToken {
    pub kind: TimerKind,
    pub generation: u64,
}

/// Issues tokens with strictly increasing generations.
#[derive(Debug, Default)]
pub struct TimerTokens {
    next: u64,
}

impl TimerTokens {
    pub fn issue(&mut self, kind: TimerKind) -> TimerToken {
        self.next += 1;
        TimerToken {
            kind,
            generation: self.next,
        }
    }
}

/// Host timer primitive.
pub trait Scheduler {
    /// Deliver `token` back to the session after `delay`.
    fn schedule(&mut self, token: TimerToken, delay: Duration);

    /// Cancel a pending timer. Cancelling an unknown or fired token is a no-op.
    fn cancel(&mut self, token: TimerToken);
}

/// [`Scheduler`] backed by `tokio::time::sleep` tasks.
///
/// Fired tokens are pushed into the driver's event queue; cancellation aborts
/// the sleeping task.
pub struct TokioScheduler<E> {
    events: mpsc::UnboundedSender<E>,
    pending: HashMap<TimerToken, JoinHandle<()>>,
}

impl<E> TokioScheduler<E> {
    pub fn new(events: mpsc::UnboundedSender<E>) -> Self {
        Self {
            events,
            pending: HashMap::new(),
        }
    }

    /// Number of timers that have not fired or been cancelled yet.
    pub fn pending(&self) -> usize {
        self.pending.values().filter(|h| !h.is_finished()).count()
    }
}

impl<E> Scheduler for TokioScheduler<E>
where
    E: From<TimerToken> + Send + 'static,
{
    fn schedule(&mut self, token: TimerToken, delay: Duration) {
        self.pending.retain(|_, handle| !handle.is_finished());

        let events = self.events.clone();
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = events.send(E::from(token));
        });
        if let Some(previous) = self.pending.insert(token, handle) {
            previous.abort();
        }
    }

    fn cancel(&mut self, token: TimerToken) {
        if let Some(handle) = self.pending.remove(&token) {
            handle.abort();
        }
    }
}

impl<E> Drop for TokioScheduler<E> {
    fn drop(&mut self) {
        for (_, handle) in self.pending.drain() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_unique_per_issue() {
        let mut tokens = TimerTokens::default();
        let a = tokens.issue(TimerKind::Heartbeat);
        let b = tokens.issue(TimerKind::Heartbeat);
        assert_ne!(a, b);
        assert!(b.generation > a.generation);
    }

    #[tokio::test(start_paused = true)]
    async fn scheduled_token_is_delivered_after_delay() {
        let (tx, mut rx) = mpsc::unbounded_channel::<TimerToken>();
        let mut scheduler = TokioScheduler::new(tx);
        let token = TimerTokens::default().issue(TimerKind::Reconnect);

        scheduler.schedule(token, Duration::from_secs(2));
        tokio::time::sleep(Duration::from_millis(1_999)).await;
        assert!(rx.try_recv().is_err());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(rx.recv().await, Some(token));
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_token_never_fires() {
        let (tx, mut rx) = mpsc::unbounded_channel::<TimerToken>();
        let mut scheduler = TokioScheduler::new(tx);
        let token = TimerTokens::default().issue(TimerKind::Heartbeat);

        scheduler.schedule(token, Duration::from_secs(1));
        scheduler.cancel(token);
        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(rx.try_recv().is_err());
        assert_eq!(scheduler.pending(), 0);
    }
}
