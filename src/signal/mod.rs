//! Event synchronization primitive
//!
//! Orchestration steps must not race ahead of asynchronous UI-side effects:
//! after a backend step mutates data, the next step has to see the refreshed
//! sheet. [`SignalBus`] is a typed publish/subscribe channel the host emits
//! completion signals into, and [`SignalBus::await_signal`] is the blocking
//! side: first matching signal wins, or a timeout outcome after `timeout`.
//!
//! The subscription is a broadcast receiver owned by the awaiting call, so
//! it is released exactly once on every exit path (resolution, timeout, or
//! caller cancellation) when the receiver drops.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::broadcast;
use tokio::time::Instant;

/// Default wait for an external completion signal.
pub const DEFAULT_SIGNAL_TIMEOUT: Duration = Duration::from_millis(15_000);

/// Signal name the engine emits after applying refreshed data.
pub const SHEET_REFRESH_SIGNAL: &str = "sheet-data-refreshed";

/// A named completion signal with an arbitrary JSON payload.
#[derive(Debug, Clone)]
pub struct Signal {
    pub name: String,
    pub payload: Value,
}

/// Outcome of waiting for a signal.
#[derive(Debug, Clone, PartialEq)]
pub enum SignalOutcome {
    Fired(Value),
    TimedOut,
}

impl SignalOutcome {
    pub fn timed_out(&self) -> bool {
        matches!(self, SignalOutcome::TimedOut)
    }
}

/// In-process typed pub/sub over a tokio broadcast channel.
#[derive(Clone)]
pub struct SignalBus {
    tx: broadcast::Sender<Signal>,
}

impl SignalBus {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a signal. Having no waiters is not an error.
    pub fn emit(&self, name: &str, payload: Value) {
        let _ = self.tx.send(Signal {
            name: name.to_string(),
            payload,
        });
    }

    /// Wait for the first signal with the given name, up to `timeout`.
    ///
    /// Only signals emitted after this call subscribes are observed; a
    /// signal that fires after the timeout has resolved goes nowhere.
    pub async fn await_signal(&self, name: &str, timeout: Duration) -> SignalOutcome {
        let mut rx = self.tx.subscribe();
        let deadline = Instant::now() + timeout;

        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return SignalOutcome::TimedOut;
            }
            match tokio::time::timeout(remaining, rx.recv()).await {
                Ok(Ok(signal)) if signal.name == name => {
                    return SignalOutcome::Fired(signal.payload);
                }
                // Some other signal; keep waiting within the same deadline.
                Ok(Ok(_)) => continue,
                Ok(Err(broadcast::error::RecvError::Lagged(_))) => continue,
                Ok(Err(broadcast::error::RecvError::Closed)) => {
                    return SignalOutcome::TimedOut;
                }
                Err(_) => return SignalOutcome::TimedOut,
            }
        }
    }

    /// Number of live subscriptions, visible for leak checks.
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for SignalBus {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_signal_resolves_with_payload() {
        let bus = SignalBus::default();
        let waiter = {
            let bus = bus.clone();
            tokio::spawn(async move {
                bus.await_signal("refresh", Duration::from_millis(500)).await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        bus.emit("refresh", json!({"rows": 10}));

        let outcome = waiter.await.unwrap();
        assert_eq!(outcome, SignalOutcome::Fired(json!({"rows": 10})));
    }

    #[tokio::test]
    async fn test_other_signals_do_not_resolve() {
        let bus = SignalBus::default();
        let waiter = {
            let bus = bus.clone();
            tokio::spawn(async move {
                bus.await_signal("refresh", Duration::from_millis(100)).await
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        bus.emit("unrelated", json!(1));

        assert!(waiter.await.unwrap().timed_out());
    }

    #[tokio::test]
    async fn test_timeout_releases_subscription_before_late_fire() {
        let bus = SignalBus::default();
        let outcome = bus.await_signal("refresh", Duration::from_millis(10)).await;
        assert!(outcome.timed_out());
        assert_eq!(bus.subscriber_count(), 0);

        // The late signal has nowhere to go and must not panic or resolve
        // anything a second time.
        bus.emit("refresh", json!(null));
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_emit_without_waiters_is_ok() {
        let bus = SignalBus::default();
        bus.emit("refresh", json!(true));
    }
}
