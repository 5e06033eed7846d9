//! # Channel Fan-out
//!
//! Tells every connected OTA channel about a new booking or rate change.
//!
//! ## Delivery Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Fan-out for one event                                │
//! │                                                                         │
//! │  notify("mmt-1718000000000-0")                                         │
//! │       │                                                                 │
//! │       ├── MMT          connected           → pending ─(1-3s)─► success │
//! │       ├── Booking.com  connected, stopped  → stopped (nothing sent)    │
//! │       └── Expedia      disconnected        → skipped                   │
//! │                                                                         │
//! │  Every delivery is its own task: independent latency, independent      │
//! │  outcome. Nothing waits for them; each reports a ChannelUpdate event   │
//! │  and writes the status into the event's channel_sync map.              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Status writes are system-originated: they never bump a booking's
//! version and never produce a persist.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use stayline_core::command::record_channel_status;
use stayline_core::{BookingStore, ChannelStatus};
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, info, warn};

use crate::config::FanoutSettings;
use crate::event::DeskEvent;

/// Decides whether a simulated delivery fails.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FailurePolicy {
    /// Fails with the given probability.
    Random { rate: f64 },
    Never,
    Always,
}

impl FailurePolicy {
    fn fails(&self) -> bool {
        match *self {
            FailurePolicy::Random { rate } => rand::thread_rng().gen_bool(rate.clamp(0.0, 1.0)),
            FailurePolicy::Never => false,
            FailurePolicy::Always => true,
        }
    }
}

/// Fire-and-forget channel notifier.
#[derive(Clone)]
pub struct ChannelNotifier {
    settings: FanoutSettings,
    policy: FailurePolicy,
    store: Arc<Mutex<BookingStore>>,
    events: mpsc::Sender<DeskEvent>,
}

impl ChannelNotifier {
    pub fn new(settings: FanoutSettings, store: Arc<Mutex<BookingStore>>, events: mpsc::Sender<DeskEvent>) -> Self {
        let policy = FailurePolicy::Random {
            rate: settings.failure_rate,
        };
        ChannelNotifier {
            settings,
            policy,
            store,
            events,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Starts delivery of `event_id` (a booking or rate update id) to every
    /// connected channel. Returns the channel names targeted, including
    /// stopped ones.
    pub async fn notify(&self, event_id: &str) -> Vec<String> {
        if !self.settings.enabled {
            return Vec::new();
        }

        let targets: Vec<(String, bool)> = {
            let mut store = self.store.lock().await;
            let targets: Vec<(String, bool)> = store
                .connections()
                .iter()
                .filter(|c| c.is_connected())
                .map(|c| (c.name.clone(), c.is_stopped))
                .collect();
            for (channel, stopped) in &targets {
                let status = if *stopped {
                    ChannelStatus::Stopped
                } else {
                    ChannelStatus::Pending
                };
                if !record(&mut store, event_id, channel, status) {
                    warn!(event_id = %event_id, "Fan-out for an event the store does not hold");
                    return Vec::new();
                }
            }
            targets
        };

        for (channel, stopped) in &targets {
            if *stopped {
                debug!(event_id = %event_id, channel = %channel, "Stop-sell on, not sending");
                self.report(event_id, channel, ChannelStatus::Stopped).await;
                continue;
            }

            let delay = self.draw_latency();
            let failed = self.policy.fails();
            let notifier = self.clone();
            let event_id = event_id.to_string();
            let channel = channel.clone();
            tokio::spawn(async move {
                tokio::time::sleep(delay).await;
                let status = if failed {
                    ChannelStatus::Error
                } else {
                    ChannelStatus::Success
                };
                let recorded = {
                    let mut store = notifier.store.lock().await;
                    record(&mut store, &event_id, &channel, status)
                };
                if recorded {
                    notifier.report(&event_id, &channel, status).await;
                } else {
                    debug!(event_id = %event_id, "Event gone before delivery finished");
                }
            });
        }

        info!(event_id = %event_id, channels = targets.len(), "Channel fan-out started");
        targets.into_iter().map(|(name, _)| name).collect()
    }

    fn draw_latency(&self) -> Duration {
        let (min, max) = (self.settings.min_latency_ms, self.settings.max_latency_ms);
        let ms = if min >= max {
            min
        } else {
            rand::thread_rng().gen_range(min..=max)
        };
        Duration::from_millis(ms)
    }

    async fn report(&self, event_id: &str, channel: &str, status: ChannelStatus) {
        if status == ChannelStatus::Error {
            warn!(event_id = %event_id, channel = %channel, "Channel delivery failed");
        }
        let event = DeskEvent::ChannelUpdate {
            event_id: event_id.to_string(),
            channel: channel.to_string(),
            status,
        };
        if self.events.send(event).await.is_err() {
            debug!("No one is listening for desk events");
        }
    }
}

/// Writes `status` into the booking or rate update named `event_id`.
fn record(store: &mut BookingStore, event_id: &str, channel: &str, status: ChannelStatus) -> bool {
    if store.booking(event_id).is_some() {
        return record_channel_status(store, event_id, channel, status).is_ok();
    }
    match store.rate_update_mut(event_id) {
        Some(rate) => {
            rate.channel_sync.insert(channel.to_string(), status);
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{booking, store};

    fn settings() -> FanoutSettings {
        FanoutSettings {
            enabled: true,
            min_latency_ms: 1000,
            max_latency_ms: 3000,
            failure_rate: 0.0,
        }
    }

    fn notifier(policy: FailurePolicy) -> (ChannelNotifier, Arc<Mutex<BookingStore>>, mpsc::Receiver<DeskEvent>) {
        let mut s = store();
        s.upsert_booking(booking("b-1", "101", "2024-06-01", "2024-06-03"));
        let store = Arc::new(Mutex::new(s));
        let (tx, rx) = mpsc::channel(16);
        let notifier = ChannelNotifier::new(settings(), store.clone(), tx).with_policy(policy);
        (notifier, store, rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_connected_channels_only_and_stop_sell() {
        let (notifier, store, mut rx) = notifier(FailurePolicy::Never);

        let targets = notifier.notify("b-1").await;
        assert_eq!(targets, vec!["MMT".to_string(), "Booking.com".to_string()]);

        {
            let store = store.lock().await;
            let sync = &store.booking("b-1").unwrap().channel_sync;
            assert_eq!(sync.get("MMT"), Some(&ChannelStatus::Pending));
            assert_eq!(sync.get("Booking.com"), Some(&ChannelStatus::Stopped));
            assert!(!sync.contains_key("Expedia"));
        }

        // Stopped is reported at once, the delivery after its latency
        assert_eq!(
            rx.recv().await.unwrap(),
            DeskEvent::ChannelUpdate {
                event_id: "b-1".into(),
                channel: "Booking.com".into(),
                status: ChannelStatus::Stopped
            }
        );
        let started = tokio::time::Instant::now();
        assert_eq!(
            rx.recv().await.unwrap(),
            DeskEvent::ChannelUpdate {
                event_id: "b-1".into(),
                channel: "MMT".into(),
                status: ChannelStatus::Success
            }
        );
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(1000) && waited <= Duration::from_millis(3000));

        let store = store.lock().await;
        assert_eq!(
            store.booking("b-1").unwrap().channel_sync.get("MMT"),
            Some(&ChannelStatus::Success)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_delivery_reports_error_without_version_bump() {
        let (notifier, store, mut rx) = notifier(FailurePolicy::Always);
        let before = store.lock().await.booking("b-1").unwrap().timestamp;

        notifier.notify("b-1").await;
        let _stopped = rx.recv().await.unwrap();
        let update = rx.recv().await.unwrap();
        assert!(update.is_failure());

        let store = store.lock().await;
        let b = store.booking("b-1").unwrap();
        assert_eq!(b.channel_sync.get("MMT"), Some(&ChannelStatus::Error));
        assert_eq!(b.timestamp, before);
    }

    #[tokio::test]
    async fn test_disabled_or_unknown_event_sends_nothing() {
        let (notifier, _store, _rx) = notifier(FailurePolicy::Never);
        assert!(notifier.notify("ghost").await.is_empty());

        let mut off = settings();
        off.enabled = false;
        let (tx, _rx) = mpsc::channel(1);
        let disabled = ChannelNotifier::new(off, Arc::new(Mutex::new(store())), tx);
        assert!(disabled.notify("b-1").await.is_empty());
    }

    #[test]
    fn test_failure_policy_extremes() {
        assert!(!FailurePolicy::Random { rate: 0.0 }.fails());
        assert!(FailurePolicy::Random { rate: 1.0 }.fails());
        assert!(!FailurePolicy::Never.fails());
    }
}
