//! Chain event notifications
//!
//! Stages report parameter changes and seek discontinuities through a
//! cloneable `Notifier` handle; the chain hands out the matching receiver
//! for telemetry/UI sync.

use crossbeam_channel::{unbounded, Receiver, Sender};

/// Events emitted by the filter chain and its stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainEvent {
    /// A stage's parameters changed.
    Reconfigured { stage: &'static str },
    /// A discontinuous seek happened; downstream consumers should flush and
    /// resynchronize.
    Seek {
        position_ms: u64,
        sample: u64,
        byte_offset: u64,
    },
}

/// Cloneable handle stages use to report events.
///
/// A disconnected notifier (the default) drops every event, so stages can be
/// used standalone without a chain.
#[derive(Debug, Clone, Default)]
pub struct Notifier {
    tx: Option<Sender<ChainEvent>>,
}

impl Notifier {
    /// Create a connected notifier and its receiving end.
    pub fn channel() -> (Self, Receiver<ChainEvent>) {
        let (tx, rx) = unbounded();
        (Self { tx: Some(tx) }, rx)
    }

    /// A notifier that drops every event.
    pub fn disconnected() -> Self {
        Self::default()
    }

    /// Report a stage reconfiguration.
    pub fn reconfigured(&self, stage: &'static str) {
        self.send(ChainEvent::Reconfigured { stage });
    }

    /// Report a discontinuous seek.
    pub fn seek(&self, position_ms: u64, sample: u64, byte_offset: u64) {
        self.send(ChainEvent::Seek {
            position_ms,
            sample,
            byte_offset,
        });
    }

    fn send(&self, event: ChainEvent) {
        if let Some(tx) = &self.tx {
            // The receiver may already be gone during teardown; dropping the
            // event is fine.
            let _ = tx.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connected_notifier_delivers_events() {
        let (notifier, rx) = Notifier::channel();
        notifier.reconfigured("volume");
        notifier.seek(500, 48000, 96000);

        assert_eq!(rx.recv().unwrap(), ChainEvent::Reconfigured { stage: "volume" });
        assert_eq!(
            rx.recv().unwrap(),
            ChainEvent::Seek {
                position_ms: 500,
                sample: 48000,
                byte_offset: 96000
            }
        );
    }

    #[test]
    fn test_disconnected_notifier_drops_events() {
        let notifier = Notifier::disconnected();
        notifier.reconfigured("equalizer");
    }

    #[test]
    fn test_dropped_receiver_does_not_panic() {
        let (notifier, rx) = Notifier::channel();
        drop(rx);
        notifier.reconfigured("reverb");
    }
}
