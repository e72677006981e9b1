//! The client-facing live channel.

use tokio::sync::mpsc;
use turnwise_types::ChannelEvent;

/// Sending half of the live channel.
///
/// Closing the receiver is how a client cancels: the orchestrator checks
/// [`LiveChannel::is_closed`] before every call and stops forwarding once
/// sends start failing.
#[derive(Debug, Clone)]
pub struct LiveChannel {
    tx: mpsc::UnboundedSender<ChannelEvent>,
}

impl LiveChannel {
    /// Wrap an existing sender.
    #[must_use]
    pub fn new(tx: mpsc::UnboundedSender<ChannelEvent>) -> Self {
        Self { tx }
    }

    /// Send one event. Returns `false` if the client has gone away.
    pub fn send(&self, event: ChannelEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    /// Whether the client has gone away.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// A connected live channel and its receiving half.
#[must_use]
pub fn channel() -> (LiveChannel, mpsc::UnboundedReceiver<ChannelEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (LiveChannel::new(tx), rx)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_fails_after_receiver_drops() {
        let (live, mut rx) = channel();
        assert!(live.send(ChannelEvent::Done { truncated: false }));
        assert_eq!(rx.try_recv().unwrap(), ChannelEvent::Done { truncated: false });
        drop(rx);
        assert!(live.is_closed());
        assert!(!live.send(ChannelEvent::Done { truncated: false }));
    }
}
