//! Counters kept by the fan-out engine

use crate::trie::Delivery;

/// Engine-level statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Pipes currently attached
    pub attached_pipes: usize,
    /// Messages handed to `send`
    pub messages_sent: u64,
    /// Copies accepted by pipes
    pub copies_delivered: u64,
    /// Data messages no subscription matched
    pub dropped_no_match: u64,
    /// Pipes released from fan-out because they were congested
    pub congestion_releases: u64,
    /// Messages surfaced to the user by `recv`
    pub messages_received: u64,
    /// Subscribe/unsubscribe frames applied
    pub control_frames: u64,
    /// Inbound frames dropped as malformed or unexpected
    pub malformed_dropped: u64,
}

impl EngineStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Account for one outbound message
    pub fn record_delivery(&mut self, delivery: &Delivery) {
        self.messages_sent += 1;
        self.copies_delivered += delivery.recipients as u64;
        self.congestion_releases += delivery.released as u64;
    }

    /// Account for a data message nobody was subscribed to
    pub fn record_no_match(&mut self) {
        self.messages_sent += 1;
        self.dropped_no_match += 1;
    }

    /// Average copies per sent message
    pub fn fanout_ratio(&self) -> f64 {
        if self.messages_sent == 0 {
            0.0
        } else {
            self.copies_delivered as f64 / self.messages_sent as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_delivery() {
        let mut stats = EngineStats::new();
        stats.record_delivery(&Delivery {
            recipients: 3,
            released: 1,
        });
        stats.record_no_match();

        assert_eq!(stats.messages_sent, 2);
        assert_eq!(stats.copies_delivered, 3);
        assert_eq!(stats.congestion_releases, 1);
        assert_eq!(stats.dropped_no_match, 1);
        assert!((stats.fanout_ratio() - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_fanout_ratio_without_traffic() {
        assert_eq!(EngineStats::new().fanout_ratio(), 0.0);
    }
}
