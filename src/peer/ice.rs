use crate::peer::types::IceCandidate;

/// Remote candidates that arrived before the remote description.
///
/// Candidates are held in arrival order and drained exactly once when the
/// remote description is set. Teardown or connection recreation discards the
/// queue wholesale: candidates belong to the connection they were received
/// for and must never be replayed into a fresh one.
#[derive(Debug, Default)]
pub struct PendingCandidateQueue {
    items: Vec<IceCandidate>,
}

impl PendingCandidateQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, candidate: IceCandidate) {
        self.items.push(candidate);
    }

    /// Takes every queued candidate, FIFO, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<IceCandidate> {
        self.items.drain(..).collect()
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cand(n: u32) -> IceCandidate {
        IceCandidate {
            candidate: format!("candidate:{n} 1 udp 1 192.0.2.{n} 5000 typ host"),
            sdp_mid: Some("0".into()),
            sdp_mline_index: Some(0),
        }
    }

    #[test]
    fn drain_preserves_arrival_order_and_empties() {
        let mut q = PendingCandidateQueue::new();
        q.push(cand(1));
        q.push(cand(2));
        q.push(cand(3));
        assert_eq!(q.len(), 3);

        let drained = q.drain();
        assert_eq!(
            drained.iter().map(|c| &c.candidate).collect::<Vec<_>>(),
            vec![&cand(1).candidate, &cand(2).candidate, &cand(3).candidate]
        );
        assert!(q.is_empty());

        // A second drain yields nothing.
        assert!(q.drain().is_empty());
    }

    #[test]
    fn clear_discards_everything() {
        let mut q = PendingCandidateQueue::new();
        q.push(cand(1));
        q.clear();
        assert!(q.is_empty());
    }
}
