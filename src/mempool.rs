// Mempool - One pending transaction per sender
//
// Admission is a single atomic insert into a concurrent set, so two
// simulations racing on the same sender cannot both be admitted.

use crate::types::AccountId;
use dashmap::DashSet;
use tracing::debug;

#[derive(Debug, Default)]
pub struct PendingSenders {
    senders: DashSet<AccountId>,
}

impl PendingSenders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check-and-set; `false` when the sender already has a pending transaction
    pub fn try_admit(&self, sender: AccountId) -> bool {
        let admitted = self.senders.insert(sender);
        if !admitted {
            debug!(%sender, "sender already pending");
        }
        admitted
    }

    /// Forget a sender once its transaction left the pool
    pub fn release(&self, sender: &AccountId) -> bool {
        self.senders.remove(sender).is_some()
    }

    /// Reset after a block is committed
    pub fn clear(&self) {
        self.senders.clear();
    }

    pub fn contains(&self, sender: &AccountId) -> bool {
        self.senders.contains(sender)
    }

    pub fn len(&self) -> usize {
        self.senders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.senders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_admit_once() {
        let pending = PendingSenders::new();
        let sender = AccountId::from_bytes([1u8; 32]);
        assert!(pending.try_admit(sender));
        assert!(!pending.try_admit(sender));
        assert!(pending.contains(&sender));

        assert!(pending.release(&sender));
        assert!(pending.try_admit(sender));
        pending.clear();
        assert!(pending.is_empty());
    }

    #[test]
    fn test_concurrent_admission_single_winner() {
        let pending = Arc::new(PendingSenders::new());
        let admitted = Arc::new(AtomicUsize::new(0));
        let sender = AccountId::from_bytes([7u8; 32]);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let pending = Arc::clone(&pending);
                let admitted = Arc::clone(&admitted);
                thread::spawn(move || {
                    if pending.try_admit(sender) {
                        admitted.fetch_add(1, Ordering::SeqCst);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(admitted.load(Ordering::SeqCst), 1);
        assert_eq!(pending.len(), 1);
    }
}
