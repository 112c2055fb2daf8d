use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct LedgerState {
    sent: HashSet<String>,
    in_flight: HashSet<String>,
}

/// Process-lifetime record of confirmation SMS already delivered, keyed by
/// recipient and transaction id.
///
/// A key is reserved before sending so concurrent checkouts for the same
/// transaction cannot both send; it only becomes "sent" once the provider
/// accepted the message.
#[derive(Clone, Default)]
pub struct SmsLedger {
    inner: Arc<Mutex<LedgerState>>,
}

pub fn ledger_key(recipient: &str, transaction_id: &str) -> String {
    format!("{recipient}__{transaction_id}")
}

impl SmsLedger {
    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// `None` when the key was already sent or is being sent right now.
    pub fn reserve(&self, key: &str) -> Option<Reservation> {
        let mut state = self.state();
        if state.sent.contains(key) || state.in_flight.contains(key) {
            return None;
        }
        state.in_flight.insert(key.to_string());
        Some(Reservation {
            ledger: self.clone(),
            key: key.to_string(),
            committed: false,
        })
    }

    pub fn was_sent(&self, key: &str) -> bool {
        self.state().sent.contains(key)
    }

    pub fn sent_count(&self) -> usize {
        self.state().sent.len()
    }
}

/// Held while an SMS is in flight. Dropping it without [`Reservation::commit`]
/// frees the key so a later checkout may retry.
pub struct Reservation {
    ledger: SmsLedger,
    key: String,
    committed: bool,
}

impl Reservation {
    pub fn commit(mut self) {
        let mut state = self.ledger.state();
        state.in_flight.remove(&self.key);
        state.sent.insert(self.key.clone());
        self.committed = true;
    }
}

impl Drop for Reservation {
    fn drop(&mut self) {
        if !self.committed {
            self.ledger.state().in_flight.remove(&self.key);
        }
    }
}
