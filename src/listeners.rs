use billing_core::{BillCommitted, CommitListener};
use tracing::debug;

/// Fan-out of [`BillCommitted`] events to every subscribed listener, in subscription order.
#[derive(Default)]
pub struct CommitListeners {
    listeners: Vec<Box<dyn CommitListener>>,
}

impl CommitListeners {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, listener: Box<dyn CommitListener>) {
        self.listeners.push(listener);
    }

    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    pub fn notify(&self, event: &BillCommitted) {
        if self.is_empty() {
            debug!(bill_id = event.bill.id, "no commit listeners subscribed");
            return;
        }
        debug!(
            bill_id = event.bill.id,
            listeners = self.len(),
            "publishing bill committed"
        );
        for listener in &self.listeners {
            listener.bill_committed(event);
        }
    }
}
