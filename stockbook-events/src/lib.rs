use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use stockbook_core::{OwnerId, TransactionKind};
use stockbook_ledger::TransactionRecord;
use tokio::sync::broadcast;

/// A committed purchase or sale together with the balance it left behind.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingEvent {
    pub owner: OwnerId,
    pub transaction: TransactionRecord,
    pub balance_after: Decimal,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    Purchase(PostingEvent),
    Sale(PostingEvent),
}

impl Event {
    pub fn posted(event: PostingEvent) -> Self {
        match event.transaction.kind {
            TransactionKind::Purchase => Event::Purchase(event),
            TransactionKind::Sale => Event::Sale(event),
        }
    }

    pub fn posting(&self) -> &PostingEvent {
        match self {
            Event::Purchase(event) | Event::Sale(event) => event,
        }
    }
}

pub struct EventBus {
    sender: broadcast::Sender<Event>,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    pub fn subscribe(&self) -> EventStream {
        EventStream {
            receiver: self.sender.subscribe(),
        }
    }

    /// Deliver to current subscribers. Having none is not an error.
    pub fn publish(&self, event: Event) {
        let _ = self.sender.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}

pub struct EventStream {
    receiver: broadcast::Receiver<Event>,
}

impl EventStream {
    pub async fn recv(&mut self) -> Result<Event, broadcast::error::RecvError> {
        self.receiver.recv().await
    }
}
