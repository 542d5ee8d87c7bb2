use std::sync::Arc;

use stockbook_core::{OwnerId, TransactionKind};
use stockbook_events::{Event, EventBus, PostingEvent};
use stockbook_ledger::LedgerError;
use tokio::task;
use tracing::debug;

use crate::{PostingError, PostingReceipt, PostingRequest, PostingResult, TransactionPoster};

/// Async front for [`TransactionPoster`].
///
/// Each posting runs on a blocking worker; once started it commits or rolls
/// back as a whole even if the calling future is dropped.
#[derive(Clone)]
pub struct PostingService {
    poster: Arc<TransactionPoster>,
    bus: Arc<EventBus>,
}

impl PostingService {
    pub fn new(poster: TransactionPoster, bus: Arc<EventBus>) -> Self {
        Self {
            poster: Arc::new(poster),
            bus,
        }
    }

    pub fn poster(&self) -> &TransactionPoster {
        &self.poster
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    pub async fn purchase(
        &self,
        caller: Option<OwnerId>,
        request: PostingRequest,
    ) -> PostingResult<PostingReceipt> {
        self.submit(TransactionKind::Purchase, caller, request).await
    }

    pub async fn sale(
        &self,
        caller: Option<OwnerId>,
        request: PostingRequest,
    ) -> PostingResult<PostingReceipt> {
        self.submit(TransactionKind::Sale, caller, request).await
    }

    async fn submit(
        &self,
        kind: TransactionKind,
        caller: Option<OwnerId>,
        request: PostingRequest,
    ) -> PostingResult<PostingReceipt> {
        let poster = Arc::clone(&self.poster);
        let outcome = task::spawn_blocking(move || poster.post(kind, caller.as_ref(), &request))
            .await
            .map_err(|err| {
                PostingError::Server(LedgerError::InvalidState(format!(
                    "posting worker failed: {err}"
                )))
            })??;
        let receipt = outcome.receipt();
        debug!(transaction = %receipt.transaction_id, kind = %kind, "publishing posting event");
        self.bus.publish(Event::posted(PostingEvent {
            owner: outcome.transaction.owner.clone(),
            transaction: outcome.transaction,
            balance_after: outcome.inventory.balance,
        }));
        Ok(receipt)
    }
}
