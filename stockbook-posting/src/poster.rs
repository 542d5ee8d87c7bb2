use std::sync::Arc;

use stockbook_core::{Commodity, Counterparty, OwnerId, PostingAmounts, TransactionKind};
use stockbook_ledger::{
    record_from_posting, CommodityCatalog, CounterpartyDirectory, PostingContext, SqliteStore,
};
use tracing::{error, info, warn};

use crate::{
    resolve_amounts, ConsistencyMode, PostingError, PostingOutcome, PostingReceipt,
    PostingRequest, PostingResult,
};

/// Validates purchase and sale requests and writes each one, together with
/// its inventory and rate effects, as a single atomic unit.
pub struct TransactionPoster {
    store: SqliteStore,
    catalog: Arc<dyn CommodityCatalog>,
    directory: Arc<dyn CounterpartyDirectory>,
    consistency: ConsistencyMode,
}

struct ValidatedPosting<'a> {
    owner: &'a OwnerId,
    kind: TransactionKind,
    commodity: Commodity,
    counterparty: Counterparty,
    amounts: PostingAmounts,
}

impl TransactionPoster {
    /// Poster whose catalog and directory are the store's own tables.
    pub fn new(store: SqliteStore) -> Self {
        let catalog: Arc<dyn CommodityCatalog> = Arc::new(store.clone());
        let directory: Arc<dyn CounterpartyDirectory> = Arc::new(store.clone());
        Self::with_collaborators(store, catalog, directory)
    }

    pub fn with_collaborators(
        store: SqliteStore,
        catalog: Arc<dyn CommodityCatalog>,
        directory: Arc<dyn CounterpartyDirectory>,
    ) -> Self {
        Self {
            store,
            catalog,
            directory,
            consistency: ConsistencyMode::default(),
        }
    }

    pub fn with_consistency(mut self, consistency: ConsistencyMode) -> Self {
        self.consistency = consistency;
        self
    }

    pub fn store(&self) -> &SqliteStore {
        &self.store
    }

    pub fn post_purchase(
        &self,
        caller: Option<&OwnerId>,
        request: &PostingRequest,
    ) -> PostingResult<PostingReceipt> {
        self.post(TransactionKind::Purchase, caller, request)
            .map(|outcome| outcome.receipt())
    }

    pub fn post_sale(
        &self,
        caller: Option<&OwnerId>,
        request: &PostingRequest,
    ) -> PostingResult<PostingReceipt> {
        self.post(TransactionKind::Sale, caller, request)
            .map(|outcome| outcome.receipt())
    }

    /// Validate and commit one posting, returning the rows it wrote.
    pub fn post(
        &self,
        kind: TransactionKind,
        caller: Option<&OwnerId>,
        request: &PostingRequest,
    ) -> PostingResult<PostingOutcome> {
        let result = self
            .validate(kind, caller, request)
            .and_then(|validated| self.commit(validated, request));
        match &result {
            Ok(outcome) => info!(
                owner = %outcome.transaction.owner,
                kind = %kind,
                commodity = %outcome.transaction.commodity_id,
                transaction = %outcome.transaction.id,
                quantity = %outcome.transaction.quantity,
                balance = %outcome.inventory.balance,
                "posting committed"
            ),
            Err(err) if err.is_server() => error!(
                owner = ?caller.map(OwnerId::as_str),
                kind = %kind,
                commodity = ?request.commodity_id.as_ref().map(|id| id.as_str()),
                transient = err.is_transient(),
                error = %err,
                "posting failed"
            ),
            Err(err) => warn!(
                owner = ?caller.map(OwnerId::as_str),
                kind = %kind,
                commodity = ?request.commodity_id.as_ref().map(|id| id.as_str()),
                error = %err,
                "posting rejected"
            ),
        }
        result
    }

    /// Every check that needs no write lock, in the order callers rely on.
    fn validate<'a>(
        &self,
        kind: TransactionKind,
        caller: Option<&'a OwnerId>,
        request: &PostingRequest,
    ) -> PostingResult<ValidatedPosting<'a>> {
        let owner = caller
            .filter(|owner| !owner.is_blank())
            .ok_or(PostingError::Unauthorized)?;

        let counterparty_kind = kind.counterparty_kind();
        let commodity_id = request
            .commodity_id
            .as_ref()
            .filter(|id| !id.is_blank())
            .ok_or_else(|| PostingError::validation("commodityId is required"))?;
        let counterparty_id = request
            .counterparty_id
            .as_ref()
            .filter(|id| !id.is_blank())
            .ok_or_else(|| PostingError::validation(format!("{counterparty_kind}Id is required")))?;

        let counterparty = self
            .directory
            .lookup(owner, counterparty_kind, counterparty_id)?
            .ok_or_else(|| PostingError::not_found(counterparty_kind.as_str(), counterparty_id))?;

        let amounts = resolve_amounts(request.amount_inputs(), self.consistency)?;

        let commodity = self
            .catalog
            .lookup(commodity_id)?
            .ok_or_else(|| PostingError::not_found("commodity", commodity_id))?;

        Ok(ValidatedPosting {
            owner,
            kind,
            commodity,
            counterparty,
            amounts,
        })
    }

    fn commit(
        &self,
        posting: ValidatedPosting<'_>,
        request: &PostingRequest,
    ) -> PostingResult<PostingOutcome> {
        let ValidatedPosting {
            owner,
            kind,
            commodity,
            counterparty,
            amounts,
        } = posting;

        self.store.write(|unit| -> PostingResult<PostingOutcome> {
            let inventory = unit.inventory();
            if kind == TransactionKind::Sale {
                let stock = inventory
                    .get_balance(owner, &commodity.id)?
                    .ok_or_else(|| PostingError::validation("no stock to sell"))?;
                if amounts.quantity > stock.balance {
                    return Err(PostingError::InsufficientStock {
                        available: stock.balance,
                        requested: amounts.quantity,
                    });
                }
            }

            let ctx = PostingContext::new(owner, kind, &commodity, &counterparty, amounts)
                .with_note(request.note.as_deref())
                .with_event_time(request.event_time);
            let transaction = record_from_posting(ctx, unit.now());
            unit.append(&transaction)?;

            let balance = match kind {
                TransactionKind::Purchase => inventory.apply_purchase(
                    owner,
                    &commodity.id,
                    &commodity.name,
                    &commodity.unit,
                    amounts.quantity,
                )?,
                TransactionKind::Sale => {
                    inventory.apply_sale(owner, &commodity.id, amounts.quantity)?
                }
            };

            unit.rates().record(
                kind.price_side(),
                owner,
                &commodity.id,
                &commodity.name,
                amounts.rate,
            )?;

            Ok(PostingOutcome {
                transaction,
                inventory: balance,
            })
        })
    }
}
