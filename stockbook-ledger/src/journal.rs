use chrono::{DateTime, Utc};
use stockbook_core::{Commodity, Counterparty, OwnerId, PostingAmounts, TransactionKind};
use uuid::Uuid;

use crate::TransactionRecord;

/// Context required to derive the transaction record for a posting.
pub struct PostingContext<'a> {
    pub owner: &'a OwnerId,
    pub kind: TransactionKind,
    pub commodity: &'a Commodity,
    pub counterparty: &'a Counterparty,
    pub amounts: PostingAmounts,
    pub note: Option<&'a str>,
    pub event_time: Option<DateTime<Utc>>,
}

impl<'a> PostingContext<'a> {
    pub fn new(
        owner: &'a OwnerId,
        kind: TransactionKind,
        commodity: &'a Commodity,
        counterparty: &'a Counterparty,
        amounts: PostingAmounts,
    ) -> Self {
        Self {
            owner,
            kind,
            commodity,
            counterparty,
            amounts,
            note: None,
            event_time: None,
        }
    }

    pub fn with_note(mut self, note: Option<&'a str>) -> Self {
        self.note = note;
        self
    }

    pub fn with_event_time(mut self, event_time: Option<DateTime<Utc>>) -> Self {
        self.event_time = event_time;
        self
    }
}

/// Build the immutable record for a posting, snapshotting commodity and
/// counterparty details as they are at `written_at`.
pub fn record_from_posting(
    ctx: PostingContext<'_>,
    written_at: DateTime<Utc>,
) -> TransactionRecord {
    let note = ctx
        .note
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string);
    TransactionRecord {
        id: Uuid::new_v4(),
        owner: ctx.owner.clone(),
        kind: ctx.kind,
        commodity_id: ctx.commodity.id.clone(),
        commodity_name: ctx.commodity.name.clone(),
        unit: ctx.commodity.unit.clone(),
        quantity: ctx.amounts.quantity,
        rate: ctx.amounts.rate,
        total: ctx.amounts.total,
        secondary_quantity: ctx.commodity.unit.secondary_quantity(ctx.amounts.quantity),
        counterparty_id: ctx.counterparty.id.clone(),
        counterparty: ctx.counterparty.snapshot(),
        note,
        event_time: ctx.event_time.unwrap_or(written_at),
        created_at: written_at,
    }
}
