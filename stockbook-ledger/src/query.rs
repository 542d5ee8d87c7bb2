use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use stockbook_core::{CommodityId, TransactionKind};

use crate::TransactionRecord;

pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 500;

/// Filter describing which of an owner's transactions to load.
#[derive(Clone, Debug, Default)]
pub struct TransactionQuery {
    pub kind: Option<TransactionKind>,
    pub commodity: Option<CommodityId>,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    /// Substring matched against commodity name, counterparty name and event date.
    pub search: Option<String>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

impl TransactionQuery {
    pub fn with_kind(mut self, kind: TransactionKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_commodity(mut self, commodity: CommodityId) -> Self {
        self.commodity = Some(commodity);
        self
    }

    /// The range only applies when both bounds are present.
    pub fn with_time_range(
        mut self,
        start: Option<DateTime<Utc>>,
        end: Option<DateTime<Utc>>,
    ) -> Self {
        self.start_time = start;
        self.end_time = end;
        self
    }

    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    pub fn with_page(mut self, page: usize) -> Self {
        self.page = Some(page);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub(crate) fn time_range(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some((start, end)),
            _ => None,
        }
    }

    pub(crate) fn search_term(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
    }

    pub(crate) fn effective_page(&self) -> usize {
        self.page.unwrap_or(1).max(1)
    }

    pub(crate) fn effective_limit(&self) -> usize {
        self.limit
            .unwrap_or(DEFAULT_PAGE_LIMIT)
            .clamp(1, MAX_PAGE_LIMIT)
    }

    pub(crate) fn offset(&self) -> usize {
        (self.effective_page() - 1) * self.effective_limit()
    }
}

/// One page of transactions plus the totals needed to paginate further.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionPage {
    pub data: Vec<TransactionRecord>,
    pub page: usize,
    pub limit: usize,
    pub total_records: u64,
    pub total_pages: u64,
}

impl TransactionPage {
    pub(crate) fn new(
        data: Vec<TransactionRecord>,
        query: &TransactionQuery,
        total_records: u64,
    ) -> Self {
        let limit = query.effective_limit();
        Self {
            data,
            page: query.effective_page(),
            limit,
            total_records,
            total_pages: total_records.div_ceil(limit as u64),
        }
    }
}
