//! Purchase and sale posting: request validation, amount derivation and the
//! atomic write of a transaction with its inventory and rate effects.

mod amounts;
mod error;
mod master;
mod poster;
mod request;
mod service;

pub use amounts::{
    resolve_amounts, AmountInputs, ConsistencyMode, DEFAULT_TOLERANCE, MAX_TOTAL, MAX_UNIT_VALUE,
};
pub use error::{PostingError, PostingResult};
pub use master::{is_valid_email, is_valid_phone, patch_counterparty, register_counterparty};
pub use poster::TransactionPoster;
pub use request::{PostingOutcome, PostingReceipt, PostingRequest};
pub use service::PostingService;
