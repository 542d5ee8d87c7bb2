mod common;

use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;
use rust_decimal_macros::dec;
use stockbook_ledger::{LedgerResult, SqliteStore, TransactionQuery};
use stockbook_posting::{PostingError, TransactionPoster};

use common::Desk;

#[test]
fn parallel_sales_never_oversell() -> Result<()> {
    let desk = Desk::open()?;
    desk.poster
        .post_purchase(Some(&desk.owner), &desk.purchase(&desk.wheat, dec!(50), dec!(40)))?;

    let store = SqliteStore::with_busy_timeout(
        desk.store().path().to_path_buf(),
        Duration::from_secs(30),
    )?;
    let poster = Arc::new(TransactionPoster::new(store));
    let request = Arc::new(desk.sale(&desk.wheat, dec!(10), dec!(45)));
    let owner = Arc::new(desk.owner.clone());

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let poster = Arc::clone(&poster);
            let request = Arc::clone(&request);
            let owner = Arc::clone(&owner);
            thread::spawn(move || poster.post_sale(Some(&owner), &request))
        })
        .collect();

    let mut accepted = 0;
    let mut rejected = 0;
    for handle in handles {
        match handle.join().expect("worker panicked") {
            Ok(_) => accepted += 1,
            Err(PostingError::InsufficientStock { .. }) => rejected += 1,
            Err(other) => panic!("unexpected error {other}"),
        }
    }
    assert_eq!(accepted, 5);
    assert_eq!(rejected, 3);

    let record = desk
        .store()
        .inventory_balance(&desk.owner, &desk.wheat)?
        .expect("inventory row");
    assert_eq!(record.balance, dec!(0));
    assert_eq!(record.sold, dec!(50));

    let log = desk
        .store()
        .list_transactions(&desk.owner, &TransactionQuery::default())?;
    assert_eq!(log.total_records, 1 + accepted);
    Ok(())
}

#[test]
fn parallel_purchases_all_land() -> Result<()> {
    let desk = Desk::open()?;
    let poster = Arc::new(TransactionPoster::new(SqliteStore::with_busy_timeout(
        desk.store().path().to_path_buf(),
        Duration::from_secs(30),
    )?));
    let request = Arc::new(desk.purchase(&desk.milk, dec!(2.5), dec!(180)));
    let owner = Arc::new(desk.owner.clone());

    let handles: Vec<_> = (0..6)
        .map(|_| {
            let poster = Arc::clone(&poster);
            let request = Arc::clone(&request);
            let owner = Arc::clone(&owner);
            thread::spawn(move || poster.post_purchase(Some(&owner), &request))
        })
        .collect();
    for handle in handles {
        handle.join().expect("worker panicked")?;
    }

    let record = desk
        .store()
        .inventory_balance(&desk.owner, &desk.milk)?
        .expect("inventory row");
    assert_eq!(record.purchased, dec!(15));
    assert_eq!(record.balance, dec!(15));
    Ok(())
}

#[test]
fn held_write_lock_fails_posting_as_transient() -> Result<()> {
    let desk = Desk::open()?;
    let impatient = TransactionPoster::new(SqliteStore::with_busy_timeout(
        desk.store().path().to_path_buf(),
        Duration::from_millis(50),
    )?);
    let request = desk.purchase(&desk.wheat, dec!(10), dec!(40));

    let result = desk.store().write(|_held| -> LedgerResult<_> {
        Ok(impatient.post_purchase(Some(&desk.owner), &request))
    })?;
    let err = result.unwrap_err();
    assert!(err.is_server());
    assert!(err.is_transient(), "expected a transient error, got {err}");

    assert!(desk.store().inventory_balance(&desk.owner, &desk.wheat)?.is_none());
    let log = desk
        .store()
        .list_transactions(&desk.owner, &TransactionQuery::default())?;
    assert_eq!(log.total_records, 0);
    Ok(())
}
