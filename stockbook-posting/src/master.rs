use once_cell::sync::Lazy;
use regex::Regex;
use stockbook_core::{
    Counterparty, CounterpartyId, CounterpartyKind, CounterpartyPatch, NewCounterparty, OwnerId,
};
use stockbook_ledger::{CounterpartyDirectory, SqliteStore};
use tracing::info;

use crate::{PostingError, PostingResult};

/// Register a supplier or customer for `caller` after format and duplicate
/// contact checks.
pub fn register_counterparty(
    store: &SqliteStore,
    caller: Option<&OwnerId>,
    kind: CounterpartyKind,
    fields: NewCounterparty,
) -> PostingResult<Counterparty> {
    let owner = authorized(caller)?;
    let fields = NewCounterparty {
        name: fields.name.trim().to_string(),
        company: non_empty(fields.company),
        email: non_empty(fields.email),
        phone: non_empty(fields.phone),
        address: non_empty(fields.address),
    };
    if fields.name.is_empty() {
        return Err(PostingError::validation("name is required"));
    }
    check_contact(fields.email.as_deref(), fields.phone.as_deref())?;
    if store.contact_conflict(
        owner,
        kind,
        fields.email.as_deref(),
        fields.phone.as_deref(),
        None,
    )? {
        return Err(duplicate_contact(kind));
    }
    let created = store.insert_counterparty(owner, kind, &fields)?;
    info!(owner = %owner, kind = %kind, id = %created.id, "counterparty registered");
    Ok(created)
}

/// Apply the `Some` fields of `patch` to one of the caller's entries.
///
/// Transactions keep the snapshot they were written with.
pub fn patch_counterparty(
    store: &SqliteStore,
    caller: Option<&OwnerId>,
    kind: CounterpartyKind,
    id: &CounterpartyId,
    patch: CounterpartyPatch,
) -> PostingResult<Counterparty> {
    let owner = authorized(caller)?;
    let patch = CounterpartyPatch {
        name: patch.name.map(|name| name.trim().to_string()),
        company: non_empty(patch.company),
        email: non_empty(patch.email),
        phone: non_empty(patch.phone),
        address: non_empty(patch.address),
    };
    if patch.is_empty() {
        return Err(PostingError::validation("no fields to update"));
    }
    if patch.name.as_deref().is_some_and(str::is_empty) {
        return Err(PostingError::validation("name must not be empty"));
    }
    if CounterpartyDirectory::lookup(store, owner, kind, id)?.is_none() {
        return Err(PostingError::not_found(kind.as_str(), id));
    }
    check_contact(patch.email.as_deref(), patch.phone.as_deref())?;
    if store.contact_conflict(
        owner,
        kind,
        patch.email.as_deref(),
        patch.phone.as_deref(),
        Some(id),
    )? {
        return Err(duplicate_contact(kind));
    }
    if !store.apply_counterparty_patch(owner, kind, id, &patch)? {
        return Err(PostingError::not_found(kind.as_str(), id));
    }
    let updated = CounterpartyDirectory::lookup(store, owner, kind, id)?
        .ok_or_else(|| PostingError::not_found(kind.as_str(), id))?;
    info!(owner = %owner, kind = %kind, id = %id, "counterparty updated");
    Ok(updated)
}

fn authorized(caller: Option<&OwnerId>) -> PostingResult<&OwnerId> {
    caller
        .filter(|owner| !owner.is_blank())
        .ok_or(PostingError::Unauthorized)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

fn duplicate_contact(kind: CounterpartyKind) -> PostingError {
    PostingError::validation(format!("a {kind} with this email or phone already exists"))
}

fn check_contact(email: Option<&str>, phone: Option<&str>) -> PostingResult<()> {
    if let Some(phone) = phone {
        if !is_valid_phone(phone) {
            return Err(PostingError::validation(format!(
                "phone {phone} must look like 03XX-XXXXXXX"
            )));
        }
    }
    if let Some(email) = email {
        if !is_valid_email(email) {
            return Err(PostingError::validation(format!("email {email} is not valid")));
        }
    }
    Ok(())
}

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^03[0-9]{2}-[0-9]{7}$").expect("phone pattern compiles"));

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern compiles"));

/// Mobile number in the `03dd-ddddddd` form.
pub fn is_valid_phone(phone: &str) -> bool {
    PHONE_PATTERN.is_match(phone)
}

/// `local@domain.tld` with no whitespace and exactly one `@`.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.is_match(email)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn phone_shape() {
        assert!(is_valid_phone("0300-1234567"));
        assert!(!is_valid_phone("0300 1234567"));
        assert!(!is_valid_phone("0400-1234567"));
        assert!(!is_valid_phone("0300-123456"));
        assert!(!is_valid_phone("03a0-1234567"));
        assert!(!is_valid_phone("0300-12345678"));
        assert!(!is_valid_phone("x0300-1234567"));
    }

    #[test]
    fn email_shape() {
        assert!(is_valid_email("ali@traders.pk"));
        assert!(is_valid_email("a.b@mail.co.uk"));
        assert!(!is_valid_email("ali@traders"));
        assert!(!is_valid_email("@traders.pk"));
        assert!(!is_valid_email("ali @traders.pk"));
        assert!(!is_valid_email("ali@@traders.pk"));
        assert!(!is_valid_email("ali@.pk"));
        assert!(is_valid_email("ali@mail.pk."));
        assert!(is_valid_email("ali.traders@x.y.z"));
    }

    #[test]
    fn duplicate_phone_is_rejected_per_owner() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("stock.db")).unwrap();
        let owner = OwnerId::from("owner-a");
        let fields = NewCounterparty {
            name: "Ali".into(),
            phone: Some("0300-1234567".into()),
            ..Default::default()
        };
        register_counterparty(&store, Some(&owner), CounterpartyKind::Supplier, fields.clone())
            .unwrap();
        let err =
            register_counterparty(&store, Some(&owner), CounterpartyKind::Supplier, fields.clone())
                .unwrap_err();
        assert!(matches!(err, PostingError::Validation(_)));

        let other = OwnerId::from("owner-b");
        assert!(
            register_counterparty(&store, Some(&other), CounterpartyKind::Supplier, fields).is_ok()
        );
    }

    #[test]
    fn patch_validates_and_scopes_to_owner() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("stock.db")).unwrap();
        let owner = OwnerId::from("owner-a");
        let created = register_counterparty(
            &store,
            Some(&owner),
            CounterpartyKind::Customer,
            NewCounterparty {
                name: "Bilal".into(),
                ..Default::default()
            },
        )
        .unwrap();

        let bad_phone = CounterpartyPatch {
            phone: Some("12345".into()),
            ..Default::default()
        };
        let err = patch_counterparty(
            &store,
            Some(&owner),
            CounterpartyKind::Customer,
            &created.id,
            bad_phone,
        )
        .unwrap_err();
        assert!(matches!(err, PostingError::Validation(_)));

        let rename = CounterpartyPatch {
            name: Some("Bilal & Co".into()),
            ..Default::default()
        };
        let err = patch_counterparty(
            &store,
            Some(&OwnerId::from("owner-b")),
            CounterpartyKind::Customer,
            &created.id,
            rename.clone(),
        )
        .unwrap_err();
        assert!(matches!(err, PostingError::NotFound { entity: "customer", .. }));

        let updated = patch_counterparty(
            &store,
            Some(&owner),
            CounterpartyKind::Customer,
            &created.id,
            rename,
        )
        .unwrap();
        assert_eq!(updated.name, "Bilal & Co");
    }

    #[test]
    fn empty_patch_is_rejected() {
        let dir = tempdir().unwrap();
        let store = SqliteStore::new(dir.path().join("stock.db")).unwrap();
        let err = patch_counterparty(
            &store,
            Some(&OwnerId::from("owner-a")),
            CounterpartyKind::Supplier,
            &CounterpartyId::from("s-1"),
            CounterpartyPatch::default(),
        )
        .unwrap_err();
        assert!(matches!(err, PostingError::Validation(_)));
    }
}
