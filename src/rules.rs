//! Invariant engine: pure predicates run before mutations are committed

use crate::error::{LedgerError, LedgerResult};
use crate::models::{Asset, BorrowRecord};

/// The three asset fields that must stay unique across the collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyField {
    AssetId,
    IdCode,
    Serial,
}

impl KeyField {
    pub const ALL: [KeyField; 3] = [KeyField::AssetId, KeyField::IdCode, KeyField::Serial];

    pub fn name(self) -> &'static str {
        match self {
            KeyField::AssetId => "asset_id",
            KeyField::IdCode => "id_code",
            KeyField::Serial => "serial",
        }
    }

    fn value<'a>(self, asset: &'a Asset) -> &'a str {
        match self {
            KeyField::AssetId => &asset.asset_id,
            KeyField::IdCode => &asset.id_code,
            KeyField::Serial => &asset.serial,
        }
    }
}

/// True if any asset other than `exclude_id` already carries `value` in
/// `field`. Used on both registration and update.
pub fn duplicate_key(
    assets: &[Asset],
    field: KeyField,
    value: &str,
    exclude_id: Option<&str>,
) -> bool {
    assets
        .iter()
        .filter(|a| exclude_id != Some(a.asset_id.as_str()))
        .any(|a| field.value(a) == value)
}

/// Check all three key fields of `candidate` against the collection,
/// yielding a field-specific validation error on the first collision.
pub fn check_unique_keys(
    assets: &[Asset],
    candidate: &Asset,
    exclude_id: Option<&str>,
) -> LedgerResult<()> {
    for field in KeyField::ALL {
        let value = field.value(candidate);
        if duplicate_key(assets, field, value, exclude_id) {
            return Err(LedgerError::validation(
                field.name(),
                format!("'{}' is already registered", value),
            ));
        }
    }
    Ok(())
}

/// True if the asset currently has an unreturned loan. Evaluated by the
/// borrowing collaborator immediately before `record_borrow`; the check
/// reads this context's snapshot and is advisory under multi-context use.
pub fn has_active_loan(records: &[BorrowRecord], asset_id: &str) -> bool {
    records.iter().any(|r| r.asset_id == asset_id && r.is_active())
}
