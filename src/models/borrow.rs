//! Borrow record model and related types

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// One loan transaction for one asset
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BorrowRecord {
    /// System-generated unique id
    pub id: String,
    /// Reference to the asset; not enforced to still exist
    pub asset_id: String,
    /// Asset name snapshot taken at creation time; survives asset deletion
    pub asset_name: String,
    /// Accessory note (charger, case, ...)
    pub peripherals: Option<String>,
    pub lender_name: String,
    pub borrower_name: String,
    pub borrower_dept: Option<String>,
    pub start_date: NaiveDate,
    /// Expected return date
    pub end_date: Option<NaiveDate>,
    /// `None` while the loan is active
    pub returned_at: Option<DateTime<Utc>>,
    /// Opaque base64 / data-URI image payload captured at signing; the
    /// ledger never inspects its contents
    pub borrower_sign: String,
    pub created_at: DateTime<Utc>,
}

impl BorrowRecord {
    /// An active loan is one that has not been returned yet.
    pub fn is_active(&self) -> bool {
        self.returned_at.is_none()
    }
}

/// Borrow request from the lending form
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateBorrow {
    #[validate(length(min = 1, message = "Asset ID is required"))]
    pub asset_id: String,
    /// Name shown on the form; used as the snapshot when the asset is
    /// no longer registered
    #[serde(default)]
    pub asset_name: String,
    pub peripherals: Option<String>,
    #[validate(length(min = 1, message = "Lender name is required"))]
    pub lender_name: String,
    #[validate(length(min = 1, message = "Borrower name is required"))]
    pub borrower_name: String,
    pub borrower_dept: Option<String>,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    #[validate(length(min = 1, message = "Borrower signature is required"))]
    pub borrower_sign: String,
}

/// Borrow record update; `None` fields are left untouched. No field is
/// protected through this path, `returned_at` included (double-option:
/// outer `None` = keep, inner `None` = clear).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BorrowPatch {
    pub asset_id: Option<String>,
    pub asset_name: Option<String>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub peripherals: Option<Option<String>>,
    pub lender_name: Option<String>,
    pub borrower_name: Option<String>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub borrower_dept: Option<Option<String>>,
    pub start_date: Option<NaiveDate>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub end_date: Option<Option<NaiveDate>>,
    #[serde(default, with = "serde_with::rust::double_option")]
    pub returned_at: Option<Option<DateTime<Utc>>>,
    pub borrower_sign: Option<String>,
}
