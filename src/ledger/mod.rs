//! Ledger store: the invariant-enforcing mutation layer over the shared
//! persisted store
//!
//! Owns six persisted slices (brands, models, vendors, departments, assets,
//! borrow records) plus the organization name and report logo. Every
//! mutation validates first, updates the in-memory read model synchronously,
//! then writes the whole slice through to the store. External changes from
//! other execution contexts arrive through store subscriptions and replace
//! the matching slice wholesale (last writer wins, no merge).

use std::sync::{Arc, RwLock};

use chrono::{NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;
use validator::Validate;

use crate::config::LedgerConfig;
use crate::error::{LedgerError, LedgerResult};
use crate::models::{
    Asset, AssetPatch, BorrowPatch, BorrowRecord, CreateAsset, CreateBorrow, ModelEntry,
};
use crate::models::asset::normalize_price;
use crate::overdue;
use crate::report::{self, ExportFile, ReportFilter};
use crate::rules;
use crate::store::{StoreHandle, SubscriptionId};

const SLICE_BRANDS: &str = "brands";
const SLICE_MODELS: &str = "models";
const SLICE_VENDORS: &str = "vendors";
const SLICE_DEPARTMENTS: &str = "departments";
const SLICE_ASSETS: &str = "assets";
const SLICE_BORROWS: &str = "borrow_records";
const SLICE_ORG_NAME: &str = "org_name";
const SLICE_REPORT_LOGO: &str = "report_logo";

#[derive(Debug, Default)]
struct LedgerState {
    brands: Vec<String>,
    models: Vec<ModelEntry>,
    vendors: Vec<String>,
    departments: Vec<String>,
    assets: Vec<Asset>,
    borrow_records: Vec<BorrowRecord>,
    org_name: Option<String>,
    report_logo: Option<String>,
}

/// The lending ledger bound to one execution context's store handle
pub struct Ledger {
    store: StoreHandle,
    namespace: String,
    overdue_threshold_days: i64,
    state: Arc<RwLock<LedgerState>>,
    subscriptions: Vec<SubscriptionId>,
}

impl Ledger {
    /// Seed the read model from the store and subscribe to changes made by
    /// other execution contexts. This handle's own writes are applied to
    /// the read model synchronously and are never re-delivered here.
    pub fn open(store: StoreHandle, config: &LedgerConfig) -> Self {
        let namespace = config.namespace.clone();
        let state = Arc::new(RwLock::new(LedgerState {
            brands: load_slice(&store, &namespace, SLICE_BRANDS),
            models: load_slice(&store, &namespace, SLICE_MODELS),
            vendors: load_slice(&store, &namespace, SLICE_VENDORS),
            departments: load_slice(&store, &namespace, SLICE_DEPARTMENTS),
            assets: load_slice(&store, &namespace, SLICE_ASSETS),
            borrow_records: load_slice(&store, &namespace, SLICE_BORROWS),
            org_name: load_slice(&store, &namespace, SLICE_ORG_NAME),
            report_logo: load_slice(&store, &namespace, SLICE_REPORT_LOGO),
        }));

        let mut ledger = Self {
            store,
            namespace,
            overdue_threshold_days: config.policy.overdue_threshold_days,
            state,
            subscriptions: Vec::new(),
        };
        ledger.subscribe_external_changes();

        {
            let state = ledger.state.read().expect("ledger state poisoned");
            tracing::info!(
                assets = state.assets.len(),
                borrow_records = state.borrow_records.len(),
                "ledger opened"
            );
        }
        ledger
    }

    fn key(&self, slice: &str) -> String {
        format!("{}:{}", self.namespace, slice)
    }

    fn subscribe_external_changes(&mut self) {
        macro_rules! sync_slice {
            ($slice:expr, $field:ident) => {{
                let state = Arc::clone(&self.state);
                let id = self.store.subscribe(&self.key($slice), move |key, value| {
                    let mut state = state.write().expect("ledger state poisoned");
                    state.$field = match value {
                        Some(v) => match serde_json::from_value(v.clone()) {
                            Ok(parsed) => parsed,
                            Err(err) => {
                                tracing::warn!("ignoring malformed external update for {key}: {err}");
                                return;
                            }
                        },
                        None => Default::default(),
                    };
                    tracing::debug!("applied external update for {key}");
                });
                self.subscriptions.push(id);
            }};
        }

        sync_slice!(SLICE_BRANDS, brands);
        sync_slice!(SLICE_MODELS, models);
        sync_slice!(SLICE_VENDORS, vendors);
        sync_slice!(SLICE_DEPARTMENTS, departments);
        sync_slice!(SLICE_ASSETS, assets);
        sync_slice!(SLICE_BORROWS, borrow_records);
        sync_slice!(SLICE_ORG_NAME, org_name);
        sync_slice!(SLICE_REPORT_LOGO, report_logo);
    }

    fn persist<T: Serialize>(&self, slice: &str, value: &T) {
        match serde_json::to_value(value) {
            Ok(encoded) => self.store.set(&self.key(slice), encoded),
            Err(err) => tracing::warn!("could not encode {slice} slice for persistence: {err}"),
        }
    }

    // ----- assets -----

    /// Register a new asset. Required fields and the uniqueness of
    /// `asset_id` / `id_code` / `serial` are checked before anything is
    /// written; the new asset is prepended (newest first).
    pub fn register_asset(&self, draft: CreateAsset) -> LedgerResult<Asset> {
        draft.validate().map_err(map_validation)?;

        let asset = Asset {
            asset_id: draft.asset_id.trim().to_string(),
            id_code: draft.id_code.trim().to_string(),
            name: draft.name.trim().to_string(),
            brand: draft.brand.trim().to_string(),
            model: draft.model.trim().to_string(),
            vendor: draft.vendor.trim().to_string(),
            serial: draft.serial.trim().to_string(),
            purchase_date: draft.purchase_date,
            price: draft.normalized_price(),
        };

        let mut state = self.state.write().expect("ledger state poisoned");
        rules::check_unique_keys(&state.assets, &asset, None)?;
        state.assets.insert(0, asset.clone());
        let snapshot = state.assets.clone();
        drop(state);

        self.persist(SLICE_ASSETS, &snapshot);
        tracing::debug!(asset_id = %asset.asset_id, "asset registered");
        Ok(asset)
    }

    /// Merge `patch` into the asset, re-validating key-field uniqueness
    /// against every *other* asset.
    pub fn update_asset(&self, asset_id: &str, patch: AssetPatch) -> LedgerResult<Asset> {
        let mut state = self.state.write().expect("ledger state poisoned");
        let index = state
            .assets
            .iter()
            .position(|a| a.asset_id == asset_id)
            .ok_or_else(|| LedgerError::NotFound(format!("asset '{asset_id}'")))?;

        let mut candidate = state.assets[index].clone();
        if let Some(v) = patch.asset_id {
            candidate.asset_id = v.trim().to_string();
        }
        if let Some(v) = patch.id_code {
            candidate.id_code = v.trim().to_string();
        }
        if let Some(v) = patch.name {
            candidate.name = v.trim().to_string();
        }
        if let Some(v) = patch.brand {
            candidate.brand = v.trim().to_string();
        }
        if let Some(v) = patch.model {
            candidate.model = v.trim().to_string();
        }
        if let Some(v) = patch.vendor {
            candidate.vendor = v.trim().to_string();
        }
        if let Some(v) = patch.serial {
            candidate.serial = v.trim().to_string();
        }
        if let Some(v) = patch.purchase_date {
            candidate.purchase_date = Some(v);
        }
        if let Some(raw) = patch.price {
            candidate.price = normalize_price(Some(&raw));
        }

        rules::check_unique_keys(&state.assets, &candidate, Some(asset_id))?;
        state.assets[index] = candidate.clone();
        let snapshot = state.assets.clone();
        drop(state);

        self.persist(SLICE_ASSETS, &snapshot);
        tracing::debug!(asset_id = %candidate.asset_id, "asset updated");
        Ok(candidate)
    }

    /// Remove an asset by id. Always succeeds; historical borrow records
    /// keep their denormalized `asset_name` snapshot.
    pub fn delete_asset(&self, asset_id: &str) {
        let mut state = self.state.write().expect("ledger state poisoned");
        state.assets.retain(|a| a.asset_id != asset_id);
        let snapshot = state.assets.clone();
        drop(state);

        self.persist(SLICE_ASSETS, &snapshot);
        tracing::debug!(%asset_id, "asset deleted");
    }

    // ----- borrow records -----

    /// Insert a new borrow record. The at-most-one-active-loan rule is the
    /// caller's pre-check (see [`Ledger::has_active_loan`]); this insert
    /// trusts it and performs no cross-check of its own.
    pub fn record_borrow(&self, draft: CreateBorrow) -> LedgerResult<BorrowRecord> {
        draft.validate().map_err(map_validation)?;

        let mut state = self.state.write().expect("ledger state poisoned");
        // Snapshot the live asset name when the asset is still registered
        let asset_name = state
            .assets
            .iter()
            .find(|a| a.asset_id == draft.asset_id)
            .map(|a| a.name.clone())
            .unwrap_or_else(|| draft.asset_name.clone());

        let record = BorrowRecord {
            id: Uuid::new_v4().to_string(),
            asset_id: draft.asset_id,
            asset_name,
            peripherals: draft.peripherals,
            lender_name: draft.lender_name,
            borrower_name: draft.borrower_name,
            borrower_dept: draft.borrower_dept,
            start_date: draft.start_date,
            end_date: draft.end_date,
            returned_at: None,
            borrower_sign: draft.borrower_sign,
            created_at: Utc::now(),
        };

        state.borrow_records.insert(0, record.clone());
        let snapshot = state.borrow_records.clone();
        drop(state);

        self.persist(SLICE_BORROWS, &snapshot);
        tracing::debug!(record_id = %record.id, asset_id = %record.asset_id, "borrow recorded");
        Ok(record)
    }

    /// Merge `patch` into the matching record. Editing metadata of an
    /// active or closed loan is always permitted; the active-loan rule is
    /// not re-run here.
    pub fn update_borrow(&self, id: &str, patch: BorrowPatch) -> LedgerResult<BorrowRecord> {
        let mut state = self.state.write().expect("ledger state poisoned");
        let record = state
            .borrow_records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| LedgerError::NotFound(format!("borrow record '{id}'")))?;

        if let Some(v) = patch.asset_id {
            record.asset_id = v;
        }
        if let Some(v) = patch.asset_name {
            record.asset_name = v;
        }
        if let Some(v) = patch.peripherals {
            record.peripherals = v;
        }
        if let Some(v) = patch.lender_name {
            record.lender_name = v;
        }
        if let Some(v) = patch.borrower_name {
            record.borrower_name = v;
        }
        if let Some(v) = patch.borrower_dept {
            record.borrower_dept = v;
        }
        if let Some(v) = patch.start_date {
            record.start_date = v;
        }
        if let Some(v) = patch.end_date {
            record.end_date = v;
        }
        if let Some(v) = patch.returned_at {
            record.returned_at = v;
        }
        if let Some(v) = patch.borrower_sign {
            record.borrower_sign = v;
        }
        let updated = record.clone();
        let snapshot = state.borrow_records.clone();
        drop(state);

        self.persist(SLICE_BORROWS, &snapshot);
        tracing::debug!(record_id = %id, "borrow record updated");
        Ok(updated)
    }

    /// Close a loan by stamping `returned_at` with the current time.
    pub fn return_borrow(&self, id: &str) -> LedgerResult<BorrowRecord> {
        let mut state = self.state.write().expect("ledger state poisoned");
        let record = state
            .borrow_records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| LedgerError::NotFound(format!("borrow record '{id}'")))?;

        record.returned_at = Some(Utc::now());
        let updated = record.clone();
        let snapshot = state.borrow_records.clone();
        drop(state);

        self.persist(SLICE_BORROWS, &snapshot);
        tracing::debug!(record_id = %id, "borrow returned");
        Ok(updated)
    }

    /// Caller-side pre-check for the at-most-one-active-loan rule. Reads
    /// this context's snapshot; advisory under multi-context use.
    pub fn has_active_loan(&self, asset_id: &str) -> bool {
        let state = self.state.read().expect("ledger state poisoned");
        rules::has_active_loan(&state.borrow_records, asset_id)
    }

    // ----- reference lists (quick adds; monotonic, no deletes) -----

    pub fn add_brand(&self, name: &str) {
        self.add_to_list(SLICE_BRANDS, name, |s| &mut s.brands);
    }

    pub fn add_vendor(&self, name: &str) {
        self.add_to_list(SLICE_VENDORS, name, |s| &mut s.vendors);
    }

    pub fn add_department(&self, name: &str) {
        self.add_to_list(SLICE_DEPARTMENTS, name, |s| &mut s.departments);
    }

    fn add_to_list(
        &self,
        slice: &str,
        name: &str,
        field: impl Fn(&mut LedgerState) -> &mut Vec<String>,
    ) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        let mut state = self.state.write().expect("ledger state poisoned");
        let list = field(&mut *state);
        if list.iter().any(|n| n == name) {
            return;
        }
        list.push(name.to_string());
        let snapshot = list.clone();
        drop(state);
        self.persist(slice, &snapshot);
    }

    pub fn add_model(&self, brand: &str, name: &str) {
        let (brand, name) = (brand.trim(), name.trim());
        if brand.is_empty() || name.is_empty() {
            return;
        }
        let mut state = self.state.write().expect("ledger state poisoned");
        if state.models.iter().any(|m| m.brand == brand && m.name == name) {
            return;
        }
        state.models.push(ModelEntry {
            brand: brand.to_string(),
            name: name.to_string(),
        });
        let snapshot = state.models.clone();
        drop(state);
        self.persist(SLICE_MODELS, &snapshot);
    }

    /// Model names registered under `brand`, for the dependent form field.
    pub fn models_for_brand(&self, brand: &str) -> Vec<String> {
        let state = self.state.read().expect("ledger state poisoned");
        state
            .models
            .iter()
            .filter(|m| m.brand == brand)
            .map(|m| m.name.clone())
            .collect()
    }

    // ----- organization settings -----

    pub fn org_name(&self) -> Option<String> {
        self.state.read().expect("ledger state poisoned").org_name.clone()
    }

    pub fn set_org_name(&self, name: &str) {
        let mut state = self.state.write().expect("ledger state poisoned");
        state.org_name = Some(name.to_string());
        drop(state);
        self.store
            .set(&self.key(SLICE_ORG_NAME), Value::String(name.to_string()));
    }

    pub fn report_logo(&self) -> Option<String> {
        self.state.read().expect("ledger state poisoned").report_logo.clone()
    }

    pub fn set_report_logo(&self, uri: &str) {
        let mut state = self.state.write().expect("ledger state poisoned");
        state.report_logo = Some(uri.to_string());
        drop(state);
        self.store
            .set(&self.key(SLICE_REPORT_LOGO), Value::String(uri.to_string()));
    }

    // ----- read model -----

    pub fn assets(&self) -> Vec<Asset> {
        self.state.read().expect("ledger state poisoned").assets.clone()
    }

    pub fn borrow_records(&self) -> Vec<BorrowRecord> {
        self.state
            .read()
            .expect("ledger state poisoned")
            .borrow_records
            .clone()
    }

    pub fn brands(&self) -> Vec<String> {
        self.state.read().expect("ledger state poisoned").brands.clone()
    }

    pub fn model_entries(&self) -> Vec<ModelEntry> {
        self.state.read().expect("ledger state poisoned").models.clone()
    }

    pub fn vendors(&self) -> Vec<String> {
        self.state.read().expect("ledger state poisoned").vendors.clone()
    }

    pub fn departments(&self) -> Vec<String> {
        self.state.read().expect("ledger state poisoned").departments.clone()
    }

    pub fn overdue_threshold_days(&self) -> i64 {
        self.overdue_threshold_days
    }

    /// Unreturned loans, newest first.
    pub fn active_loans(&self) -> Vec<BorrowRecord> {
        let state = self.state.read().expect("ledger state poisoned");
        state
            .borrow_records
            .iter()
            .filter(|r| r.is_active())
            .cloned()
            .collect()
    }

    /// Active loans out for at least the configured threshold as of `today`.
    pub fn overdue_loans(&self, today: NaiveDate) -> Vec<BorrowRecord> {
        let state = self.state.read().expect("ledger state poisoned");
        state
            .borrow_records
            .iter()
            .filter(|r| overdue::is_overdue(r, self.overdue_threshold_days, today))
            .cloned()
            .collect()
    }

    // ----- reports -----

    /// Filter the borrow records and serialize them to a spreadsheet file.
    pub fn export_spreadsheet(&self, filter: &ReportFilter) -> LedgerResult<ExportFile> {
        let records = report::filter_records(&self.borrow_records(), filter);
        report::export_spreadsheet(
            &records,
            self.org_name().as_deref().unwrap_or("Equipment Lending"),
            Utc::now(),
        )
    }

    /// Filter the borrow records and render the printable document. An
    /// empty result still renders (with a single "no data" row).
    pub fn render_printable(&self, filter: &ReportFilter) -> String {
        let records = report::filter_records(&self.borrow_records(), filter);
        report::render_printable(
            &records,
            self.org_name().as_deref().unwrap_or("Equipment Lending"),
            self.report_logo().as_deref(),
            Utc::now(),
        )
    }

    // ----- maintenance -----

    /// Clear every persisted entry under the namespace and re-seed the read
    /// model to empty. Other contexts observe one removal per key.
    pub fn reset(&self) {
        self.store.clear_prefix(&format!("{}:", self.namespace));
        let mut state = self.state.write().expect("ledger state poisoned");
        *state = LedgerState::default();
        tracing::info!("ledger reset, all persisted slices cleared");
    }
}

impl Drop for Ledger {
    fn drop(&mut self) {
        for id in self.subscriptions.drain(..) {
            self.store.unsubscribe(id);
        }
    }
}

fn load_slice<T: DeserializeOwned + Default>(store: &StoreHandle, ns: &str, slice: &str) -> T {
    match store.get(&format!("{ns}:{slice}")) {
        Some(value) => serde_json::from_value(value).unwrap_or_else(|err| {
            tracing::warn!("persisted {slice} slice is malformed, starting empty: {err}");
            T::default()
        }),
        None => T::default(),
    }
}

/// First field error from a `validator` run, mapped to the ledger's
/// field-specific validation error.
fn map_validation(errors: validator::ValidationErrors) -> LedgerError {
    let (field, error) = errors
        .field_errors()
        .into_iter()
        .next()
        .map(|(field, errs)| {
            let message = errs
                .first()
                .and_then(|e| e.message.as_ref())
                .map(|m| m.to_string())
                .unwrap_or_else(|| "invalid value".to_string());
            (field.to_string(), message)
        })
        .unwrap_or_else(|| ("payload".to_string(), "invalid payload".to_string()));
    LedgerError::Validation { field, message: error }
}
