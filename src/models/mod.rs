//! Data models for the lending ledger

pub mod asset;
pub mod borrow;
pub mod reference;

// Re-export commonly used types
pub use asset::{Asset, AssetPatch, CreateAsset};
pub use borrow::{BorrowPatch, BorrowRecord, CreateBorrow};
pub use reference::ModelEntry;
