//! Reference list types (brands, models, vendors, departments)

use serde::{Deserialize, Serialize};

/// One entry of the model reference list. Only meaningful paired with an
/// existing brand, but removing a brand does not prune its models.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub brand: String,
    pub name: String,
}
