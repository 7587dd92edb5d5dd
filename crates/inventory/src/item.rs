use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use trackhub_core::{DomainError, DomainResult, Entity, ItemId, UserId};

/// Quantities strictly below this are flagged as low stock.
pub const LOW_STOCK_THRESHOLD: u32 = 50;

/// Items expiring within this many days (inclusive) are flagged as near expiry.
pub const NEAR_EXPIRY_DAYS: i64 = 30;

/// Top-level stock classification.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Classification {
    #[default]
    Medicamentos,
    Materiais,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Medicamentos => "Medicamentos",
            Classification::Materiais => "Materiais",
        }
    }
}

/// Regulatory handling type.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ItemType {
    #[default]
    Geral,
    Controlados,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Geral => "Geral",
            ItemType::Controlados => "Controlados",
        }
    }
}

/// Caller-supplied fields of a stock record (the "Nova Entrada" form).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewItem {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<NaiveDate>,
    pub quantity: u32,
    pub unit_cost: f64,
    #[serde(default)]
    pub classification: Classification,
    #[serde(rename = "type", default)]
    pub item_type: ItemType,
}

impl NewItem {
    pub fn new(name: impl Into<String>, quantity: u32, unit_cost: f64) -> Self {
        Self {
            name: name.into(),
            batch: None,
            expiry: None,
            quantity,
            unit_cost,
            classification: Classification::default(),
            item_type: ItemType::default(),
        }
    }

    pub fn with_batch(mut self, batch: impl Into<String>) -> Self {
        self.batch = Some(batch.into());
        self
    }

    pub fn with_expiry(mut self, expiry: NaiveDate) -> Self {
        self.expiry = Some(expiry);
        self
    }

    pub fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    pub fn with_type(mut self, item_type: ItemType) -> Self {
        self.item_type = item_type;
        self
    }

    /// Required-field checks. Nothing else about the record is validated.
    pub fn validate(&self) -> DomainResult<()> {
        if self.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if !self.unit_cost.is_finite() || self.unit_cost < 0.0 {
            return Err(DomainError::validation(
                "unit cost must be a non-negative number",
            ));
        }
        Ok(())
    }

    /// Trim the name and drop a blank batch.
    pub fn normalized(mut self) -> Self {
        self.name = self.name.trim().to_string();
        self.batch = self
            .batch
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty());
        self
    }

    /// Attach the author tag, producing the document body sent to the remote store.
    pub fn into_fields(self, user_id: UserId) -> ItemFields {
        ItemFields {
            item: self,
            user_id,
        }
    }
}

/// Document body as stored remotely: form fields plus the author tag.
///
/// The identifier and creation timestamp live outside the body; the remote
/// store assigns both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFields {
    #[serde(flatten)]
    pub item: NewItem,
    pub user_id: UserId,
}

/// One stock record as observed in a snapshot.
///
/// Never mutated in place: a changed record arrives as a new value in the
/// next snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    id: ItemId,
    name: String,
    batch: Option<String>,
    expiry: Option<NaiveDate>,
    quantity: u32,
    unit_cost: f64,
    classification: Classification,
    #[serde(rename = "type")]
    item_type: ItemType,
    created_at: DateTime<Utc>,
    user_id: UserId,
}

impl InventoryItem {
    /// Assemble a record from server-assigned metadata and the stored body.
    pub fn from_parts(id: ItemId, created_at: DateTime<Utc>, fields: ItemFields) -> Self {
        let ItemFields { item, user_id } = fields;
        Self {
            id,
            name: item.name,
            batch: item.batch,
            expiry: item.expiry,
            quantity: item.quantity,
            unit_cost: item.unit_cost,
            classification: item.classification,
            item_type: item.item_type,
            created_at,
            user_id,
        }
    }

    pub fn item_id(&self) -> ItemId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn batch(&self) -> Option<&str> {
        self.batch.as_deref()
    }

    pub fn expiry(&self) -> Option<NaiveDate> {
        self.expiry
    }

    pub fn quantity(&self) -> u32 {
        self.quantity
    }

    pub fn unit_cost(&self) -> f64 {
        self.unit_cost
    }

    pub fn classification(&self) -> Classification {
        self.classification
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn user_id(&self) -> UserId {
        self.user_id
    }

    pub fn is_controlled(&self) -> bool {
        self.item_type == ItemType::Controlados
    }

    /// Stock value (display only, plain floating point).
    pub fn total_cost(&self) -> f64 {
        f64::from(self.quantity) * self.unit_cost
    }

    pub fn is_low_stock(&self) -> bool {
        self.quantity < LOW_STOCK_THRESHOLD
    }

    pub fn is_expired(&self, today: NaiveDate) -> bool {
        self.expiry.is_some_and(|e| e < today)
    }

    pub fn is_near_expiry(&self, today: NaiveDate) -> bool {
        self.expiry
            .is_some_and(|e| e >= today && (e - today).num_days() <= NEAR_EXPIRY_DAYS)
    }

    /// Case-insensitive match on name or batch. An empty query matches everything.
    pub fn matches_filter(&self, query: &str) -> bool {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }
        self.name.to_lowercase().contains(&needle)
            || self
                .batch
                .as_deref()
                .is_some_and(|b| b.to_lowercase().contains(&needle))
    }
}

impl Entity for InventoryItem {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
