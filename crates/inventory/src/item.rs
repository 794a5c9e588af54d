use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use pantry_core::{DomainError, DomainResult, Entity, ItemId, ValueObject};

/// Food category of a pantry item.
///
/// `Detected` is the fallback for scanned items the catalog does not know.
/// Read case-insensitively, written in canonical casing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String")]
pub enum Category {
    Fruits,
    Vegetables,
    Dairy,
    Meat,
    Pantry,
    Detected,
}

impl Category {
    pub const ALL: [Category; 6] = [
        Category::Fruits,
        Category::Vegetables,
        Category::Dairy,
        Category::Meat,
        Category::Pantry,
        Category::Detected,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Fruits => "Fruits",
            Category::Vegetables => "Vegetables",
            Category::Dairy => "Dairy",
            Category::Meat => "Meat",
            Category::Pantry => "Pantry",
            Category::Detected => "Detected",
        }
    }
}

impl ValueObject for Category {}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::str::FromStr for Category {
    type Err = DomainError;

    /// Case-insensitive parse of the category name.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| DomainError::validation(format!("unknown category `{wanted}`")))
    }
}

impl TryFrom<String> for Category {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Positive item count (always >= 1).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Quantity = Quantity(1);

    pub fn new(value: u32) -> DomainResult<Self> {
        if value == 0 {
            return Err(DomainError::validation("quantity must be at least 1"));
        }
        Ok(Self(value))
    }

    pub fn get(self) -> u32 {
        self.0
    }

    pub fn saturating_add(self, other: Quantity) -> Quantity {
        Quantity(self.0.saturating_add(other.0))
    }
}

impl ValueObject for Quantity {}

impl TryFrom<u32> for Quantity {
    type Error = DomainError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Quantity::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(value: Quantity) -> Self {
        value.0
    }
}

impl core::fmt::Display for Quantity {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Identity key for an item name: trimmed and case-folded.
pub fn dedup_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Parse an expiry value: a calendar date, or an RFC 3339 timestamp whose
/// date part is kept.
pub fn parse_expiry(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.date_naive()))
}

/// `expiryDate` wire format: `"YYYY-MM-DD"`, or `""` when unknown.
mod expiry_format {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn serialize<S>(date: &Option<NaiveDate>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&d.format("%Y-%m-%d").to_string()),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<String>::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(s) => super::parse_expiry(s)
                .map(Some)
                .ok_or_else(|| de::Error::custom(format!("invalid expiryDate `{s}`"))),
        }
    }
}

/// A pantry entry.
///
/// Serialized with camelCase keys; this is the persisted snapshot format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryItem {
    id: ItemId,
    name: String,
    quantity: Quantity,
    category: Category,
    #[serde(default, with = "expiry_format")]
    expiry_date: Option<NaiveDate>,
    date_added: DateTime<Utc>,
}

impl InventoryItem {
    /// Materialize a candidate as a brand new item.
    pub(crate) fn create(candidate: NewItem, now: DateTime<Utc>) -> Self {
        Self {
            id: ItemId::new(),
            name: candidate.name,
            quantity: candidate.quantity,
            category: candidate.category,
            expiry_date: candidate.expiry_date,
            date_added: now,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn expiry_date(&self) -> Option<NaiveDate> {
        self.expiry_date
    }

    pub fn date_added(&self) -> DateTime<Utc> {
        self.date_added
    }

    pub fn dedup_key(&self) -> String {
        dedup_key(&self.name)
    }

    pub(crate) fn accumulate(&mut self, extra: Quantity) {
        self.quantity = self.quantity.saturating_add(extra);
    }

    /// Shallow-merge a patch. `id` and `date_added` are not patchable.
    pub(crate) fn apply_patch(&mut self, patch: ItemPatch) {
        if let Some(name) = patch.name {
            self.name = name.trim().to_string();
        }
        if let Some(quantity) = patch.quantity {
            self.quantity = quantity;
        }
        if let Some(category) = patch.category {
            self.category = category;
        }
        if let Some(expiry) = patch.expiry_date {
            self.expiry_date = expiry;
        }
    }
}

impl Entity for InventoryItem {
    type Id = ItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

/// Candidate for `InventoryStore::add_item` (no id, no timestamp yet).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewItem {
    name: String,
    quantity: Quantity,
    category: Category,
    expiry_date: Option<NaiveDate>,
}

impl NewItem {
    pub fn new(name: impl Into<String>, quantity: Quantity, category: Category) -> DomainResult<Self> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        Ok(Self {
            name,
            quantity,
            category,
            expiry_date: None,
        })
    }

    pub fn with_expiry(mut self, expiry_date: Option<NaiveDate>) -> Self {
        self.expiry_date = expiry_date;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn expiry_date(&self) -> Option<NaiveDate> {
        self.expiry_date
    }
}

/// Partial update for `InventoryStore::update_item`.
///
/// `expiry_date: Some(None)` clears a known expiry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub quantity: Option<Quantity>,
    pub category: Option<Category>,
    pub expiry_date: Option<Option<NaiveDate>>,
}

impl ItemPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn quantity(mut self, quantity: Quantity) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn expiry_date(mut self, expiry_date: Option<NaiveDate>) -> Self {
        self.expiry_date = Some(expiry_date);
        self
    }
}
