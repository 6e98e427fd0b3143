//! Core types for itemlist

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use uuid::Uuid;

use crate::{Error, Result};

/// JSON object carried in a request body
pub type Body = Map<String, Value>;

/// Fields that must be present (and non-empty) when an item is created
pub const REQUIRED_FIELDS: [&str; 3] = ["category", "name", "maker"];

/// Store-generated item identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(Uuid);

impl ItemId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier received from a client
    pub fn parse(raw: &str) -> Result<Self> {
        Uuid::parse_str(raw)
            .map(Self)
            .map_err(|e| Error::InvalidId(format!("{raw}: {e}")))
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Either a real date or free-form text such as "circa 1920"
///
/// Timestamps keep the client's UTC offset; they are re-rendered in RFC 3339,
/// so a zero fraction such as `.000` is not echoed back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemDate {
    Timestamp(DateTime<FixedOffset>),
    Day(NaiveDate),
    Text(String),
}

/// A request body failed presence or type checks
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ValidationError(pub String);

impl ValidationError {
    fn missing(field: &str) -> Self {
        Self(format!("Missing `{field}` in request body"))
    }

    fn invalid(field: &str, reason: impl fmt::Display) -> Self {
        Self(format!("Invalid `{field}` in request body: {reason}"))
    }
}

/// Item document as persisted by the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub category: String,
    pub name: String,
    pub maker: String,
    #[serde(default)]
    pub date: Option<ItemDate>,
    #[serde(default)]
    pub condition: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,

    // Store metadata, never exposed over the wire
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub revision: u64,
}

impl Item {
    pub fn new(id: ItemId, fields: NewItem) -> Self {
        let now = Utc::now();
        Self {
            id,
            category: fields.category,
            name: fields.name,
            maker: fields.maker,
            date: fields.date,
            condition: fields.condition,
            image: fields.image,
            keywords: fields.keywords,
            description: fields.description,
            location: fields.location,
            created_at: now,
            updated_at: now,
            revision: 0,
        }
    }

    /// Public projection of the item
    pub fn serialize(&self) -> SerializedItem {
        SerializedItem {
            id: self.id,
            name: self.name.clone(),
            category: self.category.clone(),
            maker: self.maker.clone(),
            date: self.date.clone(),
            condition: self.condition.clone(),
            image: self.image.clone(),
            keywords: self.keywords.clone(),
            description: self.description.clone(),
            location: self.location.clone(),
        }
    }
}

/// Wire shape of an item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SerializedItem {
    pub id: ItemId,
    pub name: String,
    pub category: String,
    pub maker: String,
    pub date: Option<ItemDate>,
    pub condition: Option<String>,
    pub image: Option<String>,
    pub keywords: Vec<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

/// Whitelisted fields of a create request
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewItem {
    pub category: String,
    pub name: String,
    pub maker: String,
    pub date: Option<ItemDate>,
    pub condition: Option<String>,
    pub image: Option<String>,
    pub keywords: Vec<String>,
    pub description: Option<String>,
    pub location: Option<String>,
}

impl NewItem {
    /// Validate a create request body.
    ///
    /// Required fields are checked in schema order before anything else, so
    /// the first missing one is the one reported.
    pub fn from_body(body: &Body) -> std::result::Result<Self, ValidationError> {
        for field in REQUIRED_FIELDS {
            if is_blank(body.get(field)) {
                return Err(ValidationError::missing(field));
            }
        }

        Ok(Self {
            category: required_string(body, "category")?,
            name: required_string(body, "name")?,
            maker: required_string(body, "maker")?,
            date: optional(body, "date")?,
            condition: optional(body, "condition")?,
            image: optional(body, "image")?,
            keywords: optional::<Vec<String>>(body, "keywords")?.unwrap_or_default(),
            description: optional(body, "description")?,
            location: optional(body, "location")?,
        })
    }
}

/// Partial update built from the allow-listed fields of an update request.
///
/// `None` leaves a field untouched. For optional attributes `Some(None)`
/// clears the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub maker: Option<String>,
    pub date: Option<Option<ItemDate>>,
    pub condition: Option<Option<String>>,
    pub image: Option<Option<String>>,
    pub keywords: Option<Vec<String>>,
    pub description: Option<Option<String>>,
    pub location: Option<Option<String>>,
}

impl ItemUpdate {
    /// Collect the updatable fields present in `body`; everything else is ignored
    pub fn from_body(body: &Body) -> std::result::Result<Self, ValidationError> {
        Ok(Self {
            name: patch_required(body, "name")?,
            category: patch_required(body, "category")?,
            maker: patch_required(body, "maker")?,
            date: patch(body, "date")?,
            condition: patch(body, "condition")?,
            image: patch(body, "image")?,
            keywords: patch::<Vec<String>>(body, "keywords")?.map(Option::unwrap_or_default),
            description: patch(body, "description")?,
            location: patch(body, "location")?,
        })
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Overwrite the fields carried by this update
    pub fn apply(&self, item: &mut Item) {
        if let Some(name) = &self.name {
            item.name = name.clone();
        }
        if let Some(category) = &self.category {
            item.category = category.clone();
        }
        if let Some(maker) = &self.maker {
            item.maker = maker.clone();
        }
        if let Some(date) = &self.date {
            item.date = date.clone();
        }
        if let Some(condition) = &self.condition {
            item.condition = condition.clone();
        }
        if let Some(image) = &self.image {
            item.image = image.clone();
        }
        if let Some(keywords) = &self.keywords {
            item.keywords = keywords.clone();
        }
        if let Some(description) = &self.description {
            item.description = description.clone();
        }
        if let Some(location) = &self.location {
            item.location = location.clone();
        }
    }
}

fn is_blank(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.is_empty(),
        Some(_) => false,
    }
}

fn required_string(body: &Body, field: &str) -> std::result::Result<String, ValidationError> {
    match body.get(field) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        Some(Value::String(_)) | Some(Value::Null) | None => Err(ValidationError::missing(field)),
        Some(_) => Err(ValidationError::invalid(field, "expected a string")),
    }
}

fn optional<T: DeserializeOwned>(
    body: &Body,
    field: &str,
) -> std::result::Result<Option<T>, ValidationError> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => T::deserialize(value)
            .map(Some)
            .map_err(|e| ValidationError::invalid(field, e)),
    }
}

fn patch<T: DeserializeOwned>(
    body: &Body,
    field: &str,
) -> std::result::Result<Option<Option<T>>, ValidationError> {
    if body.contains_key(field) {
        optional(body, field).map(Some)
    } else {
        Ok(None)
    }
}

fn patch_required(body: &Body, field: &str) -> std::result::Result<Option<String>, ValidationError> {
    if !body.contains_key(field) {
        return Ok(None);
    }
    match required_string(body, field) {
        Ok(value) => Ok(Some(value)),
        Err(_) if is_blank(body.get(field)) => Err(ValidationError(format!(
            "Field `{field}` cannot be cleared"
        ))),
        Err(e) => Err(e),
    }
}
