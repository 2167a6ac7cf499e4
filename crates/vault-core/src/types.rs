use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Result, VaultError};

/// Record identifier. Caller-supplied or assigned by the store.
pub type RecordId = i64;

// =============================================================================
// Records
// =============================================================================

/// A stored vault record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub name: String,
    /// Serialized as `YYYY-MM-DD`.
    pub created: NaiveDate,
}

/// Input for inserting a record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewRecord {
    /// Leave empty to let the store assign one.
    pub id: Option<RecordId>,
    pub name: String,
    /// Defaults to today's UTC date.
    pub created: Option<NaiveDate>,
}

impl NewRecord {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            created: None,
        }
    }

    /// Trim and check the name, and fill in the creation date.
    ///
    /// Returns the normalized name together with the effective date.
    pub fn prepare(&self) -> Result<(String, NaiveDate)> {
        let name = validate_name(&self.name)?;
        Ok((name, self.created.unwrap_or_else(today)))
    }
}

/// Replacement values for an existing record.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordUpdate {
    pub name: String,
    /// Keeps the stored date when `None`.
    pub created: Option<NaiveDate>,
}

/// Reject blank names. Returns the trimmed name.
pub fn validate_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(VaultError::Validation("name must not be empty".to_string()));
    }
    Ok(trimmed.to_string())
}

/// Parse a `YYYY-MM-DD` date.
pub fn parse_date(value: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").map_err(|_| {
        VaultError::Validation(format!(
            "invalid date '{}', expected YYYY-MM-DD",
            value.trim()
        ))
    })
}

/// Today's date in UTC.
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

// =============================================================================
// Sorting
// =============================================================================

/// Field a listing can be sorted by.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    Name,
    Created,
}

impl SortField {
    /// Parse user input. `date` is accepted as an alias for `created`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "name" => Some(SortField::Name),
            "created" | "date" => Some(SortField::Created),
            _ => None,
        }
    }

    /// Column name in the records table.
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Name => "name",
            SortField::Created => "created",
        }
    }
}

/// Sort direction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    /// Anything other than `desc`/`descending` means ascending.
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "desc" | "descending" => SortDirection::Descending,
            _ => SortDirection::Ascending,
        }
    }

    pub fn keyword(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

/// A resolved sort request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortOrder {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortOrder {
    /// Resolve raw field/direction input.
    ///
    /// An unrecognized field falls back to name ascending; the second element
    /// carries the warning text in that case.
    pub fn resolve(field: &str, direction: &str) -> (Self, Option<String>) {
        match SortField::parse(field) {
            Some(field) => (
                Self {
                    field,
                    direction: SortDirection::parse(direction),
                },
                None,
            ),
            None => (
                Self::default(),
                Some(format!(
                    "unknown sort field '{}', sorting by name ascending",
                    field.trim()
                )),
            ),
        }
    }
}
