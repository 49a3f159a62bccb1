// Bull Record - the single domain entity
// A bull is a flat record: registration code, name, birth date, offspring count.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ============================================================================
// BULL RECORD
// ============================================================================

/// A persisted bull record.
///
/// `id` is assigned by the record store on create and never changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bull {
    pub id: i64,
    pub registration_code: Option<String>,
    pub name: String,
    pub born_on: Option<NaiveDate>,
    pub offspring_count: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bull {
    /// Current values as an attribute set (every field supplied).
    ///
    /// Used as edit-form data by the web surface.
    pub fn attributes(&self) -> BullAttributes {
        BullAttributes {
            registration_code: Some(self.registration_code.clone()),
            name: Some(self.name.clone()),
            born_on: Some(self.born_on),
            offspring_count: Some(self.offspring_count),
        }
    }

    /// Overwrite the fields present in `attrs`, leaving the rest untouched.
    ///
    /// A field supplied as `Some(None)` is cleared.
    pub fn apply(&mut self, attrs: &BullAttributes) {
        if let Some(code) = &attrs.registration_code {
            self.registration_code = code.clone();
        }
        if let Some(name) = &attrs.name {
            self.name = name.clone();
        }
        if let Some(born_on) = attrs.born_on {
            self.born_on = born_on;
        }
        if let Some(count) = attrs.offspring_count {
            self.offspring_count = count;
        }
    }
}

// ============================================================================
// ATTRIBUTES (input for create / update)
// ============================================================================

/// Attribute set accepted by `create` and `update`.
///
/// `None` means "not supplied": on update the stored value is kept.
/// The optional record fields take `Some(None)` to mean "supplied empty",
/// which clears the stored value. Both serialise as `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BullAttributes {
    pub registration_code: Option<Option<String>>,
    pub name: Option<String>,
    pub born_on: Option<Option<NaiveDate>>,
    pub offspring_count: Option<Option<i64>>,
}

impl BullAttributes {
    pub fn new(name: &str) -> Self {
        BullAttributes {
            name: Some(name.to_string()),
            ..Default::default()
        }
    }

    /// Builder pattern: add registration code
    pub fn with_registration_code(mut self, code: &str) -> Self {
        self.registration_code = Some(Some(code.to_string()));
        self
    }

    /// Builder pattern: add birth date
    pub fn with_born_on(mut self, born_on: NaiveDate) -> Self {
        self.born_on = Some(Some(born_on));
        self
    }

    /// Builder pattern: add offspring count
    pub fn with_offspring_count(mut self, count: i64) -> Self {
        self.offspring_count = Some(Some(count));
        self
    }

    /// Builder pattern: clear registration code, birth date and offspring count
    pub fn clearing_optional_fields(mut self) -> Self {
        self.registration_code = Some(None);
        self.born_on = Some(None);
        self.offspring_count = Some(None);
        self
    }

    /// Check the rules a new record must satisfy.
    pub fn validate_for_create(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        match &self.name {
            None => errors.add("name", "can't be blank"),
            Some(name) if name.trim().is_empty() => errors.add("name", "can't be blank"),
            Some(_) => {}
        }
        self.check_offspring_count(&mut errors);

        errors.into_result()
    }

    /// Check the supplied fields of a partial update.
    pub fn validate_for_update(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::default();

        if let Some(name) = &self.name {
            if name.trim().is_empty() {
                errors.add("name", "can't be blank");
            }
        }
        self.check_offspring_count(&mut errors);

        errors.into_result()
    }

    fn check_offspring_count(&self, errors: &mut ValidationErrors) {
        if let Some(Some(count)) = self.offspring_count {
            if count < 0 {
                errors.add("offspring_count", "must be greater than or equal to 0");
            }
        }
    }
}

// ============================================================================
// VALIDATION ERRORS
// ============================================================================

/// Field-level validation failures: field name -> messages.
///
/// Serialises as a plain JSON object, e.g. `{"name": ["can't be blank"]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors {
    fields: BTreeMap<String, Vec<String>>,
}

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: &str) {
        self.fields
            .entry(field.to_string())
            .or_default()
            .push(message.to_string());
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Messages recorded for one field (empty slice when none).
    pub fn messages(&self, field: &str) -> &[String] {
        self.fields.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.fields {
            for message in messages {
                if !first {
                    write!(f, ", ")?;
                }
                write!(f, "{} {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

impl std::error::Error for ValidationErrors {}
