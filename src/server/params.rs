// Request parsing - body -> BullParams -> BullAttributes
// Explicit decoding by Content-Type; only allow-listed keys under `bull` are read.

use axum::http::{header, HeaderMap};
use chrono::NaiveDate;
use serde_json::Value;

use crate::bull::{BullAttributes, ValidationErrors};
use crate::server::error::ApiError;

/// Permitted parameters under `bull`, still as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BullParams {
    pub registration_code: Option<String>,
    pub name: Option<String>,
    pub born_on: Option<String>,
    pub offspring_count: Option<String>,
}

impl BullParams {
    fn set(&mut self, key: &str, value: String) {
        match key {
            "registration_code" => self.registration_code = Some(value),
            "name" => self.name = Some(value),
            "born_on" => self.born_on = Some(value),
            "offspring_count" => self.offspring_count = Some(value),
            other => log::debug!("Ignoring unpermitted parameter bull[{}]", other),
        }
    }

    /// Convert to typed attributes.
    ///
    /// A blank date, count or code clears the stored value; a key that was
    /// not sent leaves it alone. A blank name is kept so the store can reject it.
    pub fn into_attributes(self) -> Result<BullAttributes, ValidationErrors> {
        let mut errors = ValidationErrors::default();

        let born_on = supplied(self.born_on).map(|value| {
            value.and_then(|s| match NaiveDate::parse_from_str(&s, "%Y-%m-%d") {
                Ok(date) => Some(date),
                Err(_) => {
                    errors.add("born_on", "is not a valid date");
                    None
                }
            })
        });
        let offspring_count = supplied(self.offspring_count).map(|value| {
            value.and_then(|s| match s.parse::<i64>() {
                Ok(count) => Some(count),
                Err(_) => {
                    errors.add("offspring_count", "is not a number");
                    None
                }
            })
        });

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(BullAttributes {
            registration_code: supplied(self.registration_code),
            name: self.name,
            born_on,
            offspring_count,
        })
    }
}

/// Trimmed value of a sent key; `Some(None)` when it was sent blank.
fn supplied(value: Option<String>) -> Option<Option<String>> {
    value.map(|s| {
        let trimmed = s.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

/// Decode a request body into `BullParams` according to its Content-Type.
pub fn parse_bull_params(headers: &HeaderMap, body: &[u8]) -> Result<BullParams, ApiError> {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        parse_json(body)
    } else if content_type.starts_with("application/x-www-form-urlencoded") {
        parse_form(body)
    } else {
        Err(ApiError::UnsupportedMediaType(content_type))
    }
}

fn missing_bull() -> ApiError {
    ApiError::BadRequest("param is missing or the value is empty: bull".to_string())
}

fn parse_json(body: &[u8]) -> Result<BullParams, ApiError> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid JSON body: {}", e)))?;

    let bull = match value.get("bull") {
        Some(Value::Object(map)) if !map.is_empty() => map,
        _ => return Err(missing_bull()),
    };

    let mut params = BullParams::default();
    for (key, value) in bull {
        let text = match value {
            Value::Null => String::new(),
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            Value::Array(_) | Value::Object(_) => {
                return Err(ApiError::BadRequest(format!(
                    "bull[{}] must be a scalar value",
                    key
                )))
            }
        };
        params.set(key, text);
    }

    Ok(params)
}

fn parse_form(body: &[u8]) -> Result<BullParams, ApiError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)
        .map_err(|e| ApiError::BadRequest(format!("invalid form body: {}", e)))?;

    let mut params = BullParams::default();
    let mut seen = false;
    for (key, value) in pairs {
        let Some(field) = key
            .strip_prefix("bull[")
            .and_then(|rest| rest.strip_suffix(']'))
        else {
            continue;
        };
        seen = true;
        params.set(field, value);
    }

    if !seen {
        return Err(missing_bull());
    }

    Ok(params)
}
