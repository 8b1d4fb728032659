// 📐 Shape Layer - request validation
// Checks that character payloads carry the right fields before anything else runs

use crate::db::{CharacterChanges, NewCharacter};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Longest accepted value for any character field
pub const MAX_FIELD_LENGTH: usize = 255;

// ============================================================================
// VALIDATION RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

impl std::error::Error for ValidationError {}

/// Messages grouped by field, in field-name order
pub type FieldErrors = BTreeMap<String, Vec<String>>;

pub fn group_by_field(errors: &[ValidationError]) -> FieldErrors {
    let mut grouped = FieldErrors::new();
    for error in errors {
        grouped
            .entry(error.field.clone())
            .or_default()
            .push(error.message.clone());
    }
    grouped
}

// ============================================================================
// PAYLOAD
// ============================================================================

/// Body of create and update requests; every field may be missing on the wire
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CharacterPayload {
    pub name: Option<String>,
    pub role: Option<String>,
    pub school: Option<String>,
    pub house: Option<String>,
    pub patronus: Option<String>,
}

impl CharacterPayload {
    fn fields(&self) -> [(&'static str, &Option<String>); 5] {
        [
            ("name", &self.name),
            ("role", &self.role),
            ("school", &self.school),
            ("house", &self.house),
            ("patronus", &self.patronus),
        ]
    }
}

fn check_value(field: &str, value: &str, errors: &mut Vec<ValidationError>) {
    if value.trim().is_empty() {
        errors.push(ValidationError {
            field: field.to_string(),
            message: format!("The {} field is required.", field),
        });
    } else if value.chars().count() > MAX_FIELD_LENGTH {
        errors.push(ValidationError {
            field: field.to_string(),
            message: format!(
                "The {} may not be greater than {} characters.",
                field, MAX_FIELD_LENGTH
            ),
        });
    }
}

/// Create: all five fields present and non-blank
pub fn validate_store(payload: &CharacterPayload) -> Result<NewCharacter, Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, value) in payload.fields() {
        match value {
            Some(value) => check_value(field, value, &mut errors),
            None => errors.push(ValidationError {
                field: field.to_string(),
                message: format!("The {} field is required.", field),
            }),
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(NewCharacter {
        name: payload.name.clone().unwrap_or_default(),
        role: payload.role.clone().unwrap_or_default(),
        school: payload.school.clone().unwrap_or_default(),
        house: normalized_house(&payload.house).unwrap_or_default(),
        patronus: payload.patronus.clone().unwrap_or_default(),
    })
}

/// Update: any subset of fields, but whatever is sent must be non-blank
pub fn validate_update(
    payload: &CharacterPayload,
) -> Result<CharacterChanges, Vec<ValidationError>> {
    let mut errors = Vec::new();

    for (field, value) in payload.fields() {
        if let Some(value) = value {
            check_value(field, value, &mut errors);
        }
    }

    if !errors.is_empty() {
        return Err(errors);
    }

    Ok(CharacterChanges {
        name: payload.name.clone(),
        role: payload.role.clone(),
        school: payload.school.clone(),
        house: normalized_house(&payload.house),
        patronus: payload.patronus.clone(),
    })
}

/// House is stored exactly as the validation gate checks it: trimmed
fn normalized_house(house: &Option<String>) -> Option<String> {
    house.as_deref().map(|h| h.trim().to_string())
}
