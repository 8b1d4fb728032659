// 🚧 Validation Gate - stops a write before it touches storage

use super::validator::HouseValidator;
use axum::http::StatusCode;
use thiserror::Error;

pub const INVALID_HOUSE_MESSAGE: &str = "Invalid house supplied.";

/// The submitted house failed validation (blank, unknown, or unverifiable)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid house supplied.")]
pub struct InvalidHouseError;

impl InvalidHouseError {
    pub fn message(&self) -> &'static str {
        INVALID_HOUSE_MESSAGE
    }

    pub fn status(&self) -> StatusCode {
        StatusCode::BAD_REQUEST
    }
}

#[derive(Clone)]
pub struct ValidationGate {
    validator: HouseValidator,
}

impl ValidationGate {
    pub fn new(validator: HouseValidator) -> Self {
        ValidationGate { validator }
    }

    /// Call right before any write that sets a character's house
    pub async fn enforce(&self, house_id: &str) -> Result<(), InvalidHouseError> {
        if self.validator.is_valid(house_id).await {
            Ok(())
        } else {
            Err(InvalidHouseError)
        }
    }
}
