//! Saved address management.
//!
//! Validation of client input (PIN code, phone number, required fields)
//! happens here; the per-owner limit and the single-default invariant are
//! enforced in the repository so they hold under concurrency.

use serde::Deserialize;
use thiserror::Error;

use marigold_core::{AddressId, PhoneNumber, PinCode, UserId};

use crate::db::{AddressRepository, RepositoryError};
use crate::models::{Address, NewAddress};
use std::sync::Arc;

/// Errors from address operations.
#[derive(Debug, Error)]
pub enum AddressError {
    /// Client-supplied input failed validation.
    #[error("Invalid address: {0}")]
    Validation(String),

    /// The owner already has the maximum number of saved addresses.
    #[error("Address limit reached")]
    LimitReached,

    /// The address does not exist or belongs to someone else.
    #[error("Address not found")]
    NotFound,

    /// Underlying repository failure.
    #[error(transparent)]
    Repository(RepositoryError),
}

impl From<RepositoryError> for AddressError {
    fn from(error: RepositoryError) -> Self {
        match error {
            RepositoryError::Conflict(_) => Self::LimitReached,
            RepositoryError::NotFound(_) => Self::NotFound,
            other => Self::Repository(other),
        }
    }
}

/// Raw address fields as submitted by the client.
#[derive(Debug, Clone, Deserialize)]
pub struct NewAddressInput {
    pub full_name: String,
    pub line1: String,
    pub city: String,
    pub state: String,
    pub pin_code: String,
    pub phone: String,
    #[serde(default)]
    pub is_default: bool,
}

impl NewAddressInput {
    /// Validate the raw input into a [`NewAddress`].
    ///
    /// # Errors
    ///
    /// Returns `AddressError::Validation` naming the first offending field.
    pub fn validate(self) -> Result<NewAddress, AddressError> {
        let full_name = required(&self.full_name, "full_name")?;
        let line1 = required(&self.line1, "line1")?;
        let city = required(&self.city, "city")?;
        let state = required(&self.state, "state")?;

        let pin_code = PinCode::parse(self.pin_code.trim())
            .map_err(|e| AddressError::Validation(e.to_string()))?;
        let phone = PhoneNumber::parse(self.phone.trim())
            .map_err(|e| AddressError::Validation(e.to_string()))?;

        Ok(NewAddress {
            full_name,
            line1,
            city,
            state,
            pin_code,
            phone,
            is_default: self.is_default,
        })
    }
}

fn required(value: &str, field: &str) -> Result<String, AddressError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(AddressError::Validation(format!("{field} is required")));
    }
    Ok(trimmed.to_owned())
}

/// Address operations for authenticated users.
#[derive(Clone)]
pub struct AddressService {
    addresses: Arc<dyn AddressRepository>,
}

impl AddressService {
    #[must_use]
    pub fn new(addresses: Arc<dyn AddressRepository>) -> Self {
        Self { addresses }
    }

    /// List the owner's addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::Repository` on persistence failure.
    pub async fn list(&self, owner: UserId) -> Result<Vec<Address>, AddressError> {
        Ok(self.addresses.list(owner).await?)
    }

    /// Create an address from client input.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::Validation` for bad input and
    /// `AddressError::LimitReached` at the per-owner cap.
    pub async fn create(
        &self,
        owner: UserId,
        input: NewAddressInput,
    ) -> Result<Address, AddressError> {
        let data = input.validate()?;
        Ok(self.addresses.create(owner, data).await?)
    }

    /// Update an address owned by `owner`.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::NotFound` if the address is missing or not
    /// theirs.
    pub async fn update(
        &self,
        id: AddressId,
        owner: UserId,
        input: NewAddressInput,
    ) -> Result<Address, AddressError> {
        let data = input.validate()?;
        Ok(self.addresses.update(id, owner, data).await?)
    }

    /// Fetch an address only if it belongs to `owner`.
    ///
    /// Used to validate the checkout's selected-address session value.
    ///
    /// # Errors
    ///
    /// Returns `AddressError::NotFound` if missing or not theirs.
    pub async fn get_owned(&self, id: AddressId, owner: UserId) -> Result<Address, AddressError> {
        self.addresses
            .get(id)
            .await?
            .filter(|address| address.owner_id == owner)
            .ok_or(AddressError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(pin: &str, phone: &str) -> NewAddressInput {
        NewAddressInput {
            full_name: "Asha Rao".into(),
            line1: "14 MG Road".into(),
            city: "Bengaluru".into(),
            state: "Karnataka".into(),
            pin_code: pin.into(),
            phone: phone.into(),
            is_default: false,
        }
    }

    #[test]
    fn test_validate_accepts_good_input() {
        let data = input("560001", "9876543210").validate().unwrap();
        assert_eq!(data.pin_code.as_str(), "560001");
        assert_eq!(data.phone.as_str(), "9876543210");
    }

    #[test]
    fn test_validate_rejects_bad_pin_and_phone() {
        assert!(matches!(
            input("056001", "9876543210").validate(),
            Err(AddressError::Validation(_))
        ));
        assert!(matches!(
            input("560001", "98765").validate(),
            Err(AddressError::Validation(_))
        ));
    }

    #[test]
    fn test_validate_rejects_blank_fields() {
        let mut blank = input("560001", "9876543210");
        blank.city = "   ".into();
        assert!(matches!(
            blank.validate(),
            Err(AddressError::Validation(message)) if message.contains("city")
        ));
    }
}
