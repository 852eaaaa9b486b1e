//! Address repository on `PostgreSQL`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row, postgres::PgRow};

use marigold_core::{AddressId, PhoneNumber, PinCode, UserId};

use super::super::AddressRepository;
use crate::db::{RepoResult, RepositoryError};
use crate::models::{Address, NewAddress};

/// `PostgreSQL`-backed address repository.
#[derive(Clone)]
pub struct PgAddresses {
    pool: PgPool,
}

impl PgAddresses {
    /// Create a new repository on the given pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const ADDRESS_COLUMNS: &str =
    "id, owner_id, full_name, line1, city, state, pin_code, phone, is_default, \
     created_at, updated_at";

fn row_to_address(row: &PgRow) -> RepoResult<Address> {
    let pin_code = PinCode::parse(row.try_get::<String, _>("pin_code")?.trim()).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid PIN code in database: {e}"))
    })?;
    let phone = PhoneNumber::parse(row.try_get::<String, _>("phone")?.trim()).map_err(|e| {
        RepositoryError::DataCorruption(format!("invalid phone number in database: {e}"))
    })?;

    Ok(Address {
        id: row.try_get::<AddressId, _>("id")?,
        owner_id: row.try_get::<UserId, _>("owner_id")?,
        full_name: row.try_get("full_name")?,
        line1: row.try_get("line1")?,
        city: row.try_get("city")?,
        state: row.try_get("state")?,
        pin_code,
        phone,
        is_default: row.try_get("is_default")?,
        created_at: row.try_get::<DateTime<Utc>, _>("created_at")?,
        updated_at: row.try_get::<DateTime<Utc>, _>("updated_at")?,
    })
}

#[async_trait]
impl AddressRepository for PgAddresses {
    async fn list(&self, owner: UserId) -> RepoResult<Vec<Address>> {
        let rows = sqlx::query(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses
             WHERE owner_id = $1 ORDER BY is_default DESC, id"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_address).collect()
    }

    async fn get(&self, id: AddressId) -> RepoResult<Option<Address>> {
        let row = sqlx::query(&format!(
            "SELECT {ADDRESS_COLUMNS} FROM addresses WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(row_to_address).transpose()
    }

    async fn create(&self, owner: UserId, data: NewAddress) -> RepoResult<Address> {
        let mut tx = self.pool.begin().await?;

        // Lock the owner's rows so two concurrent creates see each other
        // before the limit check.
        let existing = sqlx::query("SELECT id FROM addresses WHERE owner_id = $1 FOR UPDATE")
            .bind(owner)
            .fetch_all(&mut *tx)
            .await?;

        if existing.len() as i64 >= Address::MAX_PER_OWNER {
            return Err(RepositoryError::Conflict(format!(
                "address limit of {} reached",
                Address::MAX_PER_OWNER
            )));
        }

        // Unset siblings before setting the new default
        if data.is_default {
            sqlx::query("UPDATE addresses SET is_default = FALSE WHERE owner_id = $1")
                .bind(owner)
                .execute(&mut *tx)
                .await?;
        }

        let row = sqlx::query(&format!(
            "INSERT INTO addresses
                 (owner_id, full_name, line1, city, state, pin_code, phone, is_default)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(owner)
        .bind(&data.full_name)
        .bind(&data.line1)
        .bind(&data.city)
        .bind(&data.state)
        .bind(data.pin_code.as_str())
        .bind(data.phone.as_str())
        .bind(data.is_default)
        .fetch_one(&mut *tx)
        .await?;

        let address = row_to_address(&row)?;
        tx.commit().await?;
        Ok(address)
    }

    async fn update(&self, id: AddressId, owner: UserId, data: NewAddress) -> RepoResult<Address> {
        let mut tx = self.pool.begin().await?;

        if data.is_default {
            sqlx::query("UPDATE addresses SET is_default = FALSE WHERE owner_id = $1 AND id <> $2")
                .bind(owner)
                .bind(id)
                .execute(&mut *tx)
                .await?;
        }

        let row = sqlx::query(&format!(
            "UPDATE addresses
             SET full_name = $3, line1 = $4, city = $5, state = $6,
                 pin_code = $7, phone = $8, is_default = $9, updated_at = now()
             WHERE id = $1 AND owner_id = $2
             RETURNING {ADDRESS_COLUMNS}"
        ))
        .bind(id)
        .bind(owner)
        .bind(&data.full_name)
        .bind(&data.line1)
        .bind(&data.city)
        .bind(&data.state)
        .bind(data.pin_code.as_str())
        .bind(data.phone.as_str())
        .bind(data.is_default)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| RepositoryError::NotFound(format!("address {id}")))?;

        let address = row_to_address(&row)?;
        tx.commit().await?;
        Ok(address)
    }
}
