//! PostgreSQL Repository Implementations

use chrono::{DateTime, Utc};
use kernel::error::conversions::is_unique_violation;
use sqlx::types::Json;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::entity::{Account, LockoutPolicy, Profile, ProfileDetails, RefreshToken};
use crate::domain::repository::{
    AccountRepository, IdentityUnitOfWork, ProfileRepository, RefreshTokenRepository,
};
use crate::domain::value_object::{
    AccountId, AccountRole, Email, ProfileId, ProfileStatus, UserName, UserPassword,
};
use crate::error::{IdentityError, IdentityResult};

const ACCOUNT_COLUMNS: &str = r#"
    account_id,
    user_name,
    user_name_canonical,
    email,
    password_hash,
    role,
    full_name,
    phone_number,
    is_active,
    is_locked,
    locked_until,
    failed_login_attempts,
    last_login_at,
    is_deleted,
    deleted_at,
    created_at,
    updated_at,
    version
"#;

/// Unique index names, used to word duplicate errors
const USER_NAME_INDEX: &str = "accounts_user_name_canonical_live_idx";
const EMAIL_INDEX: &str = "accounts_email_live_idx";

/// PostgreSQL-backed identity repository
#[derive(Clone)]
pub struct PgIdentityRepository {
    pool: PgPool,
}

impl PgIdentityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Remove refresh tokens that can no longer be used
    pub async fn cleanup_expired(&self) -> IdentityResult<u64> {
        let deleted = sqlx::query("DELETE FROM refresh_tokens WHERE expires_at < $1")
            .bind(Utc::now())
            .execute(&self.pool)
            .await?
            .rows_affected();

        tracing::info!(tokens_deleted = deleted, "Cleaned up expired refresh tokens");

        Ok(deleted)
    }

    /// Version-checked account write inside `tx`
    async fn write_account(
        tx: &mut Transaction<'static, Postgres>,
        account: &Account,
    ) -> IdentityResult<i64> {
        let version = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE accounts SET
                password_hash = $3,
                full_name = $4,
                phone_number = $5,
                is_active = $6,
                is_locked = $7,
                locked_until = $8,
                failed_login_attempts = $9,
                last_login_at = $10,
                is_deleted = $11,
                deleted_at = $12,
                updated_at = $13,
                version = version + 1
            WHERE account_id = $1 AND version = $2 AND NOT is_deleted
            RETURNING version
            "#,
        )
        .bind(account.account_id.as_uuid())
        .bind(account.version)
        .bind(account.password_hash.as_phc_string())
        .bind(&account.full_name)
        .bind(&account.phone_number)
        .bind(account.is_active)
        .bind(account.is_locked)
        .bind(account.locked_until)
        .bind(account.failed_login_attempts as i32)
        .bind(account.last_login_at)
        .bind(account.is_deleted)
        .bind(account.deleted_at)
        .bind(account.updated_at)
        .fetch_optional(&mut **tx)
        .await?;

        match version {
            Some(version) => Ok(version),
            None => Err(Self::missing_or_stale(tx, &account.account_id).await?),
        }
    }

    /// Tell a vanished account apart from a lost race
    async fn missing_or_stale(
        tx: &mut Transaction<'static, Postgres>,
        account_id: &AccountId,
    ) -> IdentityResult<IdentityError> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE account_id = $1 AND NOT is_deleted)",
        )
        .bind(account_id.as_uuid())
        .fetch_one(&mut **tx)
        .await?;

        Ok(if exists {
            IdentityError::ConcurrentModification
        } else {
            IdentityError::not_found("Account")
        })
    }

    async fn upsert_token_in(
        tx: &mut Transaction<'static, Postgres>,
        token: &RefreshToken,
    ) -> IdentityResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (account_id, token_hash, expires_at, created_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (account_id) DO UPDATE SET
                token_hash = EXCLUDED.token_hash,
                expires_at = EXCLUDED.expires_at,
                created_at = EXCLUDED.created_at
            "#,
        )
        .bind(token.account_id.as_uuid())
        .bind(&token.token_hash)
        .bind(token.expires_at)
        .bind(token.created_at)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

// ============================================================================
// Account Repository Implementation
// ============================================================================

impl AccountRepository for PgIdentityRepository {
    async fn find_account(&self, account_id: &AccountId) -> IdentityResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = $1 AND NOT is_deleted"
        ))
        .bind(account_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_account()).transpose()
    }

    async fn find_account_by_user_name(
        &self,
        user_name: &UserName,
    ) -> IdentityResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE user_name_canonical = $1 AND NOT is_deleted"
        ))
        .bind(user_name.canonical())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_account()).transpose()
    }

    async fn find_account_by_email(&self, email: &Email) -> IdentityResult<Option<Account>> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE email = $1 AND NOT is_deleted"
        ))
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_account()).transpose()
    }

    async fn user_name_exists(&self, user_name: &UserName) -> IdentityResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE user_name_canonical = $1 AND NOT is_deleted)",
        )
        .bind(user_name.canonical())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn email_exists(&self, email: &Email) -> IdentityResult<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM accounts WHERE email = $1 AND NOT is_deleted)",
        )
        .bind(email.as_str())
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    async fn update_account(&self, account: &Account) -> IdentityResult<i64> {
        let mut tx = self.pool.begin().await?;
        let version = Self::write_account(&mut tx, account).await?;
        tx.commit().await?;
        Ok(version)
    }

    async fn record_failed_login(
        &self,
        account_id: &AccountId,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> IdentityResult<Option<Account>> {
        let mut tx = self.pool.begin().await?;

        // Row lock serializes concurrent failures for one account
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = $1 AND NOT is_deleted FOR UPDATE"
        ))
        .bind(account_id.as_uuid())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let mut account = row.into_account()?;
        account.record_failed_login(policy, now);
        account.version = Self::write_account(&mut tx, &account).await?;

        tx.commit().await?;
        Ok(Some(account))
    }
}

// ============================================================================
// Profile Repository Implementation
// ============================================================================

impl ProfileRepository for PgIdentityRepository {
    async fn find_profile(&self, profile_id: &ProfileId) -> IdentityResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT
                p.profile_id,
                p.account_id,
                p.status,
                p.details,
                p.created_at,
                p.updated_at,
                p.version
            FROM profiles p
            JOIN accounts a ON a.account_id = p.account_id
            WHERE p.profile_id = $1 AND NOT a.is_deleted
            "#,
        )
        .bind(profile_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_profile()).transpose()
    }

    async fn find_profile_by_account(
        &self,
        account_id: &AccountId,
    ) -> IdentityResult<Option<Profile>> {
        let row = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT
                p.profile_id,
                p.account_id,
                p.status,
                p.details,
                p.created_at,
                p.updated_at,
                p.version
            FROM profiles p
            JOIN accounts a ON a.account_id = p.account_id
            WHERE p.account_id = $1 AND NOT a.is_deleted
            "#,
        )
        .bind(account_id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|r| r.into_profile()).transpose()
    }

    async fn list_profiles_by_role(&self, role: AccountRole) -> IdentityResult<Vec<Profile>> {
        let rows = sqlx::query_as::<_, ProfileRow>(
            r#"
            SELECT
                p.profile_id,
                p.account_id,
                p.status,
                p.details,
                p.created_at,
                p.updated_at,
                p.version
            FROM profiles p
            JOIN accounts a ON a.account_id = p.account_id
            WHERE p.role = $1 AND NOT a.is_deleted
            ORDER BY p.created_at
            "#,
        )
        .bind(role.id())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.into_profile()).collect()
    }

    async fn update_profile(&self, profile: &Profile) -> IdentityResult<i64> {
        // Profiles of soft-deleted accounts are frozen
        let version = sqlx::query_scalar::<_, i64>(
            r#"
            UPDATE profiles p SET
                status = $3,
                details = $4,
                updated_at = $5,
                version = p.version + 1
            FROM accounts a
            WHERE p.profile_id = $1
                AND p.version = $2
                AND a.account_id = p.account_id
                AND NOT a.is_deleted
            RETURNING p.version
            "#,
        )
        .bind(profile.profile_id.as_uuid())
        .bind(profile.version)
        .bind(profile.status.id())
        .bind(Json(&profile.details))
        .bind(profile.updated_at)
        .fetch_optional(&self.pool)
        .await?;

        match version {
            Some(version) => Ok(version),
            None if self.find_profile(&profile.profile_id).await?.is_some() => {
                Err(IdentityError::ConcurrentModification)
            }
            None => Err(IdentityError::not_found("Profile")),
        }
    }
}

// ============================================================================
// Refresh Token Repository Implementation
// ============================================================================

impl RefreshTokenRepository for PgIdentityRepository {
    async fn upsert_refresh_token(&self, token: &RefreshToken) -> IdentityResult<()> {
        let mut tx = self.pool.begin().await?;
        Self::upsert_token_in(&mut tx, token).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn find_refresh_token(&self, token_hash: &[u8]) -> IdentityResult<Option<RefreshToken>> {
        let row = sqlx::query_as::<_, RefreshTokenRow>(
            r#"
            SELECT account_id, token_hash, expires_at, created_at
            FROM refresh_tokens
            WHERE token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|r| r.into_token()))
    }

    async fn rotate_refresh_token(
        &self,
        previous_hash: &[u8],
        next: &RefreshToken,
    ) -> IdentityResult<bool> {
        let rotated = sqlx::query(
            r#"
            UPDATE refresh_tokens SET
                token_hash = $3,
                expires_at = $4,
                created_at = $5
            WHERE account_id = $1 AND token_hash = $2
            "#,
        )
        .bind(next.account_id.as_uuid())
        .bind(previous_hash)
        .bind(&next.token_hash)
        .bind(next.expires_at)
        .bind(next.created_at)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(rotated > 0)
    }

    async fn delete_refresh_token(&self, token_hash: &[u8]) -> IdentityResult<bool> {
        let deleted = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }

    async fn delete_refresh_tokens_for_account(
        &self,
        account_id: &AccountId,
    ) -> IdentityResult<bool> {
        let deleted = sqlx::query("DELETE FROM refresh_tokens WHERE account_id = $1")
            .bind(account_id.as_uuid())
            .execute(&self.pool)
            .await?
            .rows_affected();

        Ok(deleted > 0)
    }
}

// ============================================================================
// Unit of Work Implementation
// ============================================================================

impl IdentityUnitOfWork for PgIdentityRepository {
    async fn create_registration(
        &self,
        account: &Account,
        profile: &Profile,
        token: &RefreshToken,
    ) -> IdentityResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(&format!(
            r#"
            INSERT INTO accounts ({ACCOUNT_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18)
            "#
        ))
        .bind(account.account_id.as_uuid())
        .bind(account.user_name.original())
        .bind(account.user_name.canonical())
        .bind(account.email.as_str())
        .bind(account.password_hash.as_phc_string())
        .bind(account.role.id())
        .bind(&account.full_name)
        .bind(&account.phone_number)
        .bind(account.is_active)
        .bind(account.is_locked)
        .bind(account.locked_until)
        .bind(account.failed_login_attempts as i32)
        .bind(account.last_login_at)
        .bind(account.is_deleted)
        .bind(account.deleted_at)
        .bind(account.created_at)
        .bind(account.updated_at)
        .bind(account.version)
        .execute(&mut *tx)
        .await
        .map_err(duplicate_or_database)?;

        sqlx::query(
            r#"
            INSERT INTO profiles (
                profile_id,
                account_id,
                role,
                status,
                details,
                created_at,
                updated_at,
                version
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(profile.profile_id.as_uuid())
        .bind(profile.account_id.as_uuid())
        .bind(profile.role().id())
        .bind(profile.status.id())
        .bind(Json(&profile.details))
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .bind(profile.version)
        .execute(&mut *tx)
        .await?;

        Self::upsert_token_in(&mut tx, token).await?;

        tx.commit().await?;
        Ok(())
    }

    async fn complete_login(&self, account: &Account, token: &RefreshToken) -> IdentityResult<i64> {
        let mut tx = self.pool.begin().await?;
        let version = Self::write_account(&mut tx, account).await?;
        Self::upsert_token_in(&mut tx, token).await?;
        tx.commit().await?;
        Ok(version)
    }

    async fn soft_delete_account(&self, account: &Account) -> IdentityResult<()> {
        let mut tx = self.pool.begin().await?;

        let updated = sqlx::query(
            r#"
            UPDATE accounts SET
                is_deleted = TRUE,
                deleted_at = $3,
                updated_at = $4,
                version = version + 1
            WHERE account_id = $1 AND version = $2 AND NOT is_deleted
            "#,
        )
        .bind(account.account_id.as_uuid())
        .bind(account.version)
        .bind(account.deleted_at)
        .bind(account.updated_at)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if updated == 0 {
            return Err(Self::missing_or_stale(&mut tx, &account.account_id).await?);
        }

        sqlx::query("DELETE FROM refresh_tokens WHERE account_id = $1")
            .bind(account.account_id.as_uuid())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// A lost registration race shows up as a unique violation
fn duplicate_or_database(err: sqlx::Error) -> IdentityError {
    if !is_unique_violation(&err) {
        return IdentityError::Database(err);
    }
    let constraint = match &err {
        sqlx::Error::Database(db_err) => db_err.constraint().map(str::to_owned),
        _ => None,
    };
    match constraint.as_deref() {
        Some(EMAIL_INDEX) => {
            IdentityError::DuplicateResource("Email is already registered".to_string())
        }
        Some(USER_NAME_INDEX) => {
            IdentityError::DuplicateResource("Username is already taken".to_string())
        }
        _ => IdentityError::DuplicateResource("Account already exists".to_string()),
    }
}

// ============================================================================
// Row Types
// ============================================================================

#[derive(sqlx::FromRow)]
struct AccountRow {
    account_id: Uuid,
    user_name: String,
    user_name_canonical: String,
    email: String,
    password_hash: String,
    role: i16,
    full_name: String,
    phone_number: Option<String>,
    is_active: bool,
    is_locked: bool,
    locked_until: Option<DateTime<Utc>>,
    failed_login_attempts: i32,
    last_login_at: Option<DateTime<Utc>>,
    is_deleted: bool,
    deleted_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl AccountRow {
    fn into_account(self) -> IdentityResult<Account> {
        let role = AccountRole::from_id(self.role)
            .ok_or_else(|| IdentityError::Internal(format!("Unknown role id: {}", self.role)))?;

        Ok(Account {
            account_id: AccountId::from_uuid(self.account_id),
            user_name: UserName::from_db(self.user_name, self.user_name_canonical),
            email: Email::from_db(self.email),
            password_hash: UserPassword::from_phc_string(self.password_hash)?,
            role,
            full_name: self.full_name,
            phone_number: self.phone_number,
            is_active: self.is_active,
            is_locked: self.is_locked,
            locked_until: self.locked_until,
            failed_login_attempts: self.failed_login_attempts.max(0) as u32,
            last_login_at: self.last_login_at,
            is_deleted: self.is_deleted,
            deleted_at: self.deleted_at,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        })
    }
}

#[derive(sqlx::FromRow)]
struct ProfileRow {
    profile_id: Uuid,
    account_id: Uuid,
    status: i16,
    details: Json<ProfileDetails>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl ProfileRow {
    fn into_profile(self) -> IdentityResult<Profile> {
        let status = ProfileStatus::from_id(self.status).ok_or_else(|| {
            IdentityError::Internal(format!("Unknown profile status id: {}", self.status))
        })?;

        Ok(Profile {
            profile_id: ProfileId::from_uuid(self.profile_id),
            account_id: AccountId::from_uuid(self.account_id),
            status,
            details: self.details.0,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        })
    }
}

#[derive(sqlx::FromRow)]
struct RefreshTokenRow {
    account_id: Uuid,
    token_hash: Vec<u8>,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl RefreshTokenRow {
    fn into_token(self) -> RefreshToken {
        RefreshToken {
            account_id: AccountId::from_uuid(self.account_id),
            token_hash: self.token_hash,
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
    }
}
