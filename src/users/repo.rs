use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

/// User record in the database.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 hash, not exposed in JSON
    pub photo: String,
    pub phone: String,
    pub bio: String,
    pub is_logged_in: bool,
    pub slug: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl User {
    /// Find a user by email (exact match).
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, photo, phone, bio,
                   is_logged_in, slug, created_at, updated_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn find_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, password_hash, photo, phone, bio,
                   is_logged_in, slug, created_at, updated_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    /// Create a new user. The password must already be hashed and the slug
    /// already derived; creation never stores plaintext.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
        slug: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, password_hash, slug)
            VALUES ($1, $2, $3, $4)
            RETURNING id, name, email, password_hash, photo, phone, bio,
                      is_logged_in, slug, created_at, updated_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .bind(slug)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Flip the coarse session-presence flag. Returns false when the id is
    /// unknown.
    pub async fn set_logged_in(db: &PgPool, id: Uuid, logged_in: bool) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users SET is_logged_in = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(logged_in)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Overwrite the profile fields with the merged values.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: &str,
        email: &str,
        photo: &str,
        phone: &str,
        bio: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET name = $2, email = $3, photo = $4, phone = $5, bio = $6,
                updated_at = now()
            WHERE id = $1
            RETURNING id, name, email, password_hash, photo, phone, bio,
                      is_logged_in, slug, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(email)
        .bind(photo)
        .bind(phone)
        .bind(bio)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    pub async fn update_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE users SET password_hash = $2, updated_at = now()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(password_hash)
        .execute(db)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Auxiliary record for a signed session token issued at registration.
pub struct SessionToken;

impl SessionToken {
    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        token: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO session_tokens (user_id, token, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(token)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }
}

/// Password-reset token row. Only the SHA-256 digest of the raw token is
/// ever stored.
#[derive(Debug, Clone, FromRow)]
pub struct ResetToken {
    pub id: Uuid,
    pub user_id: Uuid,
    pub token_hash: String,
    pub created_at: OffsetDateTime,
    pub expires_at: OffsetDateTime,
}

impl ResetToken {
    /// Drop any live token for the user; at most one may exist at a time.
    pub async fn delete_for_user(db: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM password_reset_tokens WHERE user_id = $1"#)
            .bind(user_id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        token_hash: &str,
        expires_at: OffsetDateTime,
    ) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO password_reset_tokens (user_id, token_hash, expires_at)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(user_id)
        .bind(token_hash)
        .bind(expires_at)
        .execute(db)
        .await?;
        Ok(())
    }

    /// Look up a token by digest, accepting it only while unexpired.
    pub async fn find_valid(
        db: &PgPool,
        token_hash: &str,
        now: OffsetDateTime,
    ) -> anyhow::Result<Option<ResetToken>> {
        let token = sqlx::query_as::<_, ResetToken>(
            r#"
            SELECT id, user_id, token_hash, created_at, expires_at
            FROM password_reset_tokens
            WHERE token_hash = $1 AND expires_at > $2
            "#,
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(db)
        .await?;
        Ok(token)
    }

    /// Consume a token after a successful reset so it cannot be replayed.
    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query(r#"DELETE FROM password_reset_tokens WHERE id = $1"#)
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}
