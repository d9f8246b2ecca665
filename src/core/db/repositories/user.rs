//! User repository for database operations
//!
//! User CRUD, bcrypt credential checks, role profiles, and the projection
//! lookup that feeds session token enrichment.

use sqlx::PgPool;
use uuid::Uuid;

use crate::core::db::DbError;
use crate::core::db::models::{
    CreateUser, Role, SubRole, TokenUser, TokenUserRow, UpdateUser, User,
};

/// Cost factor for bcrypt hashing (12 is recommended for production)
const BCRYPT_COST: u32 = 12;

const USER_COLUMNS: &str =
    "id, email, email_verified, password_hash, name, image, role, created_at, updated_at";

/// User repository error types
#[derive(Debug, thiserror::Error)]
pub enum UserRepositoryError {
    #[error("User not found")]
    NotFound,

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Sub-role {sub_role} does not belong to role {role}")]
    SubRoleMismatch { role: Role, sub_role: SubRole },

    #[error("Password hashing failed: {0}")]
    HashingError(String),

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),
}

impl From<DbError> for UserRepositoryError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::ConnectionError(e) => UserRepositoryError::DatabaseError(e),
            _ => UserRepositoryError::DatabaseError(sqlx::Error::Protocol(err.to_string())),
        }
    }
}

/// User repository for database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Hash a password using bcrypt with automatic salt generation
    pub fn hash_password(password: &str) -> Result<String, UserRepositoryError> {
        bcrypt::hash(password, BCRYPT_COST)
            .map_err(|e| UserRepositoryError::HashingError(e.to_string()))
    }

    /// Verify a password against a bcrypt hash
    pub fn verify_password(password: &str, hash: &str) -> Result<bool, UserRepositoryError> {
        bcrypt::verify(password, hash).map_err(|e| UserRepositoryError::HashingError(e.to_string()))
    }

    /// Create a user without credentials
    pub async fn create(&self, dto: &CreateUser) -> Result<User, UserRepositoryError> {
        self.insert(dto, None).await
    }

    /// Create a user that signs in with a password (hashed here)
    pub async fn create_with_password(
        &self,
        dto: &CreateUser,
        password: &str,
    ) -> Result<User, UserRepositoryError> {
        let password_hash = Self::hash_password(password)?;
        self.insert(dto, Some(&password_hash)).await
    }

    async fn insert(
        &self,
        dto: &CreateUser,
        password_hash: Option<&str>,
    ) -> Result<User, UserRepositoryError> {
        if self.find_by_email(&dto.email).await?.is_some() {
            return Err(UserRepositoryError::EmailAlreadyExists);
        }

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (id, email, email_verified, password_hash, name, image, role)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&dto.email)
        .bind(dto.email_verified)
        .bind(password_hash)
        .bind(&dto.name)
        .bind(&dto.image)
        .bind(dto.role)
        .fetch_one(&self.pool)
        .await?;

        Ok(user)
    }

    /// Attach the role-specific profile (mentor or admin row) to a user.
    ///
    /// Returns the profile id, which is what tokens carry as `realId`.
    pub async fn attach_profile(
        &self,
        user_id: &str,
        role: Role,
        sub_role: Option<SubRole>,
    ) -> Result<String, UserRepositoryError> {
        if let Some(sub_role) = sub_role
            && sub_role.role() != role
        {
            return Err(UserRepositoryError::SubRoleMismatch { role, sub_role });
        }

        let table = match role {
            Role::Mentor => "mentors",
            Role::Admin => "admins",
        };

        let (profile_id,): (String,) = sqlx::query_as(&format!(
            r#"
            INSERT INTO {table} (id, user_id, type)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id) DO UPDATE SET type = EXCLUDED.type
            RETURNING id
            "#
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(sub_role.map(|s| s.as_str()))
        .fetch_one(&self.pool)
        .await?;

        Ok(profile_id)
    }

    /// Find a user by ID
    pub async fn find_by_id(&self, id: &str) -> Result<Option<User>, UserRepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find a user by email
    pub async fn find_by_email(&self, email: &str) -> Result<Option<User>, UserRepositoryError> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Find the user owning a provider account
    pub async fn find_by_account(
        &self,
        provider: &str,
        provider_account_id: &str,
    ) -> Result<Option<User>, UserRepositoryError> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT u.id, u.email, u.email_verified, u.password_hash, u.name, u.image,
                   u.role, u.created_at, u.updated_at
            FROM users u
            INNER JOIN accounts a ON a.user_id = u.id
            WHERE a.provider = $1 AND a.provider_account_id = $2
            "#,
        )
        .bind(provider)
        .bind(provider_account_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }

    /// Load the fields carried on session tokens.
    ///
    /// `real_id` and `sub_role` come from the profile table matching the user's role.
    pub async fn find_for_token(&self, id: &str) -> Result<Option<TokenUser>, UserRepositoryError> {
        let row = sqlx::query_as::<_, TokenUserRow>(
            r#"
            SELECT u.id,
                   COALESCE(m.id, a.id) AS real_id,
                   u.email,
                   u.role,
                   COALESCE(m.type, a.type) AS sub_role,
                   u.image,
                   u.name
            FROM users u
            LEFT JOIN mentors m ON m.user_id = u.id AND u.role = 'MENTOR'
            LEFT JOIN admins a ON a.user_id = u.id AND u.role = 'ADMIN'
            WHERE u.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(TokenUser::from))
    }

    /// Update a user
    pub async fn update(&self, id: &str, updates: &UpdateUser) -> Result<User, UserRepositoryError> {
        if let Some(ref email) = updates.email
            && let Some(existing) = self.find_by_email(email).await?
            && existing.id != id
        {
            return Err(UserRepositoryError::EmailAlreadyExists);
        }

        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET
                email = COALESCE($2, email),
                email_verified = COALESCE($3, email_verified),
                name = COALESCE($4, name),
                image = COALESCE($5, image),
                role = COALESCE($6, role)
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&updates.email)
        .bind(updates.email_verified)
        .bind(&updates.name)
        .bind(&updates.image)
        .bind(updates.role)
        .fetch_optional(&self.pool)
        .await?;

        user.ok_or(UserRepositoryError::NotFound)
    }

    /// Delete a user by ID; accounts, sessions and profiles cascade
    pub async fn delete(&self, id: &str) -> Result<bool, UserRepositoryError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Authenticate a user by email and password.
    ///
    /// Users without a password hash never authenticate.
    pub async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Option<User>, UserRepositoryError> {
        let Some(user) = self.find_by_email(email).await? else {
            return Ok(None);
        };

        let Some(hash) = user.password_hash.as_deref() else {
            return Ok(None);
        };

        if Self::verify_password(password, hash)? {
            Ok(Some(user))
        } else {
            Ok(None)
        }
    }
}
