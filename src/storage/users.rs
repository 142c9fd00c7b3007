use chrono::Utc;
use uuid::Uuid;

use super::schema::Database;
use super::types::{to_millis, DatabaseError, User, UserRow};

impl Database {
    // ========================================================================
    // User Operations
    // ========================================================================

    /// Register a new user. Fails with `Duplicate("user")` if the name is taken.
    pub async fn create_user(&self, name: &str) -> Result<User, DatabaseError> {
        let now = to_millis(Utc::now());
        let row: UserRow = sqlx::query_as(
            r#"
            INSERT INTO users (id, name, created_at, updated_at)
            VALUES (?, ?, ?, ?)
            RETURNING id, name, created_at, updated_at
        "#,
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(now)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::on_unique("user"))?;

        tracing::debug!(user = %row.name, "Created user");
        Ok(row.into())
    }

    /// Look up a user by display name.
    pub async fn get_user(&self, name: &str) -> Result<User, DatabaseError> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, name, created_at, updated_at FROM users WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        row.map(User::from).ok_or(DatabaseError::NotFound("user"))
    }

    /// All users in registration order.
    pub async fn get_users(&self) -> Result<Vec<User>, DatabaseError> {
        let rows: Vec<UserRow> = sqlx::query_as(
            "SELECT id, name, created_at, updated_at FROM users ORDER BY created_at, name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }
}
