use serde::Serialize;
use sqlx::{FromRow, PgPool, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::claims::UserRole;

/// User record in the database. The password hash never leaves this module
/// boundary in serialized form.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub role: UserRole,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

const USER_COLUMNS: &str = "id, name, email, phone, password_hash, role, created_at";

impl User {
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, name, email, phone, password_hash, role, created_at
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
            SELECT id, name, email, phone, password_hash, role, created_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        phone: Option<&str>,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (name, email, phone, password_hash, role)
            VALUES ($1, $2, $3, $4, 'user')
            RETURNING id, name, email, phone, password_hash, role, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(phone)
        .bind(password_hash)
        .fetch_one(db)
        .await?;
        Ok(user)
    }

    /// Applies the provided profile fields only. Callers must reject an
    /// all-absent patch before getting here.
    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: Option<&str>,
        phone: Option<Option<&str>>,
    ) -> anyhow::Result<User> {
        let mut qb = QueryBuilder::new("UPDATE users SET ");
        let mut fields = qb.separated(", ");
        if let Some(name) = name {
            fields.push("name = ").push_bind_unseparated(name);
        }
        if let Some(phone) = phone {
            fields.push("phone = ").push_bind_unseparated(phone);
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING ").push(USER_COLUMNS);
        let user = qb.build_query_as::<User>().fetch_one(db).await?;
        Ok(user)
    }

    pub async fn list(
        db: &PgPool,
        role: Option<UserRole>,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<User>> {
        let mut qb = QueryBuilder::new("SELECT ");
        qb.push(USER_COLUMNS).push(" FROM users");
        if let Some(role) = role {
            qb.push(" WHERE role = ").push_bind(role);
        }
        qb.push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let users = qb.build_query_as::<User>().fetch_all(db).await?;
        Ok(users)
    }

    pub async fn set_role(db: &PgPool, id: Uuid, role: UserRole) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users SET role = $2
            WHERE id = $1
            RETURNING id, name, email, phone, password_hash, role, created_at
            "#,
        )
        .bind(id)
        .bind(role)
        .fetch_optional(db)
        .await?;
        Ok(user)
    }

    pub async fn count(db: &PgPool) -> anyhow::Result<i64> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(db)
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn password_hash_never_serialized() {
        let user = User {
            id: Uuid::new_v4(),
            name: "A".into(),
            email: "a@x.com".into(),
            phone: None,
            password_hash: "$argon2id$secret".into(),
            role: UserRole::User,
            created_at: OffsetDateTime::now_utc(),
        };
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("argon2"));
        assert!(!json.contains("passwordHash"));
        assert!(json.contains(r#""createdAt""#));
        assert!(json.contains(r#""role":"user""#));
    }
}
