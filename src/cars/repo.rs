use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow, PgPool, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

/// Moderation state of a listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "car_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum CarStatus {
    Pending,
    Approved,
}

impl CarStatus {
    /// Parses a moderation target. `rejected` is accepted on the wire but
    /// returns the listing to the pending queue; the column domain stays
    /// two-valued.
    pub fn parse_moderation(s: &str) -> Option<Self> {
        match s {
            "pending" | "rejected" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            _ => None,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "approved" => Some(Self::Approved),
            _ => None,
        }
    }
}

/// Car listing row. Price is stored in cents.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Car {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub price: i32,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub description: Option<String>,
    pub images: Json<Vec<String>>,
    pub status: CarStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Owner identity joined onto listing reads.
#[derive(Debug, Clone, Serialize)]
pub struct OwnerInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CarWithOwner {
    #[serde(flatten)]
    pub car: Car,
    pub user: Option<OwnerInfo>,
}

#[derive(Debug, FromRow)]
struct CarOwnerRow {
    id: Uuid,
    user_id: Uuid,
    title: String,
    price: i32,
    brand: String,
    model: String,
    year: i32,
    description: Option<String>,
    images: Json<Vec<String>>,
    status: CarStatus,
    created_at: OffsetDateTime,
    owner_id: Option<Uuid>,
    owner_name: Option<String>,
    owner_email: Option<String>,
    owner_phone: Option<String>,
}

impl From<CarOwnerRow> for CarWithOwner {
    fn from(r: CarOwnerRow) -> Self {
        let user = match (r.owner_id, r.owner_name, r.owner_email) {
            (Some(id), Some(name), Some(email)) => Some(OwnerInfo {
                id,
                name,
                email,
                phone: r.owner_phone,
            }),
            _ => None,
        };
        Self {
            car: Car {
                id: r.id,
                user_id: r.user_id,
                title: r.title,
                price: r.price,
                brand: r.brand,
                model: r.model,
                year: r.year,
                description: r.description,
                images: r.images,
                status: r.status,
                created_at: r.created_at,
            },
            user,
        }
    }
}

/// Conjunctive listing filters; `None` fields are not applied.
#[derive(Debug, Default)]
pub struct CarFilter {
    pub status: Option<CarStatus>,
    pub brand: Option<String>,
    pub model: Option<String>,
    /// Range bounds in cents.
    pub min_price: Option<i32>,
    pub max_price: Option<i32>,
}

pub struct NewCar {
    pub user_id: Uuid,
    pub title: String,
    pub price: i32,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub description: Option<String>,
    pub images: Vec<String>,
}

/// Validated partial update; `description: Some(None)` clears the column.
#[derive(Debug, Default)]
pub struct CarChanges {
    pub title: Option<String>,
    pub price: Option<i32>,
    pub brand: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub description: Option<Option<String>>,
    pub images: Option<Vec<String>>,
}

impl CarChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.price.is_none()
            && self.brand.is_none()
            && self.model.is_none()
            && self.year.is_none()
            && self.description.is_none()
            && self.images.is_none()
    }
}

const JOINED_SELECT: &str = "SELECT c.id, c.user_id, c.title, c.price, c.brand, c.model, c.year, \
     c.description, c.images, c.status, c.created_at, \
     u.id AS owner_id, u.name AS owner_name, u.email AS owner_email, u.phone AS owner_phone \
     FROM cars c LEFT JOIN users u ON u.id = c.user_id";

impl Car {
    pub async fn insert(db: &PgPool, new: NewCar) -> anyhow::Result<Car> {
        let car = sqlx::query_as::<_, Car>(
            r#"
            INSERT INTO cars (user_id, title, price, brand, model, year, description, images, status)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'pending')
            RETURNING id, user_id, title, price, brand, model, year, description, images, status, created_at
            "#,
        )
        .bind(new.user_id)
        .bind(&new.title)
        .bind(new.price)
        .bind(&new.brand)
        .bind(&new.model)
        .bind(new.year)
        .bind(&new.description)
        .bind(Json(new.images))
        .fetch_one(db)
        .await?;
        Ok(car)
    }

    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Car>> {
        let car = sqlx::query_as::<_, Car>(
            r#"
            SELECT id, user_id, title, price, brand, model, year, description, images, status, created_at
            FROM cars
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(car)
    }

    pub async fn find_with_owner(db: &PgPool, id: Uuid) -> anyhow::Result<Option<CarWithOwner>> {
        let mut qb = QueryBuilder::new(JOINED_SELECT);
        qb.push(" WHERE c.id = ").push_bind(id);
        let row = qb
            .build_query_as::<CarOwnerRow>()
            .fetch_optional(db)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn list_with_owner(
        db: &PgPool,
        filter: &CarFilter,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<CarWithOwner>> {
        let mut qb = QueryBuilder::new(JOINED_SELECT);
        qb.push(" WHERE 1 = 1");
        if let Some(status) = filter.status {
            qb.push(" AND c.status = ").push_bind(status);
        }
        if let Some(brand) = &filter.brand {
            qb.push(" AND c.brand = ").push_bind(brand.clone());
        }
        if let Some(model) = &filter.model {
            qb.push(" AND c.model = ").push_bind(model.clone());
        }
        if let Some(min) = filter.min_price {
            qb.push(" AND c.price >= ").push_bind(min);
        }
        if let Some(max) = filter.max_price {
            qb.push(" AND c.price <= ").push_bind(max);
        }
        qb.push(" ORDER BY c.created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows = qb.build_query_as::<CarOwnerRow>().fetch_all(db).await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    pub async fn update(db: &PgPool, id: Uuid, changes: &CarChanges) -> anyhow::Result<Car> {
        let mut qb = QueryBuilder::new("UPDATE cars SET ");
        let mut fields = qb.separated(", ");
        if let Some(title) = &changes.title {
            fields.push("title = ").push_bind_unseparated(title.clone());
        }
        if let Some(price) = changes.price {
            fields.push("price = ").push_bind_unseparated(price);
        }
        if let Some(brand) = &changes.brand {
            fields.push("brand = ").push_bind_unseparated(brand.clone());
        }
        if let Some(model) = &changes.model {
            fields.push("model = ").push_bind_unseparated(model.clone());
        }
        if let Some(year) = changes.year {
            fields.push("year = ").push_bind_unseparated(year);
        }
        if let Some(description) = &changes.description {
            fields
                .push("description = ")
                .push_bind_unseparated(description.clone());
        }
        if let Some(images) = &changes.images {
            fields
                .push("images = ")
                .push_bind_unseparated(Json(images.clone()));
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING id, user_id, title, price, brand, model, year, description, images, status, created_at");
        let car = qb.build_query_as::<Car>().fetch_one(db).await?;
        Ok(car)
    }

    /// Deletes the listing and its inspections as one transaction,
    /// dependents first.
    pub async fn delete_cascade(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        let mut tx = db.begin().await?;
        sqlx::query("DELETE FROM inspections WHERE car_id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM cars WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn set_status(
        db: &PgPool,
        id: Uuid,
        status: CarStatus,
    ) -> anyhow::Result<Option<Car>> {
        let car = sqlx::query_as::<_, Car>(
            r#"
            UPDATE cars SET status = $2
            WHERE id = $1
            RETURNING id, user_id, title, price, brand, model, year, description, images, status, created_at
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(db)
        .await?;
        Ok(car)
    }

    pub async fn count(db: &PgPool, status: Option<CarStatus>) -> anyhow::Result<i64> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM cars");
        if let Some(status) = status {
            qb.push(" WHERE status = ").push_bind(status);
        }
        let (count,): (i64,) = qb.build_query_as().fetch_one(db).await?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_returns_listing_to_pending_queue() {
        assert_eq!(
            CarStatus::parse_moderation("rejected"),
            Some(CarStatus::Pending)
        );
        assert_eq!(
            CarStatus::parse_moderation("approved"),
            Some(CarStatus::Approved)
        );
        assert_eq!(
            CarStatus::parse_moderation("pending"),
            Some(CarStatus::Pending)
        );
        assert_eq!(CarStatus::parse_moderation("sold"), None);
    }

    #[test]
    fn plain_parse_rejects_rejected() {
        assert_eq!(CarStatus::parse("rejected"), None);
        assert_eq!(CarStatus::parse("approved"), Some(CarStatus::Approved));
    }

    #[test]
    fn empty_changes_detected() {
        assert!(CarChanges::default().is_empty());
        let changes = CarChanges {
            description: Some(None),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
