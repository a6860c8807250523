use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool, QueryBuilder};
use time::OffsetDateTime;
use uuid::Uuid;

/// Appointment state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "inspection_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InspectionStatus {
    Pending,
    Confirmed,
}

impl InspectionStatus {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Inspection {
    pub id: Uuid,
    pub user_id: Uuid,
    pub car_id: Uuid,
    #[serde(with = "time::serde::rfc3339")]
    pub date: OffsetDateTime,
    pub notes: Option<String>,
    pub status: InspectionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Listing summary joined onto inspection reads.
#[derive(Debug, Clone, Serialize)]
pub struct CarSummary {
    pub id: Uuid,
    pub title: String,
    pub brand: String,
    pub model: String,
    pub year: i32,
    pub price: i32,
}

/// Requester identity joined onto inspection reads.
#[derive(Debug, Clone, Serialize)]
pub struct RequesterInfo {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InspectionWithRefs {
    #[serde(flatten)]
    pub inspection: Inspection,
    pub car: Option<CarSummary>,
    pub user: Option<RequesterInfo>,
}

#[derive(Debug, FromRow)]
struct InspectionRefsRow {
    id: Uuid,
    user_id: Uuid,
    car_id: Uuid,
    date: OffsetDateTime,
    notes: Option<String>,
    status: InspectionStatus,
    created_at: OffsetDateTime,
    car_title: Option<String>,
    car_brand: Option<String>,
    car_model: Option<String>,
    car_year: Option<i32>,
    car_price: Option<i32>,
    requester_name: Option<String>,
    requester_email: Option<String>,
    requester_phone: Option<String>,
}

impl From<InspectionRefsRow> for InspectionWithRefs {
    fn from(r: InspectionRefsRow) -> Self {
        let car = match (r.car_title, r.car_brand, r.car_model, r.car_year, r.car_price) {
            (Some(title), Some(brand), Some(model), Some(year), Some(price)) => Some(CarSummary {
                id: r.car_id,
                title,
                brand,
                model,
                year,
                price,
            }),
            _ => None,
        };
        let user = match (r.requester_name, r.requester_email) {
            (Some(name), Some(email)) => Some(RequesterInfo {
                id: r.user_id,
                name,
                email,
                phone: r.requester_phone,
            }),
            _ => None,
        };
        Self {
            inspection: Inspection {
                id: r.id,
                user_id: r.user_id,
                car_id: r.car_id,
                date: r.date,
                notes: r.notes,
                status: r.status,
                created_at: r.created_at,
            },
            car,
            user,
        }
    }
}

#[derive(Debug, Default)]
pub struct InspectionFilter {
    /// Set for non-admin actors: restricts rows to this requester.
    pub user_id: Option<Uuid>,
    pub status: Option<InspectionStatus>,
}

/// Collection ordering: requesters browse by appointment date, the admin
/// view by submission time.
#[derive(Debug, Clone, Copy)]
pub enum InspectionOrder {
    DateDesc,
    CreatedDesc,
}

/// Validated partial update; `notes: Some(None)` clears the text.
#[derive(Debug, Default)]
pub struct InspectionChanges {
    pub date: Option<OffsetDateTime>,
    pub notes: Option<Option<String>>,
}

impl InspectionChanges {
    pub fn is_empty(&self) -> bool {
        self.date.is_none() && self.notes.is_none()
    }
}

const JOINED_SELECT: &str = "SELECT i.id, i.user_id, i.car_id, i.date, i.notes, i.status, i.created_at, \
     c.title AS car_title, c.brand AS car_brand, c.model AS car_model, \
     c.year AS car_year, c.price AS car_price, \
     u.name AS requester_name, u.email AS requester_email, u.phone AS requester_phone \
     FROM inspections i \
     LEFT JOIN cars c ON c.id = i.car_id \
     LEFT JOIN users u ON u.id = i.user_id";

impl Inspection {
    pub async fn insert(
        db: &PgPool,
        user_id: Uuid,
        car_id: Uuid,
        date: OffsetDateTime,
        notes: Option<&str>,
    ) -> anyhow::Result<Inspection> {
        let inspection = sqlx::query_as::<_, Inspection>(
            r#"
            INSERT INTO inspections (user_id, car_id, date, notes, status)
            VALUES ($1, $2, $3, $4, 'pending')
            RETURNING id, user_id, car_id, date, notes, status, created_at
            "#,
        )
        .bind(user_id)
        .bind(car_id)
        .bind(date)
        .bind(notes)
        .fetch_one(db)
        .await?;
        Ok(inspection)
    }

    pub async fn find(db: &PgPool, id: Uuid) -> anyhow::Result<Option<Inspection>> {
        let inspection = sqlx::query_as::<_, Inspection>(
            r#"
            SELECT id, user_id, car_id, date, notes, status, created_at
            FROM inspections
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(db)
        .await?;
        Ok(inspection)
    }

    pub async fn find_with_refs(
        db: &PgPool,
        id: Uuid,
    ) -> anyhow::Result<Option<InspectionWithRefs>> {
        let mut qb = QueryBuilder::new(JOINED_SELECT);
        qb.push(" WHERE i.id = ").push_bind(id);
        let row = qb
            .build_query_as::<InspectionRefsRow>()
            .fetch_optional(db)
            .await?;
        Ok(row.map(Into::into))
    }

    pub async fn list_with_refs(
        db: &PgPool,
        filter: &InspectionFilter,
        order: InspectionOrder,
        limit: i64,
        offset: i64,
    ) -> anyhow::Result<Vec<InspectionWithRefs>> {
        let mut qb = QueryBuilder::new(JOINED_SELECT);
        qb.push(" WHERE 1 = 1");
        if let Some(user_id) = filter.user_id {
            qb.push(" AND i.user_id = ").push_bind(user_id);
        }
        if let Some(status) = filter.status {
            qb.push(" AND i.status = ").push_bind(status);
        }
        qb.push(match order {
            InspectionOrder::DateDesc => " ORDER BY i.date DESC",
            InspectionOrder::CreatedDesc => " ORDER BY i.created_at DESC",
        });
        qb.push(" LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);
        let rows = qb
            .build_query_as::<InspectionRefsRow>()
            .fetch_all(db)
            .await?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    /// True when the requester already has a pending appointment for this car.
    pub async fn pending_exists(db: &PgPool, user_id: Uuid, car_id: Uuid) -> anyhow::Result<bool> {
        let (exists,): (bool,) = sqlx::query_as(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM inspections
                WHERE user_id = $1 AND car_id = $2 AND status = 'pending'
            )
            "#,
        )
        .bind(user_id)
        .bind(car_id)
        .fetch_one(db)
        .await?;
        Ok(exists)
    }

    pub async fn update(
        db: &PgPool,
        id: Uuid,
        changes: &InspectionChanges,
    ) -> anyhow::Result<Inspection> {
        let mut qb = QueryBuilder::new("UPDATE inspections SET ");
        let mut fields = qb.separated(", ");
        if let Some(date) = changes.date {
            fields.push("date = ").push_bind_unseparated(date);
        }
        if let Some(notes) = &changes.notes {
            fields.push("notes = ").push_bind_unseparated(notes.clone());
        }
        qb.push(" WHERE id = ").push_bind(id);
        qb.push(" RETURNING id, user_id, car_id, date, notes, status, created_at");
        let inspection = qb.build_query_as::<Inspection>().fetch_one(db).await?;
        Ok(inspection)
    }

    pub async fn delete(db: &PgPool, id: Uuid) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM inspections WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn set_status(
        db: &PgPool,
        id: Uuid,
        status: InspectionStatus,
    ) -> anyhow::Result<Option<Inspection>> {
        let inspection = sqlx::query_as::<_, Inspection>(
            r#"
            UPDATE inspections SET status = $2
            WHERE id = $1
            RETURNING id, user_id, car_id, date, notes, status, created_at
            "#,
        )
        .bind(id)
        .bind(status)
        .fetch_optional(db)
        .await?;
        Ok(inspection)
    }

    pub async fn count(db: &PgPool, status: Option<InspectionStatus>) -> anyhow::Result<i64> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM inspections");
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
    fn status_parses_known_values_only() {
        assert_eq!(
            InspectionStatus::parse("pending"),
            Some(InspectionStatus::Pending)
        );
        assert_eq!(
            InspectionStatus::parse("confirmed"),
            Some(InspectionStatus::Confirmed)
        );
        assert_eq!(InspectionStatus::parse("approved"), None);
        assert_eq!(InspectionStatus::parse("rejected"), None);
    }

    #[test]
    fn empty_changes_detected() {
        assert!(InspectionChanges::default().is_empty());
        let changes = InspectionChanges {
            notes: Some(None),
            ..Default::default()
        };
        assert!(!changes.is_empty());
    }
}
