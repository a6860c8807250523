use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    auth::extractors::{AdminUser, AuthContext, AuthUser, OptionalAuthUser},
    cars::{
        dto::{
            CarDetailResponse, CarFilterQuery, CarListResponse, CarResponse, CreateCarRequest,
            DeletedResponse, StatusUpdateRequest, UpdateCarRequest,
        },
        repo::{Car, CarFilter, CarStatus, NewCar},
    },
    error::AppError,
    pagination::{PageInfo, Pagination},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_cars).post(create_car))
        .route("/:id", get(get_car).patch(update_car).delete(delete_car))
        .route("/:id/status", patch(set_car_status))
}

/// Non-admins only ever see approved listings in the collection view,
/// whatever they asked for. Admins get their requested filter.
fn effective_status_filter(
    actor: Option<&AuthContext>,
    requested: Option<CarStatus>,
) -> Option<CarStatus> {
    match actor {
        Some(a) if a.is_admin() => requested,
        _ => Some(CarStatus::Approved),
    }
}

/// A pending listing is visible to its owner and admins only. Everyone else
/// gets 404 rather than 403 so its existence is not leaked.
fn can_view(status: CarStatus, owner_id: Uuid, actor: Option<&AuthContext>) -> bool {
    match status {
        CarStatus::Approved => true,
        CarStatus::Pending => actor.is_some_and(|a| a.can_mutate(owner_id)),
    }
}

fn to_cents(major: f64) -> i32 {
    (major * 100.0).round() as i32
}

#[instrument(skip(state, actor))]
async fn list_cars(
    State(state): State<AppState>,
    OptionalAuthUser(actor): OptionalAuthUser,
    Query(filter): Query<CarFilterQuery>,
    Query(page): Query<Pagination>,
) -> Result<Json<CarListResponse>, AppError> {
    let requested = filter.status.as_deref().and_then(CarStatus::parse);
    let repo_filter = CarFilter {
        status: effective_status_filter(actor.as_ref(), requested),
        brand: filter.brand,
        model: filter.model,
        min_price: filter.min_price.map(to_cents),
        max_price: filter.max_price.map(to_cents),
    };
    let (limit, offset) = page.clamped();
    let cars = Car::list_with_owner(&state.db, &repo_filter, limit, offset).await?;
    let total = cars.len();
    Ok(Json(CarListResponse {
        success: true,
        cars,
        pagination: PageInfo::new(limit, offset, total),
    }))
}

#[instrument(skip(state, actor))]
async fn get_car(
    State(state): State<AppState>,
    OptionalAuthUser(actor): OptionalAuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<CarDetailResponse>, AppError> {
    let car = Car::find_with_owner(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Car not found"))?;
    if !can_view(car.car.status, car.car.user_id, actor.as_ref()) {
        return Err(AppError::not_found("Car not found"));
    }
    Ok(Json(CarDetailResponse { success: true, car }))
}

#[instrument(skip(state, payload))]
async fn create_car(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<CreateCarRequest>,
) -> Result<(StatusCode, Json<CarResponse>), AppError> {
    let price = payload.validate()?;
    let car = Car::insert(
        &state.db,
        NewCar {
            user_id: actor.id,
            title: payload.title,
            price,
            brand: payload.brand,
            model: payload.model,
            year: payload.year,
            description: payload.description,
            images: payload.images.unwrap_or_default(),
        },
    )
    .await?;
    info!(car_id = %car.id, user_id = %actor.id, "car listing created");
    Ok((
        StatusCode::CREATED,
        Json(CarResponse {
            success: true,
            message: Some("Car listing created successfully".into()),
            car,
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn update_car(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCarRequest>,
) -> Result<Json<CarResponse>, AppError> {
    let existing = Car::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Car not found"))?;
    if !actor.can_mutate(existing.user_id) {
        return Err(AppError::Forbidden("Permission denied".into()));
    }
    let changes = payload.into_changes()?;
    let car = Car::update(&state.db, id, &changes).await?;
    Ok(Json(CarResponse {
        success: true,
        message: Some("Car updated successfully".into()),
        car,
    }))
}

#[instrument(skip(state))]
async fn delete_car(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, AppError> {
    let existing = Car::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Car not found"))?;
    if !actor.can_mutate(existing.user_id) {
        return Err(AppError::Forbidden("Permission denied".into()));
    }
    Car::delete_cascade(&state.db, id).await?;
    info!(car_id = %id, user_id = %actor.id, "car listing deleted");
    Ok(Json(DeletedResponse {
        success: true,
        message: "Car deleted successfully".into(),
    }))
}

#[instrument(skip(state))]
async fn set_car_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<Json<CarResponse>, AppError> {
    let status = CarStatus::parse(&payload.status)
        .ok_or_else(|| AppError::bad_request("Valid status (pending, approved) is required"))?;
    let car = Car::set_status(&state.db, id, status)
        .await?
        .ok_or_else(|| AppError::not_found("Car not found"))?;
    Ok(Json(CarResponse {
        success: true,
        message: Some(format!("Car {} successfully", payload.status)),
        car,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::claims::UserRole;

    fn ctx(role: UserRole) -> AuthContext {
        AuthContext {
            id: Uuid::new_v4(),
            email: "a@x.com".into(),
            role,
        }
    }

    #[test]
    fn anonymous_collection_view_is_forced_to_approved() {
        assert_eq!(
            effective_status_filter(None, Some(CarStatus::Pending)),
            Some(CarStatus::Approved)
        );
        assert_eq!(effective_status_filter(None, None), Some(CarStatus::Approved));
    }

    #[test]
    fn non_admin_collection_view_is_forced_to_approved() {
        let user = ctx(UserRole::User);
        assert_eq!(
            effective_status_filter(Some(&user), Some(CarStatus::Pending)),
            Some(CarStatus::Approved)
        );
    }

    #[test]
    fn admin_collection_filter_is_honored() {
        let admin = ctx(UserRole::Admin);
        assert_eq!(
            effective_status_filter(Some(&admin), Some(CarStatus::Pending)),
            Some(CarStatus::Pending)
        );
        assert_eq!(effective_status_filter(Some(&admin), None), None);
    }

    #[test]
    fn pending_listing_hidden_from_strangers() {
        let owner = ctx(UserRole::User);
        let stranger = ctx(UserRole::User);
        let admin = ctx(UserRole::Admin);
        assert!(!can_view(CarStatus::Pending, owner.id, None));
        assert!(!can_view(CarStatus::Pending, owner.id, Some(&stranger)));
        assert!(can_view(CarStatus::Pending, owner.id, Some(&owner)));
        assert!(can_view(CarStatus::Pending, owner.id, Some(&admin)));
    }

    #[test]
    fn approved_listing_visible_to_everyone() {
        assert!(can_view(CarStatus::Approved, Uuid::new_v4(), None));
    }

    #[test]
    fn price_filters_convert_to_cents() {
        assert_eq!(to_cents(99.99), 9999);
        assert_eq!(to_cents(0.0), 0);
    }
}
