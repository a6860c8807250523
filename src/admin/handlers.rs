use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, patch},
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    admin::dto::{
        DashboardStats, RoleUpdateRequest, RoleUpdateResponse, StatsResponse, StatusFilterQuery,
        UserFilterQuery, UserListResponse,
    },
    auth::{claims::UserRole, extractors::AdminUser, repo::User},
    cars::{
        dto::{CarListResponse, CarResponse, DeletedResponse, StatusUpdateRequest},
        repo::{Car, CarFilter, CarStatus},
    },
    error::AppError,
    inspections::{
        dto as inspection_dto,
        repo::{Inspection, InspectionFilter, InspectionOrder, InspectionStatus},
    },
    pagination::{PageInfo, Pagination},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/stats", get(stats))
        .route("/users", get(list_users))
        .route("/users/:id/role", patch(update_user_role))
        .route("/cars", get(list_cars))
        .route("/cars/:id", delete(delete_car))
        .route("/cars/:id/status", patch(set_car_status))
        .route("/inspections", get(list_inspections))
        .route("/inspections/:id", delete(delete_inspection))
        .route("/inspections/:id/status", patch(set_inspection_status))
}

#[instrument(skip(state))]
async fn stats(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> Result<Json<StatsResponse>, AppError> {
    let total_users = User::count(&state.db).await?;
    let total_cars = Car::count(&state.db, None).await?;
    let total_inspections = Inspection::count(&state.db, None).await?;
    let pending_cars = Car::count(&state.db, Some(CarStatus::Pending)).await?;
    let pending_inspections =
        Inspection::count(&state.db, Some(InspectionStatus::Pending)).await?;
    Ok(Json(StatsResponse {
        success: true,
        stats: DashboardStats {
            total_users,
            total_cars,
            total_inspections,
            pending_cars,
            pending_inspections,
        },
    }))
}

#[instrument(skip(state))]
async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(filter): Query<UserFilterQuery>,
    Query(page): Query<Pagination>,
) -> Result<Json<UserListResponse>, AppError> {
    let role = filter.role.as_deref().and_then(UserRole::parse);
    let (limit, offset) = page.clamped();
    let users = User::list(&state.db, role, limit, offset).await?;
    let total = users.len();
    Ok(Json(UserListResponse {
        success: true,
        users,
        pagination: PageInfo::new(limit, offset, total),
    }))
}

#[instrument(skip(state, payload))]
async fn update_user_role(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<RoleUpdateRequest>,
) -> Result<Json<RoleUpdateResponse>, AppError> {
    let role = UserRole::parse(&payload.role)
        .ok_or_else(|| AppError::bad_request("Valid role (user, admin) is required"))?;
    // An admin reassigning their own role would silently change what their
    // still-valid token is allowed to do.
    if admin.id == id {
        return Err(AppError::bad_request("Cannot change your own role"));
    }
    let user = User::set_role(&state.db, id, role)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))?;
    info!(user_id = %id, role = role.as_str(), "user role updated");
    Ok(Json(RoleUpdateResponse {
        success: true,
        message: format!("User role updated to {}", payload.role),
        user,
    }))
}

#[instrument(skip(state))]
async fn list_cars(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(filter): Query<StatusFilterQuery>,
    Query(page): Query<Pagination>,
) -> Result<Json<CarListResponse>, AppError> {
    let repo_filter = CarFilter {
        status: filter.status.as_deref().and_then(CarStatus::parse),
        ..Default::default()
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

#[instrument(skip(state, payload))]
async fn set_car_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<Json<CarResponse>, AppError> {
    // The moderation surface also accepts "rejected", which returns the
    // listing to the pending queue.
    let status = CarStatus::parse_moderation(&payload.status).ok_or_else(|| {
        AppError::bad_request("Valid status (pending, approved, rejected) is required")
    })?;
    let car = Car::set_status(&state.db, id, status)
        .await?
        .ok_or_else(|| AppError::not_found("Car not found"))?;
    Ok(Json(CarResponse {
        success: true,
        message: Some(format!("Car listing {} successfully", payload.status)),
        car,
    }))
}

#[instrument(skip(state))]
async fn delete_car(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, AppError> {
    Car::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Car not found"))?;
    Car::delete_cascade(&state.db, id).await?;
    info!(car_id = %id, admin_id = %admin.id, "car listing deleted by admin");
    Ok(Json(DeletedResponse {
        success: true,
        message: "Car and related inspections deleted successfully".into(),
    }))
}

#[instrument(skip(state))]
async fn list_inspections(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Query(filter): Query<StatusFilterQuery>,
    Query(page): Query<Pagination>,
) -> Result<Json<inspection_dto::InspectionListResponse>, AppError> {
    let repo_filter = InspectionFilter {
        user_id: None,
        status: filter.status.as_deref().and_then(InspectionStatus::parse),
    };
    let (limit, offset) = page.clamped();
    let inspections = Inspection::list_with_refs(
        &state.db,
        &repo_filter,
        InspectionOrder::CreatedDesc,
        limit,
        offset,
    )
    .await?;
    let total = inspections.len();
    Ok(Json(inspection_dto::InspectionListResponse {
        success: true,
        inspections,
        pagination: PageInfo::new(limit, offset, total),
    }))
}

#[instrument(skip(state, payload))]
async fn set_inspection_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<inspection_dto::StatusUpdateRequest>,
) -> Result<Json<inspection_dto::InspectionResponse>, AppError> {
    let status = InspectionStatus::parse(&payload.status)
        .ok_or_else(|| AppError::bad_request("Valid status (pending, confirmed) is required"))?;
    let inspection = Inspection::set_status(&state.db, id, status)
        .await?
        .ok_or_else(|| AppError::not_found("Inspection not found"))?;
    Ok(Json(inspection_dto::InspectionResponse {
        success: true,
        message: Some(format!("Inspection {} successfully", payload.status)),
        inspection,
    }))
}

#[instrument(skip(state))]
async fn delete_inspection(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(id): Path<Uuid>,
) -> Result<Json<inspection_dto::DeletedResponse>, AppError> {
    Inspection::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Inspection not found"))?;
    Inspection::delete(&state.db, id).await?;
    info!(inspection_id = %id, admin_id = %admin.id, "inspection deleted by admin");
    Ok(Json(inspection_dto::DeletedResponse {
        success: true,
        message: "Inspection deleted successfully".into(),
    }))
}
