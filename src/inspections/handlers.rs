use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, patch},
    Json, Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::extractors::{AdminUser, AuthUser},
    cars::repo::{Car, CarStatus},
    error::AppError,
    inspections::{
        dto::{
            parse_future_date, CreateInspectionRequest, DeletedResponse,
            InspectionDetailResponse, InspectionFilterQuery, InspectionListResponse,
            InspectionResponse, StatusUpdateRequest, UpdateInspectionRequest,
        },
        repo::{Inspection, InspectionFilter, InspectionOrder, InspectionStatus},
    },
    pagination::{PageInfo, Pagination},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_inspections).post(create_inspection))
        .route(
            "/:id",
            get(get_inspection)
                .patch(update_inspection)
                .delete(delete_inspection),
        )
        .route("/:id/status", patch(set_inspection_status))
}

#[instrument(skip(state, actor))]
async fn list_inspections(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Query(filter): Query<InspectionFilterQuery>,
    Query(page): Query<Pagination>,
) -> Result<Json<InspectionListResponse>, AppError> {
    // Non-admins only ever see their own appointments.
    let (user_scope, order) = if actor.is_admin() {
        (None, InspectionOrder::CreatedDesc)
    } else {
        (Some(actor.id), InspectionOrder::DateDesc)
    };
    let repo_filter = InspectionFilter {
        user_id: user_scope,
        status: filter.status.as_deref().and_then(InspectionStatus::parse),
    };
    let (limit, offset) = page.clamped();
    let inspections =
        Inspection::list_with_refs(&state.db, &repo_filter, order, limit, offset).await?;
    let total = inspections.len();
    Ok(Json(InspectionListResponse {
        success: true,
        inspections,
        pagination: PageInfo::new(limit, offset, total),
    }))
}

#[instrument(skip(state))]
async fn get_inspection(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<InspectionDetailResponse>, AppError> {
    let inspection = Inspection::find_with_refs(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Inspection not found"))?;
    if !actor.can_mutate(inspection.inspection.user_id) {
        return Err(AppError::Forbidden("Permission denied".into()));
    }
    Ok(Json(InspectionDetailResponse {
        success: true,
        inspection,
    }))
}

#[instrument(skip(state, payload))]
async fn create_inspection(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<CreateInspectionRequest>,
) -> Result<(StatusCode, Json<InspectionResponse>), AppError> {
    let date = parse_future_date(&payload.date)?;

    let car = Car::find(&state.db, payload.car_id)
        .await?
        .ok_or_else(|| AppError::not_found("Car not found"))?;
    if car.status != CarStatus::Approved {
        return Err(AppError::bad_request(
            "Can only book inspections for approved cars",
        ));
    }

    if Inspection::pending_exists(&state.db, actor.id, payload.car_id).await? {
        warn!(user_id = %actor.id, car_id = %payload.car_id, "duplicate pending inspection");
        return Err(AppError::Conflict(
            "You already have a pending inspection for this car".into(),
        ));
    }

    let inspection = Inspection::insert(
        &state.db,
        actor.id,
        payload.car_id,
        date,
        payload.notes.as_deref(),
    )
    .await?;
    info!(inspection_id = %inspection.id, user_id = %actor.id, "inspection booked");
    Ok((
        StatusCode::CREATED,
        Json(InspectionResponse {
            success: true,
            message: Some("Inspection appointment created successfully".into()),
            inspection,
        }),
    ))
}

#[instrument(skip(state, payload))]
async fn update_inspection(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateInspectionRequest>,
) -> Result<Json<InspectionResponse>, AppError> {
    let existing = Inspection::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Inspection not found"))?;
    if !actor.can_mutate(existing.user_id) {
        return Err(AppError::Forbidden("Permission denied".into()));
    }
    let changes = payload.into_changes()?;
    let inspection = Inspection::update(&state.db, id, &changes).await?;
    Ok(Json(InspectionResponse {
        success: true,
        message: Some("Inspection updated successfully".into()),
        inspection,
    }))
}

#[instrument(skip(state))]
async fn delete_inspection(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(id): Path<Uuid>,
) -> Result<Json<DeletedResponse>, AppError> {
    let existing = Inspection::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::not_found("Inspection not found"))?;
    if !actor.can_mutate(existing.user_id) {
        return Err(AppError::Forbidden("Permission denied".into()));
    }
    Inspection::delete(&state.db, id).await?;
    info!(inspection_id = %id, user_id = %actor.id, "inspection deleted");
    Ok(Json(DeletedResponse {
        success: true,
        message: "Inspection deleted successfully".into(),
    }))
}

#[instrument(skip(state))]
async fn set_inspection_status(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<StatusUpdateRequest>,
) -> Result<Json<InspectionResponse>, AppError> {
    let status = InspectionStatus::parse(&payload.status)
        .ok_or_else(|| AppError::bad_request("Valid status (pending, confirmed) is required"))?;
    let inspection = Inspection::set_status(&state.db, id, status)
        .await?
        .ok_or_else(|| AppError::not_found("Inspection not found"))?;
    Ok(Json(InspectionResponse {
        success: true,
        message: Some(format!("Inspection {} successfully", payload.status)),
        inspection,
    }))
}
