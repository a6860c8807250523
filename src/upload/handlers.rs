use axum::{
    extract::{DefaultBodyLimit, Multipart, Path, State},
    routing::{delete, post},
    Json, Router,
};
use bytes::Bytes;
use tracing::{error, info, instrument};

use crate::{
    auth::extractors::AuthUser,
    error::AppError,
    state::AppState,
    storage::UploadedImage,
    upload::dto::{
        DeletedImageResponse, ImageResponse, ImagesResponse, TransformRequest, TransformResponse,
    },
};

const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;
const MAX_BATCH_FILES: usize = 10;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/image", post(upload_image))
        .route("/images", post(upload_images))
        .route("/image/:public_id", delete(delete_image))
        .route("/transform", post(transform))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

fn is_image(content_type: &str) -> bool {
    content_type.starts_with("image/")
}

#[derive(Debug)]
struct IncomingFile {
    body: Bytes,
    content_type: String,
}

async fn collect_files(
    mut mp: Multipart,
    field_name: &str,
    max: usize,
) -> Result<Vec<IncomingFile>, AppError> {
    let mut files = Vec::new();
    loop {
        let field = match mp.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return Err(AppError::bad_request(format!("Invalid upload body: {e}")));
            }
        };
        if field.name() != Some(field_name) {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        if !is_image(&content_type) {
            return Err(AppError::bad_request("Only image files are allowed"));
        }
        let body = field
            .bytes()
            .await
            .map_err(|_| AppError::bad_request("Failed to read uploaded file"))?;
        files.push(IncomingFile { body, content_type });
        if files.len() > max {
            return Err(AppError::bad_request("Too many files"));
        }
    }
    Ok(files)
}

async fn push_to_host(state: &AppState, file: IncomingFile) -> Result<UploadedImage, AppError> {
    state
        .images
        .upload(file.body, &file.content_type)
        .await
        .map_err(|e| {
            error!(error = %e, "image upload failed");
            AppError::Internal(e)
        })
}

#[instrument(skip(state, mp))]
async fn upload_image(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    mp: Multipart,
) -> Result<Json<ImageResponse>, AppError> {
    let mut files = collect_files(mp, "image", 1).await?;
    let file = files
        .pop()
        .ok_or_else(|| AppError::bad_request("No image file provided"))?;
    let image = push_to_host(&state, file).await?;
    info!(user_id = %actor.id, public_id = %image.public_id, "image uploaded");
    Ok(Json(ImageResponse {
        success: true,
        message: "Image uploaded successfully".into(),
        image,
    }))
}

#[instrument(skip(state, mp))]
async fn upload_images(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    mp: Multipart,
) -> Result<Json<ImagesResponse>, AppError> {
    let files = collect_files(mp, "images", MAX_BATCH_FILES).await?;
    if files.is_empty() {
        return Err(AppError::bad_request("No image files provided"));
    }
    let mut images = Vec::with_capacity(files.len());
    for file in files {
        images.push(push_to_host(&state, file).await?);
    }
    info!(user_id = %actor.id, count = images.len(), "images uploaded");
    Ok(Json(ImagesResponse {
        success: true,
        message: format!("{} images uploaded successfully", images.len()),
        images,
    }))
}

#[instrument(skip(state))]
async fn delete_image(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(public_id): Path<String>,
) -> Result<Json<DeletedImageResponse>, AppError> {
    if public_id.is_empty() {
        return Err(AppError::bad_request("Public ID is required"));
    }
    let deleted = state.images.delete(&public_id).await.map_err(|e| {
        error!(error = %e, "image delete failed");
        AppError::Internal(e)
    })?;
    if !deleted {
        return Err(AppError::bad_request("Failed to delete image"));
    }
    info!(user_id = %actor.id, public_id = %public_id, "image deleted");
    Ok(Json(DeletedImageResponse {
        success: true,
        message: "Image deleted successfully".into(),
    }))
}

#[instrument(skip(state))]
async fn transform(
    State(state): State<AppState>,
    AuthUser(_actor): AuthUser,
    Json(payload): Json<TransformRequest>,
) -> Result<Json<TransformResponse>, AppError> {
    if payload.public_id.is_empty() {
        return Err(AppError::bad_request("Public ID is required"));
    }
    let transformed_url = state
        .images
        .transform_url(&payload.public_id, &payload.transformations);
    Ok(Json(TransformResponse {
        success: true,
        transformed_url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, extract::FromRequest, http::Request};

    async fn multipart_from(body: &'static str) -> Multipart {
        let req = Request::builder()
            .header("content-type", "multipart/form-data; boundary=XYZ")
            .body(Body::from(body))
            .unwrap();
        Multipart::from_request(req, &()).await.unwrap()
    }

    #[tokio::test]
    async fn well_formed_multipart_collects_named_fields() {
        let mp = multipart_from(
            "--XYZ\r\n\
             content-disposition: form-data; name=\"images\"; filename=\"a.png\"\r\n\
             content-type: image/png\r\n\r\n\
             data\r\n\
             --XYZ--\r\n",
        )
        .await;
        let files = collect_files(mp, "images", MAX_BATCH_FILES).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].content_type, "image/png");
    }

    #[tokio::test]
    async fn malformed_body_is_reported_not_swallowed() {
        // No boundary anywhere in the payload: the stream itself is broken,
        // which must not read as "no files provided".
        let mp = multipart_from("this is not a multipart payload").await;
        let err = collect_files(mp, "images", MAX_BATCH_FILES)
            .await
            .unwrap_err();
        assert_eq!(err.status_code(), axum::http::StatusCode::BAD_REQUEST);
        assert!(err.to_string().starts_with("Invalid upload body"));
    }

    #[test]
    fn mime_gate_accepts_images_only() {
        assert!(is_image("image/jpeg"));
        assert!(is_image("image/png"));
        assert!(is_image("image/webp"));
        assert!(!is_image("application/pdf"));
        assert!(!is_image("text/html"));
        assert!(!is_image("application/octet-stream"));
    }
}
