use serde::{Deserialize, Serialize};

use crate::storage::{Transformations, UploadedImage};

#[derive(Debug, Serialize)]
pub struct ImageResponse {
    pub success: bool,
    pub message: String,
    pub image: UploadedImage,
}

#[derive(Debug, Serialize)]
pub struct ImagesResponse {
    pub success: bool,
    pub message: String,
    pub images: Vec<UploadedImage>,
}

#[derive(Debug, Serialize)]
pub struct DeletedImageResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    pub public_id: String,
    #[serde(default)]
    pub transformations: Transformations,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransformResponse {
    pub success: bool,
    pub transformed_url: String,
}
