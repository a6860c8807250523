use anyhow::Context;
use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::config::CloudinaryConfig;

/// Result of handing an image to the external host.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedImage {
    pub url: String,
    pub public_id: String,
    pub width: u32,
    pub height: u32,
}

/// Requested delivery transformation for a hosted image.
#[derive(Debug, Default, Deserialize)]
pub struct Transformations {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub crop: Option<String>,
}

/// External image-hosting collaborator. The service owns storage, scaling
/// and delivery; we only hold public ids and URLs.
#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload(&self, body: Bytes, content_type: &str) -> anyhow::Result<UploadedImage>;
    /// Returns false when the host did not know the public id.
    async fn delete(&self, public_id: &str) -> anyhow::Result<bool>;
    fn transform_url(&self, public_id: &str, t: &Transformations) -> String;
}

/// Cloudinary-backed image host. Uploads go through an unsigned upload
/// preset; deletes use the basic-auth admin API.
pub struct Cloudinary {
    http: reqwest::Client,
    cloud_name: String,
    api_key: String,
    api_secret: String,
    upload_preset: String,
    folder: String,
}

#[derive(Debug, Deserialize)]
struct UploadApiResponse {
    secure_url: String,
    public_id: String,
    width: u32,
    height: u32,
}

#[derive(Debug, Deserialize)]
struct DeleteApiResponse {
    deleted: HashMap<String, String>,
}

impl Cloudinary {
    pub fn new(config: &CloudinaryConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            cloud_name: config.cloud_name.clone(),
            api_key: config.api_key.clone(),
            api_secret: config.api_secret.clone(),
            upload_preset: config.upload_preset.clone(),
            folder: config.folder.clone(),
        }
    }

    fn api_base(&self) -> String {
        format!("https://api.cloudinary.com/v1_1/{}", self.cloud_name)
    }
}

/// Builds the comma-separated transformation segment of a delivery URL,
/// e.g. `w_1200,h_800,c_limit`.
pub(crate) fn transformation_segment(t: &Transformations) -> String {
    let mut parts = Vec::new();
    if let Some(w) = t.width {
        parts.push(format!("w_{w}"));
    }
    if let Some(h) = t.height {
        parts.push(format!("h_{h}"));
    }
    if let Some(crop) = &t.crop {
        parts.push(format!("c_{crop}"));
    }
    parts.join(",")
}

#[async_trait]
impl ImageHost for Cloudinary {
    async fn upload(&self, body: Bytes, content_type: &str) -> anyhow::Result<UploadedImage> {
        let part = reqwest::multipart::Part::bytes(body.to_vec())
            .file_name("upload")
            .mime_str(content_type)
            .context("invalid content type")?;
        let form = reqwest::multipart::Form::new()
            .text("upload_preset", self.upload_preset.clone())
            .text("folder", self.folder.clone())
            .part("file", part);

        let res = self
            .http
            .post(format!("{}/image/upload", self.api_base()))
            .multipart(form)
            .send()
            .await
            .context("cloudinary upload request")?;
        if !res.status().is_success() {
            anyhow::bail!("cloudinary upload failed with status {}", res.status());
        }
        let body: UploadApiResponse = res.json().await.context("cloudinary upload response")?;
        Ok(UploadedImage {
            url: body.secure_url,
            public_id: body.public_id,
            width: body.width,
            height: body.height,
        })
    }

    async fn delete(&self, public_id: &str) -> anyhow::Result<bool> {
        let res = self
            .http
            .delete(format!("{}/resources/image/upload", self.api_base()))
            .basic_auth(&self.api_key, Some(&self.api_secret))
            .query(&[("public_ids[]", public_id)])
            .send()
            .await
            .context("cloudinary delete request")?;
        if !res.status().is_success() {
            anyhow::bail!("cloudinary delete failed with status {}", res.status());
        }
        let body: DeleteApiResponse = res.json().await.context("cloudinary delete response")?;
        Ok(body
            .deleted
            .get(public_id)
            .is_some_and(|outcome| outcome == "deleted"))
    }

    fn transform_url(&self, public_id: &str, t: &Transformations) -> String {
        let segment = transformation_segment(t);
        if segment.is_empty() {
            format!(
                "https://res.cloudinary.com/{}/image/upload/{}",
                self.cloud_name, public_id
            )
        } else {
            format!(
                "https://res.cloudinary.com/{}/image/upload/{}/{}",
                self.cloud_name, segment, public_id
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn host() -> Cloudinary {
        Cloudinary::new(&CloudinaryConfig {
            cloud_name: "demo".into(),
            api_key: "key".into(),
            api_secret: "secret".into(),
            upload_preset: "unsigned".into(),
            folder: "motortech/cars".into(),
        })
    }

    #[test]
    fn transform_segment_is_comma_separated() {
        let t = Transformations {
            width: Some(1200),
            height: Some(800),
            crop: Some("limit".into()),
        };
        assert_eq!(transformation_segment(&t), "w_1200,h_800,c_limit");
    }

    #[test]
    fn transform_url_with_and_without_segment() {
        let h = host();
        let t = Transformations {
            width: Some(300),
            ..Default::default()
        };
        assert_eq!(
            h.transform_url("motortech/cars/abc", &t),
            "https://res.cloudinary.com/demo/image/upload/w_300/motortech/cars/abc"
        );
        assert_eq!(
            h.transform_url("motortech/cars/abc", &Transformations::default()),
            "https://res.cloudinary.com/demo/image/upload/motortech/cars/abc"
        );
    }

    #[test]
    fn uploaded_image_serializes_camel_case() {
        let img = UploadedImage {
            url: "https://res.cloudinary.com/demo/x.jpg".into(),
            public_id: "x".into(),
            width: 10,
            height: 20,
        };
        let json = serde_json::to_string(&img).unwrap();
        assert!(json.contains(r#""publicId":"x""#));
        assert!(json.contains(r#""width":10"#));
    }
}
