use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Image hosting is not configured")]
    NotConfigured,
    #[error("Image upload request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Image host rejected the upload ({status}): {body}")]
    Rejected { status: u16, body: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedImage {
    pub url: String,
    pub public_id: String,
}

#[async_trait]
pub trait ImageHost: Send + Sync {
    async fn upload_image(&self, bytes: Vec<u8>, content_type: &str) -> Result<UploadedImage, UploadError>;
}

/// Unsigned uploads through a Cloudinary upload preset.
pub struct CloudinaryHost {
    cloud_name: String,
    upload_preset: String,
    http_client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CloudinaryUploadResponse {
    secure_url: String,
    public_id: String,
}

impl CloudinaryHost {
    pub fn new(cloud_name: impl Into<String>, upload_preset: impl Into<String>) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            upload_preset: upload_preset.into(),
            http_client: reqwest::Client::new(),
        }
    }

    fn upload_url(&self) -> String {
        format!(
            "https://api.cloudinary.com/v1_1/{}/image/upload",
            self.cloud_name
        )
    }
}

fn data_uri(bytes: &[u8], content_type: &str) -> String {
    format!("data:{};base64,{}", content_type, STANDARD.encode(bytes))
}

#[async_trait]
impl ImageHost for CloudinaryHost {
    async fn upload_image(&self, bytes: Vec<u8>, content_type: &str) -> Result<UploadedImage, UploadError> {
        let params = [
            ("file", data_uri(&bytes, content_type)),
            ("upload_preset", self.upload_preset.clone()),
        ];

        let response = self
            .http_client
            .post(self.upload_url())
            .form(&params)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected { status, body });
        }

        let uploaded: CloudinaryUploadResponse = response.json().await?;
        Ok(UploadedImage {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
        })
    }
}

pub struct DisabledImageHost;

#[async_trait]
impl ImageHost for DisabledImageHost {
    async fn upload_image(&self, _bytes: Vec<u8>, _content_type: &str) -> Result<UploadedImage, UploadError> {
        Err(UploadError::NotConfigured)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;

    /// Accepts every upload and returns a stable Cloudinary-style URL.
    pub struct StaticImageHost;

    #[async_trait]
    impl ImageHost for StaticImageHost {
        async fn upload_image(&self, bytes: Vec<u8>, _content_type: &str) -> Result<UploadedImage, UploadError> {
            Ok(UploadedImage {
                url: format!("https://res.cloudinary.com/test/image/upload/{}.jpg", bytes.len()),
                public_id: format!("family/{}", bytes.len()),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri() {
        assert_eq!(data_uri(b"abc", "image/png"), "data:image/png;base64,YWJj");
    }

    #[test]
    fn test_upload_url() {
        let host = CloudinaryHost::new("family", "preset");
        assert_eq!(host.upload_url(), "https://api.cloudinary.com/v1_1/family/image/upload");
    }

    #[tokio::test]
    async fn test_disabled_host_rejects() {
        let err = DisabledImageHost.upload_image(vec![1, 2, 3], "image/jpeg").await.unwrap_err();
        assert!(matches!(err, UploadError::NotConfigured));
    }
}
