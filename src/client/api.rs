use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use url::Url;

use crate::storage::ImageRecord;
use crate::web_pages::{UPLOAD_FIELD, UploadResponse};

use super::ClientError;

/// The upload service as seen from the crop client.
#[async_trait]
pub trait ImageApi: Send + Sync {
    async fn upload(&self, bytes: Vec<u8>, file_name: &str) -> Result<UploadResponse, ClientError>;

    async fn list_images(&self) -> Result<Vec<ImageRecord>, ClientError>;
}

pub struct HttpImageApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpImageApi {
    /// `base_url` should end with `/` so relative paths join beneath it.
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL of a stored image.
    pub fn image_url(&self, record: &ImageRecord) -> Result<Url, ClientError> {
        self.endpoint(&record.image_path)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|err| ClientError::Url(err.to_string()))
    }
}

#[async_trait]
impl ImageApi for HttpImageApi {
    async fn upload(&self, bytes: Vec<u8>, file_name: &str) -> Result<UploadResponse, ClientError> {
        let part = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("image/jpeg")?;
        let form = Form::new().part(UPLOAD_FIELD, part);
        let response = self
            .client
            .post(self.endpoint("upload")?)
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }
        Ok(response.json::<UploadResponse>().await?)
    }

    async fn list_images(&self) -> Result<Vec<ImageRecord>, ClientError> {
        let response = self.client.get(self.endpoint("images")?).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status { status, body });
        }
        Ok(response.json::<Vec<ImageRecord>>().await?)
    }
}
