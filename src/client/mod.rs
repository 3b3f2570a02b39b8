//! Headless crop client.
//!
//! Models the single-page upload flow: choose or drop an image, crop it to
//! a square, serialise the crop as JPEG, upload it and show the latest
//! stored image.

pub mod api;
pub mod cropper;
pub mod session;

pub use api::{HttpImageApi, ImageApi};
pub use cropper::{CropRegion, CropWidget};
pub use session::{CropSession, Notification, NotificationLevel, SelectedFile};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("server responded {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("invalid url: {0}")]
    Url(String),
}
