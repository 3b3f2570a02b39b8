use std::path::Path;

use base64::Engine;
use tracing::{error, info};

use crate::image_processing;
use crate::storage::ImageRecord;

use super::{CropWidget, ImageApi};

/// File name the crop is uploaded under.
pub const CROPPED_FILE_NAME: &str = "cropped-image.jpg";

pub const UPLOAD_SUCCEEDED: &str = "Image uploaded successfully!";
pub const UPLOAD_FAILED: &str = "Error uploading image";
pub const NOTHING_TO_UPLOAD: &str = "No cropped image to upload";
pub const FETCH_FAILED: &str = "Error fetching images";
pub const CROPPER_FAILED: &str = "Could not load the selected image";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Success,
    Error,
}

/// Transient message shown to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

/// A file picked through the dialog or dropped onto the drop target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectedFile {
    pub name: String,
    pub media_type: Option<String>,
    pub bytes: Vec<u8>,
}

impl SelectedFile {
    /// Media type is sniffed from the content.
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let media_type = image_processing::detect_mime_type(&bytes).map(str::to_string);
        Self {
            name: name.into(),
            media_type,
            bytes,
        }
    }

    pub fn with_media_type(mut self, media_type: impl Into<String>) -> Self {
        self.media_type = Some(media_type.into());
        self
    }

    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|value| value.to_string_lossy().to_string())
            .unwrap_or_default();
        Ok(Self::new(name, bytes))
    }

    pub fn is_image(&self) -> bool {
        self.media_type
            .as_deref()
            .is_some_and(|value| value.starts_with("image/"))
    }

    /// `data:` URL rendering the file locally.
    pub fn preview_url(&self) -> String {
        let media_type = self
            .media_type
            .as_deref()
            .unwrap_or("application/octet-stream");
        let encoded = base64::engine::general_purpose::STANDARD.encode(&self.bytes);
        format!("data:{media_type};base64,{encoded}")
    }
}

/// State of the upload page: dialogs, pending selection, crop widget,
/// fetched images and notifications.
///
/// Every operation is a single UI callback. Nothing is retried and
/// overlapping uploads are not guarded against.
pub struct CropSession<A> {
    api: A,
    show_upload_dialog: bool,
    show_crop_dialog: bool,
    selected: Option<SelectedFile>,
    preview_url: Option<String>,
    cropper: Option<CropWidget>,
    images: Vec<ImageRecord>,
    notifications: Vec<Notification>,
}

impl<A: ImageApi> CropSession<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            show_upload_dialog: false,
            show_crop_dialog: false,
            selected: None,
            preview_url: None,
            cropper: None,
            images: Vec::new(),
            notifications: Vec::new(),
        }
    }

    /// Page load: fetch the image list once.
    pub async fn load(&mut self) {
        self.fetch_images().await;
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    pub fn is_upload_dialog_open(&self) -> bool {
        self.show_upload_dialog
    }

    pub fn is_crop_dialog_open(&self) -> bool {
        self.show_crop_dialog
    }

    pub fn selected_file(&self) -> Option<&SelectedFile> {
        self.selected.as_ref()
    }

    pub fn preview_url(&self) -> Option<&str> {
        self.preview_url.as_deref()
    }

    pub fn cropper(&self) -> Option<&CropWidget> {
        self.cropper.as_ref()
    }

    pub fn cropper_mut(&mut self) -> Option<&mut CropWidget> {
        self.cropper.as_mut()
    }

    pub fn images(&self) -> &[ImageRecord] {
        &self.images
    }

    /// Most recently uploaded image, the only one the page displays.
    pub fn last_image(&self) -> Option<&ImageRecord> {
        self.images.last()
    }

    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    pub fn take_notifications(&mut self) -> Vec<Notification> {
        std::mem::take(&mut self.notifications)
    }

    pub fn open_upload_dialog(&mut self) {
        self.show_upload_dialog = true;
    }

    pub fn close_upload_dialog(&mut self) {
        self.show_upload_dialog = false;
    }

    /// Make `file` the pending selection and switch to the crop dialog.
    /// The crop widget stays inactive until [`Self::cropper_ready`].
    pub fn choose_file(&mut self, file: SelectedFile) {
        self.preview_url = Some(file.preview_url());
        self.selected = Some(file);
        self.cropper = None;
        self.show_upload_dialog = false;
        self.show_crop_dialog = true;
    }

    /// Drop target accepting only `image/*`. The first accepted file is
    /// chosen; returns whether any file was accepted.
    pub fn drop_files(&mut self, files: Vec<SelectedFile>) -> bool {
        match files.into_iter().find(SelectedFile::is_image) {
            Some(file) => {
                self.choose_file(file);
                true
            }
            None => false,
        }
    }

    /// The crop widget finished rendering the pending selection.
    pub fn cropper_ready(&mut self) -> bool {
        let Some(file) = self.selected.as_ref() else {
            return false;
        };
        match CropWidget::from_bytes(&file.bytes) {
            Ok(widget) => {
                self.cropper = Some(widget);
                true
            }
            Err(err) => {
                error!(file = %file.name, error = %err, "failed to initialise crop widget");
                self.notify(NotificationLevel::Error, CROPPER_FAILED);
                false
            }
        }
    }

    pub fn cancel_crop(&mut self) {
        self.show_crop_dialog = false;
    }

    /// JPEG of the current crop region, or `None` without an active widget.
    pub fn crop_image(&self) -> Option<Vec<u8>> {
        let widget = self.cropper.as_ref()?;
        match widget.to_jpeg() {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                error!(error = %err, "failed to serialise crop");
                None
            }
        }
    }

    /// Crop, upload and refresh. Returns whether the upload succeeded.
    pub async fn confirm_upload(&mut self) -> bool {
        let Some(blob) = self.crop_image() else {
            error!("no cropped image to upload");
            self.notify(NotificationLevel::Error, NOTHING_TO_UPLOAD);
            return false;
        };

        match self.api.upload(blob, CROPPED_FILE_NAME).await {
            Ok(response) => {
                info!(image_path = %response.image_path, "image uploaded");
                self.notify(NotificationLevel::Success, UPLOAD_SUCCEEDED);
                self.fetch_images().await;
                self.selected = None;
                self.preview_url = None;
                self.cropper = None;
                self.show_crop_dialog = false;
                true
            }
            Err(err) => {
                error!(error = %err, "error uploading image");
                self.notify(NotificationLevel::Error, UPLOAD_FAILED);
                false
            }
        }
    }

    pub async fn fetch_images(&mut self) {
        match self.api.list_images().await {
            Ok(images) => self.images = images,
            Err(err) => {
                error!(error = %err, "error fetching images");
                self.notify(NotificationLevel::Error, FETCH_FAILED);
            }
        }
    }

    fn notify(&mut self, level: NotificationLevel, message: &str) {
        self.notifications.push(Notification {
            level,
            message: message.to_string(),
        });
    }
}
