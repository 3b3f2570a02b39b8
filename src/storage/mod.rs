pub mod metadata;
pub mod uploads;

pub use metadata::{ImageRecord, JsonFileStore, MetadataStore, StoreError};
pub use uploads::{PUBLIC_MOUNT, StoredUpload, UploadStorage, extension_of, public_path};
