//! Inline images in record content.
//!
//! Cash-position reports, financial reports and charts all store rich
//! content the same way: plain text with `[IMG:<id>]` placeholders next to
//! a list of image assets. [`DocumentAssembler`] is the one place that
//! opens such a record for editing and turns the edited document back into
//! something storable, uploading new images on the way.

pub mod documents;
pub mod error;
pub mod types;
pub mod uploads;

pub use documents::DocumentAssembler;
pub use error::{SaveError, UploadFailure};
pub use types::{PendingUpload, RawRecord, SaveOutcome, SavePolicy, StoredRecord, UploadedFile};
pub use uploads::{sniff_content_type, ImageUploader, UploadRequest};
