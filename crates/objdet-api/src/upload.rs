//! Multipart form parsing for image uploads.

use axum::extract::Multipart;

use crate::error::ApiResult;

/// Form field carrying the image.
pub const IMAGE_FIELD: &str = "image";
/// Optional form field carrying the confidence threshold.
pub const CONFIDENCE_FIELD: &str = "confidence";

/// The `image` part of an upload.
#[derive(Debug, Clone)]
pub struct ImagePart {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Fields of a detect form. Unknown fields are skipped.
#[derive(Debug, Clone, Default)]
pub struct UploadForm {
    pub image: Option<ImagePart>,
    pub confidence: Option<String>,
}

impl UploadForm {
    /// Drain `multipart`. The first `image` part wins.
    pub async fn read(mut multipart: Multipart) -> ApiResult<Self> {
        let mut form = UploadForm::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().map(str::to_string);
            match name.as_deref() {
                Some(IMAGE_FIELD) if form.image.is_none() => {
                    let filename = field.file_name().map(str::to_string);
                    let content_type = field.content_type().map(str::to_string);
                    let bytes = field.bytes().await?.to_vec();
                    form.image = Some(ImagePart {
                        filename,
                        content_type,
                        bytes,
                    });
                }
                Some(CONFIDENCE_FIELD) => {
                    form.confidence = Some(field.text().await?);
                }
                _ => {}
            }
        }

        Ok(form)
    }
}
