//! Request types.

/// An image to forward to the detection service.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub bytes: Vec<u8>,
    pub filename: String,
    pub content_type: String,
    /// Raw `confidence` form value, passed through unvalidated
    pub confidence: Option<String>,
}

impl ImageUpload {
    pub fn new(bytes: Vec<u8>, filename: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            bytes,
            filename: filename.into(),
            content_type: content_type.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: Option<String>) -> Self {
        self.confidence = confidence;
        self
    }
}
