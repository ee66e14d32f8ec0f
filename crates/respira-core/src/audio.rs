//! Audio sample input and submission validation.
//!
//! Validation happens before any network call: only `.wav`/`.mp3` samples
//! up to 10 MiB are accepted, matching what the analysis service supports.

use crate::errors::{WorkflowError, WorkflowResult};

/// Maximum accepted sample size (10 MiB).
pub const MAX_SAMPLE_BYTES: usize = 10 * 1024 * 1024;

/// MIME types accepted in addition to the extension check.
const ACCEPTED_MIME_TYPES: &[&str] = &["audio/wav", "audio/mpeg", "audio/mp3", "audio/x-wav"];

/// An audio sample queued for analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSample {
    file_name: String,
    mime_type: Option<String>,
    bytes: Vec<u8>,
}

impl AudioSample {
    /// Create a sample from a file name and its contents.
    #[must_use]
    pub fn new(file_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: None,
            bytes,
        }
    }

    /// Attach the declared MIME type, when the caller knows it.
    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        self.mime_type = Some(mime_type.into());
        self
    }

    /// File name as submitted.
    #[must_use]
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    /// Declared MIME type, if any.
    #[must_use]
    pub fn mime_type(&self) -> Option<&str> {
        self.mime_type.as_deref()
    }

    /// MIME type used for the upload: the declared type, or one inferred
    /// from the extension.
    #[must_use]
    pub fn effective_mime_type(&self) -> &str {
        if let Some(ref mime) = self.mime_type {
            return mime;
        }
        if self.file_name.to_ascii_lowercase().ends_with(".mp3") {
            "audio/mpeg"
        } else {
            "audio/wav"
        }
    }

    /// Sample contents.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consume the sample, yielding its contents.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Sample size in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Whether the sample is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Check the sample against the submission constraints.
    ///
    /// Format is checked before size, and both failures carry the
    /// user-facing message directly.
    pub fn validate(&self) -> WorkflowResult<()> {
        if !self.has_accepted_format() {
            return Err(WorkflowError::validation(
                "Please upload a valid .wav or .mp3 audio file.",
            ));
        }
        if self.bytes.len() > MAX_SAMPLE_BYTES {
            return Err(WorkflowError::validation(
                "File size too large. Please upload a file smaller than 10MB.",
            ));
        }
        Ok(())
    }

    fn has_accepted_format(&self) -> bool {
        if let Some(ref mime) = self.mime_type {
            if ACCEPTED_MIME_TYPES.contains(&mime.as_str()) {
                return true;
            }
        }
        let lowered = self.file_name.to_ascii_lowercase();
        lowered.ends_with(".wav") || lowered.ends_with(".mp3")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
