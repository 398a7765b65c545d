//! Converter trait

use async_trait::async_trait;

/// Turns one document or image into text
///
/// Implementations make exactly one attempt per call. Timeouts are applied by
/// the caller, so an implementation may take as long as the backend needs.
///
/// # Errors
///
/// Both conversion methods return an error if:
/// - The backend cannot be reached
/// - The backend answers with a non-success status
/// - The response cannot be interpreted
#[async_trait]
pub trait Converter: Send + Sync {
    /// Convert a single-page image into text
    ///
    /// # Arguments
    ///
    /// * `filename` - Original filename, forwarded to the backend
    /// * `bytes` - Image content
    /// * `prompt` - Instruction for the OCR model
    async fn convert_image(&self, filename: &str, bytes: Vec<u8>, prompt: &str)
    -> crate::Result<String>;

    /// Convert a multi-page document into one text entry per page, in page order
    async fn convert_document(
        &self,
        filename: &str,
        bytes: Vec<u8>,
        prompt: &str,
    ) -> crate::Result<Vec<String>>;

    /// Whether the backend is reachable and reports itself healthy
    async fn health(&self) -> crate::Result<bool>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
