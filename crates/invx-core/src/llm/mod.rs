//! Model-based extraction.
//!
//! The network client is a collaborator behind [`ModelClient`]; this module
//! owns the prompts, the answer decoding and the normalization into an
//! [`Invoice`].

pub mod normalize;
pub mod prompts;
pub mod response;

use std::sync::Arc;

use tracing::debug;

use crate::context::CallContext;
use crate::error::{ExtractError, Result};
use crate::models::config::{ExtractionConfig, LlmConfig, VisionPrompt};
use crate::models::invoice::Invoice;

pub use normalize::{parse_date, parse_decimal};
pub use response::extract_json;

/// Error returned by a model client.
pub type ModelError = Box<dyn std::error::Error + Send + Sync>;

/// A chat-completion style model service.
///
/// Implementations may block; they receive the caller's [`CallContext`] and
/// are expected to honour its deadline and cancellation.
pub trait ModelClient: Send + Sync {
    /// Send a system and user prompt, return the raw answer text.
    fn chat_text(
        &self,
        ctx: &CallContext,
        model: &str,
        system: &str,
        user: &str,
    ) -> std::result::Result<String, ModelError>;

    /// Same as [`ModelClient::chat_text`] with one image attached.
    fn chat_with_image(
        &self,
        ctx: &CallContext,
        model: &str,
        system: &str,
        user: &str,
        image: &[u8],
        mime: &str,
    ) -> std::result::Result<String, ModelError>;
}

/// Extracts invoices from text or images through a [`ModelClient`].
#[derive(Clone)]
pub struct LlmExtractor {
    client: Arc<dyn ModelClient>,
    text_model: String,
    vision_model: String,
    extraction: ExtractionConfig,
}

impl LlmExtractor {
    pub fn new(client: Arc<dyn ModelClient>, llm: &LlmConfig, extraction: &ExtractionConfig) -> Self {
        Self {
            client,
            text_model: llm.text_model.clone(),
            vision_model: llm.vision_model.clone(),
            extraction: extraction.clone(),
        }
    }

    /// Extract from clean text.
    pub fn extract_from_text(&self, ctx: &CallContext, text: &str) -> Result<Invoice> {
        let answer = self
            .client
            .chat_text(ctx, &self.text_model, prompts::INVOICE_SYSTEM_PROMPT, &prompts::text_extraction(text))
            .map_err(|e| ExtractError::ModelCall(e.to_string()))?;
        self.parse_response(&answer)
    }

    /// Extract from text that may carry recognition errors.
    pub fn extract_from_ocr_text(&self, ctx: &CallContext, text: &str) -> Result<Invoice> {
        let answer = self
            .client
            .chat_text(ctx, &self.text_model, prompts::INVOICE_SYSTEM_PROMPT, &prompts::ocr_correction(text))
            .map_err(|e| ExtractError::ModelCall(e.to_string()))?;
        self.parse_response(&answer)
    }

    /// Extract from an encoded page image.
    pub fn extract_from_image(
        &self,
        ctx: &CallContext,
        image: &[u8],
        mime: &str,
        prompt: VisionPrompt,
    ) -> Result<Invoice> {
        let (system, user) = match prompt {
            VisionPrompt::Invoice => (prompts::INVOICE_SYSTEM_PROMPT, prompts::invoice_image()),
            VisionPrompt::Receipt => (prompts::RECEIPT_SYSTEM_PROMPT, prompts::receipt_image()),
            VisionPrompt::AutoDetect => (prompts::INVOICE_SYSTEM_PROMPT, prompts::auto_detect_image()),
        };

        debug!("Sending {} byte {} image to {}", image.len(), mime, self.vision_model);
        let answer = self
            .client
            .chat_with_image(ctx, &self.vision_model, system, &user, image, mime)
            .map_err(|e| ExtractError::ModelCall(e.to_string()))?;
        self.parse_response(&answer)
    }

    /// Decode and normalize a raw model answer.
    pub fn parse_response(&self, answer: &str) -> Result<Invoice> {
        let wire = response::decode(answer).map_err(|e| ExtractError::ResponseDecode(e.to_string()))?;
        let invoice = normalize::to_invoice(&wire, &self.extraction)?;
        debug!(
            "Normalized model answer: {} items, total {}",
            invoice.items.len(),
            invoice.summary.total
        );
        Ok(invoice)
    }
}

impl std::fmt::Debug for LlmExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmExtractor")
            .field("text_model", &self.text_model)
            .field("vision_model", &self.vision_model)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records every call and answers with a fixed string.
    struct Scripted {
        answer: std::result::Result<String, String>,
        calls: Mutex<Vec<(String, String, Option<String>)>>,
    }

    impl Scripted {
        fn new(answer: std::result::Result<&str, &str>) -> Arc<Self> {
            Arc::new(Self {
                answer: answer.map(str::to_string).map_err(str::to_string),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn reply(&self) -> std::result::Result<String, ModelError> {
            self.answer.clone().map_err(ModelError::from)
        }
    }

    impl ModelClient for Scripted {
        fn chat_text(&self, _ctx: &CallContext, model: &str, system: &str, _user: &str) -> std::result::Result<String, ModelError> {
            self.calls.lock().unwrap().push((model.to_string(), system.to_string(), None));
            self.reply()
        }

        fn chat_with_image(
            &self,
            _ctx: &CallContext,
            model: &str,
            system: &str,
            _user: &str,
            _image: &[u8],
            mime: &str,
        ) -> std::result::Result<String, ModelError> {
            self.calls
                .lock()
                .unwrap()
                .push((model.to_string(), system.to_string(), Some(mime.to_string())));
            self.reply()
        }
    }

    fn extractor(client: Arc<Scripted>) -> LlmExtractor {
        let llm = LlmConfig {
            text_model: "text-model".to_string(),
            vision_model: "vision-model".to_string(),
            ..LlmConfig::default()
        };
        LlmExtractor::new(client, &llm, &ExtractionConfig::default())
    }

    #[test]
    fn test_text_extraction_uses_text_model() {
        let client = Scripted::new(Ok(r#"{"invoice_number": "0000001"}"#));
        let invoice = extractor(client.clone())
            .extract_from_text(&CallContext::background(), "Số: 0000001")
            .unwrap();

        assert_eq!(invoice.header.number, "0000001");
        let calls = client.calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, "text-model");
        assert_eq!(calls[0].2, None);
    }

    #[test]
    fn test_receipt_prompt_uses_receipt_system_prompt() {
        let client = Scripted::new(Ok(r#"{"document_type": "receipt"}"#));
        extractor(client.clone())
            .extract_from_image(&CallContext::background(), b"\xFF\xD8\xFF", "image/jpeg", VisionPrompt::Receipt)
            .unwrap();

        let calls = client.calls.lock().unwrap();
        assert_eq!(calls[0].0, "vision-model");
        assert_eq!(calls[0].1, prompts::RECEIPT_SYSTEM_PROMPT);
        assert_eq!(calls[0].2.as_deref(), Some("image/jpeg"));
    }

    #[test]
    fn test_client_failure_is_model_call_error() {
        let client = Scripted::new(Err("connection refused"));
        let err = extractor(client)
            .extract_from_ocr_text(&CallContext::background(), "text")
            .unwrap_err();
        assert!(matches!(err, ExtractError::ModelCall(ref msg) if msg == "connection refused"));
    }

    #[test]
    fn test_prose_answer_is_decode_error() {
        let client = Scripted::new(Ok("Sorry, I cannot read this document."));
        let err = extractor(client)
            .extract_from_text(&CallContext::background(), "text")
            .unwrap_err();
        assert_eq!(err.kind(), "response_decode_failure");
    }
}
