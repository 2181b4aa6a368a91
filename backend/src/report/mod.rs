pub mod gemini;
pub mod prompt;

use async_trait::async_trait;

pub const REPORT_ERROR_PREFIX: &str = "Error generating AI analysis: ";

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("GOOGLE_API_KEY environment variable is not set")]
    NotConfigured,
    /// Built through `From`, which strips the request URL.
    #[error("{0}")]
    Network(reqwest::Error),
    #[error("Gemini API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Failed to parse response: {0}")]
    Malformed(String),
    #[error("Response contained no text")]
    EmptyResponse,
}

impl From<reqwest::Error> for ReportError {
    fn from(err: reqwest::Error) -> Self {
        ReportError::Network(err.without_url())
    }
}

/// Image attached to a generation request.
#[derive(Debug, Clone)]
pub struct InlineImage {
    pub mime_type: String,
    /// Base64 payload.
    pub data: String,
}

impl InlineImage {
    pub fn jpeg(data: String) -> Self {
        Self {
            mime_type: "image/jpeg".to_string(),
            data,
        }
    }
}

#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    async fn generate(&self, prompt: &str, image: Option<&InlineImage>) -> Result<String, ReportError>;
}

/// Run the generator and fold a failure into the narrative text. Report
/// failures never fail the request.
pub async fn narrate(
    generator: &dyn NarrativeGenerator,
    prompt: &str,
    image: Option<&InlineImage>,
) -> String {
    match generator.generate(prompt, image).await {
        Ok(text) => text,
        Err(e) => {
            log::warn!("AI analysis degraded: {}", e);
            format!("{}{}", REPORT_ERROR_PREFIX, e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(Result<&'static str, fn() -> ReportError>);

    #[async_trait]
    impl NarrativeGenerator for Fixed {
        async fn generate(&self, _prompt: &str, _image: Option<&InlineImage>) -> Result<String, ReportError> {
            match &self.0 {
                Ok(text) => Ok(text.to_string()),
                Err(make) => Err(make()),
            }
        }
    }

    #[actix_web::test]
    async fn narrate_passes_text_through() {
        let text = narrate(&Fixed(Ok("# Summary")), "prompt", None).await;
        assert_eq!(text, "# Summary");
    }

    #[actix_web::test]
    async fn narrate_degrades_on_error() {
        let text = narrate(&Fixed(Err(|| ReportError::NotConfigured)), "prompt", None).await;
        assert_eq!(
            text,
            "Error generating AI analysis: GOOGLE_API_KEY environment variable is not set"
        );

        let text = narrate(
            &Fixed(Err(|| ReportError::Api { status: 429, body: "quota".into() })),
            "prompt",
            None,
        )
        .await;
        assert_eq!(text, "Error generating AI analysis: Gemini API error 429: quota");
    }
}
