//! Gemini `generateContent` client used to write the narrative report.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{InlineImage, NarrativeGenerator, ReportError};
use crate::config::GeminiConfig;

const API_KEY_HEADER: &str = "x-goog-api-key";

pub struct GeminiReporter {
    config: GeminiConfig,
    client: Client,
}

impl GeminiReporter {
    pub fn new(config: GeminiConfig) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self {
            config,
            client: builder.build()?,
        })
    }

    fn api_url(&self) -> String {
        format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl NarrativeGenerator for GeminiReporter {
    async fn generate(&self, prompt: &str, image: Option<&InlineImage>) -> Result<String, ReportError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(ReportError::NotConfigured)?;

        let request = build_request(prompt, image);
        log::debug!(
            "Sending request to Gemini model {} (prompt {} bytes, image: {})",
            self.config.model,
            prompt.len(),
            image.is_some()
        );

        let response = self
            .client
            .post(self.api_url())
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ReportError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let parsed: GenerateContentResponse =
            serde_json::from_str(&body).map_err(|e| ReportError::Malformed(e.to_string()))?;
        extract_text(parsed)
    }
}

fn build_request(prompt: &str, image: Option<&InlineImage>) -> GenerateContentRequest {
    let mut parts = vec![Part::Text {
        text: prompt.to_string(),
    }];
    if let Some(image) = image {
        parts.push(Part::InlineData {
            inline_data: InlineData {
                mime_type: image.mime_type.clone(),
                data: image.data.clone(),
            },
        });
    }
    GenerateContentRequest {
        contents: vec![Content {
            role: Some("user".to_string()),
            parts,
        }],
    }
}

fn extract_text(response: GenerateContentResponse) -> Result<String, ReportError> {
    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| match part {
                    Part::Text { text } => Some(text),
                    Part::InlineData { .. } => None,
                })
                .collect()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(ReportError::EmptyResponse);
    }
    Ok(text)
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    InlineData {
        #[serde(alias = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{REPORT_ERROR_PREFIX, narrate};
    use serde_json::json;

    #[test]
    fn request_carries_prompt_then_image() {
        let image = InlineImage::jpeg("aGVsbG8=".into());
        let body = serde_json::to_value(build_request("describe", Some(&image))).unwrap();
        assert_eq!(
            body,
            json!({
                "contents": [{
                    "role": "user",
                    "parts": [
                        {"text": "describe"},
                        {"inline_data": {"mimeType": "image/jpeg", "data": "aGVsbG8="}}
                    ]
                }]
            })
        );

        let text_only = serde_json::to_value(build_request("describe", None)).unwrap();
        assert_eq!(text_only["contents"][0]["parts"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn text_parts_of_first_candidate_are_joined() {
        let response: GenerateContentResponse = serde_json::from_value(json!({
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "# Summary\n"}, {"text": "Clear lungs."}]}},
                {"content": {"parts": [{"text": "ignored"}]}}
            ]
        }))
        .unwrap();
        assert_eq!(extract_text(response).unwrap(), "# Summary\nClear lungs.");
    }

    #[test]
    fn missing_candidates_is_an_error() {
        let response: GenerateContentResponse =
            serde_json::from_value(json!({"promptFeedback": {"blockReason": "SAFETY"}})).unwrap();
        assert!(matches!(extract_text(response), Err(ReportError::EmptyResponse)));
    }

    #[actix_web::test]
    async fn transport_errors_never_expose_the_api_key() {
        let reporter = GeminiReporter::new(GeminiConfig {
            api_key: Some("SENTINEL-KEY-0451".into()),
            model: "gemini-1.5-pro".into(),
            base_url: "http://127.0.0.1:9".into(),
            timeout: Some(std::time::Duration::from_secs(5)),
        })
        .unwrap();
        assert!(!reporter.api_url().contains("SENTINEL-KEY-0451"));

        let text = narrate(&reporter, "prompt", None).await;
        assert!(text.starts_with(REPORT_ERROR_PREFIX), "{}", text);
        assert!(!text.contains("SENTINEL-KEY-0451"), "{}", text);
    }

    #[actix_web::test]
    async fn missing_api_key_fails_before_any_request() {
        let reporter = GeminiReporter::new(GeminiConfig {
            api_key: None,
            model: "gemini-1.5-pro".into(),
            base_url: "http://127.0.0.1:9".into(),
            timeout: None,
        })
        .unwrap();
        let err = reporter.generate("prompt", None).await.unwrap_err();
        assert_eq!(err.to_string(), "GOOGLE_API_KEY environment variable is not set");
    }
}
