#[cfg(test)]
#[path = "gemini_test.rs"]
mod tests;

use std::time::Duration;

use anyhow::bail;
use anyhow::Result;
use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::Backend;
use crate::domain::models::GeneratedPayload;
use crate::domain::models::GenerationError;
use crate::domain::models::GenerationRequest;
use crate::domain::services::codec;
use crate::domain::services::prompts;

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineBlob {
    mime_type: String,
    data: String,
}

/// One content part on the wire. The upstream discriminates parts purely by
/// which field is present, which maps onto an externally tagged union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
enum Part {
    Text(String),
    InlineData(InlineBlob),
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Content {
    role: String,
    parts: Vec<Part>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ImageConfig {
    aspect_ratio: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    image_config: ImageConfig,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct CandidateContent {
    parts: Option<Vec<Part>>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PredictInstance {
    prompt: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PredictParameters {
    sample_count: u32,
    aspect_ratio: String,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PredictRequest {
    instances: Vec<PredictInstance>,
    parameters: PredictParameters,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Prediction {
    bytes_base64_encoded: Option<String>,
    mime_type: Option<String>,
}

#[derive(Default, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PredictResponse {
    predictions: Option<Vec<Prediction>>,
}

fn convert_err(err: reqwest::Error) -> GenerationError {
    tracing::error!(error = ?err, "request to the image service failed");
    return GenerationError::Network;
}

fn classify_status(status: reqwest::StatusCode) -> Option<GenerationError> {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Some(GenerationError::Auth);
    }
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Some(GenerationError::Quota);
    }
    if !status.is_success() {
        tracing::error!(status = status.as_u16(), "image service returned an error");
        return Some(GenerationError::Network);
    }

    return None;
}

fn is_safety_finish(reason: &str) -> bool {
    return matches!(
        reason,
        "SAFETY" | "IMAGE_SAFETY" | "PROHIBITED_CONTENT" | "BLOCKLIST"
    );
}

pub struct Gemini {
    url: String,
    token: String,
    timeout: String,
}

impl Default for Gemini {
    fn default() -> Gemini {
        return Gemini {
            url: Config::get(ConfigKey::GeminiURL),
            token: Config::get(ConfigKey::GeminiToken),
            timeout: Config::get(ConfigKey::BackendHealthCheckTimeout),
        };
    }
}

impl Gemini {
    /// Image-conditioned convention: up to two inlined reference images,
    /// then the mandatory text part, in that order.
    async fn generate_with_images(
        &self,
        request: &GenerationRequest,
        full_prompt: &str,
    ) -> Result<GeneratedPayload, GenerationError> {
        let mut parts: Vec<Part> = vec![];
        for image in [&request.image1, &request.image2].into_iter().flatten() {
            parts.push(Part::InlineData(InlineBlob {
                mime_type: image.mime_type.clone(),
                data: codec::blob_to_base64(image),
            }));
        }
        parts.push(Part::Text(full_prompt.to_string()));

        let req = GenerateContentRequest {
            contents: vec![Content {
                role: "user".to_string(),
                parts,
            }],
            generation_config: GenerationConfig {
                image_config: ImageConfig {
                    aspect_ratio: request.aspect_ratio.to_string(),
                },
            },
        };

        let res = reqwest::Client::new()
            .post(format!(
                "{url}/v1beta/models/{model}:generateContent?key={key}",
                url = self.url,
                model = Config::get(ConfigKey::ImageModel),
                key = self.token,
            ))
            .json(&req)
            .send()
            .await
            .map_err(convert_err)?;

        if let Some(err) = classify_status(res.status()) {
            return Err(err);
        }

        let body: GenerateContentResponse = res.json().await.map_err(convert_err)?;

        if let Some(feedback) = &body.prompt_feedback {
            if feedback.block_reason.is_some() {
                return Err(GenerationError::SafetyBlocked);
            }
        }

        let Some(candidate) = body.candidates.unwrap_or_default().into_iter().next() else {
            return Err(GenerationError::empty_response(None));
        };

        if let Some(reason) = &candidate.finish_reason {
            if is_safety_finish(reason) {
                return Err(GenerationError::SafetyBlocked);
            }
        }

        let parts = candidate
            .content
            .and_then(|content| return content.parts)
            .unwrap_or_default();

        let inline = parts.iter().find_map(|part| {
            if let Part::InlineData(blob) = part {
                return Some(blob);
            }
            return None;
        });

        let Some(inline) = inline else {
            // No image came back; if the model explained itself in a text
            // part, surface that explanation.
            let text = parts.iter().find_map(|part| {
                if let Part::Text(text) = part {
                    return Some(text.clone());
                }
                return None;
            });
            return Err(GenerationError::empty_response(text));
        };

        return materialize(&inline.data, &inline.mime_type);
    }

    /// Text-only convention: exactly one image from the text-to-image
    /// endpoint.
    async fn generate_from_text(
        &self,
        request: &GenerationRequest,
        full_prompt: &str,
    ) -> Result<GeneratedPayload, GenerationError> {
        let req = PredictRequest {
            instances: vec![PredictInstance {
                prompt: full_prompt.to_string(),
            }],
            parameters: PredictParameters {
                sample_count: 1,
                aspect_ratio: request.aspect_ratio.to_string(),
            },
        };

        let res = reqwest::Client::new()
            .post(format!(
                "{url}/v1beta/models/{model}:predict?key={key}",
                url = self.url,
                model = Config::get(ConfigKey::ImagenModel),
                key = self.token,
            ))
            .json(&req)
            .send()
            .await
            .map_err(convert_err)?;

        if let Some(err) = classify_status(res.status()) {
            return Err(err);
        }

        let body: PredictResponse = res.json().await.map_err(convert_err)?;

        let Some(prediction) = body.predictions.unwrap_or_default().into_iter().next() else {
            return Err(GenerationError::empty_response(None));
        };

        let Some(data) = prediction.bytes_base64_encoded else {
            return Err(GenerationError::empty_response(None));
        };
        let mime_type = prediction
            .mime_type
            .unwrap_or_else(|| return "image/png".to_string());

        return materialize(&data, &mime_type);
    }
}

fn materialize(data: &str, mime_type: &str) -> Result<GeneratedPayload, GenerationError> {
    match codec::base64_to_blob(data, mime_type) {
        Ok(blob) => {
            return Ok(GeneratedPayload {
                url: codec::data_url(&blob),
                blob,
            });
        }
        Err(err) => {
            tracing::error!(error = ?err, "image service returned undecodable image data");
            return Err(GenerationError::empty_response(None));
        }
    }
}

#[async_trait]
impl Backend for Gemini {
    #[allow(clippy::implicit_return)]
    async fn health_check(&self) -> Result<()> {
        if self.url.is_empty() {
            bail!("Gemini URL is not defined");
        }
        if self.token.is_empty() {
            bail!("Gemini token is not defined");
        }

        let url = format!(
            "{url}/v1beta/models/{model}?key={key}",
            url = self.url,
            model = Config::get(ConfigKey::ImageModel),
            key = self.token
        );

        let res = reqwest::Client::new()
            .get(&url)
            .timeout(Duration::from_millis(self.timeout.parse::<u64>()?))
            .send()
            .await;

        if res.is_err() {
            tracing::error!(error = ?res.unwrap_err(), "Gemini is not reachable");
            bail!("Gemini is not reachable");
        }

        let status = res.unwrap().status().as_u16();
        if status >= 400 {
            tracing::error!(status = status, "Gemini health check failed");
            bail!("Gemini health check failed");
        }

        return Ok(());
    }

    #[allow(clippy::implicit_return)]
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GeneratedPayload, GenerationError> {
        if self.token.is_empty() {
            return Err(GenerationError::Auth);
        }

        let full_prompt = prompts::compose(&request.prompt, request.active_function(), request.mode);

        if request.is_image_conditioned() {
            return self.generate_with_images(request, &full_prompt).await;
        }

        return self.generate_from_text(request, &full_prompt).await;
    }
}
