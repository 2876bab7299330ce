use anyhow::Result;
use serde_json::json;

use super::Config;
use super::Gemini;
use crate::configuration::ConfigKey;
use crate::domain::models::AspectRatio;
use crate::domain::models::Backend;
use crate::domain::models::GenerationError;
use crate::domain::models::GenerationRequest;
use crate::domain::models::ImageBlob;
use crate::domain::models::Mode;

impl Gemini {
    fn with_url(url: String) -> Gemini {
        return Gemini {
            url,
            token: "abc".to_string(),
            timeout: "200".to_string(),
        };
    }
}

fn set_models() {
    Config::set(ConfigKey::ImageModel, "gemini-2.5-flash-image");
    Config::set(ConfigKey::ImagenModel, "imagen-4.0-generate-001");
}

fn request(prompt: &str, mode: Mode, function: &str, images: Vec<ImageBlob>) -> GenerationRequest {
    let mut images = images.into_iter();
    return GenerationRequest {
        prompt: prompt.to_string(),
        mode,
        create_function: function.to_string(),
        edit_function: function.to_string(),
        image1: images.next(),
        image2: images.next(),
        aspect_ratio: AspectRatio::Square,
    };
}

fn png_blob() -> ImageBlob {
    return ImageBlob::new(vec![1, 2, 3], "image/png");
}

#[tokio::test]
async fn it_successfully_health_checks() {
    set_models();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/v1beta/models/gemini-2.5-flash-image?key=abc")
        .with_status(200)
        .create();

    let backend = Gemini::with_url(server.url());
    let res = backend.health_check().await;

    assert!(res.is_ok());
    mock.assert();
}

#[tokio::test]
async fn it_fails_health_checks() {
    set_models();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("GET", "/v1beta/models/gemini-2.5-flash-image?key=abc")
        .with_status(500)
        .create();

    let backend = Gemini::with_url(server.url());
    let res = backend.health_check().await;

    assert!(res.is_err());
    mock.assert();
}

#[tokio::test]
async fn it_generates_with_the_text_only_convention() -> Result<()> {
    set_models();
    let body = json!({
        "predictions": [{"bytesBase64Encoded": "AQID", "mimeType": "image/png"}]
    });

    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/v1beta/models/imagen-4.0-generate-001:predict?key=abc")
        .match_body(mockito::Matcher::Json(json!({
            "instances": [{"prompt": "sticker of a red fox, die-cut, vector style, white background"}],
            "parameters": {"sampleCount": 1, "aspectRatio": "1:1"}
        })))
        .with_status(200)
        .with_body(body.to_string())
        .create();

    let backend = Gemini::with_url(server.url());
    let res = backend
        .generate(&request("a red fox", Mode::Create, "sticker", vec![]))
        .await
        .unwrap();

    mock.assert();
    assert_eq!(res.blob.bytes, vec![1, 2, 3]);
    assert_eq!(res.blob.mime_type, "image/png");
    assert_eq!(res.url, "data:image/png;base64,AQID");
    return Ok(());
}

#[tokio::test]
async fn it_generates_with_the_image_conditioned_convention_for_edits() -> Result<()> {
    set_models();
    let body = json!({
        "candidates": [{
            "content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "AQID"}}]},
            "finishReason": "STOP"
        }]
    });

    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/v1beta/models/gemini-2.5-flash-image:generateContent?key=abc")
        .match_body(mockito::Matcher::Json(json!({
            "contents": [{
                "role": "user",
                "parts": [
                    {"inlineData": {"mimeType": "image/png", "data": "AQID"}},
                    {"inlineData": {"mimeType": "image/jpeg", "data": "BAUG"}},
                    {"text": "remove the hat"}
                ]
            }],
            "generationConfig": {"imageConfig": {"aspectRatio": "1:1"}}
        })))
        .with_status(200)
        .with_body(body.to_string())
        .create();

    let backend = Gemini::with_url(server.url());
    let res = backend
        .generate(&request(
            "remove the hat",
            Mode::Edit,
            "add-remove",
            vec![png_blob(), ImageBlob::new(vec![4, 5, 6], "image/jpeg")],
        ))
        .await
        .unwrap();

    mock.assert();
    assert_eq!(res.blob.bytes, vec![1, 2, 3]);
    return Ok(());
}

#[tokio::test]
async fn it_conditions_creations_on_an_attached_reference_image() {
    set_models();
    let body = json!({
        "candidates": [{
            "content": {"parts": [{"inlineData": {"mimeType": "image/png", "data": "AQID"}}]}
        }]
    });

    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/v1beta/models/gemini-2.5-flash-image:generateContent?key=abc")
        .with_status(200)
        .with_body(body.to_string())
        .create();

    let backend = Gemini::with_url(server.url());
    let res = backend
        .generate(&request(
            "a red fox",
            Mode::Create,
            "sticker",
            vec![png_blob()],
        ))
        .await;

    mock.assert();
    assert!(res.is_ok());
}

#[tokio::test]
async fn it_classifies_a_missing_token_without_dispatching() {
    set_models();
    let backend = Gemini {
        url: "http://localhost:1".to_string(),
        token: "".to_string(),
        timeout: "200".to_string(),
    };

    let res = backend
        .generate(&request("a red fox", Mode::Create, "free", vec![]))
        .await;

    assert_eq!(res.unwrap_err(), GenerationError::Auth);
}

#[tokio::test]
async fn it_classifies_rejected_credentials() {
    set_models();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/v1beta/models/imagen-4.0-generate-001:predict?key=abc")
        .with_status(403)
        .create();

    let backend = Gemini::with_url(server.url());
    let res = backend
        .generate(&request("a red fox", Mode::Create, "free", vec![]))
        .await;

    mock.assert();
    assert_eq!(res.unwrap_err(), GenerationError::Auth);
}

#[tokio::test]
async fn it_classifies_exceeded_quotas() {
    set_models();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/v1beta/models/imagen-4.0-generate-001:predict?key=abc")
        .with_status(429)
        .create();

    let backend = Gemini::with_url(server.url());
    let res = backend
        .generate(&request("a red fox", Mode::Create, "free", vec![]))
        .await;

    mock.assert();
    assert_eq!(res.unwrap_err(), GenerationError::Quota);
}

#[tokio::test]
async fn it_classifies_server_errors_as_network_failures() {
    set_models();
    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/v1beta/models/imagen-4.0-generate-001:predict?key=abc")
        .with_status(500)
        .create();

    let backend = Gemini::with_url(server.url());
    let res = backend
        .generate(&request("a red fox", Mode::Create, "free", vec![]))
        .await;

    mock.assert();
    assert_eq!(res.unwrap_err(), GenerationError::Network);
}

#[tokio::test]
async fn it_classifies_prompt_feedback_safety_blocks() {
    set_models();
    let body = json!({"promptFeedback": {"blockReason": "SAFETY"}});

    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/v1beta/models/gemini-2.5-flash-image:generateContent?key=abc")
        .with_status(200)
        .with_body(body.to_string())
        .create();

    let backend = Gemini::with_url(server.url());
    let res = backend
        .generate(&request("something", Mode::Edit, "retouch", vec![png_blob()]))
        .await;

    mock.assert();
    assert_eq!(res.unwrap_err(), GenerationError::SafetyBlocked);
}

#[tokio::test]
async fn it_classifies_safety_finish_reasons() {
    set_models();
    let body = json!({
        "candidates": [{"content": {"parts": []}, "finishReason": "IMAGE_SAFETY"}]
    });

    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/v1beta/models/gemini-2.5-flash-image:generateContent?key=abc")
        .with_status(200)
        .with_body(body.to_string())
        .create();

    let backend = Gemini::with_url(server.url());
    let res = backend
        .generate(&request("something", Mode::Edit, "retouch", vec![png_blob()]))
        .await;

    mock.assert();
    assert_eq!(res.unwrap_err(), GenerationError::SafetyBlocked);
}

#[tokio::test]
async fn it_surfaces_the_model_explanation_when_no_image_is_returned() {
    set_models();
    let body = json!({
        "candidates": [{
            "content": {"parts": [{"text": "I can only describe this scene."}]},
            "finishReason": "STOP"
        }]
    });

    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/v1beta/models/gemini-2.5-flash-image:generateContent?key=abc")
        .with_status(200)
        .with_body(body.to_string())
        .create();

    let backend = Gemini::with_url(server.url());
    let res = backend
        .generate(&request("something", Mode::Edit, "retouch", vec![png_blob()]))
        .await;

    mock.assert();
    assert_eq!(
        res.unwrap_err(),
        GenerationError::EmptyResponse("I can only describe this scene.".to_string())
    );
}

#[tokio::test]
async fn it_reports_a_generic_message_when_the_response_is_empty() {
    set_models();
    let body = json!({"candidates": [{"content": {"parts": []}, "finishReason": "STOP"}]});

    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/v1beta/models/gemini-2.5-flash-image:generateContent?key=abc")
        .with_status(200)
        .with_body(body.to_string())
        .create();

    let backend = Gemini::with_url(server.url());
    let res = backend
        .generate(&request("something", Mode::Edit, "retouch", vec![png_blob()]))
        .await;

    mock.assert();
    assert_eq!(
        res.unwrap_err(),
        GenerationError::empty_response(None)
    );
}

#[tokio::test]
async fn it_reports_a_generic_message_when_no_prediction_comes_back() {
    set_models();
    let body = json!({"predictions": []});

    let mut server = mockito::Server::new();
    let mock = server
        .mock("POST", "/v1beta/models/imagen-4.0-generate-001:predict?key=abc")
        .with_status(200)
        .with_body(body.to_string())
        .create();

    let backend = Gemini::with_url(server.url());
    let res = backend
        .generate(&request("a red fox", Mode::Create, "free", vec![]))
        .await;

    mock.assert();
    assert_eq!(res.unwrap_err(), GenerationError::empty_response(None));
}
