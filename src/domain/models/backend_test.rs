use super::AspectRatio;
use super::GenerationRequest;
use super::ImageBlob;
use super::Mode;

fn request(mode: Mode, image1: Option<ImageBlob>) -> GenerationRequest {
    return GenerationRequest {
        prompt: "a red fox".to_string(),
        mode,
        create_function: "sticker".to_string(),
        edit_function: "retouch".to_string(),
        image1,
        image2: None,
        aspect_ratio: AspectRatio::Square,
    };
}

#[test]
fn it_resolves_the_active_function_per_mode() {
    assert_eq!(request(Mode::Create, None).active_function(), "sticker");
    assert_eq!(request(Mode::Edit, None).active_function(), "retouch");
}

#[test]
fn it_selects_the_calling_convention() {
    let blob = ImageBlob::new(vec![1, 2, 3], "image/png");

    assert!(!request(Mode::Create, None).is_image_conditioned());
    assert!(request(Mode::Create, Some(blob.clone())).is_image_conditioned());
    assert!(request(Mode::Edit, None).is_image_conditioned());
    assert!(request(Mode::Edit, Some(blob)).is_image_conditioned());
}
