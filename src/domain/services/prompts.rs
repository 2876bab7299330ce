#[cfg(test)]
#[path = "prompts_test.rs"]
mod tests;

use crate::domain::models::Mode;

/// Maps the user's free text, the selected function, and the mode to the
/// final instruction string sent upstream. Pure and total: unknown function
/// identifiers fall back to the generic branch instead of failing.
pub fn compose(prompt: &str, function: &str, mode: Mode) -> String {
    let clean_prompt = prompt.trim();

    if clean_prompt.is_empty() {
        return default_prompt(function, mode).to_string();
    }

    match function {
        "sticker" => {
            return format!("sticker of {clean_prompt}, die-cut, vector style, white background")
        }
        "text" => {
            return format!("minimalist logo of {clean_prompt}, white background, high resolution")
        }
        "comic" => return format!("{clean_prompt}, comic book style illustration, vibrant"),
        "3d-mascot" => return format!("{clean_prompt}, 3D mascot, modern render, white background"),
        "thumbnail" => {
            return format!("YouTube thumbnail about {clean_prompt}, dynamic composition, vibrant")
        }
        "compose" => return format!("Combine these images: {clean_prompt}"),
        _ => return clean_prompt.to_string(),
    }
}

/// Fixed fallback descriptions used when the prompt field is left empty.
fn default_prompt(function: &str, mode: Mode) -> &'static str {
    if mode == Mode::Create {
        match function {
            "sticker" => return "a high quality sticker, die-cut, white background, masterpiece",
            "text" => return "a minimalist vector logo design, professional, white background",
            "comic" => return "professional comic book art, vibrant colors, detailed",
            "3d-mascot" => {
                return "cute 3D character mascot, Pixar style, high quality render, white background"
            }
            "thumbnail" => {
                return "eye-catching YouTube thumbnail background, high contrast, cinematic"
            }
            _ => return "professional digital art, high resolution, cinematic lighting",
        }
    }

    match function {
        "retouch" => return "Retouch and enhance this image, improve lighting and details",
        "style" => return "Apply a modern artistic style to this image",
        "add-remove" => return "Modify the details of this image realistically",
        "compose" => return "Merge these two images together artistically",
        _ => return "Enhance this image",
    }
}

/// Fixed instructional prompts behind the one-tap restyle actions. Unknown
/// styles return None so callers can ignore them.
pub fn style_instruction(style: &str) -> Option<&'static str> {
    match style {
        "perfection" => return Some("Improve details and sharpness for a hyper-realistic finish"),
        "advertising" => {
            return Some("Enhance this image for a professional advertisement, vibrant colors")
        }
        "cinema" => return Some("Give this image a cinematic look with dramatic lighting"),
        _ => return None,
    }
}
