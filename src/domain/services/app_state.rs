#[cfg(test)]
#[path = "app_state_test.rs"]
mod tests;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::AspectRatio;
use crate::domain::models::Backend;
use crate::domain::models::GeneratedImage;
use crate::domain::models::GenerationError;
use crate::domain::models::GenerationRequest;
use crate::domain::models::ImageFile;
use crate::domain::models::Mode;
use crate::domain::services::prompts;
use crate::domain::services::History;

/// Single source of truth for the studio. Mutated only through the methods
/// below, in program order; consumers re-read after every operation.
pub struct AppState {
    pub prompt: String,
    pub mode: Mode,
    pub active_create_fn: String,
    pub active_edit_fn: String,
    pub image1: Option<ImageFile>,
    pub image2: Option<ImageFile>,
    pub generated_image: Option<GeneratedImage>,
    pub is_loading: bool,
    pub error: Option<String>,
    pub aspect_ratio: AspectRatio,
    pub history: Vec<GeneratedImage>,
    history_limit: usize,
}

impl Default for AppState {
    fn default() -> AppState {
        return AppState {
            prompt: "".to_string(),
            mode: Mode::Create,
            active_create_fn: "free".to_string(),
            active_edit_fn: "add-remove".to_string(),
            image1: None,
            image2: None,
            generated_image: None,
            is_loading: false,
            error: None,
            aspect_ratio: AspectRatio::Square,
            history: vec![],
            history_limit: Config::get(ConfigKey::HistoryLimit).parse().unwrap_or(8),
        };
    }
}

impl AppState {
    pub async fn load_history(&mut self, store: &History) {
        self.history = store.load().await;
    }

    /// Switching modes resets the working set: pending images, the current
    /// result and the prompt belong to the mode they were entered in.
    pub fn set_mode(&mut self, mode: Mode) {
        self.mode = mode;
        self.image1 = None;
        self.image2 = None;
        self.generated_image = None;
        self.prompt = "".to_string();
    }

    pub fn set_prompt(&mut self, prompt: &str) {
        self.prompt = prompt.to_string();
    }

    pub fn set_active_create_fn(&mut self, function: &str) {
        self.active_create_fn = function.to_string();
    }

    pub fn set_active_edit_fn(&mut self, function: &str) {
        self.active_edit_fn = function.to_string();
    }

    pub fn set_image1(&mut self, image: Option<ImageFile>) {
        self.image1 = image;
    }

    pub fn set_image2(&mut self, image: Option<ImageFile>) {
        self.image2 = image;
    }

    pub fn set_aspect_ratio(&mut self, aspect_ratio: AspectRatio) {
        self.aspect_ratio = aspect_ratio;
    }

    /// Runs one full submission: synchronous validation, one backend call,
    /// result or classified error merged back into state. The loading flag
    /// is true only strictly between dispatch and settlement, and is
    /// cleared on every settled path.
    pub async fn submit(&mut self, backend: &dyn Backend, store: &History) {
        // A second submission while one is in flight would race the result
        // slot; refuse it here rather than relying on the surface to
        // disable its submit affordance.
        if self.is_loading {
            return;
        }

        if let Err(err) = self.validate() {
            self.error = Some(err.to_string());
            return;
        }

        self.is_loading = true;
        self.error = None;
        self.generated_image = None;

        let request = GenerationRequest {
            prompt: self.prompt.clone(),
            mode: self.mode,
            create_function: self.active_create_fn.clone(),
            edit_function: self.active_edit_fn.clone(),
            image1: self.image1.as_ref().map(|file| return file.blob.clone()),
            image2: self.image2.as_ref().map(|file| return file.blob.clone()),
            aspect_ratio: self.aspect_ratio,
        };

        match backend.generate(&request).await {
            Ok(payload) => {
                let mut title = self.prompt.trim().to_string();
                if title.is_empty() {
                    title = "Untitled creation".to_string();
                }

                let image = GeneratedImage {
                    id: GeneratedImage::create_id(),
                    url: payload.url,
                    blob: payload.blob,
                    prompt: title,
                };

                self.history.insert(0, image.clone());
                self.history.truncate(self.history_limit);
                store.save(&self.history).await;

                self.generated_image = Some(image);
            }
            Err(err) => {
                tracing::error!(error = %err, "generation failed");
                self.error = Some(err.to_string());
            }
        }

        self.is_loading = false;
    }

    fn validate(&self) -> Result<(), GenerationError> {
        if self.mode == Mode::Create && self.image1.is_none() && self.prompt.trim().is_empty() {
            return Err(GenerationError::Validation(
                "Describe your idea or attach a reference image to get started.".to_string(),
            ));
        }

        if self.mode == Mode::Edit && self.image1.is_none() {
            return Err(GenerationError::Validation(
                "Select an image to edit first.".to_string(),
            ));
        }

        return Ok(());
    }

    /// One-tap restyle: resubmits the current result through the edit path
    /// with a fixed instructional prompt in place of the user's free text.
    pub async fn apply_style(&mut self, backend: &dyn Backend, store: &History, style: &str) {
        let Some(current) = self.generated_image.clone() else {
            return;
        };
        let Some(instruction) = prompts::style_instruction(style) else {
            return;
        };

        self.mode = Mode::Edit;
        self.active_edit_fn = "style".to_string();
        self.image1 = Some(ImageFile {
            preview_url: current.url.clone(),
            blob: current.blob,
        });
        self.image2 = None;
        self.prompt = instruction.to_string();

        self.submit(backend, store).await;
    }

    /// Continue working on the current result: it becomes the first
    /// reference image of a fresh edit.
    pub fn edit_current(&mut self) {
        if let Some(image) = self.generated_image.clone() {
            self.mode = Mode::Edit;
            self.image1 = Some(ImageFile {
                preview_url: image.url.clone(),
                blob: image.blob,
            });
            self.image2 = None;
        }
    }

    /// Re-opens a past result for editing, restoring its prompt.
    pub fn select_history_item(&mut self, id: &str) -> bool {
        let Some(image) = self.history.iter().find(|image| return image.id == id) else {
            return false;
        };
        let image = image.clone();

        self.prompt = image.prompt.clone();
        self.generated_image = Some(image);
        self.error = None;
        self.edit_current();

        return true;
    }

    pub async fn delete_history_item(&mut self, store: &History, id: &str) {
        self.history.retain(|image| return image.id != id);
        store.save(&self.history).await;
    }
}
