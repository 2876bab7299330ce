#[cfg(test)]
#[path = "exports_test.rs"]
mod tests;

use std::path;

use anyhow::Result;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::configuration::Config;
use crate::configuration::ConfigKey;
use crate::domain::models::GeneratedImage;

/// Writes results to disk as downloadable artifacts. File names are
/// deterministic: the image id is its generation timestamp.
pub struct Exports {
    pub export_dir: path::PathBuf,
    prefix: String,
}

impl Default for Exports {
    fn default() -> Exports {
        return Exports::new(
            path::PathBuf::from(Config::get(ConfigKey::ExportDir)),
            Config::get(ConfigKey::ExportPrefix),
        );
    }
}

impl Exports {
    pub fn new(export_dir: path::PathBuf, prefix: String) -> Exports {
        return Exports { export_dir, prefix };
    }

    pub fn file_name(&self, image: &GeneratedImage) -> String {
        return format!(
            "{prefix}-{id}.{ext}",
            prefix = self.prefix,
            id = image.id,
            ext = extension(&image.blob.mime_type)
        );
    }

    pub async fn write(&self, image: &GeneratedImage) -> Result<path::PathBuf> {
        if !self.export_dir.exists() {
            fs::create_dir_all(&self.export_dir).await?;
        }

        let target = self.export_dir.join(self.file_name(image));
        let mut file = fs::File::create(&target).await?;
        file.write_all(&image.blob.bytes).await?;

        return Ok(target);
    }
}

fn extension(mime_type: &str) -> &'static str {
    match mime_type {
        "image/jpeg" => return "jpg",
        "image/webp" => return "webp",
        "image/gif" => return "gif",
        _ => return "png",
    }
}
