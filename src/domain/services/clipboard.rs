use anyhow::Result;

/// Host-platform share surface. Headless environments have no clipboard, so
/// every operation here is feature-detected and best-effort: sharing must
/// never turn a successful generation into an error.
pub struct ClipboardService {}

impl ClipboardService {
    pub fn healthcheck() -> Result<()> {
        arboard::Clipboard::new()?;
        return Ok(());
    }

    /// Copies the text to the clipboard when one is available. Unsupported
    /// platforms and abandoned shares are a silent no-op.
    pub fn share(text: &str) {
        let mut clipboard = match arboard::Clipboard::new() {
            Ok(clipboard) => clipboard,
            Err(err) => {
                tracing::debug!(error = ?err, "clipboard unavailable, skipping share");
                return;
            }
        };

        if let Err(err) = clipboard.set_text(text.to_string()) {
            tracing::debug!(error = ?err, "share was not completed");
        }
    }
}
