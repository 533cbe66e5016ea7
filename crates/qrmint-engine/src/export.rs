//! File-save and clipboard capabilities used by the export actions.

use crate::error::ExportError;
use arboard::{Clipboard, ImageData};
use std::borrow::Cow;
use std::path::{Path, PathBuf};
use tracing::debug;

/// MIME type of the export artifact.
pub const PNG_MIME: &str = "image/png";

/// Platform-level "save this file" action.
pub trait FileSaver {
    /// Save `bytes` under `filename`, returning where they landed.
    fn save(&self, bytes: &[u8], filename: &str) -> Result<PathBuf, ExportError>;
}

/// Saves into a fixed directory, creating it if needed.
#[derive(Debug, Clone)]
pub struct DirectorySaver {
    dir: PathBuf,
}

impl DirectorySaver {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl FileSaver for DirectorySaver {
    fn save(&self, bytes: &[u8], filename: &str) -> Result<PathBuf, ExportError> {
        // Only the final component of the suggestion is honored.
        let Some(name) = Path::new(filename).file_name() else {
            return Err(ExportError::Save {
                path: self.dir.join(filename),
                source: std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    "filename has no final component",
                ),
            });
        };
        let path = self.dir.join(name);

        let save_err = |source| ExportError::Save {
            path: path.clone(),
            source,
        };
        std::fs::create_dir_all(&self.dir).map_err(save_err)?;
        std::fs::write(&path, bytes).map_err(save_err)?;

        debug!(path = %path.display(), bytes = bytes.len(), "Saved export");
        Ok(path)
    }
}

/// System clipboard accepting image payloads.
pub trait ClipboardSink {
    /// Place encoded image `bytes` of type `mime` on the clipboard.
    fn write_image(&mut self, bytes: &[u8], mime: &str) -> Result<(), ExportError>;
}

/// OS clipboard via `arboard`.
///
/// The connection is opened per write; headless sessions without a display
/// server report [`ExportError::ClipboardUnsupported`].
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl SystemClipboard {
    pub fn new() -> Self {
        Self
    }
}

impl ClipboardSink for SystemClipboard {
    fn write_image(&mut self, bytes: &[u8], mime: &str) -> Result<(), ExportError> {
        if mime != PNG_MIME {
            return Err(ExportError::ClipboardUnsupported(format!(
                "{mime} is not supported"
            )));
        }

        let decoded = image::load_from_memory_with_format(bytes, image::ImageFormat::Png)
            .map_err(ExportError::Decode)?
            .to_rgba8();
        let (width, height) = decoded.dimensions();

        let mut clipboard =
            Clipboard::new().map_err(|e| ExportError::ClipboardUnsupported(e.to_string()))?;
        clipboard
            .set_image(ImageData {
                width: width as usize,
                height: height as usize,
                bytes: Cow::Owned(decoded.into_raw()),
            })
            .map_err(|e| ExportError::ClipboardUnsupported(e.to_string()))
    }
}
