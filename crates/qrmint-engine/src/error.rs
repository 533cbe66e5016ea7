//! Error types for the render-and-export pipeline.

use crate::renderer::RenderError;

/// Errors that can occur during a render attempt.
///
/// Every variant is recovered locally: the pipeline reports it as a
/// notification and leaves previously committed artifacts untouched.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// Input was empty after trimming.
    #[error("Input is empty")]
    Validation,

    /// The renderer failed synchronously.
    #[error("Renderer invocation failed: {0}")]
    RenderInvocation(#[source] RenderError),

    /// The renderer produced nothing within the wait window.
    #[error("Renderer produced no output after {0}ms")]
    RenderOutputMissing(u64),

    /// Only a drawable image was produced and the preview fallback is disabled.
    #[error("No full-resolution source available for export")]
    ExportSourceUnavailable,

    /// Encoding the export artifact failed.
    #[error("Failed to encode PNG: {0}")]
    Encode(#[from] image::ImageError),
}

/// Errors that can occur in download and copy actions.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    /// Writing the file failed.
    #[error("Failed to save {}: {source}", path.display())]
    Save {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The platform clipboard cannot take images.
    #[error("Clipboard image support unavailable: {0}")]
    ClipboardUnsupported(String),

    /// The export artifact could not be decoded for the clipboard.
    #[error("Failed to decode export artifact: {0}")]
    Decode(#[source] image::ImageError),
}
