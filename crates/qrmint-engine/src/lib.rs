//! qrmint-engine: Headless QR render-and-export pipeline
//!
//! This crate provides the core logic for qrmint, including:
//! - Input validation and bare-domain normalization
//! - A renderer capability with a bundled `qrcode` implementation
//! - Off-screen surfaces with output-ready signalling
//! - Preview and full-resolution PNG export with last-request-wins ordering
//! - Download and clipboard export actions
//! - Bounded, cancellable waiting for renderer availability

pub mod color;
pub mod config;
pub mod error;
pub mod export;
pub mod loader;
pub mod notify;
pub mod pipeline;
pub mod renderer;
pub mod request;
pub mod surface;

// Re-export commonly used types
pub use color::{find_preset, Color, ColorError, Preset, PRESETS};
pub use config::{Config, ConfigError};
pub use error::{ExportError, PipelineError};
pub use export::{ClipboardSink, DirectorySaver, FileSaver, SystemClipboard, PNG_MIME};
pub use loader::{
    cancel_pair, wait_for_renderer, BundledSource, CancelHandle, CancelSignal, LoadError,
    LoadPolicy, RendererSource,
};
pub use notify::{Notification, Toast};
pub use pipeline::{
    Artifacts, ExportArtifact, ExportSource, Pipeline, PipelineEvent, PipelineState,
    PreviewArtifact, RenderOutcome, RenderStatus,
};
pub use renderer::{EcLevel, QrCodeRenderer, RenderError, RenderOutput, RenderSpec, Renderer};
pub use request::{normalize, validate, PendingRequest, QrSize, SizeError, Style, SIZE_CHOICES};
pub use surface::{OffscreenSurface, SurfaceHost, SurfaceWriter};

/// Returns the engine version.
pub fn engine_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
