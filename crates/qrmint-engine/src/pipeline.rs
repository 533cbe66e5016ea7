//! The render-and-export pipeline.
//!
//! A [`Pipeline`] turns text and style into a fixed-size preview plus a
//! full-resolution PNG export, using an external [`Renderer`] that delivers
//! its output asynchronously into an off-screen surface.
//!
//! # Ordering
//! Every render gets a request id from a counter held under the state lock.
//! Only the most recently triggered request may commit; anything older that
//! finishes later is discarded as superseded. Preview and export are
//! committed together as one [`Artifacts`] value, so they always come from
//! the same request.
//!
//! # Event Channel
//! UI-facing effects (busy state, notifications, reveal/scroll) are sent as
//! [`PipelineEvent`]s. Sends ignore a dropped receiver: the pipeline keeps
//! working without an observer.

use crate::config::Config;
use crate::error::{ExportError, PipelineError};
use crate::export::{ClipboardSink, FileSaver, PNG_MIME};
use crate::notify::{
    Notification, MSG_CLIPBOARD_UNSUPPORTED, MSG_COPIED, MSG_DOWNLOADED, MSG_DOWNLOAD_FAILED,
    MSG_EMPTY_INPUT, MSG_OUTPUT_MISSING, MSG_RENDER_FAILED,
};
use crate::renderer::{EcLevel, RenderOutput, RenderSpec, Renderer};
use crate::request::{normalize, validate, PendingRequest, Style};
use crate::surface::SurfaceHost;
use chrono::{DateTime, Utc};
use image::imageops::{self, FilterType};
use image::{ImageFormat, RgbaImage};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::borrow::Cow;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Status of the most recently triggered render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RenderStatus {
    /// Nothing requested yet.
    #[default]
    Idle,
    /// Waiting for renderer output.
    Rendering,
    /// Artifacts are available.
    Ready,
    /// The attempt failed; earlier artifacts, if any, are still current.
    Failed,
}

impl std::fmt::Display for RenderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Rendering => write!(f, "rendering"),
            Self::Ready => write!(f, "ready"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

/// Fixed-size image shown on screen.
#[derive(Debug, Clone)]
pub struct PreviewArtifact {
    image: RgbaImage,
}

impl PreviewArtifact {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }
}

/// Where the export bytes were encoded from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportSource {
    /// The renderer's own full-resolution bitmap.
    FullResolution,
    /// The scaled preview, used when no full-resolution bitmap existed.
    PreviewFallback,
}

/// PNG-encoded image kept for download and copy.
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    png: Vec<u8>,
    width: u32,
    height: u32,
    source: ExportSource,
    digest: String,
    rendered_at: DateTime<Utc>,
}

impl ExportArtifact {
    fn encode(image: &RgbaImage, source: ExportSource) -> Result<Self, PipelineError> {
        let mut png = Vec::new();
        image.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;

        let mut hasher = Sha256::new();
        hasher.update(&png);
        let digest = format!("{:x}", hasher.finalize());

        Ok(Self {
            png,
            width: image.width(),
            height: image.height(),
            source,
            digest,
            rendered_at: Utc::now(),
        })
    }

    pub fn png(&self) -> &[u8] {
        &self.png
    }

    pub fn mime(&self) -> &'static str {
        PNG_MIME
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn source(&self) -> ExportSource {
        self.source
    }

    /// SHA-256 of the PNG bytes, hex encoded.
    pub fn digest(&self) -> &str {
        &self.digest
    }

    pub fn rendered_at(&self) -> DateTime<Utc> {
        self.rendered_at
    }
}

/// Preview and export from one committed request.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub request_id: u64,
    pub text: String,
    pub style: Style,
    pub preview: PreviewArtifact,
    pub export: ExportArtifact,
}

/// Mutable state owned by the pipeline.
#[derive(Debug, Clone, Default)]
pub struct PipelineState {
    status: RenderStatus,
    latest_request: u64,
    last_input: Option<String>,
    artifacts: Option<Arc<Artifacts>>,
    busy: usize,
}

impl PipelineState {
    pub fn status(&self) -> RenderStatus {
        self.status
    }

    /// Whether any render has completed successfully.
    pub fn has_result(&self) -> bool {
        self.artifacts.is_some()
    }

    /// Trimmed text of the last successful render.
    pub fn last_input(&self) -> Option<&str> {
        self.last_input.as_deref()
    }

    pub fn artifacts(&self) -> Option<&Arc<Artifacts>> {
        self.artifacts.as_ref()
    }

    /// Id of the most recently triggered request.
    pub fn latest_request(&self) -> u64 {
        self.latest_request
    }

    pub fn is_busy(&self) -> bool {
        self.busy > 0
    }
}

/// Effects for the UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineEvent {
    /// The visible input should be replaced with the normalized text.
    InputNormalized { text: String },
    /// The triggering control should show a busy state.
    BusyStarted,
    /// No loader-showing render is in flight any more.
    BusyCleared,
    /// Show a toast.
    Notify(Notification),
    /// The preview area should become visible.
    PreviewRevealed,
    /// New artifacts were committed.
    Rendered {
        request_id: u64,
        text: String,
        width: u32,
        height: u32,
        source: ExportSource,
    },
    /// Narrow viewport: bring the preview into view.
    ScrollPreviewIntoView,
    /// A finished render lost to a newer request.
    Superseded { request_id: u64 },
    /// A render attempt failed.
    Failed { request_id: u64, error: String },
}

/// How a render attempt ended when it did not fail.
#[derive(Debug, Clone)]
pub enum RenderOutcome {
    /// Artifacts were committed.
    Committed(Arc<Artifacts>),
    /// A newer request was triggered before this one finished.
    Superseded { request_id: u64 },
}

impl RenderOutcome {
    pub fn artifacts(&self) -> Option<&Arc<Artifacts>> {
        match self {
            Self::Committed(artifacts) => Some(artifacts),
            Self::Superseded { .. } => None,
        }
    }
}

/// The render-and-export pipeline.
pub struct Pipeline {
    renderer: Arc<dyn Renderer>,
    host: SurfaceHost,
    config: Config,
    state: Mutex<PipelineState>,
    event_tx: mpsc::UnboundedSender<PipelineEvent>,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        config: Config,
        event_tx: mpsc::UnboundedSender<PipelineEvent>,
    ) -> Self {
        Self {
            renderer,
            host: SurfaceHost::new(),
            config,
            state: Mutex::new(PipelineState::default()),
            event_tx,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Host for the off-screen surfaces this pipeline creates.
    pub fn surfaces(&self) -> &SurfaceHost {
        &self.host
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> PipelineState {
        self.state().clone()
    }

    pub fn status(&self) -> RenderStatus {
        self.state().status
    }

    pub fn has_result(&self) -> bool {
        self.state().has_result()
    }

    pub fn last_input(&self) -> Option<String> {
        self.state().last_input.clone()
    }

    pub fn artifacts(&self) -> Option<Arc<Artifacts>> {
        self.state().artifacts.clone()
    }

    /// Handle a "generate" action on user input.
    ///
    /// Blank input is rejected with a notification and never reaches the
    /// renderer. Bare domains are normalized before rendering.
    pub async fn submit(&self, raw: &str, style: Style) -> Result<RenderOutcome, PipelineError> {
        let trimmed = match validate(raw) {
            Ok(text) => text,
            Err(e) => {
                debug!("Rejected empty input");
                self.emit(PipelineEvent::Notify(Notification::failure(MSG_EMPTY_INPUT)));
                return Err(e);
            }
        };

        let text = normalize(trimmed);
        if let Cow::Owned(normalized) = &text {
            debug!(text = %normalized, "Normalized bare domain");
            self.emit(PipelineEvent::InputNormalized {
                text: normalized.clone(),
            });
        }

        self.render(&text, style, true).await
    }

    /// Re-render the last successful input with a new style.
    ///
    /// Returns `None` without rendering when nothing has succeeded yet.
    pub async fn restyle(&self, style: Style) -> Option<Result<RenderOutcome, PipelineError>> {
        let text = {
            let state = self.state();
            if !state.has_result() {
                return None;
            }
            state.last_input.clone()?
        };
        Some(self.render(&text, style, false).await)
    }

    /// Render `text` with `style`, committing the result if still current.
    pub async fn render(
        &self,
        text: &str,
        style: Style,
        show_loader: bool,
    ) -> Result<RenderOutcome, PipelineError> {
        let request = {
            let mut state = self.state();
            let request =
                PendingRequest::new(state.latest_request + 1, text, style, show_loader)?;
            state.latest_request = request.id;
            state.status = RenderStatus::Rendering;
            request
        };
        let _busy = self.begin_busy(request.show_loading_indicator);

        debug!(
            request = request.id,
            size = %request.style.size,
            dark = %request.style.dark,
            light = %request.style.light,
            "Starting render"
        );

        let surface = self.host.create();
        let spec = RenderSpec {
            text: request.text.clone(),
            width: request.style.size.pixels(),
            height: request.style.size.pixels(),
            dark: request.style.dark,
            light: request.style.light,
            ec_level: EcLevel::High,
        };

        if let Err(e) = self.renderer.render(surface.writer(), &spec) {
            drop(surface);
            return Err(self.fail(
                &request,
                MSG_RENDER_FAILED,
                PipelineError::RenderInvocation(e),
            ));
        }

        let Some(output) = surface.wait_for_output(self.config.render_timeout()).await else {
            drop(surface);
            return Err(self.fail(
                &request,
                MSG_OUTPUT_MISSING,
                PipelineError::RenderOutputMissing(self.config.render_timeout_ms),
            ));
        };

        let artifacts = self.build_artifacts(&request, &output);
        drop(surface);

        match artifacts {
            Ok(artifacts) => Ok(self.commit(&request, artifacts)),
            Err(e) => Err(self.fail(&request, MSG_OUTPUT_MISSING, e)),
        }
    }

    /// Save the export artifact. No-op before the first successful render.
    pub fn download(&self, saver: &dyn FileSaver) -> Result<Option<PathBuf>, ExportError> {
        let Some(artifacts) = self.artifacts() else {
            debug!("Download ignored: nothing rendered yet");
            return Ok(None);
        };

        match saver.save(artifacts.export.png(), &self.config.download_filename) {
            Ok(path) => {
                info!(path = %path.display(), "Downloaded QR code");
                self.emit(PipelineEvent::Notify(Notification::success(MSG_DOWNLOADED)));
                Ok(Some(path))
            }
            Err(e) => {
                warn!(error = %e, "Download failed");
                self.emit(PipelineEvent::Notify(Notification::failure(
                    MSG_DOWNLOAD_FAILED,
                )));
                Err(e)
            }
        }
    }

    /// Put the export artifact on the clipboard. No-op before the first
    /// successful render; returns `Ok(true)` once copied.
    pub fn copy(&self, clipboard: &mut dyn ClipboardSink) -> Result<bool, ExportError> {
        let Some(artifacts) = self.artifacts() else {
            debug!("Copy ignored: nothing rendered yet");
            return Ok(false);
        };

        match clipboard.write_image(artifacts.export.png(), artifacts.export.mime()) {
            Ok(()) => {
                info!(bytes = artifacts.export.png().len(), "Copied QR code");
                self.emit(PipelineEvent::Notify(Notification::success(MSG_COPIED)));
                Ok(true)
            }
            Err(e) => {
                warn!(error = %e, "Clipboard copy failed");
                self.emit(PipelineEvent::Notify(Notification::failure(
                    MSG_CLIPBOARD_UNSUPPORTED,
                )));
                Err(e)
            }
        }
    }

    fn build_artifacts(
        &self,
        request: &PendingRequest,
        output: &RenderOutput,
    ) -> Result<Artifacts, PipelineError> {
        let edge = self.config.preview_size;
        let preview = imageops::resize(output.pixels(), edge, edge, FilterType::Triangle);

        let export = match output {
            RenderOutput::Bitmap(full) => ExportArtifact::encode(full, ExportSource::FullResolution)?,
            RenderOutput::Image(_) if self.config.allow_preview_fallback => {
                warn!(
                    request = request.id,
                    "No full-resolution bitmap; exporting the preview instead"
                );
                ExportArtifact::encode(&preview, ExportSource::PreviewFallback)?
            }
            RenderOutput::Image(_) => return Err(PipelineError::ExportSourceUnavailable),
        };

        Ok(Artifacts {
            request_id: request.id,
            text: request.text.clone(),
            style: request.style,
            preview: PreviewArtifact { image: preview },
            export,
        })
    }

    fn commit(&self, request: &PendingRequest, artifacts: Artifacts) -> RenderOutcome {
        let artifacts = Arc::new(artifacts);
        {
            let mut state = self.state();
            if state.latest_request != request.id {
                let latest = state.latest_request;
                drop(state);
                debug!(request = request.id, latest, "Discarding superseded render");
                self.emit(PipelineEvent::Superseded {
                    request_id: request.id,
                });
                return RenderOutcome::Superseded {
                    request_id: request.id,
                };
            }
            state.artifacts = Some(Arc::clone(&artifacts));
            state.last_input = Some(request.text.clone());
            state.status = RenderStatus::Ready;
        }

        info!(
            request = request.id,
            width = artifacts.export.width(),
            height = artifacts.export.height(),
            "Render committed"
        );
        self.emit(PipelineEvent::PreviewRevealed);
        self.emit(PipelineEvent::Rendered {
            request_id: request.id,
            text: request.text.clone(),
            width: artifacts.export.width(),
            height: artifacts.export.height(),
            source: artifacts.export.source(),
        });
        if self.config.is_narrow_viewport() {
            self.emit(PipelineEvent::ScrollPreviewIntoView);
        }

        RenderOutcome::Committed(artifacts)
    }

    /// Record a failed attempt and build its error.
    ///
    /// Stale attempts fail quietly; only the current request updates the
    /// status and notifies.
    fn fail(&self, request: &PendingRequest, message: &str, error: PipelineError) -> PipelineError {
        let current = {
            let mut state = self.state();
            let current = state.latest_request == request.id;
            if current {
                state.status = RenderStatus::Failed;
            }
            current
        };

        warn!(request = request.id, error = %error, current, "Render failed");
        if current {
            self.emit(PipelineEvent::Notify(Notification::failure(message)));
        }
        self.emit(PipelineEvent::Failed {
            request_id: request.id,
            error: error.to_string(),
        });
        error
    }

    fn begin_busy(&self, show_loader: bool) -> BusyGuard<'_> {
        if show_loader {
            let started = {
                let mut state = self.state();
                state.busy += 1;
                state.busy == 1
            };
            if started {
                self.emit(PipelineEvent::BusyStarted);
            }
        }
        BusyGuard {
            pipeline: self,
            active: show_loader,
        }
    }

    fn state(&self) -> MutexGuard<'_, PipelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn emit(&self, event: PipelineEvent) {
        let _ = self.event_tx.send(event);
    }
}

/// Clears the busy state on every exit path of a render attempt.
struct BusyGuard<'a> {
    pipeline: &'a Pipeline,
    active: bool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        let cleared = {
            let mut state = self.pipeline.state();
            state.busy = state.busy.saturating_sub(1);
            state.busy == 0
        };
        if cleared {
            self.pipeline.emit(PipelineEvent::BusyCleared);
        }
    }
}
