//! Interactive session: a line-oriented front end for the pipeline.
//!
//! Plain lines are the input field (Enter submits). Slash commands change
//! the style, export the result, or inspect state. Pipeline events are
//! printed as they arrive.

use crate::commands::{help_text, parse_command, unescape_slash, Command};
use qrmint_engine::notify::MSG_LIBRARY_UNAVAILABLE;
use qrmint_engine::{
    cancel_pair, find_preset, wait_for_renderer, BundledSource, ClipboardSink, Color, Config,
    DirectorySaver, ExportSource, LoadError, Notification, Pipeline, PipelineEvent, QrSize,
    RenderStatus, Renderer, Style, SystemClipboard, Toast, PRESETS,
};
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;
use tracing::debug;

/// Whether the session keeps going after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Renderer availability as seen by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
enum RendererState {
    Loading,
    Ready,
    Unavailable,
}

/// Session state and output sink.
pub struct Session<W: Write> {
    config: Config,
    style: Style,
    active_preset: Option<&'static str>,
    input: String,
    renderer: RendererState,
    pipeline: Option<Arc<Pipeline>>,
    saver: DirectorySaver,
    clipboard: Box<dyn ClipboardSink + Send>,
    toast: Toast,
    notice: Option<&'static str>,
    out: W,
}

impl<W: Write> Session<W> {
    pub fn new(config: Config, clipboard: Box<dyn ClipboardSink + Send>, out: W) -> Self {
        let active_preset = PRESETS
            .iter()
            .find(|p| p.dark == config.style.dark && p.light == config.style.light)
            .map(|p| p.label);
        Self {
            style: config.style,
            saver: DirectorySaver::new(config.download_dir.clone()),
            toast: Toast::new(config.toast_duration()),
            config,
            active_preset,
            input: String::new(),
            renderer: RendererState::Loading,
            pipeline: None,
            clipboard,
            notice: None,
            out,
        }
    }

    /// Print the greeting.
    pub fn banner(&mut self) -> io::Result<()> {
        writeln!(
            self.out,
            "qrmint {} - type text and press Enter, /help for commands",
            qrmint_engine::engine_version()
        )
    }

    /// Enable generation with a ready renderer.
    pub fn attach(
        &mut self,
        renderer: Arc<dyn Renderer>,
        event_tx: mpsc::UnboundedSender<PipelineEvent>,
    ) {
        self.pipeline = Some(Arc::new(Pipeline::new(
            renderer,
            self.config.clone(),
            event_tx,
        )));
        self.renderer = RendererState::Ready;
        debug!("Session renderer attached");
    }

    /// Record that the renderer will not arrive; generation stays disabled.
    pub fn renderer_unavailable(&mut self, error: &LoadError) -> io::Result<()> {
        self.renderer = RendererState::Unavailable;
        if matches!(error, LoadError::Timeout { .. }) {
            self.notice = Some(MSG_LIBRARY_UNAVAILABLE);
            writeln!(self.out, "! {MSG_LIBRARY_UNAVAILABLE}")?;
        }
        Ok(())
    }

    /// Handle one line of user input.
    pub fn handle_line(&mut self, line: &str) -> io::Result<Flow> {
        let Some(command) = parse_command(line) else {
            // An empty line re-submits whatever is in the input.
            if !line.trim().is_empty() {
                self.input = unescape_slash(line);
            }
            self.submit()?;
            return Ok(Flow::Continue);
        };

        match command {
            Command::Help => write!(self.out, "{}", help_text())?,
            Command::Quit => return Ok(Flow::Quit),
            Command::Clear => self.input.clear(),
            Command::Status => self.print_status()?,
            Command::Download => self.download()?,
            Command::Copy => self.copy(),
            Command::Dark(arg) => self.set_color(arg.as_deref(), true)?,
            Command::Light(arg) => self.set_color(arg.as_deref(), false)?,
            Command::Size(arg) => self.set_size(arg.as_deref())?,
            Command::Preset(arg) => self.set_preset(arg.as_deref())?,
            Command::Unknown(name) => {
                writeln!(self.out, "Unknown command /{name}. Try /help")?;
            }
        }
        Ok(Flow::Continue)
    }

    /// Print a pipeline event.
    pub fn handle_event(&mut self, event: PipelineEvent) -> io::Result<()> {
        match event {
            PipelineEvent::InputNormalized { text } => {
                writeln!(self.out, "  -> {text}")?;
                self.input = text;
            }
            PipelineEvent::BusyStarted => writeln!(self.out, "Generating...")?,
            PipelineEvent::Notify(notification) => self.show(notification)?,
            PipelineEvent::Rendered {
                width,
                height,
                source,
                ..
            } => {
                let note = match source {
                    ExportSource::FullResolution => "",
                    ExportSource::PreviewFallback => " (export uses the preview)",
                };
                writeln!(
                    self.out,
                    "QR code ready: {width}x{height}, preview {0}x{0}{note}",
                    self.config.preview_size
                )?;
            }
            other => debug!(?other, "Session ignored event"),
        }
        Ok(())
    }

    /// Expire the toast if its time is up.
    pub fn tick(&mut self, now: Instant) {
        self.toast.tick(now);
    }

    /// When the visible toast hides.
    pub fn toast_deadline(&self) -> Option<Instant> {
        self.toast.dismiss_at()
    }

    fn show(&mut self, notification: Notification) -> io::Result<()> {
        let mark = if notification.success { "✓" } else { "✗" };
        writeln!(self.out, "{mark} {}", notification.message)?;
        self.toast.show(notification, Instant::now());
        Ok(())
    }

    fn submit(&mut self) -> io::Result<()> {
        let Some(pipeline) = self.ready_pipeline()? else {
            return Ok(());
        };
        let text = self.input.clone();
        let style = self.style;
        tokio::spawn(async move {
            let _ = pipeline.submit(&text, style).await;
        });
        Ok(())
    }

    /// Re-render the last result with the current style, if there is one.
    ///
    /// This renders the last *finished* input. Being triggered later, it
    /// supersedes a submit that is still rendering.
    fn restyle(&mut self) -> io::Result<()> {
        let Some(pipeline) = self.pipeline.clone() else {
            return Ok(());
        };
        if !pipeline.has_result() {
            return Ok(());
        }
        if pipeline.status() == RenderStatus::Rendering {
            if let Some(last) = pipeline.last_input() {
                writeln!(
                    self.out,
                    "  restyling \"{last}\"; the render in progress will be dropped"
                )?;
            }
        }
        let style = self.style;
        tokio::spawn(async move {
            let _ = pipeline.restyle(style).await;
        });
        Ok(())
    }

    fn ready_pipeline(&mut self) -> io::Result<Option<Arc<Pipeline>>> {
        match (&self.renderer, &self.pipeline) {
            (RendererState::Ready, Some(pipeline)) => Ok(Some(Arc::clone(pipeline))),
            (RendererState::Unavailable, _) => {
                writeln!(self.out, "! {MSG_LIBRARY_UNAVAILABLE}")?;
                Ok(None)
            }
            _ => {
                writeln!(self.out, "Renderer is still loading...")?;
                Ok(None)
            }
        }
    }

    fn download(&mut self) -> io::Result<()> {
        let Some(pipeline) = &self.pipeline else {
            return Ok(());
        };
        if let Ok(Some(path)) = pipeline.download(&self.saver) {
            writeln!(self.out, "  saved {}", path.display())?;
        }
        Ok(())
    }

    fn copy(&mut self) {
        if let Some(pipeline) = &self.pipeline {
            // Failures surface as a notification event.
            let _ = pipeline.copy(self.clipboard.as_mut());
        }
    }

    fn set_color(&mut self, arg: Option<&str>, dark: bool) -> io::Result<()> {
        let label = if dark { "Dark" } else { "Light" };
        let Some(arg) = arg else {
            let current = if dark { self.style.dark } else { self.style.light };
            return writeln!(self.out, "{label} color: {current}");
        };

        match arg.parse::<Color>() {
            Ok(color) => {
                if dark {
                    self.style.dark = color;
                } else {
                    self.style.light = color;
                }
                writeln!(self.out, "{label} color: {color}")?;
                self.restyle()?;
            }
            Err(e) => writeln!(self.out, "{e}")?,
        }
        Ok(())
    }

    fn set_size(&mut self, arg: Option<&str>) -> io::Result<()> {
        let Some(arg) = arg else {
            return writeln!(self.out, "Size: {}", self.style.size);
        };

        let size = arg
            .trim_end_matches("px")
            .parse::<u32>()
            .map_err(|_| format!("Not a size: {arg}"))
            .and_then(|px| QrSize::new(px).map_err(|e| e.to_string()));
        match size {
            Ok(size) => {
                self.style.size = size;
                writeln!(self.out, "Size: {size}")?;
                self.restyle()?;
            }
            Err(msg) => writeln!(self.out, "{msg}")?,
        }
        Ok(())
    }

    fn set_preset(&mut self, arg: Option<&str>) -> io::Result<()> {
        let Some(arg) = arg else {
            for preset in &PRESETS {
                let marker = if self.active_preset == Some(preset.label) {
                    "*"
                } else {
                    " "
                };
                writeln!(
                    self.out,
                    "{marker} {:<8} {} on {}",
                    preset.label, preset.dark, preset.light
                )?;
            }
            return Ok(());
        };

        let Some(preset) = find_preset(arg) else {
            return writeln!(self.out, "Unknown preset: {arg}. Try /preset");
        };
        self.style.dark = preset.dark;
        self.style.light = preset.light;
        self.active_preset = Some(preset.label);
        writeln!(
            self.out,
            "Preset {}: {} on {}",
            preset.label, preset.dark, preset.light
        )?;
        self.restyle()?;
        Ok(())
    }

    fn print_status(&mut self) -> io::Result<()> {
        let renderer = match self.renderer {
            RendererState::Loading => "loading",
            RendererState::Ready => "ready",
            RendererState::Unavailable => "unavailable",
        };
        writeln!(self.out, "Renderer: {renderer}")?;
        if let Some(notice) = self.notice {
            writeln!(self.out, "Notice:   {notice}")?;
        }
        writeln!(self.out, "Input:    {}", self.input)?;
        writeln!(
            self.out,
            "Style:    {} on {}, {}{}",
            self.style.dark,
            self.style.light,
            self.style.size,
            self.active_preset
                .map(|p| format!(" ({p})"))
                .unwrap_or_default()
        )?;

        if let Some(pipeline) = &self.pipeline {
            writeln!(self.out, "Status:   {}", pipeline.status())?;
            if let Some(artifacts) = pipeline.artifacts() {
                let export = &artifacts.export;
                writeln!(
                    self.out,
                    "Result:   {} ({}x{}, sha256 {}, {})",
                    artifacts.text,
                    export.width(),
                    export.height(),
                    &export.digest()[..12],
                    export.rendered_at().format("%H:%M:%S")
                )?;
            }
        }

        if let Some(toast) = self.toast.visible(Instant::now()) {
            writeln!(self.out, "Toast:    {}", toast.message)?;
        }
        Ok(())
    }
}

/// Run the interactive session on stdin/stdout until `/quit` or EOF.
pub async fn run_session(config: Config) -> io::Result<()> {
    // Blocking stdin reads live on their own thread.
    let (line_tx, mut line_rx) = mpsc::unbounded_channel::<String>();
    std::thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line_tx.send(line).is_err() {
                break;
            }
        }
    });

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let (cancel, signal) = cancel_pair();
    let source = BundledSource;
    let policy = config.load_policy();

    let mut session = Session::new(config, Box::new(SystemClipboard::new()), io::stdout());
    session.banner()?;

    let load = wait_for_renderer(&source, policy, signal);
    tokio::pin!(load);
    let mut loading = true;

    loop {
        let dismiss = session.toast_deadline();
        let dismiss_at =
            tokio::time::Instant::from_std(dismiss.unwrap_or_else(Instant::now));

        tokio::select! {
            result = &mut load, if loading => {
                loading = false;
                match result {
                    Ok(renderer) => session.attach(renderer, event_tx.clone()),
                    Err(e) => session.renderer_unavailable(&e)?,
                }
            }
            line = line_rx.recv() => {
                let Some(line) = line else { break };
                if session.handle_line(&line)? == Flow::Quit {
                    break;
                }
            }
            Some(event) = event_rx.recv() => session.handle_event(event)?,
            () = tokio::time::sleep_until(dismiss_at), if dismiss.is_some() => {
                session.tick(Instant::now());
            }
        }
        session.out.flush()?;
    }

    if loading {
        cancel.cancel();
    }
    Ok(())
}
