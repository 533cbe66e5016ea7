//! qrmint CLI: Command-line front end for the QR render-and-export pipeline

mod commands;
mod session;

use clap::{Args, Parser, Subcommand};
use qrmint_engine::{
    cancel_pair, find_preset, wait_for_renderer, BundledSource, Color, Config, DirectorySaver,
    Pipeline, PipelineEvent, QrSize, Style, SystemClipboard, PRESETS,
};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Styled QR code generator with PNG export
#[derive(Parser)]
#[command(name = "qrmint")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Config file (default: .qrmint/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Render text or a URL and save it as PNG
    Generate(GenerateArgs),

    /// List the color presets
    Presets {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write a default config to .qrmint/config.json
    Init,

    /// Interactive session (default when no command specified)
    Session,
}

#[derive(Args)]
struct GenerateArgs {
    /// Text or URL to encode; bare domains get https:// prepended
    text: String,

    /// Export size in pixels (150, 200, 250, 300, 400, 500, 600, 800, 1000)
    #[arg(long)]
    size: Option<u32>,

    /// Module color, e.g. #1a1a4e
    #[arg(long)]
    dark: Option<String>,

    /// Background color, e.g. #ffffff
    #[arg(long)]
    light: Option<String>,

    /// Start from a named preset; --dark/--light still override
    #[arg(long)]
    preset: Option<String>,

    /// Directory to save the PNG into
    #[arg(long)]
    out: Option<PathBuf>,

    /// File name for the PNG
    #[arg(long)]
    filename: Option<String>,

    /// Also write the on-screen preview to this path
    #[arg(long)]
    preview: Option<PathBuf>,

    /// Copy the PNG to the clipboard
    #[arg(long)]
    copy: bool,

    /// Output as JSON
    #[arg(long)]
    json: bool,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let config_path = cli.config.unwrap_or_else(Config::default_path);

    match cli.command {
        Some(Commands::Generate(args)) => cmd_generate(&config_path, args),
        Some(Commands::Presets { json }) => cmd_presets(json),
        Some(Commands::Init) => cmd_init(&config_path),
        None | Some(Commands::Session) => cmd_session(&config_path),
    }
}

/// Log to stderr, filtered by `RUST_LOG` (default: warnings only).
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn load_config(path: &Path) -> Config {
    match Config::load_or_default(path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading config: {e}");
            std::process::exit(1);
        }
    }
}

fn runtime() -> tokio::runtime::Runtime {
    match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    }
}

fn print_json(value: &serde_json::Value) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => {
            eprintln!("Failed to serialize: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_generate(config_path: &Path, args: GenerateArgs) {
    let mut config = load_config(config_path);

    let style = match build_style(config.style, &args) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    };
    if let Some(out) = &args.out {
        config.download_dir.clone_from(out);
    }
    if let Some(filename) = &args.filename {
        config.download_filename.clone_from(filename);
    }

    let rt = runtime();
    match rt.block_on(generate(config, style, &args)) {
        Ok(report) if args.json => print_json(&report),
        Ok(_) => {}
        Err(e) => {
            eprintln!("Error: {e}");
            std::process::exit(1);
        }
    }
}

/// Layer preset and explicit flags over the configured style.
fn build_style(base: Style, args: &GenerateArgs) -> Result<Style, String> {
    let mut style = base;

    if let Some(name) = &args.preset {
        let preset = find_preset(name).ok_or_else(|| format!("Unknown preset: {name}"))?;
        style.dark = preset.dark;
        style.light = preset.light;
    }
    if let Some(dark) = &args.dark {
        style.dark = dark.parse::<Color>().map_err(|e| e.to_string())?;
    }
    if let Some(light) = &args.light {
        style.light = light.parse::<Color>().map_err(|e| e.to_string())?;
    }
    if let Some(size) = args.size {
        style.size = QrSize::new(size).map_err(|e| e.to_string())?;
    }
    Ok(style)
}

async fn generate(
    config: Config,
    style: Style,
    args: &GenerateArgs,
) -> Result<serde_json::Value, Box<dyn std::error::Error>> {
    let (_cancel, signal) = cancel_pair();
    let renderer = wait_for_renderer(&BundledSource, config.load_policy(), signal).await?;

    let (event_tx, mut event_rx) = mpsc::unbounded_channel();
    let saver = DirectorySaver::new(config.download_dir.clone());
    let pipeline = Pipeline::new(renderer, config, event_tx);

    let outcome = pipeline.submit(&args.text, style).await;
    print_events(&mut event_rx, args.json);
    let outcome = outcome?;
    let artifacts = outcome
        .artifacts()
        .ok_or("render was superseded")?
        .clone();

    let saved = pipeline.download(&saver);
    print_events(&mut event_rx, args.json);
    let path = saved?.ok_or("nothing to download")?;
    if !args.json {
        println!("Saved {}", path.display());
    }

    if let Some(preview_path) = &args.preview {
        artifacts.preview.image().save(preview_path)?;
        if !args.json {
            println!("Preview {}", preview_path.display());
        }
    }

    let copied = if args.copy {
        let result = pipeline.copy(&mut SystemClipboard::new());
        print_events(&mut event_rx, args.json);
        result.unwrap_or(false)
    } else {
        false
    };

    let export = &artifacts.export;
    Ok(serde_json::json!({
        "text": artifacts.text,
        "width": export.width(),
        "height": export.height(),
        "source": export.source(),
        "sha256": export.digest(),
        "rendered_at": export.rendered_at(),
        "path": path,
        "preview": args.preview,
        "copied": copied,
    }))
}

/// Show what the pipeline reported; JSON mode keeps stdout clean.
fn print_events(rx: &mut mpsc::UnboundedReceiver<PipelineEvent>, json: bool) {
    while let Ok(event) = rx.try_recv() {
        match event {
            PipelineEvent::InputNormalized { text } if !json => {
                eprintln!("Normalized to {text}");
            }
            PipelineEvent::Notify(n) if json => {
                tracing::info!(success = n.success, "{}", n.message);
            }
            PipelineEvent::Notify(n) => {
                let mark = if n.success { "✓" } else { "✗" };
                eprintln!("{mark} {}", n.message);
            }
            _ => {}
        }
    }
}

fn cmd_presets(json: bool) {
    if json {
        match serde_json::to_value(&PRESETS) {
            Ok(value) => print_json(&value),
            Err(e) => {
                eprintln!("Failed to serialize: {e}");
                std::process::exit(1);
            }
        }
        return;
    }

    println!("Color Presets\n");
    for preset in &PRESETS {
        println!("  {:<8} {} on {}", preset.label, preset.dark, preset.light);
    }
}

fn cmd_init(config_path: &Path) {
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return;
    }

    match Config::default().save(config_path) {
        Ok(()) => println!("Created {}", config_path.display()),
        Err(e) => {
            eprintln!("Failed to write config: {e}");
            std::process::exit(1);
        }
    }
}

fn cmd_session(config_path: &Path) {
    let config = load_config(config_path);
    let rt = runtime();
    if let Err(e) = rt.block_on(session::run_session(config)) {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(extra: &[&str]) -> GenerateArgs {
        let mut argv = vec!["qrmint", "generate", "example.com"];
        argv.extend_from_slice(extra);
        match Cli::parse_from(argv).command {
            Some(Commands::Generate(args)) => args,
            _ => panic!("expected generate"),
        }
    }

    #[test]
    fn test_cli_parses_generate() {
        let args = args(&["--size", "500", "--preset", "green", "--copy", "--json"]);
        assert_eq!(args.text, "example.com");
        assert_eq!(args.size, Some(500));
        assert!(args.copy);
        assert!(args.json);
    }

    #[test]
    fn test_cli_defaults_to_session() {
        let cli = Cli::parse_from(["qrmint"]);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_build_style_layers_flags() {
        let style = build_style(
            Style::default(),
            &args(&["--preset", "Green", "--light", "#000000"]),
        )
        .unwrap();
        assert_eq!(style.dark, Color::rgb(0x16, 0xa3, 0x4a));
        assert_eq!(style.light, Color::rgb(0, 0, 0));
        assert_eq!(style.size.pixels(), 300);
    }

    #[test]
    fn test_build_style_rejects_bad_values() {
        assert!(build_style(Style::default(), &args(&["--size", "123"])).is_err());
        assert!(build_style(Style::default(), &args(&["--dark", "blue"])).is_err());
        assert!(build_style(Style::default(), &args(&["--preset", "nope"])).is_err());
    }

    #[tokio::test]
    async fn test_generate_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.download_dir = dir.path().to_path_buf();
        let preview = dir.path().join("preview.png");
        let preview_arg = preview.to_string_lossy().into_owned();

        let args = args(&["--preview", &preview_arg, "--json"]);
        let report = generate(config, Style::default(), &args).await.unwrap();

        assert_eq!(report["text"], "https://example.com");
        assert_eq!(report["width"], 300);
        assert_eq!(report["source"], "full_resolution");
        assert_eq!(report["copied"], false);
        assert!(dir.path().join("qr-shirden.png").exists());

        assert_eq!(image::image_dimensions(&preview).unwrap(), (240, 240));
        assert_eq!(
            image::image_dimensions(dir.path().join("qr-shirden.png")).unwrap(),
            (300, 300)
        );
    }
}
