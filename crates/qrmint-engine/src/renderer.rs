//! Renderer capability and the bundled QR renderer.
//!
//! A renderer is invoked synchronously but delivers its output later into
//! an off-screen surface. Errors returned from [`Renderer::render`] are
//! invocation failures; a renderer that never writes is detected by the
//! pipeline's wait timeout.

use crate::color::Color;
use crate::surface::SurfaceWriter;
use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use qrcode::QrCode;
use tracing::debug;

/// Error-correction level requested from the encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EcLevel {
    Low,
    Medium,
    Quartile,
    /// Recovers ~30% damage; the pipeline always asks for this.
    #[default]
    High,
}

impl From<EcLevel> for qrcode::EcLevel {
    fn from(level: EcLevel) -> Self {
        match level {
            EcLevel::Low => Self::L,
            EcLevel::Medium => Self::M,
            EcLevel::Quartile => Self::Q,
            EcLevel::High => Self::H,
        }
    }
}

/// Parameters for one renderer invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSpec {
    pub text: String,
    pub width: u32,
    pub height: u32,
    pub dark: Color,
    pub light: Color,
    pub ec_level: EcLevel,
}

/// What a renderer leaves behind in the surface.
#[derive(Debug, Clone)]
pub enum RenderOutput {
    /// Full-resolution bitmap that can be encoded directly.
    Bitmap(RgbaImage),
    /// Drawable image without an encodable backing surface.
    Image(RgbaImage),
}

impl RenderOutput {
    /// Pixels to draw, whichever form they came in.
    pub fn pixels(&self) -> &RgbaImage {
        match self {
            Self::Bitmap(img) | Self::Image(img) => img,
        }
    }
}

/// External rendering capability.
pub trait Renderer: Send + Sync {
    /// Start rendering `spec` into `target`.
    fn render(&self, target: SurfaceWriter, spec: &RenderSpec) -> Result<(), RenderError>;
}

/// Renderer backed by the `qrcode` encoder.
#[derive(Debug, Clone, Copy, Default)]
pub struct QrCodeRenderer;

impl QrCodeRenderer {
    pub fn new() -> Self {
        Self
    }
}

impl Renderer for QrCodeRenderer {
    fn render(&self, target: SurfaceWriter, spec: &RenderSpec) -> Result<(), RenderError> {
        if spec.width == 0 || spec.height == 0 {
            return Err(RenderError::InvalidDimensions(spec.width, spec.height));
        }

        let code = QrCode::with_error_correction_level(spec.text.as_bytes(), spec.ec_level.into())
            .map_err(|e| RenderError::Encode(e.to_string()))?;
        debug!(
            modules = code.width(),
            width = spec.width,
            height = spec.height,
            "Encoded QR symbol"
        );

        // Each module needs at least one pixel or the symbol stops scanning.
        let modules = u32::try_from(code.width()).unwrap_or(u32::MAX);
        if modules > spec.width.min(spec.height) {
            return Err(RenderError::SymbolTooLarge {
                modules,
                width: spec.width,
                height: spec.height,
            });
        }

        let spec = spec.clone();
        let deliver = move || {
            let img = rasterize(&code, &spec);
            if !target.write(RenderOutput::Bitmap(img)) {
                debug!("Surface disposed before render finished");
            }
        };

        // Deliver asynchronously when a runtime is around, inline otherwise.
        if tokio::runtime::Handle::try_current().is_ok() {
            tokio::task::spawn_blocking(deliver);
        } else {
            deliver();
        }
        Ok(())
    }
}

/// Draw the symbol at exactly `width × height` without a quiet zone.
///
/// Modules are drawn at the largest whole-pixel scale that fits, then
/// stretched to the exact size. Callers guarantee at least one pixel per
/// module.
fn rasterize(code: &QrCode, spec: &RenderSpec) -> RgbaImage {
    let modules = u32::try_from(code.width()).unwrap_or(u32::MAX).max(1);
    let symbol = code
        .render::<Rgba<u8>>()
        .quiet_zone(false)
        .module_dimensions((spec.width / modules).max(1), (spec.height / modules).max(1))
        .dark_color(Rgba(spec.dark.to_rgba()))
        .light_color(Rgba(spec.light.to_rgba()))
        .build();
    imageops::resize(&symbol, spec.width, spec.height, FilterType::Nearest)
}

/// Errors a renderer can raise synchronously.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RenderError {
    /// The payload cannot be encoded (e.g. too long for any QR version).
    #[error("Encoding failed: {0}")]
    Encode(String),

    /// Requested output has no area.
    #[error("Invalid dimensions {0}x{1}")]
    InvalidDimensions(u32, u32),

    /// The symbol has more modules than the output has pixels.
    #[error("QR symbol needs {modules} modules but output is {width}x{height}")]
    SymbolTooLarge { modules: u32, width: u32, height: u32 },

    /// Renderer-specific failure.
    #[error("{0}")]
    Other(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::surface::SurfaceHost;
    use std::time::Duration;

    fn spec(text: &str, size: u32) -> RenderSpec {
        RenderSpec {
            text: text.into(),
            width: size,
            height: size,
            dark: Color::DEFAULT_DARK,
            light: Color::DEFAULT_LIGHT,
            ec_level: EcLevel::High,
        }
    }

    #[tokio::test]
    async fn test_renders_exact_size_bitmap() {
        let host = SurfaceHost::new();
        let surface = host.create();
        QrCodeRenderer::new()
            .render(surface.writer(), &spec("https://example.com", 300))
            .unwrap();

        let output = surface
            .wait_for_output(Duration::from_secs(5))
            .await
            .expect("renderer should deliver output");
        let RenderOutput::Bitmap(img) = output else {
            panic!("expected a bitmap");
        };
        assert_eq!(img.dimensions(), (300, 300));
    }

    #[tokio::test]
    async fn test_uses_requested_colors() {
        let host = SurfaceHost::new();
        let surface = host.create();
        let mut spec = spec("colors", 200);
        spec.dark = Color::rgb(0xdc, 0x26, 0x26);
        spec.light = Color::rgb(0xff, 0xf7, 0xf7);
        QrCodeRenderer::new().render(surface.writer(), &spec).unwrap();

        let output = surface.wait_for_output(Duration::from_secs(5)).await.unwrap();
        let img = output.pixels();
        // No quiet zone: the top-left pixel belongs to a finder pattern.
        assert_eq!(img.get_pixel(0, 0).0, [0xdc, 0x26, 0x26, 0xff]);
        assert!(img.pixels().any(|p| p.0 == [0xff, 0xf7, 0xf7, 0xff]));
    }

    #[test]
    fn test_renders_inline_without_runtime() {
        let host = SurfaceHost::new();
        let surface = host.create();
        let writer = surface.writer();
        QrCodeRenderer::new().render(writer, &spec("inline", 150)).unwrap();

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let output = rt.block_on(surface.wait_for_output(Duration::from_millis(10)));
        assert!(output.is_some());
    }

    #[test]
    fn test_overflow_fails_synchronously() {
        let host = SurfaceHost::new();
        let surface = host.create();
        let huge = "x".repeat(8000);
        let result = QrCodeRenderer::new().render(surface.writer(), &spec(&huge, 300));
        assert!(matches!(result, Err(RenderError::Encode(_))));
    }

    #[test]
    fn test_symbol_larger_than_output_rejected() {
        let host = SurfaceHost::new();
        let surface = host.create();
        let payload = "x".repeat(900);
        let result = QrCodeRenderer::new().render(surface.writer(), &spec(&payload, 150));
        match result {
            Err(RenderError::SymbolTooLarge { modules, width, .. }) => {
                assert!(modules > 150);
                assert_eq!(width, 150);
            }
            other => panic!("Expected SymbolTooLarge, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dense_symbol_keeps_every_module() {
        let payload = "x".repeat(900);
        let code =
            QrCode::with_error_correction_level(payload.as_bytes(), qrcode::EcLevel::H).unwrap();
        let modules = u32::try_from(code.width()).unwrap();

        let host = SurfaceHost::new();
        let surface = host.create();
        QrCodeRenderer::new()
            .render(surface.writer(), &spec(&payload, 300))
            .unwrap();
        let output = surface.wait_for_output(Duration::from_secs(5)).await.unwrap();
        let img = output.pixels();
        assert_eq!(img.dimensions(), (300, 300));

        // Sampling the centre of each module cell reproduces the symbol.
        let dark = Color::DEFAULT_DARK.to_rgba();
        let colors = code.to_colors();
        for y in 0..modules {
            for x in 0..modules {
                let px = (2 * x + 1) * 300 / (2 * modules);
                let py = (2 * y + 1) * 300 / (2 * modules);
                let expected = colors[(y * modules + x) as usize] == qrcode::Color::Dark;
                assert_eq!(img.get_pixel(px, py).0 == dark, expected, "module ({x}, {y})");
            }
        }
    }

    #[test]
    fn test_zero_size_rejected() {
        let host = SurfaceHost::new();
        let surface = host.create();
        let result = QrCodeRenderer::new().render(surface.writer(), &spec("a", 0));
        assert_eq!(result, Err(RenderError::InvalidDimensions(0, 0)));
    }

    #[test]
    fn test_ec_level_maps_to_encoder() {
        assert_eq!(qrcode::EcLevel::from(EcLevel::default()), qrcode::EcLevel::H);
        assert_eq!(qrcode::EcLevel::from(EcLevel::Low), qrcode::EcLevel::L);
    }
}
