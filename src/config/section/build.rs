//! `[build]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [build]
//! image_optimization = "webp"   # webp | avif | compress | none
//!
//! [build.image_options.webp]
//! quality = 90
//!
//! [build.image_options.jpeg]
//! quality = 75
//! ```

use serde::{Deserialize, Serialize};

/// Build settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// How raster images are encoded into the output tree.
    pub image_optimization: ImageStrategy,

    /// Per-encoder options.
    pub image_options: ImageOptions,
}

/// Raster image encoding strategy.
///
/// The strategy decides the artifact extension of every raster source,
/// so it takes part in output path derivation (including deletion).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageStrategy {
    /// Re-encode every raster as WebP.
    #[default]
    Webp,
    /// Re-encode every raster as AVIF.
    Avif,
    /// Re-encode in the original format with configured quality.
    Compress,
    /// Copy rasters verbatim.
    None,
}

impl ImageStrategy {
    /// Extension the re-encoded artifact carries, or `None` to keep the source's.
    pub const fn target_extension(self) -> Option<&'static str> {
        match self {
            Self::Webp => Some("webp"),
            Self::Avif => Some("avif"),
            Self::Compress | Self::None => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Webp => "webp",
            Self::Avif => "avif",
            Self::Compress => "compress",
            Self::None => "none",
        }
    }
}

/// Encoder options, one table per output format.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImageOptions {
    pub webp: WebpOptions,
    pub avif: AvifOptions,
    pub jpeg: JpegOptions,
    pub png: PngOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebpOptions {
    /// Quality, 0-100. The bundled WebP encoder is lossless, so a
    /// non-default value only earns a warning.
    pub quality: u8,
}

impl Default for WebpOptions {
    fn default() -> Self {
        Self { quality: 90 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AvifOptions {
    /// Quality, 0-100.
    pub quality: f32,
    /// Encoder speed, 1 (slowest) to 10 (fastest).
    pub speed: u8,
}

impl Default for AvifOptions {
    fn default() -> Self {
        Self {
            quality: 80.0,
            speed: 6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JpegOptions {
    /// Quality, 1-100.
    pub quality: u8,
}

impl Default for JpegOptions {
    fn default() -> Self {
        Self { quality: 75 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PngOptions {
    pub level: PngLevel,
}

/// PNG compression level.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PngLevel {
    Fast,
    #[default]
    Default,
    Best,
}
