//! Raster task: re-encode images according to `build.image_optimization`.
//!
//! | Strategy   | jpg / png              | gif          |
//! |------------|------------------------|--------------|
//! | `webp`     | lossless WebP          | lossless WebP|
//! | `avif`     | AVIF (ravif)           | AVIF (ravif) |
//! | `compress` | same format, re-encoded| copied       |
//! | `none`     | copied                 | copied       |
//!
//! Animated GIFs keep only their first frame when re-encoded.

use anyhow::{Context, Result, anyhow, bail};
use image::codecs::jpeg::JpegEncoder;
use image::codecs::png::{CompressionType, FilterType, PngEncoder};
use image::codecs::webp::WebPEncoder;
use image::{DynamicImage, ImageFormat};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use super::{blocking, for_each_file, sources};
use crate::builder::TaskOptions;
use crate::config::{BuildConfig, ImageOptions, ImageStrategy, PngLevel, WebpOptions};
use crate::core::{BuildContext, SourceKind, artifact_path};
use crate::{debug, log};

/// The quality warning is printed once per process, not once per rebuild.
static WEBP_QUALITY_WARNED: AtomicBool = AtomicBool::new(false);
use crate::utils::fs::{copy_file, write_file};

pub async fn run(ctx: Arc<BuildContext>, options: TaskOptions) -> Result<()> {
    if ignores_webp_quality(&ctx.config.build) && !WEBP_QUALITY_WARNED.swap(true, Ordering::Relaxed) {
        log!(
            "warning";
            "build.image_options.webp.quality = {} has no effect, WebP output is lossless",
            ctx.config.build.image_options.webp.quality
        );
    }

    let images = sources(&ctx, SourceKind::Raster, &options);
    let count = for_each_file(&ctx, images, build_image).await?;
    debug!(
        "image";
        "processed {} image(s) with strategy {}",
        count,
        ctx.config.build.image_optimization.name()
    );
    Ok(())
}

async fn build_image(ctx: Arc<BuildContext>, source: PathBuf) -> Result<()> {
    let build = &ctx.config.build;
    let strategy = build.image_optimization;
    let output = artifact_path(SourceKind::Raster, &source, &ctx.paths, strategy)
        .ok_or_else(|| anyhow!("image outside source root"))?;

    let format = ImageFormat::from_path(&source)
        .with_context(|| format!("unsupported image {}", source.display()))?;
    if passes_through(strategy, format) {
        return copy_file(&source, &output).await;
    }

    let options = build.image_options.clone();
    let bytes = blocking(move || encode(&source, format, strategy, &options)).await?;
    write_file(&output, bytes).await
}

/// A non-default WebP quality is configured but the encoder is lossless.
fn ignores_webp_quality(build: &BuildConfig) -> bool {
    build.image_optimization == ImageStrategy::Webp
        && build.image_options.webp.quality != WebpOptions::default().quality
}

/// Whether the source is copied verbatim instead of re-encoded.
fn passes_through(strategy: ImageStrategy, format: ImageFormat) -> bool {
    match strategy {
        ImageStrategy::None => true,
        ImageStrategy::Compress => !matches!(format, ImageFormat::Jpeg | ImageFormat::Png),
        ImageStrategy::Webp | ImageStrategy::Avif => false,
    }
}

fn encode(
    source: &Path,
    format: ImageFormat,
    strategy: ImageStrategy,
    options: &ImageOptions,
) -> Result<Vec<u8>> {
    let decoded = image::open(source).with_context(|| format!("failed to decode {}", source.display()))?;
    let mut out = Vec::new();

    match (strategy, format) {
        (ImageStrategy::Webp, _) => {
            DynamicImage::ImageRgba8(decoded.to_rgba8())
                .write_with_encoder(WebPEncoder::new_lossless(&mut out))?;
        }
        (ImageStrategy::Avif, _) => out = encode_avif(&decoded, options)?,
        (ImageStrategy::Compress, ImageFormat::Jpeg) => {
            DynamicImage::ImageRgb8(decoded.to_rgb8())
                .write_with_encoder(JpegEncoder::new_with_quality(&mut out, options.jpeg.quality))?;
        }
        (ImageStrategy::Compress, ImageFormat::Png) => {
            let compression = match options.png.level {
                PngLevel::Fast => CompressionType::Fast,
                PngLevel::Default => CompressionType::Default,
                PngLevel::Best => CompressionType::Best,
            };
            decoded.write_with_encoder(PngEncoder::new_with_quality(
                &mut out,
                compression,
                FilterType::Adaptive,
            ))?;
        }
        (strategy, format) => bail!("cannot encode {format:?} with strategy {}", strategy.name()),
    }
    Ok(out)
}

fn encode_avif(decoded: &DynamicImage, options: &ImageOptions) -> Result<Vec<u8>> {
    let rgba = decoded.to_rgba8();
    let (width, height) = rgba.dimensions();
    let pixels: Vec<ravif::RGBA8> = rgba
        .pixels()
        .map(|p| ravif::RGBA8::new(p[0], p[1], p[2], p[3]))
        .collect();

    let encoded = ravif::Encoder::new()
        .with_quality(options.avif.quality)
        .with_speed(options.avif.speed)
        .encode_rgba(ravif::Img::new(pixels.as_slice(), width as usize, height as usize))
        .map_err(|e| anyhow!("avif encoding failed: {e}"))?;
    Ok(encoded.avif_file)
}
