// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic pixel filters used by the local strategy.
//!
//! Every parameter is a pure function of the item index, so a given base
//! photo always yields the same variation for the same index.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use portrait_core::PortraitError;

/// Edge length of the square every local variation is rendered at.
pub const SQUARE_SIZE: u32 = 400;

/// Blur applied to every fourth item.
pub const BLUR_SIGMA: f32 = 0.3;

/// The modulation tuple repeats every `PARAMETER_PERIOD` items.
pub const PARAMETER_PERIOD: u32 = 30;

/// Filter parameters for one item.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterParams {
    pub saturation: f32,
    pub brightness: f32,
    pub hue_degrees: i32,
    pub blur_sigma: Option<f32>,
    /// Set for items in odd parameter cycles so they never repeat an
    /// earlier item's pixels.
    pub mirror: bool,
}

impl FilterParams {
    pub fn for_index(index: u32) -> Self {
        Self {
            saturation: 1.0 + (index % 5) as f32 * 0.06,
            brightness: 1.0 + (index % 3) as f32 * 0.03,
            hue_degrees: (index % 6) as i32 * 20,
            blur_sigma: (index % 4 == 0).then_some(BLUR_SIGMA),
            mirror: (index / PARAMETER_PERIOD) % 2 == 1,
        }
    }

    /// Human-readable summary stored as the variation label.
    pub fn describe(&self) -> String {
        let mut label = format!(
            "hue +{}deg, saturation x{:.2}, brightness x{:.2}",
            self.hue_degrees, self.saturation, self.brightness
        );
        if let Some(sigma) = self.blur_sigma {
            label.push_str(&format!(", blur {sigma}"));
        }
        if self.mirror {
            label.push_str(", mirrored");
        }
        label
    }
}

/// Decodes `bytes` and cover-crops the result to a `SQUARE_SIZE` square.
pub fn decode_square(bytes: &[u8]) -> Result<RgbaImage, PortraitError> {
    let img = image::load_from_memory(bytes).map_err(|e| {
        PortraitError::InvalidArgument(format!("base image could not be decoded: {e}"))
    })?;
    Ok(img
        .resize_to_fill(SQUARE_SIZE, SQUARE_SIZE, FilterType::Lanczos3)
        .to_rgba8())
}

/// Applies saturation, brightness, hue, blur and mirroring in that order.
pub fn apply(base: &RgbaImage, params: &FilterParams) -> RgbaImage {
    let mut modulated = base.clone();
    for px in modulated.pixels_mut() {
        modulate(px, params.saturation, params.brightness);
    }

    let mut img = DynamicImage::ImageRgba8(modulated);
    if params.hue_degrees != 0 {
        img = img.huerotate(params.hue_degrees);
    }
    if let Some(sigma) = params.blur_sigma {
        img = img.blur(sigma);
    }
    if params.mirror {
        img = img.fliph();
    }
    img.to_rgba8()
}

/// Scales chroma around the pixel's luma, then scales all channels.
fn modulate(px: &mut Rgba<u8>, saturation: f32, brightness: f32) {
    let [r, g, b, a] = px.0;
    let (r, g, b) = (f32::from(r), f32::from(g), f32::from(b));
    let luma = 0.299 * r + 0.587 * g + 0.114 * b;
    let adjust = |c: f32| {
        ((luma + (c - luma) * saturation) * brightness)
            .round()
            .clamp(0.0, 255.0) as u8
    };
    px.0 = [adjust(r), adjust(g), adjust(b), a];
}

/// Encodes an RGBA buffer as an opaque PNG.
pub fn encode_png(img: &RgbaImage) -> Result<Vec<u8>, PortraitError> {
    let rgb = DynamicImage::ImageRgba8(img.clone()).to_rgb8();
    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, ImageFormat::Png)
        .map_err(|e| PortraitError::Internal(format!("PNG encoding failed: {e}")))?;
    Ok(out.into_inner())
}
