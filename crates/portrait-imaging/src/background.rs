// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background replacement: cut the subject out of the base photo and
//! composite it onto one of ten gradient backdrops.
//!
//! Subject extraction prefers an external segmentation command when one is
//! configured and runs successfully. Otherwise near-white pixels are made
//! transparent, with a linear feather so edges do not look cut out.

use std::path::Path;

use image::{Rgba, RgbaImage};
use tracing::{debug, warn};

/// Channels at or above this value are fully transparent.
pub const WHITE_THRESHOLD: u8 = 235;

/// Channels between this value and `WHITE_THRESHOLD` fade out linearly.
pub const FEATHER_START: u8 = 215;

/// A vertical two-stop gradient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Gradient {
    pub name: &'static str,
    pub top: [u8; 3],
    pub bottom: [u8; 3],
}

/// Backdrops selected by `index % 10`.
pub const PALETTE: [Gradient; 10] = [
    Gradient {
        name: "ocean",
        top: [28, 98, 168],
        bottom: [12, 44, 92],
    },
    Gradient {
        name: "sunset",
        top: [250, 150, 90],
        bottom: [190, 70, 100],
    },
    Gradient {
        name: "forest",
        top: [70, 140, 90],
        bottom: [24, 70, 44],
    },
    Gradient {
        name: "slate",
        top: [120, 130, 145],
        bottom: [52, 58, 70],
    },
    Gradient {
        name: "lavender",
        top: [190, 170, 230],
        bottom: [110, 90, 170],
    },
    Gradient {
        name: "sand",
        top: [236, 214, 170],
        bottom: [190, 150, 100],
    },
    Gradient {
        name: "teal",
        top: [60, 180, 170],
        bottom: [20, 90, 100],
    },
    Gradient {
        name: "charcoal",
        top: [80, 80, 84],
        bottom: [28, 28, 32],
    },
    Gradient {
        name: "rose",
        top: [240, 170, 180],
        bottom: [170, 80, 110],
    },
    Gradient {
        name: "sky",
        top: [150, 200, 245],
        bottom: [70, 130, 200],
    },
];

pub fn gradient_for(index: u32) -> &'static Gradient {
    &PALETTE[index as usize % PALETTE.len()]
}

/// Renders `gradient` as an opaque `width` x `height` image.
pub fn render_gradient(gradient: &Gradient, width: u32, height: u32) -> RgbaImage {
    let span = height.saturating_sub(1).max(1) as f32;
    RgbaImage::from_fn(width, height, |_, y| {
        let t = y as f32 / span;
        let mix = |a: u8, b: u8| (f32::from(a) + (f32::from(b) - f32::from(a)) * t).round() as u8;
        Rgba([
            mix(gradient.top[0], gradient.bottom[0]),
            mix(gradient.top[1], gradient.bottom[1]),
            mix(gradient.top[2], gradient.bottom[2]),
            255,
        ])
    })
}

/// Makes near-white pixels transparent, feathering the ramp below the threshold.
pub fn threshold_background(img: &mut RgbaImage) {
    let ramp = f32::from(WHITE_THRESHOLD - FEATHER_START);
    for px in img.pixels_mut() {
        let floor = px.0[0].min(px.0[1]).min(px.0[2]);
        let alpha = if floor >= WHITE_THRESHOLD {
            0
        } else if floor >= FEATHER_START {
            (255.0 * f32::from(WHITE_THRESHOLD - floor) / ramp).round() as u8
        } else {
            255
        };
        px.0[3] = px.0[3].min(alpha);
    }
}

/// Alpha-blends `subject` over `backdrop`; both must share dimensions.
pub fn composite(subject: &RgbaImage, backdrop: &RgbaImage) -> RgbaImage {
    let mut out = backdrop.clone();
    for (dst, src) in out.pixels_mut().zip(subject.pixels()) {
        let a = f32::from(src.0[3]) / 255.0;
        for c in 0..3 {
            dst.0[c] = (f32::from(src.0[c]) * a + f32::from(dst.0[c]) * (1.0 - a)).round() as u8;
        }
        dst.0[3] = 255;
    }
    out
}

/// Extracts the photo subject so it can be placed on a new backdrop.
#[derive(Debug, Clone, Default)]
pub struct BackgroundReplacer {
    segmentation_tool: Option<String>,
}

impl BackgroundReplacer {
    pub fn new(segmentation_tool: Option<String>) -> Self {
        Self {
            segmentation_tool: segmentation_tool.filter(|t| !t.trim().is_empty()),
        }
    }

    /// Returns `square` with its background made transparent.
    ///
    /// Never fails: a missing or failing segmentation command falls back to
    /// thresholding.
    pub async fn extract_subject(&self, square: RgbaImage) -> RgbaImage {
        if let Some(tool) = &self.segmentation_tool {
            match segment_with_tool(tool, &square).await {
                Ok(cutout) => return cutout,
                Err(e) => warn!(tool = %tool, error = %e, "segmentation tool failed, using threshold"),
            }
        }
        let mut cutout = square;
        threshold_background(&mut cutout);
        cutout
    }

    /// Places `subject` on the gradient for item `index`.
    pub fn place(&self, subject: &RgbaImage, index: u32) -> RgbaImage {
        let backdrop = render_gradient(gradient_for(index), subject.width(), subject.height());
        composite(subject, &backdrop)
    }
}

/// Runs `<tool> i <input> <output>` and reads back the PNG it wrote.
async fn segment_with_tool(tool: &str, square: &RgbaImage) -> Result<RgbaImage, String> {
    let dir = tempfile::tempdir().map_err(|e| format!("temp dir: {e}"))?;
    let input = dir.path().join("input.png");
    let output = dir.path().join("output.png");

    square
        .save_with_format(&input, image::ImageFormat::Png)
        .map_err(|e| format!("write input: {e}"))?;

    let status = tokio::process::Command::new(tool)
        .arg("i")
        .arg(&input)
        .arg(&output)
        .kill_on_drop(true)
        .status()
        .await
        .map_err(|e| format!("spawn: {e}"))?;
    if !status.success() {
        return Err(format!("exited with {status}"));
    }

    let cutout = read_cutout(&output).await?;
    debug!(tool = %tool, "subject extracted by segmentation tool");
    if cutout.dimensions() != square.dimensions() {
        let (w, h) = square.dimensions();
        return Ok(image::imageops::resize(&cutout, w, h, image::imageops::FilterType::Triangle));
    }
    Ok(cutout)
}

async fn read_cutout(path: &Path) -> Result<RgbaImage, String> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| format!("read output: {e}"))?;
    image::load_from_memory(&bytes)
        .map(|img| img.to_rgba8())
        .map_err(|e| format!("decode output: {e}"))
}
