// SPDX-FileCopyrightText: 2026 Portrait Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::io::Cursor;

use image::{ImageFormat, Rgb, RgbImage};

/// Encodes a small gradient PNG. Distinct sizes give distinct bytes.
pub fn sample_png(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([
            (x * 255 / width.max(1)) as u8,
            (y * 255 / height.max(1)) as u8,
            128,
        ])
    });
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png)
        .expect("encoding an in-memory PNG cannot fail");
    out.into_inner()
}
