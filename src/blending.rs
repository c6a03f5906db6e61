//! Alpha blending math for the tricolor overlay.
//!
//! The overlay is applied via forward alpha blending:
//! `blended = source * (1 - alpha) + overlay * alpha`
//!
//! The overlay's alpha drives the mix; the source's own alpha is ignored.
//! The emblem is composited afterwards with an 8-bit paste-with-mask rule.

use std::ops::Range;

use image::imageops::{self, FilterType};
use image::{Rgb, RgbImage, Rgba, Rgba32FImage, RgbaImage};

use crate::error::{Error, Result};

/// Colour and alpha for the top, middle and bottom bands, in that order.
const BAND_STYLES: [([u8; 3], u8); 3] = [
    ([255, 153, 51], 100),
    ([255, 255, 255], 80),
    ([19, 136, 8], 100),
];

/// A horizontal strip of the overlay with a fixed colour and opacity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayBand {
    /// Rows covered by this band (half-open).
    pub rows: Range<u32>,
    /// RGB colour of the band.
    pub color: [u8; 3],
    /// Opacity of the band, 0-255.
    pub alpha: u8,
}

/// Where the emblem lands on an image: a square of `side` pixels at `(x, y)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    /// Side of the resized emblem square.
    pub side: u32,
    /// Column of the top-left corner.
    pub x: u32,
    /// Row of the top-left corner.
    pub y: u32,
}

/// Split `height` rows into the three band ranges.
///
/// Both cut points derive from the same truncated third, so the bottom band
/// absorbs any remainder: for a height of 5 the ranges are `0..1`, `1..2`
/// and `2..5`.
#[must_use]
pub fn band_rows(height: u32) -> [Range<u32>; 3] {
    let third = height / 3;
    [0..third, third..2 * third, 2 * third..height]
}

/// The three tricolor bands for an image of the given height.
#[must_use]
pub fn tricolor_bands(height: u32) -> [OverlayBand; 3] {
    let [top, middle, bottom] = band_rows(height);
    let band = |rows: Range<u32>, (color, alpha): ([u8; 3], u8)| OverlayBand { rows, color, alpha };
    [
        band(top, BAND_STYLES[0]),
        band(middle, BAND_STYLES[1]),
        band(bottom, BAND_STYLES[2]),
    ]
}

/// Build the RGBA overlay buffer for a `width` x `height` image.
///
/// Pixels start fully transparent black and each band row is filled with the
/// band's colour, carrying the band opacity in the alpha channel.
#[must_use]
pub fn tricolor_overlay(width: u32, height: u32) -> RgbaImage {
    let mut overlay = RgbaImage::new(width, height);
    for band in tricolor_bands(height) {
        let [r, g, b] = band.color;
        let px = Rgba([r, g, b, band.alpha]);
        for y in band.rows {
            for x in 0..width {
                overlay.put_pixel(x, y, px);
            }
        }
    }
    overlay
}

/// Blend one colour channel: `floor(src * (1 - a) + overlay * a)` with
/// `a = alpha / 255`, clamped to `0..=255`.
#[must_use]
pub fn blend_channel(src: u8, overlay: u8, alpha: u8) -> u8 {
    let alpha = f64::from(alpha) / 255.0;
    let inv_alpha = 1.0 - alpha;
    let blended = f64::from(src) * inv_alpha + f64::from(overlay) * alpha;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    {
        blended.floor().clamp(0.0, 255.0) as u8
    }
}

/// Alpha-blend `overlay` onto `source`, returning an opaque RGB image.
///
/// Only the RGB channels are mixed, weighted by the overlay's alpha. Rows are
/// processed in parallel when the `parallel` feature is enabled.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] if the two buffers differ in size.
pub fn alpha_blend(source: &RgbaImage, overlay: &RgbaImage) -> Result<RgbImage> {
    let (width, height) = source.dimensions();
    if overlay.dimensions() != (width, height) {
        return Err(Error::DimensionMismatch {
            width,
            height,
            overlay_width: overlay.width(),
            overlay_height: overlay.height(),
        });
    }

    let mut blended = RgbImage::new(width, height);
    if width == 0 || height == 0 {
        return Ok(blended);
    }

    let src_stride = width as usize * 4;
    let src = source.as_raw();
    let ovl = overlay.as_raw();

    let blend_row = |(y, row): (usize, &mut [u8])| {
        let start = y * src_stride;
        let src_row = &src[start..start + src_stride];
        let ovl_row = &ovl[start..start + src_stride];
        for ((out, s), o) in row
            .chunks_exact_mut(3)
            .zip(src_row.chunks_exact(4))
            .zip(ovl_row.chunks_exact(4))
        {
            for ch in 0..3 {
                out[ch] = blend_channel(s[ch], o[ch], o[3]);
            }
        }
    };

    let dst_stride = width as usize * 3;

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        blended
            .par_chunks_exact_mut(dst_stride)
            .enumerate()
            .for_each(blend_row);
    }

    #[cfg(not(feature = "parallel"))]
    {
        blended
            .chunks_exact_mut(dst_stride)
            .enumerate()
            .for_each(blend_row);
    }

    Ok(blended)
}

/// Compute where the emblem goes on a `width` x `height` image.
///
/// The emblem is a square of side `min(width, height) / 3`, centered.
/// Returns `None` when that side rounds down to zero.
#[must_use]
pub fn emblem_placement(width: u32, height: u32) -> Option<Placement> {
    let side = width.min(height) / 3;
    if side == 0 {
        return None;
    }
    Some(Placement {
        side,
        x: (width - side) / 2,
        y: (height - side) / 2,
    })
}

/// Resize an RGBA image with colour premultiplied by alpha.
///
/// Resampling straight RGBA lets the hidden colour of transparent pixels bleed
/// into partially transparent edges. Colour is scaled by alpha before the
/// filter runs and divided back out afterwards; fully transparent results
/// come back as transparent black.
#[must_use]
pub fn resize_premultiplied(
    image: &RgbaImage,
    width: u32,
    height: u32,
    filter: FilterType,
) -> RgbaImage {
    let premultiplied = Rgba32FImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let alpha = f32::from(a) / 255.0;
        let scale = |c: u8| f32::from(c) / 255.0 * alpha;
        Rgba([scale(r), scale(g), scale(b), alpha])
    });

    let resized = imageops::resize(&premultiplied, width, height, filter);

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let to_u8 = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;

    RgbaImage::from_fn(width, height, |x, y| {
        let [r, g, b, a] = resized.get_pixel(x, y).0;
        let alpha = to_u8(a);
        if alpha == 0 {
            return Rgba([0, 0, 0, 0]);
        }
        let a = a.clamp(0.0, 1.0);
        Rgba([to_u8(r / a), to_u8(g / a), to_u8(b / a), alpha])
    })
}

/// Divide by 255 with rounding, using the shift form for 8-bit compositing.
#[inline]
fn div255(value: u32) -> u8 {
    let tmp = value + 128;
    #[allow(clippy::cast_possible_truncation)]
    {
        (((tmp >> 8) + tmp) >> 8) as u8
    }
}

/// Paste `emblem` onto `dest` at `(pos_x, pos_y)`, using the emblem's alpha
/// channel as the mask.
///
/// Each channel becomes `(dest * (255 - mask) + emblem * mask) / 255`, so
/// transparent emblem pixels leave the destination untouched and partial
/// alpha mixes the two. The paste is clipped to the destination bounds.
pub fn paste_with_mask(dest: &mut RgbImage, emblem: &RgbaImage, pos_x: u32, pos_y: u32) {
    let x2 = pos_x.saturating_add(emblem.width()).min(dest.width());
    let y2 = pos_y.saturating_add(emblem.height()).min(dest.height());

    if pos_x >= x2 || pos_y >= y2 {
        return;
    }

    for dy in 0..(y2 - pos_y) {
        for dx in 0..(x2 - pos_x) {
            let src = emblem.get_pixel(dx, dy);
            let mask = u32::from(src[3]);
            if mask == 0 {
                continue;
            }

            let px = dest.get_pixel_mut(pos_x + dx, pos_y + dy);
            let Rgb(channels) = *px;
            let mut out = [0u8; 3];
            for ch in 0..3 {
                let dst = u32::from(channels[ch]);
                out[ch] = div255(dst * (255 - mask) + u32::from(src[ch]) * mask);
            }
            *px = Rgb(out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_rows_partition_every_height() {
        for height in 1..=500u32 {
            let [top, middle, bottom] = band_rows(height);
            assert_eq!(top.start, 0);
            assert_eq!(top.end, middle.start, "gap/overlap at height {height}");
            assert_eq!(middle.end, bottom.start, "gap/overlap at height {height}");
            assert_eq!(bottom.end, height);
            assert_eq!(middle.end, 2 * (height / 3));
        }
    }

    #[test]
    fn band_rows_use_truncated_third_for_both_cuts() {
        // 2 * 5 / 3 would give 3; the second cut must come from the truncated third.
        assert_eq!(band_rows(5), [0..1, 1..2, 2..5]);
        assert_eq!(band_rows(10), [0..3, 3..6, 6..10]);
        assert_eq!(band_rows(2), [0..0, 0..0, 0..2]);
    }

    #[test]
    fn tricolor_bands_carry_fixed_colours() {
        let bands = tricolor_bands(9);
        assert_eq!(bands[0].color, [255, 153, 51]);
        assert_eq!(bands[0].alpha, 100);
        assert_eq!(bands[1].color, [255, 255, 255]);
        assert_eq!(bands[1].alpha, 80);
        assert_eq!(bands[2].color, [19, 136, 8]);
        assert_eq!(bands[2].alpha, 100);
        assert_eq!(bands[2].rows, 6..9);
    }

    #[test]
    fn overlay_rows_match_bands() {
        let overlay = tricolor_overlay(4, 7);
        assert_eq!(overlay.dimensions(), (4, 7));
        assert_eq!(*overlay.get_pixel(3, 0), Rgba([255, 153, 51, 100]));
        assert_eq!(*overlay.get_pixel(0, 2), Rgba([255, 255, 255, 80]));
        assert_eq!(*overlay.get_pixel(0, 3), Rgba([255, 255, 255, 80]));
        assert_eq!(*overlay.get_pixel(2, 4), Rgba([19, 136, 8, 100]));
        assert_eq!(*overlay.get_pixel(2, 6), Rgba([19, 136, 8, 100]));
    }

    #[test]
    fn blend_channel_extremes() {
        assert_eq!(blend_channel(200, 100, 0), 200);
        assert_eq!(blend_channel(200, 100, 255), 100);
        assert_eq!(blend_channel(0, 0, 100), 0);
    }

    #[test]
    fn blend_channel_truncates() {
        // 10 * (1 - 0.5019..) + 0 = 4.98..
        assert_eq!(blend_channel(10, 0, 128), 4);
    }

    #[test]
    fn blend_channel_stays_between_inputs() {
        for alpha in [0u8, 1, 80, 100, 128, 254, 255] {
            for src in 0..=255u8 {
                for overlay in [0u8, 8, 51, 136, 153, 255] {
                    let out = blend_channel(src, overlay, alpha);
                    let lo = src.min(overlay).saturating_sub(1);
                    let hi = src.max(overlay);
                    assert!(
                        (lo..=hi).contains(&out),
                        "src={src} overlay={overlay} alpha={alpha} -> {out}"
                    );
                }
            }
        }
    }

    #[test]
    fn alpha_blend_ignores_source_alpha() {
        let opaque = RgbaImage::from_pixel(3, 3, Rgba([40, 90, 160, 255]));
        let transparent = RgbaImage::from_pixel(3, 3, Rgba([40, 90, 160, 0]));
        let overlay = tricolor_overlay(3, 3);
        assert_eq!(
            alpha_blend(&opaque, &overlay).unwrap(),
            alpha_blend(&transparent, &overlay).unwrap()
        );
    }

    #[test]
    fn alpha_blend_applies_band_per_row() {
        let source = RgbaImage::from_pixel(2, 3, Rgba([40, 90, 160, 255]));
        let blended = alpha_blend(&source, &tricolor_overlay(2, 3)).unwrap();
        let expected = |color: [u8; 3], alpha: u8| {
            Rgb([
                blend_channel(40, color[0], alpha),
                blend_channel(90, color[1], alpha),
                blend_channel(160, color[2], alpha),
            ])
        };
        assert_eq!(*blended.get_pixel(1, 0), expected([255, 153, 51], 100));
        assert_eq!(*blended.get_pixel(1, 1), expected([255, 255, 255], 80));
        assert_eq!(*blended.get_pixel(0, 2), expected([19, 136, 8], 100));
    }

    #[test]
    fn alpha_blend_rejects_mismatched_overlay() {
        let source = RgbaImage::new(4, 4);
        let overlay = tricolor_overlay(4, 5);
        let err = alpha_blend(&source, &overlay).unwrap_err();
        assert!(matches!(err, Error::DimensionMismatch { .. }));
    }

    #[test]
    fn reapplying_overlay_changes_the_image() {
        let source = RgbaImage::from_pixel(6, 6, Rgba([30, 60, 200, 255]));
        let overlay = tricolor_overlay(6, 6);
        let once = alpha_blend(&source, &overlay).unwrap();
        let once_rgba = image::DynamicImage::ImageRgb8(once.clone()).to_rgba8();
        let twice = alpha_blend(&once_rgba, &overlay).unwrap();
        assert_ne!(once, twice);
    }

    #[test]
    fn placement_centers_a_third_of_the_short_side() {
        assert_eq!(
            emblem_placement(300, 300),
            Some(Placement { side: 100, x: 100, y: 100 })
        );
        assert_eq!(
            emblem_placement(640, 480),
            Some(Placement { side: 160, x: 240, y: 160 })
        );
        assert_eq!(emblem_placement(2, 100), None);
    }

    #[test]
    fn premultiplied_resize_keeps_transparent_colour_out() {
        let emblem = RgbaImage::from_fn(60, 60, |x, _| {
            if x < 30 {
                Rgba([255, 0, 0, 0])
            } else {
                Rgba([0, 0, 255, 255])
            }
        });

        let resized = resize_premultiplied(&emblem, 20, 20, FilterType::Lanczos3);
        assert_eq!(resized.dimensions(), (20, 20));
        for (x, y, px) in resized.enumerate_pixels() {
            assert_eq!(px[0], 0, "red leaked at ({x},{y}): {px:?}");
        }
        // Opaque interior stays blue, transparent interior stays transparent.
        assert_eq!(*resized.get_pixel(18, 10), Rgba([0, 0, 255, 255]));
        assert_eq!(resized.get_pixel(1, 10)[3], 0);
    }

    #[test]
    fn premultiplied_resize_of_uniform_image_is_uniform() {
        let emblem = RgbaImage::from_pixel(9, 9, Rgba([40, 80, 120, 255]));
        let resized = resize_premultiplied(&emblem, 4, 4, FilterType::Lanczos3);
        assert!(resized.pixels().all(|px| *px == Rgba([40, 80, 120, 255])));
    }

    #[test]
    fn paste_respects_mask() {
        let mut dest = RgbImage::from_pixel(3, 1, Rgb([0, 0, 0]));
        let mut emblem = RgbaImage::new(3, 1);
        emblem.put_pixel(0, 0, Rgba([255, 255, 255, 0]));
        emblem.put_pixel(1, 0, Rgba([255, 255, 255, 255]));
        emblem.put_pixel(2, 0, Rgba([255, 255, 255, 128]));

        paste_with_mask(&mut dest, &emblem, 0, 0);

        assert_eq!(*dest.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*dest.get_pixel(1, 0), Rgb([255, 255, 255]));
        assert_eq!(*dest.get_pixel(2, 0), Rgb([128, 128, 128]));
    }

    #[test]
    fn paste_is_clipped_to_destination() {
        let mut dest = RgbImage::new(4, 4);
        let emblem = RgbaImage::from_pixel(3, 3, Rgba([9, 9, 9, 255]));

        paste_with_mask(&mut dest, &emblem, 2, 2);
        assert_eq!(*dest.get_pixel(3, 3), Rgb([9, 9, 9]));
        assert_eq!(*dest.get_pixel(1, 1), Rgb([0, 0, 0]));

        paste_with_mask(&mut dest, &emblem, 10, 10);
    }
}
