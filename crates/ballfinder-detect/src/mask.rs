//! Shared early stages: color mask, morphological open, median blur.

use ballfinder_core::{Hsv, PixelBuffer};
use image::imageops::rotate180;
use image::{GrayImage, Luma, RgbImage};
use imageproc::morphology::{grayscale_dilate, grayscale_erode, grayscale_open, Mask};

use crate::params::{ColorParams, HsvRange, KernelShape, MorphologyParams};

/// Binary mask (0 / 255) of pixels inside any of `ranges`.
pub fn color_mask(hsv: &RgbImage, ranges: &[HsvRange]) -> GrayImage {
    let mut out = GrayImage::new(hsv.width(), hsv.height());
    for (dst, src) in out.pixels_mut().zip(hsv.pixels()) {
        let [h, s, v] = src.0;
        let px = Hsv::new(h, s, v);
        if ranges.iter().any(|r| r.contains(px)) {
            *dst = Luma([255]);
        }
    }
    out
}

/// Stage A for any pixel buffer.
///
/// A 1-channel buffer is taken as an already computed mask; any non-zero
/// pixel counts as in range.
pub fn mask_for_buffer(pixels: &PixelBuffer, color: &ColorParams) -> GrayImage {
    match pixels {
        PixelBuffer::Color(hsv) => color_mask(hsv, &color.active_ranges()),
        PixelBuffer::Mask(mask) => {
            let mut out = mask.clone();
            for p in out.pixels_mut() {
                if p.0[0] != 0 {
                    p.0[0] = 255;
                }
            }
            out
        }
    }
}

/// Largest element side [`Mask::from_image`] can anchor with a `u8` center.
const MAX_ELEMENT_SIZE: u32 = u8::MAX as u32;

/// Structuring element as a list of `(dx, dy)` offsets relative to the anchor,
/// plus the matching `imageproc` masks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructuringElement {
    size: u32,
    shape: KernelShape,
    offsets: Vec<(i32, i32)>,
    forward: Mask,
    reflected: Mask,
}

impl StructuringElement {
    /// `size x size` element anchored at `(size / 2, size / 2)`.
    ///
    /// The elliptical shape is the ellipse inscribed in the square, rasterized
    /// row by row.
    pub fn new(size: u32, shape: KernelShape) -> Self {
        let k = size.clamp(1, MAX_ELEMENT_SIZE) as i32;
        let anchor = k / 2;
        let mut offsets = Vec::with_capacity((k * k) as usize);
        match shape {
            KernelShape::Square => {
                for row in 0..k {
                    for col in 0..k {
                        offsets.push((col - anchor, row - anchor));
                    }
                }
            }
            KernelShape::Ellipse => {
                let r = (k / 2) as f32;
                for row in 0..k {
                    let dy = (row - anchor) as f32;
                    if dy.abs() > r {
                        continue;
                    }
                    let half = if r > 0.0 {
                        (r * r - dy * dy).max(0.0).sqrt().round() as i32
                    } else {
                        0
                    };
                    let first = (anchor - half).max(0);
                    let last = (anchor + half).min(k - 1);
                    for col in first..=last {
                        offsets.push((col - anchor, row - anchor));
                    }
                }
            }
        }

        let mut footprint = GrayImage::new(k as u32, k as u32);
        for &(dx, dy) in &offsets {
            footprint.put_pixel((dx + anchor) as u32, (dy + anchor) as u32, Luma([255]));
        }
        // even sizes are not centered, so the reflection moves the anchor
        let forward = Mask::from_image(&footprint, anchor as u8, anchor as u8);
        let mirrored = (k - 1 - anchor) as u8;
        let reflected = Mask::from_image(&rotate180(&footprint), mirrored, mirrored);

        Self {
            size: k as u32,
            shape,
            offsets,
            forward,
            reflected,
        }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn shape(&self) -> KernelShape {
        self.shape
    }

    pub fn offsets(&self) -> &[(i32, i32)] {
        &self.offsets
    }

    /// Mask with the element's own offsets.
    pub fn mask(&self) -> &Mask {
        &self.forward
    }
}

/// Minimum over the element placed at each pixel; pixels outside the image
/// are ignored.
pub fn erode(mask: &GrayImage, se: &StructuringElement) -> GrayImage {
    grayscale_erode(mask, &se.forward)
}

/// Dilation by the reflected element, so that `dilate(erode(m))` never grows `m`.
pub fn dilate(mask: &GrayImage, se: &StructuringElement) -> GrayImage {
    grayscale_dilate(mask, &se.reflected)
}

/// Stage B: erosion followed by dilation.
pub fn open(mask: &GrayImage, params: &MorphologyParams) -> GrayImage {
    let se = StructuringElement::new(params.kernel_size, params.kernel_shape);
    if se.forward == se.reflected {
        return grayscale_open(mask, &se.forward);
    }
    dilate(&erode(mask, &se), &se)
}

/// Stage C: median blur with an odd square aperture.
pub fn median_blur(mask: &GrayImage, kernel: u32) -> GrayImage {
    let radius = kernel / 2;
    imageproc::filter::median_filter(mask, radius, radius)
}
