//! Pixel-buffer conversions and the linear/non-linear filters the masks and
//! effects are built from.
//!
//! Working images are `Array3<f32>` shaped `(height, width, 3)` in R, G, B
//! order with values on the 0..=255 scale. Gaussian blurs run through
//! `imageproc` and replicate the edge pixel; the bilateral filter reflects
//! without repeating it.

use image::{ImageBuffer, Luma, Rgb, RgbImage};
use imageproc::definitions::Image;
use imageproc::filter::separable_filter_equal;
use ndarray::{Array2, Array3, ArrayView2};

/// Converts an 8-bit RGB image into a float working buffer.
pub fn to_array(image: &RgbImage) -> Array3<f32> {
    let (w, h) = image.dimensions();
    Array3::from_shape_fn((h as usize, w as usize, 3), |(y, x, c)| {
        image.get_pixel(x as u32, y as u32)[c] as f32
    })
}

/// Converts a float working buffer back to 8-bit, clamping and rounding.
pub fn to_image(array: &Array3<f32>) -> RgbImage {
    let (h, w, _) = array.dim();
    RgbImage::from_fn(w as u32, h as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        Rgb([
            to_u8(array[[y, x, 0]]),
            to_u8(array[[y, x, 1]]),
            to_u8(array[[y, x, 2]]),
        ])
    })
}

#[inline]
pub fn to_u8(v: f32) -> u8 {
    v.round().clamp(0.0, 255.0) as u8
}

#[inline]
fn reflect101(i: isize, n: usize) -> usize {
    if n == 1 {
        return 0;
    }
    let period = 2 * (n as isize - 1);
    let mut i = i.rem_euclid(period);
    if i >= n as isize {
        i = period - i;
    }
    i as usize
}

/// Normalized 1D Gaussian kernel of odd size `ksize`.
///
/// Sigma is derived from the size as `0.3 * ((ksize - 1) / 2 - 1) + 0.8`.
pub fn gaussian_kernel(ksize: usize) -> Vec<f32> {
    if ksize <= 1 {
        return vec![1.0];
    }
    let sigma = 0.3 * ((ksize as f64 - 1.0) * 0.5 - 1.0) + 0.8;
    let half = (ksize / 2) as f64;
    let raw: Vec<f64> = (0..ksize)
        .map(|i| {
            let d = i as f64 - half;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();
    let sum: f64 = raw.iter().sum();
    raw.iter().map(|v| (v / sum) as f32).collect()
}

/// Separable Gaussian blur of a single-channel buffer.
pub fn gaussian_blur(src: ArrayView2<f32>, ksize: usize) -> Array2<f32> {
    let kernel = gaussian_kernel(ksize);
    if kernel.len() == 1 {
        return src.to_owned();
    }
    let (h, w) = src.dim();
    let image: Image<Luma<f32>> =
        ImageBuffer::from_fn(w as u32, h as u32, |x, y| Luma([src[[y as usize, x as usize]]]));
    let blurred = separable_filter_equal(&image, &kernel);
    Array2::from_shape_fn((h, w), |(y, x)| blurred.get_pixel(x as u32, y as u32)[0])
}

/// Gaussian blur applied to every channel independently.
pub fn gaussian_blur_rgb(src: &Array3<f32>, ksize: usize) -> Array3<f32> {
    let kernel = gaussian_kernel(ksize);
    if kernel.len() == 1 {
        return src.clone();
    }
    let (h, w, _) = src.dim();
    let image: Image<Rgb<f32>> = ImageBuffer::from_fn(w as u32, h as u32, |x, y| {
        let (x, y) = (x as usize, y as usize);
        Rgb([src[[y, x, 0]], src[[y, x, 1]], src[[y, x, 2]]])
    });
    let blurred = separable_filter_equal(&image, &kernel);
    Array3::from_shape_fn((h, w, 3), |(y, x, c)| {
        blurred.get_pixel(x as u32, y as u32)[c]
    })
}

/// Edge-preserving bilateral filter over a circular window of `diameter`.
///
/// Colour distance is the sum of absolute channel differences, so all three
/// channels share one weight per neighbour; `imageproc`'s bilateral filter
/// only takes a `GrayImage`. Only pixels where `region > 0` are filtered,
/// all others are copied through.
pub fn bilateral_filter(
    src: &Array3<f32>,
    region: ArrayView2<f32>,
    diameter: usize,
    sigma_color: f32,
    sigma_space: f32,
) -> Array3<f32> {
    let (h, w, channels) = src.dim();
    let radius = (diameter / 2) as isize;
    let color_coeff = -0.5 / (sigma_color * sigma_color);
    let space_coeff = -0.5 / (sigma_space * sigma_space);

    let mut offsets = Vec::new();
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let r2 = (dx * dx + dy * dy) as f32;
            if r2.sqrt() > radius as f32 {
                continue;
            }
            offsets.push((dy, dx, (r2 * space_coeff).exp()));
        }
    }

    let mut out = src.clone();
    for y in 0..h {
        for x in 0..w {
            if region[[y, x]] <= 0.0 {
                continue;
            }
            let mut acc = [0.0f32; 3];
            let mut norm = 0.0f32;
            for &(dy, dx, space_weight) in &offsets {
                let sy = reflect101(y as isize + dy, h);
                let sx = reflect101(x as isize + dx, w);
                let mut dist = 0.0;
                for c in 0..channels {
                    dist += (src[[sy, sx, c]] - src[[y, x, c]]).abs();
                }
                let weight = space_weight * (dist * dist * color_coeff).exp();
                for (c, a) in acc.iter_mut().enumerate().take(channels) {
                    *a += src[[sy, sx, c]] * weight;
                }
                norm += weight;
            }
            for (c, a) in acc.iter().enumerate().take(channels) {
                out[[y, x, c]] = a / norm;
            }
        }
    }
    out
}

/// RGB (0..=255) to HSV with hue in degrees, saturation in [0, 1] and value
/// on the 0..=255 scale.
pub fn rgb_to_hsv(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;
    let s = if max > 0.0 { delta / max } else { 0.0 };
    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        60.0 * ((g - b) / delta)
    } else if max == g {
        60.0 * ((b - r) / delta) + 120.0
    } else {
        60.0 * ((r - g) / delta) + 240.0
    };
    (h.rem_euclid(360.0), s, max)
}

pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    if s <= 0.0 {
        return (v, v, v);
    }
    let h = h.rem_euclid(360.0) / 60.0;
    let sector = h.floor();
    let f = h - sector;
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));
    match sector as i32 {
        0 => (v, t, p),
        1 => (q, v, p),
        2 => (p, v, t),
        3 => (p, q, v),
        4 => (t, p, v),
        _ => (v, p, q),
    }
}
