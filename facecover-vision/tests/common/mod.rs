#![allow(dead_code)]

use std::f32::consts::PI;

use facecover_vision::{Landmarks, Point};
use image::{Rgb, RgbImage};

pub const SKIN: [u8; 3] = [200, 160, 140];

/// A synthetic 68-point face centred on `(cx, cy)` with half-width `s`.
pub fn synthetic_landmarks(cx: f32, cy: f32, s: f32) -> Landmarks {
    let mut pts = Vec::with_capacity(68);

    // Jaw: U shape from the right ear (viewer's left) down to the chin.
    for i in 0..17 {
        let t = i as f32 / 16.0;
        pts.push(Point::new(
            cx - 0.9 * s + 1.8 * s * t,
            cy - 0.1 * s + 0.9 * s * (PI * t).sin(),
        ));
    }
    // Brows.
    for i in 0..5 {
        let t = i as f32 / 4.0;
        let arch = 0.06 * s * (PI * t).sin();
        pts.push(Point::new(cx - 0.75 * s + 0.6 * s * t, cy - 0.45 * s - arch));
    }
    for i in 0..5 {
        let t = i as f32 / 4.0;
        let arch = 0.06 * s * (PI * t).sin();
        pts.push(Point::new(cx + 0.15 * s + 0.6 * s * t, cy - 0.45 * s - arch));
    }
    // Nose bridge and base.
    for i in 0..4 {
        pts.push(Point::new(cx, cy - 0.35 * s + 0.13 * s * i as f32));
    }
    for i in 0..5 {
        pts.push(Point::new(cx - 0.15 * s + 0.075 * s * i as f32, cy + 0.15 * s));
    }
    // Eyes.
    for center in [cx - 0.4 * s, cx + 0.4 * s] {
        for i in 0..6 {
            let a = PI + 2.0 * PI * i as f32 / 6.0;
            pts.push(Point::new(
                center + 0.14 * s * a.cos(),
                cy - 0.25 * s + 0.06 * s * a.sin(),
            ));
        }
    }
    // Outer and inner lips.
    for i in 0..12 {
        let a = PI + 2.0 * PI * i as f32 / 12.0;
        pts.push(Point::new(cx + 0.3 * s * a.cos(), cy + 0.45 * s + 0.12 * s * a.sin()));
    }
    for i in 0..8 {
        let a = PI + 2.0 * PI * i as f32 / 8.0;
        pts.push(Point::new(cx + 0.18 * s * a.cos(), cy + 0.45 * s + 0.05 * s * a.sin()));
    }

    Landmarks::new(pts).expect("synthetic face has 68 points")
}

/// Paints a rough face for `landmarks`: textured skin over an ellipse, dark
/// eyes and a red mouth on a grey background.
pub fn synthetic_face(width: u32, height: u32, cx: f32, cy: f32, s: f32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        let (fx, fy) = (x as f32, y as f32);
        let texture = ((x * 7 + y * 13) % 11) as u8;
        let inside = |ex: f32, ey: f32, rx: f32, ry: f32| {
            let dx = (fx - ex) / rx;
            let dy = (fy - ey) / ry;
            dx * dx + dy * dy <= 1.0
        };
        if inside(cx - 0.4 * s, cy - 0.25 * s, 0.14 * s, 0.06 * s)
            || inside(cx + 0.4 * s, cy - 0.25 * s, 0.14 * s, 0.06 * s)
        {
            Rgb([40 + texture, 35, 30])
        } else if inside(cx, cy + 0.45 * s, 0.3 * s, 0.12 * s) {
            Rgb([170 + texture, 60, 70])
        } else if inside(cx, cy - 0.05 * s, 0.95 * s, 1.1 * s) {
            Rgb([SKIN[0] - texture, SKIN[1] - texture, SKIN[2] + texture])
        } else {
            Rgb([60, 60 + texture, 70])
        }
    })
}

pub fn max_abs_diff(a: &RgbImage, b: &RgbImage) -> u8 {
    a.as_raw()
        .iter()
        .zip(b.as_raw())
        .map(|(x, y)| x.abs_diff(*y))
        .max()
        .unwrap_or(0)
}
