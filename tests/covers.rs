use std::path::{Path, PathBuf};

use anyhow::Result;
use facecover::config::{Config, CoverSettings, TemplateAsset, Theme};
use facecover::covers::{generate_covers, CoverOutcome};
use facecover::{Landmarks, Point, StaticLandmarks};
use image::{Rgb, RgbImage};

/// Face-like 68-point layout scaled by `s` around `(cx, cy)`.
fn landmarks(cx: f32, cy: f32, s: f32) -> Landmarks {
    let ring = |ex: f32, ey: f32, rx: f32, ry: f32, n: usize| -> Vec<Point> {
        (0..n)
            .map(|i| {
                let a = std::f32::consts::PI * (1.0 + 2.0 * i as f32 / n as f32);
                Point::new(cx + s * (ex + rx * a.cos()), cy + s * (ey + ry * a.sin()))
            })
            .collect()
    };
    let mut pts = Vec::with_capacity(68);
    for i in 0..17 {
        let t = i as f32 / 16.0;
        let y = -0.1 + 0.9 * (std::f32::consts::PI * t).sin();
        pts.push(Point::new(cx + s * (-0.9 + 1.8 * t), cy + s * y));
    }
    for start in [-0.75, 0.15] {
        for i in 0..5 {
            pts.push(Point::new(cx + s * (start + 0.15 * i as f32), cy - 0.45 * s));
        }
    }
    for i in 0..4 {
        pts.push(Point::new(cx, cy + s * (-0.35 + 0.13 * i as f32)));
    }
    for i in 0..5 {
        pts.push(Point::new(cx + s * (-0.15 + 0.075 * i as f32), cy + 0.15 * s));
    }
    pts.extend(ring(-0.4, -0.25, 0.14, 0.06, 6));
    pts.extend(ring(0.4, -0.25, 0.14, 0.06, 6));
    pts.extend(ring(0.0, 0.45, 0.3, 0.12, 12));
    pts.extend(ring(0.0, 0.45, 0.18, 0.05, 8));
    Landmarks::new(pts).unwrap()
}

fn face_image(w: u32, h: u32, cx: f32, cy: f32, s: f32) -> RgbImage {
    RgbImage::from_fn(w, h, |x, y| {
        let dx = (x as f32 - cx) / (0.95 * s);
        let dy = (y as f32 - cy) / (1.1 * s);
        if dx * dx + dy * dy <= 1.0 {
            Rgb([200, 160, 140])
        } else {
            Rgb([60, 60, 70])
        }
    })
}

struct Fixture {
    dir: PathBuf,
    user_image: PathBuf,
    user_landmarks: PathBuf,
    config: Config,
}

impl Fixture {
    fn new(name: &str) -> Result<Self> {
        let dir = std::env::temp_dir().join(format!("facecover-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir)?;

        let user_image = dir.join("user.png");
        let user_landmarks = dir.join("user.json");
        face_image(120, 120, 60.0, 60.0, 35.0).save(&user_image)?;
        std::fs::write(
            &user_landmarks,
            StaticLandmarks::single(landmarks(60.0, 60.0, 35.0)).to_json_string()?,
        )?;

        let good = TemplateAsset {
            image: dir.join("t1.png"),
            landmarks: dir.join("t1.json"),
        };
        face_image(160, 180, 80.0, 90.0, 50.0).save(&good.image)?;
        std::fs::write(
            &good.landmarks,
            StaticLandmarks::single(landmarks(80.0, 90.0, 50.0)).to_json_string()?,
        )?;

        let missing = TemplateAsset {
            image: dir.join("t2.png"),
            landmarks: dir.join("t2.json"),
        };

        // Image present but no face annotated.
        let faceless = TemplateAsset {
            image: dir.join("t3.png"),
            landmarks: dir.join("t3.json"),
        };
        face_image(100, 100, 50.0, 50.0, 30.0).save(&faceless.image)?;
        std::fs::write(
            &faceless.landmarks,
            serde_json::json!({ "faces": [] }).to_string(),
        )?;

        let config = Config {
            covers: CoverSettings {
                output_dir: dir.join("out"),
            },
            themes: vec![Theme {
                id: "test".to_string(),
                name: "Test Artist".to_string(),
                templates: vec![good, missing, faceless],
            }],
            ..Config::default()
        };

        Ok(Self {
            dir,
            user_image,
            user_landmarks,
            config,
        })
    }

    fn out(&self, file: &str) -> PathBuf {
        self.dir.join("out").join("test").join(file)
    }
}

impl Drop for Fixture {
    fn drop(&mut self) {
        std::fs::remove_dir_all(&self.dir).ok();
    }
}

#[test]
fn theme_yields_covers_and_fallbacks() -> Result<()> {
    env_logger::try_init().ok();
    let fx = Fixture::new("covers")?;

    let outcomes = generate_covers(&fx.config, "test", &fx.user_image, &fx.user_landmarks)?;
    assert_eq!(outcomes.len(), 2, "missing template is skipped");

    assert_eq!(
        outcomes[0],
        CoverOutcome::Generated {
            index: 1,
            path: fx.out("cover_1.jpg"),
        }
    );
    let cover = image::open(outcomes[0].path())?;
    assert_eq!((cover.width(), cover.height()), (160, 180));

    match &outcomes[1] {
        CoverOutcome::Fallback { index, path, reason } => {
            assert_eq!(*index, 3);
            assert_eq!(path, &fx.out("default_3.png"));
            assert!(!reason.is_empty());
            assert_eq!(std::fs::read(path)?, std::fs::read(&fx.user_image)?);
        }
        other => panic!("expected fallback, got {other:?}"),
    }
    assert!(!fx.out("cover_2.jpg").exists());
    Ok(())
}

#[test]
fn unknown_theme_is_an_error() -> Result<()> {
    let fx = Fixture::new("unknown-theme")?;
    let err = generate_covers(&fx.config, "nobody", &fx.user_image, &fx.user_landmarks)
        .unwrap_err();
    assert!(err.to_string().contains("nobody"));
    Ok(())
}

#[test]
fn unreadable_user_photo_is_an_error() -> Result<()> {
    let fx = Fixture::new("bad-user")?;
    let missing = Path::new("no/such/photo.png");
    assert!(generate_covers(&fx.config, "test", missing, &fx.user_landmarks).is_err());
    Ok(())
}
