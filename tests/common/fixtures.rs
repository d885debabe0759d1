use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use image::{GrayImage, Rgba, RgbaImage};
use qrsift::decode::binarize::Variant;
use qrsift::decode::providers::QrDecoder;
use qrsift::detection::localize::Localizer;
use qrsift::runtime::{LinkedBackends, LoadFuture, RuntimeLoader};
use qrsift::{DecodeStage, DecodeWaterfall, Detector, Point2D, ScanConfig, SweepPlan, VisionRuntime};

pub const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// A `size` x `size` canvas with an axis-aligned filled square standing in for
/// a code.
pub fn square_code(size: u32, origin: u32, side: u32, ink: Rgba<u8>, paper: Rgba<u8>) -> RgbaImage {
    RgbaImage::from_fn(size, size, |x, y| {
        let inside = (origin..origin + side).contains(&x) && (origin..origin + side).contains(&y);
        if inside { ink } else { paper }
    })
}

/// Fill the convex quadrilateral `quad` (clockwise) with `ink`.
pub fn fill_quad(img: &mut RgbaImage, quad: &[Point2D; 4], ink: Rgba<u8>) {
    let (width, height) = img.dimensions();
    for y in 0..height {
        for x in 0..width {
            let p = Point2D::new(x as f32 + 0.5, y as f32 + 0.5);
            let inside = (0..4).all(|i| {
                let a = quad[i];
                let b = quad[(i + 1) % 4];
                (b.x - a.x) * (p.y - a.y) - (b.y - a.y) * (p.x - a.x) >= 0.0
            });
            if inside {
                img.put_pixel(x, y, ink);
            }
        }
    }
}

/// Version 1-L code carrying "HELLO" with mask 0, one row per string, `#` dark.
pub const HELLO_QR: [&str; 21] = [
    "#######..#.##.#######",
    "#.....#..###..#.....#",
    "#.###.#.##.##.#.###.#",
    "#.###.#..#.#..#.###.#",
    "#.###.#...#.#.#.###.#",
    "#.....#.....#.#.....#",
    "#######.#.#.#.#######",
    "........##.##........",
    "###.########.##...#..",
    "...#....#.....#....#.",
    "#.#...#...#.#...#####",
    "##..#...#.#...#....#.",
    "#.#..##..##.#.#.#.#..",
    "........##.#.#.#..##.",
    "#######.#..#.###..###",
    "#.....#.######.##....",
    "#.###.#.#..#.###..###",
    "#.###.#...#...##..##.",
    "#.###.#.###.#...#.#.#",
    "#.....#.##....#.#..#.",
    "#######.##..#.##..###",
];

pub fn hello_modules() -> Vec<Vec<bool>> {
    HELLO_QR.iter().map(|row| row.chars().map(|c| c == '#').collect()).collect()
}

/// The same code with a third of its lower-right data modules flipped. Finder
/// patterns, timing and format information survive; error correction does not.
pub fn damaged_hello_modules() -> Vec<Vec<bool>> {
    let mut modules = hello_modules();
    for y in 9..21 {
        for x in 9..21 {
            if (x + y) % 3 == 0 {
                modules[y][x] = !modules[y][x];
            }
        }
    }
    modules
}

/// Render codes left to right at `module` pixels per module, each inside a
/// white border `quiet` modules wide.
pub fn render_codes(codes: &[Vec<Vec<bool>>], module: u32, quiet: u32) -> RgbaImage {
    let side = HELLO_QR.len() as u32 + 2 * quiet;
    let mut img = RgbaImage::from_pixel(side * module * codes.len() as u32, side * module, WHITE);
    for (i, code) in codes.iter().enumerate() {
        let left = (i as u32 * side + quiet) * module;
        let top = quiet * module;
        for (y, row) in code.iter().enumerate() {
            for (x, _) in row.iter().enumerate().filter(|(_, dark)| **dark) {
                for dy in 0..module {
                    for dx in 0..module {
                        img.put_pixel(left + x as u32 * module + dx, top + y as u32 * module + dy, BLACK);
                    }
                }
            }
        }
    }
    img
}

pub fn hello_qr(module: u32, quiet: u32) -> RgbaImage {
    render_codes(&[hello_modules()], module, quiet)
}

/// Settings small enough to keep validation crops cheap in tests.
pub fn test_config() -> ScanConfig {
    ScanConfig {
        validation_target_size: 240,
        ..ScanConfig::default()
    }
}

/// A waterfall with one stage that feeds the plain gray plane to `decoder`.
pub fn single_stage(decoder: Arc<dyn QrDecoder>) -> DecodeWaterfall {
    DecodeWaterfall::new(vec![DecodeStage::new(
        "mock",
        decoder,
        SweepPlan::new(vec![1], vec![Variant::Gray]),
    )])
}

pub fn linked_runtime() -> Arc<VisionRuntime> {
    Arc::new(VisionRuntime::new(LinkedBackends))
}

pub fn detector(localizer: Arc<dyn Localizer>, decoder: Arc<dyn QrDecoder>) -> Detector {
    Detector::new()
        .with_config(test_config())
        .with_localizer(localizer)
        .with_waterfall(single_stage(decoder))
        .with_runtime(linked_runtime())
}

fn value_range(image: &GrayImage) -> (u8, u8) {
    image
        .pixels()
        .fold((u8::MAX, u8::MIN), |(lo, hi), p| (lo.min(p[0]), hi.max(p[0])))
}

/// Reports the bounding corners of the dark pixels, provided the image is at
/// least `min_side` pixels on its short side and spans `min_range` gray levels.
pub struct DarkRegionLocalizer {
    pub min_side: u32,
    pub min_range: u8,
    /// Only pixels in `[x0, x1) x [y0, y1)` are inspected when set.
    pub window: Option<(u32, u32, u32, u32)>,
    pub calls: AtomicUsize,
}

impl DarkRegionLocalizer {
    pub fn new(min_side: u32, min_range: u8) -> Arc<Self> {
        Arc::new(Self {
            min_side,
            min_range,
            window: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn within(window: (u32, u32, u32, u32), min_range: u8) -> Arc<Self> {
        Arc::new(Self {
            min_side: 1,
            min_range,
            window: Some(window),
            calls: AtomicUsize::new(0),
        })
    }

    fn inspects(&self, x: u32, y: u32) -> bool {
        self.window
            .is_none_or(|(x0, y0, x1, y1)| (x0..x1).contains(&x) && (y0..y1).contains(&y))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Localizer for DarkRegionLocalizer {
    fn name(&self) -> &str {
        "dark-region"
    }

    fn locate(&self, image: &GrayImage) -> anyhow::Result<Option<Vec<Point2D>>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if image.width().min(image.height()) < self.min_side {
            return Ok(None);
        }
        let (lo, hi) = image
            .enumerate_pixels()
            .filter(|(x, y, _)| self.inspects(*x, *y))
            .fold((u8::MAX, u8::MIN), |(lo, hi), (_, _, p)| (lo.min(p[0]), hi.max(p[0])));
        if hi.saturating_sub(lo) < self.min_range.max(1) {
            return Ok(None);
        }
        let cut = ((lo as u16 + hi as u16) / 2) as u8;

        let mut bounds: Option<(u32, u32, u32, u32)> = None;
        for (x, y, p) in image.enumerate_pixels() {
            if p[0] < cut && self.inspects(x, y) {
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x0, y0, x1, y1)) => (x0.min(x), y0.min(y), x1.max(x), y1.max(y)),
                });
            }
        }

        Ok(bounds.map(|(x0, y0, x1, y1)| {
            let (x0, y0, x1, y1) = (x0 as f32, y0 as f32, (x1 + 1) as f32, (y1 + 1) as f32);
            vec![
                Point2D::new(x0, y0),
                Point2D::new(x1, y0),
                Point2D::new(x1, y1),
                Point2D::new(x0, y1),
            ]
        }))
    }
}

/// Returns the same points for every image, scaled by how much larger the
/// image is than `base_width`.
pub struct ScriptedLocalizer {
    pub points: Vec<Point2D>,
    pub base_width: u32,
    /// 1-based call on which the points are reported; every call when `None`.
    pub succeed_on: Option<usize>,
    pub calls: AtomicUsize,
}

impl ScriptedLocalizer {
    pub fn new(points: Vec<Point2D>, base_width: u32) -> Arc<Self> {
        Arc::new(Self {
            points,
            base_width,
            succeed_on: None,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn succeeding_on(points: Vec<Point2D>, base_width: u32, call: usize) -> Arc<Self> {
        Arc::new(Self {
            points,
            base_width,
            succeed_on: Some(call),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Localizer for ScriptedLocalizer {
    fn name(&self) -> &str {
        "scripted"
    }

    fn locate(&self, image: &GrayImage) -> anyhow::Result<Option<Vec<Point2D>>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.succeed_on.is_some_and(|n| n != call) {
            return Ok(None);
        }
        let k = image.width() as f32 / self.base_width as f32;
        Ok(Some(self.points.iter().map(|p| p.scaled(k)).collect()))
    }
}

/// Decodes `text` from any image spanning at least `min_range` gray levels.
pub struct ContrastDecoder {
    pub text: String,
    pub min_range: u8,
    /// Only accept images with equal width and height.
    pub square_only: bool,
    pub inputs: Mutex<Vec<(u32, u32)>>,
}

impl ContrastDecoder {
    pub fn new(text: &str, min_range: u8) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            min_range,
            square_only: false,
            inputs: Mutex::new(Vec::new()),
        })
    }

    pub fn square_only(text: &str, min_range: u8) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            min_range,
            square_only: true,
            inputs: Mutex::new(Vec::new()),
        })
    }

    pub fn inputs(&self) -> Vec<(u32, u32)> {
        self.inputs.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }
}

impl QrDecoder for ContrastDecoder {
    fn name(&self) -> &str {
        "contrast"
    }

    fn decode(&self, image: &GrayImage) -> anyhow::Result<Option<String>> {
        self.inputs.lock().unwrap().push(image.dimensions());
        if self.square_only && image.width() != image.height() {
            return Ok(None);
        }
        let (lo, hi) = value_range(image);
        if hi.saturating_sub(lo) >= self.min_range {
            Ok(Some(self.text.clone()))
        } else {
            Ok(None)
        }
    }
}

/// Decodes only bright ink on a dark background: the center pixel must be at
/// least `min_range` levels above the top-left pixel.
pub struct BrightInkDecoder {
    pub text: String,
    pub min_range: u8,
    pub calls: AtomicUsize,
}

impl BrightInkDecoder {
    pub fn new(text: &str, min_range: u8) -> Arc<Self> {
        Arc::new(Self {
            text: text.to_string(),
            min_range,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl QrDecoder for BrightInkDecoder {
    fn name(&self) -> &str {
        "bright-ink"
    }

    fn decode(&self, image: &GrayImage) -> anyhow::Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let center = image.get_pixel(image.width() / 2, image.height() / 2)[0];
        let corner = image.get_pixel(0, 0)[0];
        if center.saturating_sub(corner) >= self.min_range {
            Ok(Some(self.text.clone()))
        } else {
            Ok(None)
        }
    }
}

/// Never finds anything and sometimes fails outright.
pub struct FailingDecoder {
    pub calls: AtomicUsize,
}

impl FailingDecoder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self { calls: AtomicUsize::new(0) })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl QrDecoder for FailingDecoder {
    fn name(&self) -> &str {
        "failing"
    }

    fn decode(&self, _image: &GrayImage) -> anyhow::Result<Option<String>> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call % 2 == 0 {
            anyhow::bail!("scripted decoder failure")
        }
        Ok(None)
    }
}

/// Runtime loader that waits `delay`, counts its invocations and fails the
/// first `failures` of them.
pub struct ScriptedLoader {
    pub delay: Duration,
    pub failures: usize,
    pub loads: Arc<AtomicUsize>,
}

impl ScriptedLoader {
    pub fn new(delay: Duration, failures: usize) -> (Self, Arc<AtomicUsize>) {
        let loads = Arc::new(AtomicUsize::new(0));
        (
            Self {
                delay,
                failures,
                loads: Arc::clone(&loads),
            },
            loads,
        )
    }
}

impl RuntimeLoader for ScriptedLoader {
    fn load(&self) -> LoadFuture<'_> {
        let call = self.loads.fetch_add(1, Ordering::SeqCst);
        Box::pin(wait_then(self.delay, call < self.failures))
    }
}

fn wait_then(delay: Duration, fail: bool) -> impl Future<Output = anyhow::Result<()>> + Send {
    async move {
        tokio::time::sleep(delay).await;
        if fail {
            anyhow::bail!("scripted runtime failure");
        }
        Ok(())
    }
}
