//! Otsu binarization and the single-channel variants decoders are fed.

use image::{GrayImage, Luma, Rgba, RgbaImage};

/// Pixels less than half opaque count as background.
const OPAQUE_CUTOFF: u8 = 128;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Red,
    Green,
    Blue,
}

impl Channel {
    fn index(self) -> usize {
        match self {
            Channel::Red => 0,
            Channel::Green => 1,
            Channel::Blue => 2,
        }
    }

    fn label(self) -> &'static str {
        match self {
            Channel::Red => "red",
            Channel::Green => "green",
            Channel::Blue => "blue",
        }
    }
}

/// A way of turning a color region into one decoder input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Gray,
    GrayOtsu,
    GrayOtsuInverted,
    Channel(Channel),
    ChannelOtsu { channel: Channel, inverted: bool },
    Saturation,
    SaturationOtsu,
    SaturationOtsuInverted,
}

impl Variant {
    pub fn label(&self) -> String {
        match self {
            Variant::Gray => "gray".into(),
            Variant::GrayOtsu => "gray-otsu".into(),
            Variant::GrayOtsuInverted => "gray-otsu-inv".into(),
            Variant::Channel(c) => c.label().into(),
            Variant::ChannelOtsu { channel, inverted: false } => format!("{}-otsu", channel.label()),
            Variant::ChannelOtsu { channel, inverted: true } => format!("{}-otsu-inv", channel.label()),
            Variant::Saturation => "sat".into(),
            Variant::SaturationOtsu => "sat-otsu".into(),
            Variant::SaturationOtsuInverted => "sat-otsu-inv".into(),
        }
    }

    pub fn render(&self, img: &RgbaImage) -> GrayImage {
        match *self {
            Variant::Gray => plane(img, luminance),
            Variant::GrayOtsu => binarize(&plane(img, luminance), false),
            Variant::GrayOtsuInverted => binarize(&plane(img, luminance), true),
            Variant::Channel(channel) => plane(img, |p| channel_value(p, channel)),
            Variant::ChannelOtsu { channel, inverted } => {
                binarize(&plane(img, |p| channel_value(p, channel)), inverted)
            }
            Variant::Saturation => plane(img, saturation),
            Variant::SaturationOtsu => binarize(&plane(img, saturation), false),
            Variant::SaturationOtsuInverted => binarize(&plane(img, saturation), true),
        }
    }
}

fn plane(img: &RgbaImage, f: impl Fn(&Rgba<u8>) -> u8) -> GrayImage {
    GrayImage::from_fn(img.width(), img.height(), |x, y| Luma([f(img.get_pixel(x, y))]))
}

/// BT.601 luminance; translucent pixels become white.
pub fn luminance(p: &Rgba<u8>) -> u8 {
    if p[3] < OPAQUE_CUTOFF {
        return 255;
    }
    let [r, g, b, _] = p.0;
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round().min(255.0) as u8
}

fn channel_value(p: &Rgba<u8>, channel: Channel) -> u8 {
    if p[3] < OPAQUE_CUTOFF { 255 } else { p[channel.index()] }
}

/// HSV saturation on a 0..=255 scale; translucent pixels are unsaturated.
pub fn saturation(p: &Rgba<u8>) -> u8 {
    if p[3] < OPAQUE_CUTOFF {
        return 0;
    }
    let [r, g, b, _] = p.0;
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    if max == 0 {
        return 0;
    }
    ((max - min) as f32 * 255.0 / max as f32).round() as u8
}

pub fn histogram(values: impl IntoIterator<Item = u8>) -> ([u32; 256], u32) {
    let mut hist = [0u32; 256];
    let mut total = 0u32;
    for v in values {
        hist[v as usize] += 1;
        total += 1;
    }
    (hist, total)
}

/// Threshold maximizing between-class variance `wB * wF * (mB - mF)^2`.
///
/// Ties keep the lowest level. Pixels strictly above the level are foreground.
pub fn otsu_level(hist: &[u32; 256], total: u32) -> u8 {
    let sum: f64 = hist.iter().enumerate().map(|(i, &c)| i as f64 * c as f64).sum();
    let total = total as u64;

    let mut sum_b = 0.0f64;
    let mut w_b = 0u64;
    let mut best = 0.0f64;
    let mut level = 0u8;

    for (i, &count) in hist.iter().enumerate() {
        w_b += count as u64;
        if w_b == 0 {
            continue;
        }
        let w_f = total.saturating_sub(w_b);
        if w_f == 0 {
            break;
        }
        sum_b += i as f64 * count as f64;
        let m_b = sum_b / w_b as f64;
        let m_f = (sum - sum_b) / w_f as f64;
        let between = w_b as f64 * w_f as f64 * (m_b - m_f) * (m_b - m_f);
        if between > best {
            best = between;
            level = i as u8;
        }
    }

    level
}

/// Otsu binarization of a single-channel plane.
pub fn binarize(plane: &GrayImage, inverted: bool) -> GrayImage {
    let (hist, total) = histogram(plane.pixels().map(|p| p[0]));
    let level = otsu_level(&hist, total);
    let (fg, bg) = if inverted { (0, 255) } else { (255, 0) };
    GrayImage::from_fn(plane.width(), plane.height(), |x, y| {
        Luma([if plane.get_pixel(x, y)[0] > level { fg } else { bg }])
    })
}
