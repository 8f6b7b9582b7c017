//! Color derivation for archetype instances: per-type tone scales with a
//! bounded contrast correction against the regular node background.

use crate::category::archetype_base_color;

/// Number of hill-climb steps `ensure_contrast` takes before giving up.
pub const CONTRAST_MAX_ATTEMPTS: usize = 12;
/// Tone scales are capped at this many shades.
pub const TONE_SCALE_MAX: usize = 20;

const TARGET_SATURATION: f64 = 0.60;
const LIGHTNESS_HIGH: f64 = 0.90;
const LIGHTNESS_LOW: f64 = 0.60;
const EASE_EXPONENT: f64 = 1.4;
const HUE_STEP: f64 = 30.0;
const LIGHTNESS_STEP: f64 = 0.12;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hsl {
    /// Hue in degrees, `[0, 360)`.
    pub h: f64,
    pub s: f64,
    pub l: f64,
}

impl Hsl {
    /// Parses `#rrggbb` (the `#` is optional). Anything else reads as black.
    pub fn from_hex(hex: &str) -> Self {
        let Some([r, g, b]) = parse_rgb(hex) else {
            return Self { h: 0.0, s: 0.0, l: 0.0 };
        };
        let (r, g, b) = (r as f64 / 255.0, g as f64 / 255.0, b as f64 / 255.0);
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;
        let d = max - min;
        if d == 0.0 {
            return Self { h: 0.0, s: 0.0, l };
        }
        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        Self { h: h * 60.0, s, l }
    }

    pub fn to_hex(self) -> String {
        let Self { h, s, l } = self;
        let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
        let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
        let m = l - c / 2.0;
        let (r, g, b) = if (0.0..60.0).contains(&h) {
            (c, x, 0.0)
        } else if (60.0..120.0).contains(&h) {
            (x, c, 0.0)
        } else if (120.0..180.0).contains(&h) {
            (0.0, c, x)
        } else if (180.0..240.0).contains(&h) {
            (0.0, x, c)
        } else if (240.0..300.0).contains(&h) {
            (x, 0.0, c)
        } else {
            (c, 0.0, x)
        };
        format!(
            "#{:02x}{:02x}{:02x}",
            channel(r + m),
            channel(g + m),
            channel(b + m)
        )
    }
}

fn parse_rgb(hex: &str) -> Option<[u8; 3]> {
    let digits = hex.strip_prefix('#').unwrap_or(hex);
    if digits.len() != 6 || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    let mut out = [0u8; 3];
    for (idx, slot) in out.iter_mut().enumerate() {
        *slot = u8::from_str_radix(&digits[idx * 2..idx * 2 + 2], 16).ok()?;
    }
    Some(out)
}

fn channel(value: f64) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Weighted hue/saturation/lightness distance in `[0, 1]`. Not a perceptual
/// delta-E; hue dominates.
pub fn hsl_distance(a: Hsl, b: Hsl) -> f64 {
    let raw = (a.h - b.h).abs();
    let dh = raw.min(360.0 - raw) / 180.0;
    let ds = (a.s - b.s).abs();
    let dl = (a.l - b.l).abs();
    dh * 0.6 + ds * 0.2 + dl * 0.2
}

/// Light-to-dark shades of one hue, one per instance. `total` is clamped to
/// `[1, 20]`.
pub fn build_tone_scale(base_hex: &str, total: usize) -> Vec<String> {
    let base = Hsl::from_hex(base_hex);
    let n = total.clamp(1, TONE_SCALE_MAX);
    let s = (base.s * 0.7 + TARGET_SATURATION * 0.3).clamp(0.35, 0.90);

    if n == 1 {
        let mid = (LIGHTNESS_HIGH + LIGHTNESS_LOW) / 2.0;
        return vec![Hsl { h: base.h, s, l: mid }.to_hex()];
    }

    (0..n)
        .map(|i| {
            let t = i as f64 / (n - 1) as f64;
            let eased = t.powf(EASE_EXPONENT);
            let l = LIGHTNESS_HIGH + eased * (LIGHTNESS_LOW - LIGHTNESS_HIGH);
            Hsl {
                h: base.h,
                s,
                l: l.clamp(0.25, 0.90),
            }
            .to_hex()
        })
        .collect()
}

/// Nudges `fg_hex` away from `bg_hex` until their distance reaches
/// `min_distance`, rotating hue by 30 degrees and alternating lightness by
/// 0.12 per step. Stops after [`CONTRAST_MAX_ATTEMPTS`] steps whether or not
/// the threshold was met.
pub fn ensure_contrast(fg_hex: &str, bg_hex: &str, min_distance: f64) -> String {
    let mut fg = Hsl::from_hex(fg_hex);
    let bg = Hsl::from_hex(bg_hex);

    let mut attempts = 0;
    while hsl_distance(fg, bg) < min_distance && attempts < CONTRAST_MAX_ATTEMPTS {
        fg.h = (fg.h + HUE_STEP) % 360.0;
        let step = if attempts % 2 == 1 {
            LIGHTNESS_STEP
        } else {
            -LIGHTNESS_STEP
        };
        fg.l = (fg.l + step).clamp(0.0, 1.0);
        attempts += 1;
    }
    fg.to_hex()
}

/// Final color for instance `index` of `total` archetypes of `archetype_type`.
pub fn instance_color(
    archetype_type: &str,
    index: usize,
    total: usize,
    background_hex: &str,
    min_distance: f64,
) -> String {
    let shades = build_tone_scale(archetype_base_color(archetype_type), total);
    let chosen = &shades[index.min(shades.len() - 1)];
    ensure_contrast(chosen, background_hex, min_distance)
}
