#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

/// Inclusive containment: a point exactly on the circle boundary counts as a hit.
pub fn circle_contains(cx: f32, cy: f32, radius: f32, px: f32, py: f32) -> bool {
    let dx = px - cx;
    let dy = py - cy;
    radius * radius >= dx * dx + dy * dy
}

pub fn hex_to_rgb(hex: &str) -> Option<Rgb> {
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if hex.len() != 6 {
        return None;
    }

    let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
    let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
    let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
    Some(Rgb { r, g, b })
}

pub fn rgb_to_hex(rgb: Rgb) -> String {
    format!("{:02x}{:02x}{:02x}", rgb.r, rgb.g, rgb.b)
}

pub fn invert(rgb: Rgb) -> Rgb {
    Rgb {
        r: 0xff ^ rgb.r,
        g: 0xff ^ rgb.g,
        b: 0xff ^ rgb.b,
    }
}

struct Hsv {
    hue: f64,
    saturation: f64,
    value: f64,
}

fn rgb_to_hsv(rgb: Rgb) -> Hsv {
    let (r, g, b) = (rgb.r as f64, rgb.g as f64, rgb.b as f64);
    let max = r.max(g).max(b);
    let dif = max - r.min(g).min(b);

    let saturation = if max == 0.0 { 0.0 } else { 100.0 * dif / max };
    let mut hue = if saturation == 0.0 {
        0.0
    } else if r == max {
        60.0 * (g - b) / dif
    } else if g == max {
        120.0 + 60.0 * (b - r) / dif
    } else {
        240.0 + 60.0 * (r - g) / dif
    };
    if hue < 0.0 {
        hue += 360.0;
    }

    Hsv {
        hue: hue.round(),
        saturation: saturation.round(),
        value: (max * 100.0 / 255.0).round(),
    }
}

fn hsv_to_rgb(hsv: Hsv) -> Rgb {
    if hsv.saturation == 0.0 {
        let gray = (hsv.value * 2.55).round() as u8;
        return Rgb::new(gray, gray, gray);
    }

    let hue = hsv.hue / 60.0;
    let saturation = hsv.saturation / 100.0;
    let value = hsv.value / 100.0;

    let i = hue.floor();
    let f = hue - i;
    let p = value * (1.0 - saturation);
    let q = value * (1.0 - saturation * f);
    let t = value * (1.0 - saturation * (1.0 - f));

    let (r, g, b) = match i as i64 {
        0 => (value, t, p),
        1 => (q, value, p),
        2 => (p, value, t),
        3 => (p, q, value),
        4 => (t, p, value),
        _ => (value, p, q),
    };

    Rgb::new(
        (r * 255.0).round() as u8,
        (g * 255.0).round() as u8,
        (b * 255.0).round() as u8,
    )
}

/// Complementary color via a 180 degree hue shift.
pub fn complement(rgb: Rgb) -> Rgb {
    let mut hsv = rgb_to_hsv(rgb);
    hsv.hue = (hsv.hue + 180.0).rem_euclid(360.0);
    hsv_to_rgb(hsv)
}

fn srgb_channel(channel: u8) -> f64 {
    let c = channel as f64 / 255.0;
    if c <= 0.03928 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

pub fn relative_luminance(rgb: Rgb) -> f64 {
    0.2126 * srgb_channel(rgb.r) + 0.7152 * srgb_channel(rgb.g) + 0.0722 * srgb_channel(rgb.b)
}

/// Pick whichever of `light`/`dark` contrasts more against `background`.
pub fn text_color_for(background: Rgb, light: Rgb, dark: Rgb) -> Rgb {
    let l = relative_luminance(background);
    let l1 = relative_luminance(light);
    let l2 = relative_luminance(dark);

    if l > ((l1 + 0.05) * (l2 + 0.05)).sqrt() - 0.05 {
        dark
    } else {
        light
    }
}

fn hsl_to_rgb(hue: f64, saturation: f64, lightness: f64) -> Rgb {
    let c = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
    let x = c * (1.0 - ((hue / 60.0).rem_euclid(2.0) - 1.0).abs());
    let m = lightness - c / 2.0;

    let (r, g, b) = match hue as i64 {
        0..=59 => (c, x, 0.0),
        60..=119 => (x, c, 0.0),
        120..=179 => (0.0, c, x),
        180..=239 => (0.0, x, c),
        240..=299 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    Rgb::new(
        ((r + m) * 255.0).round() as u8,
        ((g + m) * 255.0).round() as u8,
        ((b + m) * 255.0).round() as u8,
    )
}

/// Stable color derived from a string hash. Used for edge label chips so the
/// same label keeps the same tint across sessions.
pub fn hash_color(text: &str) -> Rgb {
    let hash = text.chars().fold(0i32, |acc, ch| {
        (ch as i32).wrapping_add(acc.wrapping_shl(5).wrapping_sub(acc))
    });
    hsl_to_rgb((hash.rem_euclid(360)) as f64, 0.95, 0.35)
}
