use plotters::style::{
    colors::colormaps::{ColorMap as _, ViridisRGB},
    RGBColor,
};

#[derive(Clone, Copy, Debug)]
enum Scale {
    Viridis,
    Stops(&'static [(u8, u8, u8)]),
}

/// Colour scale over `[0, 1]`, optionally read back to front.
#[derive(Clone, Copy, Debug)]
pub struct ColorMap {
    scale: Scale,
    reversed: bool,
}

const RD_YL_GN: &[(u8, u8, u8)] = &[
    (165, 0, 38),
    (215, 48, 39),
    (244, 109, 67),
    (253, 174, 97),
    (254, 224, 139),
    (255, 255, 191),
    (217, 239, 139),
    (166, 217, 106),
    (102, 189, 99),
    (26, 152, 80),
    (0, 104, 55),
];

impl ColorMap {
    pub const fn viridis() -> Self {
        Self {
            scale: Scale::Viridis,
            reversed: false,
        }
    }

    /// Red at the low end, green at the high end.
    pub const fn red_yellow_green() -> Self {
        Self {
            scale: Scale::Stops(RD_YL_GN),
            reversed: false,
        }
    }

    pub const fn reversed(self) -> Self {
        Self {
            scale: self.scale,
            reversed: !self.reversed,
        }
    }

    /// Colour at position `t`, clamped to `[0, 1]`. NaN maps to the low end.
    pub fn at(&self, t: f64) -> RGBColor {
        let t = if t.is_nan() { 0.0 } else { t.clamp(0.0, 1.0) };
        let t = if self.reversed { 1.0 - t } else { t };

        match self.scale {
            Scale::Viridis => ViridisRGB.get_color(t),
            Scale::Stops(stops) => interpolate(stops, t),
        }
    }

    /// Colour for `value` normalised over `[min, max]`.
    pub fn map(&self, value: f64, min: f64, max: f64) -> RGBColor {
        self.at(normalize(value, min, max))
    }
}

/// Position of `value` within `[min, max]`; a degenerate range maps to 0.5.
pub fn normalize(value: f64, min: f64, max: f64) -> f64 {
    let width = max - min;
    if width.abs() <= f64::EPSILON {
        0.5
    } else {
        (value - min) / width
    }
}

/// Piecewise-linear blend between evenly spaced stops.
fn interpolate(stops: &[(u8, u8, u8)], t: f64) -> RGBColor {
    let span = (stops.len() - 1) as f64;
    let scaled = t * span;
    let lower = (scaled.floor() as usize).min(stops.len() - 2);
    let frac = scaled - lower as f64;

    let (r0, g0, b0) = stops[lower];
    let (r1, g1, b1) = stops[lower + 1];
    RGBColor(lerp(r0, r1, frac), lerp(g0, g1, frac), lerp(b0, b1, frac))
}

fn lerp(a: u8, b: u8, t: f64) -> u8 {
    (a as f64 + (b as f64 - a as f64) * t).round() as u8
}
