//! The random color distortion algorithm.

use crate::common::*;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColorJitterInit {
    /// The probability to distort an image.
    pub prob: R64,
    /// The maximum hue shift in fractions of a full turn.
    pub hue_shift: Option<R64>,
    /// The maximum deviation of the saturation factor from 1.
    pub saturation_shift: Option<R64>,
    /// The maximum deviation of the brightness factor from 1.
    pub value_shift: Option<R64>,
}

impl ColorJitterInit {
    pub fn build(self) -> Result<ColorJitter> {
        let Self {
            prob,
            hue_shift,
            saturation_shift,
            value_shift,
        } = self;

        ensure!(
            (0.0..=1.0).contains(&prob.raw()),
            "color jitter probability must be in range 0.0..=1.0"
        );
        if let Some(shift) = hue_shift {
            ensure!(
                (0.0..=0.5).contains(&shift.raw()),
                "hue_shift must be in range 0.0..=0.5"
            );
        }
        if let Some(shift) = saturation_shift {
            ensure!(shift >= 0.0, "saturation_shift must be non-negative");
        }
        if let Some(shift) = value_shift {
            ensure!(shift >= 0.0, "value_shift must be non-negative");
        }

        Ok(ColorJitter {
            prob: prob.raw(),
            max_hue_shift: hue_shift.map(R64::raw),
            max_saturation_shift: saturation_shift.map(R64::raw),
            max_value_shift: value_shift.map(R64::raw),
        })
    }
}

impl Default for ColorJitterInit {
    fn default() -> Self {
        Self {
            prob: r64(0.5),
            hue_shift: None,
            saturation_shift: None,
            value_shift: None,
        }
    }
}

/// Photometric distortion. It only applies to images, never to density maps.
#[derive(Debug, Clone)]
pub struct ColorJitter {
    prob: f64,
    max_hue_shift: Option<f64>,
    max_saturation_shift: Option<f64>,
    max_value_shift: Option<f64>,
}

impl ColorJitter {
    pub fn forward<R: Rng + ?Sized>(&self, mut image: RgbImage, rng: &mut R) -> RgbImage {
        if !rng.gen_bool(self.prob) {
            return image;
        }

        let hue_shift = self
            .max_hue_shift
            .map(|max| rng.gen_range(-max..=max))
            .unwrap_or(0.0);
        let saturation = self
            .max_saturation_shift
            .map(|max| rng.gen_range((1.0 - max)..=(1.0 + max)).max(0.0))
            .unwrap_or(1.0);
        let brightness = self
            .max_value_shift
            .map(|max| rng.gen_range((1.0 - max)..=(1.0 + max)).max(0.0))
            .unwrap_or(1.0);

        image.pixels_mut().for_each(|pixel| {
            let [r, g, b] = pixel.0.map(|value| value as f64 / 255.0);

            let [r, g, b] = if hue_shift != 0.0 {
                let [h, s, v] = rgb_to_hsv([r, g, b]);
                hsv_to_rgb([(h + hue_shift).rem_euclid(1.0), s, v])
            } else {
                [r, g, b]
            };

            // blend with the luma grey, then scale
            let grey = 0.299 * r + 0.587 * g + 0.114 * b;
            let rgb = [r, g, b]
                .map(|value| (grey + (value - grey) * saturation) * brightness)
                .map(|value| (value.clamp(0.0, 1.0) * 255.0).round() as u8);

            *pixel = Rgb(rgb);
        });

        image
    }
}

fn rgb_to_hsv([r, g, b]: [f64; 3]) -> [f64; 3] {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        ((g - b) / delta).rem_euclid(6.0) / 6.0
    } else if max == g {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };
    let s = if max == 0.0 { 0.0 } else { delta / max };

    [h, s, max]
}

fn hsv_to_rgb([h, s, v]: [f64; 3]) -> [f64; 3] {
    let sector = h * 6.0;
    let index = sector.floor() as i64 % 6;
    let f = sector - sector.floor();
    let p = v * (1.0 - s);
    let q = v * (1.0 - s * f);
    let t = v * (1.0 - s * (1.0 - f));

    match index {
        0 => [v, t, p],
        1 => [q, v, p],
        2 => [p, v, t],
        3 => [p, q, v],
        4 => [t, p, v],
        _ => [v, p, q],
    }
}
