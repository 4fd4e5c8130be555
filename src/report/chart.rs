use std::path::Path;

use image::{Rgb, RgbImage};
use tracing::info;

use crate::error::Result;
use crate::sweep::SweepResult;

const TRAIN_COLOR: Rgb<u8> = Rgb([31, 119, 180]);
const TEST_COLOR: Rgb<u8> = Rgb([255, 127, 14]);
const ONSET_COLOR: Rgb<u8> = Rgb([214, 39, 40]);
const GRID_COLOR: Rgb<u8> = Rgb([200, 200, 200]);
const AXIS_COLOR: Rgb<u8> = Rgb([0, 0, 0]);
const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Layout of the rendered chart.
///
/// The default is a 10 × 6 inch figure at 300 dpi with linear axes.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartOptions {
    pub width: u32,
    pub height: u32,
    /// Place widths on a log2 axis instead of a linear one.
    pub log_x: bool,
}

impl Default for ChartOptions {
    fn default() -> Self {
        ChartOptions { width: 3000, height: 1800, log_x: false }
    }
}

/// Maps data coordinates onto the pixel plot area.
struct Frame {
    left: f64,
    right: f64,
    top: f64,
    bottom: f64,
    x_min: f64,
    x_max: f64,
    y_min: f64,
    y_max: f64,
    log_x: bool,
}

impl Frame {
    fn x_value(&self, x: f64) -> f64 {
        if self.log_x { x.max(f64::MIN_POSITIVE).log2() } else { x }
    }

    fn px(&self, x: f64) -> f64 {
        let (lo, hi) = (self.x_value(self.x_min), self.x_value(self.x_max));
        let t = if hi > lo { (self.x_value(x) - lo) / (hi - lo) } else { 0.5 };
        self.left + t * (self.right - self.left)
    }

    fn py(&self, y: f64) -> f64 {
        let t = if self.y_max > self.y_min { (y - self.y_min) / (self.y_max - self.y_min) } else { 0.5 };
        self.bottom - t * (self.bottom - self.top)
    }
}

/// Draws train and test loss against width.
///
/// Both series get a line plus circular markers. When `onset` is `Some(i)`
/// a dashed vertical line marks `result.widths[i]`. There is no text: a
/// legend of two color swatches sits in the top-right corner.
pub fn render_chart(result: &SweepResult, onset: Option<usize>, options: &ChartOptions) -> RgbImage {
    let mut img = RgbImage::from_pixel(options.width, options.height, BACKGROUND);
    let (w, h) = (options.width as f64, options.height as f64);
    let scale = (w.min(h) / 1800.0).max(0.1);

    let losses = result.train_losses.iter().chain(&result.test_losses).filter(|v| v.is_finite());
    let (y_lo, y_hi) = losses.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let (y_lo, y_hi) = if y_lo.is_finite() { (y_lo, y_hi) } else { (0.0, 1.0) };
    let pad = ((y_hi - y_lo) * 0.05).max(1e-3);

    let frame = Frame {
        left: w * 0.08,
        right: w * 0.97,
        top: h * 0.05,
        bottom: h * 0.90,
        x_min: result.widths.iter().copied().min().unwrap_or(0) as f64,
        x_max: result.widths.iter().copied().max().unwrap_or(1) as f64,
        y_min: y_lo - pad,
        y_max: y_hi + pad,
        log_x: options.log_x,
    };

    // ── Grid ──────────────────────────────────────────────────────────────
    let dash = 12.0 * scale;
    for &x in &result.widths {
        let px = frame.px(x as f64);
        dashed_line(&mut img, (px, frame.top), (px, frame.bottom), scale, dash, GRID_COLOR);
    }
    for k in 0..=8 {
        let y = frame.y_min + (frame.y_max - frame.y_min) * k as f64 / 8.0;
        let py = frame.py(y);
        dashed_line(&mut img, (frame.left, py), (frame.right, py), scale, dash, GRID_COLOR);
    }

    // ── Axes ──────────────────────────────────────────────────────────────
    thick_line(&mut img, (frame.left, frame.bottom), (frame.right, frame.bottom), 2.0 * scale, AXIS_COLOR);
    thick_line(&mut img, (frame.left, frame.top), (frame.left, frame.bottom), 2.0 * scale, AXIS_COLOR);

    // ── Series ────────────────────────────────────────────────────────────
    let line_width = 4.0 * scale;
    let marker = 12.0 * scale;
    for (losses, color) in [(&result.train_losses, TRAIN_COLOR), (&result.test_losses, TEST_COLOR)] {
        let points: Vec<(f64, f64)> = result.widths.iter().zip(losses.iter())
            .filter(|(_, l)| l.is_finite())
            .map(|(&x, &y)| (frame.px(x as f64), frame.py(y)))
            .collect();
        for pair in points.windows(2) {
            thick_line(&mut img, pair[0], pair[1], line_width, color);
        }
        for &p in &points {
            fill_circle(&mut img, p, marker, color);
        }
    }

    // ── Overparameterized onset ──────────────────────────────────────────
    if let Some(&x) = onset.and_then(|i| result.widths.get(i)) {
        let px = frame.px(x as f64);
        dashed_line(&mut img, (px, frame.top), (px, frame.bottom), 4.0 * scale, 3.0 * dash, ONSET_COLOR);
    }

    // ── Legend swatches ───────────────────────────────────────────────────
    let sw = 60.0 * scale;
    let x0 = frame.right - 2.0 * sw;
    for (row, color) in [TRAIN_COLOR, TEST_COLOR].into_iter().enumerate() {
        let y0 = frame.top + sw * (0.5 + 1.5 * row as f64);
        fill_rect(&mut img, (x0, y0), (x0 + sw, y0 + sw * 0.6), color);
    }

    img
}

/// Renders the chart and writes it as PNG.
pub fn save_chart(path: &Path, result: &SweepResult, onset: Option<usize>, options: &ChartOptions) -> Result<()> {
    render_chart(result, onset, options).save(path)?;
    info!(path = %path.display(), "chart written");
    Ok(())
}

// ---------------------------------------------------------------------------
// Raster primitives
// ---------------------------------------------------------------------------

fn put(img: &mut RgbImage, x: i64, y: i64, color: Rgb<u8>) {
    if x >= 0 && y >= 0 && (x as u32) < img.width() && (y as u32) < img.height() {
        img.put_pixel(x as u32, y as u32, color);
    }
}

fn fill_circle(img: &mut RgbImage, (cx, cy): (f64, f64), radius: f64, color: Rgb<u8>) {
    let r = radius.max(0.5);
    let (x0, x1) = ((cx - r).floor() as i64, (cx + r).ceil() as i64);
    let (y0, y1) = ((cy - r).floor() as i64, (cy + r).ceil() as i64);
    for y in y0..=y1 {
        for x in x0..=x1 {
            let (dx, dy) = (x as f64 - cx, y as f64 - cy);
            if dx * dx + dy * dy <= r * r {
                put(img, x, y, color);
            }
        }
    }
}

fn fill_rect(img: &mut RgbImage, (x0, y0): (f64, f64), (x1, y1): (f64, f64), color: Rgb<u8>) {
    for y in y0.round() as i64..y1.round() as i64 {
        for x in x0.round() as i64..x1.round() as i64 {
            put(img, x, y, color);
        }
    }
}

/// Stamps discs of diameter `width` along the segment.
fn thick_line(img: &mut RgbImage, from: (f64, f64), to: (f64, f64), width: f64, color: Rgb<u8>) {
    let len = ((to.0 - from.0).powi(2) + (to.1 - from.1).powi(2)).sqrt();
    let steps = len.ceil().max(1.0) as usize;
    for s in 0..=steps {
        let t = s as f64 / steps as f64;
        let p = (from.0 + t * (to.0 - from.0), from.1 + t * (to.1 - from.1));
        fill_circle(img, p, width / 2.0, color);
    }
}

/// Alternating drawn and skipped runs of `dash` pixels.
fn dashed_line(img: &mut RgbImage, from: (f64, f64), to: (f64, f64), width: f64, dash: f64, color: Rgb<u8>) {
    let len = ((to.0 - from.0).powi(2) + (to.1 - from.1).powi(2)).sqrt();
    if len == 0.0 || dash <= 0.0 {
        return;
    }
    let (ux, uy) = ((to.0 - from.0) / len, (to.1 - from.1) / len);
    let mut d = 0.0;
    while d < len {
        let end = (d + dash).min(len);
        thick_line(
            img,
            (from.0 + ux * d, from.1 + uy * d),
            (from.0 + ux * end, from.1 + uy * end),
            width,
            color,
        );
        d += 2.0 * dash;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SweepResult {
        SweepResult {
            widths: vec![16, 32, 64, 128],
            train_losses: vec![0.6, 0.4, 0.3, 0.2],
            test_losses: vec![0.7, 0.5, 0.6, 0.4],
        }
    }

    fn small() -> ChartOptions {
        ChartOptions { width: 600, height: 360, log_x: false }
    }

    fn count(img: &RgbImage, color: Rgb<u8>) -> usize {
        img.pixels().filter(|&&p| p == color).count()
    }

    #[test]
    fn renders_at_requested_size_with_both_series() {
        let img = render_chart(&sample(), None, &small());
        assert_eq!(img.dimensions(), (600, 360));
        assert!(count(&img, TRAIN_COLOR) > 0);
        assert!(count(&img, TEST_COLOR) > 0);
        assert_eq!(count(&img, ONSET_COLOR), 0);
    }

    #[test]
    fn onset_adds_a_marker_line() {
        let img = render_chart(&sample(), Some(1), &small());
        assert!(count(&img, ONSET_COLOR) > 0);
        // Out-of-range index draws nothing rather than panicking.
        let img = render_chart(&sample(), Some(99), &small());
        assert_eq!(count(&img, ONSET_COLOR), 0);
    }

    #[test]
    fn degenerate_inputs_do_not_panic() {
        let empty = SweepResult { widths: vec![], train_losses: vec![], test_losses: vec![] };
        render_chart(&empty, None, &small());
        let flat = SweepResult { widths: vec![8], train_losses: vec![1.0], test_losses: vec![f64::NAN] };
        render_chart(&flat, Some(0), &ChartOptions { log_x: true, ..small() });
    }

    #[test]
    fn save_chart_writes_a_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("chart.png");
        save_chart(&path, &sample(), Some(1), &small()).unwrap();
        let reread = image::open(&path).unwrap();
        assert_eq!((reread.width(), reread.height()), (600, 360));
    }
}
