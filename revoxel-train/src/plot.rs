//! Loss-curve rendering
//!
//! `save` writes a PNG of the loss history next to the checkpoint so a run
//! can be eyeballed without any tooling. The plot is a plain polyline on a
//! white canvas, scaled to the observed loss range.

use image::{Rgb, RgbImage};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
const MARGIN: u32 = 20;
const LINE: Rgb<u8> = Rgb([40, 90, 200]);

/// Render the loss history as a polyline image.
///
/// An empty history yields a blank canvas; a single value is drawn as a dot.
pub fn render_loss_curve(history: &[f32]) -> RgbImage {
    let mut canvas = RgbImage::from_pixel(WIDTH, HEIGHT, Rgb([255, 255, 255]));
    if history.is_empty() {
        return canvas;
    }

    let min = history.iter().copied().fold(f32::INFINITY, f32::min);
    let max = history.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let span = if max > min { max - min } else { 1.0 };

    let plot_w = (WIDTH - 2 * MARGIN) as f32;
    let plot_h = (HEIGHT - 2 * MARGIN) as f32;
    let to_xy = |i: usize, value: f32| {
        let denom = (history.len().max(2) - 1) as f32;
        let x = MARGIN as f32 + plot_w * i as f32 / denom;
        let y = MARGIN as f32 + plot_h * (1.0 - (value - min) / span);
        (x, y)
    };

    let mut prev = to_xy(0, history[0]);
    draw_dot(&mut canvas, prev);
    for (i, &value) in history.iter().enumerate().skip(1) {
        let next = to_xy(i, value);
        draw_segment(&mut canvas, prev, next);
        prev = next;
    }
    canvas
}

fn draw_segment(canvas: &mut RgbImage, from: (f32, f32), to: (f32, f32)) {
    let steps = (to.0 - from.0).abs().max((to.1 - from.1).abs()).ceil() as u32 + 1;
    for s in 0..=steps {
        let t = s as f32 / steps as f32;
        let x = from.0 + (to.0 - from.0) * t;
        let y = from.1 + (to.1 - from.1) * t;
        draw_dot(canvas, (x, y));
    }
}

fn draw_dot(canvas: &mut RgbImage, (x, y): (f32, f32)) {
    let (x, y) = (x.round() as i64, y.round() as i64);
    if x >= 0 && y >= 0 && (x as u32) < WIDTH && (y as u32) < HEIGHT {
        canvas.put_pixel(x as u32, y as u32, LINE);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_pixels(canvas: &RgbImage) -> usize {
        canvas.pixels().filter(|&&p| p == LINE).count()
    }

    #[test]
    fn test_empty_history_is_blank() {
        let canvas = render_loss_curve(&[]);
        assert_eq!(canvas.dimensions(), (WIDTH, HEIGHT));
        assert_eq!(line_pixels(&canvas), 0);
    }

    #[test]
    fn test_single_value_draws_a_dot() {
        let canvas = render_loss_curve(&[0.7]);
        assert_eq!(line_pixels(&canvas), 1);
    }

    #[test]
    fn test_descending_history_draws_a_curve() {
        let history: Vec<f32> = (0..50).map(|i| 1.0 / (1.0 + i as f32)).collect();
        let canvas = render_loss_curve(&history);
        // A polyline across the canvas touches at least one pixel per column.
        assert!(line_pixels(&canvas) >= (WIDTH - 2 * MARGIN) as usize);
    }

    #[test]
    fn test_constant_history_stays_in_bounds() {
        let canvas = render_loss_curve(&[2.0, 2.0, 2.0]);
        assert!(line_pixels(&canvas) > 0);
    }
}
