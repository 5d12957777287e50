//! Burns a primitive list into an image, for saving a photo with its overlay.

use std::path::Path;

use image::{DynamicImage, Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_hollow_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut,
    draw_polygon_mut, Blend,
};
use imageproc::point::Point;
use imageproc::rect::Rect;

use crate::overlay::{Color, Primitive};

// lines at or below this width are drawn as single-pixel segments
const THIN_LINE_WIDTH: f32 = 1.5;

pub fn draw_overlay(image: &DynamicImage, primitives: &[Primitive]) -> RgbaImage {
    rasterize(image.to_rgba8(), primitives)
}

/// Draws the overlay on top of `image` and writes the result to `path`.
pub fn save_overlay<P: AsRef<Path>>(
    image: &DynamicImage,
    primitives: &[Primitive],
    path: P,
) -> crate::Result<()> {
    draw_overlay(image, primitives).save(path)?;
    Ok(())
}

pub fn rasterize(image: RgbaImage, primitives: &[Primitive]) -> RgbaImage {
    // no circle needs to be larger than the image to cover it
    let max_radius = (image.width() + image.height()).max(1) as f32;
    let bounds = (image.width() as f32, image.height() as f32);
    let mut canvas = Blend(image);

    for primitive in primitives {
        match *primitive {
            Primitive::Rect {
                x,
                y,
                width,
                height,
                stroke_color,
                ..
            } => {
                let Some(rect) = clip_rect(x, y, width, height, bounds) else {
                    continue;
                };
                draw_hollow_rect_mut(&mut canvas, rect, stroke_color.into());
            }
            Primitive::Line {
                x1,
                y1,
                x2,
                y2,
                stroke_color,
                stroke_width,
                opacity,
            } => {
                let color: Rgba<u8> = stroke_color.with_opacity(opacity).into();
                draw_thick_line(&mut canvas, (x1, y1), (x2, y2), stroke_width, color);
            }
            Primitive::Circle {
                cx,
                cy,
                r,
                stroke_color,
                fill_color,
            } => {
                if !cx.is_finite() || !cy.is_finite() || !r.is_finite() {
                    continue;
                }
                let center = (cx.round() as i32, cy.round() as i32);
                let radius = r.round().clamp(1.0, max_radius) as i32;
                if fill_color != Color::TRANSPARENT {
                    draw_filled_circle_mut(&mut canvas, center, radius, fill_color.into());
                }
                draw_hollow_circle_mut(&mut canvas, center, radius, stroke_color.into());
            }
        }
    }

    canvas.0
}

// Rounds the rect to pixels and clips it to one pixel beyond the image on each
// side, so edges that fall outside the image stay outside. None when nothing is
// left to draw.
fn clip_rect(x: f32, y: f32, width: f32, height: f32, image: (f32, f32)) -> Option<Rect> {
    if !(x.is_finite() && y.is_finite() && width.is_finite() && height.is_finite()) {
        return None;
    }
    let (left, top) = (x.round(), y.round());
    let (right, bottom) = ((x + width).round(), (y + height).round());
    if right - left < 1.0 || bottom - top < 1.0 {
        return None;
    }

    let clamp_x = |v: f32| v.clamp(-1.0, image.0 + 1.0);
    let clamp_y = |v: f32| v.clamp(-1.0, image.1 + 1.0);
    let (left, right) = (clamp_x(left), clamp_x(right));
    let (top, bottom) = (clamp_y(top), clamp_y(bottom));

    let (w, h) = ((right - left) as u32, (bottom - top) as u32);
    if w == 0 || h == 0 {
        return None;
    }
    Some(Rect::at(left as i32, top as i32).of_size(w, h))
}

fn draw_thick_line(
    canvas: &mut Blend<RgbaImage>,
    start: (f32, f32),
    end: (f32, f32),
    width: f32,
    color: Rgba<u8>,
) {
    let (dx, dy) = (end.0 - start.0, end.1 - start.1);
    let length = (dx * dx + dy * dy).sqrt();
    if !length.is_finite() {
        return;
    }
    if width <= THIN_LINE_WIDTH || length < 1.0 {
        draw_line_segment_mut(canvas, start, end, color);
        return;
    }

    // quad around the segment, half the width on each side
    let (nx, ny) = (-dy / length * width * 0.5, dx / length * width * 0.5);
    let corner = |x: f32, y: f32| Point::new(x.round() as i32, y.round() as i32);
    let quad = [
        corner(start.0 + nx, start.1 + ny),
        corner(end.0 + nx, end.1 + ny),
        corner(end.0 - nx, end.1 - ny),
        corner(start.0 - nx, start.1 - ny),
    ];
    if quad[0] == quad[3] {
        draw_line_segment_mut(canvas, start, end, color);
        return;
    }
    draw_polygon_mut(canvas, &quad, color);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn black(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, 255]))
    }

    #[test]
    fn test_filled_circle_uses_fill_color() {
        let primitives = [Primitive::Circle {
            cx: 20.0,
            cy: 20.0,
            r: 5.0,
            stroke_color: Color::WHITE,
            fill_color: Color::BLUE,
        }];
        let out = rasterize(black(40, 40), &primitives);
        assert_eq!(*out.get_pixel(20, 20), Rgba([0, 0, 255, 255]));
        assert_eq!(*out.get_pixel(0, 0), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_rect_outline_only() {
        let primitives = [Primitive::Rect {
            x: 5.0,
            y: 5.0,
            width: 20.0,
            height: 10.0,
            stroke_color: Color::YELLOW,
            stroke_width: 2.0,
        }];
        let out = rasterize(black(40, 40), &primitives);
        assert_eq!(*out.get_pixel(5, 5), Rgba([255, 255, 0, 255]));
        assert_eq!(*out.get_pixel(15, 10), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_line_opacity_blends_with_background() {
        let primitives = [Primitive::Line {
            x1: 2.0,
            y1: 10.0,
            x2: 30.0,
            y2: 10.0,
            stroke_color: Color::WHITE,
            stroke_width: 1.0,
            opacity: 0.5,
        }];
        let out = rasterize(black(40, 20), &primitives);
        let px = out.get_pixel(15, 10);
        assert!(px[0] > 100 && px[0] < 160, "expected half grey, got {:?}", px);
    }

    #[test]
    fn test_thick_line_covers_neighbouring_rows() {
        let primitives = [Primitive::Line {
            x1: 2.0,
            y1: 10.0,
            x2: 30.0,
            y2: 10.0,
            stroke_color: Color::GREEN,
            stroke_width: 4.0,
            opacity: 1.0,
        }];
        let out = rasterize(black(40, 20), &primitives);
        assert_eq!(*out.get_pixel(15, 9), Rgba([0, 255, 0, 255]));
        assert_eq!(*out.get_pixel(15, 11), Rgba([0, 255, 0, 255]));
        assert_eq!(*out.get_pixel(15, 16), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_degenerate_primitives_are_skipped() {
        let primitives = [
            Primitive::Rect {
                x: 1.0,
                y: 1.0,
                width: 0.0,
                height: 5.0,
                stroke_color: Color::YELLOW,
                stroke_width: 2.0,
            },
            Primitive::Line {
                x1: 3.0,
                y1: 3.0,
                x2: 3.0,
                y2: 3.0,
                stroke_color: Color::WHITE,
                stroke_width: 3.0,
                opacity: 1.0,
            },
        ];
        let out = rasterize(black(10, 10), &primitives);
        assert_eq!(*out.get_pixel(1, 1), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_oversized_rect_is_clipped_not_panicking() {
        let primitives = [
            Primitive::Rect {
                x: 0.0,
                y: 0.0,
                width: 4_294_967_296.0,
                height: 2.0,
                stroke_color: Color::YELLOW,
                stroke_width: 2.0,
            },
            Primitive::Rect {
                x: 2.0e9,
                y: -3.0e9,
                width: 1.0e10,
                height: 1.0e10,
                stroke_color: Color::YELLOW,
                stroke_width: 2.0,
            },
        ];
        let out = rasterize(black(4, 4), &primitives);
        assert_eq!(*out.get_pixel(0, 0), Rgba([255, 255, 0, 255]));
        assert_eq!(*out.get_pixel(3, 0), Rgba([255, 255, 0, 255]));
        assert_eq!(*out.get_pixel(3, 3), Rgba([0, 0, 0, 255]));
    }

    #[test]
    fn test_huge_circle_radius_is_bounded() {
        let primitives = [Primitive::Circle {
            cx: 2.0,
            cy: 2.0,
            r: 1.0e12,
            stroke_color: Color::WHITE,
            fill_color: Color::GREEN,
        }];
        let out = rasterize(black(4, 4), &primitives);
        assert_eq!(*out.get_pixel(2, 2), Rgba([0, 255, 0, 255]));
    }

    #[test]
    fn test_save_overlay_writes_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("capture.png");
        let primitives = [Primitive::Circle {
            cx: 5.0,
            cy: 5.0,
            r: 2.0,
            stroke_color: Color::WHITE,
            fill_color: Color::BLUE,
        }];

        save_overlay(&DynamicImage::new_rgb8(10, 10), &primitives, &path).unwrap();
        let saved = image::open(&path).unwrap().to_rgba8();
        assert_eq!(*saved.get_pixel(5, 5), Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_save_overlay_reports_image_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = save_overlay(&DynamicImage::new_rgb8(2, 2), &[], dir.path().join("out.unknown"))
            .unwrap_err();
        assert!(matches!(err, crate::Error::Image(_)));
    }
}
