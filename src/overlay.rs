use serde::{Deserialize, Serialize};

use crate::face::LandmarkName;
use crate::mesh::{EdgeGroup, FaceMesh, PointId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const TRANSPARENT: Color = Color::rgba(0, 0, 0, 0);
    pub const WHITE: Color = Color::rgb(255, 255, 255);
    pub const YELLOW: Color = Color::rgb(255, 255, 0);
    pub const BLUE: Color = Color::rgb(0, 0, 255);
    pub const GREEN: Color = Color::rgb(0, 255, 0);
    pub const CYAN: Color = Color::rgb(0, 255, 255);
    pub const MAGENTA: Color = Color::rgb(255, 0, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_opacity(&self, opacity: f32) -> Color {
        let opacity = if opacity.is_finite() {
            opacity.clamp(0.0, 1.0)
        } else {
            1.0
        };
        Color {
            a: (self.a as f32 * opacity).round() as u8,
            ..*self
        }
    }
}

impl From<Color> for image::Rgba<u8> {
    fn from(c: Color) -> Self {
        image::Rgba([c.r, c.g, c.b, c.a])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeStyle {
    pub color: Color,
    pub width: f32,
    pub opacity: f32,
}

impl EdgeStyle {
    pub const fn new(color: Color, width: f32, opacity: f32) -> Self {
        Self {
            color,
            width,
            opacity,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PointStyle {
    pub radius: f32,
    pub stroke: Color,
    pub fill: Color,
}

/// Colours and sizes for every overlay element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    pub bounds: EdgeStyle,
    pub bounds_corner: PointStyle,
    pub eye: PointStyle,
    pub nose: PointStyle,
    pub mouth: PointStyle,
    pub cheek: PointStyle,
    pub synthetic: PointStyle,
    pub eyes: EdgeStyle,
    pub brows: EdgeStyle,
    pub nose_edges: EdgeStyle,
    pub mouth_edges: EdgeStyle,
    pub cheek_edges: EdgeStyle,
    pub forehead_edges: EdgeStyle,
    pub cheek_path_edges: EdgeStyle,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        let landmark = |fill: Color| PointStyle {
            radius: 5.0,
            stroke: Color::WHITE,
            fill,
        };
        Self {
            bounds: EdgeStyle::new(Color::YELLOW, 2.0, 1.0),
            bounds_corner: landmark(Color::YELLOW),
            eye: landmark(Color::BLUE),
            nose: landmark(Color::GREEN),
            mouth: landmark(Color::WHITE),
            cheek: landmark(Color::WHITE),
            synthetic: PointStyle {
                radius: 2.0,
                stroke: Color::CYAN,
                fill: Color::CYAN,
            },
            eyes: EdgeStyle::new(Color::YELLOW, 2.0, 1.0),
            brows: EdgeStyle::new(Color::CYAN, 1.0, 0.8),
            nose_edges: EdgeStyle::new(Color::YELLOW, 2.0, 1.0),
            mouth_edges: EdgeStyle::new(Color::WHITE, 2.0, 1.0),
            cheek_edges: EdgeStyle::new(Color::WHITE, 1.0, 0.7),
            forehead_edges: EdgeStyle::new(Color::CYAN, 1.0, 0.6),
            cheek_path_edges: EdgeStyle::new(Color::MAGENTA, 1.0, 0.6),
        }
    }
}

impl OverlayStyle {
    pub fn edge_style(&self, group: EdgeGroup) -> EdgeStyle {
        match group {
            EdgeGroup::Eyes => self.eyes,
            EdgeGroup::Brows => self.brows,
            EdgeGroup::Nose => self.nose_edges,
            EdgeGroup::Mouth => self.mouth_edges,
            EdgeGroup::Cheeks => self.cheek_edges,
            EdgeGroup::Forehead => self.forehead_edges,
            EdgeGroup::CheekPath => self.cheek_path_edges,
        }
    }

    pub fn point_style(&self, id: PointId) -> PointStyle {
        match id {
            PointId::Synthetic(_) => self.synthetic,
            PointId::Landmark(LandmarkName::LeftEye | LandmarkName::RightEye) => self.eye,
            PointId::Landmark(LandmarkName::NoseBase) => self.nose,
            PointId::Landmark(LandmarkName::LeftCheek | LandmarkName::RightCheek) => self.cheek,
            PointId::Landmark(_) => self.mouth,
        }
    }
}

/// Drawable element in render-surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Primitive {
    Rect {
        x: f32,
        y: f32,
        width: f32,
        height: f32,
        stroke_color: Color,
        stroke_width: f32,
    },
    Line {
        x1: f32,
        y1: f32,
        x2: f32,
        y2: f32,
        stroke_color: Color,
        stroke_width: f32,
        opacity: f32,
    },
    Circle {
        cx: f32,
        cy: f32,
        r: f32,
        stroke_color: Color,
        fill_color: Color,
    },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    // bounds, then edges, then synthetic points, then landmarks, then bounds corners
    pub fn render(&self, mesh: &FaceMesh) -> Vec<Primitive> {
        let mut primitives = Vec::with_capacity(1 + mesh.edges.len() + mesh.points.len() + 4);

        if let Some(bounds) = mesh.bounds {
            primitives.push(Primitive::Rect {
                x: bounds.origin.x,
                y: bounds.origin.y,
                width: bounds.size.width,
                height: bounds.size.height,
                stroke_color: self.style.bounds.color.with_opacity(self.style.bounds.opacity),
                stroke_width: self.style.bounds.width,
            });
        }

        primitives.extend(mesh.edges.iter().map(|edge| Primitive::Line {
            x1: edge.start.x,
            y1: edge.start.y,
            x2: edge.end.x,
            y2: edge.end.y,
            stroke_color: edge.style.color,
            stroke_width: edge.style.width,
            opacity: edge.style.opacity,
        }));

        let synthetic = mesh.points.iter().filter(|p| p.id.is_synthetic());
        let canonical = mesh.points.iter().filter(|p| !p.id.is_synthetic());
        for point in synthetic.chain(canonical) {
            let style = self.style.point_style(point.id);
            primitives.push(Primitive::Circle {
                cx: point.position.x,
                cy: point.position.y,
                r: style.radius,
                stroke_color: style.stroke,
                fill_color: style.fill,
            });
        }

        if let Some(bounds) = mesh.bounds {
            let corner = self.style.bounds_corner;
            primitives.extend(bounds.corners().iter().map(|c| Primitive::Circle {
                cx: c.x,
                cy: c.y,
                r: corner.radius,
                stroke_color: corner.stroke,
                fill_color: corner.fill,
            }));
        }

        primitives
    }
}
