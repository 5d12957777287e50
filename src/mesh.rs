//! Synthetic face mesh built from the canonical landmarks of one frame.
//!
//! The detector only reports a handful of points. The mesh adds eyebrow
//! corners, temples, a forehead arc and cheek midpoints by offsetting and
//! interpolating those points, then connects everything with styled edges.
//! All work happens in render space and nothing is carried between frames.

use std::collections::{BTreeMap, HashSet};

use nalgebra::Point2;
use serde::{Deserialize, Serialize};

use crate::face::{Bounds, LandmarkName, Side};
use crate::face_landmarks::CanonicalLandmarks;
use crate::overlay::{EdgeStyle, OverlayStyle};
use crate::scaling::ScaleFactors;

pub const FOREHEAD_POINTS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum SyntheticPoint {
    BrowInner(Side),
    BrowOuter(Side),
    Temple(Side),
    Forehead(usize),
    CheekPath(Side),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum PointId {
    Landmark(LandmarkName),
    Synthetic(SyntheticPoint),
}

impl PointId {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, PointId::Synthetic(_))
    }
}

impl From<LandmarkName> for PointId {
    fn from(name: LandmarkName) -> Self {
        PointId::Landmark(name)
    }
}

impl From<SyntheticPoint> for PointId {
    fn from(point: SyntheticPoint) -> Self {
        PointId::Synthetic(point)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeGroup {
    Eyes,
    Brows,
    Nose,
    Mouth,
    Cheeks,
    Forehead,
    CheekPath,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshPoint {
    pub id: PointId,
    pub position: Point2<f32>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshEdge {
    pub start: Point2<f32>,
    pub end: Point2<f32>,
    pub group: EdgeGroup,
    pub style: EdgeStyle,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FaceMesh {
    pub bounds: Option<Bounds>,
    pub points: Vec<MeshPoint>,
    pub edges: Vec<MeshEdge>,
}

impl FaceMesh {
    pub fn point(&self, id: PointId) -> Option<Point2<f32>> {
        self.points.iter().find(|p| p.id == id).map(|p| p.position)
    }

    pub fn edges_in(&self, group: EdgeGroup) -> impl Iterator<Item = &MeshEdge> + '_ {
        self.edges.iter().filter(move |e| e.group == group)
    }
}

/// Offsets used to place synthetic points, in detector-frame pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshGeometry {
    pub brow_offset: [f32; 2],
    pub temple_offset: [f32; 2],
    pub forehead_lift: f32,
}

impl Default for MeshGeometry {
    fn default() -> Self {
        Self {
            brow_offset: [20.0, 15.0],
            temple_offset: [35.0, 30.0],
            forehead_lift: 45.0,
        }
    }
}

fn lerp(a: Point2<f32>, b: Point2<f32>, t: f32) -> Point2<f32> {
    a + (b - a) * t
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct MeshSynthesizer {
    geometry: MeshGeometry,
    style: OverlayStyle,
}

impl MeshSynthesizer {
    pub fn new(geometry: MeshGeometry, style: OverlayStyle) -> Self {
        Self { geometry, style }
    }

    pub fn synthesize(&self, landmarks: &CanonicalLandmarks, scale: ScaleFactors) -> FaceMesh {
        let mut points: BTreeMap<PointId, Point2<f32>> = landmarks
            .get_landmarks()
            .map(|(name, p)| (PointId::Landmark(name), scale.apply(p)))
            .collect();

        let synthetic = self.synthetic_points(&points, scale);
        for (id, position) in synthetic.iter() {
            points.insert(*id, *position);
        }

        let edges = self.build_edges(&points);

        // canonical points first, then synthetic points in creation order
        let mut ordered: Vec<MeshPoint> = landmarks
            .get_landmarks()
            .map(|(name, _)| {
                let id = PointId::Landmark(name);
                MeshPoint {
                    id,
                    position: points[&id],
                }
            })
            .collect();
        ordered.extend(
            synthetic
                .into_iter()
                .map(|(id, position)| MeshPoint { id, position }),
        );

        FaceMesh {
            bounds: landmarks.bounds().map(|b| b.scaled(scale)),
            points: ordered,
            edges,
        }
    }

    fn synthetic_points(
        &self,
        points: &BTreeMap<PointId, Point2<f32>>,
        scale: ScaleFactors,
    ) -> Vec<(PointId, Point2<f32>)> {
        let get = |name: LandmarkName| points.get(&PointId::Landmark(name)).copied();
        let mut out: Vec<(PointId, Point2<f32>)> = Vec::new();
        let [brow_dx, brow_dy] = self.geometry.brow_offset;
        let [temple_dx, temple_dy] = self.geometry.temple_offset;

        let mut temples = [None, None];
        for (i, side) in Side::BOTH.iter().enumerate() {
            let Some(eye) = get(side.eye()) else {
                continue;
            };
            let outward = outward_direction(*side, eye, get(side.opposite().eye()));

            out.push((
                SyntheticPoint::BrowInner(*side).into(),
                eye + scale.apply_offset(-outward * brow_dx, -brow_dy),
            ));
            out.push((
                SyntheticPoint::BrowOuter(*side).into(),
                eye + scale.apply_offset(outward * brow_dx, -brow_dy),
            ));

            let temple = eye + scale.apply_offset(outward * temple_dx, -temple_dy);
            temples[i] = Some(temple);
            out.push((SyntheticPoint::Temple(*side).into(), temple));
        }

        if let [Some(left), Some(right)] = temples {
            let lift = scale.apply_offset(0.0, -self.geometry.forehead_lift);
            for i in 0..FOREHEAD_POINTS {
                let t = i as f32 / (FOREHEAD_POINTS - 1) as f32;
                out.push((
                    SyntheticPoint::Forehead(i).into(),
                    lerp(left, right, t) + lift,
                ));
            }
        }

        for side in Side::BOTH {
            if let (Some(eye), Some(mouth)) = (get(side.eye()), get(side.mouth_corner())) {
                out.push((SyntheticPoint::CheekPath(side).into(), lerp(eye, mouth, 0.5)));
            }
        }

        out
    }

    fn build_edges(&self, points: &BTreeMap<PointId, Point2<f32>>) -> Vec<MeshEdge> {
        let mut builder = EdgeBuilder {
            points,
            style: &self.style,
            seen: HashSet::new(),
            edges: Vec::new(),
        };
        let nose: PointId = LandmarkName::NoseBase.into();

        builder.connect(LandmarkName::LeftEye, LandmarkName::RightEye, EdgeGroup::Eyes);

        for side in Side::BOTH {
            let eye = side.eye();
            builder.connect(eye, SyntheticPoint::BrowInner(side), EdgeGroup::Brows);
            builder.connect(eye, SyntheticPoint::BrowOuter(side), EdgeGroup::Brows);
            builder.connect(
                SyntheticPoint::BrowInner(side),
                SyntheticPoint::BrowOuter(side),
                EdgeGroup::Brows,
            );
        }

        builder.connect(LandmarkName::LeftEye, nose, EdgeGroup::Nose);
        builder.connect(LandmarkName::RightEye, nose, EdgeGroup::Nose);

        builder.connect(nose, LandmarkName::LeftMouth, EdgeGroup::Mouth);
        builder.connect(nose, LandmarkName::RightMouth, EdgeGroup::Mouth);
        builder.connect(LandmarkName::LeftMouth, LandmarkName::RightMouth, EdgeGroup::Mouth);
        builder.connect(LandmarkName::LeftMouth, LandmarkName::BottomMouth, EdgeGroup::Mouth);
        builder.connect(LandmarkName::RightMouth, LandmarkName::BottomMouth, EdgeGroup::Mouth);

        for side in Side::BOTH {
            builder.connect(side.cheek(), side.mouth_corner(), EdgeGroup::Cheeks);
        }

        for side in Side::BOTH {
            builder.connect(
                SyntheticPoint::Temple(side),
                SyntheticPoint::BrowOuter(side),
                EdgeGroup::Forehead,
            );
        }
        builder.connect(
            SyntheticPoint::Temple(Side::Left),
            SyntheticPoint::Forehead(0),
            EdgeGroup::Forehead,
        );
        for i in 0..FOREHEAD_POINTS - 1 {
            builder.connect(
                SyntheticPoint::Forehead(i),
                SyntheticPoint::Forehead(i + 1),
                EdgeGroup::Forehead,
            );
        }
        builder.connect(
            SyntheticPoint::Temple(Side::Right),
            SyntheticPoint::Forehead(FOREHEAD_POINTS - 1),
            EdgeGroup::Forehead,
        );
        for i in 0..FOREHEAD_POINTS {
            builder.connect(SyntheticPoint::Forehead(i), nose, EdgeGroup::Forehead);
        }

        for side in Side::BOTH {
            let chain: [PointId; 3] = [
                side.eye().into(),
                SyntheticPoint::CheekPath(side).into(),
                side.mouth_corner().into(),
            ];
            for pair in chain.windows(2) {
                builder.connect(pair[0], pair[1], EdgeGroup::CheekPath);
            }
            for id in chain {
                builder.connect(id, nose, EdgeGroup::CheekPath);
            }
        }

        builder.edges
    }
}

// the side of the eye that faces away from the other eye
fn outward_direction(side: Side, eye: Point2<f32>, other_eye: Option<Point2<f32>>) -> f32 {
    let default = match side {
        Side::Left => -1.0,
        Side::Right => 1.0,
    };
    match other_eye {
        Some(other) if eye.x < other.x => -1.0,
        Some(other) if eye.x > other.x => 1.0,
        _ => default,
    }
}

struct EdgeBuilder<'a> {
    points: &'a BTreeMap<PointId, Point2<f32>>,
    style: &'a OverlayStyle,
    seen: HashSet<(PointId, PointId)>,
    edges: Vec<MeshEdge>,
}

impl EdgeBuilder<'_> {
    fn connect(&mut self, a: impl Into<PointId>, b: impl Into<PointId>, group: EdgeGroup) {
        let (a, b) = (a.into(), b.into());
        let (Some(start), Some(end)) = (self.points.get(&a), self.points.get(&b)) else {
            return;
        };
        let key = if a <= b { (a, b) } else { (b, a) };
        if !self.seen.insert(key) {
            return;
        }
        self.edges.push(MeshEdge {
            start: *start,
            end: *end,
            group,
            style: self.style.edge_style(group),
        });
    }
}
