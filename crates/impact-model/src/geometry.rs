//! Prismatic spacecraft surface: a convex footprint extruded along `z`.

use impact_core::{
    ErrorInfo, FaceFrame, FaceId, ImpactError, RngHandle, SurfaceGeometry, SurfacePoint,
};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

const PLANE_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
enum FaceKind {
    Bottom,
    Top,
    Side { length: f64 },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Face {
    kind: FaceKind,
    frame: FaceFrame,
    origin: Vector3<f64>,
    area: f64,
}

/// Convex polygonal prism with bottom, top and one rectangular side per edge.
///
/// Faces are numbered bottom (0), top (1), then sides in footprint order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrismSpacecraft {
    footprint: Vec<[f64; 2]>,
    z_bottom: f64,
    height: f64,
    faces: Vec<Face>,
    cumulative_area: Vec<f64>,
    fan_area: Vec<f64>,
    total_area: f64,
}

impl PrismSpacecraft {
    /// Builds a prism from a counter-clockwise convex footprint.
    pub fn new(footprint: Vec<[f64; 2]>, z_bottom: f64, height: f64) -> Result<Self, ImpactError> {
        if footprint.len() < 3 {
            return Err(ImpactError::Geometry(
                ErrorInfo::new("footprint-size", "footprint needs at least three vertices")
                    .with_context("vertices", footprint.len().to_string()),
            ));
        }
        if !(height > 0.0 && height.is_finite()) {
            return Err(ImpactError::Geometry(
                ErrorInfo::new("prism-height", "height must be positive")
                    .with_context("height", height.to_string()),
            ));
        }
        let n = footprint.len();
        for i in 0..n {
            let a = footprint[i];
            let b = footprint[(i + 1) % n];
            let c = footprint[(i + 2) % n];
            let turn = (b[0] - a[0]) * (c[1] - b[1]) - (b[1] - a[1]) * (c[0] - b[0]);
            if turn <= 0.0 {
                return Err(ImpactError::Geometry(
                    ErrorInfo::new("footprint-convexity", "footprint must be convex and counter-clockwise")
                        .with_context("vertex", ((i + 1) % n).to_string()),
                ));
            }
        }

        let fan_area: Vec<f64> = (1..n - 1)
            .map(|i| triangle_area(footprint[0], footprint[i], footprint[i + 1]))
            .collect();
        let cap_area: f64 = fan_area.iter().sum();

        let mut faces = Vec::with_capacity(n + 2);
        faces.push(Face {
            kind: FaceKind::Bottom,
            frame: FaceFrame {
                normal: Vector3::new(0.0, 0.0, -1.0),
                u: Vector3::new(1.0, 0.0, 0.0),
                v: Vector3::new(0.0, -1.0, 0.0),
            },
            origin: Vector3::new(0.0, 0.0, z_bottom),
            area: cap_area,
        });
        faces.push(Face {
            kind: FaceKind::Top,
            frame: FaceFrame {
                normal: Vector3::new(0.0, 0.0, 1.0),
                u: Vector3::new(1.0, 0.0, 0.0),
                v: Vector3::new(0.0, 1.0, 0.0),
            },
            origin: Vector3::new(0.0, 0.0, z_bottom + height),
            area: cap_area,
        });
        for i in 0..n {
            let a = footprint[i];
            let b = footprint[(i + 1) % n];
            let length = ((b[0] - a[0]).powi(2) + (b[1] - a[1]).powi(2)).sqrt();
            let u = Vector3::new((b[0] - a[0]) / length, (b[1] - a[1]) / length, 0.0);
            let normal = Vector3::new(u.y, -u.x, 0.0);
            faces.push(Face {
                kind: FaceKind::Side { length },
                frame: FaceFrame {
                    normal,
                    u,
                    v: normal.cross(&u),
                },
                origin: Vector3::new(a[0], a[1], z_bottom),
                area: length * height,
            });
        }

        let mut running = 0.0;
        let cumulative_area = faces
            .iter()
            .map(|face| {
                running += face.area;
                running
            })
            .collect();

        Ok(Self {
            footprint,
            z_bottom,
            height,
            faces,
            cumulative_area,
            fan_area,
            total_area: running,
        })
    }

    /// Regular octagon of circumradius `radius` with edges facing the body
    /// axes, centred on the origin. Shaped like the LISA Pathfinder bus.
    pub fn octagon(radius: f64, height: f64) -> Result<Self, ImpactError> {
        let footprint = (0..8)
            .map(|i| {
                let angle = std::f64::consts::PI / 8.0 + i as f64 * std::f64::consts::PI / 4.0;
                [radius * angle.cos(), radius * angle.sin()]
            })
            .collect();
        Self::new(footprint, -0.5 * height, height)
    }

    /// Area of a single face.
    pub fn face_area(&self, face: FaceId) -> Option<f64> {
        self.faces.get(face.as_raw()).map(|face| face.area)
    }

    /// Converts a body-frame point to face coordinates.
    pub fn face_coordinates(&self, face: FaceId, point: &Vector3<f64>) -> Option<[f64; 2]> {
        let face = self.faces.get(face.as_raw())?;
        let offset = point - face.origin;
        Some([offset.dot(&face.frame.u), offset.dot(&face.frame.v)])
    }

    fn contains(&self, face: &Face, point: &Vector3<f64>) -> bool {
        let offset = point - face.origin;
        if offset.dot(&face.frame.normal).abs() > PLANE_TOLERANCE {
            return false;
        }
        let m0 = offset.dot(&face.frame.u);
        let m1 = offset.dot(&face.frame.v);
        match face.kind {
            FaceKind::Side { length } => {
                (0.0..=length).contains(&m0) && (0.0..=self.height).contains(&m1)
            }
            FaceKind::Top | FaceKind::Bottom => self.footprint_contains(point.x, point.y),
        }
    }

    fn footprint_contains(&self, x: f64, y: f64) -> bool {
        let n = self.footprint.len();
        (0..n).all(|i| {
            let a = self.footprint[i];
            let b = self.footprint[(i + 1) % n];
            (b[0] - a[0]) * (y - a[1]) - (b[1] - a[1]) * (x - a[0]) >= -PLANE_TOLERANCE
        })
    }

    fn sample_footprint(&self, rng: &mut RngHandle) -> [f64; 2] {
        let cap_area: f64 = self.fan_area.iter().sum();
        let mut target = rng.uniform() * cap_area;
        let mut triangle = self.fan_area.len() - 1;
        for (index, area) in self.fan_area.iter().enumerate() {
            if target < *area {
                triangle = index;
                break;
            }
            target -= area;
        }
        let a = self.footprint[0];
        let b = self.footprint[triangle + 1];
        let c = self.footprint[triangle + 2];
        let r1 = rng.uniform().sqrt();
        let r2 = rng.uniform();
        let wa = 1.0 - r1;
        let wb = r1 * (1.0 - r2);
        let wc = r1 * r2;
        [
            wa * a[0] + wb * b[0] + wc * c[0],
            wa * a[1] + wb * b[1] + wc * c[1],
        ]
    }
}

impl SurfaceGeometry for PrismSpacecraft {
    fn face_count(&self) -> usize {
        self.faces.len()
    }

    fn total_area(&self) -> f64 {
        self.total_area
    }

    fn face_frame(&self, face: FaceId) -> Option<FaceFrame> {
        self.faces.get(face.as_raw()).map(|face| face.frame)
    }

    fn sample_surface_point(&self, rng: &mut RngHandle) -> SurfacePoint {
        let target = rng.uniform() * self.total_area;
        let index = self
            .cumulative_area
            .iter()
            .position(|&edge| target < edge)
            .unwrap_or(self.faces.len() - 1);
        let face = &self.faces[index];
        let point = match face.kind {
            FaceKind::Side { length } => {
                face.origin + face.frame.u * (rng.uniform() * length)
                    + face.frame.v * (rng.uniform() * self.height)
            }
            FaceKind::Top | FaceKind::Bottom => {
                let [x, y] = self.sample_footprint(rng);
                Vector3::new(x, y, face.origin.z)
            }
        };
        let offset = point - face.origin;
        SurfacePoint {
            face: FaceId::from_raw(index),
            point,
            map: [offset.dot(&face.frame.u), offset.dot(&face.frame.v)],
        }
    }

    fn surface_point(&self, face: FaceId, map: [f64; 2]) -> Option<Vector3<f64>> {
        let face = self.faces.get(face.as_raw())?;
        Some(face.origin + face.frame.u * map[0] + face.frame.v * map[1])
    }

    fn face_area_density(&self, face: FaceId, point: &Vector3<f64>) -> f64 {
        match self.faces.get(face.as_raw()) {
            Some(face) if self.contains(face, point) => 1.0 / self.total_area,
            _ => 0.0,
        }
    }
}

fn triangle_area(a: [f64; 2], b: [f64; 2], c: [f64; 2]) -> f64 {
    0.5 * ((b[0] - a[0]) * (c[1] - a[1]) - (b[1] - a[1]) * (c[0] - a[0])).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_box() -> PrismSpacecraft {
        PrismSpacecraft::new(
            vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]],
            0.0,
            1.0,
        )
        .unwrap()
    }

    #[test]
    fn box_has_six_unit_faces() {
        let geometry = unit_box();
        assert_eq!(geometry.face_count(), 6);
        assert!((geometry.total_area() - 6.0).abs() < 1e-12);
        for face in 0..6 {
            let area = geometry.face_area(FaceId::from_raw(face)).unwrap();
            assert!((area - 1.0).abs() < 1e-12);
        }
    }

    #[test]
    fn side_normals_point_outwards() {
        let geometry = unit_box();
        // first side runs along +x at y = 0, so it faces -y
        let frame = geometry.face_frame(FaceId::from_raw(2)).unwrap();
        assert!((frame.normal - Vector3::new(0.0, -1.0, 0.0)).norm() < 1e-12);
        assert!((frame.v - Vector3::new(0.0, 0.0, 1.0)).norm() < 1e-12);
    }

    #[test]
    fn clockwise_footprint_is_rejected() {
        let err = PrismSpacecraft::new(
            vec![[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]],
            0.0,
            1.0,
        )
        .unwrap_err();
        assert_eq!(err.info().code, "footprint-convexity");
    }

    #[test]
    fn off_face_points_have_zero_density() {
        let geometry = unit_box();
        let top = FaceId::from_raw(1);
        assert!(geometry.face_area_density(top, &Vector3::new(0.5, 0.5, 1.0)) > 0.0);
        assert_eq!(geometry.face_area_density(top, &Vector3::new(1.5, 0.5, 1.0)), 0.0);
        assert_eq!(geometry.face_area_density(top, &Vector3::new(0.5, 0.5, 0.9)), 0.0);
        assert_eq!(
            geometry.face_area_density(FaceId::from_raw(17), &Vector3::new(0.5, 0.5, 1.0)),
            0.0
        );
    }
}
