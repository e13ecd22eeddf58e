//! Reference ellipsoid and local frames.

use cgmath::{Deg, ElementWise, InnerSpace, Matrix3, Vector3};

use super::Cartographic;

/// Below this horizontal magnitude a position is treated as lying on the
/// polar axis, where east is undefined.
const POLAR_EPSILON: f64 = 1e-12;

/// A triaxial reference ellipsoid centered at the origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ellipsoid {
    radii: Vector3<f64>,
}

impl Ellipsoid {
    /// The WGS84 ellipsoid.
    pub const WGS84: Ellipsoid = Ellipsoid::new(6_378_137.0, 6_378_137.0, 6_356_752.314_245_179);

    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self {
            radii: Vector3 { x, y, z },
        }
    }

    pub fn radii(&self) -> Vector3<f64> {
        self.radii
    }

    fn radii_squared(&self) -> Vector3<f64> {
        self.radii.mul_element_wise(self.radii)
    }

    fn one_over_radii_squared(&self) -> Vector3<f64> {
        let r2 = self.radii_squared();
        Vector3::new(1.0 / r2.x, 1.0 / r2.y, 1.0 / r2.z)
    }

    /// Surface normal at a cartographic position.
    pub fn geodetic_surface_normal_cartographic(&self, position: &Cartographic) -> Vector3<f64> {
        let cos_latitude = position.latitude.cos();
        Vector3::new(
            cos_latitude * position.longitude.cos(),
            cos_latitude * position.longitude.sin(),
            position.latitude.sin(),
        )
        .normalize()
    }

    /// Surface normal through a cartesian position.
    pub fn geodetic_surface_normal(&self, position: Vector3<f64>) -> Vector3<f64> {
        position
            .mul_element_wise(self.one_over_radii_squared())
            .normalize()
    }

    /// Earth-centered, earth-fixed coordinates of a cartographic position.
    pub fn cartographic_to_cartesian(&self, position: &Cartographic) -> Vector3<f64> {
        let n = self.geodetic_surface_normal_cartographic(position);
        let k = self.radii_squared().mul_element_wise(n);
        let gamma = n.dot(k).sqrt();
        k / gamma + n * position.height
    }
}

/// Rotation placing a model at `world_position` with the given heading.
///
/// The unrotated frame is local east/north/up; `heading_degrees` turns the
/// model clockwise (seen from above) about the up axis. Column 0 is the
/// model's right direction and column 1 its up direction in the `i3dm`
/// sense (`NORMAL_RIGHT` / `NORMAL_UP`).
pub fn model_orientation(world_position: Vector3<f64>, heading_degrees: f64) -> Matrix3<f64> {
    let up = Ellipsoid::WGS84.geodetic_surface_normal(world_position);
    let east = Vector3::unit_z().cross(up);
    let east = if east.magnitude() < POLAR_EPSILON {
        Vector3::unit_y()
    } else {
        east.normalize()
    };
    let north = up.cross(east).normalize();

    let local_to_world = Matrix3::from_cols(east, north, up);
    local_to_world * Matrix3::from_angle_z(Deg(-heading_degrees))
}
