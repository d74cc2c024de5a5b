//! Collider shapes and their body-space inertia tensors (C2/C3).

use glam::{Mat3, Vec3};

/// A tagged collider shape. Shape tag is fixed at compile time and drives dispatch (C3).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Collider {
    Sphere { radius: f32 },
    OrientedBox { half_extents: Vec3 },
}

impl Collider {
    pub const TAG_SPHERE: u8 = 0;
    pub const TAG_BOX: u8 = 1;

    pub fn tag(&self) -> u8 {
        match self {
            Collider::Sphere { .. } => Self::TAG_SPHERE,
            Collider::OrientedBox { .. } => Self::TAG_BOX,
        }
    }

    /// Body-space inertia tensor for a given mass, per spec.md §4.2.
    pub fn inertia_tensor(&self, mass: f32) -> Mat3 {
        match self {
            Collider::Sphere { radius } => {
                let i = (2.0 / 5.0) * mass * radius * radius;
                Mat3::from_diagonal(Vec3::splat(i))
            }
            Collider::OrientedBox { half_extents } => {
                let size = *half_extents * 2.0;
                let (x, y, z) = (size.x, size.y, size.z);
                let ix = (mass / 12.0) * (y * y + z * z);
                let iy = (mass / 12.0) * (x * x + z * z);
                let iz = (mass / 12.0) * (x * x + y * y);
                Mat3::from_diagonal(Vec3::new(ix, iy, iz))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sphere_inertia_matches_formula() {
        let collider = Collider::Sphere { radius: 2.0 };
        let tensor = collider.inertia_tensor(5.0);
        let expected = (2.0 / 5.0) * 5.0 * 4.0;
        assert!((tensor.x_axis.x - expected).abs() < 1e-5);
        assert!((tensor.y_axis.y - expected).abs() < 1e-5);
        assert!((tensor.z_axis.z - expected).abs() < 1e-5);
    }

    #[test]
    fn box_inertia_is_diagonal_and_matches_formula() {
        // size = 2*half_extents = (2, 4, 6)
        let collider = Collider::OrientedBox {
            half_extents: Vec3::new(1.0, 2.0, 3.0),
        };
        let tensor = collider.inertia_tensor(12.0);
        assert!((tensor.x_axis.x - (16.0 + 36.0)).abs() < 1e-4);
        assert!((tensor.y_axis.y - (4.0 + 36.0)).abs() < 1e-4);
        assert!((tensor.z_axis.z - (4.0 + 16.0)).abs() < 1e-4);
        assert_eq!(tensor.x_axis.y, 0.0);
    }
}
