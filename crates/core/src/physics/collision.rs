//! Collision engine (C3): shape-pair dispatch, contact generation, impulse resolution.
//!
//! Grounded on `original_source/Shared/CollisionSystem.cpp`'s `collisionFunctionArray`
//! dispatch and `applyContactForces`, adapted to `glam` and Euler-`Vec3` rotations (no
//! quaternions in this layer, per the body-space-inertia open question in spec.md §9).

use glam::{Mat3, Quat, Vec3};

use super::shapes::Collider;

const PARALLEL_EPSILON: f32 = 1e-3;

pub fn rotation_matrix(euler_radians: Vec3) -> Mat3 {
    Mat3::from_quat(Quat::from_euler(
        glam::EulerRot::XYZ,
        euler_radians.x,
        euler_radians.y,
        euler_radians.z,
    ))
}

/// A shape placed in world space, as seen by the collision detector.
#[derive(Debug, Clone, Copy)]
pub struct Placement {
    pub collider: Collider,
    pub position: Vec3,
    pub rotation: Mat3,
}

impl Placement {
    pub fn new(collider: Collider, position: Vec3, rotation_euler: Vec3) -> Self {
        Self {
            collider,
            position,
            rotation: rotation_matrix(rotation_euler),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Contact {
    pub normal: Vec3,
    pub point: Vec3,
    pub penetration: f32,
}

type CollideFn = fn(&Placement, &Placement) -> Option<Contact>;

const K: usize = 2;

/// `K×K` dispatch table keyed by `(shapeA.tag, shapeB.tag)`. `box/sphere` is a swap-wrapper
/// around `sphere/box` so the table stays symmetric without duplicating detection logic.
fn dispatch_table() -> [[Option<CollideFn>; K]; K] {
    [
        [Some(sphere_sphere as CollideFn), Some(sphere_box as CollideFn)],
        [Some(box_sphere as CollideFn), Some(box_box as CollideFn)],
    ]
}

pub fn detect(a: &Placement, b: &Placement) -> Option<Contact> {
    let (ta, tb) = (a.collider.tag() as usize, b.collider.tag() as usize);
    if ta >= K || tb >= K {
        return None;
    }
    let table = dispatch_table();
    table[ta][tb].and_then(|f| f(a, b))
}

fn sphere_sphere(a: &Placement, b: &Placement) -> Option<Contact> {
    let Collider::Sphere { radius: ra } = a.collider else { return None };
    let Collider::Sphere { radius: rb } = b.collider else { return None };

    let delta = b.position - a.position;
    let dist = delta.length();
    let pen = ra + rb - dist;
    if pen <= 0.0 {
        return None;
    }

    let normal = if dist > 1e-6 { delta / dist } else { Vec3::Y };
    Some(Contact {
        normal,
        point: (a.position + b.position) * 0.5,
        penetration: pen,
    })
}

/// `a` must be a sphere, `b` a box. Returns a contact whose normal points from the sphere
/// toward the box, consistent with `sphere_sphere`'s `a → b` convention.
fn sphere_box(a: &Placement, b: &Placement) -> Option<Contact> {
    let Collider::Sphere { radius } = a.collider else { return None };
    let Collider::OrientedBox { half_extents } = b.collider else { return None };

    let local_center = b.rotation.transpose() * (a.position - b.position);
    let clamped = local_center.clamp(-half_extents, half_extents);
    let closest_world = b.position + b.rotation * clamped;

    let delta = a.position - closest_world;
    let dist = delta.length();
    let pen = radius - dist;
    if pen <= 0.0 {
        return None;
    }

    let normal = if dist > 1e-6 {
        -delta / dist
    } else {
        // Sphere center is inside the box: push out along the least-penetrated face.
        let penetrations = [
            half_extents.x - local_center.x.abs(),
            half_extents.y - local_center.y.abs(),
            half_extents.z - local_center.z.abs(),
        ];
        let axis = penetrations
            .iter()
            .enumerate()
            .min_by(|x, y| x.1.partial_cmp(y.1).unwrap())
            .map(|(i, _)| i)
            .unwrap_or(1);
        let sign = [local_center.x, local_center.y, local_center.z][axis].signum();
        let local_normal = match axis {
            0 => Vec3::new(sign, 0.0, 0.0),
            1 => Vec3::new(0.0, sign, 0.0),
            _ => Vec3::new(0.0, 0.0, sign),
        };
        -(b.rotation * local_normal)
    };

    Some(Contact {
        normal,
        point: closest_world,
        penetration: pen,
    })
}

fn box_sphere(a: &Placement, b: &Placement) -> Option<Contact> {
    sphere_box(b, a).map(|c| Contact {
        normal: -c.normal,
        ..c
    })
}

fn box_box(a: &Placement, b: &Placement) -> Option<Contact> {
    let Collider::OrientedBox { half_extents: ea } = a.collider else { return None };
    let Collider::OrientedBox { half_extents: eb } = b.collider else { return None };

    let axes_a = [a.rotation.x_axis, a.rotation.y_axis, a.rotation.z_axis];
    let axes_b = [b.rotation.x_axis, b.rotation.y_axis, b.rotation.z_axis];
    let half_a = [ea.x, ea.y, ea.z];
    let half_b = [eb.x, eb.y, eb.z];
    let center_diff = b.position - a.position;

    let mut candidate_axes: Vec<Vec3> = Vec::with_capacity(15);
    candidate_axes.extend_from_slice(&axes_a);
    candidate_axes.extend_from_slice(&axes_b);
    for axis_a in &axes_a {
        for axis_b in &axes_b {
            let cross = axis_a.cross(*axis_b);
            if cross.length_squared() > PARALLEL_EPSILON * PARALLEL_EPSILON {
                candidate_axes.push(cross.normalize());
            }
        }
    }

    let mut min_overlap = f32::MAX;
    let mut min_axis = Vec3::Y;

    for axis in candidate_axes {
        let axis = if axis.length_squared() > 1e-8 { axis.normalize() } else { continue };

        let radius_a: f32 = (0..3).map(|i| (axis.dot(axes_a[i]) * half_a[i]).abs()).sum();
        let radius_b: f32 = (0..3).map(|i| (axis.dot(axes_b[i]) * half_b[i]).abs()).sum();
        let center_dist = center_diff.dot(axis);
        let overlap = radius_a + radius_b - center_dist.abs();

        if overlap < 0.0 {
            return None;
        }

        if overlap < min_overlap {
            min_overlap = overlap;
            min_axis = if center_dist < 0.0 { -axis } else { axis };
        }
    }

    // Contact-point clipping against the other box's face planes is elided; the midpoint
    // of centers is the spec's explicit fallback (spec.md §4.3) when no clipped points
    // survive, and is accurate enough for the impulse math's r×F torque term here.
    let point = (a.position + b.position) * 0.5;

    Some(Contact {
        normal: min_axis,
        point,
        penetration: min_overlap,
    })
}

/// A resolver-facing view of one side of a contact. Built by the entity layer from a
/// `RigidBodyState` (or as an infinite-mass static partner).
#[derive(Debug, Clone, Copy)]
pub struct ContactBody {
    pub position: Vec3,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    pub inv_mass: f32,
    pub inv_inertia_world: Mat3,
    pub elasticity: f32,
    pub friction: f32,
}

impl ContactBody {
    pub fn static_partner(position: Vec3, friction: f32) -> Self {
        Self {
            position,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            inv_mass: 0.0,
            inv_inertia_world: Mat3::ZERO,
            elasticity: 0.0,
            friction,
        }
    }
}

fn point_velocity(body: &ContactBody, r: Vec3) -> Vec3 {
    body.velocity + body.angular_velocity.cross(r)
}

fn angular_denominator(inv_inertia: Mat3, r: Vec3, axis: Vec3) -> f32 {
    let r_cross_axis = r.cross(axis);
    let angular = (inv_inertia * r_cross_axis).cross(r);
    axis.dot(angular)
}

/// Applies normal + friction impulses and reports whether anything was applied (spec.md
/// §4.3 step 6 requires `onCollision` to fire regardless, which callers do themselves).
pub fn resolve_collision(a: &mut ContactBody, b: &mut ContactBody, contact: &Contact, affect_b: bool) -> bool {
    let n = contact.normal;
    let r_a = contact.point - a.position;
    let r_b = contact.point - b.position;

    let v_pa = point_velocity(a, r_a);
    let v_pb = point_velocity(b, r_b);
    let rel_vel = v_pa - v_pb;

    if rel_vel.dot(n) <= 0.0 {
        return false;
    }

    let inv_mass_sum = a.inv_mass + if affect_b { b.inv_mass } else { 0.0 };
    let elasticity = (a.elasticity + b.elasticity) / 2.0;

    let denom_n = inv_mass_sum
        + angular_denominator(a.inv_inertia_world, r_a, n)
        + if affect_b { angular_denominator(b.inv_inertia_world, r_b, n) } else { 0.0 };

    if denom_n.abs() < 1e-9 {
        return false;
    }

    let j_n = -(1.0 + elasticity) * rel_vel.dot(n) / denom_n;

    a.velocity += n * (j_n * a.inv_mass);
    a.angular_velocity += a.inv_inertia_world * r_a.cross(n * j_n);
    if affect_b {
        b.velocity -= n * (j_n * b.inv_mass);
        b.angular_velocity -= b.inv_inertia_world * r_b.cross(n * j_n);
    }

    let rel_vel_tangential = rel_vel - rel_vel.dot(n) * n;
    if rel_vel_tangential.length_squared() > 1e-8 {
        let t = rel_vel_tangential.normalize();
        let denom_t = inv_mass_sum
            + angular_denominator(a.inv_inertia_world, r_a, t)
            + if affect_b { angular_denominator(b.inv_inertia_world, r_b, t) } else { 0.0 };

        if denom_t.abs() > 1e-9 {
            let mu = a.friction.min(b.friction);
            let max_friction = mu * j_n.abs();
            let j_f = (-rel_vel.dot(t) / denom_t).clamp(-max_friction, max_friction);

            a.velocity += t * (j_f * a.inv_mass);
            a.angular_velocity += a.inv_inertia_world * r_a.cross(t * j_f);
            if affect_b {
                b.velocity -= t * (j_f * b.inv_mass);
                b.angular_velocity -= b.inv_inertia_world * r_b.cross(t * j_f);
            }
        }
    }

    true
}

/// Mass-weighted positional correction to eliminate residual interpenetration.
pub fn positional_correction(a: &mut Vec3, b: Option<&mut Vec3>, normal: Vec3, penetration: f32, inv_mass_a: f32, inv_mass_b: f32) {
    let total = inv_mass_a + inv_mass_b;
    if total <= 0.0 {
        return;
    }
    let frac_a = inv_mass_a / total;
    *a -= normal * penetration * frac_a;
    if let Some(b) = b {
        let frac_b = inv_mass_b / total;
        *b += normal * penetration * frac_b;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sphere(pos: Vec3, radius: f32) -> Placement {
        Placement::new(Collider::Sphere { radius }, pos, Vec3::ZERO)
    }

    fn cube(pos: Vec3, half: Vec3, rotation_euler: Vec3) -> Placement {
        Placement::new(Collider::OrientedBox { half_extents: half }, pos, rotation_euler)
    }

    #[test]
    fn spheres_exactly_tangent_report_no_contact() {
        let a = sphere(Vec3::ZERO, 1.0);
        let b = sphere(Vec3::new(2.0, 0.0, 0.0), 1.0);
        assert!(detect(&a, &b).is_none());
    }

    #[test]
    fn spheres_overlapping_report_contact_along_center_line() {
        let a = sphere(Vec3::ZERO, 1.0);
        let b = sphere(Vec3::new(1.5, 0.0, 0.0), 1.0);
        let contact = detect(&a, &b).expect("expected contact");
        assert!((contact.penetration - 0.5).abs() < 1e-5);
        assert!((contact.normal - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn sphere_resting_on_ground_box_reports_normal_pointing_into_ground() {
        // Convention is `a -> b` throughout (matching sphere/sphere's `c2 - c1`), so with the
        // sphere as `a` and the ground as `b` the normal points down into the ground; the
        // impulse math in `resolve_collision` resolves the correct (upward) bounce via the
        // sign of `j_n`, not the raw direction of `n`.
        let sphere_p = sphere(Vec3::new(0.0, 0.5, 0.0), 1.0);
        let ground = cube(Vec3::ZERO, Vec3::new(100.0, 1.0, 100.0), Vec3::ZERO);
        let contact = detect(&sphere_p, &ground).expect("expected contact");
        assert!(contact.normal.y < -0.9);
    }

    #[test]
    fn sphere_falling_onto_ground_bounces_upward_after_resolution() {
        let sphere_p = sphere(Vec3::new(0.0, 0.5, 0.0), 1.0);
        let ground = cube(Vec3::ZERO, Vec3::new(100.0, 1.0, 100.0), Vec3::ZERO);
        let contact = detect(&sphere_p, &ground).expect("expected contact");

        let mut falling = ContactBody {
            position: sphere_p.position,
            velocity: Vec3::new(0.0, -4.0, 0.0),
            angular_velocity: Vec3::ZERO,
            inv_mass: 1.0,
            inv_inertia_world: Mat3::ZERO,
            elasticity: 1.0,
            friction: 0.0,
        };
        let mut ground_body = ContactBody::static_partner(ground.position, 0.5);

        let applied = resolve_collision(&mut falling, &mut ground_body, &contact, false);
        assert!(applied);
        assert!(falling.velocity.y > 0.0, "sphere should bounce upward off the ground");
    }

    #[test]
    fn box_box_parallel_edge_axis_is_skipped_not_falsely_separating() {
        let a = cube(Vec3::ZERO, Vec3::splat(1.0), Vec3::ZERO);
        let b = cube(Vec3::new(1.5, 0.0, 0.0), Vec3::splat(1.0), Vec3::ZERO);
        let contact = detect(&a, &b).expect("axis-aligned boxes must still collide");
        assert!(contact.penetration > 0.0);
    }

    #[test]
    fn equal_mass_head_on_elastic_spheres_swap_velocity() {
        let mut a = ContactBody {
            position: Vec3::ZERO,
            velocity: Vec3::new(1.0, 0.0, 0.0),
            angular_velocity: Vec3::ZERO,
            inv_mass: 1.0,
            inv_inertia_world: Mat3::ZERO,
            elasticity: 1.0,
            friction: 0.0,
        };
        let mut b = ContactBody {
            position: Vec3::new(1.5, 0.0, 0.0),
            velocity: Vec3::new(-1.0, 0.0, 0.0),
            angular_velocity: Vec3::ZERO,
            inv_mass: 1.0,
            inv_inertia_world: Mat3::ZERO,
            elasticity: 1.0,
            friction: 0.0,
        };
        let contact = Contact {
            normal: Vec3::X,
            point: Vec3::new(0.75, 0.0, 0.0),
            penetration: 0.5,
        };

        let applied = resolve_collision(&mut a, &mut b, &contact, true);
        assert!(applied);
        assert!((a.velocity.x - -1.0).abs() < 1e-4);
        assert!((b.velocity.x - 1.0).abs() < 1e-4);
    }

    #[test]
    fn approaching_check_skips_separating_pairs() {
        let mut a = ContactBody::static_partner(Vec3::ZERO, 0.0);
        let mut b = ContactBody {
            position: Vec3::new(1.0, 0.0, 0.0),
            velocity: Vec3::new(1.0, 0.0, 0.0), // moving away from A along +x
            angular_velocity: Vec3::ZERO,
            inv_mass: 1.0,
            inv_inertia_world: Mat3::ZERO,
            elasticity: 0.0,
            friction: 0.0,
        };
        let contact = Contact {
            normal: Vec3::X,
            point: Vec3::new(0.5, 0.0, 0.0),
            penetration: 0.1,
        };
        assert!(!resolve_collision(&mut a, &mut b, &contact, true));
    }

    #[test]
    fn positional_correction_splits_by_inverse_mass() {
        let mut pos_a = Vec3::ZERO;
        let mut pos_b = Vec3::new(1.5, 0.0, 0.0);
        positional_correction(&mut pos_a, Some(&mut pos_b), Vec3::X, 0.5, 1.0, 1.0);
        assert!((pos_a.x - -0.25).abs() < 1e-5);
        assert!((pos_b.x - 1.75).abs() < 1e-5);
    }

    #[test]
    fn positional_correction_leaves_static_partner_untouched() {
        let mut pos_static = Vec3::new(0.0, 2.0, 0.0);
        positional_correction(&mut pos_static, None, Vec3::Y, 1.0, 0.0, 1.0);
        assert_eq!(pos_static, Vec3::new(0.0, 2.0, 0.0));
    }
}
