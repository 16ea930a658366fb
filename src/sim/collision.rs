//! Narrow-phase collision detection and response for moving spheres
//!
//! Detection is continuous: each pair is swept over one tick in the frame of
//! the second body, so fast projectiles cannot tunnel through hulls. A hit
//! moves both bodies to the instant of contact before the impulse is applied.

use glam::DVec3;

use super::body::Body;
use crate::consts::{IMPULSE_TO_DAMAGE, REST_EPSILON};

/// A resolved contact
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Impact {
    /// Fraction of the tick at which the bodies touch
    pub ratio: f64,
    /// Health removed from each body
    pub damage: f64,
}

/// Time of impact of two spheres over one tick, as a fraction of the tick
///
/// Bodies that already overlap report an immediate hit unless they are
/// separating. Bodies at rest relative to each other report an immediate hit
/// only if they overlap.
pub fn sweep(a: &Body, b: &Body, dt: f64) -> Option<f64> {
    let rel = (a.velocity - b.velocity) * dt;
    let max_range = rel.length();
    let delta = b.position - a.position;
    let distance = delta.length();
    let sum_radii = a.radius + b.radius;
    let gap = distance - sum_radii;

    if gap <= 0.0 {
        if max_range <= REST_EPSILON {
            return Some(0.0);
        }
        return if rel.dot(delta) <= 0.0 { None } else { Some(0.0) };
    }

    // Cannot close the gap this tick
    if max_range < gap {
        return None;
    }

    let dir = rel / max_range;
    let closing = dir.dot(delta);
    if closing <= 0.0 {
        return None;
    }

    // Squared distance of closest approach
    let f = distance * distance - closing * closing;
    let sum_sq = sum_radii * sum_radii;
    if f >= sum_sq {
        return None;
    }

    let travel = closing - (sum_sq - f).sqrt();
    if travel > max_range {
        return None;
    }
    Some((travel / max_range).max(0.0))
}

/// Exchange momentum along the contact normal and apply damage
///
/// Returns the damage dealt to each body. Damage is proportional to the
/// impulse an elastic collision would have added beyond the actual one, so a
/// restitution of 1 deals none.
pub fn resolve(a: &mut Body, b: &mut Body, cor: f64) -> f64 {
    let normal = (a.position - b.position).try_normalize().unwrap_or(DVec3::X);
    let (ima, imb) = (a.inverse_mass(), b.inverse_mass());
    let inverse_sum = ima + imb;
    if inverse_sum == 0.0 {
        return 0.0;
    }

    let vn = (a.velocity - b.velocity).dot(normal);
    if vn >= 0.0 {
        return 0.0;
    }

    let actual = -(1.0 + cor) * vn / inverse_sum;
    let elastic = -2.0 * vn / inverse_sum;
    let damage = IMPULSE_TO_DAMAGE * (elastic - actual);

    a.velocity += normal * (actual * ima);
    b.velocity -= normal * (actual * imb);
    a.health -= damage;
    b.health -= damage;
    damage
}

/// Detect and resolve a collision between two bodies over one tick
pub fn collide(a: &mut Body, b: &mut Body, dt: f64, cor: f64) -> Option<Impact> {
    if a.id() == b.id() {
        return None;
    }
    let ratio = sweep(a, b, dt)?;
    a.position += a.velocity * (ratio * dt);
    b.position += b.velocity * (ratio * dt);
    let damage = resolve(a, b, cor);
    Some(Impact { ratio, damage })
}

/// Two distinct mutable elements of a slice
pub(crate) fn pair_mut<T>(items: &mut [T], a: usize, b: usize) -> Option<(&mut T, &mut T)> {
    if a == b || a.max(b) >= items.len() {
        return None;
    }
    if a < b {
        let (low, high) = items.split_at_mut(b);
        Some((&mut low[a], &mut high[0]))
    } else {
        let (low, high) = items.split_at_mut(a);
        Some((&mut high[0], &mut low[b]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::{OBJECT_COR, PROJECTILE_COR};
    use crate::sim::body::ObjectId;
    use proptest::prelude::*;

    const DT: f64 = 0.01;

    fn body(id: u64, x: f64, vx: f64, mass: f64) -> Body {
        Body::new(ObjectId(id), DVec3::new(x, 0.0, 0.0), 1.0, mass, 100.0)
            .with_velocity(DVec3::new(vx, 0.0, 0.0))
    }

    #[test]
    fn test_static_apart_never_collide() {
        let mut a = body(1, 0.0, 0.0, 1.0);
        let mut b = body(2, 10.0, 0.0, 1.0);
        assert_eq!(sweep(&a, &b, DT), None);
        assert_eq!(collide(&mut a, &mut b, DT, OBJECT_COR), None);
    }

    #[test]
    fn test_static_overlap_is_immediate_and_harmless() {
        let mut a = body(1, 0.0, 0.0, 1.0);
        let mut b = body(2, 1.0, 0.0, 1.0);
        let impact = collide(&mut a, &mut b, DT, OBJECT_COR).unwrap();
        assert_eq!(impact.ratio, 0.0);
        assert_eq!(impact.damage, 0.0);
        assert_eq!(a.health, 100.0);

        // Coincident centres
        let mut c = body(3, 0.0, 0.0, 1.0);
        let mut d = body(4, 0.0, 0.0, 1.0);
        assert!(collide(&mut c, &mut d, DT, OBJECT_COR).is_some());
        assert!(c.position.is_finite() && c.velocity.is_finite());
    }

    #[test]
    fn test_overlap_with_approach_collides() {
        let mut a = body(1, 0.0, 50.0, 1.0);
        let mut b = body(2, 1.5, 0.0, 1.0);
        let impact = collide(&mut a, &mut b, DT, OBJECT_COR).unwrap();
        assert_eq!(impact.ratio, 0.0);
        assert!(impact.damage > 0.0);
        assert!(b.velocity.x > 0.0);
    }

    #[test]
    fn test_overlap_separating_is_ignored() {
        let a = body(1, 0.0, -50.0, 1.0);
        let b = body(2, 1.5, 0.0, 1.0);
        assert_eq!(sweep(&a, &b, DT), None);
    }

    #[test]
    fn test_elastic_swap_equal_masses() {
        let mut a = body(1, 0.0, 100.0, 1.0);
        let mut b = body(2, 2.5, 0.0, 1.0);
        let energy = a.kinetic_energy() + b.kinetic_energy();
        let impact = collide(&mut a, &mut b, DT, 1.0).unwrap();

        assert!((impact.ratio - 0.5).abs() < 1e-12);
        // Moved to the moment of contact
        assert!((a.position.x - 0.5).abs() < 1e-12);
        assert!((b.position.x - a.position.x - 2.0).abs() < 1e-12);
        assert!(a.velocity.length() < 1e-9);
        assert!((b.velocity.x - 100.0).abs() < 1e-9);
        assert!((a.kinetic_energy() + b.kinetic_energy() - energy).abs() < 1e-6);
        assert!((a.health - 100.0).abs() < 1e-5);
        assert!((b.health - 100.0).abs() < 1e-5);
    }

    #[test]
    fn test_immovable_body_is_unchanged() {
        let mut a = body(1, 0.0, 100.0, 1.0);
        let mut b = body(2, 2.5, 0.0, f64::INFINITY);
        collide(&mut a, &mut b, DT, 1.0).unwrap();
        assert_eq!(b.velocity, DVec3::ZERO);
        assert_eq!(b.position, DVec3::new(2.5, 0.0, 0.0));
        assert!((a.velocity.x + 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_inelastic_damages_both() {
        let mut a = body(1, 0.0, 100.0, 1.0);
        let mut b = body(2, 2.5, 0.0, 3.0);
        let impact = collide(&mut a, &mut b, DT, PROJECTILE_COR).unwrap();
        assert!(impact.damage > 0.0);
        assert!(a.health < 100.0);
        assert!(b.health < 100.0);
        assert_eq!(a.health, b.health);
    }

    #[test]
    fn test_moving_apart() {
        let a = body(1, 0.0, -100.0, 1.0);
        let b = body(2, 2.5, 0.0, 1.0);
        assert_eq!(sweep(&a, &b, DT), None);
    }

    #[test]
    fn test_near_miss() {
        let a = body(1, 0.0, 100.0, 1.0);
        let mut b = body(2, 1.5, 0.0, 1.0);
        b.position.y = 2.1;
        assert_eq!(sweep(&a, &b, DT), None);
    }

    #[test]
    fn test_chase_in_same_direction() {
        let mut a = body(1, 0.0, 200.0, 1.0);
        let mut b = body(2, 2.5, 100.0, 1.0);
        let impact = collide(&mut a, &mut b, DT, OBJECT_COR).unwrap();
        assert!((impact.ratio - 0.5).abs() < 1e-12);
        assert!((a.position.x - 1.0).abs() < 1e-12);
        assert!((b.position.x - 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_no_self_collision() {
        let mut a = body(1, 0.0, 0.0, 1.0);
        let mut same = a;
        assert_eq!(collide(&mut a, &mut same, DT, OBJECT_COR), None);
    }

    #[test]
    fn test_pair_mut() {
        let mut items = [1, 2, 3];
        let (a, b) = pair_mut(&mut items, 2, 0).unwrap();
        std::mem::swap(a, b);
        assert_eq!(items, [3, 2, 1]);
        assert!(pair_mut(&mut items, 1, 1).is_none());
        assert!(pair_mut(&mut items, 0, 3).is_none());
    }

    proptest! {
        #[test]
        fn prop_momentum_is_conserved(
            ma in 0.1..1e4f64, mb in 0.1..1e4f64,
            va in prop::array::uniform3(-500.0..500.0f64),
            vb in prop::array::uniform3(-500.0..500.0f64),
            offset in prop::array::uniform3(-3.0..3.0f64),
            cor in 0.0..=1.0f64,
        ) {
            let mut a = Body::new(ObjectId(1), DVec3::ZERO, 1.0, ma, 10.0)
                .with_velocity(DVec3::from_array(va));
            let mut b = Body::new(ObjectId(2), DVec3::from_array(offset), 1.0, mb, 10.0)
                .with_velocity(DVec3::from_array(vb));
            let before = a.velocity * ma + b.velocity * mb;
            let scale = (a.velocity * ma).length() + (b.velocity * mb).length();

            if let Some(impact) = collide(&mut a, &mut b, DT, cor) {
                let after = a.velocity * ma + b.velocity * mb;
                prop_assert!((after - before).length() <= 1e-9 * scale.max(1.0));
                prop_assert!(impact.damage >= 0.0);
                prop_assert!((0.0..=1.0).contains(&impact.ratio));
            }
        }
    }
}
