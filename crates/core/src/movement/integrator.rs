//! Acceleration-based velocity update
//!
//! All functions here are pure. Units are whatever the caller uses for `dt`
//! and the rates; the in-game tunables are per millisecond.

use strafe_sdk::Vec3;

use super::Tunables;
use crate::input::InputDirection;

/// Add speed toward `wish` without pushing the projected speed past `max_speed`
///
/// The speed added this step is `clamp(max_speed - proj, 0, rate * dt)` where
/// `proj` is the previous velocity projected onto `wish`.
pub fn accelerate(wish: Vec3, previous: Vec3, rate: f32, max_speed: f32, dt: f32) -> Vec3 {
    let projected = previous.dot(wish);
    let budget = (rate * dt).max(0.0);
    let add = (max_speed - projected).min(budget).max(0.0);
    previous + wish * add
}

/// Scale horizontal speed `s` down to `max(s - s * friction * dt, 0)`
pub fn apply_friction(velocity: Vec3, friction: f32, dt: f32) -> Vec3 {
    let speed = velocity.length_2d();
    if speed <= 0.0 {
        return velocity;
    }

    let decayed = (speed - speed * friction * dt).max(0.0);
    let scale = decayed / speed;
    Vec3::new(velocity.x * scale, velocity.y * scale, velocity.z)
}

/// Friction, then ground acceleration
pub fn ground(wish: Vec3, previous: Vec3, tunables: &Tunables, dt: f32) -> Vec3 {
    let slowed = apply_friction(previous, tunables.ground_friction, dt);
    accelerate(
        wish,
        slowed,
        tunables.ground_acceleration,
        tunables.max_ground_speed,
        dt,
    )
}

/// Air acceleration, no friction
pub fn air(wish: Vec3, previous: Vec3, tunables: &Tunables, dt: f32) -> Vec3 {
    accelerate(
        wish,
        previous,
        tunables.air_acceleration,
        tunables.max_air_speed,
        dt,
    )
}

/// Desired movement direction from facing and held keys
///
/// Forward input moves along `yaw - 90°`, strafe input along `yaw - 180°`
/// (the host's yaw is measured from +y). Each component is clamped to
/// `[-1, 1]`; vertical is always zero.
pub fn wish_direction(yaw_degrees: f32, input: &InputDirection) -> Vec3 {
    let forward = (yaw_degrees - 90.0).to_radians();
    let side = (yaw_degrees - 180.0).to_radians();

    let x = input.forward * forward.cos() + input.strafe * side.cos();
    let y = input.forward * forward.sin() + input.strafe * side.sin();

    Vec3::new(x.clamp(-1.0, 1.0), y.clamp(-1.0, 1.0), 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f32 = 1e-5;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < EPS
    }

    #[test]
    fn test_ground_scenario_from_rest() {
        let tunables = Tunables {
            ground_acceleration: 10.0,
            max_ground_speed: 2.0,
            ..Tunables::default()
        };

        let v = ground(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO, &tunables, 0.016);

        assert!(approx(v.x, 0.16));
        assert_eq!(v.y, 0.0);
        assert_eq!(v.z, 0.0);
    }

    #[test]
    fn test_accelerate_never_exceeds_max_projection() {
        let wishes = [
            Vec3::new(1.0, 0.0, 0.0),
            Vec3::new(0.0, -1.0, 0.0),
            Vec3::new(0.6, 0.8, 0.0),
            Vec3::new(-0.28, 0.96, 0.0),
        ];
        let starts = [
            Vec3::ZERO,
            Vec3::new(5.0, 5.0, 0.0),
            Vec3::new(-3.0, 1.0, 2.0),
            Vec3::new(0.9, 0.0, 0.0),
        ];
        let dts = [0.0, 0.001, 0.016, 1.0, 16.0, 250.0];

        for wish in wishes {
            for start in starts {
                for dt in dts {
                    let v = accelerate(wish, start, 10.0, 1.0, dt);
                    let before = start.dot(wish);
                    let after = v.dot(wish);
                    assert!(
                        after <= before.max(1.0) + EPS,
                        "wish {wish:?} start {start:?} dt {dt}: {after}"
                    );
                }
            }
        }
    }

    #[test]
    fn test_accelerate_with_zero_wish_is_identity() {
        let previous = Vec3::new(1.5, -2.0, 0.25);
        assert_eq!(accelerate(Vec3::ZERO, previous, 10.0, 5.0, 0.016), previous);
    }

    #[test]
    fn test_accelerate_does_not_brake_above_cap() {
        let previous = Vec3::new(3.0, 0.0, 0.0);
        let v = accelerate(Vec3::new(1.0, 0.0, 0.0), previous, 10.0, 1.0, 0.016);
        assert_eq!(v, previous);
    }

    #[test]
    fn test_negative_dt_adds_nothing() {
        let v = accelerate(Vec3::new(1.0, 0.0, 0.0), Vec3::ZERO, 10.0, 1.0, -1.0);
        assert_eq!(v, Vec3::ZERO);
    }

    #[test]
    fn test_friction_decay() {
        let v = apply_friction(Vec3::new(3.0, 4.0, 7.0), 0.1, 2.0);
        // s = 5, decayed = 5 - 5 * 0.1 * 2 = 4
        assert!(approx(v.length_2d(), 4.0));
        assert!(approx(v.x, 2.4));
        assert!(approx(v.y, 3.2));
        assert_eq!(v.z, 7.0);
    }

    #[test]
    fn test_friction_clamps_at_zero() {
        let v = apply_friction(Vec3::new(3.0, 4.0, 1.0), 1.0, 10.0);
        assert_eq!(v, Vec3::new(0.0, 0.0, 1.0));
    }

    #[test]
    fn test_friction_at_rest_is_noop() {
        let v = apply_friction(Vec3::new(0.0, 0.0, -2.0), 0.5, 16.0);
        assert_eq!(v, Vec3::new(0.0, 0.0, -2.0));
        assert!(!v.x.is_nan());
    }

    #[test]
    fn test_air_ignores_friction() {
        let tunables = Tunables {
            ground_friction: 1.0,
            ..Tunables::default()
        };
        let previous = Vec3::new(2.0, 0.0, 0.0);
        let v = air(Vec3::ZERO, previous, &tunables, 16.0);
        assert_eq!(v, previous);
    }

    #[test]
    fn test_wish_direction_forward() {
        let input = InputDirection {
            forward: 1.0,
            ..InputDirection::default()
        };

        // Facing yaw 90 walks along +x
        let wish = wish_direction(90.0, &input);
        assert!(approx(wish.x, 1.0));
        assert!(approx(wish.y, 0.0));
        assert_eq!(wish.z, 0.0);
    }

    #[test]
    fn test_wish_direction_strafe() {
        let input = InputDirection {
            strafe: 1.0,
            ..InputDirection::default()
        };

        // Left strafe at yaw 180 also walks along +x
        let wish = wish_direction(180.0, &input);
        assert!(approx(wish.x, 1.0));
        assert!(approx(wish.y, 0.0));
    }

    #[test]
    fn test_wish_direction_is_clamped_per_component() {
        let input = InputDirection {
            forward: 2.0,
            strafe: 0.0,
            jump: false,
        };

        let wish = wish_direction(90.0, &input);
        assert!(approx(wish.x, 1.0));
    }
}
