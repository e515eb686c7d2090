//! Vertical motion of a single actor.

use crate::actor::Actor;
use crate::config::GameConfig;
use shared::Action;

/// Advances one actor by `dt` seconds.
///
/// A flap replaces the vertical velocity with the flap impulse; otherwise
/// gravity accelerates the fall up to the terminal speed. The actor stays
/// within `[0, ground_y - bird_height]`. Touching the ground is not handled
/// here; the collision pass turns it into a death.
pub fn integrate(actor: &mut Actor, action: Action, dt: f32, config: &GameConfig) {
    match action {
        Action::Flap => actor.velocity_y = config.flap_velocity,
        Action::None => actor.velocity_y += config.gravity * dt,
    }
    actor.velocity_y = actor.velocity_y.min(config.max_fall_speed);

    actor.y += actor.velocity_y * dt;

    if actor.y <= 0.0 {
        actor.y = 0.0;
        actor.velocity_y = actor.velocity_y.max(0.0);
    }
    let floor = config.floor_y();
    if actor.y >= floor {
        actor.y = floor;
        actor.velocity_y = 0.0;
    }

    actor.rotation_deg = rotation_for(actor.velocity_y, config);
}

/// Pitch in degrees for a vertical velocity: nose up while rising, nose down
/// while diving, linear in between and clamped at the configured maximum.
pub fn rotation_for(velocity_y: f32, config: &GameConfig) -> f32 {
    let ratio = velocity_y / config.max_fall_speed;
    (ratio * config.max_rotation_deg).clamp(-config.max_rotation_deg, config.max_rotation_deg)
}
