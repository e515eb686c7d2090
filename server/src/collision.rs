//! Axis-aligned checks between actors, the ground, and pipe pairs.

use crate::actor::Actor;
use crate::config::GameConfig;
use crate::obstacles::{Obstacle, ObstacleField};

/// Why an actor died.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hit {
    Ground,
    Pipe { serial: u64 },
}

/// Strict overlap of two half-open ranges; touching edges do not collide.
fn overlaps(a_min: f32, a_max: f32, b_min: f32, b_max: f32) -> bool {
    a_min < b_max && b_min < a_max
}

pub fn hits_ground(actor: &Actor, config: &GameConfig) -> bool {
    actor.y + config.bird_height >= config.ground_y
}

/// True when the actor's box intersects the upper or lower pipe of `obstacle`.
pub fn hits_obstacle(actor: &Actor, obstacle: &Obstacle, config: &GameConfig) -> bool {
    let (left, top, right, bottom) = actor.bounds(config);

    if !overlaps(left, right, obstacle.x, obstacle.right_edge(config)) {
        return false;
    }

    let upper = overlaps(top, bottom, 0.0, obstacle.gap_upper_y);
    let lower = overlaps(top, bottom, obstacle.gap_lower_y, config.ground_y);
    upper || lower
}

/// Every surface the actor currently touches, ground before pipes.
pub fn contacts(actor: &Actor, field: &ObstacleField, config: &GameConfig) -> Vec<Hit> {
    let mut hits = Vec::new();
    if hits_ground(actor, config) {
        hits.push(Hit::Ground);
    }
    hits.extend(
        field
            .iter()
            .filter(|obstacle| hits_obstacle(actor, obstacle, config))
            .map(|obstacle| Hit::Pipe {
                serial: obstacle.serial,
            }),
    );
    hits
}

/// First fatal collision for the actor this tick.
///
/// Contacts listed in `actor.grace` are skipped while they persist and
/// forgotten as soon as the actor separates from them.
pub fn detect(actor: &mut Actor, field: &ObstacleField, config: &GameConfig) -> Option<Hit> {
    let current = contacts(actor, field, config);
    actor.grace.retain(|hit| current.contains(hit));
    current.into_iter().find(|hit| !actor.grace.contains(hit))
}

/// Awards one point for every pipe the actor has fully cleared since its
/// last score. Each actor scores each pipe once; the pipe's `counted` flag
/// records that somebody did. Returns the points awarded.
pub fn score_passes(actor: &mut Actor, field: &mut ObstacleField, config: &GameConfig) -> u32 {
    let mut points = 0;

    for obstacle in field.iter_mut() {
        let already_scored = actor
            .last_scored
            .is_some_and(|serial| obstacle.serial <= serial);
        if already_scored || obstacle.right_edge(config) >= actor.x {
            continue;
        }

        actor.last_scored = Some(obstacle.serial);
        actor.add_score(1.0);
        obstacle.counted = true;
        points += 1;
    }

    points
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Actor, ObstacleField, GameConfig) {
        let config = GameConfig {
            seed: Some(3),
            ..GameConfig::default()
        };
        let field = ObstacleField::new(&config);
        (Actor::new(1, "test", &config), field, config)
    }

    fn pipe_at(x: f32, gap_upper_y: f32, config: &GameConfig) -> Obstacle {
        Obstacle {
            serial: 0,
            x,
            gap_upper_y,
            gap_lower_y: gap_upper_y + config.pipe_gap,
            counted: false,
        }
    }

    #[test]
    fn test_ground_collision() {
        let (mut actor, _, config) = setup();
        assert!(!hits_ground(&actor, &config));

        actor.y = config.floor_y();
        assert!(hits_ground(&actor, &config));
    }

    #[test]
    fn test_inside_gap_is_safe() {
        let (mut actor, _, config) = setup();
        let pipe = pipe_at(actor.x, 100.0, &config);
        actor.y = 150.0;

        assert!(!hits_obstacle(&actor, &pipe, &config));
    }

    #[test]
    fn test_upper_pipe_collision() {
        let (mut actor, _, config) = setup();
        let pipe = pipe_at(actor.x + 10.0, 100.0, &config);
        actor.y = 90.0;

        assert!(hits_obstacle(&actor, &pipe, &config));
    }

    #[test]
    fn test_lower_pipe_collision() {
        let (mut actor, _, config) = setup();
        let pipe = pipe_at(actor.x - 10.0, 100.0, &config);
        actor.y = 100.0 + config.pipe_gap - config.bird_height + 1.0;

        assert!(hits_obstacle(&actor, &pipe, &config));
    }

    #[test]
    fn test_no_horizontal_overlap_no_collision() {
        let (mut actor, _, config) = setup();
        actor.y = 10.0;

        let ahead = pipe_at(actor.x + config.bird_width, 100.0, &config);
        assert!(!hits_obstacle(&actor, &ahead, &config));

        let behind = pipe_at(actor.x - config.pipe_width, 100.0, &config);
        assert!(!hits_obstacle(&actor, &behind, &config));
    }

    #[test]
    fn test_detect_reports_ground_first() {
        let (mut actor, field, config) = setup();
        actor.y = config.floor_y();
        assert_eq!(detect(&mut actor, &field, &config), Some(Hit::Ground));
    }

    #[test]
    fn test_detect_nothing_at_spawn() {
        let (mut actor, field, config) = setup();
        assert_eq!(detect(&mut actor, &field, &config), None);
        assert!(contacts(&actor, &field, &config).is_empty());
    }

    #[test]
    fn test_grace_forgives_existing_contact_until_separation() {
        let (mut actor, field, config) = setup();
        actor.y = config.floor_y();
        actor.grace = contacts(&actor, &field, &config);

        assert_eq!(detect(&mut actor, &field, &config), None);
        assert_eq!(actor.grace, vec![Hit::Ground]);

        // Leaving the ground drops the grace; touching it again is fatal.
        actor.y = config.spawn_y();
        assert_eq!(detect(&mut actor, &field, &config), None);
        assert!(actor.grace.is_empty());

        actor.y = config.floor_y();
        assert_eq!(detect(&mut actor, &field, &config), Some(Hit::Ground));
    }

    #[test]
    fn test_score_once_per_pipe() {
        let (mut actor, mut field, config) = setup();

        if let Some(obstacle) = field.iter_mut().next() {
            obstacle.x = actor.x - config.pipe_width - 1.0;
        }

        assert_eq!(score_passes(&mut actor, &mut field, &config), 1);
        assert_eq!(score_passes(&mut actor, &mut field, &config), 0);
        assert_eq!(actor.score, 1.0);
        assert!(field.iter().next().is_some_and(|o| o.counted));
    }

    #[test]
    fn test_each_actor_scores_shared_pipe() {
        let (mut first, mut field, config) = setup();
        let mut second = Actor::new(2, "other", &config);

        if let Some(obstacle) = field.iter_mut().next() {
            obstacle.x = first.x - config.pipe_width - 1.0;
        }

        assert_eq!(score_passes(&mut first, &mut field, &config), 1);
        assert_eq!(score_passes(&mut second, &mut field, &config), 1);
        assert_eq!(first.score, 1.0);
        assert_eq!(second.score, 1.0);
    }

    #[test]
    fn test_no_score_before_clearing_pipe() {
        let (mut actor, mut field, config) = setup();

        if let Some(obstacle) = field.iter_mut().next() {
            obstacle.x = actor.x - config.pipe_width + 1.0;
        }

        assert_eq!(score_passes(&mut actor, &mut field, &config), 0);
        assert_eq!(actor.score, 0.0);
    }
}
