//! The simulation step shared by multiplayer and AI sessions.

use crate::actor::Actor;
use crate::collision::{self, Hit};
use crate::config::GameConfig;
use crate::obstacles::ObstacleField;
use crate::physics;
use log::debug;
use shared::{Action, Countdown, GameData, PlayerId};
use std::collections::HashSet;

/// What happened to the actors during one step.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StepReport {
    pub deaths: Vec<(PlayerId, Hit)>,
    pub points: Vec<(PlayerId, u32)>,
}

/// Obstacle field, tick counter and countdown of one session.
pub struct World {
    pub field: ObstacleField,
    pub tick: u64,
    countdown_ticks: u32,
}

impl World {
    /// Creates an idle world with an empty field
    pub fn new(config: &GameConfig) -> Self {
        let mut world = Self {
            field: ObstacleField::new(config),
            tick: 0,
            countdown_ticks: 0,
        };
        world.clear();
        world
    }

    /// Lays out a fresh field and arms the countdown.
    pub fn begin_round(&mut self, config: &GameConfig) {
        self.field.reset(config);
        self.tick = 0;
        self.countdown_ticks = config.countdown_ticks();
    }

    /// Empties the field. Calling it twice leaves the same state as once.
    pub fn clear(&mut self) {
        self.field.clear();
        self.tick = 0;
        self.countdown_ticks = 0;
    }

    /// Burns one countdown tick. Returns true once the countdown is over.
    pub fn countdown_step(&mut self) -> bool {
        self.countdown_ticks = self.countdown_ticks.saturating_sub(1);
        self.countdown_ticks == 0
    }

    /// Seconds left before the round runs
    pub fn countdown_remaining(&self, config: &GameConfig) -> f32 {
        self.countdown_ticks as f32 / config.tick_rate as f32
    }

    /// Advances the live actors, the field, then resolves collisions and
    /// scoring, in that order. Dead actors are frozen where they fell.
    pub fn step<'a, I>(
        &mut self,
        actors: I,
        flaps: &HashSet<PlayerId>,
        test_mode: bool,
        config: &GameConfig,
    ) -> StepReport
    where
        I: IntoIterator<Item = &'a mut Actor>,
    {
        let dt = config.tick_dt();
        self.tick += 1;

        let mut live: Vec<&mut Actor> = actors.into_iter().filter(|a| a.alive).collect();
        for actor in live.iter_mut() {
            let action = if flaps.contains(&actor.id) {
                Action::Flap
            } else {
                Action::None
            };
            physics::integrate(actor, action, dt, config);
        }

        self.field.advance(dt, config);

        let mut report = StepReport::default();
        for actor in live.iter_mut() {
            if !test_mode {
                if let Some(hit) = collision::detect(actor, &self.field, config) {
                    actor.kill(self.tick);
                    debug!("Actor {} died on tick {} ({:?})", actor.id, self.tick, hit);
                    report.deaths.push((actor.id, hit));
                    continue;
                }
            }

            let points = collision::score_passes(actor, &mut self.field, config);
            if points > 0 {
                report.points.push((actor.id, points));
            }
            actor.add_score(config.survival_reward);
        }

        report
    }

    /// Geometry, pipes and countdown as sent to renderers
    pub fn game_data(&self, countdown_active: bool, config: &GameConfig) -> GameData {
        GameData {
            screen_width: config.screen_width,
            screen_height: config.screen_height,
            pipe_width: config.pipe_width,
            ground_y: config.ground_y,
            pipes: self.field.views(),
            countdown: Countdown {
                active: countdown_active,
                remaining: if countdown_active {
                    self.countdown_remaining(config)
                } else {
                    0.0
                },
            },
        }
    }
}
