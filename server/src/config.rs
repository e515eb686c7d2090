//! Session configuration.
//!
//! Every tunable of the simulation lives here with a documented default, so
//! nothing in the engine reads ambient globals. Defaults reproduce the
//! browser game the clients were written against (288x512 screen, 40 Hz).

use crate::error::GameError;
use shared::{
    BIRD_HEIGHT, BIRD_WIDTH, BIRD_X, COUNTDOWN_SECS, FLAP_VELOCITY, GRAVITY, GROUND_Y,
    MAX_FALL_SPEED, MAX_ROTATION_DEG, PIPE_GAP, PIPE_SPACING, PIPE_WIDTH, SCREEN_HEIGHT,
    SCREEN_WIDTH, SCROLL_SPEED, TICK_RATE,
};

#[derive(Debug, Clone, PartialEq)]
pub struct GameConfig {
    pub screen_width: f32,
    pub screen_height: f32,
    /// Top edge of the ground plane.
    pub ground_y: f32,

    pub pipe_width: f32,
    /// Vertical distance between the upper and lower pipe of a pair.
    pub pipe_gap: f32,
    /// Horizontal distance between consecutive pipe pairs.
    pub pipe_spacing: f32,
    /// Smallest allowed bottom edge of an upper pipe.
    pub min_gap_y: f32,
    /// Smallest allowed height of a lower pipe above the ground.
    pub min_margin: f32,
    /// Distance past the right screen edge where the first pipe spawns.
    pub first_pipe_offset: f32,
    pub scroll_speed: f32,

    pub bird_x: f32,
    pub bird_width: f32,
    pub bird_height: f32,
    pub gravity: f32,
    pub flap_velocity: f32,
    pub max_fall_speed: f32,
    pub max_rotation_deg: f32,

    pub tick_rate: u32,
    pub countdown_secs: f32,
    /// Points granted to every live actor each running tick. The original
    /// browser game awarded 0.1; zero keeps scores equal to pipes passed.
    pub survival_reward: f32,
    /// Ends a multiplayer round once a live actor reaches this score.
    pub score_limit: Option<f32>,
    /// Seed for pipe placement; `None` draws from OS entropy.
    pub seed: Option<u64>,

    /// Seconds the AI projects its trajectory ahead.
    pub ai_lookahead_secs: f32,
    /// How far below the gap centre the projection may sink before flapping.
    pub ai_flap_threshold: f32,
    /// Ticks the AI searches ahead for a collision-free path.
    pub ai_search_ticks: u32,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            screen_width: SCREEN_WIDTH,
            screen_height: SCREEN_HEIGHT,
            ground_y: GROUND_Y,
            pipe_width: PIPE_WIDTH,
            pipe_gap: PIPE_GAP,
            pipe_spacing: PIPE_SPACING,
            min_gap_y: 50.0,
            min_margin: 50.0,
            first_pipe_offset: 100.0,
            scroll_speed: SCROLL_SPEED,
            bird_x: BIRD_X,
            bird_width: BIRD_WIDTH,
            bird_height: BIRD_HEIGHT,
            gravity: GRAVITY,
            flap_velocity: FLAP_VELOCITY,
            max_fall_speed: MAX_FALL_SPEED,
            max_rotation_deg: MAX_ROTATION_DEG,
            tick_rate: TICK_RATE,
            countdown_secs: COUNTDOWN_SECS,
            survival_reward: 0.0,
            score_limit: None,
            seed: None,
            ai_lookahead_secs: 0.15,
            ai_flap_threshold: 10.0,
            ai_search_ticks: 24,
        }
    }
}

impl GameConfig {
    /// Fixed simulation step in seconds.
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    /// Countdown length converted to whole ticks.
    pub fn countdown_ticks(&self) -> u32 {
        (self.countdown_secs * self.tick_rate as f32).ceil().max(0.0) as u32
    }

    pub fn spawn_y(&self) -> f32 {
        self.screen_height / 2.0
    }

    /// Lowest permitted top edge of an actor.
    pub fn floor_y(&self) -> f32 {
        self.ground_y - self.bird_height
    }

    /// Range for the bottom edge of an upper pipe.
    pub fn gap_range(&self) -> (f32, f32) {
        (
            self.min_gap_y,
            self.ground_y - self.pipe_gap - self.min_margin,
        )
    }

    /// Obstacles placed when a round starts.
    pub fn initial_pipe_count(&self) -> usize {
        (self.screen_width / self.pipe_spacing).ceil() as usize + 2
    }

    pub fn validate(&self) -> Result<(), GameError> {
        if self.tick_rate == 0 {
            return Err(GameError::InvalidConfig("tick rate must be positive".into()));
        }
        if self.pipe_width <= 0.0 || self.pipe_spacing <= self.pipe_width {
            return Err(GameError::InvalidConfig(format!(
                "pipe spacing {} must exceed pipe width {}",
                self.pipe_spacing, self.pipe_width
            )));
        }
        if self.pipe_gap <= self.bird_height {
            return Err(GameError::InvalidConfig(format!(
                "pipe gap {} cannot fit a bird of height {}",
                self.pipe_gap, self.bird_height
            )));
        }
        let (low, high) = self.gap_range();
        if low > high {
            return Err(GameError::InvalidConfig(format!(
                "no room for a {} px gap above ground at {}",
                self.pipe_gap, self.ground_y
            )));
        }
        if self.ground_y > self.screen_height || self.spawn_y() > self.floor_y() {
            return Err(GameError::InvalidConfig(
                "ground must sit below the spawn point and inside the screen".into(),
            ));
        }
        if self.gravity <= 0.0 || self.flap_velocity >= 0.0 || self.max_fall_speed <= 0.0 {
            return Err(GameError::InvalidConfig(
                "gravity must pull down and flaps must push up".into(),
            ));
        }
        if self.survival_reward < 0.0 || self.countdown_secs < 0.0 {
            return Err(GameError::InvalidConfig(
                "survival reward and countdown cannot be negative".into(),
            ));
        }
        Ok(())
    }
}
