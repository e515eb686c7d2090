//! Procedurally generated pipe pairs scrolling right to left.

use crate::config::GameConfig;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::PipeView;
use std::collections::VecDeque;

/// An upper/lower pipe pair with a fixed-height gap between them.
#[derive(Debug, Clone, PartialEq)]
pub struct Obstacle {
    /// Spawn order, unique within a field.
    pub serial: u64,
    /// Left edge.
    pub x: f32,
    /// Bottom edge of the upper pipe.
    pub gap_upper_y: f32,
    /// Top edge of the lower pipe.
    pub gap_lower_y: f32,
    /// Set once the first actor scores this pipe.
    pub counted: bool,
}

impl Obstacle {
    /// Trailing edge; once it is behind a bird the pipe counts as passed
    pub fn right_edge(&self, config: &GameConfig) -> f32 {
        self.x + config.pipe_width
    }

    pub fn gap_center(&self) -> f32 {
        (self.gap_upper_y + self.gap_lower_y) / 2.0
    }

    pub fn view(&self) -> PipeView {
        PipeView {
            x: self.x,
            upper_y: self.gap_upper_y,
            lower_y: self.gap_lower_y,
        }
    }
}

/// Ordered pipe pairs, leftmost first.
pub struct ObstacleField {
    obstacles: VecDeque<Obstacle>,
    rng: StdRng,
    next_serial: u64,
}

impl ObstacleField {
    /// Creates a field filled for a fresh round.
    pub fn new(config: &GameConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut field = Self {
            obstacles: VecDeque::new(),
            rng,
            next_serial: 0,
        };
        field.reset(config);
        field
    }

    /// Discards every pipe and lays out the initial run. The generator keeps
    /// its state, so consecutive rounds get different layouts.
    pub fn reset(&mut self, config: &GameConfig) {
        self.obstacles.clear();
        let first_x = config.screen_width + config.first_pipe_offset;
        for i in 0..config.initial_pipe_count() {
            self.spawn(first_x + i as f32 * config.pipe_spacing, config);
        }
    }

    /// Removes every pipe without touching the generator
    pub fn clear(&mut self) {
        self.obstacles.clear();
    }

    /// Scrolls every pipe left and recycles the ones that left the screen.
    pub fn advance(&mut self, dt: f32, config: &GameConfig) {
        let shift = config.scroll_speed * dt;
        for obstacle in self.obstacles.iter_mut() {
            obstacle.x -= shift;
        }

        while self
            .obstacles
            .front()
            .is_some_and(|front| front.right_edge(config) < 0.0)
        {
            self.obstacles.pop_front();
            let next_x = self
                .obstacles
                .back()
                .map(|last| last.x + config.pipe_spacing)
                .unwrap_or(config.screen_width + config.first_pipe_offset);
            self.spawn(next_x, config);
        }
    }

    /// Pipes ordered left to right
    pub fn iter(&self) -> impl Iterator<Item = &Obstacle> {
        self.obstacles.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Obstacle> {
        self.obstacles.iter_mut()
    }

    /// Returns the number of pipes on the field
    pub fn len(&self) -> usize {
        self.obstacles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.obstacles.is_empty()
    }

    /// First pipe whose right edge is not yet behind `x`.
    pub fn next_upcoming(&self, x: f32, config: &GameConfig) -> Option<&Obstacle> {
        self.obstacles
            .iter()
            .find(|obstacle| obstacle.right_edge(config) >= x)
    }

    /// Renderer view of every pipe
    pub fn views(&self) -> Vec<PipeView> {
        self.obstacles.iter().map(Obstacle::view).collect()
    }

    fn spawn(&mut self, x: f32, config: &GameConfig) {
        let gap_upper_y = self.random_gap_top(config);
        let obstacle = Obstacle {
            serial: self.next_serial,
            x,
            gap_upper_y,
            gap_lower_y: gap_upper_y + config.pipe_gap,
            counted: false,
        };
        self.next_serial += 1;
        self.obstacles.push_back(obstacle);
    }

    /// Whole-pixel positions keep `gap_lower_y - gap_upper_y` exact in f32.
    fn random_gap_top(&mut self, config: &GameConfig) -> f32 {
        let (low, high) = config.gap_range();
        let (low, high) = (low.ceil() as i32, high.floor() as i32);
        if high <= low {
            return low as f32;
        }
        self.rng.gen_range(low..=high) as f32
    }
}
