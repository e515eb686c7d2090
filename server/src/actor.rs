use crate::collision::Hit;
use crate::config::GameConfig;
use shared::{ActorView, PlayerId, PlayerInfo, Position};

/// A simulated bird, human or AI.
#[derive(Debug, Clone, PartialEq)]
pub struct Actor {
    pub id: PlayerId,
    pub username: String,
    pub is_admin: bool,
    pub x: f32,
    /// Top edge; grows downward.
    pub y: f32,
    pub velocity_y: f32,
    pub rotation_deg: f32,
    pub alive: bool,
    pub score: f32,
    /// Tick on which the actor died, `None` while alive or spectating.
    pub died_at: Option<u64>,
    /// Spawn serial of the most recent obstacle this actor scored.
    pub last_scored: Option<u64>,
    /// Contacts that began while test mode was on. They stay harmless until
    /// the actor separates from them.
    pub grace: Vec<Hit>,
}

impl Actor {
    pub fn new(id: PlayerId, username: impl Into<String>, config: &GameConfig) -> Self {
        Self {
            id,
            username: username.into(),
            is_admin: false,
            x: config.bird_x,
            y: config.spawn_y(),
            velocity_y: 0.0,
            rotation_deg: 0.0,
            alive: true,
            score: 0.0,
            died_at: None,
            last_scored: None,
            grace: Vec::new(),
        }
    }

    /// Puts the actor back at the spawn point with a clean round state.
    pub fn respawn(&mut self, config: &GameConfig) {
        self.x = config.bird_x;
        self.y = config.spawn_y();
        self.velocity_y = 0.0;
        self.rotation_deg = 0.0;
        self.alive = true;
        self.score = 0.0;
        self.died_at = None;
        self.last_scored = None;
        self.grace.clear();
    }

    /// Parks the actor outside the current round (late joiners, lobby).
    pub fn bench(&mut self, config: &GameConfig) {
        self.respawn(config);
        self.alive = false;
    }

    /// Marks the actor dead. Returns false if it already was.
    pub fn kill(&mut self, tick: u64) -> bool {
        if !self.alive {
            return false;
        }
        self.alive = false;
        self.died_at = Some(tick);
        true
    }

    pub fn add_score(&mut self, points: f32) {
        if points > 0.0 {
            self.score += points;
        }
    }

    /// Bounding box as (left, top, right, bottom).
    pub fn bounds(&self, config: &GameConfig) -> (f32, f32, f32, f32) {
        (
            self.x,
            self.y,
            self.x + config.bird_width,
            self.y + config.bird_height,
        )
    }

    pub fn center_y(&self, config: &GameConfig) -> f32 {
        self.y + config.bird_height / 2.0
    }

    pub fn view(&self) -> ActorView {
        ActorView {
            position: Position {
                x: self.x,
                y: self.y,
                rotation: self.rotation_deg,
            },
            alive: self.alive,
            score: self.score,
            username: self.username.clone(),
        }
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            username: self.username.clone(),
            score: self.score,
            alive: self.alive,
        }
    }
}
