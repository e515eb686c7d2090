//! One human against the computer, isolated from the multiplayer roster.

use crate::actor::Actor;
use crate::ai;
use crate::config::GameConfig;
use crate::error::GameError;
use crate::session::SessionStatus;
use crate::world::World;
use log::{debug, info};
use shared::{Action, AiMetadata, AiSnapshot, PlayerId, ServerEvent, Winner};
use std::collections::HashSet;

const PLAYER_ID: PlayerId = 0;
const AI_ID: PlayerId = 1;
const AI_NAME: &str = "AI";

/// Which side of an AI game came out ahead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Player,
    Ai,
}

impl Side {
    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Player => "player",
            Side::Ai => "ai",
        }
    }
}

pub struct AiSession {
    config: GameConfig,
    status: SessionStatus,
    player: Actor,
    ai: Actor,
    world: World,
    winner: Option<Side>,
}

impl AiSession {
    /// Creates the session and immediately starts its first round.
    pub fn new(username: &str, config: GameConfig) -> Self {
        let player = Actor::new(PLAYER_ID, username, &config);
        let ai = Actor::new(AI_ID, AI_NAME, &config);
        let world = World::new(&config);

        let mut session = Self {
            config,
            status: SessionStatus::Lobby,
            player,
            ai,
            world,
            winner: None,
        };
        session.begin_round();
        session
    }

    /// Current lifecycle state
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    pub fn player(&self) -> &Actor {
        &self.player
    }

    pub fn ai(&self) -> &Actor {
        &self.ai
    }

    /// Side that won the last finished round, if any
    pub fn winner(&self) -> Option<Side> {
        self.winner
    }

    /// Starts another round. Only valid once the previous one is over or
    /// was reset.
    pub fn start(&mut self, username: &str) -> Result<Vec<ServerEvent>, GameError> {
        if matches!(self.status, SessionStatus::Countdown | SessionStatus::Running) {
            return Err(GameError::InvalidTransition {
                command: "start_ai_game",
                status: self.status.as_str(),
            });
        }

        let username = username.trim();
        if !username.is_empty() {
            self.player.username = username.to_string();
        }
        self.begin_round();
        Ok(vec![ServerEvent::AiGameStarted])
    }

    /// Stops the round and clears the field. A later start begins afresh.
    pub fn reset(&mut self) -> Vec<ServerEvent> {
        self.player.respawn(&self.config);
        self.ai.respawn(&self.config);
        self.world.clear();
        self.winner = None;
        self.status = SessionStatus::Lobby;
        vec![ServerEvent::AiGameReset]
    }

    /// Advances the round by one fixed step. The AI decides its own flap;
    /// `player_flap` carries the human's queued input. The first death ends
    /// the round.
    pub fn tick(&mut self, player_flap: bool) -> Vec<ServerEvent> {
        match self.status {
            SessionStatus::Lobby | SessionStatus::Over => Vec::new(),
            SessionStatus::Countdown => {
                let state = ServerEvent::AiGameState(self.snapshot());
                if self.world.countdown_step() {
                    self.status = SessionStatus::Running;
                }
                vec![state]
            }
            SessionStatus::Running => {
                let mut flaps = HashSet::new();
                if player_flap {
                    flaps.insert(PLAYER_ID);
                }
                if ai::decide(&self.ai, &self.world.field, &self.config) == Action::Flap {
                    flaps.insert(AI_ID);
                }

                let report = self.world.step(
                    [&mut self.player, &mut self.ai],
                    &flaps,
                    false,
                    &self.config,
                );
                if report.deaths.is_empty() {
                    return vec![ServerEvent::AiGameState(self.snapshot())];
                }

                self.winner = self.decide_winner();
                self.status = SessionStatus::Over;
                debug!("AI game deaths on tick {}: {:?}", self.world.tick, report.deaths);
                info!(
                    "AI game over, winner: {}",
                    self.winner.map_or("none", |side| side.as_str())
                );

                vec![
                    ServerEvent::AiGameState(self.snapshot()),
                    ServerEvent::AiGameOver {
                        winner: self.winner.map(|side| self.winner_entry(side)),
                    },
                ]
            }
        }
    }

    /// Renderer view with both birds and the round outcome
    pub fn snapshot(&self) -> AiSnapshot {
        let countdown_active = self.status == SessionStatus::Countdown;
        AiSnapshot {
            player: self.player.view(),
            ai: self.ai.view(),
            metadata: AiMetadata {
                game_over: self.status == SessionStatus::Over,
                winner: self.winner.map(|side| side.as_str().to_string()),
                game_data: self.world.game_data(countdown_active, &self.config),
            },
        }
    }

    fn begin_round(&mut self) {
        self.player.respawn(&self.config);
        self.ai.respawn(&self.config);
        self.world.begin_round(&self.config);
        self.winner = None;
        self.status = if self.config.countdown_ticks() == 0 {
            SessionStatus::Running
        } else {
            SessionStatus::Countdown
        };
        info!("AI game started for {}", self.player.username);
    }

    /// The survivor wins; if both died together the higher score does.
    fn decide_winner(&self) -> Option<Side> {
        match (self.player.alive, self.ai.alive) {
            (true, false) => Some(Side::Player),
            (false, true) => Some(Side::Ai),
            _ if self.player.score > self.ai.score => Some(Side::Player),
            _ if self.ai.score > self.player.score => Some(Side::Ai),
            _ => None,
        }
    }

    fn winner_entry(&self, side: Side) -> Winner {
        let actor = match side {
            Side::Player => &self.player,
            Side::Ai => &self.ai,
        };
        Winner {
            username: actor.username.clone(),
            score: actor.score,
        }
    }
}
