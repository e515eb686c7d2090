//! The multiplayer session: lobby roster, round lifecycle and win condition.
//!
//! A `Session` is owned by the tick loop and is the only place actor state is
//! mutated. Every operation returns the events to broadcast to the roster;
//! rejected commands return a `GameError` and leave the session untouched.

use crate::actor::Actor;
use crate::collision;
use crate::config::GameConfig;
use crate::error::GameError;
use crate::world::World;
use log::{debug, info, warn};
use shared::{LobbyEntry, Metadata, PlayerId, PlayersInfo, ServerEvent, Snapshot, Winner};
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Lobby,
    Countdown,
    Running,
    Over,
}

impl SessionStatus {
    /// Lowercase name used in logs and error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Lobby => "lobby",
            SessionStatus::Countdown => "countdown",
            SessionStatus::Running => "running",
            SessionStatus::Over => "over",
        }
    }
}

pub struct Session {
    config: GameConfig,
    status: SessionStatus,
    actors: HashMap<PlayerId, Actor>,
    /// Member ids in join order.
    join_order: Vec<PlayerId>,
    admin_id: Option<PlayerId>,
    test_mode: bool,
    world: World,
}

impl Session {
    /// Creates an empty session waiting in the lobby
    pub fn new(config: GameConfig) -> Self {
        let world = World::new(&config);
        Self {
            config,
            status: SessionStatus::Lobby,
            actors: HashMap::new(),
            join_order: Vec::new(),
            admin_id: None,
            test_mode: false,
            world,
        }
    }

    /// Current lifecycle state
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Member allowed to start, reset and toggle test mode
    pub fn admin_id(&self) -> Option<PlayerId> {
        self.admin_id
    }

    /// Whether collisions are currently ignored
    pub fn test_mode(&self) -> bool {
        self.test_mode
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// Looks up a member's bird
    pub fn actor(&self, id: PlayerId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    /// Returns true if `id` has joined
    pub fn contains(&self, id: PlayerId) -> bool {
        self.actors.contains_key(&id)
    }

    /// Member ids in join order
    pub fn member_ids(&self) -> Vec<PlayerId> {
        self.join_order.clone()
    }

    /// Returns the number of members
    pub fn len(&self) -> usize {
        self.actors.len()
    }

    /// Returns true if nobody has joined
    pub fn is_empty(&self) -> bool {
        self.actors.is_empty()
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Adds `id` to the roster, or renames it if it already joined.
    ///
    /// Joins outside the lobby are admitted as spectators until the next
    /// start.
    pub fn join(
        &mut self,
        id: PlayerId,
        username: &str,
        wants_admin: bool,
    ) -> Result<Vec<ServerEvent>, GameError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(GameError::MalformedInput("empty username".into()));
        }

        if let Some(actor) = self.actors.get_mut(&id) {
            actor.username = username.to_string();
            debug!("Player {} renamed to {}", id, username);
            return Ok(vec![self.lobby_update()]);
        }

        let mut actor = Actor::new(id, username, &self.config);
        if self.status != SessionStatus::Lobby {
            actor.bench(&self.config);
        }

        if self.admin_id.is_none() {
            actor.is_admin = true;
            self.admin_id = Some(id);
        } else if wants_admin {
            warn!("Player {} asked for admin but {:?} already holds it", id, self.admin_id);
        }

        info!(
            "Player {} joined as {} ({}, {})",
            id,
            username,
            if actor.is_admin { "admin" } else { "member" },
            self.status.as_str()
        );
        self.actors.insert(id, actor);
        self.join_order.push(id);

        Ok(vec![self.lobby_update()])
    }

    /// Removes `id` from the roster. Unknown ids are ignored.
    pub fn leave(&mut self, id: PlayerId) -> Vec<ServerEvent> {
        if self.actors.remove(&id).is_none() {
            return Vec::new();
        }
        self.join_order.retain(|member| *member != id);
        info!("Player {} left the session", id);

        if self.admin_id == Some(id) {
            self.admin_id = self.join_order.first().copied();
            if let Some(next) = self.admin_id {
                if let Some(actor) = self.actors.get_mut(&next) {
                    actor.is_admin = true;
                }
                info!("Admin passed to player {}", next);
            }
        }

        if self.actors.is_empty() {
            if self.status != SessionStatus::Lobby {
                info!("Session emptied while {}, back to lobby", self.status.as_str());
            }
            self.status = SessionStatus::Lobby;
            self.world.clear();
            return Vec::new();
        }

        let mut events = vec![self.lobby_update()];
        events.extend(self.evaluate_end());
        events
    }

    /// Begins a round from the lobby: respawns every member, lays out a fresh
    /// field and arms the countdown. Admin only.
    pub fn start(&mut self, by: PlayerId) -> Result<Vec<ServerEvent>, GameError> {
        self.require_admin(by, "start_game")?;
        if self.status != SessionStatus::Lobby {
            return Err(GameError::InvalidTransition {
                command: "start_game",
                status: self.status.as_str(),
            });
        }

        for actor in self.actors.values_mut() {
            actor.respawn(&self.config);
        }
        self.world.begin_round(&self.config);
        self.status = if self.config.countdown_ticks() == 0 {
            SessionStatus::Running
        } else {
            SessionStatus::Countdown
        };

        info!("Game started by {} with {} players", by, self.actors.len());
        Ok(vec![ServerEvent::GameStarted])
    }

    /// Returns to the lobby from any state. Membership and usernames survive.
    pub fn reset(&mut self, by: PlayerId) -> Result<Vec<ServerEvent>, GameError> {
        self.require_admin(by, "reset_game")?;

        for actor in self.actors.values_mut() {
            actor.respawn(&self.config);
        }
        self.world.clear();
        if self.status != SessionStatus::Lobby {
            info!("Game reset by {} from {}", by, self.status.as_str());
        }
        self.status = SessionStatus::Lobby;

        Ok(vec![ServerEvent::GameReset, self.lobby_update()])
    }

    /// Turns collision checks off or on. Admin only, valid in any state.
    ///
    /// Switching off forgives whatever each bird is touching at that moment
    /// until it separates, so nobody dies for a contact made while immune.
    pub fn set_test_mode(
        &mut self,
        by: PlayerId,
        enabled: bool,
    ) -> Result<Vec<ServerEvent>, GameError> {
        self.require_admin(by, "toggle_test_mode")?;

        if self.test_mode && !enabled {
            for actor in self.actors.values_mut().filter(|a| a.alive) {
                actor.grace = collision::contacts(actor, &self.world.field, &self.config);
            }
        }
        if self.test_mode != enabled {
            info!("Test mode {}", if enabled { "enabled" } else { "disabled" });
        }
        self.test_mode = enabled;

        Ok(vec![ServerEvent::TestModeStatus { enabled }])
    }

    /// Advances the session by one fixed step.
    pub fn tick(&mut self, flaps: &HashSet<PlayerId>) -> Vec<ServerEvent> {
        match self.status {
            SessionStatus::Lobby | SessionStatus::Over => Vec::new(),
            SessionStatus::Countdown => {
                let snapshot = self.game_state();
                if self.world.countdown_step() {
                    self.status = SessionStatus::Running;
                    info!("Countdown finished, round running");
                }
                vec![snapshot]
            }
            SessionStatus::Running => {
                let report = self.world.step(
                    self.actors.values_mut(),
                    flaps,
                    self.test_mode,
                    &self.config,
                );
                for (id, points) in &report.points {
                    debug!("Player {} scored {} on tick {}", id, points, self.world.tick);
                }

                let mut events = vec![self.game_state()];
                events.extend(self.evaluate_end());
                events
            }
        }
    }

    /// Renderer view of the round, keyed by player id
    pub fn snapshot(&self) -> Snapshot {
        let countdown_active = self.status == SessionStatus::Countdown;
        Snapshot {
            metadata: Metadata {
                game_data: self.world.game_data(countdown_active, &self.config),
            },
            actors: self
                .actors
                .values()
                .map(|actor| (actor.id.to_string(), actor.view()))
                .collect(),
        }
    }

    /// Scoreboard rows keyed by player id
    pub fn players_info(&self) -> PlayersInfo {
        self.actors
            .values()
            .map(|actor| (actor.id.to_string(), actor.info()))
            .collect::<BTreeMap<_, _>>()
    }

    /// Per-tick broadcast: snapshot plus scoreboard
    pub fn game_state(&self) -> ServerEvent {
        ServerEvent::GameState {
            game_data: self.snapshot(),
            players_info: self.players_info(),
        }
    }

    /// Roster in join order with the admin flag
    pub fn lobby_update(&self) -> ServerEvent {
        let players = self
            .join_order
            .iter()
            .filter_map(|id| self.actors.get(id))
            .map(|actor| LobbyEntry {
                username: actor.username.clone(),
                is_admin: actor.is_admin,
            })
            .collect();
        ServerEvent::LobbyUpdate { players }
    }

    fn require_admin(&self, by: PlayerId, command: &'static str) -> Result<(), GameError> {
        if !self.actors.contains_key(&by) {
            return Err(GameError::UnknownActor(by));
        }
        if self.admin_id != Some(by) {
            return Err(GameError::InvalidCommand { player: by, command });
        }
        Ok(())
    }

    /// Moves a running round to `Over` when it has ended and reports the
    /// winner.
    fn evaluate_end(&mut self) -> Option<ServerEvent> {
        if self.status != SessionStatus::Running {
            return None;
        }

        let finished = self.config.score_limit.is_some_and(|limit| {
            self.actors
                .values()
                .any(|actor| actor.alive && actor.score >= limit)
        });

        let candidates: Vec<&Actor> = if finished {
            self.actors.values().filter(|actor| actor.alive).collect()
        } else if self.actors.values().all(|actor| !actor.alive) {
            let last_death = self.actors.values().filter_map(|actor| actor.died_at).max();
            self.actors
                .values()
                .filter(|actor| last_death.is_some() && actor.died_at == last_death)
                .collect()
        } else {
            return None;
        };

        let winner = pick_winner(&candidates);
        self.status = SessionStatus::Over;
        match &winner {
            Some(winner) => info!("Game over, {} wins with {}", winner.username, winner.score),
            None => info!("Game over without a winner"),
        }
        Some(ServerEvent::GameOver { winner })
    }
}

/// Highest score among `candidates`; a shared top score has no winner.
fn pick_winner(candidates: &[&Actor]) -> Option<Winner> {
    let best = candidates
        .iter()
        .map(|actor| actor.score)
        .fold(None, |best: Option<f32>, score| {
            Some(best.map_or(score, |b| b.max(score)))
        })?;

    let mut leaders = candidates.iter().filter(|actor| actor.score == best);
    let leader = leaders.next()?;
    if leaders.next().is_some() {
        return None;
    }

    Some(Winner {
        username: leader.username.clone(),
        score: leader.score,
    })
}
