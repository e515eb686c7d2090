//! The single owner of all session state.
//!
//! `Game` accepts inbound client events at any time, buffering them in its
//! mailbox, and applies them only inside `tick`. Each tick yields the list of
//! events to deliver and who should receive them; the network layer turns
//! those into datagrams.

use crate::ai_session::AiSession;
use crate::config::GameConfig;
use crate::error::GameError;
use crate::mailbox::{Command, Mailbox};
use crate::session::Session;
use log::{debug, warn};
use shared::{Action, ClientEvent, PlayerId, ServerEvent};
use std::collections::HashMap;

/// An outbound event and its recipients.
#[derive(Debug, Clone, PartialEq)]
pub struct Dispatch {
    pub to: Vec<PlayerId>,
    pub event: ServerEvent,
}

pub struct Game {
    config: GameConfig,
    session: Session,
    ai_sessions: HashMap<PlayerId, AiSession>,
    mailbox: Mailbox,
}

impl Game {
    /// Creates the engine after validating `config`
    pub fn new(config: GameConfig) -> Result<Self, GameError> {
        config.validate()?;
        Ok(Self {
            session: Session::new(config.clone()),
            config,
            ai_sessions: HashMap::new(),
            mailbox: Mailbox::new(),
        })
    }

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The shared multiplayer session
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// A client's private AI game, if it started one
    pub fn ai_session(&self, player: PlayerId) -> Option<&AiSession> {
        self.ai_sessions.get(&player)
    }

    /// Returns the number of queued commands and flaps
    pub fn pending(&self) -> usize {
        self.mailbox.len()
    }

    /// Validates an event from connection `from` and queues it for the next
    /// tick. Transport events (connect, heartbeat, ...) are not game input and
    /// are rejected here.
    pub fn enqueue(&mut self, from: PlayerId, event: ClientEvent) -> Result<(), GameError> {
        let name = event.name();
        match event {
            ClientEvent::JoinGame { username, is_admin } => {
                if username.trim().is_empty() {
                    return Err(GameError::MalformedInput("empty username".into()));
                }
                self.mailbox.push(Command::Join {
                    player: from,
                    username,
                    is_admin,
                });
            }
            ClientEvent::StartGame => self.mailbox.push(Command::Start(from)),
            ClientEvent::ResetGame => self.mailbox.push(Command::Reset(from)),
            ClientEvent::ToggleTestMode { enabled } => self.mailbox.push(Command::SetTestMode {
                player: from,
                enabled,
            }),
            ClientEvent::GetAllPlayers => self.mailbox.push(Command::GetAllPlayers(from)),
            ClientEvent::UpdatePosition { player_id, action } => {
                // A connection may only steer its own bird.
                if player_id != from {
                    return Err(GameError::UnknownActor(player_id));
                }
                if parse_action(action)? == Action::Flap {
                    self.mailbox.flap(from);
                }
            }
            ClientEvent::StartAiGame { username } => self.mailbox.push(Command::StartAi {
                player: from,
                username,
            }),
            ClientEvent::UpdateAiPosition { action } => {
                if parse_action(action)? == Action::Flap {
                    self.mailbox.ai_flap(from);
                }
            }
            ClientEvent::ResetAiGame => self.mailbox.push(Command::ResetAi(from)),
            ClientEvent::Connect { .. } | ClientEvent::Disconnect | ClientEvent::Heartbeat => {
                return Err(GameError::MalformedInput(format!(
                    "{} is not a game event",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Forgets a connection: pending input is dropped and it leaves every
    /// session at the next tick.
    pub fn remove_client(&mut self, player: PlayerId) {
        self.mailbox.forget(player);
        self.mailbox.push(Command::Leave(player));
    }

    /// Applies the mailbox, then advances every session by one step.
    pub fn tick(&mut self) -> Vec<Dispatch> {
        let drained = self.mailbox.drain();
        let mut out = Vec::new();

        for command in drained.commands {
            let player = command.player();
            if let Err(e) = self.apply(command, &mut out) {
                log_rejection(player, &e);
            }
        }

        for event in self.session.tick(&drained.flaps) {
            out.push(self.broadcast(event));
        }

        for (player, ai_session) in self.ai_sessions.iter_mut() {
            let flap = drained.ai_flaps.contains(player);
            for event in ai_session.tick(flap) {
                out.push(Dispatch {
                    to: vec![*player],
                    event,
                });
            }
        }

        out
    }

    fn apply(&mut self, command: Command, out: &mut Vec<Dispatch>) -> Result<(), GameError> {
        match command {
            Command::Join {
                player,
                username,
                is_admin,
            } => {
                let events = self.session.join(player, &username, is_admin)?;
                self.broadcast_all(events, out);
                // A mid-round joiner needs the current test mode flag too.
                out.push(Dispatch {
                    to: vec![player],
                    event: ServerEvent::TestModeStatus {
                        enabled: self.session.test_mode(),
                    },
                });
            }
            Command::Leave(player) => {
                self.ai_sessions.remove(&player);
                let events = self.session.leave(player);
                self.broadcast_all(events, out);
            }
            Command::Start(player) => {
                let events = self.session.start(player)?;
                self.broadcast_all(events, out);
            }
            Command::Reset(player) => {
                let events = self.session.reset(player)?;
                self.broadcast_all(events, out);
            }
            Command::SetTestMode { player, enabled } => {
                let events = self.session.set_test_mode(player, enabled)?;
                self.broadcast_all(events, out);
            }
            Command::GetAllPlayers(player) => {
                out.push(Dispatch {
                    to: vec![player],
                    event: ServerEvent::AllPlayersInfo(self.session.players_info()),
                });
            }
            Command::StartAi { player, username } => {
                let events = match self.ai_sessions.get_mut(&player) {
                    Some(ai_session) => ai_session.start(&username)?,
                    None => {
                        if username.trim().is_empty() {
                            return Err(GameError::MalformedInput("empty username".into()));
                        }
                        self.ai_sessions
                            .insert(player, AiSession::new(&username, self.config.clone()));
                        vec![ServerEvent::AiGameStarted]
                    }
                };
                out.extend(events.into_iter().map(|event| Dispatch {
                    to: vec![player],
                    event,
                }));
            }
            Command::ResetAi(player) => {
                let ai_session = self
                    .ai_sessions
                    .get_mut(&player)
                    .ok_or(GameError::UnknownActor(player))?;
                out.extend(ai_session.reset().into_iter().map(|event| Dispatch {
                    to: vec![player],
                    event,
                }));
            }
        }
        Ok(())
    }

    fn broadcast(&self, event: ServerEvent) -> Dispatch {
        Dispatch {
            to: self.session.member_ids(),
            event,
        }
    }

    fn broadcast_all(&self, events: Vec<ServerEvent>, out: &mut Vec<Dispatch>) {
        out.extend(events.into_iter().map(|event| self.broadcast(event)));
    }
}

fn parse_action(value: u8) -> Result<Action, GameError> {
    Action::try_from(value)
        .map_err(|other| GameError::MalformedInput(format!("unknown action {}", other)))
}

/// Rejected commands never reach clients; they are only logged.
fn log_rejection(player: PlayerId, error: &GameError) {
    match error {
        GameError::InvalidCommand { .. } => warn!("Rejected command from {}: {}", player, error),
        _ => debug!("Dropped command from {}: {}", player, error),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStatus;

    fn game() -> Game {
        Game::new(GameConfig {
            seed: Some(21),
            ..GameConfig::default()
        })
        .unwrap()
    }

    fn join(game: &mut Game, player: PlayerId, name: &str) {
        game.enqueue(
            player,
            ClientEvent::JoinGame {
                username: name.to_string(),
                is_admin: false,
            },
        )
        .unwrap();
    }

    fn events_named<'a>(out: &'a [Dispatch], name: &str) -> Vec<&'a Dispatch> {
        out.iter().filter(|d| d.event.name() == name).collect()
    }

    #[test]
    fn test_rejects_invalid_config() {
        let result = Game::new(GameConfig {
            tick_rate: 0,
            ..GameConfig::default()
        });
        assert!(matches!(result, Err(GameError::InvalidConfig(_))));
    }

    #[test]
    fn test_commands_wait_for_tick() {
        let mut game = game();
        join(&mut game, 1, "alice");

        assert!(game.session().is_empty());
        assert_eq!(game.pending(), 1);

        let out = game.tick();
        assert!(game.session().contains(1));
        assert_eq!(events_named(&out, "lobby_update").len(), 1);
        assert_eq!(events_named(&out, "lobby_update")[0].to, vec![1]);
    }

    #[test]
    fn test_steering_another_bird_is_rejected() {
        let mut game = game();
        let result = game.enqueue(
            1,
            ClientEvent::UpdatePosition {
                player_id: 2,
                action: 1,
            },
        );
        assert_eq!(result, Err(GameError::UnknownActor(2)));
        assert_eq!(game.pending(), 0);
    }

    #[test]
    fn test_garbled_action_is_rejected() {
        let mut game = game();
        let result = game.enqueue(
            1,
            ClientEvent::UpdatePosition {
                player_id: 1,
                action: 9,
            },
        );
        assert!(matches!(result, Err(GameError::MalformedInput(_))));
        assert!(game
            .enqueue(1, ClientEvent::UpdateAiPosition { action: 3 })
            .is_err());
    }

    #[test]
    fn test_transport_events_are_not_game_input() {
        let mut game = game();
        assert!(game.enqueue(1, ClientEvent::Heartbeat).is_err());
        assert!(game
            .enqueue(1, ClientEvent::Connect { client_version: 1 })
            .is_err());
    }

    #[test]
    fn test_non_admin_start_is_dropped_silently() {
        let mut game = game();
        join(&mut game, 1, "alice");
        join(&mut game, 2, "bob");
        game.tick();

        game.enqueue(2, ClientEvent::StartGame).unwrap();
        let out = game.tick();

        assert!(events_named(&out, "game_started").is_empty());
        assert_eq!(game.session().status(), SessionStatus::Lobby);
    }

    #[test]
    fn test_start_broadcasts_to_roster() {
        let mut game = game();
        join(&mut game, 1, "alice");
        join(&mut game, 2, "bob");
        game.tick();

        game.enqueue(1, ClientEvent::StartGame).unwrap();
        let out = game.tick();

        let started = events_named(&out, "game_started");
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].to, vec![1, 2]);
        // The countdown snapshot goes out on the same tick.
        assert_eq!(events_named(&out, "game_state").len(), 1);
    }

    #[test]
    fn test_toggle_test_mode_is_broadcast_same_tick() {
        let mut game = game();
        join(&mut game, 1, "alice");
        game.tick();

        game.enqueue(1, ClientEvent::ToggleTestMode { enabled: true })
            .unwrap();
        let out = game.tick();

        let status = events_named(&out, "test_mode_status");
        assert_eq!(status.len(), 1);
        assert_eq!(
            status[0].event,
            ServerEvent::TestModeStatus { enabled: true }
        );
    }

    #[test]
    fn test_get_all_players_answers_requester_only() {
        let mut game = game();
        join(&mut game, 1, "alice");
        join(&mut game, 2, "bob");
        game.tick();

        game.enqueue(2, ClientEvent::GetAllPlayers).unwrap();
        let out = game.tick();

        let info = events_named(&out, "all_players_info");
        assert_eq!(info.len(), 1);
        assert_eq!(info[0].to, vec![2]);
        match &info[0].event {
            ServerEvent::AllPlayersInfo(players) => assert_eq!(players.len(), 2),
            other => panic!("Expected players info, got {:?}", other),
        }
    }

    #[test]
    fn test_repeated_flaps_collapse_into_one_impulse() {
        let mut game = game();
        join(&mut game, 1, "alice");
        game.tick();
        game.enqueue(1, ClientEvent::StartGame).unwrap();
        game.tick();
        while game.session().status() == SessionStatus::Countdown {
            game.tick();
        }

        for _ in 0..5 {
            game.enqueue(
                1,
                ClientEvent::UpdatePosition {
                    player_id: 1,
                    action: 1,
                },
            )
            .unwrap();
        }
        game.tick();

        let actor = game.session().actor(1).unwrap();
        assert_eq!(actor.velocity_y, game.config().flap_velocity);
    }

    #[test]
    fn test_remove_client_leaves_session() {
        let mut game = game();
        join(&mut game, 1, "alice");
        join(&mut game, 2, "bob");
        game.tick();

        game.enqueue(1, ClientEvent::StartGame).unwrap();
        game.remove_client(1);
        let out = game.tick();

        // The queued start was dropped with the connection.
        assert!(events_named(&out, "game_started").is_empty());
        assert!(!game.session().contains(1));
        assert_eq!(game.session().admin_id(), Some(2));
    }

    #[test]
    fn test_ai_game_is_private() {
        let mut game = game();
        join(&mut game, 1, "alice");
        game.enqueue(
            2,
            ClientEvent::StartAiGame {
                username: "bob".to_string(),
            },
        )
        .unwrap();

        let out = game.tick();

        let started = events_named(&out, "ai_game_started");
        assert_eq!(started.len(), 1);
        assert_eq!(started[0].to, vec![2]);
        for dispatch in events_named(&out, "ai_game_state") {
            assert_eq!(dispatch.to, vec![2]);
        }
        assert!(!game.session().contains(2));
        assert!(game.ai_session(2).is_some());
    }

    #[test]
    fn test_reset_unknown_ai_game_is_dropped() {
        let mut game = game();
        game.enqueue(5, ClientEvent::ResetAiGame).unwrap();
        let out = game.tick();
        assert!(out.is_empty());
    }

    #[test]
    fn test_ai_reset_and_restart() {
        let mut game = game();
        game.enqueue(
            2,
            ClientEvent::StartAiGame {
                username: "bob".to_string(),
            },
        )
        .unwrap();
        game.tick();

        game.enqueue(2, ClientEvent::ResetAiGame).unwrap();
        let out = game.tick();
        assert_eq!(events_named(&out, "ai_game_reset").len(), 1);
        assert_eq!(
            game.ai_session(2).map(|s| s.status()),
            Some(SessionStatus::Lobby)
        );

        game.enqueue(
            2,
            ClientEvent::StartAiGame {
                username: "bob".to_string(),
            },
        )
        .unwrap();
        let out = game.tick();
        assert_eq!(events_named(&out, "ai_game_started").len(), 1);
        assert_eq!(
            game.ai_session(2).map(|s| s.status()),
            Some(SessionStatus::Countdown)
        );
    }
}
