//! Headless client that joins the multiplayer session and flaps with the AI
//! controller. Useful for filling a lobby or soak-testing a server.

use clap::Parser;
use log::{debug, info, warn};
use server::ai;
use server::config::GameConfig;
use shared::{
    Action, ClientEvent, PlayerId, ServerEvent, Snapshot, WireFormat, PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::{interval, timeout};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Server address to connect to
    #[arg(short = 's', long, default_value = "127.0.0.1:8080")]
    server: String,

    /// Name shown in the lobby
    #[arg(short = 'n', long, default_value = "bot")]
    username: String,

    /// Ask for admin and start the game once joined
    #[arg(long)]
    start: bool,

    /// Seconds to play before disconnecting
    #[arg(short = 'd', long, default_value = "60")]
    duration: u64,
}

/// Tracks the bot's own bird between snapshots to estimate its velocity.
struct Pilot {
    config: GameConfig,
    last: Option<(f32, Instant)>,
}

impl Pilot {
    fn new() -> Self {
        Self {
            config: GameConfig::default(),
            last: None,
        }
    }

    fn decide(&mut self, id: PlayerId, snapshot: &Snapshot) -> Action {
        let Some(me) = snapshot.actor(id) else {
            return Action::None;
        };
        if !me.alive {
            self.last = None;
            return Action::None;
        }

        let now = Instant::now();
        let y = me.position.y;
        let velocity_y = match self.last {
            Some((prev_y, at)) => {
                let dt = now.duration_since(at).as_secs_f32();
                if dt > 0.0 {
                    (y - prev_y) / dt
                } else {
                    0.0
                }
            }
            None => 0.0,
        };
        self.last = Some((y, now));

        let game_data = &snapshot.metadata.game_data;
        let gap_center = game_data
            .pipes
            .iter()
            .find(|pipe| pipe.x + game_data.pipe_width >= me.position.x)
            .map(|pipe| (pipe.upper_y + pipe.lower_y) / 2.0)
            .unwrap_or(game_data.ground_y / 2.0);

        let center_y = y + self.config.bird_height / 2.0;
        ai::decide_for_target(center_y, velocity_y, gap_center, &self.config)
    }
}

async fn send(
    socket: &UdpSocket,
    server: SocketAddr,
    event: &ClientEvent,
) -> Result<(), Box<dyn std::error::Error>> {
    let data = WireFormat::Bincode.encode(event)?;
    socket.send_to(&data, server).await?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let server = args.server.parse::<SocketAddr>()?;
    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    info!("Bot socket bound to {}", socket.local_addr()?);

    send(
        &socket,
        server,
        &ClientEvent::Connect {
            client_version: PROTOCOL_VERSION,
        },
    )
    .await?;

    let mut buf = [0u8; 8192];
    let (len, _) = timeout(Duration::from_secs(5), socket.recv_from(&mut buf)).await??;
    let client_id = match WireFormat::Bincode.decode::<ServerEvent>(&buf[..len])? {
        ServerEvent::Connected { client_id } => client_id,
        ServerEvent::Disconnected { reason } => {
            warn!("Server refused connection: {}", reason);
            return Ok(());
        }
        other => {
            warn!("Expected connected but got {}", other.name());
            return Ok(());
        }
    };
    info!("Connected with client ID: {}", client_id);

    send(
        &socket,
        server,
        &ClientEvent::JoinGame {
            username: args.username.clone(),
            is_admin: args.start,
        },
    )
    .await?;
    if args.start {
        send(&socket, server, &ClientEvent::StartGame).await?;
    }

    let mut pilot = Pilot::new();
    let mut heartbeat = interval(Duration::from_secs(1));
    let deadline = tokio::time::sleep(Duration::from_secs(args.duration));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = &mut deadline => break,
            _ = heartbeat.tick() => {
                send(&socket, server, &ClientEvent::Heartbeat).await?;
            }
            received = socket.recv_from(&mut buf) => {
                let (len, _) = received?;
                let event = match WireFormat::Bincode.decode::<ServerEvent>(&buf[..len]) {
                    Ok(event) => event,
                    Err(e) => {
                        warn!("Failed to decode server event: {}", e);
                        continue;
                    }
                };

                match event {
                    ServerEvent::GameState { game_data, .. } => {
                        if pilot.decide(client_id, &game_data) == Action::Flap {
                            let flap = ClientEvent::UpdatePosition {
                                player_id: client_id,
                                action: 1,
                            };
                            send(&socket, server, &flap).await?;
                        }
                    }
                    ServerEvent::GameOver { winner } => match winner {
                        Some(winner) => info!("Game over, {} won with {}", winner.username, winner.score),
                        None => info!("Game over without a winner"),
                    },
                    ServerEvent::Disconnected { reason } => {
                        warn!("Disconnected by server: {}", reason);
                        return Ok(());
                    }
                    other => debug!("Received {}", other.name()),
                }
            }
        }
    }

    send(&socket, server, &ClientEvent::Disconnect).await?;
    info!("Bot finished");

    Ok(())
}
