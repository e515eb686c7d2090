//! Server network layer handling UDP communications and game loop coordination

use crate::client_manager::{ClientManager, CLIENT_TIMEOUT};
use crate::config::GameConfig;
use crate::game::{Dispatch, Game};
use crate::scheduler::TickClock;
use log::{debug, error, info, warn};
use shared::{ClientEvent, CodecError, PlayerId, ServerEvent, WireFormat, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, MissedTickBehavior};

/// Largest datagram the receiver accepts. Longer ones arrive truncated and
/// fail to decode.
const RECV_BUFFER: usize = 4096;

/// Decodes one datagram in whichever format it arrived in.
fn decode_datagram(bytes: &[u8]) -> Result<(ClientEvent, WireFormat), CodecError> {
    let wire = WireFormat::detect(bytes);
    let event = wire.decode(bytes)?;
    Ok((event, wire))
}

/// Messages sent from network tasks to main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        event: ClientEvent,
        wire: WireFormat,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: PlayerId,
    },
    Shutdown,
}

/// Messages sent from game loop to network tasks
#[derive(Debug)]
pub enum GameMessage {
    /// Reply to a single address, used before a client has an id.
    SendEvent {
        event: ServerEvent,
        addr: SocketAddr,
        wire: WireFormat,
    },
    /// Deliver to connected clients by id.
    Deliver {
        event: ServerEvent,
        to: Vec<PlayerId>,
    },
}

/// Main server coordinating networking and game simulation
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    game: Game,
    clock: TickClock,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
}

impl Server {
    pub async fn new(
        addr: &str,
        config: GameConfig,
        max_clients: usize,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let clock = TickClock::new(config.tick_rate);
        let game = Game::new(config)?;
        let socket = Arc::new(UdpSocket::bind(addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(max_clients))),
            game,
            clock,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Sender that stops `run` when given `ServerMessage::Shutdown`.
    pub fn control(&self) -> mpsc::UnboundedSender<ServerMessage> {
        self.server_tx.clone()
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; RECV_BUFFER];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        match decode_datagram(&buffer[..len]) {
                            Ok((event, wire)) => {
                                if let Err(e) =
                                    server_tx.send(ServerMessage::PacketReceived { event, wire, addr })
                                {
                                    error!("Failed to send packet to main loop: {}", e);
                                    break;
                                }
                            }
                            Err(e) => warn!("Dropping malformed datagram from {}: {}", addr, e),
                        }
                    }
                    Err(e) => {
                        error!("Error receiving packet: {}", e);
                        tokio::time::sleep(Duration::from_millis(10)).await;
                    }
                }
            }
        });
    }

    /// Spawns task that processes the outgoing queue. Failed sends are logged
    /// and dropped.
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            while let Some(message) = game_rx.recv().await {
                match message {
                    GameMessage::SendEvent { event, addr, wire } => {
                        match wire.encode(&event) {
                            Ok(data) => {
                                if let Err(e) = socket.send_to(&data, addr).await {
                                    error!("Failed to send {} to {}: {}", event.name(), addr, e);
                                }
                            }
                            Err(e) => error!("Failed to encode {}: {}", event.name(), e),
                        }
                    }
                    GameMessage::Deliver { event, to } => {
                        let routes = {
                            let clients_guard = clients.read().await;
                            clients_guard.route(&to)
                        };
                        Self::deliver(&socket, &event, routes).await;
                    }
                }
            }
        });
    }

    /// Encodes `event` at most once per wire format and sends it to every
    /// route.
    async fn deliver(socket: &UdpSocket, event: &ServerEvent, routes: Vec<(SocketAddr, WireFormat)>) {
        let mut json: Option<Vec<u8>> = None;
        let mut binary: Option<Vec<u8>> = None;

        for (addr, wire) in routes {
            let slot = match wire {
                WireFormat::Json => &mut json,
                WireFormat::Bincode => &mut binary,
            };
            if slot.is_none() {
                match wire.encode(event) {
                    Ok(data) => *slot = Some(data),
                    Err(e) => {
                        error!("Failed to encode {} as {:?}: {}", event.name(), wire, e);
                        continue;
                    }
                }
            }
            if let Some(data) = slot.as_deref() {
                if let Err(e) = socket.send_to(data, addr).await {
                    error!("Failed to send {} to {}: {}", event.name(), addr, e);
                }
            }
        }
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts(CLIENT_TIMEOUT)
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        return;
                    }
                }
            }
        });
    }

    fn send_event(&self, event: ServerEvent, addr: SocketAddr, wire: WireFormat) {
        if let Err(e) = self.game_tx.send(GameMessage::SendEvent { event, addr, wire }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn dispatch(&self, dispatch: Dispatch) {
        if dispatch.to.is_empty() {
            return;
        }
        if let Err(e) = self.game_tx.send(GameMessage::Deliver {
            event: dispatch.event,
            to: dispatch.to,
        }) {
            error!("Failed to queue broadcast packet: {}", e);
        }
    }

    /// Handles transport events itself and forwards everything else to the
    /// game mailbox.
    async fn handle_packet(&mut self, event: ClientEvent, wire: WireFormat, addr: SocketAddr) {
        match event {
            ClientEvent::Connect { client_version } => {
                info!("Client connecting from {} (version: {})", addr, client_version);

                if client_version != PROTOCOL_VERSION {
                    let reason = "Protocol version mismatch".to_string();
                    self.send_event(ServerEvent::Disconnected { reason }, addr, wire);
                    return;
                }

                // Remove existing connection if present
                let existing_client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(existing_id) = existing_client_id {
                    info!("Removing existing client {} from {}", existing_id, addr);
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&existing_id);
                    self.game.remove_client(existing_id);
                }

                let client_id = {
                    let mut clients = self.clients.write().await;
                    clients.add_client(addr, wire)
                };

                match client_id {
                    Some(client_id) => {
                        self.send_event(ServerEvent::Connected { client_id }, addr, wire)
                    }
                    None => {
                        let reason = "Server full".to_string();
                        self.send_event(ServerEvent::Disconnected { reason }, addr, wire);
                    }
                }
            }

            ClientEvent::Disconnect => {
                let client_id = {
                    let clients = self.clients.read().await;
                    clients.find_client_by_addr(addr)
                };

                if let Some(client_id) = client_id {
                    let mut clients = self.clients.write().await;
                    clients.remove_client(&client_id);
                    self.game.remove_client(client_id);
                }
            }

            event => {
                let client_id = {
                    let mut clients = self.clients.write().await;
                    let client_id = clients.find_client_by_addr(addr);
                    if let Some(id) = client_id {
                        clients.touch(id);
                    }
                    client_id
                };

                let Some(client_id) = client_id else {
                    warn!("{} from unconnected address {}", event.name(), addr);
                    return;
                };

                if matches!(event, ClientEvent::Heartbeat) {
                    return;
                }

                let name = event.name();
                if let Err(e) = self.game.enqueue(client_id, event) {
                    debug!("Dropped {} from client {}: {}", name, client_id, e);
                }
            }
        }
    }

    /// Runs every simulation step owed since the last wake-up.
    fn run_ticks(&mut self, now: Instant) {
        for _ in 0..self.clock.advance(now) {
            for dispatch in self.game.tick() {
                self.dispatch(dispatch);
            }
        }
    }

    /// Main server loop coordinating all operations
    pub async fn run(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        // Initialize concurrent tasks
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let mut tick_interval = interval(self.clock.step());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let report_every = u64::from(self.game.config().tick_rate) * 5;
        let mut wakeups: u64 = 0;

        info!("Server started successfully");

        loop {
            tokio::select! {
                // Handle network events
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { event, wire, addr }) => {
                            self.handle_packet(event, wire, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            info!("Client {} timed out", client_id);
                            self.game.remove_client(client_id);
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                // Handle server tick events
                _ = tick_interval.tick() => {
                    self.run_ticks(Instant::now());

                    wakeups += 1;
                    if report_every > 0 && wakeups % report_every == 0 {
                        let client_count = {
                            let clients = self.clients.read().await;
                            clients.len()
                        };
                        if client_count > 0 {
                            debug!(
                                "Tick {}: {} clients, {} in session, status {}",
                                self.game.session().world().tick,
                                client_count,
                                self.game.session().len(),
                                self.game.session().status().as_str()
                            );
                        }
                    }
                },
            }
        }

        Ok(())
    }
}
