//! Connection tracking for the UDP server
//!
//! This module owns the transport-level view of every client:
//! - Connection lifecycle (connect, disconnect, timeout)
//! - The wire format each client speaks, so replies match its requests
//! - Capacity limits and address-to-id lookup
//!
//! Game membership lives in the session; a connection that never joins is
//! tracked here only.

use log::info;
use shared::{PlayerId, WireFormat};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// Clients silent for longer than this are dropped.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A connected client
#[derive(Debug)]
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: PlayerId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Encoding of the client's first datagram
    pub wire: WireFormat,
}

impl Client {
    pub fn new(id: PlayerId, addr: SocketAddr, wire: WireFormat) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            wire,
        }
    }

    /// Checks if the client has exceeded the connection timeout
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected clients
///
/// Ids are never reused within a server run, so a late packet from a dropped
/// connection can not be mistaken for a newer client.
pub struct ClientManager {
    clients: HashMap<PlayerId, Client>,
    next_client_id: PlayerId,
    max_clients: usize,
}

impl ClientManager {
    /// Creates a new client manager with the specified capacity limit
    ///
    /// Client IDs start from 1 and increment for each new connection.
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Attempts to add a new client connection
    ///
    /// Returns Some(client_id) if successful, None if server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr, wire: WireFormat) -> Option<PlayerId> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} connected from {} ({:?})", client_id, addr, wire);
        self.clients
            .insert(client_id, Client::new(client_id, addr, wire));

        Some(client_id)
    }

    /// Removes a client. Returns false if it was already gone.
    pub fn remove_client(&mut self, client_id: &PlayerId) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} disconnected", client.id);
            true
        } else {
            false
        }
    }

    /// Finds a client ID by their network address
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<PlayerId> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    /// Records activity from a client. Returns false if the id is unknown.
    pub fn touch(&mut self, client_id: PlayerId) -> bool {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.last_seen = Instant::now();
            true
        } else {
            false
        }
    }

    /// Checks for and removes timed-out clients
    ///
    /// Returns the removed ids so the game can drop them from its sessions.
    pub fn check_timeouts(&mut self, timeout: Duration) -> Vec<PlayerId> {
        let timed_out: Vec<PlayerId> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            self.remove_client(client_id);
        }

        timed_out
    }

    /// Resolves recipient ids to (address, format) pairs, skipping ids that
    /// are no longer connected.
    pub fn route(&self, recipients: &[PlayerId]) -> Vec<(SocketAddr, WireFormat)> {
        recipients
            .iter()
            .filter_map(|id| self.clients.get(id))
            .map(|client| (client.addr, client.wire))
            .collect()
    }

    /// Returns the number of currently connected clients
    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Returns true if no clients are currently connected
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    #[test]
    fn test_client_creation() {
        let addr = test_addr();
        let client = Client::new(1, addr, WireFormat::Json);

        assert_eq!(client.id, 1);
        assert_eq!(client.addr, addr);
        assert_eq!(client.wire, WireFormat::Json);
    }

    #[test]
    fn test_client_timeout() {
        let mut client = Client::new(1, test_addr(), WireFormat::Bincode);

        assert!(!client.is_timed_out(Duration::from_secs(1)));

        client.last_seen = Instant::now() - Duration::from_secs(2);

        assert!(client.is_timed_out(Duration::from_secs(1)));
    }

    #[test]
    fn test_client_manager_creation() {
        let manager = ClientManager::new(5);
        assert_eq!(manager.max_clients, 5);
        assert!(manager.is_empty());
        assert_eq!(manager.len(), 0);
    }

    #[test]
    fn test_add_multiple_clients() {
        let mut manager = ClientManager::new(3);

        let client_id1 = manager.add_client(test_addr(), WireFormat::Json).unwrap();
        let client_id2 = manager
            .add_client(test_addr2(), WireFormat::Bincode)
            .unwrap();

        assert_eq!(client_id1, 1);
        assert_eq!(client_id2, 2);
        assert_eq!(manager.len(), 2);
    }

    #[test]
    fn test_add_client_max_capacity() {
        let mut manager = ClientManager::new(1);

        assert!(manager.add_client(test_addr(), WireFormat::Json).is_some());
        assert!(manager.add_client(test_addr2(), WireFormat::Json).is_none());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut manager = ClientManager::new(2);

        let first = manager.add_client(test_addr(), WireFormat::Json).unwrap();
        manager.remove_client(&first);
        let second = manager.add_client(test_addr(), WireFormat::Json).unwrap();

        assert_ne!(first, second);
    }

    #[test]
    fn test_remove_nonexistent_client() {
        let mut manager = ClientManager::new(2);

        assert!(!manager.remove_client(&999));
        assert_eq!(manager.len(), 0);
    }

    #[test]
    fn test_find_client_by_addr() {
        let mut manager = ClientManager::new(2);

        let client_id1 = manager.add_client(test_addr(), WireFormat::Json).unwrap();
        manager.add_client(test_addr2(), WireFormat::Json).unwrap();

        assert_eq!(manager.find_client_by_addr(test_addr()), Some(client_id1));

        let unknown_addr: SocketAddr = "192.168.1.1:9999".parse().unwrap();
        assert_eq!(manager.find_client_by_addr(unknown_addr), None);
    }

    #[test]
    fn test_touch_refreshes_last_seen() {
        let mut manager = ClientManager::new(2);
        let id = manager.add_client(test_addr(), WireFormat::Json).unwrap();

        if let Some(client) = manager.clients.get_mut(&id) {
            client.last_seen = Instant::now() - Duration::from_secs(10);
        }
        assert!(manager.touch(id));
        assert!(manager.check_timeouts(CLIENT_TIMEOUT).is_empty());
        assert!(!manager.touch(999));
    }

    #[test]
    fn test_check_timeouts_removes_silent_clients() {
        let mut manager = ClientManager::new(3);
        let quiet = manager.add_client(test_addr(), WireFormat::Json).unwrap();
        let active = manager
            .add_client(test_addr2(), WireFormat::Bincode)
            .unwrap();

        if let Some(client) = manager.clients.get_mut(&quiet) {
            client.last_seen = Instant::now() - Duration::from_secs(6);
        }

        assert_eq!(manager.check_timeouts(CLIENT_TIMEOUT), vec![quiet]);
        assert_eq!(manager.len(), 1);
        assert_eq!(manager.find_client_by_addr(test_addr2()), Some(active));
    }

    #[test]
    fn test_route_keeps_each_clients_format() {
        let mut manager = ClientManager::new(3);
        let json = manager.add_client(test_addr(), WireFormat::Json).unwrap();
        let binary = manager
            .add_client(test_addr2(), WireFormat::Bincode)
            .unwrap();

        let routes = manager.route(&[json, binary, 999]);

        assert_eq!(
            routes,
            vec![
                (test_addr(), WireFormat::Json),
                (test_addr2(), WireFormat::Bincode)
            ]
        );
    }
}
