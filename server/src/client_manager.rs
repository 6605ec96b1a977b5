//! Connection bookkeeping for participants reaching the server over UDP
//!
//! This module tracks who is connected and from where:
//! - Participant id assignment on connect
//! - Address lookup for routing outbound packets
//! - Activity tracking and timeout detection
//! - Capacity enforcement
//!
//! Rooms never see addresses; they address participants by id and the
//! network layer resolves the id here.

use log::info;
use shared::{HeroClass, ParticipantId};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// What a participant told us about themselves when connecting.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub name: String,
    /// Out-of-room character level; caps defense upgrades.
    pub character_level: u32,
    pub class: HeroClass,
}

/// A connected participant
#[derive(Debug)]
pub struct Client {
    /// Participant id assigned by the server
    pub id: ParticipantId,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    pub profile: Profile,
}

impl Client {
    pub fn new(id: ParticipantId, addr: SocketAddr, profile: Profile) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            profile,
        }
    }

    /// Marks the client as active. Any packet counts as a heartbeat.
    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    /// Returns true if nothing arrived from this client within `timeout`
    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected clients
///
/// Participant ids start at 1 and are never reused while the process runs,
/// so a stale id held by a room can never address a newer connection.
pub struct ClientManager {
    /// Connected clients indexed by participant id
    clients: HashMap<ParticipantId, Client>,
    /// Next available participant id
    next_client_id: ParticipantId,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
    timeout: Duration,
}

impl ClientManager {
    pub fn new(max_clients: usize, timeout: Duration) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
            timeout,
        }
    }

    /// Attempts to add a new client connection
    ///
    /// Returns the new participant id, or None if the server is at capacity.
    pub fn add_client(&mut self, addr: SocketAddr, profile: Profile) -> Option<ParticipantId> {
        // Enforce server capacity limits
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        info!("Client {} ({}) connected from {}", client_id, profile.name, addr);
        self.clients.insert(client_id, Client::new(client_id, addr, profile));

        Some(client_id)
    }

    /// Removes a client. Returns true if the client was found.
    pub fn remove_client(&mut self, client_id: &ParticipantId) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} disconnected", client.id);
            true
        } else {
            false
        }
    }

    /// Finds a participant id by network address
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<ParticipantId> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    pub fn addr_of(&self, client_id: ParticipantId) -> Option<SocketAddr> {
        self.clients.get(&client_id).map(|c| c.addr)
    }

    pub fn get(&self, client_id: ParticipantId) -> Option<&Client> {
        self.clients.get(&client_id)
    }

    /// Records activity. Returns false for unknown participants.
    pub fn touch(&mut self, client_id: ParticipantId) -> bool {
        match self.clients.get_mut(&client_id) {
            Some(client) => {
                client.touch();
                true
            }
            None => false,
        }
    }

    /// Removes and returns every client that went silent for longer than
    /// the configured timeout.
    pub fn check_timeouts(&mut self) -> Vec<ParticipantId> {
        let timeout = self.timeout;
        let timed_out: Vec<ParticipantId> = self
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

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
