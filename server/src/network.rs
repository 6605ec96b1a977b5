//! UDP front end: connections, lobby and routing into rooms

use crate::client_manager::{ClientManager, Profile};
use crate::config::ServerConfig;
use crate::defense::HeroSeat;
use crate::error::ServerError;
use crate::gateway::{ChannelGateway, Delivery};
use crate::lobby::{Lobby, LobbyOutcome};
use crate::registry::{RoomPlan, RoomRegistry, RoomSpawner};
use crate::results::ResultSink;
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{ClientPacket, Intent, ParticipantId, ServerPacket, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::sync::{mpsc, RwLock};
use tokio::time::interval;

/// Messages sent from network tasks to the main server loop
#[derive(Debug)]
pub enum ServerMessage {
    PacketReceived {
        packet: ClientPacket,
        addr: SocketAddr,
    },
    ClientTimeout {
        client_id: ParticipantId,
    },
    #[allow(dead_code)]
    Shutdown,
}

/// Packets addressed by socket address rather than participant, for
/// clients that have no participant id yet
#[derive(Debug)]
pub enum GameMessage {
    SendPacket { packet: ServerPacket, addr: SocketAddr },
}

/// Main server: owns the socket, the connection table and the lobby, and
/// spawns one task per room
pub struct Server {
    socket: Arc<UdpSocket>,
    clients: Arc<RwLock<ClientManager>>,
    lobby: Lobby,
    spawner: RoomSpawner,

    // Communication channels
    server_tx: mpsc::UnboundedSender<ServerMessage>,
    server_rx: mpsc::UnboundedReceiver<ServerMessage>,
    game_tx: mpsc::UnboundedSender<GameMessage>,
    game_rx: mpsc::UnboundedReceiver<GameMessage>,
    deliveries: mpsc::UnboundedReceiver<Delivery>,
}

impl Server {
    pub async fn new(config: ServerConfig, sink: Arc<dyn ResultSink>) -> Result<Self, ServerError> {
        let socket = Arc::new(UdpSocket::bind(&config.bind_addr).await?);
        info!("Server listening on {}", socket.local_addr()?);

        let (server_tx, server_rx) = mpsc::unbounded_channel();
        let (game_tx, game_rx) = mpsc::unbounded_channel();
        let (gateway, deliveries) = ChannelGateway::new();
        let spawner = RoomSpawner::new(RoomRegistry::new(), Arc::new(gateway), sink, config.room);

        Ok(Server {
            socket,
            clients: Arc::new(RwLock::new(ClientManager::new(
                config.max_clients,
                config.client_timeout,
            ))),
            lobby: Lobby::new(),
            spawner,
            server_tx,
            server_rx,
            game_tx,
            game_rx,
            deliveries,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.socket.local_addr()?)
    }

    pub fn registry(&self) -> &RoomRegistry {
        self.spawner.registry()
    }

    /// Spawns task that continuously listens for incoming packets
    fn spawn_network_receiver(&self) {
        let socket = Arc::clone(&self.socket);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 2048];

            loop {
                match socket.recv_from(&mut buffer).await {
                    Ok((len, addr)) => {
                        if let Ok(packet) = deserialize::<ClientPacket>(&buffer[0..len]) {
                            if let Err(e) =
                                server_tx.send(ServerMessage::PacketReceived { packet, addr })
                            {
                                error!("Failed to send packet to main loop: {}", e);
                                break;
                            }
                        } else {
                            warn!("Failed to deserialize packet from {}", addr);
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

    /// Spawns task that drains both outgoing queues: room deliveries by
    /// participant and direct replies by address
    fn spawn_network_sender(&mut self) {
        let socket = Arc::clone(&self.socket);
        let clients = Arc::clone(&self.clients);
        let mut game_rx = std::mem::replace(&mut self.game_rx, mpsc::unbounded_channel().1);
        let mut deliveries = std::mem::replace(&mut self.deliveries, mpsc::unbounded_channel().1);

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    Some(GameMessage::SendPacket { packet, addr }) = game_rx.recv() => {
                        if let Err(e) = Self::send_packet_impl(&socket, &packet, addr).await {
                            error!("Failed to send packet to {}: {}", addr, e);
                        }
                    }
                    Some(delivery) = deliveries.recv() => {
                        let addr = clients.read().await.addr_of(delivery.participant);
                        match addr {
                            Some(addr) => {
                                if let Err(e) = Self::send_packet_impl(&socket, &delivery.packet, addr).await {
                                    error!("Failed to send to participant {}: {}", delivery.participant, e);
                                }
                            }
                            None => debug!("Participant {} is gone, dropping packet", delivery.participant),
                        }
                    }
                    else => break,
                }
            }
        });
    }

    /// Spawns task that monitors client timeouts
    fn spawn_timeout_checker(&self) {
        let clients = Arc::clone(&self.clients);
        let server_tx = self.server_tx.clone();

        tokio::spawn(async move {
            let mut interval = interval(Duration::from_secs(1));

            loop {
                interval.tick().await;

                let timed_out = {
                    let mut clients_guard = clients.write().await;
                    clients_guard.check_timeouts()
                };

                for client_id in timed_out {
                    if let Err(e) = server_tx.send(ServerMessage::ClientTimeout { client_id }) {
                        error!("Failed to send timeout message: {}", e);
                        break;
                    }
                }
            }
        });
    }

    async fn send_packet_impl(
        socket: &UdpSocket,
        packet: &ServerPacket,
        addr: SocketAddr,
    ) -> Result<(), ServerError> {
        let data = serialize(packet)?;
        socket.send_to(&data, addr).await?;
        Ok(())
    }

    fn send_packet(&self, packet: ServerPacket, addr: SocketAddr) {
        if let Err(e) = self.game_tx.send(GameMessage::SendPacket { packet, addr }) {
            error!("Failed to queue packet for sending: {}", e);
        }
    }

    fn notice(&self, addr: SocketAddr, text: impl Into<String>) {
        self.send_packet(ServerPacket::Notice { text: text.into() }, addr);
    }

    /// Processes one incoming packet
    async fn handle_packet(&mut self, packet: ClientPacket, addr: SocketAddr) {
        if let ClientPacket::Connect {
            client_version,
            name,
            character_level,
            class,
        } = packet
        {
            self.connect(addr, client_version, Profile { name, character_level, class })
                .await;
            return;
        }

        let client_id = {
            let mut clients = self.clients.write().await;
            let id = clients.find_client_by_addr(addr);
            if let Some(id) = id {
                clients.touch(id);
            }
            id
        };
        let Some(client_id) = client_id else {
            warn!("Packet from unknown address {}", addr);
            return;
        };

        match packet {
            ClientPacket::Queue { mode } => self.queue(client_id, mode, addr).await,
            ClientPacket::Intent(intent) => self.route_intent(client_id, intent, addr).await,
            ClientPacket::Heartbeat => {}
            ClientPacket::Disconnect => {
                self.clients.write().await.remove_client(&client_id);
                self.drop_participant(client_id).await;
            }
            ClientPacket::Connect { .. } => {}
        }
    }

    async fn connect(&mut self, addr: SocketAddr, client_version: u32, profile: Profile) {
        info!("Client connecting from {} (version: {})", addr, client_version);
        if client_version != PROTOCOL_VERSION {
            self.send_packet(
                ServerPacket::Disconnected {
                    reason: format!("Unsupported client version {}", client_version),
                },
                addr,
            );
            return;
        }

        // Remove existing connection if present
        let existing_client_id = self.clients.read().await.find_client_by_addr(addr);
        if let Some(existing_id) = existing_client_id {
            info!("Removing existing client {} from {}", existing_id, addr);
            self.clients.write().await.remove_client(&existing_id);
            self.drop_participant(existing_id).await;
        }

        let client_id = self.clients.write().await.add_client(addr, profile);
        let response = match client_id {
            Some(participant_id) => ServerPacket::Connected { participant_id },
            None => ServerPacket::Disconnected {
                reason: "Server full".to_string(),
            },
        };
        self.send_packet(response, addr);
    }

    async fn queue(&mut self, client_id: ParticipantId, mode: shared::GameMode, addr: SocketAddr) {
        if self.registry().room_of(client_id).await.is_some() {
            self.notice(addr, "already in a room");
            return;
        }
        let seat = {
            let clients = self.clients.read().await;
            match clients.get(client_id) {
                Some(client) => HeroSeat {
                    participant: client_id,
                    class: client.profile.class,
                    character_level: client.profile.character_level,
                },
                None => return,
            }
        };

        match self.lobby.queue(seat, mode) {
            LobbyOutcome::Queued { waiting } => self.send_packet(ServerPacket::Queued { mode, waiting }, addr),
            LobbyOutcome::Ready(plan) => self.open_room(plan).await,
            LobbyOutcome::Rejected(reason) => self.notice(addr, reason),
        }
    }

    async fn route_intent(&mut self, client_id: ParticipantId, intent: Intent, addr: SocketAddr) {
        if self.registry().send_intent(client_id, intent.clone()).await {
            return;
        }
        // Outside a room the only meaningful intent is the party host's start
        if intent == Intent::Start {
            match self.lobby.start_party(client_id) {
                Ok(plan) => self.open_room(plan).await,
                Err(e) => self.notice(addr, e.to_string()),
            }
        } else {
            debug!("Ignoring {:?} from {} outside any room", intent, client_id);
        }
    }

    async fn open_room(&mut self, plan: RoomPlan) {
        self.spawner.spawn(plan).await;
    }

    /// Cleans up after a participant whose connection closed
    async fn drop_participant(&mut self, client_id: ParticipantId) {
        self.lobby.leave(client_id);
        if self.registry().notify_disconnect(client_id).await {
            debug!("Told room of participant {} about the disconnect", client_id);
        }
    }

    /// Main server loop. Rooms run their own clocks, so this loop only
    /// reacts to network events.
    pub async fn run(&mut self) -> Result<(), ServerError> {
        // Initialize concurrent tasks
        self.spawn_network_receiver();
        self.spawn_network_sender();
        self.spawn_timeout_checker();

        let mut status_interval = interval(Duration::from_secs(30));

        info!("Server started successfully");

        loop {
            tokio::select! {
                message = self.server_rx.recv() => {
                    match message {
                        Some(ServerMessage::PacketReceived { packet, addr }) => {
                            self.handle_packet(packet, addr).await;
                        },
                        Some(ServerMessage::ClientTimeout { client_id }) => {
                            info!("Client {} timed out", client_id);
                            self.drop_participant(client_id).await;
                        },
                        Some(ServerMessage::Shutdown) | None => {
                            info!("Server shutting down");
                            break;
                        }
                    }
                },

                _ = status_interval.tick() => {
                    let client_count = self.clients.read().await.len();
                    let room_count = self.registry().len().await;
                    if client_count > 0 {
                        debug!("{} clients connected, {} rooms live", client_count, room_count);
                    }
                },
            }
        }

        Ok(())
    }
}
