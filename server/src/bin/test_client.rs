//! Headless bot: connects, queues for a mode and plays a short scripted
//! sequence of intents, logging everything the server sends back.

use bincode::{deserialize, serialize};
use clap::Parser;
use log::{info, warn};
use shared::{
    ClientPacket, GameMode, HeroClass, Intent, RoomMessage, ServerPacket, SkillSlot, UnitKind,
    Vector2, PROTOCOL_VERSION,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::{interval, timeout};

#[derive(Parser, Debug)]
#[clap(author, version, about)]
struct Args {
    /// Server address
    #[clap(short, long, default_value = "127.0.0.1:8080")]
    server: SocketAddr,
    /// Play defense instead of assault
    #[clap(long)]
    defense: bool,
    /// Start the defense party right after queueing (host only)
    #[clap(long)]
    start: bool,
    /// Seconds to keep playing once seated
    #[clap(long, default_value = "20")]
    seconds: u64,
    #[clap(long, default_value = "bot")]
    name: String,
}

async fn send(
    socket: &UdpSocket,
    server: SocketAddr,
    packet: &ClientPacket,
) -> Result<(), Box<dyn std::error::Error>> {
    socket.send_to(&serialize(packet)?, server).await?;
    Ok(())
}

/// Intent played on step `step` of the script.
fn scripted_intent(mode: GameMode, step: u64) -> Intent {
    match (mode, step % 4) {
        (GameMode::Assault, 0) => Intent::SpawnUnit {
            kind: UnitKind::Woodcutter,
        },
        (GameMode::Assault, 1) => Intent::SpawnUnit {
            kind: UnitKind::Soldier,
        },
        (GameMode::Assault, 2) => Intent::BuildWall {
            x: 150.0,
            y: 100.0 + step as f32,
        },
        (GameMode::Assault, _) => Intent::UpgradeBase,
        (GameMode::Defense, 0) => Intent::MoveHero {
            direction: Some(Vector2::new(1.0, 0.0)),
        },
        (GameMode::Defense, 1) => Intent::UseSkill {
            slot: SkillSlot::Basic,
            target_x: 0.0,
            target_y: 0.0,
        },
        (GameMode::Defense, 2) => Intent::MoveHero { direction: None },
        (GameMode::Defense, _) => Intent::UseSkill {
            slot: SkillSlot::First,
            target_x: 100.0,
            target_y: 0.0,
        },
    }
}

fn log_room_message(message: &RoomMessage) -> bool {
    match message {
        RoomMessage::Snapshot(_) => false,
        RoomMessage::Ended { result, .. } => {
            info!("Room ended: {:?}", result);
            true
        }
        other => {
            info!("Room: {:?}", other);
            false
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let mode = if args.defense {
        GameMode::Defense
    } else {
        GameMode::Assault
    };

    let socket = UdpSocket::bind("0.0.0.0:0").await?;
    info!("Client socket bound to {}", socket.local_addr()?);

    let connect = ClientPacket::Connect {
        client_version: PROTOCOL_VERSION,
        name: args.name.clone(),
        character_level: 5,
        class: HeroClass::Mage,
    };
    send(&socket, args.server, &connect).await?;

    let mut buf = [0u8; 65536];
    let (len, _) = timeout(Duration::from_secs(5), socket.recv_from(&mut buf)).await??;
    match deserialize::<ServerPacket>(&buf[..len])? {
        ServerPacket::Connected { participant_id } => {
            info!("Connected as participant {}", participant_id)
        }
        other => {
            warn!("Connection refused: {:?}", other);
            return Ok(());
        }
    }

    send(&socket, args.server, &ClientPacket::Queue { mode }).await?;
    if args.start {
        send(&socket, args.server, &ClientPacket::Intent(Intent::Start)).await?;
    }

    let mut heartbeat = interval(Duration::from_secs(1));
    let mut step = 0u64;
    let deadline = tokio::time::sleep(Duration::from_secs(args.seconds));
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            received = socket.recv_from(&mut buf) => {
                let (len, _) = received?;
                match deserialize::<ServerPacket>(&buf[..len]) {
                    Ok(ServerPacket::Room { message, .. }) => {
                        if log_room_message(&message) {
                            break;
                        }
                    }
                    Ok(ServerPacket::Disconnected { reason }) => {
                        warn!("Disconnected: {}", reason);
                        return Ok(());
                    }
                    Ok(other) => info!("Server: {:?}", other),
                    Err(e) => warn!("Failed to deserialize packet: {}", e),
                }
            }
            _ = heartbeat.tick() => {
                send(&socket, args.server, &ClientPacket::Heartbeat).await?;
                let intent = scripted_intent(mode, step);
                step += 1;
                send(&socket, args.server, &ClientPacket::Intent(intent)).await?;
            }
            _ = &mut deadline => {
                info!("Play time over");
                break;
            }
        }
    }

    send(&socket, args.server, &ClientPacket::Disconnect).await?;
    info!("Test client finished");
    Ok(())
}
