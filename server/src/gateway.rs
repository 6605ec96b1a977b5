//! Outbound delivery seam between rooms and whatever owns the connections.

use log::debug;
use shared::{ParticipantId, ServerPacket};
use tokio::sync::mpsc;

/// One packet addressed to one participant.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub participant: ParticipantId,
    pub packet: ServerPacket,
}

/// Fire-and-forget delivery to a participant's connection. Nothing is
/// guaranteed beyond "the connection was open when we tried".
pub trait Gateway: Send + Sync {
    fn deliver(&self, participant: ParticipantId, packet: ServerPacket);
}

/// Gateway backed by an unbounded channel. The network layer drains the
/// receiving end and resolves participants to socket addresses.
#[derive(Debug, Clone)]
pub struct ChannelGateway {
    tx: mpsc::UnboundedSender<Delivery>,
}

impl ChannelGateway {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Delivery>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Gateway for ChannelGateway {
    fn deliver(&self, participant: ParticipantId, packet: ServerPacket) {
        if self.tx.send(Delivery { participant, packet }).is_err() {
            debug!("Dropping packet for participant {}: gateway closed", participant);
        }
    }
}
