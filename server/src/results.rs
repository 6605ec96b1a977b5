//! End-of-room reporting to the profile service.
//!
//! The server never reads or writes profiles itself; it hands one
//! [`MatchReport`] per finished room to a [`ResultSink`].

use log::{error, info};
use serde::Serialize;
use shared::{GameMode, MatchResult, ParticipantReport, RoomId};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchReport {
    pub room_id: RoomId,
    pub mode: GameMode,
    pub result: MatchResult,
    pub participants: Vec<ParticipantReport>,
}

pub trait ResultSink: Send + Sync {
    fn record(&self, report: MatchReport);
}

/// Writes each report as one JSON log line.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogResultSink;

impl ResultSink for LogResultSink {
    fn record(&self, report: MatchReport) {
        match serde_json::to_string(&report) {
            Ok(json) => info!("Match report: {}", json),
            Err(e) => error!("Failed to encode report for room {}: {}", report.room_id, e),
        }
    }
}

/// Forwards reports into a channel.
#[derive(Debug, Clone)]
pub struct ChannelResultSink {
    tx: mpsc::UnboundedSender<MatchReport>,
}

impl ChannelResultSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<MatchReport>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ResultSink for ChannelResultSink {
    fn record(&self, report: MatchReport) {
        if let Err(e) = self.tx.send(report) {
            error!("Dropped report for room {}: receiver closed", e.0.room_id);
        }
    }
}
