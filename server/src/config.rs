//! Runtime configuration for the server and the rooms it hosts.
//!
//! The binary builds a [`ServerConfig`] from command-line arguments; rooms
//! only ever see the [`RoomTiming`] slice of it.

use std::time::Duration;

/// Clock settings every room is created with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoomTiming {
    /// Fixed simulation slice advanced by one tick.
    pub tick: Duration,
    /// Minimum spacing between two full-state snapshots.
    pub snapshot_interval: Duration,
    /// Number of countdown ticks before the room starts running.
    pub countdown_ticks: u32,
    /// Spacing between two countdown ticks.
    pub countdown_period: Duration,
    /// Length of an assault match before the base-hp comparison decides it.
    pub assault_match_duration: Duration,
}

impl RoomTiming {
    /// Builds timing from a tick rate in Hz, keeping the other defaults.
    pub fn with_tick_rate(tick_rate: u32) -> Self {
        let tick_rate = tick_rate.max(1);
        Self {
            tick: Duration::from_secs_f64(1.0 / tick_rate as f64),
            ..Self::default()
        }
    }

    pub fn tick_secs(&self) -> f32 {
        self.tick.as_secs_f32()
    }
}

impl Default for RoomTiming {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(50),
            snapshot_interval: Duration::from_millis(100),
            countdown_ticks: 3,
            countdown_period: Duration::from_secs(1),
            assault_match_duration: Duration::from_secs(300),
        }
    }
}

/// Process-wide settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub max_clients: usize,
    /// Silence after which a client is treated as disconnected.
    pub client_timeout: Duration,
    pub room: RoomTiming,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            max_clients: 64,
            client_timeout: Duration::from_secs(5),
            room: RoomTiming::default(),
        }
    }
}
