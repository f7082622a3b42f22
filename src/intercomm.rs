use std::sync::mpsc;
use std::sync::{Arc, Mutex};

use crate::protocol::{ClientMessage, PlayerId, ServerMessage};

/// Send half of a client connection, abstracted so the room can run against
/// recording sinks in tests and headless hosts.
pub trait Outbound: Send {
    fn send_text(&self, data: String) -> Result<(), String>;
    /// Ask the transport to drop the connection (room-full refusals).
    fn close(&self);
}

impl Outbound for ws::Sender {
    fn send_text(&self, data: String) -> Result<(), String> {
        self.send(data).map_err(|error| error.details.to_string())
    }

    fn close(&self) {
        let _ = ws::Sender::close(self, ws::CloseCode::Policy);
    }
}

/// Envelope between the connection handlers and the room worker. All room
/// mutation flows through this channel; the room thread is the only consumer,
/// so no two handlers for one room ever run concurrently.
pub enum RoomCommand {
    Join {
        id: PlayerId,
        name: String,
        reply: Box<dyn Outbound>,
    },
    Leave {
        id: PlayerId,
    },
    Message {
        id: PlayerId,
        message: ClientMessage,
    },
    Tick {
        delta_ms: f64,
    },
}

pub type CommandSender = mpsc::Sender<RoomCommand>;
pub type CommandReceiver = mpsc::Receiver<RoomCommand>;

/// Outbound sink that records every frame instead of writing to a socket.
#[derive(Clone, Default)]
pub struct RecordingOutbound {
    frames: Arc<Mutex<Vec<String>>>,
    closed: Arc<Mutex<bool>>,
}

impl RecordingOutbound {
    pub fn new() -> RecordingOutbound {
        RecordingOutbound::default()
    }

    /// Drains and returns every recorded frame.
    pub fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.frames.lock().unwrap())
    }

    /// Drains the recorded frames, decoded; frames that are not server
    /// messages are skipped.
    pub fn decoded(&self) -> Vec<ServerMessage> {
        self.take()
            .iter()
            .filter_map(|frame| serde_json::from_str(frame).ok())
            .collect()
    }

    pub fn was_closed(&self) -> bool {
        *self.closed.lock().unwrap()
    }
}

impl Outbound for RecordingOutbound {
    fn send_text(&self, data: String) -> Result<(), String> {
        self.frames.lock().unwrap().push(data);
        Ok(())
    }

    fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }
}
