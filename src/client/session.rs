//! The client's view of its room connection: consumes the raw server stream
//! and re-emits a typed event surface over a channel, while tracking the
//! local identity and a read-only roster.
//!
//! One ordering hazard is handled here so the rest of the client never sees
//! it: the replication diff can deliver `player-added` (including our own)
//! before the direct `team-assigned` lands. Until the local id is known,
//! adds are buffered and replayed right after the assignment.

use crossbeam_channel as channel;

use std::collections::HashMap;

use crate::protocol::{
    Bullet, BulletId, Health, Player, PlayerId, ServerMessage, Team, TeamAssignment,
};

/// Typed events derived from the raw server stream.
#[derive(Clone, Debug, PartialEq)]
pub enum SessionEvent {
    TeamAssigned(TeamAssignment),
    PlayerAdded(Player),
    PlayerUpdated(Player),
    PlayerRemoved(PlayerId),
    BulletAdded(Bullet),
    BulletRemoved { id: BulletId, x: f32, y: f32 },
    StateChanged(crate::protocol::StateChange),
    PlayerKilled(crate::protocol::KillEvent),
    LocalPlayerServerUpdate(LocalUpdate),
}

/// Authoritative sample of the local player, fed to the reconciler.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LocalUpdate {
    pub x: f32,
    pub y: f32,
    pub health: Health,
    pub is_dead: bool,
    pub respawn_timer_ms: f64,
    pub is_dashing: bool,
}

impl LocalUpdate {
    fn from_player(player: &Player) -> LocalUpdate {
        LocalUpdate {
            x: player.x,
            y: player.y,
            health: player.health,
            is_dead: player.is_dead,
            respawn_timer_ms: player.respawn_timer_ms,
            is_dashing: player.is_dashing,
        }
    }
}

#[derive(Clone, Debug)]
pub struct RosterEntry {
    pub team: Team,
    pub name: String,
}

pub struct Session {
    events_tx: channel::Sender<SessionEvent>,
    events_rx: channel::Receiver<SessionEvent>,
    local_player_id: Option<PlayerId>,
    local_team: Option<Team>,
    room_id: Option<String>,
    roster: HashMap<PlayerId, RosterEntry>,
    /// Adds seen before `team-assigned`; replayed once identity is known.
    pending_added: Vec<Player>,
}

impl Session {
    pub fn new() -> Session {
        let (events_tx, events_rx) = channel::unbounded();
        Session {
            events_tx,
            events_rx,
            local_player_id: None,
            local_team: None,
            room_id: None,
            roster: HashMap::new(),
            pending_added: vec![],
        }
    }

    /// Subscription handle; clone freely, every consumer drains the same
    /// stream.
    pub fn events(&self) -> channel::Receiver<SessionEvent> {
        self.events_rx.clone()
    }

    pub fn local_player_id(&self) -> Option<&PlayerId> {
        self.local_player_id.as_ref()
    }

    pub fn local_team(&self) -> Option<Team> {
        self.local_team
    }

    pub fn room_id(&self) -> Option<&String> {
        self.room_id.as_ref()
    }

    /// Team of any known player; the roster lags one event behind removal.
    pub fn player_team(&self, id: &str) -> Option<Team> {
        self.roster.get(id).map(|entry| entry.team)
    }

    pub fn is_local(&self, id: &str) -> bool {
        self.local_player_id.as_deref() == Some(id)
    }

    /// Raw frame from the transport.
    pub fn handle_json(&mut self, raw: &str) {
        match serde_json::from_str::<ServerMessage>(raw) {
            Ok(message) => self.handle_message(message),
            Err(error) => warn!("dropping unrecognized server frame: [{:?}]", error),
        }
    }

    pub fn handle_message(&mut self, message: ServerMessage) {
        match message {
            ServerMessage::TeamAssigned(assignment) => {
                self.local_player_id = Some(assignment.player_id.clone());
                self.local_team = Some(assignment.team);
                self.room_id = Some(assignment.room_id.clone());
                self.emit(SessionEvent::TeamAssigned(assignment));
                let pending = std::mem::replace(&mut self.pending_added, vec![]);
                for player in pending {
                    self.admit(player);
                }
            }
            ServerMessage::PlayerAdded { player } => {
                if self.local_player_id.is_none() {
                    self.pending_added.push(player);
                } else {
                    self.admit(player);
                }
            }
            ServerMessage::PlayerUpdated { player } => self.handle_player_updated(player),
            ServerMessage::PlayerRemoved { id } => {
                self.roster.remove(&id);
                self.pending_added.retain(|pending| pending.id != id);
                self.emit(SessionEvent::PlayerRemoved(id));
            }
            ServerMessage::BulletAdded { bullet } => {
                self.emit(SessionEvent::BulletAdded(bullet))
            }
            ServerMessage::BulletRemoved { id, x, y } => {
                self.emit(SessionEvent::BulletRemoved { id, x, y })
            }
            ServerMessage::StateChanged(change) => {
                self.emit(SessionEvent::StateChanged(change))
            }
            ServerMessage::PlayerKilled(kill) => self.emit(SessionEvent::PlayerKilled(kill)),
            ServerMessage::MatchEnded(result) => {
                // Consumers act on the state-changed diff that carries the
                // same transition; the direct broadcast is only logged.
                debug!("match ended: {:?} wins", result.winning_team);
            }
        }
    }

    /// Leaving multiplayer: forget identity, roster and anything buffered.
    pub fn reset(&mut self) {
        self.local_player_id = None;
        self.local_team = None;
        self.room_id = None;
        self.roster.clear();
        self.pending_added.clear();
    }

    fn handle_player_updated(&mut self, player: Player) {
        if self.local_player_id.is_none() {
            // Update racing ahead of the add for a buffered player is fine;
            // update for a player never added means the diff stream skipped
            // an add, which the creation path must not paper over.
            if let Some(pending) = self
                .pending_added
                .iter_mut()
                .find(|pending| pending.id == player.id)
            {
                *pending = player;
            } else {
                warn!(
                    "dropping update for player [{}] never seen added",
                    player.id
                );
            }
            return;
        }

        if self.is_local(&player.id) {
            self.emit(SessionEvent::LocalPlayerServerUpdate(
                LocalUpdate::from_player(&player),
            ));
            return;
        }

        if self.roster.contains_key(&player.id) {
            self.roster.insert(
                player.id.clone(),
                RosterEntry {
                    team: player.team,
                    name: player.name.clone(),
                },
            );
            self.emit(SessionEvent::PlayerUpdated(player));
        } else {
            warn!(
                "dropping update for player [{}] never seen added",
                player.id
            );
        }
    }

    fn admit(&mut self, player: Player) {
        self.roster.insert(
            player.id.clone(),
            RosterEntry {
                team: player.team,
                name: player.name.clone(),
            },
        );
        self.emit(SessionEvent::PlayerAdded(player));
    }

    fn emit(&self, event: SessionEvent) {
        // Receiver lives inside the session, so the send cannot fail.
        let _ = self.events_tx.send(event);
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
