use serde::{Deserialize, Serialize};

use std::collections::HashMap;

use crate::constants;

/* Wire messages are json, tagged by "type".

client -> server:

    {"type": "move",
        "x": 1500.0, "y": 500.0,
        "velocityX": 240.0, "velocityY": 0.0, "flipX": false}

    {"type": "dash", "isDashing": true}

    {"type": "shoot", "x": 1500.0, "y": 474.0}
        // any client-supplied velocity is ignored; the room computes it

server -> client (direct):

    {"type": "team-assigned",
        "team": "red", "playerId": "p1",
        "roomId": "skirmish-arena", "playerName": "ada"}

    {"type": "player-killed",
        "killerId": "p1", "victimId": "p2",
        "killerName": "ada", "victimName": "grace"}

    {"type": "match-ended",
        "winningTeam": "red", "scores": {"red": 30, "blue": 12}}

server -> client (replication diffs):

    {"type": "player-added", "player": { ... }}
    {"type": "player-updated", "player": { ... }}
    {"type": "player-removed", "id": "p2"}
    {"type": "bullet-added", "bullet": { ... }}
    {"type": "bullet-removed", "id": "p1-17", "x": 1710.0, "y": 474.0}
    {"type": "state-changed", "gameStatus": "playing", "scores": { ... }}
*/

pub type PlayerId = String;
pub type BulletId = String;
pub type Health = i32;

#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Team {
    Red,
    Blue,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Playing,
    Ended,
}

/// Authoritative on the server; clients hold a read-only mirror plus their
/// own predicted copy. `y` is the sprite's bottom-center.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub team: Team,
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub flip_x: bool,
    pub health: Health,
    pub is_dead: bool,
    pub respawn_timer_ms: f64,
    pub is_dashing: bool,
}

impl Player {
    /// Fresh player standing at its team spawn, facing the enemy side.
    pub fn spawn(id: PlayerId, name: String, team: Team) -> Player {
        let (x, y) = constants::team_spawn(team);
        Player {
            id,
            name,
            team,
            x,
            y,
            velocity_x: 0.0,
            velocity_y: 0.0,
            flip_x: team == Team::Blue,
            health: constants::PLAYER_MAX_HEALTH,
            is_dead: false,
            respawn_timer_ms: 0.0,
            is_dashing: false,
        }
    }
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bullet {
    pub id: BulletId,
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub owner_id: PlayerId,
    /// Captured at creation; the owner may leave while the bullet flies.
    pub owner_team: Team,
    #[serde(skip)]
    pub spawned_at_ms: f64,
}

#[derive(Copy, Clone, Default, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Scores {
    pub red: u32,
    pub blue: u32,
}

impl Scores {
    pub fn get(&self, team: Team) -> u32 {
        match team {
            Team::Red => self.red,
            Team::Blue => self.blue,
        }
    }

    /// Adds one kill and returns the team's new total.
    pub fn add(&mut self, team: Team) -> u32 {
        let slot = match team {
            Team::Red => &mut self.red,
            Team::Blue => &mut self.blue,
        };
        *slot += 1;
        *slot
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
    pub players: HashMap<PlayerId, Player>,
    pub bullets: Vec<Bullet>,
    pub scores: Scores,
    pub game_status: GameStatus,
    pub game_time_ms: f64,
    pub winning_team: Option<Team>,
}

impl RoomState {
    pub fn new() -> RoomState {
        RoomState {
            players: HashMap::new(),
            bullets: vec![],
            scores: Scores::default(),
            game_status: GameStatus::Waiting,
            game_time_ms: 0.0,
            winning_team: None,
        }
    }
}

impl Default for RoomState {
    fn default() -> Self {
        Self::new()
    }
}

/// Lobby-visible summary, refreshed on join/leave and status transitions.
#[derive(Copy, Clone, PartialEq, Eq, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomMetadata {
    pub red_count: usize,
    pub blue_count: usize,
    pub game_status: GameStatus,
}

///---------------------------///
/// Messages sent by clients: ///
///---------------------------///

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "kebab-case")]
pub enum ClientMessage {
    Move(MoveMessage),
    Dash(DashMessage),
    Shoot(ShootMessage),
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveMessage {
    pub x: f32,
    pub y: f32,
    pub velocity_x: f32,
    pub velocity_y: f32,
    pub flip_x: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashMessage {
    pub is_dashing: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShootMessage {
    pub x: f32,
    pub y: f32,
}

///---------------------------///
/// Messages sent to clients: ///
///---------------------------///

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(tag = "type")]
#[serde(rename_all = "kebab-case")]
pub enum ServerMessage {
    TeamAssigned(TeamAssignment),
    PlayerKilled(KillEvent),
    MatchEnded(MatchResult),
    PlayerAdded { player: Player },
    PlayerUpdated { player: Player },
    PlayerRemoved { id: PlayerId },
    BulletAdded { bullet: Bullet },
    BulletRemoved { id: BulletId, x: f32, y: f32 },
    StateChanged(StateChange),
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamAssignment {
    pub team: Team,
    pub player_id: PlayerId,
    pub room_id: String,
    pub player_name: String,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KillEvent {
    pub killer_id: PlayerId,
    pub victim_id: PlayerId,
    pub killer_name: String,
    pub victim_name: String,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub winning_team: Team,
    pub scores: Scores,
}

#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateChange {
    pub game_status: GameStatus,
    pub scores: Scores,
    pub winning_team: Option<Team>,
}
