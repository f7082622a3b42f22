//! Numeric constants shared bit-exactly between the server simulation and
//! the client cores. Anything a client predicts with must match what the
//! room simulates with.

use crate::protocol::Team;

pub const TICK_HZ: f64 = 60.0;
pub const TICK_INTERVAL_MS: f64 = 1000.0 / TICK_HZ;

/// Horizontal bullet speed in px/s; bullets never move vertically.
pub const BULLET_SPEED: f32 = 900.0;
pub const BULLET_LIFETIME_MS: f64 = 3000.0;
pub const BULLET_DAMAGE: i32 = 25;
pub const BULLET_WIDTH: f32 = 16.0;
pub const BULLET_HEIGHT: f32 = 8.0;

pub const PLAYER_HALF_WIDTH: f32 = 18.0;
pub const PLAYER_HALF_HEIGHT: f32 = 26.0;
pub const PLAYER_MAX_HEALTH: i32 = 100;

pub const RESPAWN_MS: f64 = 3000.0;
pub const WIN_SCORE: u32 = 30;
pub const MAX_CLIENTS: usize = 8;

pub const RED_SPAWN: (f32, f32) = (200.0, 500.0);
pub const BLUE_SPAWN: (f32, f32) = (2800.0, 500.0);

/// Bullets past these x coordinates are dropped as off-world.
pub const WORLD_MIN_X: f32 = -100.0;
pub const WORLD_MAX_X: f32 = 3100.0;

pub const RECONCILE_DEAD_BAND_PX: f32 = 5.0;
pub const SNAP_THRESHOLD_PX: f32 = 100.0;
/// Wider snap band while dashing (and shortly after), when server and client
/// legitimately disagree the most.
pub const SNAP_THRESHOLD_DASH_PX: f32 = 300.0;
pub const DASH_SNAP_WINDOW_MS: f32 = 250.0;
/// Fraction of the stored prediction error bled off per second.
pub const RECONCILE_RATE: f32 = 0.3;
/// Error components below this are treated as converged.
pub const RECONCILE_SETTLE_PX: f32 = 0.1;

/// Remote players chase their latest server sample by this fraction per
/// frame, taking 60 Hz as the reference frame rate.
pub const REMOTE_LERP_PER_FRAME: f32 = 0.2;

/// A removed own-bullet is matched against the local pool within this range.
pub const OWN_BULLET_MATCH_PX: f32 = 50.0;

pub const QUALITY_GREEN_PX: f32 = 50.0;
pub const QUALITY_YELLOW_PX: f32 = 100.0;

pub fn team_spawn(team: Team) -> (f32, f32) {
    match team {
        Team::Red => RED_SPAWN,
        Team::Blue => BLUE_SPAWN,
    }
}
