//! Local prediction reconciliation. The movement layer simulates the local
//! player every frame; this module folds authoritative updates back in.
//!
//! Position corrections are tolerance-banded: tiny errors are ignored,
//! moderate ones are stored and bled off over subsequent frames so the
//! correction is invisible, and large ones teleport. The snap band widens
//! while dashing (and briefly after), when server and client legitimately
//! disagree the most.

use crate::constants::{
    DASH_SNAP_WINDOW_MS, RECONCILE_DEAD_BAND_PX, RECONCILE_RATE, RECONCILE_SETTLE_PX,
    SNAP_THRESHOLD_DASH_PX, SNAP_THRESHOLD_PX,
};
use crate::geometry::Vec2;
use crate::protocol::Health;

use super::session::LocalUpdate;
use super::EffectSink;

pub struct LocalReconciler {
    /// Remaining correction toward the authoritative position.
    error: Vec2,
    last_health: Health,
    was_dead: bool,
    dashing: bool,
    /// Countdown after a dash ends during which the wide snap band applies.
    dash_window_ms: f32,
}

impl LocalReconciler {
    pub fn new(initial_health: Health) -> LocalReconciler {
        LocalReconciler {
            error: Vec2::zeros(),
            last_health: initial_health,
            was_dead: false,
            dashing: false,
            dash_window_ms: 0.0,
        }
    }

    /// The movement layer reports dash state every frame.
    pub fn set_dashing(&mut self, dashing: bool) {
        if self.dashing && !dashing {
            self.dash_window_ms = DASH_SNAP_WINDOW_MS;
        }
        self.dashing = dashing;
    }

    pub fn prediction_error(&self) -> Vec2 {
        self.error
    }

    /// Fold in an authoritative position sample, adjusting `visible` (the
    /// rendered local position) only when the error is past the snap band.
    pub fn server_update(&mut self, visible: &mut Vec2, update: &LocalUpdate) {
        let server = Vec2::new(update.x, update.y);
        let error = server - *visible;
        let distance = error.norm();

        if distance <= RECONCILE_DEAD_BAND_PX {
            self.error = Vec2::zeros();
        } else if distance <= self.snap_threshold(update.is_dashing) {
            self.error = error;
        } else {
            *visible = server;
            self.error = Vec2::zeros();
        }
    }

    /// Per-frame correction: bleed a fraction of the stored error into the
    /// rendered position until both components settle.
    pub fn update(&mut self, visible: &mut Vec2, delta_ms: f32) {
        if self.dash_window_ms > 0.0 {
            self.dash_window_ms = (self.dash_window_ms - delta_ms).max(0.0);
        }
        if self.error == Vec2::zeros() {
            return;
        }

        let dt_seconds = delta_ms / 1000.0;
        let decayed = self.error * (1.0 - RECONCILE_RATE * dt_seconds).max(0.0);
        *visible += self.error - decayed;
        self.error = decayed;

        if self.error.x.abs() < RECONCILE_SETTLE_PX && self.error.y.abs() < RECONCILE_SETTLE_PX {
            self.error = Vec2::zeros();
        }
    }

    /// Mirror authoritative health and fire the matching cosmetics.
    pub fn apply_health(&mut self, update: &LocalUpdate, fx: &mut dyn EffectSink) {
        if update.is_dead && !self.was_dead {
            self.was_dead = true;
            fx.local_death();
        } else if !update.is_dead && self.was_dead {
            self.was_dead = false;
            fx.local_respawn();
        } else if update.health < self.last_health && update.health > 0 {
            fx.local_hit();
        }
        self.last_health = update.health;
    }

    fn snap_threshold(&self, server_says_dashing: bool) -> f32 {
        if server_says_dashing || self.dashing || self.dash_window_ms > 0.0 {
            SNAP_THRESHOLD_DASH_PX
        } else {
            SNAP_THRESHOLD_PX
        }
    }
}

/// Seconds shown on the respawn countdown.
pub fn respawn_display_seconds(respawn_timer_ms: f64) -> u64 {
    (respawn_timer_ms / 1000.0).ceil() as u64
}
