//! Remote players render between server snapshots: position chases the last
//! sample smoothly, everything else mirrors the server immediately.

use crate::constants::{QUALITY_GREEN_PX, QUALITY_YELLOW_PX, REMOTE_LERP_PER_FRAME};
use crate::geometry::Vec2;
use crate::protocol::{Health, Player, PlayerId, Team};

use super::EffectSink;

/// Network-quality band for the indicator above a remote player, from how far
/// the rendered position trails the latest server sample.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum NetQuality {
    Green,
    Yellow,
    Red,
}

pub struct RemotePlayer {
    pub id: PlayerId,
    pub name: String,
    pub team: Team,
    /// Rendered position this frame.
    pub current: Vec2,
    /// Latest server sample.
    pub target: Vec2,
    /// Mirrored for the walk-cycle animation; zeroed while dead.
    pub velocity: Vec2,
    pub health: Health,
    pub flip_x: bool,
    pub is_dashing: bool,
    pub is_dead: bool,
}

impl RemotePlayer {
    pub fn new(player: &Player) -> RemotePlayer {
        let position = Vec2::new(player.x, player.y);
        RemotePlayer {
            id: player.id.clone(),
            name: player.name.clone(),
            team: player.team,
            current: position,
            target: position,
            velocity: Vec2::new(player.velocity_x, player.velocity_y),
            health: player.health,
            flip_x: player.flip_x,
            is_dashing: player.is_dashing,
            is_dead: player.is_dead,
        }
    }

    /// Fold in a server snapshot. Position only retargets the interpolation;
    /// the flags mirror instantly. Death edges are cosmetic and must never
    /// gate logic.
    pub fn apply_sample(&mut self, player: &Player, fx: &mut dyn EffectSink) {
        self.target = Vec2::new(player.x, player.y);
        self.velocity = Vec2::new(player.velocity_x, player.velocity_y);
        self.health = player.health;
        self.flip_x = player.flip_x;
        self.is_dashing = player.is_dashing;
        if player.is_dead != self.is_dead {
            self.is_dead = player.is_dead;
            if self.is_dead {
                self.velocity = Vec2::zeros();
            }
            fx.remote_death(&self.id, self.is_dead);
        }
    }

    /// Exponential chase toward the latest sample, frame-rate independent
    /// and equivalent to `REMOTE_LERP_PER_FRAME` at 60 Hz.
    pub fn update(&mut self, delta_ms: f32) {
        let frames = delta_ms / 1000.0 * 60.0;
        let blend = 1.0 - (1.0 - REMOTE_LERP_PER_FRAME).powf(frames);
        self.current += (self.target - self.current) * blend;
    }

    /// How far the rendered position trails the authoritative one.
    pub fn prediction_distance(&self) -> f32 {
        (self.target - self.current).norm()
    }

    pub fn quality(&self) -> NetQuality {
        let distance = self.prediction_distance();
        if distance <= QUALITY_GREEN_PX {
            NetQuality::Green
        } else if distance <= QUALITY_YELLOW_PX {
            NetQuality::Yellow
        } else {
            NetQuality::Red
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::test_support::RecordingFx;
    use approx::assert_relative_eq;

    const FRAME_MS: f32 = 1000.0 / 60.0;

    fn sample(x: f32, y: f32) -> Player {
        let mut player = Player::spawn("p2".to_owned(), "grace".to_owned(), Team::Blue);
        player.x = x;
        player.y = y;
        player
    }

    #[test]
    fn interpolation_closes_a_fifth_of_the_gap_per_reference_frame() {
        let mut fx = RecordingFx::default();
        let mut remote = RemotePlayer::new(&sample(0.0, 500.0));
        remote.apply_sample(&sample(100.0, 500.0), &mut fx);

        remote.update(FRAME_MS);
        assert_relative_eq!(remote.current.x, 20.0, epsilon = 0.01);
        remote.update(FRAME_MS);
        assert_relative_eq!(remote.current.x, 36.0, epsilon = 0.01);
    }

    #[test]
    fn interpolation_is_frame_rate_independent() {
        let mut fx = RecordingFx::default();
        let mut at_60 = RemotePlayer::new(&sample(0.0, 500.0));
        at_60.apply_sample(&sample(100.0, 500.0), &mut fx);
        let mut at_30 = RemotePlayer::new(&sample(0.0, 500.0));
        at_30.apply_sample(&sample(100.0, 500.0), &mut fx);

        at_60.update(FRAME_MS);
        at_60.update(FRAME_MS);
        at_30.update(FRAME_MS * 2.0);
        assert_relative_eq!(at_60.current.x, at_30.current.x, epsilon = 0.01);
    }

    #[test]
    fn interpolation_converges_on_a_still_target() {
        let mut fx = RecordingFx::default();
        let mut remote = RemotePlayer::new(&sample(0.0, 500.0));
        remote.apply_sample(&sample(640.0, 480.0), &mut fx);
        for _ in 0..600 {
            remote.update(FRAME_MS);
        }
        assert_relative_eq!(remote.current.x, 640.0, epsilon = 0.1);
        assert_relative_eq!(remote.current.y, 480.0, epsilon = 0.1);
    }

    #[test]
    fn flags_mirror_immediately_and_death_edges_fire_once() {
        let mut fx = RecordingFx::default();
        let mut remote = RemotePlayer::new(&sample(0.0, 500.0));

        let mut dead = sample(0.0, 500.0);
        dead.is_dead = true;
        dead.health = 0;
        dead.flip_x = true;
        dead.velocity_x = 240.0;
        remote.apply_sample(&dead, &mut fx);
        assert!(remote.is_dead);
        assert!(remote.flip_x);
        assert_eq!(remote.health, 0);
        // Death zeroes the mirrored velocity even if the sample carried some.
        assert_eq!(remote.velocity, Vec2::zeros());

        // Same flag again: no second edge.
        remote.apply_sample(&dead, &mut fx);

        let alive = sample(0.0, 500.0);
        remote.apply_sample(&alive, &mut fx);
        assert_eq!(
            fx.calls,
            vec![
                "remote-death@p2=true".to_owned(),
                "remote-death@p2=false".to_owned()
            ]
        );
    }

    #[test]
    fn quality_bands_follow_the_prediction_distance() {
        let mut fx = RecordingFx::default();
        let mut remote = RemotePlayer::new(&sample(0.0, 500.0));
        assert_eq!(remote.quality(), NetQuality::Green);

        remote.apply_sample(&sample(49.0, 500.0), &mut fx);
        assert_eq!(remote.quality(), NetQuality::Green);

        remote.apply_sample(&sample(80.0, 500.0), &mut fx);
        assert_eq!(remote.quality(), NetQuality::Yellow);

        remote.apply_sample(&sample(300.0, 500.0), &mut fx);
        assert_eq!(remote.quality(), NetQuality::Red);
    }
}
