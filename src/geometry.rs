//! Level geometry and the AABB tests the bullet sweep runs against.

use lazy_static::lazy_static;
use nalgebra::Point2;
use ncollide2d::bounding_volume::{BoundingVolume, AABB};

use crate::constants::{
    BULLET_HEIGHT, BULLET_WIDTH, PLAYER_HALF_HEIGHT, PLAYER_HALF_WIDTH,
};

pub type Vec2 = nalgebra::Vector2<f32>;

pub fn aabb(min_x: f32, min_y: f32, max_x: f32, max_y: f32) -> AABB<f32> {
    AABB::new(Point2::new(min_x, min_y), Point2::new(max_x, max_y))
}

/// Player hitbox. `y` is the sprite's bottom-center, so the box is centered
/// one half-height above it.
pub fn player_aabb(x: f32, y: f32) -> AABB<f32> {
    let center_y = y - PLAYER_HALF_HEIGHT;
    aabb(
        x - PLAYER_HALF_WIDTH,
        center_y - PLAYER_HALF_HEIGHT,
        x + PLAYER_HALF_WIDTH,
        center_y + PLAYER_HALF_HEIGHT,
    )
}

/// Static bullet box around its center.
pub fn bullet_aabb(x: f32, y: f32) -> AABB<f32> {
    aabb(
        x - BULLET_WIDTH / 2.0,
        y - BULLET_HEIGHT / 2.0,
        x + BULLET_WIDTH / 2.0,
        y + BULLET_HEIGHT / 2.0,
    )
}

/// Box covering everything a bullet touches while moving from `prev_x` to
/// `next_x` this tick. Bullets only move horizontally, so the vertical extent
/// stays the static bullet box.
pub fn swept_bullet_aabb(prev_x: f32, next_x: f32, y: f32) -> AABB<f32> {
    let (lo, hi) = if prev_x <= next_x {
        (prev_x, next_x)
    } else {
        (next_x, prev_x)
    };
    aabb(
        lo - BULLET_WIDTH / 2.0,
        y - BULLET_HEIGHT / 2.0,
        hi + BULLET_WIDTH / 2.0,
        y + BULLET_HEIGHT / 2.0,
    )
}

lazy_static! {
    /// Static level geometry: the ground strip plus three floating platforms.
    /// Tops are where players stand; bullets die on contact with any of them.
    pub static ref PLATFORMS: Vec<AABB<f32>> = vec![
        aabb(0.0, 500.0, 3000.0, 564.0),
        aabb(700.0, 380.0, 1000.0, 404.0),
        aabb(1420.0, 300.0, 1580.0, 324.0),
        aabb(2000.0, 380.0, 2300.0, 404.0),
    ];
}

pub fn hits_platform(bullet: &AABB<f32>) -> bool {
    PLATFORMS.iter().any(|platform| platform.intersects(bullet))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swept_box_covers_fast_bullet_path() {
        // A bullet crossing more than a player-width in one tick must still
        // overlap an enemy standing inside the jump.
        let enemy = player_aabb(500.0, 500.0);
        let swept = swept_bullet_aabb(400.0, 550.0, 474.0);
        assert!(swept.intersects(&enemy));
    }

    #[test]
    fn swept_box_handles_leftward_travel() {
        let enemy = player_aabb(500.0, 500.0);
        let swept = swept_bullet_aabb(600.0, 450.0, 474.0);
        assert!(swept.intersects(&enemy));
    }

    #[test]
    fn vertical_miss_is_a_miss_no_matter_how_fast() {
        let enemy = player_aabb(500.0, 500.0);
        // Way above the hitbox.
        let swept = swept_bullet_aabb(400.0, 700.0, 200.0);
        assert!(!swept.intersects(&enemy));
    }

    #[test]
    fn ground_strip_stops_low_bullets() {
        assert!(hits_platform(&bullet_aabb(1500.0, 510.0)));
        assert!(!hits_platform(&bullet_aabb(1500.0, 474.0)));
    }

    #[test]
    fn floating_platform_stops_bullets_at_its_height() {
        assert!(hits_platform(&bullet_aabb(1500.0, 312.0)));
        assert!(!hits_platform(&bullet_aabb(1200.0, 312.0)));
    }
}
