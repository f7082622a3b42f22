//! State-diff replication: the room broadcasts the difference between the
//! last broadcast state and the live state as typed events, so clients never
//! need the full snapshot after the initial adds.

use crate::protocol::{RoomState, ServerMessage, StateChange};

/// Events clients need to converge on `next` given they saw `prev`.
///
/// Bullets never produce position updates; clients predict their travel from
/// the creation snapshot. The mirror still tracks live positions so a
/// `bullet-removed` reports where the bullet actually died.
pub fn diff(prev: &RoomState, next: &RoomState) -> Vec<ServerMessage> {
    let mut events = vec![];

    for id in prev.players.keys() {
        if !next.players.contains_key(id) {
            events.push(ServerMessage::PlayerRemoved { id: id.clone() });
        }
    }
    for (id, player) in &next.players {
        match prev.players.get(id) {
            None => events.push(ServerMessage::PlayerAdded {
                player: player.clone(),
            }),
            Some(seen) if seen != player => events.push(ServerMessage::PlayerUpdated {
                player: player.clone(),
            }),
            Some(_) => {}
        }
    }

    for bullet in &prev.bullets {
        if !next.bullets.iter().any(|b| b.id == bullet.id) {
            events.push(ServerMessage::BulletRemoved {
                id: bullet.id.clone(),
                x: bullet.x,
                y: bullet.y,
            });
        }
    }
    for bullet in &next.bullets {
        if !prev.bullets.iter().any(|b| b.id == bullet.id) {
            events.push(ServerMessage::BulletAdded {
                bullet: bullet.clone(),
            });
        }
    }

    if prev.game_status != next.game_status
        || prev.scores != next.scores
        || prev.winning_team != next.winning_team
    {
        events.push(ServerMessage::StateChanged(StateChange {
            game_status: next.game_status,
            scores: next.scores,
            winning_team: next.winning_team,
        }));
    }

    events
}
