//! End-to-end room scenarios, driven through the public command surface with
//! recording sinks in place of sockets.

use skirmish::constants::{
    BLUE_SPAWN, BULLET_DAMAGE, BULLET_SPEED, PLAYER_MAX_HEALTH, RED_SPAWN, RESPAWN_MS,
    TICK_INTERVAL_MS,
};
use skirmish::intercomm::{RecordingOutbound, RoomCommand};
use skirmish::protocol::{
    ClientMessage, GameStatus, MoveMessage, ServerMessage, ShootMessage, Team,
};
use skirmish::room::Room;

fn new_room() -> (Room, RecordingOutbound) {
    let broadcaster = RecordingOutbound::new();
    let room = Room::new("flow-room".to_owned(), Box::new(broadcaster.clone()));
    (room, broadcaster)
}

fn join(room: &mut Room, id: &str, name: &str) -> RecordingOutbound {
    let reply = RecordingOutbound::new();
    room.handle_command(RoomCommand::Join {
        id: id.to_owned(),
        name: name.to_owned(),
        reply: Box::new(reply.clone()),
    });
    reply
}

fn send_move(room: &mut Room, id: &str, x: f32, y: f32) {
    room.handle_command(RoomCommand::Message {
        id: id.to_owned(),
        message: ClientMessage::Move(MoveMessage {
            x,
            y,
            velocity_x: 0.0,
            velocity_y: 0.0,
            flip_x: false,
        }),
    });
}

fn send_shoot(room: &mut Room, id: &str, x: f32, y: f32) {
    room.handle_command(RoomCommand::Message {
        id: id.to_owned(),
        message: ClientMessage::Shoot(ShootMessage { x, y }),
    });
}

fn run_ticks(room: &mut Room, count: usize) {
    for _ in 0..count {
        room.handle_command(RoomCommand::Tick {
            delta_ms: TICK_INTERVAL_MS,
        });
    }
}

#[test]
fn first_join_lands_on_red_at_the_red_spawn() {
    let (mut room, broadcaster) = new_room();
    let reply = join(&mut room, "p1", "ada");

    let messages = reply.decoded();
    match &messages[0] {
        ServerMessage::TeamAssigned(assignment) => {
            assert_eq!(assignment.team, Team::Red);
            assert_eq!(assignment.player_id, "p1");
            assert_eq!(assignment.player_name, "ada");
            assert_eq!(assignment.room_id, "flow-room");
        }
        other => panic!("expected team-assigned, got {:?}", other),
    }

    let player = &room.state().players["p1"];
    assert_eq!((player.x, player.y), RED_SPAWN);
    assert_eq!(player.health, PLAYER_MAX_HEALTH);

    let added = broadcaster
        .decoded()
        .into_iter()
        .any(|m| matches!(m, ServerMessage::PlayerAdded { player } if player.id == "p1"));
    assert!(added, "join must replicate a player-added diff");
}

#[test]
fn second_join_balances_to_blue_at_the_blue_spawn() {
    let (mut room, _) = new_room();
    join(&mut room, "p1", "ada");
    let reply = join(&mut room, "p2", "grace");

    match &reply.decoded()[0] {
        ServerMessage::TeamAssigned(assignment) => assert_eq!(assignment.team, Team::Blue),
        other => panic!("expected team-assigned, got {:?}", other),
    }
    let player = &room.state().players["p2"];
    assert_eq!((player.x, player.y), BLUE_SPAWN);
}

#[test]
fn kill_and_respawn_flow() {
    let (mut room, broadcaster) = new_room();
    join(&mut room, "p1", "ada");
    join(&mut room, "p2", "grace");
    assert_eq!(room.state().game_status, GameStatus::Playing);

    send_move(&mut room, "p1", 1500.0, 500.0);
    send_move(&mut room, "p2", 1700.0, 500.0);
    broadcaster.take();

    // One bullet sweeps into the standing target and takes one damage step.
    send_shoot(&mut room, "p1", 1500.0, 474.0);
    let shot = broadcaster
        .decoded()
        .into_iter()
        .find_map(|m| match m {
            ServerMessage::BulletAdded { bullet } => Some(bullet),
            _ => None,
        })
        .expect("shoot must replicate a bullet-added diff");
    assert_eq!(shot.velocity_x, BULLET_SPEED);
    assert_eq!(shot.owner_id, "p1");

    run_ticks(&mut room, 20);
    assert_eq!(
        room.state().players["p2"].health,
        PLAYER_MAX_HEALTH - BULLET_DAMAGE
    );
    assert!(room.state().bullets.is_empty());

    let removed = broadcaster
        .decoded()
        .into_iter()
        .any(|m| matches!(m, ServerMessage::BulletRemoved { id, .. } if id == shot.id));
    assert!(removed, "consumed bullets must replicate bullet-removed");

    // Three more rounds finish the job.
    for _ in 0..3 {
        send_shoot(&mut room, "p1", 1500.0, 474.0);
    }
    run_ticks(&mut room, 20);

    let victim = &room.state().players["p2"];
    assert!(victim.is_dead);
    assert_eq!(victim.health, 0);
    assert_eq!(victim.respawn_timer_ms, RESPAWN_MS);
    assert_eq!(room.state().scores.red, 1);
    assert_eq!(room.state().scores.blue, 0);

    let kill = broadcaster
        .decoded()
        .into_iter()
        .find_map(|m| match m {
            ServerMessage::PlayerKilled(kill) => Some(kill),
            _ => None,
        })
        .expect("a lethal hit must broadcast player-killed");
    assert_eq!(kill.killer_id, "p1");
    assert_eq!(kill.victim_id, "p2");
    assert_eq!(kill.killer_name, "ada");
    assert_eq!(kill.victim_name, "grace");

    // Scenario continues: three seconds of ticks bring grace back.
    run_ticks(&mut room, 181);
    let revived = &room.state().players["p2"];
    assert!(!revived.is_dead);
    assert_eq!(revived.health, PLAYER_MAX_HEALTH);
    assert_eq!((revived.x, revived.y), BLUE_SPAWN);
}

#[test]
fn leaver_bullets_keep_flying_and_can_still_kill() {
    let (mut room, broadcaster) = new_room();
    join(&mut room, "p1", "ada");
    join(&mut room, "p2", "grace");

    send_move(&mut room, "p1", 1500.0, 500.0);
    send_move(&mut room, "p2", 1700.0, 500.0);

    // Four rounds in the air, then the shooter disconnects.
    for _ in 0..4 {
        send_shoot(&mut room, "p1", 1500.0, 474.0);
    }
    room.handle_command(RoomCommand::Leave {
        id: "p1".to_owned(),
    });
    assert_eq!(room.state().bullets.len(), 4);
    broadcaster.take();

    run_ticks(&mut room, 20);
    let victim = &room.state().players["p2"];
    assert!(victim.is_dead);
    assert_eq!(room.state().scores.red, 1);

    let kill = broadcaster
        .decoded()
        .into_iter()
        .find_map(|m| match m {
            ServerMessage::PlayerKilled(kill) => Some(kill),
            _ => None,
        })
        .expect("orphaned bullets still broadcast player-killed");
    assert_eq!(kill.killer_id, "p1");
    // The killer's name is gone with them.
    assert_eq!(kill.killer_name, "");
}

#[test]
fn pose_updates_replicate_as_player_updated_diffs() {
    let (mut room, broadcaster) = new_room();
    join(&mut room, "p1", "ada");
    join(&mut room, "p2", "grace");
    broadcaster.take();

    send_move(&mut room, "p1", 640.0, 480.0);

    let updated = broadcaster
        .decoded()
        .into_iter()
        .find_map(|m| match m {
            ServerMessage::PlayerUpdated { player } => Some(player),
            _ => None,
        })
        .expect("a pose change must replicate player-updated");
    assert_eq!(updated.id, "p1");
    assert_eq!((updated.x, updated.y), (640.0, 480.0));
}
