//! The authoritative room: a single-threaded worker owning all match state.
//!
//! Connection handlers feed [`RoomCommand`]s through one mpsc channel; the
//! worker interleaves them with fixed-rate ticks, so no two handlers for the
//! same room ever run concurrently. Clients simulate their own movement and
//! send positions; the room trusts pose but computes bullet velocity, damage,
//! scoring and match end itself.

use crate::config;
use crate::constants::{
    team_spawn, BULLET_DAMAGE, BULLET_LIFETIME_MS, BULLET_SPEED, MAX_CLIENTS, PLAYER_MAX_HEALTH,
    RESPAWN_MS, WIN_SCORE, WORLD_MAX_X, WORLD_MIN_X,
};
use crate::geometry;
use crate::intercomm::{CommandReceiver, Outbound, RoomCommand};
use crate::protocol::{
    Bullet, ClientMessage, DashMessage, GameStatus, KillEvent, MatchResult, MoveMessage, Player,
    PlayerId, RoomMetadata, RoomState, ServerMessage, ShootMessage, Team, TeamAssignment,
};
use crate::replication;
use crate::utils;

use ncollide2d::bounding_volume::BoundingVolume;

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use std::sync::mpsc;
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Instant;

pub fn start_room_thread(
    mut room: Room,
    commands: CommandReceiver,
) -> Result<impl FnOnce() -> (), Box<dyn std::error::Error>> {
    let (room_is_cancelled, cancel_room) = utils::make_atomic_canceller();
    let worker = thread::Builder::new()
        .name("Room".to_owned())
        .spawn(move || room.run_until_cancelled(commands, room_is_cancelled))?;
    let terminate_room = move || {
        info!("requesting room worker to stop...");
        cancel_room();
        match worker.join().unwrap() {
            Err(details) => error!("room worker failed, details: [{}]", details),
            Ok(_) => info!("room worker closed without error."),
        };
    };
    Ok(terminate_room)
}

pub struct Room {
    id: String,
    state: RoomState,
    /// State as of the last broadcast; diffed against `state` to produce
    /// replication events.
    mirror: RoomState,
    clients: HashMap<PlayerId, Box<dyn Outbound>>,
    broadcaster: Box<dyn Outbound>,
    metadata: Arc<RwLock<RoomMetadata>>,
    /// Per-owner bullet sequence numbers; two shots in the same millisecond
    /// still get distinct ids.
    bullet_seq: HashMap<PlayerId, u64>,
    /// Lifetime safety net, keyed by game-clock deadline. Popping an id that
    /// was already removed by the sweep is a no-op.
    expirations: BinaryHeap<Reverse<(u64, String)>>,
}

impl Room {
    pub fn new(id: String, broadcaster: Box<dyn Outbound>) -> Room {
        let state = RoomState::new();
        let metadata = Arc::new(RwLock::new(RoomMetadata {
            red_count: 0,
            blue_count: 0,
            game_status: state.game_status,
        }));
        Room {
            id,
            mirror: state.clone(),
            state,
            clients: HashMap::new(),
            broadcaster,
            metadata,
            bullet_seq: HashMap::new(),
            expirations: BinaryHeap::new(),
        }
    }

    pub fn state(&self) -> &RoomState {
        &self.state
    }

    /// Lobby-readable metadata handle; refreshed on join/leave and status
    /// transitions.
    pub fn metadata(&self) -> Arc<RwLock<RoomMetadata>> {
        self.metadata.clone()
    }

    pub fn run_until_cancelled<F: Fn() -> bool>(
        &mut self,
        commands: CommandReceiver,
        cancelled: F,
    ) -> Result<(), String> {
        info!("room [{}] worker started.", self.id);

        let tick_interval = *config::SKIRMISH_TICK_INTERVAL;
        let mut last_tick = Instant::now();
        while !cancelled() {
            let now = Instant::now();
            let deadline = last_tick + tick_interval;
            if now >= deadline {
                let delta_ms = now.duration_since(last_tick).as_secs_f64() * 1000.0;
                last_tick = now;
                self.handle_command(RoomCommand::Tick { delta_ms });
                continue;
            }
            match commands.recv_timeout(deadline.duration_since(now)) {
                Ok(command) => self.handle_command(command),
                Err(mpsc::RecvTimeoutError::Timeout) => continue,
                Err(mpsc::RecvTimeoutError::Disconnected) => {
                    return Err("room command channel disconnected".to_owned());
                }
            };
        }

        info!("room [{}] detected cancellation, terminating...", self.id);

        Ok(())
    }

    /// Single entry point for all room mutation; broadcasts the resulting
    /// state diff before returning.
    pub fn handle_command(&mut self, command: RoomCommand) {
        match command {
            RoomCommand::Join { id, name, reply } => self.handle_join(id, name, reply),
            RoomCommand::Leave { id } => self.handle_leave(&id),
            RoomCommand::Message { id, message } => match message {
                ClientMessage::Move(movement) => self.handle_move(&id, movement),
                ClientMessage::Dash(dash) => self.handle_dash(&id, dash),
                ClientMessage::Shoot(shot) => self.handle_shoot(&id, shot),
            },
            RoomCommand::Tick { delta_ms } => self.tick(delta_ms),
        };
        self.flush();
    }

    fn handle_join(&mut self, id: PlayerId, name: String, reply: Box<dyn Outbound>) {
        if self.state.players.len() >= MAX_CLIENTS {
            warn!("room [{}] is full, refusing player [{}]", self.id, id);
            reply.close();
            return;
        }

        let team = self.balance_team();
        info!(
            "player [{}] ([{}]) joined room [{}] on team [{:?}]",
            id, name, self.id, team
        );
        self.state
            .players
            .insert(id.clone(), Player::spawn(id.clone(), name.clone(), team));

        let assignment = ServerMessage::TeamAssigned(TeamAssignment {
            team,
            player_id: id.clone(),
            room_id: self.id.clone(),
            player_name: name,
        });
        match serde_json::to_string(&assignment) {
            Ok(json) => {
                if let Err(details) = reply.send_text(json) {
                    warn!("failed to deliver team assignment to [{}]: [{}]", id, details);
                }
            }
            Err(error) => error!("failed to encode team assignment: [{:?}]", error),
        }
        self.clients.insert(id, reply);
        self.maybe_start();
    }

    fn handle_leave(&mut self, id: &str) {
        if self.state.players.remove(id).is_some() {
            info!("player [{}] left room [{}]", id, self.id);
        }
        self.clients.remove(id);
        // In-flight bullets keep the owner's id and team; they fly on.
        self.bullet_seq.remove(id);
    }

    fn handle_move(&mut self, id: &str, movement: MoveMessage) {
        if !(movement.x.is_finite()
            && movement.y.is_finite()
            && movement.velocity_x.is_finite()
            && movement.velocity_y.is_finite())
        {
            warn!("dropping move with non-finite fields from [{}]", id);
            return;
        }
        // Unknown sender or dead player: silently ignored.
        let player = match self.state.players.get_mut(id) {
            Some(player) if !player.is_dead => player,
            _ => return,
        };
        player.x = movement.x;
        player.y = movement.y;
        player.velocity_x = movement.velocity_x;
        player.velocity_y = movement.velocity_y;
        player.flip_x = movement.flip_x;
    }

    fn handle_dash(&mut self, id: &str, dash: DashMessage) {
        if let Some(player) = self.state.players.get_mut(id) {
            if !player.is_dead {
                player.is_dashing = dash.is_dashing;
            }
        }
    }

    fn handle_shoot(&mut self, id: &str, shot: ShootMessage) {
        if self.state.game_status != GameStatus::Playing {
            return;
        }
        if !(shot.x.is_finite() && shot.y.is_finite()) {
            warn!("dropping shoot with non-finite position from [{}]", id);
            return;
        }
        let (flip_x, team) = match self.state.players.get(id) {
            Some(player) if !player.is_dead => (player.flip_x, player.team),
            _ => return,
        };

        // The client never dictates bullet velocity.
        let velocity_x = BULLET_SPEED * if flip_x { -1.0 } else { 1.0 };

        let seq = {
            let counter = self.bullet_seq.entry(id.to_owned()).or_insert(0);
            let current = *counter;
            *counter += 1;
            current
        };
        let bullet = Bullet {
            id: format!("{}-{}", id, seq),
            x: shot.x,
            y: shot.y,
            velocity_x,
            owner_id: id.to_owned(),
            owner_team: team,
            spawned_at_ms: self.state.game_time_ms,
        };
        if !(bullet.x.is_finite() && bullet.y.is_finite() && bullet.velocity_x.is_finite()) {
            warn!("refusing bullet with non-finite fields from [{}]", id);
            return;
        }

        let deadline = (self.state.game_time_ms + BULLET_LIFETIME_MS).ceil() as u64;
        self.expirations.push(Reverse((deadline, bullet.id.clone())));
        debug!("player [{}] fired bullet [{}]", id, bullet.id);
        self.state.bullets.push(bullet);
    }

    /// One fixed-rate simulation step.
    pub fn tick(&mut self, delta_ms: f64) {
        if !delta_ms.is_finite() || delta_ms < 0.0 {
            warn!("room [{}] skipping tick with bad delta [{}]", self.id, delta_ms);
            return;
        }
        if self.state.game_status != GameStatus::Playing {
            return;
        }
        self.state.game_time_ms += delta_ms;
        self.advance_respawns(delta_ms);
        self.advance_bullets(delta_ms);
        self.expire_due_bullets();
    }

    fn advance_respawns(&mut self, delta_ms: f64) {
        for player in self.state.players.values_mut() {
            if !(player.is_dead && player.respawn_timer_ms > 0.0) {
                continue;
            }
            player.respawn_timer_ms -= delta_ms;
            if player.respawn_timer_ms <= 0.0 {
                player.respawn_timer_ms = 0.0;
                player.is_dead = false;
                player.health = PLAYER_MAX_HEALTH;
                let (x, y) = team_spawn(player.team);
                player.x = x;
                player.y = y;
                player.velocity_x = 0.0;
                player.velocity_y = 0.0;
            }
        }
    }

    /// Swept-AABB pass over every bullet: a bullet that crosses a player in
    /// one step still hits, however fast it travels.
    fn advance_bullets(&mut self, delta_ms: f64) {
        let dt_seconds = (delta_ms / 1000.0) as f32;
        let mut removals: Vec<usize> = vec![];
        let mut directs: Vec<ServerMessage> = vec![];

        for index in 0..self.state.bullets.len() {
            let (prev_x, y, velocity_x, owner_id, owner_team) = {
                let bullet = &self.state.bullets[index];
                (
                    bullet.x,
                    bullet.y,
                    bullet.velocity_x,
                    bullet.owner_id.clone(),
                    bullet.owner_team,
                )
            };
            if !(prev_x.is_finite() && y.is_finite() && velocity_x.is_finite()) {
                warn!(
                    "removing bullet [{}] with non-finite state",
                    self.state.bullets[index].id
                );
                removals.push(index);
                continue;
            }

            let next_x = prev_x + velocity_x * dt_seconds;
            let swept = geometry::swept_bullet_aabb(prev_x, next_x, y);

            // First overlapped enemy absorbs the bullet; scan order is map
            // order, so simultaneous overlaps resolve in unspecified order.
            let victim_id = self
                .state
                .players
                .iter()
                .find(|&(id, player)| {
                    player.team != owner_team
                        && *id != owner_id
                        && !player.is_dead
                        && swept.intersects(&geometry::player_aabb(player.x, player.y))
                })
                .map(|(id, _)| id.clone());

            if let Some(victim_id) = victim_id {
                removals.push(index);
                self.resolve_hit(&owner_id, owner_team, &victim_id, &mut directs);
                continue;
            }

            self.state.bullets[index].x = next_x;
            if geometry::hits_platform(&geometry::bullet_aabb(next_x, y))
                || next_x < WORLD_MIN_X
                || next_x > WORLD_MAX_X
            {
                removals.push(index);
            }
        }

        removals.sort_unstable();
        removals.dedup();
        for &index in removals.iter().rev() {
            self.state.bullets.remove(index);
        }

        for message in directs {
            self.broadcast(&message);
        }
    }

    fn resolve_hit(
        &mut self,
        killer_id: &str,
        killer_team: Team,
        victim_id: &str,
        directs: &mut Vec<ServerMessage>,
    ) {
        let victim_name = {
            let victim = match self.state.players.get_mut(victim_id) {
                Some(victim) => victim,
                None => return,
            };
            victim.health -= BULLET_DAMAGE;
            if victim.health > 0 {
                return;
            }
            victim.health = 0;
            victim.is_dead = true;
            victim.respawn_timer_ms = RESPAWN_MS;
            victim.name.clone()
        };

        // The killer may have disconnected while the bullet flew; the kill
        // still counts for the team.
        let killer_name = self
            .state
            .players
            .get(killer_id)
            .map(|player| player.name.clone())
            .unwrap_or_default();
        info!(
            "player [{}] killed [{}] in room [{}]",
            killer_id, victim_id, self.id
        );
        directs.push(ServerMessage::PlayerKilled(KillEvent {
            killer_id: killer_id.to_owned(),
            victim_id: victim_id.to_owned(),
            killer_name,
            victim_name,
        }));

        let total = self.state.scores.add(killer_team);
        if self.state.game_status == GameStatus::Playing && total >= WIN_SCORE {
            self.state.game_status = GameStatus::Ended;
            self.state.winning_team = Some(killer_team);
            info!(
                "match ended in room [{}], [{:?}] wins with {:?}",
                self.id, killer_team, self.state.scores
            );
            directs.push(ServerMessage::MatchEnded(MatchResult {
                winning_team: killer_team,
                scores: self.state.scores,
            }));
        }
    }

    fn expire_due_bullets(&mut self) {
        let now = self.state.game_time_ms as u64;
        loop {
            match self.expirations.peek() {
                Some(Reverse((deadline, _))) if *deadline <= now => {}
                _ => break,
            }
            if let Some(Reverse((_, id))) = self.expirations.pop() {
                if let Some(position) = self.state.bullets.iter().position(|b| b.id == id) {
                    debug!("bullet [{}] expired", id);
                    self.state.bullets.remove(position);
                }
            }
        }
    }

    fn balance_team(&self) -> Team {
        let (red, blue) = self.team_counts();
        if blue < red {
            Team::Blue
        } else {
            Team::Red
        }
    }

    fn team_counts(&self) -> (usize, usize) {
        let red = self
            .state
            .players
            .values()
            .filter(|p| p.team == Team::Red)
            .count();
        (red, self.state.players.len() - red)
    }

    /// The match starts the first time both teams are populated; it never
    /// drops back to waiting.
    fn maybe_start(&mut self) {
        if self.state.game_status != GameStatus::Waiting {
            return;
        }
        let (red, blue) = self.team_counts();
        if red > 0 && blue > 0 {
            info!("room [{}] has both teams filled, starting match", self.id);
            self.state.game_status = GameStatus::Playing;
        }
    }

    fn broadcast(&self, message: &ServerMessage) {
        match serde_json::to_string(message) {
            Ok(json) => {
                debug!("room [{}] broadcasting: [{}]", self.id, json);
                if let Err(details) = self.broadcaster.send_text(json) {
                    error!("room [{}] broadcast failed: [{}]", self.id, details);
                }
            }
            Err(error) => error!("failed to encode broadcast: [{:?}]", error),
        }
    }

    fn flush(&mut self) {
        for event in replication::diff(&self.mirror, &self.state) {
            self.broadcast(&event);
        }
        self.mirror = self.state.clone();
        self.refresh_metadata();
    }

    fn refresh_metadata(&self) {
        let (red_count, blue_count) = self.team_counts();
        let fresh = RoomMetadata {
            red_count,
            blue_count,
            game_status: self.state.game_status,
        };
        let mut metadata = self.metadata.write().unwrap();
        if *metadata != fresh {
            debug!("room [{}] metadata now {:?}", self.id, fresh);
            *metadata = fresh;
        }
    }
}
