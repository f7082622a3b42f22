#[macro_use]
extern crate log;

use std::sync::mpsc;

use skirmish::config;
use skirmish::room::{self, Room};
use skirmish::server;
use skirmish::utils;

fn parse_args() -> (String,) {
    let args: Vec<String> = std::env::args().collect();
    let socket_address = args
        .get(1)
        .cloned()
        .unwrap_or_else(|| "127.0.0.1:9001".to_owned());
    (socket_address,)
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    config::init();

    let (socket_address,) = parse_args();
    info!("starting server, using address [{}]...", socket_address);

    // Create communication channel between websocket handlers and the room
    // worker.
    let (commands_tx, commands_rx) = mpsc::channel();

    // Configure websocket server.
    let player_ids = utils::PlayerIdGenerator::new();
    let (socket, broadcaster) = server::set_up_websocket_server(&commands_tx, &player_ids)?;

    // Start the room worker.
    let room = Room::new(config::SKIRMISH_ROOM_ID.clone(), Box::new(broadcaster));
    let terminate_room = room::start_room_thread(room, commands_rx)?;

    // Start listening (on event loop).
    if let Err(error) = socket.listen(socket_address) {
        error!("failed to create websocket due to {:?}", error)
    }

    // If the websocket server quit for some reason, terminate the room worker.
    terminate_room();

    info!("game server closed.");
    Ok(())
}
