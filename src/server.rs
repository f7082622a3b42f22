use crate::config;
use crate::intercomm::{CommandSender, RoomCommand};
use crate::protocol::{ClientMessage, PlayerId};
use crate::utils;

use mio_extras::timer::Timeout;
use ws;
use ws::util::Token;

pub fn set_up_websocket_server<'a>(
    commands: &'a CommandSender,
    player_ids: &'a utils::PlayerIdGenerator,
) -> Result<(ws::WebSocket<ClientFactory<'a>>, ws::Sender), ws::Error> {
    let factory = ClientFactory {
        commands,
        player_ids,
    };
    let socket = ws::Builder::new().build(factory)?;
    let broadcaster = socket.broadcaster();
    Ok((socket, broadcaster))
}

const PING: Token = Token(1);

// websocket connection handler; one per client
pub struct ClientHandler {
    out: ws::Sender,
    commands: CommandSender,
    player_id: PlayerId,
    ping_timeout: Option<Timeout>,
}

impl ClientHandler {
    fn send_ping(&mut self) -> ws::Result<()> {
        self.out.ping(utils::custom_time_ns().to_string().into())
    }
}

impl ws::Handler for ClientHandler {
    fn on_open(&mut self, shake: ws::Handshake) -> ws::Result<()> {
        let name = parse_player_name(shake.request.resource())
            .unwrap_or_else(|| self.player_id.clone());
        info!(
            "connection with player [{}] ([{}]) now open",
            self.player_id, name
        );

        self.send_ping()?;
        self.out.timeout(*config::SKIRMISH_PING_INTERVAL_MS, PING)?;

        if self
            .commands
            .send(RoomCommand::Join {
                id: self.player_id.clone(),
                name,
                reply: Box::new(self.out.clone()),
            })
            .is_err()
        {
            error!(
                "room worker is gone, closing connection for [{}]",
                self.player_id
            );
            return self.out.close(ws::CloseCode::Away);
        }
        Ok(())
    }

    fn on_message(&mut self, msg: ws::Message) -> ws::Result<()> {
        debug!("server got from player [{}]: [{}]", self.player_id, msg);
        match msg {
            ws::Message::Text(json) => match serde_json::from_str::<ClientMessage>(&json) {
                Ok(message) => {
                    if self
                        .commands
                        .send(RoomCommand::Message {
                            id: self.player_id.clone(),
                            message,
                        })
                        .is_err()
                    {
                        error!(
                            "room worker is gone, dropping message from [{}]",
                            self.player_id
                        );
                    }
                }
                // Invalid input is logged and dropped; the sender gets no reply.
                Err(error) => warn!(
                    "unrecognized message from player [{}]: [{}], error: [{:?}]",
                    self.player_id, json, error
                ),
            },
            ws::Message::Binary(_) => {
                warn!("dropping binary frame from player [{}]", self.player_id)
            }
        }
        Ok(())
    }

    fn on_timeout(&mut self, event: Token) -> ws::Result<()> {
        match event {
            // PING timeout has occured, send a ping and reschedule
            PING => {
                self.send_ping()?;
                self.ping_timeout.take();
                self.out.timeout(*config::SKIRMISH_PING_INTERVAL_MS, PING)
            }
            // No other timeouts are possible
            _ => Err(ws::Error::new(
                ws::ErrorKind::Internal,
                "unrecognized timeout token encountered",
            )),
        }
    }

    fn on_new_timeout(&mut self, event: Token, timeout: Timeout) -> ws::Result<()> {
        // Cancel the old timeout and replace.
        // This ensures there is only one ping timeout at a time
        match event {
            PING => {
                if let Some(t) = self.ping_timeout.take() {
                    self.out.cancel(t)?
                }
                self.ping_timeout = Some(timeout)
            }
            _ => {
                return Err(ws::Error::new(
                    ws::ErrorKind::Internal,
                    "unrecognized timeout token encountered",
                ))
            }
        }

        Ok(())
    }

    fn on_frame(&mut self, frame: ws::Frame) -> ws::Result<Option<ws::Frame>> {
        // If the frame is a pong, print the round-trip time.
        // The pong should contain data from out ping, but it isn't guaranteed to.
        if frame.opcode() == ws::OpCode::Pong {
            if let Ok(pong) = std::str::from_utf8(frame.payload())?.parse::<u64>() {
                let now = utils::custom_time_ns();
                debug!(
                    "round trip time for player [{}] = {}ms",
                    self.player_id,
                    (now - pong) as f32 / 1_000_000f32
                );
            } else {
                warn!("received bad pong");
            }
        }

        // Run default frame validation
        DefaultHandler.on_frame(frame)
    }

    fn on_close(&mut self, code: ws::CloseCode, reason: &str) {
        info!(
            "websocket closing for player [{}], code [{:?}], reason: [{}]",
            self.player_id, code, reason
        );
        // Clean up time sync timeout.
        if let Some(t) = self.ping_timeout.take() {
            let _ = self.out.cancel(t);
        }
        if self
            .commands
            .send(RoomCommand::Leave {
                id: self.player_id.clone(),
            })
            .is_err()
        {
            error!(
                "room worker is gone, leave for [{}] not delivered",
                self.player_id
            );
        }
    }
}

// For accessing the default handler implementation
struct DefaultHandler;

impl ws::Handler for DefaultHandler {}

pub struct ClientFactory<'a> {
    commands: &'a CommandSender,
    player_ids: &'a utils::PlayerIdGenerator,
}

impl<'a> ws::Factory for ClientFactory<'a> {
    type Handler = ClientHandler;
    fn connection_made(&mut self, sender: ws::Sender) -> ClientHandler {
        let player_id = self.player_ids.next_id();
        info!(
            "connected with client, connection id=[{}], player id=[{}]",
            sender.connection_id(),
            player_id
        );
        ClientHandler {
            out: sender,
            commands: self.commands.clone(),
            player_id,
            ping_timeout: None,
        }
    }
}

/// Pulls `name` out of the connection path's query string. Query strings here
/// are simple enough that full url parsing stays out of the picture.
fn parse_player_name(resource: &str) -> Option<String> {
    let query = resource.splitn(2, '?').nth(1)?;
    query.split('&').find_map(|pair| {
        let mut parts = pair.splitn(2, '=');
        match (parts.next(), parts.next()) {
            (Some("name"), Some(value)) if !value.is_empty() => Some(value.to_owned()),
            _ => None,
        }
    })
}
