//! The world task.
//!
//! One tokio task owns the [`GameLoop`]. Client input reaches it over an
//! mpsc channel and is applied between ticks; every tick's snapshot and
//! events are encoded once and broadcast to all clients.

use std::collections::BTreeMap;
use std::sync::Arc;

use starfall_core::entities::EntityId;
use starfall_core::game_loop::{GameLoop, PlayerCommand};
use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

use crate::clients::{encode, ClientManager, ConnectionId};
use crate::config::ServerConfig;
use crate::protocol::{ServerMessage, WorldUpdate};

/// Input from connections to the world task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorldInput {
    /// Create a player for the connection.
    Login {
        /// Client id.
        client_id: String,
        /// Connection that sent the login.
        connection: ConnectionId,
        /// Display name.
        username: String,
    },
    /// Queue a command for the connection's player.
    Action {
        /// Client id.
        client_id: String,
        /// Command to queue.
        command: PlayerCommand,
    },
    /// The connection closed.
    Disconnect {
        /// Client id.
        client_id: String,
        /// Connection that closed.
        connection: ConnectionId,
    },
}

/// A logged-in client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Session {
    connection: ConnectionId,
    player: EntityId,
}

/// World task state outside the simulation itself.
struct World {
    game: GameLoop,
    clients: Arc<ClientManager>,
    sessions: BTreeMap<String, Session>,
    max_players: usize,
}

impl World {
    fn apply(&mut self, input: WorldInput) {
        match input {
            WorldInput::Login {
                client_id,
                connection,
                username,
            } => self.login(client_id, connection, username),
            WorldInput::Action { client_id, command } => self.action(&client_id, command),
            WorldInput::Disconnect {
                client_id,
                connection,
            } => self.disconnect(&client_id, connection),
        }
    }

    fn login(&mut self, client_id: String, connection: ConnectionId, username: String) {
        if let Some(session) = self.sessions.get_mut(&client_id) {
            let player_id = session.player;
            if session.connection == connection {
                self.clients.send_to(
                    &client_id,
                    &ServerMessage::error(format!("Already logged in as player {player_id}")),
                );
                return;
            }
            // The earlier connection for this id has closed; its player
            // carries over to the new one.
            session.connection = connection;
            tracing::info!(client_id, player_id, connection, "Player reconnected");
            self.clients.send_to(
                &client_id,
                &ServerMessage::LoginSuccess {
                    player_id,
                    message: format!("Welcome back to Starfall, {username}"),
                },
            );
            return;
        }
        if self.sessions.len() >= self.max_players {
            tracing::info!(client_id, "Login refused, server full");
            self.clients
                .send_to(&client_id, &ServerMessage::error("Server is full"));
            return;
        }

        let player_id = self.game.add_player(username.as_str());
        tracing::info!(client_id, player_id, username, "Player logged in");
        self.sessions.insert(
            client_id.clone(),
            Session {
                connection,
                player: player_id,
            },
        );
        self.clients.send_to(
            &client_id,
            &ServerMessage::LoginSuccess {
                player_id,
                message: format!("Welcome to Starfall, {username}"),
            },
        );
    }

    fn action(&mut self, client_id: &str, command: PlayerCommand) {
        let Some(player_id) = self.sessions.get(client_id).map(|s| s.player) else {
            self.clients
                .send_to(client_id, &ServerMessage::error("Login required"));
            return;
        };
        if let Err(e) = self.game.queue_command(player_id, command) {
            tracing::warn!(client_id, player_id, error = %e, "Rejected command");
            self.clients
                .send_to(client_id, &ServerMessage::error(e.to_string()));
        }
    }

    fn disconnect(&mut self, client_id: &str, connection: ConnectionId) {
        let player_id = match self.sessions.get(client_id) {
            Some(session) if session.connection == connection => session.player,
            Some(_) => {
                tracing::debug!(client_id, connection, "Ignoring disconnect of replaced connection");
                return;
            }
            None => return,
        };
        self.sessions.remove(client_id);
        match self.game.remove_player(player_id) {
            Ok(player) => tracing::info!(client_id, player_id, name = %player.name, "Player left"),
            Err(e) => tracing::warn!(client_id, player_id, error = %e, "Player already gone"),
        }
    }

    fn tick(&mut self) {
        let events = self.game.tick();
        if self.clients.is_empty() {
            return;
        }
        let update = ServerMessage::WorldUpdate(WorldUpdate {
            snapshot: self.game.snapshot(),
            events,
        });
        if let Some(text) = encode(&update) {
            self.clients.broadcast_text(&text);
        }
    }
}

/// Run the simulation until the input channel closes or the loop is ended.
pub async fn run_world(
    game: GameLoop,
    mut inputs: mpsc::Receiver<WorldInput>,
    clients: Arc<ClientManager>,
    config: ServerConfig,
) {
    let handle = game.handle();
    let mut world = World {
        game,
        clients,
        sessions: BTreeMap::new(),
        max_players: config.max_players,
    };

    let mut interval = time::interval(config.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(tick_rate = config.tick_rate, "World task started");
    loop {
        tokio::select! {
            _ = interval.tick() => {
                if !handle.is_active() {
                    break;
                }
                world.tick();
            }
            input = inputs.recv() => match input {
                Some(input) => world.apply(input),
                None => {
                    world.game.end();
                    break;
                }
            },
        }
    }
    tracing::info!(tick = world.game.tick_count(), "World task stopped");
}
