//! Per-room game loops.
//!
//! A started room gets its own task that owns the room's [`Player`]s. The
//! task reacts to commands (players arriving, leaving, pressing keys) and,
//! on every tick of its [`TickScheduler`], integrates all players and
//! broadcasts a `world_state` snapshot. It stops once the last player is
//! gone.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use darkhouse_protocol::{ConnectionId, PlayerSnapshot, RoomId, ServerEvent};
use darkhouse_session::Notifier;
use darkhouse_sim::{
    MovementFlags, Player, TickConfig, TickInfo, TickScheduler, Vec2, facing_angle,
};
use tokio::sync::mpsc;

/// Distance of each spawn corner from the room centre along both axes.
pub const SPAWN_OFFSET: f64 = 40.0;

/// Spawn corners in the order players are placed.
const SPAWN_CORNERS: [(f64, f64); 4] = [(-1.0, -1.0), (1.0, 1.0), (1.0, -1.0), (-1.0, 1.0)];

/// Spawn position and facing for the `index`-th player of a room, facing
/// the centre.
pub fn spawn_point(index: usize) -> (f64, f64, f64) {
    let (sx, sy) = SPAWN_CORNERS[index % SPAWN_CORNERS.len()];
    let (x, y) = (sx * SPAWN_OFFSET, sy * SPAWN_OFFSET);
    (x, y, facing_angle(Vec2::new(-x, -y)))
}

#[derive(Debug)]
enum GameCommand {
    AddPlayer(ConnectionId),
    RemovePlayer(ConnectionId),
    Input {
        from: ConnectionId,
        keys: MovementFlags,
    },
    Flashlight {
        from: ConnectionId,
        on: bool,
    },
}

type GameSender = mpsc::UnboundedSender<GameCommand>;

/// Handles to every running game loop, keyed by room.
pub(crate) struct GameLoops<N> {
    notifier: N,
    tick: TickConfig,
    max_dt: Duration,
    games: Mutex<HashMap<RoomId, GameSender>>,
}

impl<N: Notifier + Clone> GameLoops<N> {
    pub(crate) fn new(notifier: N, tick: TickConfig, max_dt: Duration) -> Self {
        Self {
            notifier,
            tick,
            max_dt,
            games: Mutex::new(HashMap::new()),
        }
    }

    /// Puts `players` into the room's game, spawning the loop if none is
    /// running. Players already in the game are left where they are.
    pub(crate) fn start(&self, room_id: &RoomId, players: &[ConnectionId]) {
        let mut games = self.games.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(sender) = games.get(room_id).filter(|sender| !sender.is_closed()) {
            for &connection_id in players {
                let _ = sender.send(GameCommand::AddPlayer(connection_id));
            }
            return;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        let mut world = GameWorld {
            room_id: room_id.clone(),
            players: BTreeMap::new(),
            spawned: 0,
            commands: rx,
            notifier: self.notifier.clone(),
            scheduler: TickScheduler::new(self.tick.clone()),
            max_dt: self.max_dt,
        };
        for &connection_id in players {
            world.add_player(connection_id);
        }

        tokio::spawn(world.run());
        games.insert(room_id.clone(), tx);
    }

    pub(crate) fn remove_player(&self, room_id: &RoomId, connection_id: ConnectionId) {
        self.send(room_id, GameCommand::RemovePlayer(connection_id));
    }

    pub(crate) fn input(&self, room_id: &RoomId, from: ConnectionId, keys: MovementFlags) {
        self.send(room_id, GameCommand::Input { from, keys });
    }

    pub(crate) fn flashlight(&self, room_id: &RoomId, from: ConnectionId, on: bool) {
        self.send(room_id, GameCommand::Flashlight { from, on });
    }

    pub(crate) fn is_running(&self, room_id: &RoomId) -> bool {
        self.games
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(room_id)
            .is_some_and(|sender| !sender.is_closed())
    }

    /// Forgets loops that have stopped. Returns how many were dropped.
    pub(crate) fn prune_stopped(&self) -> usize {
        let mut games = self.games.lock().unwrap_or_else(PoisonError::into_inner);
        let before = games.len();
        games.retain(|_, sender| !sender.is_closed());
        before - games.len()
    }

    /// Commands for rooms without a running game are dropped.
    fn send(&self, room_id: &RoomId, command: GameCommand) {
        let mut games = self.games.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = games.get(room_id) else {
            return;
        };
        if sender.send(command).is_err() {
            games.remove(room_id);
        }
    }
}

/// The state of one running game. Owned by its task.
struct GameWorld<N> {
    room_id: RoomId,
    /// Keyed by connection so snapshots list players in a stable order.
    players: BTreeMap<ConnectionId, Player>,
    /// Players placed so far, including those who left.
    spawned: usize,
    commands: mpsc::UnboundedReceiver<GameCommand>,
    notifier: N,
    scheduler: TickScheduler,
    max_dt: Duration,
}

impl<N: Notifier> GameWorld<N> {
    async fn run(mut self) {
        tracing::info!(room_id = %self.room_id, players = self.players.len(), "game loop started");

        while !self.players.is_empty() {
            tokio::select! {
                command = self.commands.recv() => match command {
                    Some(command) => self.handle(command),
                    None => break,
                },
                info = self.scheduler.wait_for_tick() => self.step(&info),
            }
        }

        tracing::info!(
            room_id = %self.room_id,
            ticks = self.scheduler.tick_count(),
            "game loop stopped"
        );
    }

    fn handle(&mut self, command: GameCommand) {
        match command {
            GameCommand::AddPlayer(connection_id) => self.add_player(connection_id),
            GameCommand::RemovePlayer(connection_id) => {
                if self.players.remove(&connection_id).is_some() {
                    tracing::debug!(room_id = %self.room_id, %connection_id, "player removed");
                }
            }
            GameCommand::Input { from, keys } => {
                if let Some(player) = self.players.get_mut(&from) {
                    player.set_movement_flags(keys);
                }
            }
            GameCommand::Flashlight { from, on } => {
                if let Some(player) = self.players.get_mut(&from) {
                    player.set_flashlight_on(on);
                }
            }
        }
    }

    fn add_player(&mut self, connection_id: ConnectionId) {
        if self.players.contains_key(&connection_id) {
            return;
        }
        let (x, y, angle) = spawn_point(self.spawned);
        self.spawned += 1;
        self.players.insert(connection_id, Player::new(x, y, angle));
        tracing::debug!(room_id = %self.room_id, %connection_id, x, y, "player spawned");
    }

    fn step(&mut self, info: &TickInfo) {
        if info.overrun {
            tracing::debug!(
                room_id = %self.room_id,
                tick = info.tick,
                skipped = info.ticks_skipped,
                "late tick"
            );
        }

        let dt = info.dt.min(self.max_dt).as_secs_f64();
        for player in self.players.values_mut() {
            player.update(dt);
        }

        let snapshot: Vec<PlayerSnapshot> = self
            .players
            .iter()
            .map(|(&connection_id, player)| PlayerSnapshot {
                connection_id,
                state: player.state(),
            })
            .collect();

        for &connection_id in self.players.keys() {
            self.notifier.notify(
                connection_id,
                ServerEvent::WorldState {
                    tick: info.tick,
                    players: snapshot.clone(),
                },
            );
        }
        tracing::trace!(room_id = %self.room_id, tick = info.tick, "world state sent");
    }
}
