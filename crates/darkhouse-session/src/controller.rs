//! The session controller: turns room intents into registry changes and
//! notifications.
//!
//! # Locking
//!
//! A room's lock is taken before the directory lock, never the other way
//! round, and no task holds two room locks at once. Leaving a previous room
//! therefore happens after the new room's lock is released.

use std::sync::Arc;

use darkhouse_protocol::{ConnectionId, RoomId, ServerEvent};

use crate::{ConnectionDirectory, SessionError, SessionRegistry};

/// Delivers a [`ServerEvent`] to one connection.
///
/// Delivery is fire-and-forget: a connection that has already gone away
/// simply misses the event.
pub trait Notifier: Send + Sync + 'static {
    fn notify(&self, to: ConnectionId, event: ServerEvent);
}

impl<N: Notifier> Notifier for Arc<N> {
    fn notify(&self, to: ConnectionId, event: ServerEvent) {
        (**self).notify(to, event);
    }
}

/// Coordinates room intents across the registry and the directory.
///
/// Capacity, host-only start and "already started" are not enforced here.
pub struct SessionController<N> {
    registry: Arc<SessionRegistry>,
    directory: Arc<ConnectionDirectory>,
    notifier: N,
}

impl<N: Notifier> SessionController<N> {
    pub fn new(
        registry: Arc<SessionRegistry>,
        directory: Arc<ConnectionDirectory>,
        notifier: N,
    ) -> Self {
        Self {
            registry,
            directory,
            notifier,
        }
    }

    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    pub fn directory(&self) -> &Arc<ConnectionDirectory> {
        &self.directory
    }

    /// Opens a room hosted by `connection_id` and tells it the new id.
    ///
    /// A connection already in another room leaves it.
    pub async fn create(&self, connection_id: ConnectionId) -> Result<RoomId, SessionError> {
        let room_id = match self.registry.create_session(connection_id).await {
            Ok(room_id) => room_id,
            Err(e) => {
                self.notifier.notify(
                    connection_id,
                    ServerEvent::Error {
                        code: 503,
                        message: e.to_string(),
                    },
                );
                return Err(e);
            }
        };

        let previous = self.directory.bind(connection_id, room_id.clone()).await;
        self.notifier.notify(
            connection_id,
            ServerEvent::Created {
                room_id: room_id.clone(),
            },
        );

        if let Some(previous) = previous {
            self.leave(connection_id, &previous).await;
        }
        Ok(room_id)
    }

    /// Adds `connection_id` to `room_id`.
    ///
    /// The joiner gets `joined` with everyone already there; each of them
    /// gets `member_joined`. Returns those prior members in join order.
    pub async fn join(
        &self,
        connection_id: ConnectionId,
        room_id: &RoomId,
    ) -> Result<Vec<ConnectionId>, SessionError> {
        let (others, previous) = {
            let mut session = match self.registry.lock(room_id).await {
                Ok(session) => session,
                Err(e) => {
                    self.not_found(connection_id, room_id);
                    return Err(e);
                }
            };

            let others = session.add_member(connection_id);
            let previous = self.directory.bind(connection_id, room_id.clone()).await;

            self.notifier.notify(
                connection_id,
                ServerEvent::Joined {
                    room_id: room_id.clone(),
                    members: others.clone(),
                },
            );
            for &member in &others {
                self.notifier.notify(
                    member,
                    ServerEvent::MemberJoined {
                        room_id: room_id.clone(),
                        connection_id,
                    },
                );
            }

            tracing::info!(%room_id, %connection_id, members = session.len(), "member joined");
            (others, previous)
        };

        if let Some(previous) = previous.filter(|previous| previous != room_id) {
            self.leave(connection_id, &previous).await;
        }
        Ok(others)
    }

    /// Starts the game in `room_id` and signals every member.
    ///
    /// Any connection may start any room, and starting twice signals twice.
    /// Returns the members that were signalled.
    pub async fn start(
        &self,
        connection_id: ConnectionId,
        room_id: &RoomId,
    ) -> Result<Vec<ConnectionId>, SessionError> {
        self.start_with(connection_id, room_id, |_| {}).await
    }

    /// Like [`start`](Self::start), but runs `on_started` with the members
    /// while the room is still locked. No member can leave before it
    /// returns, so anything it sets up for them sees every later departure.
    pub async fn start_with<F>(
        &self,
        connection_id: ConnectionId,
        room_id: &RoomId,
        on_started: F,
    ) -> Result<Vec<ConnectionId>, SessionError>
    where
        F: FnOnce(&[ConnectionId]),
    {
        let mut session = match self.registry.lock(room_id).await {
            Ok(session) => session,
            Err(e) => {
                self.not_found(connection_id, room_id);
                return Err(e);
            }
        };

        if session.start() {
            tracing::info!(%room_id, %connection_id, "room started");
        } else {
            tracing::debug!(%room_id, %connection_id, "room already started");
        }

        let members = session.members().to_vec();
        for &member in &members {
            self.notifier.notify(member, ServerEvent::Started);
        }
        on_started(&members);
        Ok(members)
    }

    /// Handles a closed connection. Returns the room it was in, if any.
    ///
    /// Remaining members each get one `member_left`. A connection that was
    /// never bound produces no notifications.
    pub async fn disconnect(&self, connection_id: ConnectionId) -> Option<RoomId> {
        let room_id = self.directory.unbind(connection_id).await?;
        self.leave(connection_id, &room_id).await;
        Some(room_id)
    }

    async fn leave(&self, connection_id: ConnectionId, room_id: &RoomId) {
        let Ok(mut session) = self.registry.lock(room_id).await else {
            return;
        };
        if !session.remove_member(connection_id) {
            return;
        }

        for &member in session.members() {
            self.notifier
                .notify(member, ServerEvent::MemberLeft { connection_id });
        }
        tracing::info!(%room_id, %connection_id, members = session.len(), "member left");
    }

    fn not_found(&self, connection_id: ConnectionId, room_id: &RoomId) {
        tracing::debug!(%room_id, %connection_id, "room not found");
        self.notifier.notify(
            connection_id,
            ServerEvent::RoomNotFound {
                room_id: room_id.clone(),
            },
        );
    }
}
