//! Room id generation.

use darkhouse_protocol::RoomId;
use rand::Rng;

/// Upper bound (exclusive) of the numeric room codes handed out by
/// [`RandomRoomIds`].
pub const ROOM_CODE_SPACE: u32 = 999_999;

/// Source of fresh room ids.
///
/// Ids only need to be unlikely to collide; the registry retries when one
/// does. Any `Fn() -> RoomId` closure works as a generator.
pub trait RoomIdGenerator: Send + Sync + 'static {
    fn next_id(&self) -> RoomId;
}

impl<F> RoomIdGenerator for F
where
    F: Fn() -> RoomId + Send + Sync + 'static,
{
    fn next_id(&self) -> RoomId {
        self()
    }
}

/// Random decimal codes in `0..ROOM_CODE_SPACE`, short enough to read out
/// loud or type into a join box.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomRoomIds;

impl RoomIdGenerator for RandomRoomIds {
    fn next_id(&self) -> RoomId {
        let code = rand::rng().random_range(0..ROOM_CODE_SPACE);
        RoomId::new(code.to_string())
    }
}
