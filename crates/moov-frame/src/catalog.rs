//! Message catalog: every tag the protocol knows and its field layout.
//!
//! Tags are globally unique across both directions, so a tag alone selects
//! the layout. Readers are still direction-scoped: a client never accepts a
//! client-to-engine tag from the engine and vice versa.

use crate::value::FieldType;

/// Client to engine: set pause state (`paused: u8`).
pub const SET_PAUSED: u8 = 1;

/// Client to engine: absolute seek (`time: f64`, seconds).
pub const SEEK: u8 = 2;

/// Client to engine: overlay text (`fg: u32, bg: u32, text: str`).
pub const PUT_MESSAGE: u8 = 3;

/// Engine to client: status reply (`request_id: u32, pl_pos: u64, pl_count: u64, time: f64, paused: u8`).
pub const STATUS_REPLY: u8 = 4;

/// Engine to client: user/chat text (`text: str`).
pub const USER_TEXT: u8 = 5;

/// Client to engine: append a media source (`path: str`).
pub const APPEND: u8 = 6;

/// Client to engine: jump to playlist index (`position: u64`).
pub const INDEX: u8 = 7;

/// Client to engine: request a status snapshot (`request_id: u32`).
pub const REQUEST_STATUS: u8 = 8;

/// Client to engine: graceful shutdown (no fields).
pub const SHUTDOWN: u8 = 9;

/// Engine to client: unsolicited control update (`pl_pos: u64, time: f64, paused: u8`).
pub const CONTROL_UPDATE: u8 = 10;

/// Which way a message travels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Commands written to the engine's standard input.
    ToEngine,
    /// Replies and events read from the engine's standard output.
    ToClient,
}

/// Layout of one catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageSpec {
    pub tag: u8,
    pub name: &'static str,
    pub direction: Direction,
    pub fields: &'static [FieldType],
}

/// The full catalog, both directions.
pub const CATALOG: &[MessageSpec] = &[
    MessageSpec {
        tag: SET_PAUSED,
        name: "set_paused",
        direction: Direction::ToEngine,
        fields: &[FieldType::U8],
    },
    MessageSpec {
        tag: SEEK,
        name: "seek",
        direction: Direction::ToEngine,
        fields: &[FieldType::F64],
    },
    MessageSpec {
        tag: PUT_MESSAGE,
        name: "put_message",
        direction: Direction::ToEngine,
        fields: &[FieldType::U32, FieldType::U32, FieldType::Str],
    },
    MessageSpec {
        tag: STATUS_REPLY,
        name: "status_reply",
        direction: Direction::ToClient,
        fields: &[
            FieldType::U32,
            FieldType::U64,
            FieldType::U64,
            FieldType::F64,
            FieldType::U8,
        ],
    },
    MessageSpec {
        tag: USER_TEXT,
        name: "user_text",
        direction: Direction::ToClient,
        fields: &[FieldType::Str],
    },
    MessageSpec {
        tag: APPEND,
        name: "append",
        direction: Direction::ToEngine,
        fields: &[FieldType::Str],
    },
    MessageSpec {
        tag: INDEX,
        name: "index",
        direction: Direction::ToEngine,
        fields: &[FieldType::U64],
    },
    MessageSpec {
        tag: REQUEST_STATUS,
        name: "request_status",
        direction: Direction::ToEngine,
        fields: &[FieldType::U32],
    },
    MessageSpec {
        tag: SHUTDOWN,
        name: "shutdown",
        direction: Direction::ToEngine,
        fields: &[],
    },
    MessageSpec {
        tag: CONTROL_UPDATE,
        name: "control_update",
        direction: Direction::ToClient,
        fields: &[FieldType::U64, FieldType::F64, FieldType::U8],
    },
];

/// Look up a tag regardless of direction.
pub fn lookup(tag: u8) -> Option<&'static MessageSpec> {
    CATALOG.iter().find(|spec| spec.tag == tag)
}

/// Look up a tag, accepting it only for the given direction.
pub fn lookup_in(tag: u8, direction: Direction) -> Option<&'static MessageSpec> {
    lookup(tag).filter(|spec| spec.direction == direction)
}

/// Returns a human-readable name for a tag.
pub fn tag_name(tag: u8) -> &'static str {
    lookup(tag).map_or("unknown", |spec| spec.name)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn tags_are_unique() {
        let tags: HashSet<u8> = CATALOG.iter().map(|spec| spec.tag).collect();
        assert_eq!(tags.len(), CATALOG.len());
    }

    #[test]
    fn lookup_respects_direction() {
        assert!(lookup_in(STATUS_REPLY, Direction::ToClient).is_some());
        assert!(lookup_in(STATUS_REPLY, Direction::ToEngine).is_none());
        assert!(lookup_in(REQUEST_STATUS, Direction::ToEngine).is_some());
        assert!(lookup_in(REQUEST_STATUS, Direction::ToClient).is_none());
        assert!(lookup(0).is_none());
        assert!(lookup(11).is_none());
    }

    #[test]
    fn layouts_match_protocol_table() {
        assert_eq!(
            lookup(PUT_MESSAGE).map(|s| s.fields),
            Some(&[FieldType::U32, FieldType::U32, FieldType::Str][..])
        );
        assert_eq!(lookup(SHUTDOWN).map(|s| s.fields.len()), Some(0));
        assert_eq!(
            lookup(CONTROL_UPDATE).map(|s| s.fields),
            Some(&[FieldType::U64, FieldType::F64, FieldType::U8][..])
        );
    }

    #[test]
    fn tag_names() {
        assert_eq!(tag_name(SEEK), "seek");
        assert_eq!(tag_name(USER_TEXT), "user_text");
        assert_eq!(tag_name(200), "unknown");
    }
}
