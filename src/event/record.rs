//! The typed payloads of map events.
//!
//! Every event occupies 12 bytes on disk: a type tag, a 9 byte payload and the index of the
//! next event. Fields whose meaning is unknown are kept verbatim in `unknown*` members, so
//! nothing from the payload is lost.

use serde::Serialize;

pub const EVENT_PAYLOAD_SIZE: usize = 9;

pub type RawPayload = [u8; EVENT_PAYLOAD_SIZE];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum EventType {
    MapChange = 1,
    Door = 2,
    Chest = 3,
    PopupText = 4,
    Spinner = 5,
    Trap = 6,
    Riddlemouth = 8,
    Award = 9,
    ChangeTile = 10,
    StartBattle = 11,
    Condition = 13,
    Action = 14,
    Dice100Roll = 15,
    Conversation = 16,
    PrintText = 17,
    Decision = 19,
    ChangeMusic = 20,
}

impl EventType {
    pub fn from_u8(tag: u8) -> Option<EventType> {
        let event_type = match tag {
            1 => EventType::MapChange,
            2 => EventType::Door,
            3 => EventType::Chest,
            4 => EventType::PopupText,
            5 => EventType::Spinner,
            6 => EventType::Trap,
            8 => EventType::Riddlemouth,
            9 => EventType::Award,
            10 => EventType::ChangeTile,
            11 => EventType::StartBattle,
            13 => EventType::Condition,
            14 => EventType::Action,
            15 => EventType::Dice100Roll,
            16 => EventType::Conversation,
            17 => EventType::PrintText,
            19 => EventType::Decision,
            20 => EventType::ChangeMusic,
            _ => return None,
        };
        Some(event_type)
    }
}

#[inline]
fn word(hi: u8, lo: u8) -> u16 {
    u16::from_be_bytes([hi, lo])
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MapChangeEvent {
    pub x: u8,
    pub y: u8,
    pub direction: u8,
    pub unknown1: [u8; 2],
    pub map_index: u16,
    pub unknown2: [u8; 2],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DoorEvent {
    pub unknown: [u8; 5],
    pub key_index: u16,
    pub unlock_fail_event_index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChestEvent {
    pub lock_flags: u8,
    pub unknown: u16,
    pub chest_index: u8,
    pub remove_when_empty: u8,
    pub key_index: u16,
    pub unlock_fail_event_index: u16,
}

impl ChestEvent {
    pub fn removes_when_empty(&self) -> bool {
        self.remove_when_empty != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PopupTextEvent {
    pub image_index: u8,
    pub trigger: u8,
    pub unknown1: u8,
    pub text_index: u16,
    pub unknown2: [u8; 4],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpinnerEvent {
    pub direction: u8,
    pub unknown: [u8; 8],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrapEvent {
    pub trap_type: u8,
    pub target: u8,
    pub value: u8,
    pub unknown1: u8,
    pub unknown2: [u8; 5],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiddlemouthEvent {
    pub intro_text_index: u8,
    pub solution_text_index: u8,
    pub unknown: [u8; 5],
    pub correct_answer_index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AwardEvent {
    pub award_type: u8,
    pub operation: u8,
    pub random: u8,
    pub target: u8,
    pub unknown: u8,
    pub type_value: u16,
    pub value: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeTileEvent {
    pub x: u8,
    pub y: u8,
    pub unknown: u8,
    /// Back and front tile indices, bit-packed. See the accessors.
    pub tile_data: [u8; 4],
    pub map_index: u16,
}

impl ChangeTileEvent {
    /// 11 bits: the top 3 bits of `tile_data[1]` (bits 7, 6 and 5) above `tile_data[0]`.
    ///
    /// Bit 5 counts too, so `[0x05, 0xA0, ..]` yields `0x505`. Only `[0x05, 0x80, ..]` yields
    /// `0x405` (1029).
    pub fn back_tile_index(&self) -> u16 {
        let [b0, b1, _, _] = self.tile_data;
        (u16::from(b1 & 0xE0) << 3) | u16::from(b0)
    }

    /// 11 bits: the low 3 bits of `tile_data[2]` above `tile_data[3]`.
    pub fn front_tile_index(&self) -> u16 {
        let [_, _, b2, b3] = self.tile_data;
        (u16::from(b2 & 0x07) << 8) | u16::from(b3)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StartBattleEvent {
    pub unknown1: [u8; 6],
    pub monster_group_index: u8,
    pub unknown2: [u8; 2],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionEvent {
    pub condition_type: u8,
    pub value: u8,
    pub unknown: [u8; 4],
    pub object_index: u8,
    pub jump_if_false: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionEvent {
    pub action_type: u8,
    pub value: u8,
    pub unknown1: [u8; 4],
    pub object_index: u8,
    pub unknown2: [u8; 2],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dice100RollEvent {
    pub chance: u8,
    pub unknown: [u8; 6],
    pub jump_if_false: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConversationEvent {
    pub interaction: u8,
    pub unknown1: [u8; 4],
    pub value: u16,
    pub unknown2: [u8; 2],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrintTextEvent {
    pub npc_text_index: u8,
    pub unknown: [u8; 8],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionEvent {
    pub text_index: u8,
    pub unknown: [u8; 6],
    pub no_event_index: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangeMusicEvent {
    pub music_index: u16,
    pub volume: u8,
    pub unknown: [u8; 6],
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum EventPayload {
    MapChange(MapChangeEvent),
    Door(DoorEvent),
    Chest(ChestEvent),
    PopupText(PopupTextEvent),
    Spinner(SpinnerEvent),
    Trap(TrapEvent),
    Riddlemouth(RiddlemouthEvent),
    Award(AwardEvent),
    ChangeTile(ChangeTileEvent),
    StartBattle(StartBattleEvent),
    Condition(ConditionEvent),
    Action(ActionEvent),
    Dice100Roll(Dice100RollEvent),
    Conversation(ConversationEvent),
    PrintText(PrintTextEvent),
    Decision(DecisionEvent),
    ChangeMusic(ChangeMusicEvent),
    /// Event types without a dedicated layout. The tag lives on the owning record.
    Opaque(RawPayload),
}

impl EventPayload {
    /// Decode the 9 payload bytes of an event tagged `tag`. Never fails.
    pub fn decode(tag: u8, raw: &RawPayload) -> EventPayload {
        match EventType::from_u8(tag) {
            Some(event_type) => Self::decode_known(event_type, *raw),
            None => EventPayload::Opaque(*raw),
        }
    }

    fn decode_known(event_type: EventType, raw: RawPayload) -> EventPayload {
        let [b0, b1, b2, b3, b4, b5, b6, b7, b8] = raw;

        match event_type {
            EventType::MapChange => EventPayload::MapChange(MapChangeEvent {
                x: b0,
                y: b1,
                direction: b2,
                unknown1: [b3, b4],
                map_index: word(b5, b6),
                unknown2: [b7, b8],
            }),
            EventType::Door => EventPayload::Door(DoorEvent {
                unknown: [b0, b1, b2, b3, b4],
                key_index: word(b5, b6),
                unlock_fail_event_index: word(b7, b8),
            }),
            EventType::Chest => EventPayload::Chest(ChestEvent {
                lock_flags: b0,
                unknown: word(b1, b2),
                chest_index: b3,
                remove_when_empty: b4,
                key_index: word(b5, b6),
                unlock_fail_event_index: word(b7, b8),
            }),
            EventType::PopupText => EventPayload::PopupText(PopupTextEvent {
                image_index: b0,
                trigger: b1,
                unknown1: b2,
                text_index: word(b3, b4),
                unknown2: [b5, b6, b7, b8],
            }),
            EventType::Spinner => EventPayload::Spinner(SpinnerEvent {
                direction: b0,
                unknown: [b1, b2, b3, b4, b5, b6, b7, b8],
            }),
            EventType::Trap => EventPayload::Trap(TrapEvent {
                trap_type: b0,
                target: b1,
                value: b2,
                unknown1: b3,
                unknown2: [b4, b5, b6, b7, b8],
            }),
            EventType::Riddlemouth => EventPayload::Riddlemouth(RiddlemouthEvent {
                intro_text_index: b0,
                solution_text_index: b1,
                unknown: [b2, b3, b4, b5, b6],
                correct_answer_index: word(b7, b8),
            }),
            EventType::Award => EventPayload::Award(AwardEvent {
                award_type: b0,
                operation: b1,
                random: b2,
                target: b3,
                unknown: b4,
                type_value: word(b5, b6),
                value: word(b7, b8),
            }),
            EventType::ChangeTile => EventPayload::ChangeTile(ChangeTileEvent {
                x: b0,
                y: b1,
                unknown: b2,
                tile_data: [b3, b4, b5, b6],
                map_index: word(b7, b8),
            }),
            EventType::StartBattle => EventPayload::StartBattle(StartBattleEvent {
                unknown1: [b0, b1, b2, b3, b4, b5],
                monster_group_index: b6,
                unknown2: [b7, b8],
            }),
            EventType::Condition => EventPayload::Condition(ConditionEvent {
                condition_type: b0,
                value: b1,
                unknown: [b2, b3, b4, b5],
                object_index: b6,
                jump_if_false: word(b7, b8),
            }),
            EventType::Action => EventPayload::Action(ActionEvent {
                action_type: b0,
                value: b1,
                unknown1: [b2, b3, b4, b5],
                object_index: b6,
                unknown2: [b7, b8],
            }),
            EventType::Dice100Roll => EventPayload::Dice100Roll(Dice100RollEvent {
                chance: b0,
                unknown: [b1, b2, b3, b4, b5, b6],
                jump_if_false: word(b7, b8),
            }),
            EventType::Conversation => EventPayload::Conversation(ConversationEvent {
                interaction: b0,
                unknown1: [b1, b2, b3, b4],
                value: word(b5, b6),
                unknown2: [b7, b8],
            }),
            EventType::PrintText => EventPayload::PrintText(PrintTextEvent {
                npc_text_index: b0,
                unknown: [b1, b2, b3, b4, b5, b6, b7, b8],
            }),
            EventType::Decision => EventPayload::Decision(DecisionEvent {
                text_index: b0,
                unknown: [b1, b2, b3, b4, b5, b6],
                no_event_index: word(b7, b8),
            }),
            EventType::ChangeMusic => EventPayload::ChangeMusic(ChangeMusicEvent {
                music_index: word(b0, b1),
                volume: b2,
                unknown: [b3, b4, b5, b6, b7, b8],
            }),
        }
    }

    pub fn is_opaque(&self) -> bool {
        matches!(self, EventPayload::Opaque(_))
    }
}

/// One decoded event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    pub type_tag: u8,
    /// 1-based position in the stream. Text lookups refer to events by this number.
    pub index: usize,
    pub payload: EventPayload,
    /// 0-based position of the successor in the owning array, `None` for the end of a chain.
    pub next: Option<usize>,
}

impl EventRecord {
    pub fn event_type(&self) -> Option<EventType> {
        EventType::from_u8(self.type_tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_change_tile_bit_packing() {
        let raw = [0x10, 0x20, 0x00, 0x05, 0x80, 0x03, 0x7F, 0x00, 0x2A];
        let EventPayload::ChangeTile(event) = EventPayload::decode(10, &raw) else {
            panic!("expected a change tile event");
        };

        assert_eq!((event.x, event.y), (0x10, 0x20));
        assert_eq!(event.back_tile_index(), 1029);
        assert_eq!(event.front_tile_index(), 895);
        assert_eq!(event.map_index, 42);
    }

    #[test]
    fn test_change_tile_uses_only_the_documented_bits() {
        let event = ChangeTileEvent {
            x: 0,
            y: 0,
            unknown: 0,
            tile_data: [0x05, 0xA0, 0x03, 0x7F],
            map_index: 0,
        };
        assert_eq!(event.back_tile_index(), 0x505);
        assert_eq!(event.front_tile_index(), 0x37F);

        let event = ChangeTileEvent {
            tile_data: [0xFF, 0x1F, 0xF8, 0x00],
            ..event
        };
        assert_eq!(event.back_tile_index(), 0xFF);
        assert_eq!(event.front_tile_index(), 0);
    }

    #[test]
    fn test_map_change_keeps_unused_bytes() {
        let raw = [3, 4, 2, 0xAA, 0xBB, 0x01, 0x02, 0xCC, 0xDD];
        assert_eq!(
            EventPayload::decode(1, &raw),
            EventPayload::MapChange(MapChangeEvent {
                x: 3,
                y: 4,
                direction: 2,
                unknown1: [0xAA, 0xBB],
                map_index: 0x0102,
                unknown2: [0xCC, 0xDD],
            })
        );
    }

    #[test]
    fn test_chest_layout() {
        let raw = [0x64, 0x12, 0x34, 7, 1, 0x00, 0x05, 0xFF, 0xFF];
        let EventPayload::Chest(chest) = EventPayload::decode(3, &raw) else {
            panic!("expected a chest event");
        };
        assert_eq!(chest.lock_flags, 100);
        assert_eq!(chest.unknown, 0x1234);
        assert_eq!(chest.chest_index, 7);
        assert!(chest.removes_when_empty());
        assert_eq!(chest.key_index, 5);
        assert_eq!(chest.unlock_fail_event_index, 0xFFFF);
    }

    #[test]
    fn test_word_fields_are_big_endian() {
        let raw = [0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08, 0x09];

        let EventPayload::Award(award) = EventPayload::decode(9, &raw) else {
            panic!("expected an award event");
        };
        assert_eq!(award.type_value, 0x0607);
        assert_eq!(award.value, 0x0809);

        let EventPayload::ChangeMusic(music) = EventPayload::decode(20, &raw) else {
            panic!("expected a music event");
        };
        assert_eq!(music.music_index, 0x0102);
        assert_eq!(music.volume, 3);

        let EventPayload::Conversation(talk) = EventPayload::decode(16, &raw) else {
            panic!("expected a conversation event");
        };
        assert_eq!(talk.value, 0x0607);
        assert_eq!(talk.unknown1, [2, 3, 4, 5]);
    }

    #[test]
    fn test_every_known_tag_decodes_to_its_variant() {
        let raw = [0u8; EVENT_PAYLOAD_SIZE];
        for tag in 0..=u8::MAX {
            let payload = EventPayload::decode(tag, &raw);
            assert_eq!(
                payload.is_opaque(),
                EventType::from_u8(tag).is_none(),
                "tag {tag}"
            );
        }
        assert_eq!(EventType::from_u8(EventType::Decision as u8), Some(EventType::Decision));
    }

    #[test]
    fn test_unknown_tag_keeps_raw_bytes() {
        let raw = [9, 8, 7, 6, 5, 4, 3, 2, 1];
        assert_eq!(EventPayload::decode(0xFE, &raw), EventPayload::Opaque(raw));
        // Legacy tags without a dedicated layout are opaque too.
        assert!(EventPayload::decode(7, &raw).is_opaque());
    }
}
