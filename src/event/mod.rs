//! Map events: fixed size records linked into chains by index.

mod chain;
mod record;

pub use self::chain::{
    ChainWalk, EVENT_RECORD_SIZE, EventChain, NO_SUCCESSOR, decode_event_chain,
    decode_event_chain_from, decode_event_chains,
};
pub use self::record::*;
