use log::{debug, trace, warn};
use serde::Serialize;

use crate::DecoderSettings;
use crate::err::{AmberError, DeserializationResult, Result};
use crate::event::record::{EVENT_PAYLOAD_SIZE, EventPayload, EventRecord};
use crate::utils::ByteCursor;

/// A `next` value of `0xFFFF` terminates a chain.
pub const NO_SUCCESSOR: u16 = 0xFFFF;

/// Tag + payload + `next`.
pub const EVENT_RECORD_SIZE: usize = 1 + EVENT_PAYLOAD_SIZE + 2;

/// All events of one map, linked into chains.
///
/// `entries` and every `next` are 0-based indices into `events`. They are kept exactly as
/// stored, so a value may point past the end of `events`; the accessors return `None` then.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EventChain {
    pub events: Vec<EventRecord>,
    pub entries: Vec<usize>,
}

impl EventChain {
    /// Decode an event stream positioned at its entry count.
    ///
    /// Consumes exactly the stream: after a successful call the cursor points at the first
    /// byte after the last event record.
    pub fn from_cursor(cursor: &mut ByteCursor) -> DeserializationResult<EventChain> {
        let num_entries = cursor.u16_named("event entry count")?;
        if num_entries == 0 {
            trace!("Offset {}: empty event stream", cursor.pos() - 2);
            return Ok(EventChain::default());
        }

        let entries = (0..num_entries)
            .map(|_| cursor.u16_named("event entry").map(usize::from))
            .collect::<DeserializationResult<Vec<usize>>>()?;

        let num_events = usize::from(cursor.u16_named("event count")?);
        let mut events = Vec::with_capacity(num_events.min(cursor.remaining() / EVENT_RECORD_SIZE));

        for i in 0..num_events {
            let offset = cursor.pos();
            let type_tag = cursor.u8_named("event type")?;
            let raw = cursor.array::<EVENT_PAYLOAD_SIZE>("event payload")?;
            let next = cursor.u16_named("next event index")?;

            let payload = EventPayload::decode(type_tag, &raw);
            if payload.is_opaque() {
                debug!(
                    "Offset {}: event {} has unknown type {}, keeping raw payload",
                    offset,
                    i + 1,
                    type_tag
                );
            }

            events.push(EventRecord {
                type_tag,
                index: i + 1,
                payload,
                next: (next != NO_SUCCESSOR).then_some(usize::from(next)),
            });
        }

        trace!(
            "Decoded {} events with {} entry points",
            events.len(),
            entries.len()
        );
        Ok(EventChain { events, entries })
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&EventRecord> {
        self.events.get(index)
    }

    /// The first event of the `k`-th chain.
    pub fn entry_point(&self, k: usize) -> Option<&EventRecord> {
        self.events.get(*self.entries.get(k)?)
    }

    /// The event following `events[i]`, if any.
    pub fn successor(&self, i: usize) -> Option<&EventRecord> {
        self.events.get(self.events.get(i)?.next?)
    }

    /// Follow the chain starting at `events[start]`.
    ///
    /// Stops at the end of the chain, at an index outside of `events`, or when an event
    /// would be visited a second time, so cyclic chains terminate.
    pub fn walk(&self, start: usize) -> ChainWalk<'_> {
        ChainWalk {
            chain: self,
            current: Some(start),
            visited: vec![false; self.events.len()],
        }
    }

    /// Walk the `k`-th chain.
    pub fn walk_entry(&self, k: usize) -> ChainWalk<'_> {
        let mut walk = self.walk(0);
        walk.current = self.entries.get(k).copied();
        walk
    }

    pub fn into_parts(self) -> (Vec<EventRecord>, Vec<usize>) {
        (self.events, self.entries)
    }

    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

pub struct ChainWalk<'a> {
    chain: &'a EventChain,
    current: Option<usize>,
    visited: Vec<bool>,
}

impl<'a> Iterator for ChainWalk<'a> {
    type Item = &'a EventRecord;

    fn next(&mut self) -> Option<Self::Item> {
        let index = self.current.take()?;
        let record = self.chain.events.get(index)?;

        let seen = self.visited.get_mut(index)?;
        if *seen {
            return None;
        }
        *seen = true;

        self.current = record.next;
        Some(record)
    }
}

/// Decode a complete event stream held in `data`.
///
/// Either the whole stream decodes or an error is returned; trailing bytes after the last
/// record are ignored.
pub fn decode_event_chain(data: &[u8]) -> Result<EventChain> {
    let mut cursor = ByteCursor::new(data);
    decode_event_chain_from(&mut cursor)
}

/// Like [`decode_event_chain`], reading from (and advancing) an existing cursor.
pub fn decode_event_chain_from(cursor: &mut ByteCursor) -> Result<EventChain> {
    EventChain::from_cursor(cursor)
        .map_err(|source| AmberError::FailedToDecodeEventChain { source })
}

/// Decode many independent event streams, e.g. one per map.
///
/// Results are returned in input order. With the `multithreading` feature the streams are
/// spread over `settings.get_num_threads()` workers.
pub fn decode_event_chains(streams: &[&[u8]], settings: &DecoderSettings) -> Vec<Result<EventChain>> {
    #[cfg(feature = "multithreading")]
    {
        use rayon::prelude::*;

        match rayon::ThreadPoolBuilder::new()
            .num_threads(settings.get_num_threads())
            .build()
        {
            Ok(pool) => {
                return pool.install(|| {
                    streams
                        .par_iter()
                        .map(|data| decode_event_chain(data))
                        .collect()
                });
            }
            Err(e) => warn!("Failed to build thread pool ({e}), decoding serially"),
        }
    }

    #[cfg(not(feature = "multithreading"))]
    {
        if settings.get_num_threads() > 1 {
            warn!("Built without `multithreading`, ignoring `num_threads`");
        }
    }

    streams.iter().map(|data| decode_event_chain(data)).collect()
}
