//! Per-packet-ID handlers invoked when a packet completes.

use tracing::debug;

/// Borrowed view of a packet that just passed validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceivedPacket<'a> {
    pub id: u8,
    pub command: u16,
    pub payload: &'a [u8],
}

/// Something that reacts to completed packets.
///
/// Handlers run synchronously inside the parser call that completed the
/// packet. They must not block.
pub trait PacketHandler: Send {
    fn on_packet(&mut self, packet: &ReceivedPacket<'_>);
}

impl<F> PacketHandler for F
where
    F: FnMut(&ReceivedPacket<'_>) + Send,
{
    fn on_packet(&mut self, packet: &ReceivedPacket<'_>) {
        self(packet)
    }
}

/// Handlers indexed by packet ID.
///
/// Entry `n` handles packets whose ID is `n`. IDs past the end of the table
/// are ignored. The table holds at most one entry per possible ID.
#[derive(Default)]
pub struct CallbackTable {
    handlers: Vec<Option<Box<dyn PacketHandler>>>,
}

impl CallbackTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a handler for the next packet ID. A full table drops it.
    pub fn with(mut self, handler: impl PacketHandler + 'static) -> Self {
        if self.push(handler).is_none() {
            debug!("callback table is full, handler dropped");
        }
        self
    }

    /// Append an empty slot for the next packet ID.
    pub fn with_empty(mut self) -> Self {
        if self.next_id().is_some() {
            self.handlers.push(None);
        }
        self
    }

    /// Append a handler; returns the packet ID it was assigned, or `None`
    /// when every ID already has an entry.
    pub fn push(&mut self, handler: impl PacketHandler + 'static) -> Option<u8> {
        let id = self.next_id()?;
        self.handlers.push(Some(Box::new(handler)));
        Some(id)
    }

    fn next_id(&self) -> Option<u8> {
        u8::try_from(self.handlers.len()).ok()
    }

    /// Install a handler for a specific ID, growing the table as needed.
    pub fn set(&mut self, id: u8, handler: impl PacketHandler + 'static) {
        let index = usize::from(id);
        if self.handlers.len() <= index {
            self.handlers.resize_with(index + 1, || None);
        }
        self.handlers[index] = Some(Box::new(handler));
    }

    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Invoke the handler for `packet.id`. Returns whether one ran.
    pub fn dispatch(&mut self, packet: &ReceivedPacket<'_>) -> bool {
        match self.handlers.get_mut(usize::from(packet.id)) {
            Some(Some(handler)) => {
                handler.on_packet(packet);
                true
            }
            _ => {
                debug!(packet_id = packet.id, "no callback registered for packet ID");
                false
            }
        }
    }
}

impl std::fmt::Debug for CallbackTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registered = self.handlers.iter().filter(|h| h.is_some()).count();
        f.debug_struct("CallbackTable")
            .field("len", &self.handlers.len())
            .field("registered", &registered)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn counter() -> (Arc<AtomicUsize>, impl PacketHandler + 'static) {
        let hits = Arc::new(AtomicUsize::new(0));
        let handle = Arc::clone(&hits);
        (hits, move |_: &ReceivedPacket<'_>| {
            handle.fetch_add(1, Ordering::SeqCst);
        })
    }

    fn packet(id: u8) -> ReceivedPacket<'static> {
        ReceivedPacket {
            id,
            command: 1,
            payload: b"x",
        }
    }

    #[test]
    fn dispatches_by_id() {
        let (zero, h0) = counter();
        let (one, h1) = counter();
        let mut table = CallbackTable::new().with(h0).with(h1);

        assert!(table.dispatch(&packet(1)));
        assert_eq!(zero.load(Ordering::SeqCst), 0);
        assert_eq!(one.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn out_of_range_and_empty_slots_are_ignored() {
        let (hits, handler) = counter();
        let mut table = CallbackTable::new().with_empty().with(handler);

        assert!(!table.dispatch(&packet(0)));
        assert!(!table.dispatch(&packet(9)));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn set_grows_table() {
        let (hits, handler) = counter();
        let mut table = CallbackTable::new();
        table.set(4, handler);

        assert_eq!(table.len(), 5);
        assert!(table.dispatch(&packet(4)));
        assert!(!table.dispatch(&packet(3)));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_sees_packet_contents() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut table = CallbackTable::new();
        let id = table.push(move |p: &ReceivedPacket<'_>| {
            sink.lock().unwrap().push((p.command, p.payload.to_vec()));
        });
        assert_eq!(id, Some(0));

        table.dispatch(&ReceivedPacket {
            id: 0,
            command: 7,
            payload: &[1, 2, 3],
        });
        assert_eq!(*seen.lock().unwrap(), vec![(7u16, vec![1u8, 2, 3])]);
    }

    #[test]
    fn push_stops_at_last_packet_id() {
        let mut table = CallbackTable::new();
        for expected in 0..=u8::MAX {
            assert_eq!(table.push(|_: &ReceivedPacket<'_>| {}), Some(expected));
        }

        let (hits, handler) = counter();
        assert_eq!(table.push(handler), None);
        assert_eq!(table.len(), 256);

        // The rejected handler must not have replaced ID 0.
        let mut table = table.with_empty();
        assert_eq!(table.len(), 256);
        assert!(table.dispatch(&packet(0)));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }
}
