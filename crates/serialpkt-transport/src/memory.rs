use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use crate::error::Result;
use crate::traits::ByteTransport;

type Pipe = Arc<Mutex<VecDeque<u8>>>;

/// One end of an in-memory full-duplex byte link.
///
/// Created in pairs with [`MemoryTransport::pair`]: bytes written on one end
/// become available on the other. Both ends are `Send`, so a pair can
/// straddle two threads.
#[derive(Debug, Clone)]
pub struct MemoryTransport {
    inbound: Pipe,
    outbound: Pipe,
}

impl MemoryTransport {
    /// Create two connected ends.
    pub fn pair() -> (Self, Self) {
        let a_to_b: Pipe = Arc::default();
        let b_to_a: Pipe = Arc::default();
        (
            Self {
                inbound: Arc::clone(&b_to_a),
                outbound: Arc::clone(&a_to_b),
            },
            Self {
                inbound: a_to_b,
                outbound: b_to_a,
            },
        )
    }

    /// Queue bytes as if the peer had sent them.
    pub fn inject(&self, bytes: &[u8]) {
        lock(&self.inbound).extend(bytes.iter().copied());
    }

    /// Number of bytes written by this end that the peer has not read yet.
    pub fn pending_output(&self) -> usize {
        lock(&self.outbound).len()
    }
}

impl ByteTransport for MemoryTransport {
    fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        lock(&self.outbound).extend(bytes.iter().copied());
        Ok(())
    }

    fn bytes_available(&mut self) -> Result<usize> {
        Ok(lock(&self.inbound).len())
    }

    fn read_byte(&mut self) -> Result<Option<u8>> {
        Ok(lock(&self.inbound).pop_front())
    }

    fn clear_input(&mut self) -> Result<usize> {
        let mut inbound = lock(&self.inbound);
        let dropped = inbound.len();
        inbound.clear();
        Ok(dropped)
    }
}

fn lock(pipe: &Pipe) -> std::sync::MutexGuard<'_, VecDeque<u8>> {
    pipe.lock().unwrap_or_else(PoisonError::into_inner)
}
