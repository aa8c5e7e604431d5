//! Delimiter stuffing for packed payloads.
//!
//! Every occurrence of [`START_BYTE`] in the payload is replaced by the
//! distance to the next occurrence, and the last one by `0`. The index of the
//! first occurrence travels in the header's overhead byte, so the receiver can
//! walk the chain and put the delimiters back.
//!
//! The anchor and every hop are single bytes. The chain therefore starts at an
//! occurrence below index `0xFF` and follows occurrences while each hop fits
//! in a byte; anything beyond the last reachable occurrence stays literal.
//! Frames are length-delimited, so a literal delimiter inside the payload is
//! harmless to the parser and the round trip stays exact.

use crate::codec::{NO_OVERHEAD, START_BYTE};

const MAX_HOP: usize = u8::MAX as usize;

/// Index of the leftmost delimiter-valued byte.
pub fn find_first_delimiter(payload: &[u8]) -> Option<usize> {
    payload.iter().position(|&b| b == START_BYTE)
}

/// Index of the rightmost delimiter-valued byte.
pub fn find_last_delimiter(payload: &[u8]) -> Option<usize> {
    payload.iter().rposition(|&b| b == START_BYTE)
}

/// Stuff `payload` in place and return the overhead byte for the header.
///
/// Returns [`NO_OVERHEAD`] and leaves the payload untouched when there is
/// nothing to stuff.
pub fn stuff(payload: &mut [u8]) -> u8 {
    let first = match find_first_delimiter(payload) {
        Some(first) if first < NO_OVERHEAD as usize => first,
        _ => return NO_OVERHEAD,
    };

    let end = chain_end(payload, first);
    let last = match find_last_delimiter(&payload[..=end]) {
        Some(last) => last,
        None => return NO_OVERHEAD,
    };

    // Walk back from the last occurrence; each one points at the occurrence
    // processed just before it.
    let mut next = last;
    for index in (first..=last).rev() {
        if payload[index] == START_BYTE {
            payload[index] = (next - index) as u8;
            next = index;
        }
    }

    first as u8
}

/// Restore delimiters in a stuffed `payload`.
///
/// Starts at `overhead` and follows the stored hops until a zero hop. Hops
/// that leave the payload end the walk. Returns the number of restored
/// bytes.
pub fn unstuff(payload: &mut [u8], overhead: u8) -> usize {
    if overhead == NO_OVERHEAD {
        return 0;
    }

    let mut restored = 0usize;
    let mut index = overhead as usize;
    while let Some(slot) = payload.get_mut(index) {
        let hop = *slot;
        *slot = START_BYTE;
        restored += 1;
        if hop == 0 {
            break;
        }
        index += hop as usize;
    }
    restored
}

/// Last occurrence reachable from `first` in hops of at most one byte.
fn chain_end(payload: &[u8], first: usize) -> usize {
    let mut current = first;
    while let Some(offset) = find_first_delimiter(&payload[current + 1..]) {
        let hop = offset + 1;
        if hop > MAX_HOP {
            break;
        }
        current += hop;
    }
    current
}
