//! CRC-16/CCITT-FALSE.
//!
//! Polynomial `0x1021`, initial value `0xFFFF`, no input/output reflection,
//! no final xor. The lookup table is built at compile time.

const POLYNOMIAL: u16 = 0x1021;
const INITIAL: u16 = 0xFFFF;

static TABLE: [u16; 256] = build_table();

const fn build_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = (i as u16) << 8;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 0x8000 != 0 {
                (crc << 1) ^ POLYNOMIAL
            } else {
                crc << 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Checksum of `bytes`.
pub fn crc16(bytes: &[u8]) -> u16 {
    bytes.iter().fold(INITIAL, |crc, &byte| {
        let index = ((crc >> 8) as u8 ^ byte) as usize;
        (crc << 8) ^ TABLE[index]
    })
}
