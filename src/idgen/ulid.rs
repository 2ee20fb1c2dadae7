//! 128-bit lexicographically sortable identifiers.
//!
//! Layout: 48-bit millisecond timestamp followed by 80 random bits, rendered as
//! 26 Crockford base-32 characters. The first character only carries 3 bits, so
//! anything above `7` there would overflow 128 bits and is rejected.

use super::IdError;
use crate::domain_port::Clock;
use parking_lot::Mutex;
use rand::RngCore;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

pub const ULID_CHARS: usize = 26;
pub const RANDOM_BYTES: usize = 10;
pub const MAX_TIME: u64 = (1 << 48) - 1;

const ALPHABET_UPPER: &[u8; 32] = b"0123456789ABCDEFGHJKMNPQRSTVWXYZ";
const ALPHABET_LOWER: &[u8; 32] = b"0123456789abcdefghjkmnpqrstvwxyz";

const fn decode_table() -> [i8; 256] {
    let mut table = [-1i8; 256];
    let mut i = 0;
    while i < 32 {
        table[ALPHABET_UPPER[i] as usize] = i as i8;
        table[ALPHABET_LOWER[i] as usize] = i as i8;
        i += 1;
    }
    table[b'O' as usize] = 0;
    table[b'o' as usize] = 0;
    table[b'I' as usize] = 1;
    table[b'i' as usize] = 1;
    table[b'L' as usize] = 1;
    table[b'l' as usize] = 1;
    table
}

static DECODE: [i8; 256] = decode_table();

#[derive(Debug, Clone, Copy, Default, Ord, PartialOrd, Eq, PartialEq, Hash)]
pub struct Ulid(u128);

impl Ulid {
    pub const MIN: Ulid = Ulid(0);
    pub const MAX: Ulid = Ulid(u128::MAX);

    pub fn new(time_ms: u64, random: [u8; RANDOM_BYTES]) -> Result<Self, IdError> {
        if time_ms > MAX_TIME {
            return Err(IdError::TimeOverflow(
                i64::try_from(time_ms).unwrap_or(i64::MAX),
            ));
        }
        let mut tail = [0u8; 16];
        tail[16 - RANDOM_BYTES..].copy_from_slice(&random);
        Ok(Ulid(((time_ms as u128) << 80) | u128::from_be_bytes(tail)))
    }

    pub fn with_rng<R: RngCore + ?Sized>(time_ms: u64, rng: &mut R) -> Result<Self, IdError> {
        let mut random = [0u8; RANDOM_BYTES];
        rng.fill_bytes(&mut random);
        Ulid::new(time_ms, random)
    }

    pub fn from_parts(msb: u64, lsb: u64) -> Self {
        Ulid(((msb as u128) << 64) | lsb as u128)
    }

    pub fn msb(&self) -> u64 {
        (self.0 >> 64) as u64
    }

    pub fn lsb(&self) -> u64 {
        self.0 as u64
    }

    pub fn time(&self) -> u64 {
        (self.0 >> 80) as u64
    }

    pub fn random(&self) -> [u8; RANDOM_BYTES] {
        let bytes = self.0.to_be_bytes();
        let mut random = [0u8; RANDOM_BYTES];
        random.copy_from_slice(&bytes[16 - RANDOM_BYTES..]);
        random
    }

    /// Next value in unsigned 128-bit order. Overflow of the low half carries into
    /// the high half; `MAX` wraps to `MIN`.
    pub fn increment(&self) -> Ulid {
        let lsb = self.lsb().wrapping_add(1);
        let msb = if lsb == 0 {
            self.msb().wrapping_add(1)
        } else {
            self.msb()
        };
        Ulid::from_parts(msb, lsb)
    }

    pub fn to_lowercase_string(&self) -> String {
        self.encode(ALPHABET_LOWER)
    }

    fn encode(&self, alphabet: &[u8; 32]) -> String {
        (0..ULID_CHARS)
            .map(|i| {
                let shift = 125 - 5 * i;
                alphabet[((self.0 >> shift) & 0x1f) as usize] as char
            })
            .collect()
    }

    pub fn decode(s: &str) -> Result<Self, IdError> {
        let bytes = s.as_bytes();
        if bytes.len() != ULID_CHARS {
            return Err(IdError::InvalidFormat(format!(
                "expected {ULID_CHARS} characters, got {}",
                bytes.len()
            )));
        }
        let mut value: u128 = 0;
        for (i, &b) in bytes.iter().enumerate() {
            let digit = DECODE[b as usize];
            if digit < 0 {
                return Err(IdError::InvalidFormat(format!(
                    "invalid character at position {i}"
                )));
            }
            if i == 0 && digit > 7 {
                return Err(IdError::InvalidFormat(
                    "time component exceeds 48 bits".to_owned(),
                ));
            }
            value = (value << 5) | digit as u128;
        }
        Ok(Ulid(value))
    }
}

impl fmt::Display for Ulid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode(ALPHABET_UPPER))
    }
}

impl FromStr for Ulid {
    type Err = IdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ulid::decode(s)
    }
}

impl From<Ulid> for u128 {
    fn from(value: Ulid) -> Self {
        value.0
    }
}

/// Hands out strictly increasing ULIDs: within one millisecond (or after the clock
/// steps back) the previous value is incremented instead of drawing new randomness.
pub struct UlidGenerator {
    clock: Arc<dyn Clock>,
    last: Mutex<Option<Ulid>>,
}

impl UlidGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        UlidGenerator {
            clock,
            last: Mutex::new(None),
        }
    }

    pub fn next_ulid(&self) -> Result<Ulid, IdError> {
        let now = self.clock.now_millis();
        let now = u64::try_from(now).map_err(|_| IdError::TimeOverflow(now))?;

        let mut last = self.last.lock();
        let next = match *last {
            Some(prev) if now <= prev.time() => prev.increment(),
            _ => Ulid::with_rng(now, &mut rand::thread_rng())?,
        };
        *last = Some(next);
        Ok(next)
    }
}
