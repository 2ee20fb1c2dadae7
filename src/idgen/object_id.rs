use super::IdError;
use crate::domain_port::Clock;
use rand::RngCore;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

const COUNTER_MASK: u32 = 0x00ff_ffff;

/// 12-byte ids: big-endian seconds, a 5-byte per-process value and a 3-byte
/// rolling counter, rendered as 24 lowercase hex characters.
pub struct ObjectIdGenerator {
    clock: Arc<dyn Clock>,
    process_unique: [u8; 5],
    counter: AtomicU32,
}

impl ObjectIdGenerator {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        let mut rng = rand::thread_rng();
        let mut process_unique = [0u8; 5];
        rng.fill_bytes(&mut process_unique);
        ObjectIdGenerator {
            clock,
            process_unique,
            counter: AtomicU32::new(rng.next_u32() & COUNTER_MASK),
        }
    }

    pub fn next_bytes(&self) -> Result<[u8; 12], IdError> {
        let secs = self.clock.now().timestamp();
        let secs = u32::try_from(secs).map_err(|_| IdError::TimeOverflow(secs))?;
        let count = self.counter.fetch_add(1, Ordering::Relaxed) & COUNTER_MASK;

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&self.process_unique);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Ok(bytes)
    }

    pub fn next_id(&self) -> Result<String, IdError> {
        self.next_bytes().map(hex::encode)
    }
}
