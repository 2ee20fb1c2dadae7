//! 64-bit time-ordered ids: 41 bits of milliseconds since [`DEFAULT_EPOCH_MS`],
//! 5 datacenter bits, 5 worker bits and a 12-bit per-millisecond sequence.
//!
//! A backwards clock step is reported as [`IdError::ClockRegression`] rather than
//! waited out.

use super::IdError;
use crate::domain_port::Clock;
use parking_lot::Mutex;
use std::sync::Arc;

/// 2010-11-04T01:42:54.657Z
pub const DEFAULT_EPOCH_MS: i64 = 1_288_834_974_657;

const WORKER_ID_BITS: u32 = 5;
const DATACENTER_ID_BITS: u32 = 5;
const SEQUENCE_BITS: u32 = 12;
const TIMESTAMP_BITS: u32 = 41;

pub const MAX_NODE_ID: u64 = (1 << WORKER_ID_BITS) - 1;
pub const SEQUENCE_MASK: u64 = (1 << SEQUENCE_BITS) - 1;
const MAX_ELAPSED_MS: i64 = (1 << TIMESTAMP_BITS) - 1;

const WORKER_ID_SHIFT: u32 = SEQUENCE_BITS;
const DATACENTER_ID_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS;
const TIMESTAMP_SHIFT: u32 = SEQUENCE_BITS + WORKER_ID_BITS + DATACENTER_ID_BITS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SnowflakeParts {
    /// Absolute milliseconds since the Unix epoch.
    pub timestamp_ms: i64,
    pub datacenter_id: u64,
    pub worker_id: u64,
    pub sequence: u64,
}

struct SequenceState {
    last_ms: i64,
    sequence: u64,
}

pub struct Snowflake {
    epoch_ms: i64,
    datacenter_id: u64,
    worker_id: u64,
    clock: Arc<dyn Clock>,
    state: Mutex<SequenceState>,
}

impl Snowflake {
    pub fn new(datacenter_id: u64, worker_id: u64, clock: Arc<dyn Clock>) -> Result<Self, IdError> {
        Snowflake::with_epoch(DEFAULT_EPOCH_MS, datacenter_id, worker_id, clock)
    }

    pub fn with_epoch(
        epoch_ms: i64,
        datacenter_id: u64,
        worker_id: u64,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, IdError> {
        if datacenter_id > MAX_NODE_ID {
            return Err(IdError::InvalidConfig(format!(
                "datacenter id {datacenter_id} exceeds {MAX_NODE_ID}"
            )));
        }
        if worker_id > MAX_NODE_ID {
            return Err(IdError::InvalidConfig(format!(
                "worker id {worker_id} exceeds {MAX_NODE_ID}"
            )));
        }
        Ok(Snowflake {
            epoch_ms,
            datacenter_id,
            worker_id,
            clock,
            state: Mutex::new(SequenceState {
                last_ms: i64::MIN,
                sequence: 0,
            }),
        })
    }

    pub fn next_id(&self) -> Result<u64, IdError> {
        let mut state = self.state.lock();

        let mut now = self.clock.now_millis();
        if now < state.last_ms {
            return Err(IdError::ClockRegression {
                last_ms: state.last_ms,
                now_ms: now,
            });
        }

        let sequence = if now == state.last_ms {
            let next = (state.sequence + 1) & SEQUENCE_MASK;
            if next == 0 {
                // sequence exhausted for this millisecond
                now = self.wait_next_millis(state.last_ms)?;
            }
            next
        } else {
            0
        };

        let elapsed = now - self.epoch_ms;
        if !(0..=MAX_ELAPSED_MS).contains(&elapsed) {
            return Err(IdError::TimeOverflow(now));
        }

        state.last_ms = now;
        state.sequence = sequence;

        Ok(((elapsed as u64) << TIMESTAMP_SHIFT)
            | (self.datacenter_id << DATACENTER_ID_SHIFT)
            | (self.worker_id << WORKER_ID_SHIFT)
            | sequence)
    }

    fn wait_next_millis(&self, last_ms: i64) -> Result<i64, IdError> {
        loop {
            std::hint::spin_loop();
            let now = self.clock.now_millis();
            if now > last_ms {
                return Ok(now);
            }
            if now < last_ms {
                return Err(IdError::ClockRegression {
                    last_ms,
                    now_ms: now,
                });
            }
        }
    }

    pub fn decompose(&self, id: u64) -> SnowflakeParts {
        SnowflakeParts {
            timestamp_ms: (id >> TIMESTAMP_SHIFT) as i64 + self.epoch_ms,
            datacenter_id: (id >> DATACENTER_ID_SHIFT) & MAX_NODE_ID,
            worker_id: (id >> WORKER_ID_SHIFT) & MAX_NODE_ID,
            sequence: id & SEQUENCE_MASK,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain_port::{ManualClock, SystemClock};
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};

    const T0: i64 = 1_700_000_000_000;

    /// Reports `T0` for the first `frozen_reads` reads, then `T0 + 1`.
    struct FrozenThenTick {
        reads: AtomicUsize,
        frozen_reads: usize,
    }

    impl Clock for FrozenThenTick {
        fn now(&self) -> DateTime<Utc> {
            let n = self.reads.fetch_add(1, Ordering::SeqCst);
            let ms = if n < self.frozen_reads { T0 } else { T0 + 1 };
            Utc.timestamp_millis_opt(ms).unwrap()
        }
    }

    #[test]
    fn ids_within_one_millisecond_increase() {
        let clock = Arc::new(ManualClock::new(Utc.timestamp_millis_opt(T0).unwrap()));
        let snowflake = Snowflake::new(3, 9, clock).unwrap();

        let ids: Vec<u64> = (0..100).map(|_| snowflake.next_id().unwrap()).collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));

        let parts = snowflake.decompose(ids[99]);
        assert_eq!(parts.timestamp_ms, T0);
        assert_eq!(parts.datacenter_id, 3);
        assert_eq!(parts.worker_id, 9);
        assert_eq!(parts.sequence, 99);
    }

    #[test]
    fn exhausted_sequence_moves_to_next_millisecond() {
        let clock = Arc::new(FrozenThenTick {
            reads: AtomicUsize::new(0),
            frozen_reads: 5_000,
        });
        let snowflake = Snowflake::new(0, 1, clock).unwrap();

        let ids: Vec<u64> = (0..=SEQUENCE_MASK + 1)
            .map(|_| snowflake.next_id().unwrap())
            .collect();
        assert!(ids.windows(2).all(|w| w[0] < w[1]));

        let last_in_tick = snowflake.decompose(ids[SEQUENCE_MASK as usize]);
        assert_eq!(last_in_tick.timestamp_ms, T0);
        assert_eq!(last_in_tick.sequence, SEQUENCE_MASK);

        let overflow = snowflake.decompose(ids[SEQUENCE_MASK as usize + 1]);
        assert_eq!(overflow.timestamp_ms, T0 + 1);
        assert_eq!(overflow.sequence, 0);
    }

    #[test]
    fn clock_regression_fails_fast() {
        let clock = Arc::new(ManualClock::new(Utc.timestamp_millis_opt(T0).unwrap()));
        let snowflake = Snowflake::new(0, 0, clock.clone()).unwrap();
        snowflake.next_id().unwrap();

        clock.advance(Duration::milliseconds(-5));
        assert_eq!(
            snowflake.next_id(),
            Err(IdError::ClockRegression {
                last_ms: T0,
                now_ms: T0 - 5
            })
        );

        clock.advance(Duration::milliseconds(6));
        assert!(snowflake.next_id().is_ok());
    }

    #[test]
    fn node_ids_are_bounded() {
        let clock = Arc::new(SystemClock);
        assert!(matches!(
            Snowflake::new(32, 0, clock.clone()),
            Err(IdError::InvalidConfig(_))
        ));
        assert!(matches!(
            Snowflake::new(0, 32, clock),
            Err(IdError::InvalidConfig(_))
        ));
    }

    #[test]
    fn concurrent_callers_never_collide() {
        let snowflake = Arc::new(Snowflake::new(1, 1, Arc::new(SystemClock)).unwrap());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let snowflake = snowflake.clone();
                std::thread::spawn(move || {
                    (0..2_000)
                        .map(|_| snowflake.next_id().unwrap())
                        .collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all: Vec<u64> = handles
            .into_iter()
            .flat_map(|h| h.join().unwrap())
            .collect();
        let total = all.len();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), total);
    }
}
