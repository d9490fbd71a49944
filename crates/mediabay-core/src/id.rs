//! Time-ordered identifier generation
//!
//! Identifiers are UUID version 7: a millisecond timestamp followed by random
//! bits. Generators additionally guarantee that every identifier they issue
//! sorts strictly after the previous one, even when the clock stalls or two
//! calls land in the same millisecond. When that happens the random tail of
//! the last identifier is incremented.

use std::sync::Mutex;

use uuid::Uuid;

use crate::error::AppError;

/// Low 62 bits of a version-7 UUID (the `rand_b` field).
const RAND_B_MASK: u128 = (1u128 << 62) - 1;

static PROCESS_GENERATOR: IdGenerator = IdGenerator::new();

/// Issues strictly increasing version-7 identifiers.
#[derive(Debug)]
pub struct IdGenerator {
    last: Mutex<u128>,
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator {
    pub const fn new() -> Self {
        Self {
            last: Mutex::new(0),
        }
    }

    pub fn next_id(&self) -> Result<Uuid, AppError> {
        let candidate = Uuid::now_v7().as_u128();

        // A poisoned lock still holds a valid u128.
        let mut last = self.last.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let next = if candidate > *last {
            candidate
        } else if *last & RAND_B_MASK == RAND_B_MASK {
            return Err(AppError::Internal(
                "Identifier space exhausted for the current timestamp".to_string(),
            ));
        } else {
            *last + 1
        };

        *last = next;
        Ok(Uuid::from_u128(next))
    }

    #[cfg(test)]
    fn seeded(last: u128) -> Self {
        Self {
            last: Mutex::new(last),
        }
    }
}

/// Next identifier from the process-wide generator.
pub fn new_id() -> Result<Uuid, AppError> {
    PROCESS_GENERATOR.next_id()
}
