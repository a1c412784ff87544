//! Queue tickets: unique across processes, increasing within one.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

use uuid::Uuid;

static SEQUENCE: AtomicU64 = AtomicU64::new(0);
static PROCESS_ID: OnceLock<Uuid> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ticket(String);

impl Ticket {
    /// `{process uuid}:{sequence}`; the sequence is zero-padded so tickets of one process sort by issue order.
    pub fn next() -> Self {
        let process = PROCESS_ID.get_or_init(Uuid::new_v4);
        let sequence = SEQUENCE.fetch_add(1, Ordering::Relaxed);
        Ticket(format!("{}:{:020}", process.simple(), sequence))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
