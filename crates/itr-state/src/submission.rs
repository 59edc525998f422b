//! Submission receipts and the retry policy.

use std::time::Duration;

use itr_core::{AckNumber, FilingId, ReturnVersionId, Timestamp};
use serde::{Deserialize, Serialize};

/// What a successful `submit` returns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub filing_id: FilingId,
    pub ack_number: AckNumber,
    pub idempotency_key: String,
    pub version_id: ReturnVersionId,
    pub submitted_at: Timestamp,
    /// True when the stored acknowledgement was returned without calling
    /// the gateway.
    pub replayed: bool,
}

/// Exponential backoff for retriable gateway failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total gateway calls, including the first. Zero is treated as one.
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 4,
            base_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(8),
        }
    }
}

impl RetryPolicy {
    /// Retry immediately; for tests and the sandbox.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            base_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    /// Delay before retry `n` (0-based): `base_delay * 2^n`, capped at `max_delay`.
    pub fn delay_for(&self, n: u32) -> Duration {
        let factor = 2u32.checked_pow(n).unwrap_or(u32::MAX);
        self.base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay)
            .min(self.max_delay)
    }

    pub(crate) fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}
