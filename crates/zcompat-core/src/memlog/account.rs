//! Running allocation account for allocator wrappers.
//!
//! An allocator hook calls [`MemoryAccount::record_alloc`] and
//! [`MemoryAccount::record_free`] once per event. The account keeps the
//! outstanding byte total under its own lock, which is also the lock that
//! serialises the increment tracker. Lines are written after the lock is
//! released.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{IncrementTracker, MemoryLogger, Severity};

#[derive(Debug, Default)]
struct AccountState {
    outstanding: u64,
    peak: u64,
    allocations: u64,
    frees: u64,
    tracker: IncrementTracker,
}

/// Outstanding-bytes account feeding the memory logger.
#[derive(Debug)]
pub struct MemoryAccount {
    logger: Arc<MemoryLogger>,
    state: Mutex<AccountState>,
}

/// Totals at a point in time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AccountSnapshot {
    pub outstanding: u64,
    pub peak: u64,
    pub allocations: u64,
    pub frees: u64,
}

impl MemoryAccount {
    #[must_use]
    pub fn new(logger: Arc<MemoryLogger>) -> Self {
        Self {
            logger,
            state: Mutex::new(AccountState::default()),
        }
    }

    #[must_use]
    pub fn logger(&self) -> &MemoryLogger {
        &self.logger
    }

    /// Account an allocation of `size` bytes at `addr`. Returns true if a
    /// line was written.
    pub fn record_alloc(&self, addr: usize, size: u64) -> bool {
        let report = {
            let mut state = self.state.lock();
            state.outstanding = state.outstanding.saturating_add(size);
            state.peak = state.peak.max(state.outstanding);
            state.allocations += 1;
            self.increment_due(&mut state)
        };
        match report {
            Some(total) => {
                self.logger.log(
                    Severity::Info,
                    format_args!("alloc {addr:#x} size={size} outstanding={total}"),
                ) > 0
            }
            None => false,
        }
    }

    /// Account a release of `size` bytes at `addr`. Returns true if a line
    /// was written.
    ///
    /// Releases never grow the total, so with a non-zero threshold they only
    /// update the account.
    pub fn record_free(&self, addr: usize, size: u64) -> bool {
        let (report, overdrawn) = {
            let mut state = self.state.lock();
            state.frees += 1;
            let overdrawn = size > state.outstanding;
            state.outstanding = state.outstanding.saturating_sub(size);
            let report = if overdrawn {
                None
            } else {
                self.increment_due(&mut state)
            };
            (report, overdrawn)
        };
        if overdrawn {
            self.logger.log(
                Severity::Warning,
                format_args!("free {addr:#x} size={size} exceeds outstanding bytes"),
            );
            return false;
        }
        match report {
            Some(total) => {
                self.logger.log(
                    Severity::Info,
                    format_args!("free {addr:#x} size={size} outstanding={total}"),
                ) > 0
            }
            None => false,
        }
    }

    /// Report a failed allocation request. Always eligible when logging is on.
    pub fn record_failure(&self, size: u64) -> bool {
        let outstanding = self.state.lock().outstanding;
        self.logger.log(
            Severity::Error,
            format_args!("alloc of {size} bytes failed outstanding={outstanding}"),
        ) > 0
    }

    #[must_use]
    pub fn snapshot(&self) -> AccountSnapshot {
        let state = self.state.lock();
        AccountSnapshot {
            outstanding: state.outstanding,
            peak: state.peak,
            allocations: state.allocations,
            frees: state.frees,
        }
    }

    // Skips the tracker entirely unless informational lines could be written.
    fn increment_due(&self, state: &mut AccountState) -> Option<u64> {
        if !self.logger.is_enabled() || !self.logger.logs_all_messages() {
            return None;
        }
        let total = state.outstanding;
        self.logger
            .should_log_increment(total, &mut state.tracker)
            .then_some(total)
    }
}
