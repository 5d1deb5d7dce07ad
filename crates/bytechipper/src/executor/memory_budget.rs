//! # Memory Budget

use std::time::Duration;

use parking_lot::{Condvar, Mutex};

use crate::errors::{BCResult, BytechipperError};

/// How often a blocked [`MemoryBudget::acquire`] re-checks cancellation.
const CANCEL_POLL_INTERVAL: Duration = Duration::from_millis(25);

#[derive(Debug, Default)]
struct BudgetState {
    in_use: u64,
    reserved: u64,
    closed: bool,
}

/// A blocking byte budget for in-flight chunk memory.
///
/// `acquire` blocks while admitting the request would exceed the limit.
/// A request is always admitted when nothing is in flight, so a single
/// oversize chunk cannot deadlock the pipeline.
///
/// Memory held outside the pipeline, such as the assembler's tail, is
/// declared with [`MemoryBudget::set_reserved`]. It narrows admission,
/// but never blocks the idle case.
#[derive(Debug)]
pub struct MemoryBudget {
    limit: u64,
    state: Mutex<BudgetState>,
    released: Condvar,
}

impl MemoryBudget {
    /// Create a budget of `limit` bytes.
    pub fn new(limit: u64) -> Self {
        Self {
            limit,
            state: Mutex::new(BudgetState::default()),
            released: Condvar::new(),
        }
    }

    /// The budget limit, in bytes.
    pub fn limit(&self) -> u64 {
        self.limit
    }

    /// The bytes currently held.
    pub fn in_use(&self) -> u64 {
        self.state.lock().in_use
    }

    /// The bytes reserved outside of `acquire`.
    pub fn reserved(&self) -> u64 {
        self.state.lock().reserved
    }

    /// Declare `bytes` held outside of `acquire`, replacing the previous reservation.
    pub fn set_reserved(
        &self,
        bytes: u64,
    ) {
        let mut state = self.state.lock();
        let shrunk = bytes < state.reserved;
        state.reserved = bytes;
        drop(state);
        if shrunk {
            self.released.notify_all();
        }
    }

    /// Block until `bytes` can be admitted, then hold them.
    ///
    /// ## Arguments
    /// * `bytes` - the amount to hold.
    /// * `is_cancelled` - polled while blocked.
    ///
    /// ## Errors
    /// [`BytechipperError::Cancelled`] if the budget is closed, or
    /// `is_cancelled` reports true, before admission.
    pub fn acquire<F>(
        &self,
        bytes: u64,
        is_cancelled: F,
    ) -> BCResult<()>
    where
        F: Fn() -> bool,
    {
        let mut state = self.state.lock();
        loop {
            if state.closed || is_cancelled() {
                return Err(BytechipperError::Cancelled);
            }

            if state.in_use == 0 {
                if bytes > self.limit {
                    log::warn!(
                        "admitting {bytes} bytes over the {} byte memory budget",
                        self.limit
                    );
                }
                break;
            }
            if state
                .in_use
                .saturating_add(state.reserved)
                .saturating_add(bytes)
                <= self.limit
            {
                break;
            }

            self.released.wait_for(&mut state, CANCEL_POLL_INTERVAL);
        }
        state.in_use += bytes;
        Ok(())
    }

    /// Return `bytes` to the budget.
    pub fn release(
        &self,
        bytes: u64,
    ) {
        if bytes == 0 {
            return;
        }
        let mut state = self.state.lock();
        state.in_use = state.in_use.saturating_sub(bytes);
        drop(state);
        self.released.notify_all();
    }

    /// Fail all current and future `acquire` calls.
    pub fn close(&self) {
        self.state.lock().closed = true;
        self.released.notify_all();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
        thread,
    };

    use super::*;

    #[test]
    fn test_acquire_release() {
        let budget = MemoryBudget::new(100);
        budget.acquire(60, || false).unwrap();
        budget.acquire(40, || false).unwrap();
        assert_eq!(budget.in_use(), 100);

        budget.release(100);
        assert_eq!(budget.in_use(), 0);
    }

    #[test]
    fn test_oversize_admitted_when_idle() {
        let budget = MemoryBudget::new(0);
        budget.acquire(500, || false).unwrap();
        assert_eq!(budget.in_use(), 500);
    }

    #[test]
    fn test_reservation_narrows_admission() {
        let budget = Arc::new(MemoryBudget::new(100));
        budget.set_reserved(500);
        assert_eq!(budget.reserved(), 500);

        // Idle admission ignores the reservation.
        budget.acquire(30, || false).unwrap();

        let admitted = Arc::new(AtomicBool::new(false));
        let waiter = {
            let budget = budget.clone();
            let admitted = admitted.clone();
            thread::spawn(move || {
                budget.acquire(30, || false).unwrap();
                admitted.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!admitted.load(Ordering::SeqCst));

        budget.set_reserved(40);
        waiter.join().unwrap();
        assert!(admitted.load(Ordering::SeqCst));
        assert_eq!(budget.in_use(), 60);
    }

    #[test]
    fn test_blocks_until_released() {
        let budget = Arc::new(MemoryBudget::new(100));
        budget.acquire(80, || false).unwrap();

        let admitted = Arc::new(AtomicBool::new(false));
        let waiter = {
            let budget = budget.clone();
            let admitted = admitted.clone();
            thread::spawn(move || {
                budget.acquire(50, || false).unwrap();
                admitted.store(true, Ordering::SeqCst);
            })
        };

        thread::sleep(Duration::from_millis(50));
        assert!(!admitted.load(Ordering::SeqCst));

        budget.release(80);
        waiter.join().unwrap();
        assert!(admitted.load(Ordering::SeqCst));
        assert_eq!(budget.in_use(), 50);
    }

    #[test]
    fn test_close_and_cancel_wake_waiters() {
        let budget = Arc::new(MemoryBudget::new(10));
        budget.acquire(10, || false).unwrap();

        let waiter = {
            let budget = budget.clone();
            thread::spawn(move || budget.acquire(10, || false))
        };
        thread::sleep(Duration::from_millis(20));
        budget.close();
        assert!(matches!(
            waiter.join().unwrap(),
            Err(BytechipperError::Cancelled)
        ));

        let budget = MemoryBudget::new(10);
        budget.acquire(10, || false).unwrap();
        assert!(matches!(
            budget.acquire(10, || true),
            Err(BytechipperError::Cancelled)
        ));
    }
}
