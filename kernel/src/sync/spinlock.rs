//! Interrupt-masking ticket spinlock.
//!
//! Every singleton table in this kernel (IRQ slots, frame bitmap, kernel
//! address space, console sink) can be touched both from ordinary
//! execution and from an interrupt handler. The classic single-core
//! deadlock: code holds a lock with interrupts enabled, the interrupt
//! fires on the same core, and its handler spins on that lock forever.
//!
//! This lock therefore disables interrupt delivery *before* acquiring and
//! restores the previous EFLAGS.IF state on release. Holding a guard is
//! the kernel's critical-section discipline; mutating a shared table
//! outside one is a bug.
//!
//! Tickets (FIFO) rather than test-and-set so a future second core cannot
//! starve; on one core the spin path is never taken.

use core::cell::UnsafeCell;
use core::ops::{Deref, DerefMut};
use core::sync::atomic::{AtomicU32, Ordering};

use crate::arch::cpu;

pub struct SpinLock<T> {
    next_ticket: AtomicU32,
    now_serving: AtomicU32,
    data: UnsafeCell<T>,
}

// SAFETY: the ticket protocol guarantees exclusive access to `data`, so
// sharing the lock between contexts is sound whenever T itself can move
// between them.
unsafe impl<T: Send> Send for SpinLock<T> {}
unsafe impl<T: Send> Sync for SpinLock<T> {}

impl<T> SpinLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            next_ticket: AtomicU32::new(0),
            now_serving: AtomicU32::new(0),
            data: UnsafeCell::new(value),
        }
    }

    /// Acquire the lock, masking interrupts on this CPU for as long as
    /// the returned guard lives.
    pub fn lock(&self) -> SpinLockGuard<'_, T> {
        let irq_was_enabled = cpu::interrupts_enabled();
        cpu::disable_interrupts();

        let my_ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        while self.now_serving.load(Ordering::Acquire) != my_ticket {
            core::hint::spin_loop();
        }

        SpinLockGuard {
            lock: self,
            irq_was_enabled,
        }
    }

    /// Acquire without spinning. Fails (restoring the interrupt state) if
    /// the lock is currently held.
    pub fn try_lock(&self) -> Option<SpinLockGuard<'_, T>> {
        let irq_was_enabled = cpu::interrupts_enabled();
        cpu::disable_interrupts();

        let current = self.now_serving.load(Ordering::Relaxed);
        match self.next_ticket.compare_exchange(
            current,
            current.wrapping_add(1),
            Ordering::Acquire,
            Ordering::Relaxed,
        ) {
            Ok(_) => Some(SpinLockGuard {
                lock: self,
                irq_was_enabled,
            }),
            Err(_) => {
                if irq_was_enabled {
                    cpu::enable_interrupts();
                }
                None
            }
        }
    }

    /// Direct access through `&mut self`: exclusive by construction, no
    /// locking needed. Useful before the lock is shared.
    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }
}

pub struct SpinLockGuard<'a, T> {
    lock: &'a SpinLock<T>,
    irq_was_enabled: bool,
}

impl<T> Deref for SpinLockGuard<'_, T> {
    type Target = T;
    fn deref(&self) -> &T {
        // SAFETY: the guard proves exclusive ownership.
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for SpinLockGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: the guard proves exclusive ownership.
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for SpinLockGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.now_serving.fetch_add(1, Ordering::Release);
        if self.irq_was_enabled {
            cpu::enable_interrupts();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lock_gives_exclusive_mutable_access() {
        let lock = SpinLock::new(0u32);
        *lock.lock() += 41;
        *lock.lock() += 1;
        assert_eq!(*lock.lock(), 42);
    }

    #[test]
    fn try_lock_fails_while_held() {
        let lock = SpinLock::new(());
        let guard = lock.lock();
        assert!(lock.try_lock().is_none());
        drop(guard);
        assert!(lock.try_lock().is_some());
    }

    #[test]
    fn guards_release_in_fifo_order() {
        let lock = SpinLock::new(Vec::new());
        for i in 0..10 {
            lock.lock().push(i);
        }
        assert_eq!(*lock.lock(), (0..10).collect::<Vec<_>>());
    }
}
