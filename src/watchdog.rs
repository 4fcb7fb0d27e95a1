//! This module contains the type definitions that let a client interrupt a
//! running emulation from the outside.
//!
//! # Best-Effort Monitoring
//!
//! The watchdog is polled cooperatively between evaluated expressions, so a
//! stop request takes effect at the next poll rather than immediately. The
//! execution engine itself carries no timeout; wall-clock bounds belong to
//! the emulator's caller, expressed through a watchdog such as
//! [`DeadlineWatchdog`].

use std::{
    fmt::Debug,
    rc::Rc,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

use crate::constant::DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS;

/// A dynamically dispatched [`Watchdog`] instance.
pub type DynWatchdog = Rc<dyn Watchdog>;

/// The interface to an object that can be polled to see if emulation needs
/// to abort.
///
/// The interface is simple, but it can encapsulate arbitrary stop logic as
/// far as the emulator is concerned.
pub trait Watchdog
where
    Self: Debug,
{
    /// Checks if the emulation should halt.
    #[must_use]
    fn should_stop(&self) -> bool;

    /// Gets the number of evaluated expressions the emulator should wait
    /// between polls of the watchdog.
    #[must_use]
    fn poll_every(&self) -> usize {
        DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS
    }

    /// Wraps the watchdog into an [`Rc`] for handing to an emulator.
    #[must_use]
    fn in_rc(self) -> DynWatchdog
    where
        Self: Sized + 'static,
    {
        Rc::new(self)
    }
}

/// An implementation of the [`Watchdog`] trait that never requests a stop,
/// and therefore never needs to be polled.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct LazyWatchdog;

impl Watchdog for LazyWatchdog {
    fn should_stop(&self) -> bool {
        false
    }

    fn poll_every(&self) -> usize {
        usize::MAX
    }
}

/// A watchdog driven by an atomic flag that another thread flips to stop
/// the emulation.
#[derive(Clone, Debug)]
pub struct FlagWatchdog {
    /// The flag that is set externally to request a stop.
    flag: Arc<AtomicBool>,

    /// The number of evaluated expressions between polls.
    poll_interval: usize,
}

impl FlagWatchdog {
    /// Constructs a new watchdog wrapping the provided `flag`.
    #[must_use]
    pub fn new(flag: Arc<AtomicBool>) -> Self {
        Self {
            flag,
            poll_interval: DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS,
        }
    }

    /// Specifies the number of evaluated expressions to wait between polls.
    #[must_use]
    pub fn polling_every(mut self, expressions: usize) -> Self {
        self.poll_interval = expressions;
        self
    }
}

impl Watchdog for FlagWatchdog {
    fn should_stop(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    fn poll_every(&self) -> usize {
        self.poll_interval
    }
}

/// A watchdog that requests a stop once a wall-clock budget has elapsed.
#[derive(Clone, Debug)]
pub struct DeadlineWatchdog {
    /// The instant past which emulation should stop.
    deadline: Instant,

    /// The number of evaluated expressions between polls.
    poll_interval: usize,
}

impl DeadlineWatchdog {
    /// Constructs a new watchdog expiring `budget` from now.
    #[must_use]
    pub fn new(budget: Duration) -> Self {
        Self {
            deadline: Instant::now() + budget,
            poll_interval: DEFAULT_WATCHDOG_POLL_LOOP_ITERATIONS,
        }
    }

    /// Specifies the number of evaluated expressions to wait between polls.
    #[must_use]
    pub fn polling_every(mut self, expressions: usize) -> Self {
        self.poll_interval = expressions;
        self
    }
}

impl Watchdog for DeadlineWatchdog {
    fn should_stop(&self) -> bool {
        Instant::now() >= self.deadline
    }

    fn poll_every(&self) -> usize {
        self.poll_interval
    }
}

#[cfg(test)]
mod test {
    use std::{
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc,
        },
        time::Duration,
    };

    use crate::watchdog::{DeadlineWatchdog, FlagWatchdog, LazyWatchdog, Watchdog};

    #[test]
    fn the_lazy_watchdog_never_stops() {
        assert!(!LazyWatchdog.should_stop());
        assert_eq!(LazyWatchdog.poll_every(), usize::MAX);
    }

    #[test]
    fn the_flag_watchdog_follows_its_flag() {
        let flag = Arc::new(AtomicBool::new(false));
        let watchdog = FlagWatchdog::new(Arc::clone(&flag)).polling_every(16);

        assert!(!watchdog.should_stop());
        assert_eq!(watchdog.poll_every(), 16);

        flag.store(true, Ordering::Relaxed);
        assert!(watchdog.should_stop());
    }

    #[test]
    fn the_deadline_watchdog_expires() {
        let expired = DeadlineWatchdog::new(Duration::ZERO);
        assert!(expired.should_stop());

        let generous = DeadlineWatchdog::new(Duration::from_secs(3600));
        assert!(!generous.should_stop());
    }
}
