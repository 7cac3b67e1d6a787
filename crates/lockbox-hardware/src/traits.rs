//! Signal line trait definitions.
//!
//! The controller talks to hardware through two narrow contracts: an
//! [`OutputLine`] that can be driven HIGH or LOW (relay coil, status LED) and
//! an [`InputLine`] that can be sampled (push button). Everything above this
//! layer is expressed in terms of *active* / *inactive*, with [`Polarity`]
//! translating between the two.
//!
//! Unlike peripheral readers, a line access is a register read or write that
//! completes immediately, so these traits are synchronous. The control loop
//! samples them once per iteration.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Electrical level of a digital line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SignalLevel {
    Low,
    High,
}

impl SignalLevel {
    /// The opposite level.
    #[must_use]
    pub fn inverted(self) -> Self {
        match self {
            SignalLevel::Low => SignalLevel::High,
            SignalLevel::High => SignalLevel::Low,
        }
    }
}

/// Which electrical level means "active" for a line.
///
/// Most relay boards energize the coil when their input is pulled LOW, and
/// a button wired to ground with a pull-up reads LOW while pressed.
///
/// # Examples
///
/// ```
/// use lockbox_hardware::traits::{Polarity, SignalLevel};
///
/// assert_eq!(Polarity::ActiveLow.level_for(true), SignalLevel::Low);
/// assert!(Polarity::ActiveLow.is_active(SignalLevel::Low));
/// assert!(Polarity::ActiveHigh.is_active(SignalLevel::High));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Polarity {
    ActiveLow,
    ActiveHigh,
}

impl Polarity {
    /// Build a polarity from an "active low" configuration flag.
    #[must_use]
    pub fn from_active_low(active_low: bool) -> Self {
        if active_low {
            Polarity::ActiveLow
        } else {
            Polarity::ActiveHigh
        }
    }

    /// Level to drive so that the line is active (or inactive).
    #[must_use]
    pub fn level_for(self, active: bool) -> SignalLevel {
        let active_level = self.active_level();
        if active {
            active_level
        } else {
            active_level.inverted()
        }
    }

    /// Whether a sampled level counts as active.
    #[must_use]
    pub fn is_active(self, level: SignalLevel) -> bool {
        level == self.active_level()
    }

    /// Level that means active.
    #[must_use]
    pub fn active_level(self) -> SignalLevel {
        match self {
            Polarity::ActiveLow => SignalLevel::Low,
            Polarity::ActiveHigh => SignalLevel::High,
        }
    }
}

/// A digital output line.
pub trait OutputLine: Send {
    /// Drive the line to `level`.
    ///
    /// # Errors
    ///
    /// Returns an error if the line has been released or the driver rejects
    /// the write.
    fn write(&mut self, level: SignalLevel) -> Result<()>;

    /// Human readable line name used in logs.
    fn name(&self) -> &str;
}

/// A digital input line.
pub trait InputLine: Send {
    /// Sample the current level.
    ///
    /// # Errors
    ///
    /// Returns an error if the line has been released or the driver fails.
    fn read(&mut self) -> Result<SignalLevel>;

    /// Human readable line name used in logs.
    fn name(&self) -> &str;
}
