//! Driver monitor implementation
//!
//! Called once per monitoring tick by whatever scheduler the firmware
//! uses. Each tick reads DRV_STATUS from every driver, latches
//! pre-warnings, reports shutdowns and optionally steps current down on
//! drivers that stay hot.

use core::fmt::Write;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::command;
use crate::driver::{DriverIdentity, TmcHandle};
use crate::error::TmcError;

/// Current reduction applied while a pre-warning persists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CurrentStepDown {
    /// Amount removed per tick (mA)
    pub step_ma: u16,
    /// Current is never reduced below this (mA)
    pub min_ma: u16,
    /// Consecutive pre-warned ticks after which stepping down starts
    ///
    /// The tick that completes the streak already steps down; 0 and 1
    /// both act on the first pre-warned tick.
    pub after_ticks: u8,
}

impl Default for CurrentStepDown {
    fn default() -> Self {
        Self {
            step_ma: 50,
            min_ma: 100,
            after_ticks: 5,
        }
    }
}

/// Monitor configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MonitorConfig {
    /// Emit a status line per driver on every tick
    pub report_status: bool,
    /// Reduce current on drivers that stay pre-warned
    pub step_down: Option<CurrentStepDown>,
}

/// What one tick observed across all drivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MonitorSummary {
    /// Drivers that latched a new pre-warning this tick
    pub prewarnings: u8,
    /// At least one driver reported over-temperature shutdown
    pub shutdown: bool,
    /// Drivers whose current was stepped down this tick
    pub reductions: u8,
    /// Drivers that could not be polled
    pub faults: u8,
    /// Most recent polling fault
    pub last_fault: Option<(DriverIdentity, TmcError)>,
}

impl MonitorSummary {
    /// Nothing needs attention
    pub fn is_clear(&self) -> bool {
        self.prewarnings == 0 && !self.shutdown && self.faults == 0
    }
}

/// Periodic driver monitor
#[derive(Debug, Clone)]
pub struct TmcMonitor {
    config: MonitorConfig,
    ticks: u32,
}

impl Default for TmcMonitor {
    fn default() -> Self {
        Self::new(MonitorConfig::default())
    }
}

impl TmcMonitor {
    /// Create a monitor with the given configuration
    pub fn new(config: MonitorConfig) -> Self {
        Self { config, ticks: 0 }
    }

    /// Active configuration
    pub fn config(&self) -> &MonitorConfig {
        &self.config
    }

    /// Toggle periodic status reporting
    pub fn set_report_status(&mut self, enabled: bool) {
        self.config.report_status = enabled;
    }

    /// Number of ticks run so far
    pub fn ticks(&self) -> u32 {
        self.ticks
    }

    /// Poll every driver once
    ///
    /// A driver that fails to answer is reported and skipped; the
    /// remaining drivers are still polled. Only a console failure aborts
    /// the tick.
    pub fn tick<W: Write>(
        &mut self,
        drivers: &mut [&mut dyn TmcHandle],
        out: &mut W,
    ) -> Result<MonitorSummary, TmcError> {
        self.ticks = self.ticks.wrapping_add(1);
        let mut summary = MonitorSummary::default();

        for drv in drivers.iter_mut() {
            match self.check_driver(&mut **drv, out, &mut summary) {
                Ok(()) => {}
                Err(TmcError::Output) => return Err(TmcError::Output),
                Err(e) => {
                    #[cfg(feature = "defmt")]
                    defmt::error!("{}: driver poll failed: {}", drv.identity(), e);

                    summary.faults = summary.faults.saturating_add(1);
                    summary.last_fault = Some((drv.identity(), e));
                    writeln!(out, "{} driver communication error", drv.identity())?;
                }
            }
        }

        if self.config.report_status {
            for drv in drivers.iter() {
                command::report_status(&**drv, out)?;
            }
        }

        Ok(summary)
    }

    fn check_driver<W: Write>(
        &self,
        drv: &mut dyn TmcHandle,
        out: &mut W,
        summary: &mut MonitorSummary,
    ) -> Result<(), TmcError> {
        let poll = drv.poll_thermal()?;
        let id = drv.identity();

        if poll.status.shutdown {
            #[cfg(feature = "defmt")]
            defmt::error!("{}: driver over-temperature shutdown", id);

            summary.shutdown = true;
            writeln!(out, "{} driver overtemperature shutdown", id)?;
        }

        if poll.triggered {
            #[cfg(feature = "defmt")]
            defmt::warn!(
                "{}: over-temperature pre-warning ({} events)",
                id,
                drv.state().otpw_count()
            );

            summary.prewarnings = summary.prewarnings.saturating_add(1);
            writeln!(out, "{} temperature prewarn triggered: true", id)?;
        }

        if let Some(step_down) = self.config.step_down {
            if poll.status.prewarning && drv.state().otpw_ticks() >= step_down.after_ticks {
                let ma = drv.current_ma();
                let reduced = ma.saturating_sub(step_down.step_ma).max(step_down.min_ma);
                if reduced < ma {
                    drv.set_current_ma(reduced)?;
                    summary.reductions = summary.reductions.saturating_add(1);
                    writeln!(out, "{} driver current: {}", id, reduced)?;
                }
            }
        }

        Ok(())
    }
}
