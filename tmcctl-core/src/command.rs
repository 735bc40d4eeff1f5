//! Command layer
//!
//! One function per capability, called by the firmware's command
//! interpreter with an already resolved driver. Each call touches
//! exactly one driver and writes one diagnostic line of the form
//! `<label> <what>: <value>` to the console sink.

use core::fmt::Write;

use crate::driver::TmcHandle;
use crate::error::TmcError;
use crate::motion::{to_speed, to_threshold_register};

/// Report the commanded current
pub fn get_current<H, W>(drv: &H, out: &mut W) -> Result<u16, TmcError>
where
    H: TmcHandle + ?Sized,
    W: Write,
{
    let ma = drv.current_ma();
    writeln!(out, "{} driver current: {}", drv.identity(), ma)?;
    Ok(ma)
}

/// Set the run current with the default hold multiplier
pub fn set_current<H, W>(drv: &mut H, ma: u16, out: &mut W) -> Result<(), TmcError>
where
    H: TmcHandle + ?Sized,
    W: Write,
{
    drv.set_current_ma(ma)?;
    get_current(&*drv, out)?;
    Ok(())
}

/// Set the run current with an explicit hold multiplier
pub fn set_current_with_hold<H, W>(
    drv: &mut H,
    ma: u16,
    hold_multiplier: f32,
    out: &mut W,
) -> Result<(), TmcError>
where
    H: TmcHandle + ?Sized,
    W: Write,
{
    drv.set_current_ma_with_hold(ma, hold_multiplier)?;
    get_current(&*drv, out)?;
    Ok(())
}

/// Report the stealthChop upper speed in mm/s (0 when disabled)
pub fn get_pwmthrs<H, W>(drv: &mut H, steps_per_mm: u32, out: &mut W) -> Result<u32, TmcError>
where
    H: TmcHandle + ?Sized,
    W: Write,
{
    let register = drv.threshold_register()?;
    let speed = register_to_speed(drv, register, steps_per_mm)?;
    writeln!(out, "{} stealthChop max speed: {}", drv.identity(), speed)?;
    Ok(speed)
}

/// Program the stealthChop upper speed in mm/s (0 disables hybrid mode)
pub fn set_pwmthrs<H, W>(
    drv: &mut H,
    threshold: i32,
    steps_per_mm: u32,
    out: &mut W,
) -> Result<(), TmcError>
where
    H: TmcHandle + ?Sized,
    W: Write,
{
    let register = if threshold == 0 {
        0
    } else {
        let microsteps = drv.microsteps()?;
        to_threshold_register(microsteps, threshold, steps_per_mm)?
    };
    drv.set_threshold_register(register)?;

    let speed = register_to_speed(drv, register, steps_per_mm)?;
    writeln!(out, "{} stealthChop max speed: {}", drv.identity(), speed)?;
    Ok(())
}

fn register_to_speed<H>(drv: &mut H, register: u32, steps_per_mm: u32) -> Result<u32, TmcError>
where
    H: TmcHandle + ?Sized,
{
    if register == 0 {
        return Ok(0);
    }
    let microsteps = drv.microsteps()?;
    to_speed(microsteps, register, steps_per_mm)
}

/// Report the sensorless homing sensitivity
pub fn get_sgt<H, W>(drv: &mut H, out: &mut W) -> Result<i16, TmcError>
where
    H: TmcHandle + ?Sized,
    W: Write,
{
    let sgt = drv.sensitivity()?;
    writeln!(out, "{} homing sensitivity: {}", drv.identity(), sgt)?;
    Ok(sgt)
}

/// Set the sensorless homing sensitivity
pub fn set_sgt<H, W>(drv: &mut H, value: i16, out: &mut W) -> Result<(), TmcError>
where
    H: TmcHandle + ?Sized,
    W: Write,
{
    drv.set_sensitivity(value)?;
    writeln!(out, "{} homing sensitivity: {}", drv.identity(), value)?;
    Ok(())
}

/// Switch stall detection for sensorless homing
pub fn sensorless_homing<H, W>(drv: &mut H, enable: bool, out: &mut W) -> Result<(), TmcError>
where
    H: TmcHandle + ?Sized,
    W: Write,
{
    drv.set_stall_detection(enable)?;
    let state = if enable { "on" } else { "off" };
    writeln!(out, "{} sensorless homing: {}", drv.identity(), state)?;
    Ok(())
}

/// Report the latched pre-warning flag
pub fn report_otpw<H, W>(drv: &H, out: &mut W) -> Result<bool, TmcError>
where
    H: TmcHandle + ?Sized,
    W: Write,
{
    let flag = drv.state().otpw_flag();
    writeln!(
        out,
        "{} temperature prewarn triggered: {}",
        drv.identity(),
        flag
    )?;
    Ok(flag)
}

/// Acknowledge the latched pre-warning
pub fn clear_otpw<H, W>(drv: &mut H, out: &mut W) -> Result<(), TmcError>
where
    H: TmcHandle + ?Sized,
    W: Write,
{
    drv.clear_otpw();
    writeln!(out, "{} prewarn flag cleared", drv.identity())?;
    Ok(())
}

/// Debug status line: current, latched flag and event count
pub fn report_status<H, W>(drv: &H, out: &mut W) -> Result<(), TmcError>
where
    H: TmcHandle + ?Sized,
    W: Write,
{
    let state = drv.state();
    writeln!(
        out,
        "{} driver status: current {} mA, prewarn {}, prewarn events {}",
        drv.identity(),
        state.commanded_ma(),
        state.otpw_flag(),
        state.otpw_count()
    )?;
    Ok(())
}
