//! Scheduler tick source using ESP-IDF's esp_timer API.
//!
//! One periodic timer fires every `tick_ms` and calls
//! [`Scheduler::on_tick`], which advances the tick counter and promotes
//! due timers.  Callbacks never run here; the main loop drains the due
//! queue with [`Scheduler::run_next`].
//!
//! On the host nothing is started: tests drive `on_tick` by hand.

use crate::error::Error;
use crate::scheduler::Scheduler;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

#[cfg(target_os = "espidf")]
static mut TICK_TIMER: esp_timer_handle_t = core::ptr::null_mut();

/// Runs in the esp_timer task.  `arg` is the `&'static Scheduler<C>`
/// handed to [`start_tick`].
#[cfg(target_os = "espidf")]
unsafe extern "C" fn tick_cb<C>(arg: *mut core::ffi::c_void) {
    // SAFETY: `arg` was created from a `&'static Scheduler<C>` in
    // `start_tick` and the scheduler is never dropped.
    let sched = unsafe { &*(arg as *const Scheduler<C>) };
    sched.on_tick();
}

/// Start the periodic tick at the scheduler's configured period.
#[cfg(target_os = "espidf")]
pub fn start_tick<C>(sched: &'static Scheduler<C>) -> Result<(), Error> {
    let period_us = u64::from(sched.tick_ms()) * 1000;
    // SAFETY: TICK_TIMER is written once here, from the main task, before
    // the timer is started.  The callback only reads through `arg`.
    unsafe {
        let args = esp_timer_create_args_t {
            callback: Some(tick_cb::<C>),
            arg: sched as *const Scheduler<C> as *mut core::ffi::c_void,
            dispatch_method: esp_timer_dispatch_t_ESP_TIMER_TASK,
            name: b"sched-tick\0".as_ptr() as *const _,
            skip_unhandled_events: false,
        };
        let ret = esp_timer_create(&args, &raw mut TICK_TIMER);
        if ret != ESP_OK {
            log::error!("hw_timer: tick timer create failed (rc={})", ret);
            return Err(Error::Init("tick timer create"));
        }
        let ret = esp_timer_start_periodic(TICK_TIMER, period_us);
        if ret != ESP_OK {
            log::error!("hw_timer: tick timer start failed (rc={})", ret);
            return Err(Error::Init("tick timer start"));
        }
    }
    log::info!("hw_timer: scheduler tick every {} ms", sched.tick_ms());
    Ok(())
}

#[cfg(not(target_os = "espidf"))]
pub fn start_tick<C>(sched: &'static Scheduler<C>) -> Result<(), Error> {
    log::info!(
        "hw_timer(sim): tick not started ({} ms period, driven by caller)",
        sched.tick_ms()
    );
    Ok(())
}

/// Stop the tick timer.  Pending timers freeze until it is restarted.
#[cfg(target_os = "espidf")]
pub fn stop_tick() {
    // SAFETY: TICK_TIMER is null or a valid handle from `start_tick`.
    unsafe {
        let t = TICK_TIMER;
        if !t.is_null() {
            esp_timer_stop(t);
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub fn stop_tick() {}
