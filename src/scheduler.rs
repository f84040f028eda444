//! Cooperative timer scheduler.
//!
//! Every periodic and one-shot job in the firmware (radio event polling,
//! NTP resync, soft-AP retries, the disconnect check-back, the telemetry
//! task) runs off one hardware tick through this scheduler.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Tick interrupt (on_tick)           Main loop (run_next)     │
//! │                                                              │
//! │  now += tick_ms                     pop due head             │
//! │      │                                  │                    │
//! │      ▼                                  ▼                    │
//! │  ┌──────────────┐  expired   ┌───────────────┐  callback()   │
//! │  │ Pending list │ ─────────▶ │   Due queue   │ ────────────▶ │
//! │  │ (sorted due) │            │    (FIFO)     │               │
//! │  └──────────────┘            └───────────────┘               │
//! │         ▲                                        │           │
//! │         └───────── Repeat: due += period ────────┘           │
//! │                    Stop:   back to Idle                      │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Timers live in a fixed arena of [`MAX_TIMERS`] slots.  Both lists are
//! chained through slot indices, so a slot can only ever sit in one of
//! them.  All list surgery happens inside a critical section, which masks
//! the tick interrupt; callbacks themselves run outside it.
//!
//! Time is a 16-bit millisecond counter that wraps.  Two instants are
//! compared through their signed difference, which is correct as long as
//! they are less than half the counter range apart.  That is why a period
//! is capped at [`MAX_PERIOD_MS`].

use core::cell::RefCell;

use critical_section::Mutex;
use heapless::Vec;
use log::{debug, warn};

use crate::error::TimerError;

// ═══════════════════════════════════════════════════════════════
//  Time base
// ═══════════════════════════════════════════════════════════════

/// Scheduler time in milliseconds, wrapping at `u16::MAX`.
pub type Ticks = u16;

/// Longest period a timer may be armed with.
pub const MAX_PERIOD_MS: u32 = 32_767;

/// Number of timer slots in the arena.
pub const MAX_TIMERS: usize = 8;

/// `true` once `now` has reached or passed `due`, across counter wrap.
pub fn has_elapsed(now: Ticks, due: Ticks) -> bool {
    (now.wrapping_sub(due) as i16) >= 0
}

/// `true` if `a` is strictly later than `b`.
fn is_later(a: Ticks, b: Ticks) -> bool {
    (a.wrapping_sub(b) as i16) > 0
}

fn validate_period(period_ms: u32) -> Result<Ticks, TimerError> {
    if period_ms == 0 || period_ms > MAX_PERIOD_MS {
        return Err(TimerError::InvalidPeriod);
    }
    Ok(period_ms as Ticks)
}

// ═══════════════════════════════════════════════════════════════
//  Timer handles
// ═══════════════════════════════════════════════════════════════

/// Handle to a registered timer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u8);

impl TimerId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// What a callback wants to happen to its timer after it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerAction {
    /// Re-arm at `previous due + period`.
    Repeat,
    /// Drop back to idle until someone calls `create` again.
    Stop,
}

/// Where a registered timer currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerState {
    /// Registered but in neither list.
    Idle,
    /// Waiting in the pending list.
    Pending,
    /// Expired, waiting in the due queue for `run_next`.
    Due,
    /// Its callback is executing right now.
    Running,
}

/// Timer callback.  Receives the application context and the scheduler so
/// it can arm or cancel other timers.
pub type TimerCallback<C> = fn(&mut C, &Scheduler<C>) -> TimerAction;

struct Slot<C> {
    label: &'static str,
    callback: TimerCallback<C>,
    period: Ticks,
    due: Ticks,
    state: TimerState,
    next: Option<u8>,
}

// ═══════════════════════════════════════════════════════════════
//  Lists (only touched inside a critical section)
// ═══════════════════════════════════════════════════════════════

struct Lists<C> {
    slots: Vec<Slot<C>, MAX_TIMERS>,
    pending_head: Option<u8>,
    due_head: Option<u8>,
    due_tail: Option<u8>,
    now: Ticks,
}

impl<C> Lists<C> {
    const fn new() -> Self {
        Self {
            slots: Vec::new(),
            pending_head: None,
            due_head: None,
            due_tail: None,
            now: 0,
        }
    }

    fn index_of(&self, id: TimerId) -> Result<u8, TimerError> {
        if id.index() < self.slots.len() {
            Ok(id.0)
        } else {
            Err(TimerError::UnknownTimer)
        }
    }

    /// Insert into the pending list after every entry due at or before it.
    fn insert_pending(&mut self, idx: u8) {
        let due = self.slots[idx as usize].due;
        let mut prev: Option<u8> = None;
        let mut cursor = self.pending_head;
        while let Some(c) = cursor {
            if is_later(self.slots[c as usize].due, due) {
                break;
            }
            prev = Some(c);
            cursor = self.slots[c as usize].next;
        }

        let slot = &mut self.slots[idx as usize];
        slot.next = cursor;
        slot.state = TimerState::Pending;
        match prev {
            None => self.pending_head = Some(idx),
            Some(p) => self.slots[p as usize].next = Some(idx),
        }
    }

    fn push_due(&mut self, idx: u8) {
        let slot = &mut self.slots[idx as usize];
        slot.next = None;
        slot.state = TimerState::Due;
        match self.due_tail {
            None => self.due_head = Some(idx),
            Some(tail) => self.slots[tail as usize].next = Some(idx),
        }
        self.due_tail = Some(idx);
    }

    fn pop_due(&mut self) -> Option<u8> {
        let idx = self.due_head?;
        self.due_head = self.slots[idx as usize].next;
        if self.due_head.is_none() {
            self.due_tail = None;
        }
        self.slots[idx as usize].next = None;
        Some(idx)
    }

    /// Remove `idx` from the chain starting at `head`.  Returns the new
    /// head and the entry that preceded `idx`, if any.
    fn remove_from(&mut self, head: Option<u8>, idx: u8) -> (Option<u8>, Option<u8>) {
        let next = self.slots[idx as usize].next;
        if head == Some(idx) {
            return (next, None);
        }
        let mut cursor = head;
        while let Some(c) = cursor {
            let after = self.slots[c as usize].next;
            if after == Some(idx) {
                self.slots[c as usize].next = next;
                return (head, Some(c));
            }
            cursor = after;
        }
        (head, None)
    }

    /// Take `idx` out of whichever list holds it and mark it idle.  A
    /// running timer is only marked, so it will not be rescheduled.
    fn unlink(&mut self, idx: u8) {
        match self.slots[idx as usize].state {
            TimerState::Pending => {
                let head = self.pending_head;
                self.pending_head = self.remove_from(head, idx).0;
            }
            TimerState::Due => {
                let head = self.due_head;
                let (head, prev) = self.remove_from(head, idx);
                self.due_head = head;
                if self.due_tail == Some(idx) {
                    self.due_tail = prev;
                }
            }
            TimerState::Idle | TimerState::Running => {}
        }
        let slot = &mut self.slots[idx as usize];
        slot.next = None;
        slot.state = TimerState::Idle;
    }

    /// Move every expired head of the pending list onto the due queue.
    /// The list is sorted, so this stops at the first entry still in the
    /// future.
    fn promote_expired(&mut self) {
        while let Some(head) = self.pending_head {
            if !has_elapsed(self.now, self.slots[head as usize].due) {
                break;
            }
            self.pending_head = self.slots[head as usize].next;
            self.push_due(head);
        }
    }

    fn chain(&self, head: Option<u8>) -> Vec<TimerId, MAX_TIMERS> {
        let mut ids = Vec::new();
        let mut cursor = head;
        while let Some(c) = cursor {
            if ids.push(TimerId(c)).is_err() {
                break;
            }
            cursor = self.slots[c as usize].next;
        }
        ids
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler
// ═══════════════════════════════════════════════════════════════

/// The timer scheduler.
///
/// `C` is the application context handed to every callback.  Methods take
/// `&self`, so one instance can be shared between the tick interrupt and
/// the main loop (typically as a `static`).
pub struct Scheduler<C> {
    tick_ms: Ticks,
    lists: Mutex<RefCell<Lists<C>>>,
}

impl<C> Scheduler<C> {
    /// Create a scheduler whose clock advances by `tick_ms` per tick.
    pub const fn new(tick_ms: Ticks) -> Self {
        Self {
            tick_ms,
            lists: Mutex::new(RefCell::new(Lists::new())),
        }
    }

    fn with<R>(&self, f: impl FnOnce(&mut Lists<C>) -> R) -> R {
        critical_section::with(|cs| f(&mut self.lists.borrow_ref_mut(cs)))
    }

    // ── Registration ──────────────────────────────────────────

    /// Claim a slot for `callback`.  The timer starts idle.
    pub fn register(
        &self,
        label: &'static str,
        callback: TimerCallback<C>,
    ) -> Result<TimerId, TimerError> {
        let id = self.with(|l| {
            let idx = l.slots.len() as u8;
            l.slots
                .push(Slot {
                    label,
                    callback,
                    period: 0,
                    due: 0,
                    state: TimerState::Idle,
                    next: None,
                })
                .map_err(|_| TimerError::NoFreeSlot)?;
            Ok(TimerId(idx))
        });
        match id {
            Ok(id) => debug!("Scheduler: registered '{}' at slot {}", label, id.index()),
            Err(_) => warn!("Scheduler: no free slot for '{}'", label),
        }
        id
    }

    // ── Arming / cancelling ───────────────────────────────────

    /// Arm `id` to fire `period_ms` from now, then every `period_ms` while
    /// its callback returns [`TimerAction::Repeat`].
    ///
    /// An already armed timer is replaced.  A rejected period leaves the
    /// scheduler untouched.
    pub fn create(&self, id: TimerId, period_ms: u32) -> Result<(), TimerError> {
        let period = validate_period(period_ms).inspect_err(|_| {
            warn!("Scheduler: rejected period {}ms for slot {}", period_ms, id.index());
        })?;
        self.with(|l| {
            let idx = l.index_of(id)?;
            l.unlink(idx);
            let now = l.now;
            let slot = &mut l.slots[idx as usize];
            slot.period = period;
            slot.due = now.wrapping_add(period);
            l.insert_pending(idx);
            Ok(())
        })
    }

    /// Arm `id` onto the due queue so it runs on the next `run_next` pass,
    /// then every `period_ms` while it repeats.
    pub fn create_immediate(&self, id: TimerId, period_ms: u32) -> Result<(), TimerError> {
        let period = validate_period(period_ms)?;
        self.with(|l| {
            let idx = l.index_of(id)?;
            l.unlink(idx);
            let now = l.now;
            let slot = &mut l.slots[idx as usize];
            slot.period = period;
            slot.due = now;
            l.push_due(idx);
            Ok(())
        })
    }

    /// Cancel `id`.  Unknown or idle timers are ignored.
    pub fn delete(&self, id: TimerId) {
        self.with(|l| {
            if let Ok(idx) = l.index_of(id) {
                l.unlink(idx);
            }
        });
    }

    /// Cancel every timer.  Registrations are kept.
    pub fn flush(&self) {
        self.with(|l| {
            l.pending_head = None;
            l.due_head = None;
            l.due_tail = None;
            for slot in &mut l.slots {
                slot.next = None;
                slot.state = TimerState::Idle;
            }
        });
    }

    // ── Tick + dispatch ───────────────────────────────────────

    /// Advance the clock by one tick and promote expired timers.
    ///
    /// Called from the tick interrupt.  Never runs a callback.
    pub fn on_tick(&self) {
        self.with(|l| {
            l.now = l.now.wrapping_add(self.tick_ms);
            l.promote_expired();
        });
    }

    /// Run the callback at the head of the due queue, if any.
    ///
    /// Returns `false` when nothing was due.  Call once per main-loop pass.
    pub fn run_next(&self, ctx: &mut C) -> bool {
        let popped = self.with(|l| {
            let idx = l.pop_due()?;
            l.slots[idx as usize].state = TimerState::Running;
            Some((idx, l.slots[idx as usize].callback))
        });
        let Some((idx, callback)) = popped else {
            return false;
        };

        let action = callback(ctx, self);

        self.with(|l| {
            // The callback deleted or re-armed its own timer: that wins.
            if l.slots[idx as usize].state != TimerState::Running {
                return;
            }
            match action {
                TimerAction::Repeat => {
                    let slot = &mut l.slots[idx as usize];
                    slot.due = slot.due.wrapping_add(slot.period);
                    l.insert_pending(idx);
                }
                TimerAction::Stop => l.slots[idx as usize].state = TimerState::Idle,
            }
        });
        true
    }

    // ── Queries ───────────────────────────────────────────────

    /// Current scheduler time.
    pub fn now(&self) -> Ticks {
        self.with(|l| l.now)
    }

    /// Milliseconds added per tick.
    pub fn tick_ms(&self) -> Ticks {
        self.tick_ms
    }

    pub fn state(&self, id: TimerId) -> Option<TimerState> {
        self.with(|l| l.slots.get(id.index()).map(|s| s.state))
    }

    /// `true` while the timer sits in the pending list or the due queue.
    pub fn is_active(&self, id: TimerId) -> bool {
        matches!(self.state(id), Some(TimerState::Pending | TimerState::Due))
    }

    /// Absolute due time of an armed timer.
    pub fn due_at(&self, id: TimerId) -> Option<Ticks> {
        self.with(|l| {
            l.slots
                .get(id.index())
                .filter(|s| s.state != TimerState::Idle)
                .map(|s| s.due)
        })
    }

    pub fn label(&self, id: TimerId) -> Option<&'static str> {
        self.with(|l| l.slots.get(id.index()).map(|s| s.label))
    }

    /// Pending timers in firing order.
    pub fn pending_ids(&self) -> Vec<TimerId, MAX_TIMERS> {
        self.with(|l| l.chain(l.pending_head))
    }

    /// Due timers in execution order.
    pub fn due_ids(&self) -> Vec<TimerId, MAX_TIMERS> {
        self.with(|l| l.chain(l.due_head))
    }

    pub fn pending_len(&self) -> usize {
        self.pending_ids().len()
    }

    pub fn due_len(&self) -> usize {
        self.due_ids().len()
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════
