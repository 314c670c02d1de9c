use core::sync::atomic::{AtomicBool, AtomicU32, Ordering};

use crate::config::TickPolicy;

/// Hand-off of timer ticks from the interrupt to the main loop.
///
/// The interrupt side only ever calls [`TickSignal::raise`], which is a
/// single atomic store. Every other field is written by the main loop alone,
/// so no read-modify-write instructions are needed (Cortex-M0+ has none).
pub struct TickSignal {
    policy: TickPolicy,
    pending: AtomicBool,
    // written by the interrupt only
    raised: AtomicU32,
    // written by the main loop only
    consumed: AtomicU32,
    dropped: AtomicU32,
}

impl TickSignal {
    pub const fn new(policy: TickPolicy) -> Self {
        TickSignal {
            policy,
            pending: AtomicBool::new(false),
            raised: AtomicU32::new(0),
            consumed: AtomicU32::new(0),
            dropped: AtomicU32::new(0),
        }
    }

    /// Interrupt context. Marks one sampling interval as elapsed.
    pub fn raise(&self) {
        match self.policy {
            TickPolicy::Latest => self.pending.store(true, Ordering::Release),
            TickPolicy::Counted { .. } => {
                let raised = self.raised.load(Ordering::Relaxed);
                self.raised.store(raised.wrapping_add(1), Ordering::Release);
            }
        }
    }

    /// Consumes one pending tick, if any.
    pub fn take(&self) -> bool {
        match self.policy {
            TickPolicy::Latest => {
                if !self.pending.load(Ordering::Acquire) {
                    return false;
                }
                self.pending.store(false, Ordering::Release);
                true
            }
            TickPolicy::Counted { limit } => {
                let raised = self.raised.load(Ordering::Acquire);
                let mut consumed = self.consumed.load(Ordering::Relaxed);
                let backlog = raised.wrapping_sub(consumed);
                if backlog == 0 {
                    return false;
                }
                let limit = u32::from(limit.max(1));
                if backlog > limit {
                    let lost = backlog - limit;
                    self.add_dropped(lost);
                    consumed = raised.wrapping_sub(limit);
                    debug!("{} ticks over the backlog limit dropped", lost);
                }
                self.consumed
                    .store(consumed.wrapping_add(1), Ordering::Release);
                true
            }
        }
    }

    /// Forgets every pending tick.
    pub fn discard(&self) {
        match self.policy {
            TickPolicy::Latest => self.pending.store(false, Ordering::Release),
            TickPolicy::Counted { .. } => {
                let raised = self.raised.load(Ordering::Acquire);
                self.consumed.store(raised, Ordering::Release);
            }
        }
    }

    /// Ticks lost to the backlog limit. Always zero for [`TickPolicy::Latest`],
    /// which cannot tell a lost tick from a merged one.
    pub fn dropped(&self) -> u32 {
        self.dropped.load(Ordering::Relaxed)
    }

    fn add_dropped(&self, lost: u32) {
        let dropped = self.dropped.load(Ordering::Relaxed);
        self.dropped
            .store(dropped.saturating_add(lost), Ordering::Relaxed);
    }
}
