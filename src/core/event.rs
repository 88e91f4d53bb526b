//! Shared Event Control Block (ECB) pool backing semaphores, mutexes, and
//! mailboxes (`original_source/kernel/pretty_event.c`).
//!
//! Each primitive allocates a slot from one fixed-size pool at creation
//! time and gets back an [`EventId`], the same pool-allocation shape
//! `pretty_event.c`'s `OS_EventCreate` uses, rather than each primitive
//! owning its own freestanding pend list. `core::list::IdList` threads
//! the wait list.

use crate::config::CFG_MAX_EVENTS;
use crate::critical::critical_section;
use crate::cs_cell::CsCell;
use crate::error::{OsError, OsResult};
use crate::list::IdList;
use crate::types::{EventId, EventType, OsMsgSize, OsPrio, OsSemCtr, TcbId};

/// Type-specific payload for an ECB.
#[derive(Clone, Copy)]
pub enum EcbData {
    None,
    Sem {
        count: OsSemCtr,
    },
    Mutex {
        owner: Option<TcbId>,
        /// Priority ceiling declared at creation time (SPEC_FULL.md B.2).
        ceiling: OsPrio,
        /// Owner's priority before being raised to the ceiling, 0 if not raised.
        owner_orig_prio: OsPrio,
        nesting: u8,
    },
    Mailbox {
        msg: Option<*mut ()>,
        msg_size: OsMsgSize,
    },
}

#[derive(Clone, Copy)]
pub struct Ecb {
    pub ty: EventType,
    pub name: &'static str,
    pub wait: IdList,
    pub data: EcbData,
}

impl Ecb {
    const fn new() -> Self {
        Ecb { ty: EventType::Unused, name: "", wait: IdList::new(), data: EcbData::None }
    }
}

unsafe impl Send for Ecb {}
unsafe impl Sync for Ecb {}

struct EventPool {
    slots: [Ecb; CFG_MAX_EVENTS],
    /// Bit `i` set means slot `i` is allocated. `CFG_MAX_EVENTS` is sized
    /// to fit exactly in one `u32`.
    used: u32,
}

impl EventPool {
    const fn new() -> Self {
        const ECB_INIT: Ecb = Ecb::new();
        EventPool { slots: [ECB_INIT; CFG_MAX_EVENTS], used: 0 }
    }

    fn reset(&mut self) {
        self.slots = [Ecb::new(); CFG_MAX_EVENTS];
        self.used = 0;
    }
}

static EVENTS: CsCell<EventPool> = CsCell::new(EventPool::new());

pub(crate) fn reset() {
    critical_section(|cs| EVENTS.get(cs).reset());
}

/// Allocate a free ECB slot and initialize it with `ty`/`data`.
pub fn alloc(ty: EventType, name: &'static str, data: EcbData) -> OsResult<EventId> {
    critical_section(|cs| {
        let pool = EVENTS.get(cs);
        for i in 0..CFG_MAX_EVENTS {
            if pool.used & (1 << i) == 0 {
                pool.used |= 1 << i;
                pool.slots[i] = Ecb { ty, name, wait: IdList::new(), data };
                return Ok(EventId(i as u16));
            }
        }
        Err(OsError::ObjPoolEmpty)
    })
}

/// Release an ECB slot back to the pool.
///
/// # Safety
/// Caller must ensure no task is waiting on this event and that `id`
/// is currently allocated.
pub unsafe fn free(id: EventId) {
    critical_section(|cs| {
        let pool = EVENTS.get(cs);
        pool.used &= !(1 << id.index());
        pool.slots[id.index()] = Ecb::new();
    });
}

/// # Safety
/// Caller must hold the kernel critical section for the duration of use,
/// and `id` must refer to an allocated slot.
#[inline(always)]
pub(crate) unsafe fn ecb_mut(id: EventId) -> &'static mut Ecb {
    unsafe { &mut EVENTS.get_unchecked().slots[id.index()] }
}
