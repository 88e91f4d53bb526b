//! Intrusive doubly-linked list of TCBs, threaded through `TcbId` rather
//! than raw pointers.
//!
//! One type covers both FIFO-tail-insert and priority-ordered-insert
//! uses, since a task is only ever a member of one such list at a time
//! (the ready list at its priority, or a single event's wait list).

use crate::kernel::tcb_mut;
use crate::types::TcbId;

#[derive(Clone, Copy)]
pub struct IdList {
    head: Option<TcbId>,
    tail: Option<TcbId>,
}

impl IdList {
    pub const fn new() -> Self {
        IdList { head: None, tail: None }
    }

    pub fn init(&mut self) {
        self.head = None;
        self.tail = None;
    }

    #[inline]
    pub fn head(&self) -> Option<TcbId> {
        self.head
    }

    #[inline]
    pub fn tail(&self) -> Option<TcbId> {
        self.tail
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Insert at the tail (FIFO order).
    ///
    /// # Safety
    /// Caller must hold the kernel critical section and must not pass an
    /// id already linked into any list.
    pub unsafe fn insert_tail(&mut self, id: TcbId) {
        unsafe {
            let tcb = tcb_mut(id);
            tcb.link_next = None;
            tcb.link_prev = self.tail;
        }

        match self.tail {
            Some(tail) => unsafe { tcb_mut(tail).link_next = Some(id) },
            None => self.head = Some(id),
        }

        self.tail = Some(id);
    }

    /// Insert ordered by descending priority (highest numeric value, the
    /// most urgent task, first).
    ///
    /// # Safety
    /// Same contract as [`insert_tail`].
    pub unsafe fn insert_by_prio(&mut self, id: TcbId) {
        let prio = unsafe { tcb_mut(id).prio };

        let mut current = self.head;
        let mut prev: Option<TcbId> = None;

        while let Some(cur) = current {
            let cur_prio = unsafe { tcb_mut(cur).prio };
            if prio > cur_prio {
                break;
            }
            prev = current;
            current = unsafe { tcb_mut(cur).link_next };
        }

        unsafe {
            let tcb = tcb_mut(id);
            tcb.link_prev = prev;
            tcb.link_next = current;
        }

        match prev {
            Some(p) => unsafe { tcb_mut(p).link_next = Some(id) },
            None => self.head = Some(id),
        }

        match current {
            Some(c) => unsafe { tcb_mut(c).link_prev = Some(id) },
            None => self.tail = Some(id),
        }
    }

    /// Remove `id` from the list.
    ///
    /// # Safety
    /// Caller must hold the kernel critical section and must ensure `id`
    /// is actually a member of this list.
    pub unsafe fn remove(&mut self, id: TcbId) {
        let (prev, next) = unsafe {
            let tcb = tcb_mut(id);
            (tcb.link_prev, tcb.link_next)
        };

        match prev {
            Some(p) => unsafe { tcb_mut(p).link_next = next },
            None => self.head = next,
        }

        match next {
            Some(n) => unsafe { tcb_mut(n).link_prev = prev },
            None => self.tail = prev,
        }

        unsafe {
            let tcb = tcb_mut(id);
            tcb.link_prev = None;
            tcb.link_next = None;
        }
    }
}

impl Default for IdList {
    fn default() -> Self {
        Self::new()
    }
}

unsafe impl Send for IdList {}
unsafe impl Sync for IdList {}
