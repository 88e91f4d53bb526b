//! Cross-module scenario tests (spec.md S8's end-to-end scenarios, the
//! subset observable on a host build without a running scheduler: no
//! `os_start`, since `port::stub::os_start_high_rdy` panics off-target).
//!
//! Each scenario exercises how two or more modules interact rather than a
//! single function in isolation: task-pool/priority reservation conflicts,
//! a mutex's ceiling slot competing with task creation, and the
//! producer/consumer two-semaphore pattern from scenario 4.

use prettyos::config::{CFG_PRIO_APP_MIN, CFG_PRIO_IDLE};
use prettyos::error::OsError;
use prettyos::mailbox::Mailbox;
use prettyos::mutex::Mutex;
use prettyos::sem::Semaphore;
use prettyos::types::{FlagWaitKind, opt};
use prettyos::{flag_grp, mem};

fn noop_task(_arg: *mut ()) -> ! {
    loop {}
}

/// These scenarios share `prettyos`'s global kernel singletons (the TCB
/// pool, event/flag/partition pools). `critical_section` only buys real
/// exclusion on a single core with interrupts disabled, not across host
/// test threads, so serialize with a plain lock instead of trusting it
/// here.
static TEST_LOCK: std::sync::Mutex<()> = std::sync::Mutex::new(());

fn locked<T>(f: impl FnOnce() -> T) -> T {
    let _guard = TEST_LOCK.lock().unwrap_or_else(|e| e.into_inner());
    f()
}

/// Task-pool and priority-reservation scenario: reserved priorities,
/// undersized stacks, idle's own slot, and the unique-priority-per-task
/// invariant all get exercised against one freshly initialized kernel.
#[test]
fn task_creation_and_priority_reservation() {
    locked(|| {
        static mut STK_A: [u32; 128] = [0; 128];
        static mut STK_B: [u32; 128] = [0; 128];
        static mut STK_C: [u32; 128] = [0; 128];
        static mut STK_SMALL: [u32; 4] = [0; 4];

        prettyos::os_init().unwrap();

        // Priority 0/1 reserved; app tasks start at CFG_PRIO_APP_MIN.
        let err = prettyos::os_task_create(
            "Reserved",
            noop_task,
            core::ptr::null_mut(),
            unsafe { &mut *&raw mut STK_A },
            CFG_PRIO_APP_MIN - 1,
        )
        .unwrap_err();
        assert_eq!(err, OsError::PrioReserved);

        // Stack below the configured minimum is rejected up front.
        let err = prettyos::os_task_create(
            "TooSmall",
            noop_task,
            core::ptr::null_mut(),
            unsafe { &mut *&raw mut STK_SMALL },
            CFG_PRIO_APP_MIN,
        )
        .unwrap_err();
        assert_eq!(err, OsError::StkSizeInvalid);

        // Idle's own slot is reserved at os_init time; an application task
        // can't be created over it.
        let err = prettyos::os_task_create(
            "StealIdle",
            noop_task,
            core::ptr::null_mut(),
            unsafe { &mut *&raw mut STK_B },
            CFG_PRIO_IDLE,
        )
        .unwrap_err();
        assert_eq!(err, OsError::PrioExist);

        // A real task creation succeeds...
        prettyos::os_task_create("A", noop_task, core::ptr::null_mut(), unsafe { &mut *&raw mut STK_B }, 20)
            .unwrap();

        // ...and a second task at the same priority is refused: priorities
        // are unique task identities in this kernel.
        let err =
            prettyos::os_task_create("A2", noop_task, core::ptr::null_mut(), unsafe { &mut *&raw mut STK_C }, 20)
                .unwrap_err();
        assert_eq!(err, OsError::PrioExist);

        // os_start is never exercised here (panics off-target); os_init
        // alone is enough to validate the task pool and priority
        // bookkeeping.
    })
}

/// A mutex's priority-ceiling slot is reserved like a phantom task: no real
/// task may ever be created at that priority while the mutex lives, and a
/// second mutex can't be created over a ceiling another mutex already
/// occupies.
#[test]
fn mutex_ceiling_reserves_its_priority_slot() {
    locked(|| {
        static MTX: Mutex = Mutex::new();
        static MTX2: Mutex = Mutex::new();
        const CEILING: u8 = 9;

        MTX.create(CEILING, "Ceil").unwrap();

        let err = MTX2.create(CEILING, "Ceil2").unwrap_err();
        assert_eq!(err, OsError::PrioExist);
    })
}

/// Scenario 4 (producer/consumer, bounded buffer): `fill = Sem(0)`,
/// `room = Sem(5)`. After feeding and fully draining N items, both
/// semaphores return to their initial counts.
#[test]
fn producer_consumer_semaphore_pair_returns_to_initial_counts() {
    locked(|| {
        static FILL: Semaphore = Semaphore::new();
        static ROOM: Semaphore = Semaphore::new();
        const CAPACITY: u32 = 5;
        const ITEMS: u32 = 20;

        FILL.create(0, "fill").unwrap();
        ROOM.create(CAPACITY, "room").unwrap();

        let mut buffer: u32 = 0;
        let mut produced = 0;
        let mut consumed = 0;

        while consumed < ITEMS {
            if produced < ITEMS && ROOM.wait(0, opt::PEND_NON_BLOCKING).is_ok() {
                buffer = buffer.wrapping_add(1);
                produced += 1;
                FILL.signal(opt::NONE).unwrap();
            }
            if FILL.wait(0, opt::PEND_NON_BLOCKING).is_ok() {
                let _ = buffer;
                consumed += 1;
                ROOM.signal(opt::NONE).unwrap();
            }
        }

        assert_eq!(FILL.count(), 0);
        assert_eq!(ROOM.count(), CAPACITY);
    })
}

/// A mailbox slot that already holds an unclaimed message refuses a second
/// post rather than overwriting it (spec.md's boundary behavior list).
#[test]
fn mailbox_post_into_full_unwaited_slot_is_rejected() {
    locked(|| {
        static MBOX: Mailbox = Mailbox::new();
        let mut a = 1u8;
        let mut b = 2u8;

        MBOX.create(None, 1, "mbox").unwrap();
        MBOX.send((&mut a) as *mut u8 as *mut (), opt::NONE).unwrap();
        let err = MBOX.send((&mut b) as *mut u8 as *mut (), opt::NONE).unwrap_err();
        assert_eq!(err, OsError::MboxFull);

        let received = MBOX.receive(0, opt::PEND_NON_BLOCKING).unwrap();
        assert_eq!(received, (&mut a) as *mut u8 as *mut ());

        // The slot is free again now.
        MBOX.send((&mut b) as *mut u8 as *mut (), opt::NONE).unwrap();
    })
}

/// Scenario 6 (event flag multi-bit rendezvous), restricted to the
/// non-blocking host-testable half: four independent posters set bits
/// 0..3 one at a time, and only once all four are set does a SET_ALL/
/// consume-on-exit wait succeed and read back 0x0F with the group itself
/// cleared afterward.
#[test]
fn flag_group_set_all_rendezvous_with_consume_on_exit() {
    locked(|| {
        static FLAGS: flag_grp::FlagGroup = flag_grp::FlagGroup::new();
        FLAGS.create(0, "rendezvous").unwrap();

        let wait_opt = opt::FLAG_SET_ALL | opt::FLAG_CONSUME | opt::PEND_NON_BLOCKING;

        FLAGS.post(0x01, opt::FLAG_POST_SET).unwrap();
        assert_eq!(FLAGS.wait(0x0F, wait_opt, 0), Err(OsError::PendWouldBlock));

        FLAGS.post(0x02, opt::FLAG_POST_SET).unwrap();
        FLAGS.post(0x04, opt::FLAG_POST_SET).unwrap();
        assert_eq!(FLAGS.wait(0x0F, wait_opt, 0), Err(OsError::PendWouldBlock));

        assert_eq!(FLAGS.post(0x08, opt::FLAG_POST_SET).unwrap(), 0x0F);

        let matched = FLAGS.wait(0x0F, wait_opt, 0).unwrap();
        assert_eq!(matched, 0x0F);
        assert_eq!(FLAGS.flags(), 0);
    })
}

/// A bit dropping to 0 satisfies a CLEAR_ANY wait immediately, even while
/// other bits in the mask are still set.
#[test]
fn flag_group_clear_any_is_satisfied_by_a_single_bit_dropping() {
    locked(|| {
        static FLAGS: flag_grp::FlagGroup = flag_grp::FlagGroup::new();
        FLAGS.create(0xFF, "clear_any").unwrap();

        assert_eq!(
            FLAGS.wait(0x03, opt::FLAG_CLR_ANY | opt::PEND_NON_BLOCKING, 0),
            Err(OsError::PendWouldBlock)
        );

        FLAGS.post(0x01, opt::FLAG_POST_CLR).unwrap();
        let matched = FLAGS.wait(0x03, opt::FLAG_CLR_ANY | opt::PEND_NON_BLOCKING, 0).unwrap();
        assert_eq!(matched, 0x01);
    })
}

/// The wait-kind selector bits (`FLAG_SET_ALL`/`FLAG_SET_ANY`/
/// `FLAG_CLR_ALL`/`FLAG_CLR_ANY`) are mandatory and mutually exclusive.
#[test]
fn flag_wait_kind_selector_is_mandatory_and_exclusive() {
    locked(|| {
        static FLAGS: flag_grp::FlagGroup = flag_grp::FlagGroup::new();
        FLAGS.create(0, "kind_check").unwrap();

        assert_eq!(FLAGS.wait(0x1, opt::PEND_NON_BLOCKING, 0), Err(OsError::FlagInvalidOpt));
        assert_eq!(
            FLAGS.wait(0x1, opt::FLAG_SET_ALL | opt::FLAG_SET_ANY | opt::PEND_NON_BLOCKING, 0),
            Err(OsError::FlagInvalidOpt)
        );

        let _ = FlagWaitKind::SetAll;
    })
}

/// Memory partitions exhaust cleanly and the freed block is immediately
/// reusable, matching the free list's LIFO order.
#[test]
fn memory_partition_exhaustion_and_reuse() {
    locked(|| {
        static mut POOL: [u8; 128] = [0; 128];

        let id = unsafe { mem::create((&raw mut POOL).cast(), 8, 16) }.unwrap();
        let mut blocks = [core::ptr::null_mut(); 8];
        for b in blocks.iter_mut() {
            *b = mem::alloc(id).unwrap();
        }
        assert_eq!(mem::free_count(id), 0);
        assert_eq!(mem::alloc(id), Err(OsError::MemNoFreeBlocks));

        unsafe { mem::free(id, blocks[3]).unwrap() };
        assert_eq!(mem::free_count(id), 1);
        let reused = mem::alloc(id).unwrap();
        assert_eq!(reused, blocks[3]);
    })
}
