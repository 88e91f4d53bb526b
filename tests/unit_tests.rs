//! Unit tests for core RTOS modules
//!
//! These tests run on the host (not embedded target) to verify
//! the core algorithms work correctly.

#[cfg(test)]
mod bitmap_tests {
    use prettyos::bitmap::Bitmap;
    use prettyos::config::CFG_PRIO_MAX;

    #[test]
    fn test_empty_bitmap() {
        let b = Bitmap::new();
        assert!(b.is_empty());
        assert_eq!(b.highest(), None);
    }

    #[test]
    fn test_single_priority() {
        let mut b = Bitmap::new();

        b.insert(5);
        assert!(!b.is_empty());
        assert!(b.is_set(5));
        assert!(!b.is_set(4));
        assert_eq!(b.highest(), Some(5));

        b.remove(5);
        assert!(b.is_empty());
    }

    #[test]
    fn test_multiple_priorities() {
        let mut b = Bitmap::new();

        // Insert in random order
        b.insert(20);
        b.insert(5);
        b.insert(10);
        b.insert(0);
        b.insert(15);

        // Highest priority = highest index
        assert_eq!(b.highest(), Some(20));

        b.remove(20);
        assert_eq!(b.highest(), Some(15));

        b.remove(15);
        assert_eq!(b.highest(), Some(10));

        b.remove(10);
        assert_eq!(b.highest(), Some(5));

        b.remove(5);
        assert_eq!(b.highest(), Some(0));

        b.remove(0);
        assert!(b.is_empty());
    }

    #[test]
    fn test_boundary_priorities() {
        let mut b = Bitmap::new();

        // Test at word boundaries (31, 32, 33)
        b.insert(31);
        assert_eq!(b.highest(), Some(31));

        b.insert(32);
        assert_eq!(b.highest(), Some(32));

        b.remove(32);
        assert_eq!(b.highest(), Some(31));

        b.insert(0);
        assert_eq!(b.highest(), Some(31));

        b.insert(63);
        b.remove(31);
        assert_eq!(b.highest(), Some(63));
    }

    #[test]
    fn test_all_priorities() {
        let mut b = Bitmap::new();

        for i in 0..CFG_PRIO_MAX {
            b.insert(i as u8);
        }

        assert_eq!(b.highest(), Some((CFG_PRIO_MAX - 1) as u8));

        for i in (0..CFG_PRIO_MAX).rev() {
            assert_eq!(b.highest(), Some(i as u8));
            b.remove(i as u8);
        }

        assert!(b.is_empty());
    }

    #[test]
    fn test_duplicate_insert_remove() {
        let mut b = Bitmap::new();

        b.insert(10);
        b.insert(10);
        assert_eq!(b.highest(), Some(10));

        b.remove(10);
        assert!(b.is_empty());
    }
}

#[cfg(test)]
mod error_tests {
    use prettyos::error::OsError;

    #[test]
    fn test_error_variants() {
        assert!(OsError::None.is_ok());
        assert!(!OsError::None.is_err());

        assert!(!OsError::Timeout.is_ok());
        assert!(OsError::Timeout.is_err());

        assert_eq!(OsError::None, OsError::None);
        assert_ne!(OsError::None, OsError::Timeout);
    }

    #[test]
    fn test_error_debug() {
        let err = OsError::PendIsr;
        let _ = format!("{:?}", err);
    }
}

#[cfg(test)]
mod types_tests {
    use prettyos::types::*;

    #[test]
    fn test_task_state_bitset() {
        assert!(state::is_ready(state::READY));
        assert!(!state::is_ready(state::DELAY));

        let delayed_pend = state::PEND_SEM | state::DELAY;
        assert!(state::is_pending(delayed_pend));
        assert!(state::is_delayed(delayed_pend));
        assert!(!state::is_suspended(delayed_pend));
    }

    #[test]
    fn test_pend_result_enum() {
        let result = PendResult::Ok;
        assert_eq!(result, PendResult::Ok);
        assert_ne!(result, PendResult::Timeout);
    }

    #[test]
    fn test_option_flags() {
        use prettyos::types::opt::*;

        assert_eq!(NONE, 0);
        assert_eq!(PEND_NON_BLOCKING, 0x8000);
        assert_eq!(POST_NO_SCHED, 0x8000);

        let combined = POST_FIFO | POST_NO_SCHED;
        assert_eq!(combined & POST_NO_SCHED, POST_NO_SCHED);
    }
}

#[cfg(test)]
mod config_tests {
    use prettyos::config::*;

    #[test]
    fn test_config_values() {
        assert!(CFG_PRIO_MAX >= 8, "Need at least 8 priority levels");
        assert!(CFG_PRIO_MAX <= 256, "Too many priority levels");

        assert!(CFG_STK_SIZE_MIN >= 32, "Stack too small");

        assert!(CFG_TICK_RATE_HZ >= 10, "Tick rate too slow");
        assert!(CFG_TICK_RATE_HZ <= 10000, "Tick rate too fast");

        // Idle priority should be the least urgent (lowest value)
        assert_eq!(CFG_PRIO_IDLE, 0);
        assert!(CFG_PRIO_APP_MIN > 0, "priority 0 is reserved");
    }
}
