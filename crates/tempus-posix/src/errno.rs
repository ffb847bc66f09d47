//! Last-error cell.
//!
//! Mirrors the classic return-code-plus-`errno` reporting: every error
//! returned by a public entry point is also recorded here as a POSIX
//! error number. The cell is per-thread, matching `errno` semantics,
//! so a failure on one thread never clobbers another thread's report.

use std::cell::Cell;

use crate::error::TimeError;

pub const EINTR: i32 = 4;
pub const ENOMEM: i32 = 12;
pub const EINVAL: i32 = 22;
pub const ENOSYS: i32 = 38;

thread_local! {
    static LAST_ERROR: Cell<i32> = const { Cell::new(0) };
}

/// Returns the calling thread's most recently recorded error number,
/// 0 if none.
#[inline]
pub fn last_error() -> i32 {
    LAST_ERROR.get()
}

/// Stores an error number for the calling thread.
#[inline]
pub fn set_last_error(code: i32) {
    LAST_ERROR.set(code);
}

/// Clears the calling thread's cell back to 0.
#[inline]
pub fn clear_last_error() {
    LAST_ERROR.set(0);
}

/// POSIX error number for a [`TimeError`].
///
/// RTC absence maps to `ENOSYS` like the feature gaps do; the typed
/// error keeps the two distinguishable.
#[inline]
pub fn code_of(err: &TimeError) -> i32 {
    match err {
        TimeError::InvalidArgument => EINVAL,
        TimeError::NoRtc | TimeError::Unsupported => ENOSYS,
        TimeError::OutOfMemory => ENOMEM,
        TimeError::Interrupted { .. } => EINTR,
    }
}

/// Records `err` in the last-error cell and hands it back, so failure
/// sites can write `return Err(errno::fail(...))`.
#[inline]
pub fn fail(err: TimeError) -> TimeError {
    set_last_error(code_of(&err));
    err
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempus_core::units::Timespec;

    #[test]
    fn fail_records_code() {
        clear_last_error();
        let err = fail(TimeError::InvalidArgument);
        assert_eq!(err, TimeError::InvalidArgument);
        assert_eq!(last_error(), EINVAL);

        fail(TimeError::OutOfMemory);
        assert_eq!(last_error(), ENOMEM);

        fail(TimeError::Interrupted {
            remaining: Timespec::ZERO,
        });
        assert_eq!(last_error(), EINTR);

        fail(TimeError::NoRtc);
        assert_eq!(last_error(), ENOSYS);
    }

    #[test]
    fn cell_is_per_thread() {
        set_last_error(EINVAL);
        std::thread::spawn(|| {
            assert_eq!(last_error(), 0);
            set_last_error(ENOMEM);
        })
        .join()
        .unwrap();
        assert_eq!(last_error(), EINVAL);
    }
}
