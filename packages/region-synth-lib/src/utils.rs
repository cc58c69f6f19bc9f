use std::sync::atomic::{AtomicBool, Ordering};

use num::{BigInt, ToPrimitive};

/// Process-wide cooperative cancellation flag. Long enumerations poll it once
/// per iteration.
static CANCELLATION_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Asks every running synthesis to stop at its next poll.
pub fn request_cancellation() {
    CANCELLATION_REQUESTED.store(true, Ordering::SeqCst);
}

/// Clears a previous cancellation request.
pub fn reset_cancellation() {
    CANCELLATION_REQUESTED.store(false, Ordering::SeqCst);
}

pub fn is_cancellation_requested() -> bool {
    CANCELLATION_REQUESTED.load(Ordering::SeqCst)
}

/// Narrows an arbitrary precision value to `u64`, `None` if it is negative or
/// too large.
pub fn narrow_to_u64(value: &BigInt) -> Option<u64> {
    value.to_u64()
}

#[test]
fn test_narrow_to_u64() {
    assert_eq!(narrow_to_u64(&BigInt::from(7)), Some(7));
    assert_eq!(narrow_to_u64(&BigInt::from(-1)), None);
    assert_eq!(narrow_to_u64(&(BigInt::from(u64::MAX) + 1)), None);
}
