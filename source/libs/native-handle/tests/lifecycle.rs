//! CONTEXT: Descriptor ownership across native handle clone/close/delete
//! OWNERS: @runtime
//! STATUS: Functional
//! API_STABILITY: Stable
//! TEST_COVERAGE: 3 integration tests
//!
//! TEST_SCOPE:
//!   - clone duplicates descriptors instead of sharing them
//!   - close only affects the record it is given
//!   - integer payload survives cloning
//!
//! DEPENDENCIES:
//!   - native_handle primitives
//!   - libc::pipe / libc::fcntl for real descriptors
//!
//! Every test holds FD_LOCK so descriptor numbers are not recycled by a
//! concurrently running test between a close and the following check.

use libc::c_int;
use parking_lot::Mutex;

static FD_LOCK: Mutex<()> = Mutex::new(());

fn pipe() -> [c_int; 2] {
    let mut fds = [0; 2];
    assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
    fds
}

fn is_open(fd: c_int) -> bool {
    unsafe { libc::fcntl(fd, libc::F_GETFD) != -1 }
}

#[test]
fn clone_duplicates_descriptors() {
    let _guard = FD_LOCK.lock();
    let fds = pipe();
    let raw = native_handle::create(2, 1);
    let record = unsafe { &mut *raw };
    record.fds_mut().copy_from_slice(&fds);
    record.ints_mut()[0] = 42;

    let copy = unsafe { native_handle::clone(raw) };
    assert!(!copy.is_null());
    let copied = unsafe { &*copy };
    assert_eq!(copied.num_fds(), 2);
    assert_eq!(copied.ints(), &[42]);
    for (orig, dup) in fds.iter().zip(copied.fds()) {
        assert_ne!(orig, dup);
        assert!(is_open(*dup));
    }

    unsafe {
        assert_eq!(native_handle::close(copy), 0);
        assert_eq!(native_handle::delete(copy), 0);
    }
    assert!(fds.iter().all(|fd| is_open(*fd)));

    unsafe {
        assert_eq!(native_handle::close(raw), 0);
        assert_eq!(native_handle::delete(raw), 0);
    }
    assert!(fds.iter().all(|fd| !is_open(*fd)));
}

#[test]
fn close_leaves_record_allocated() {
    let _guard = FD_LOCK.lock();
    let fds = pipe();
    let raw = native_handle::create(1, 0);
    unsafe { &mut *raw }.fds_mut()[0] = fds[0];

    unsafe { native_handle::close(raw) };
    assert!(!is_open(fds[0]));
    // The header is still readable until delete.
    assert_eq!(unsafe { &*raw }.num_fds(), 1);
    unsafe {
        native_handle::delete(raw);
        libc::close(fds[1]);
    }
}

#[test]
fn clone_of_invalid_descriptor_fails_cleanly() {
    let _guard = FD_LOCK.lock();
    let fds = pipe();
    let raw = native_handle::create(2, 0);
    // The second slot is not a descriptor, so its dup fails after the first succeeded.
    unsafe { &mut *raw }.fds_mut().copy_from_slice(&[fds[0], -1]);

    let copy = unsafe { native_handle::clone(raw) };
    assert!(copy.is_null());

    unsafe {
        libc::close(fds[0]);
        libc::close(fds[1]);
        native_handle::delete(raw);
    }
}
