//! SIGINT/SIGTERM handling while a partition table is being written.
//!
//! The first signal only sets a flag. [`CommandRunner`](crate::utils::command::CommandRunner)
//! checks it before every command, so nothing runs after a half-written table.
//! A second signal names the target device for a manual check and exits
//! with the default action.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::OnceLock;

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

static SIGNAL_COUNT: AtomicUsize = AtomicUsize::new(0);

/// Signal number of the first interruption, 0 if none
static CAUGHT_SIGNAL: AtomicUsize = AtomicUsize::new(0);

/// Disk being partitioned; set once before any handler can fire
static TARGET_DEVICE: OnceLock<String> = OnceLock::new();

const STOPPING_MSG: &[u8] = b"\nInterrupt received, stopping before the next command...\n";

/// Pieces of the forced-exit hint, written one after another without allocating
fn forced_exit_message(device: Option<&str>) -> [&[u8]; 3] {
    [
        b"\nForced exit - check the partition table with: parted ",
        device.map_or(b"<device>".as_slice(), str::as_bytes),
        b" print\n",
    ]
}

fn write_stderr(bytes: &[u8]) {
    unsafe {
        libc::write(2, bytes.as_ptr() as *const libc::c_void, bytes.len());
    }
}

// Async-signal-safe: atomics, an already-initialized OnceLock read and write(2)
extern "C" fn handle_signal(sig: libc::c_int) {
    if SIGNAL_COUNT.fetch_add(1, Ordering::SeqCst) == 0 {
        INTERRUPTED.store(true, Ordering::SeqCst);
        CAUGHT_SIGNAL.store(sig as usize, Ordering::SeqCst);
        write_stderr(STOPPING_MSG);
        return;
    }

    let device = TARGET_DEVICE.get().map(String::as_str);
    for part in forced_exit_message(device) {
        write_stderr(part);
    }
    unsafe {
        libc::signal(sig, libc::SIG_DFL);
        libc::raise(sig);
    }
}

/// Remember `device` for the forced-exit hint and install the SIGINT/SIGTERM
/// handlers. Later calls keep the first device.
pub fn install_signal_handlers(device: &str) {
    let _ = TARGET_DEVICE.set(device.to_string());

    for sig in [libc::SIGINT, libc::SIGTERM] {
        unsafe {
            libc::signal(sig, handle_signal as *const () as libc::sighandler_t);
        }
    }
}

/// Device named in the forced-exit hint, once handlers are installed
pub fn target_device() -> Option<&'static str> {
    TARGET_DEVICE.get().map(String::as_str)
}

pub fn is_interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Re-raise the caught signal with the default action so the exit status
/// reflects it. No-op when nothing was caught.
pub fn reraise() {
    let sig = CAUGHT_SIGNAL.load(Ordering::SeqCst);
    if sig != 0 {
        unsafe {
            libc::signal(sig as libc::c_int, libc::SIG_DFL);
            libc::raise(sig as libc::c_int);
        }
    }
}
