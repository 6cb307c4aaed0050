//! Bounded retry for contended file access.
//!
//! The settings file is shared across processes; another process holding a
//! transient write lock shows up as an IO error that resolves itself within
//! a few milliseconds. The settings read goes through this helper; the
//! probing-path save loop follows the same attempt/delay pattern inline,
//! since it has to reload the whole store between attempts.

use std::io;
use std::thread;
use std::time::Duration;

/// Run `op` up to `attempts` times, sleeping `delay` between failures.
///
/// The error from the final attempt is returned when the ceiling is
/// exhausted. `attempts` must be at least 1.
pub fn with_retry<T>(
    attempts: usize,
    delay: Duration,
    mut op: impl FnMut() -> io::Result<T>,
) -> io::Result<T> {
    let mut attempt = 0;
    loop {
        match op() {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt >= attempts {
                    return Err(err);
                }
                thread::sleep(delay);
            }
        }
    }
}
