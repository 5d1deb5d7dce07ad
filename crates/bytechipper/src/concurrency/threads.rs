//! # Thread Utilities

use core::str::FromStr;
use std::{env, num::NonZeroUsize, thread};

use crate::errors::{BCResult, BytechipperError};

/// The search list of environment variables that Rayon uses to control parallelism.
pub const RAYON_VARS: &[&str] = &["RAYON_NUM_THREADS", "RAYON_RS_NUM_CPUS"];

/// Get the max parallelism available.
///
/// Scans `RAYON_VARS` first, then falls back to
/// ``thread::available_parallelism()``.
pub fn est_max_parallelism() -> NonZeroUsize {
    for name in RAYON_VARS {
        if let Some(x) = env::var(name)
            .ok()
            .and_then(|s| usize::from_str(s.trim()).ok())
            .and_then(NonZeroUsize::new)
        {
            return x;
        }
    }

    thread::available_parallelism().unwrap_or(NonZeroUsize::MIN)
}

/// Resolve a requested worker count.
///
/// `None` selects [`est_max_parallelism`].
///
/// ## Errors
/// [`BytechipperError::InvalidConfig`] for a zero count.
pub fn resolve_thread_count(requested: Option<usize>) -> BCResult<NonZeroUsize> {
    match requested {
        None => Ok(est_max_parallelism()),
        Some(n) => NonZeroUsize::new(n).ok_or_else(|| {
            BytechipperError::InvalidConfig("thread count must be positive".to_string())
        }),
    }
}

#[cfg(test)]
mod tests {
    use serial_test::serial;

    use super::*;
    use crate::types::BCHashMap;

    #[test]
    fn test_resolve_thread_count() {
        assert_eq!(resolve_thread_count(Some(3)).unwrap().get(), 3);
        assert!(matches!(
            resolve_thread_count(Some(0)),
            Err(BytechipperError::InvalidConfig(_))
        ));
    }

    #[test]
    #[serial]
    fn test_est_max_parallelism() {
        let mut orig_env: BCHashMap<String, Option<String>> = Default::default();

        for name in RAYON_VARS {
            orig_env.insert(name.to_string(), env::var(name).ok());
            unsafe { env::remove_var(name) };
        }

        let base = est_max_parallelism();
        assert_eq!(resolve_thread_count(None).unwrap(), base);

        for name in RAYON_VARS {
            unsafe { env::set_var(name, format!("{}", base.get() + 12)) };
            assert_eq!(est_max_parallelism().get(), base.get() + 12);

            unsafe { env::set_var(name, "0") };
            assert_eq!(est_max_parallelism(), base);

            unsafe { env::remove_var(name) };
        }

        assert_eq!(est_max_parallelism(), base);

        for (name, val) in orig_env {
            match val {
                Some(s) => unsafe { env::set_var(name, s) },
                None => unsafe { env::remove_var(name) },
            }
        }
    }
}
