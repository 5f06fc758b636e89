use crate::models::error::SoftFailure;
use crate::traits::media_backend::NativeHandle;

/// Scope-bound owner of a native handle.
///
/// Releases the handle exactly once: either through [`Owned::release`], which
/// reports a failed release to the caller, or on drop, which logs it.
pub struct Owned<T: NativeHandle> {
    label: &'static str,
    handle: Option<T>,
}

impl<T: NativeHandle> Owned<T> {
    pub fn new(label: &'static str, handle: T) -> Self {
        Self {
            label,
            handle: Some(handle),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    pub fn get(&self) -> &T {
        // Only `release` and `drop` take the handle, and both consume `self`.
        self.handle
            .as_ref()
            .unwrap_or_else(|| unreachable!("{} used after release", self.label))
    }

    pub fn release(mut self) -> Result<(), SoftFailure> {
        self.release_inner()
    }

    fn release_inner(&mut self) -> Result<(), SoftFailure> {
        match self.handle.take() {
            Some(handle) => handle
                .release()
                .map_err(|error| SoftFailure::ResourceReleaseFailed {
                    handle: self.label,
                    error,
                }),
            None => Ok(()),
        }
    }
}

impl<T: NativeHandle> Drop for Owned<T> {
    fn drop(&mut self) {
        if let Err(failure) = self.release_inner() {
            failure.log();
        }
    }
}

/// Release an optional owned handle, collecting a failure instead of raising it.
pub(crate) fn release_slot<T: NativeHandle>(slot: &mut Option<Owned<T>>, failures: &mut Vec<SoftFailure>) {
    if let Some(owned) = slot.take() {
        if let Err(failure) = owned.release() {
            failure.log();
            failures.push(failure);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::error::{NativeError, NativeResult};
    use std::sync::Arc;

    use parking_lot::Mutex;

    struct Tracked {
        name: &'static str,
        fail: bool,
        log: Arc<Mutex<Vec<&'static str>>>,
    }

    impl NativeHandle for Tracked {
        fn release(self) -> NativeResult<()> {
            self.log.lock().push(self.name);
            if self.fail {
                Err(NativeError::new("Release", "refused"))
            } else {
                Ok(())
            }
        }
    }

    fn tracked(name: &'static str, fail: bool, log: &Arc<Mutex<Vec<&'static str>>>) -> Tracked {
        Tracked {
            name,
            fail,
            log: Arc::clone(log),
        }
    }

    #[test]
    fn drop_releases_once() {
        let log = Arc::new(Mutex::new(Vec::new()));
        {
            let _a = Owned::new("a", tracked("a", false, &log));
            let _b = Owned::new("b", tracked("b", false, &log));
        }
        // Locals drop in reverse declaration order.
        assert_eq!(*log.lock(), vec!["b", "a"]);
    }

    #[test]
    fn explicit_release_reports_failure_and_skips_drop() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let owned = Owned::new("renderer", tracked("renderer", true, &log));
        let failure = owned.release().unwrap_err();
        assert!(matches!(
            failure,
            SoftFailure::ResourceReleaseFailed { handle: "renderer", .. }
        ));
        assert_eq!(*log.lock(), vec!["renderer"]);
    }

    #[test]
    fn release_slot_empties_slot() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut slot = Some(Owned::new("graph", tracked("graph", true, &log)));
        let mut failures = Vec::new();
        release_slot(&mut slot, &mut failures);
        release_slot(&mut slot, &mut failures);
        assert!(slot.is_none());
        assert_eq!(failures.len(), 1);
        assert_eq!(*log.lock(), vec!["graph"]);
    }
}
