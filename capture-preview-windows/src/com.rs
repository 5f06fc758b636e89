//! COM plumbing shared by the backend.

use windows::Win32::System::Com::{CoInitializeEx, CoUninitialize, COINIT_APARTMENTTHREADED};

use capture_preview_core::models::error::{NativeError, NativeResult};

/// A single-threaded COM apartment on the current thread, left on drop.
///
/// Not `Send`: it has to be dropped on the thread that entered it.
pub struct ComApartment {
    _not_send: std::marker::PhantomData<*const ()>,
}

impl ComApartment {
    pub fn enter() -> NativeResult<Self> {
        unsafe {
            CoInitializeEx(None, COINIT_APARTMENTTHREADED)
                .ok()
                .map_err(|e| com_error("CoInitializeEx", e))?;
        }
        Ok(Self {
            _not_send: std::marker::PhantomData,
        })
    }
}

impl Drop for ComApartment {
    fn drop(&mut self) {
        unsafe {
            CoUninitialize();
        }
    }
}

/// Convert a COM failure into a `NativeError` for `operation`.
pub(crate) fn com_error(operation: &'static str, error: windows::core::Error) -> NativeError {
    NativeError::with_code(operation, error.code().0, error.message())
}
