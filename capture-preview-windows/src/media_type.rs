//! Owned `AM_MEDIA_TYPE` blocks returned by the capture filters.

use std::mem::ManuallyDrop;

use windows::Win32::Media::MediaFoundation::{AM_MEDIA_TYPE, VIDEOINFOHEADER, VIDEOINFOHEADER2};
use windows::Win32::System::Com::CoTaskMemFree;

use capture_preview_core::models::format::RawCapability;

use crate::guids::{FORMAT_VIDEO_INFO, FORMAT_VIDEO_INFO2};

/// A media type allocated by the filter, freed on drop.
pub(crate) struct MediaType(*mut AM_MEDIA_TYPE);

impl MediaType {
    /// Take ownership of a filter-allocated media type. `None` for null.
    ///
    /// # Safety
    /// `raw` must come from `CoTaskMemAlloc` with a format block allocated
    /// the same way, and must not be freed elsewhere.
    pub unsafe fn from_raw(raw: *mut AM_MEDIA_TYPE) -> Option<Self> {
        (!raw.is_null()).then_some(Self(raw))
    }

    pub fn as_ptr(&self) -> *const AM_MEDIA_TYPE {
        self.0
    }

    /// Frame size and interval, for video-info format blocks.
    pub fn video_capability(&self) -> Option<RawCapability> {
        unsafe {
            let mt = &*self.0;
            if mt.pbFormat.is_null() {
                return None;
            }
            let size = mt.cbFormat as usize;
            if mt.formattype == FORMAT_VIDEO_INFO && size >= std::mem::size_of::<VIDEOINFOHEADER>() {
                let vih = &*(mt.pbFormat as *const VIDEOINFOHEADER);
                Some(RawCapability {
                    width: vih.bmiHeader.biWidth,
                    height: vih.bmiHeader.biHeight,
                    avg_time_per_frame: vih.AvgTimePerFrame,
                })
            } else if mt.formattype == FORMAT_VIDEO_INFO2 && size >= std::mem::size_of::<VIDEOINFOHEADER2>() {
                let vih = &*(mt.pbFormat as *const VIDEOINFOHEADER2);
                Some(RawCapability {
                    width: vih.bmiHeader.biWidth,
                    height: vih.bmiHeader.biHeight,
                    avg_time_per_frame: vih.AvgTimePerFrame,
                })
            } else {
                None
            }
        }
    }
}

impl Drop for MediaType {
    fn drop(&mut self) {
        unsafe {
            let mt = &mut *self.0;
            if mt.cbFormat != 0 && !mt.pbFormat.is_null() {
                CoTaskMemFree(Some(mt.pbFormat as *const _));
            }
            ManuallyDrop::drop(&mut mt.pUnk);
            CoTaskMemFree(Some(self.0 as *const _));
        }
    }
}
