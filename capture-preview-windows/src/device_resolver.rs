//! Capture device lookup through the system device enumerator.
//!
//! Devices are identified by their `DevicePath` property, compared
//! case-insensitively. The device path is stable across reboots, unlike the
//! enumeration order or the friendly name.

use std::ffi::c_void;

use windows::core::{Interface, BSTR, GUID, VARIANT};
use windows::Win32::System::Com::StructuredStorage::IPropertyBag;
use windows::Win32::System::Com::{CoCreateInstance, IEnumMoniker, IMoniker, CLSCTX_INPROC_SERVER};
use windows::Win32::Media::DirectShow::ICreateDevEnum;

use capture_preview_core::models::device::{DeviceCategory, DeviceIdentity};
use capture_preview_core::models::error::NativeResult;

use crate::com::com_error;
use crate::guids::{CLSID_AUDIO_INPUT_DEVICE_CATEGORY, CLSID_SYSTEM_DEVICE_ENUM, CLSID_VIDEO_INPUT_DEVICE_CATEGORY};

pub struct DeviceResolver {
    enumerator: ICreateDevEnum,
}

impl DeviceResolver {
    /// Requires COM to be initialized on the calling thread.
    pub fn new() -> NativeResult<Self> {
        unsafe {
            let enumerator: ICreateDevEnum = CoCreateInstance(&CLSID_SYSTEM_DEVICE_ENUM, None, CLSCTX_INPROC_SERVER)
                .map_err(|e| com_error("CoCreateInstance(SystemDeviceEnum)", e))?;
            Ok(Self { enumerator })
        }
    }

    /// Find the moniker of the device whose path matches `identity`.
    pub fn resolve(&self, category: DeviceCategory, identity: &DeviceIdentity) -> NativeResult<Option<IMoniker>> {
        for moniker in self.monikers(category)? {
            if let Some(path) = read_property(&moniker, "DevicePath") {
                if identity.matches(&path) {
                    return Ok(Some(moniker));
                }
            }
        }
        Ok(None)
    }

    fn monikers(&self, category: DeviceCategory) -> NativeResult<Vec<IMoniker>> {
        let class: &GUID = match category {
            DeviceCategory::Video => &CLSID_VIDEO_INPUT_DEVICE_CATEGORY,
            DeviceCategory::Audio => &CLSID_AUDIO_INPUT_DEVICE_CATEGORY,
        };

        unsafe {
            let mut enum_moniker: Option<IEnumMoniker> = None;
            self.enumerator
                .CreateClassEnumerator(class, &mut enum_moniker, 0)
                .map_err(|e| com_error("CreateClassEnumerator", e))?;

            // S_FALSE with no enumerator: the category is empty.
            let Some(enum_moniker) = enum_moniker else {
                return Ok(Vec::new());
            };

            let mut monikers = Vec::new();
            loop {
                let mut slot: [Option<IMoniker>; 1] = [None];
                let mut fetched = 0u32;
                if enum_moniker.Next(&mut slot, Some(&mut fetched)).is_err() || fetched == 0 {
                    break;
                }
                if let Some(moniker) = slot[0].take() {
                    monikers.push(moniker);
                }
            }
            Ok(monikers)
        }
    }
}

/// Read a string property from a device moniker's property bag.
fn read_property(moniker: &IMoniker, name: &str) -> Option<String> {
    unsafe {
        let mut bag: Option<IPropertyBag> = None;
        moniker
            .BindToStorage(
                None,
                None,
                &IPropertyBag::IID,
                &mut bag as *mut _ as *mut *mut c_void,
            )
            .ok()?;
        let bag = bag?;

        let wide: Vec<u16> = name.encode_utf16().chain(std::iter::once(0)).collect();
        let mut value = VARIANT::default();
        bag.Read(windows::core::PCWSTR(wide.as_ptr()), &mut value, None).ok()?;
        let text = BSTR::try_from(&value).ok()?.to_string();
        (!text.is_empty()).then_some(text)
    }
}
