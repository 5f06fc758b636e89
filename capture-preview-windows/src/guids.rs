use windows::core::GUID;

pub const CLSID_FILTER_GRAPH: GUID = GUID::from_u128(0xe436ebb3_524f_11ce_9f53_0020af0ba770);
pub const CLSID_CAPTURE_GRAPH_BUILDER2: GUID = GUID::from_u128(0xbf87b6e1_8c27_11d0_b3f0_00aa003761c5);
pub const CLSID_SYSTEM_DEVICE_ENUM: GUID = GUID::from_u128(0x62be5d10_60eb_11d0_bd3b_00a0c911ce86);
pub const CLSID_VIDEO_MIXING_RENDERER9: GUID = GUID::from_u128(0x51b4abf3_748f_4e3b_a276_c828330e926a);

// Device categories
pub const CLSID_VIDEO_INPUT_DEVICE_CATEGORY: GUID = GUID::from_u128(0x860bb310_5d01_11d0_bd3b_00a0c911ce86);
pub const CLSID_AUDIO_INPUT_DEVICE_CATEGORY: GUID = GUID::from_u128(0x33d9a762_90c8_11d0_bd43_00a0c911ce86);

// Pin categories
pub const PIN_CATEGORY_CAPTURE: GUID = GUID::from_u128(0xfb6c4281_0353_11d1_905f_0000c0cc16ba);
pub const PIN_CATEGORY_PREVIEW: GUID = GUID::from_u128(0xfb6c4282_0353_11d1_905f_0000c0cc16ba);

pub const MEDIATYPE_VIDEO: GUID = GUID::from_u128(0x73646976_0000_0010_8000_00aa00389b71);
pub const MEDIATYPE_AUDIO: GUID = GUID::from_u128(0x73647561_0000_0010_8000_00aa00389b71);

pub const FORMAT_VIDEO_INFO: GUID = GUID::from_u128(0x05589f80_c356_11ce_bf01_00aa0055595a);
pub const FORMAT_VIDEO_INFO2: GUID = GUID::from_u128(0xf72a76a0_eb0a_11d0_ace4_0000c0cc16ba);
