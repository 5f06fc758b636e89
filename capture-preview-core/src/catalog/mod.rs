pub mod format_catalog;

pub use format_catalog::{list_formats, normalize_capabilities, select_format};
