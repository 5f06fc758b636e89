//! Video format enumeration and selection.
//!
//! Listing is advisory: it builds a throwaway graph around the device, reads
//! its capabilities and releases everything again. Any failure yields an
//! empty list, never an error.

use crate::models::device::{DeviceCategory, DeviceIdentity};
use crate::models::error::NativeResult;
use crate::models::format::{FormatPreference, RawCapability, VideoFormat};
use crate::pipeline::owned::Owned;
use crate::traits::media_backend::MediaBackend;

/// Supported formats of a video device, deduplicated and in display order.
///
/// Computed fresh on every call.
pub fn list_formats<B: MediaBackend>(backend: &mut B, device: &DeviceIdentity) -> Vec<VideoFormat> {
    match query_capabilities(backend, device) {
        Ok(Some(raw)) => normalize_capabilities(&raw),
        Ok(None) => {
            log::debug!("format listing: video device {} not found", device);
            Vec::new()
        }
        Err(e) => {
            log::debug!("format listing for {} failed: {}", device, e);
            Vec::new()
        }
    }
}

fn query_capabilities<B: MediaBackend>(
    backend: &mut B,
    device: &DeviceIdentity,
) -> NativeResult<Option<Vec<RawCapability>>> {
    // Locals drop in reverse order: source, builder, graph.
    let graph = Owned::new("catalog graph", backend.create_graph()?);
    let builder = Owned::new("catalog graph builder", backend.create_graph_builder(graph.get())?);
    let Some(resolved) = backend.resolve_device(DeviceCategory::Video, device)? else {
        return Ok(None);
    };
    let source = Owned::new("catalog source", backend.add_source(graph.get(), &resolved)?);
    let capabilities = backend.stream_capabilities(builder.get(), source.get())?;
    Ok(Some(capabilities))
}

/// Drop unusable entries and exact duplicates (first kept), then sort by
/// area descending and frame rate descending.
pub fn normalize_capabilities(raw: &[RawCapability]) -> Vec<VideoFormat> {
    let mut formats: Vec<VideoFormat> = Vec::with_capacity(raw.len());
    for format in raw.iter().filter_map(RawCapability::to_format) {
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    // Stable sort keeps first-seen order among equal keys.
    formats.sort_by(VideoFormat::display_order);
    formats
}

/// Choose the candidate that best matches `preference`.
///
/// Returns `None` for the Auto policy and when no candidate has exactly the
/// preferred resolution. Among exact matches, a positive preferred rate picks
/// the nearest frame rate, otherwise the highest one. Ties keep the candidate
/// seen first.
pub fn select_format(candidates: &[VideoFormat], preference: &FormatPreference) -> Option<VideoFormat> {
    if preference.is_auto() {
        return None;
    }
    // Non-auto preferences have positive dimensions.
    let width = preference.width as u32;
    let height = preference.height as u32;

    let score = |format: &VideoFormat| {
        if preference.fps > 0.0 {
            -(format.fps - preference.fps).abs()
        } else {
            format.fps
        }
    };

    let mut best: Option<(VideoFormat, f64)> = None;
    for candidate in candidates.iter().filter(|f| f.same_resolution(width, height)) {
        let s = score(candidate);
        if best.map_or(true, |(_, best_score)| s > best_score) {
            best = Some((*candidate, s));
        }
    }
    best.map(|(format, _)| format)
}
