use serde::{Deserialize, Serialize};

/// Destination region in the pixel space of the caller's output surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct DestinationRect {
    pub left: i32,
    pub top: i32,
    pub right: i32,
    pub bottom: i32,
}

impl DestinationRect {
    /// Placeholder region used before the caller has supplied one.
    pub const UNIT: Self = Self {
        left: 0,
        top: 0,
        right: 1,
        bottom: 1,
    };

    pub fn new(left: i32, top: i32, right: i32, bottom: i32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Region covering a whole client area of the given size.
    pub fn from_size(width: i32, height: i32) -> Self {
        Self::new(0, 0, width, height)
    }

    pub fn width(&self) -> i32 {
        self.right - self.left
    }

    pub fn height(&self) -> i32 {
        self.bottom - self.top
    }
}

/// Opaque native window/surface handle owned by the presentation layer.
///
/// The pipeline only renders into it; it never creates or destroys it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SurfaceHandle(pub isize);

impl SurfaceHandle {
    pub fn raw(&self) -> isize {
        self.0
    }
}

/// Corner of the output surface where the stats readout is anchored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StatsCorner {
    #[default]
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl StatsCorner {
    pub const MARGIN: i32 = 8;

    /// Origin of a `label_width` x `label_height` label anchored at this corner
    /// of a `surface_width` x `surface_height` client area.
    pub fn place(
        &self,
        surface_width: i32,
        surface_height: i32,
        label_width: i32,
        label_height: i32,
    ) -> (i32, i32) {
        let m = Self::MARGIN;
        let right = (surface_width - label_width - m).max(m);
        let bottom = (surface_height - label_height - m).max(m);
        match self {
            Self::TopLeft => (m, m),
            Self::TopRight => (right, m),
            Self::BottomLeft => (m, bottom),
            Self::BottomRight => (right, bottom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_dimensions() {
        let rect = DestinationRect::new(10, 20, 650, 500);
        assert_eq!(rect.width(), 640);
        assert_eq!(rect.height(), 480);
        assert_eq!(DestinationRect::from_size(800, 600), DestinationRect::new(0, 0, 800, 600));
    }

    #[test]
    fn corner_placement_respects_margin() {
        assert_eq!(StatsCorner::TopLeft.place(1920, 1080, 200, 20), (8, 8));
        assert_eq!(StatsCorner::TopRight.place(1920, 1080, 200, 20), (1712, 8));
        assert_eq!(StatsCorner::BottomLeft.place(1920, 1080, 200, 20), (8, 1052));
        assert_eq!(StatsCorner::BottomRight.place(1920, 1080, 200, 20), (1712, 1052));
        // A label wider than the surface is clamped to the margin.
        assert_eq!(StatsCorner::BottomRight.place(100, 10, 200, 20), (8, 8));
    }
}
