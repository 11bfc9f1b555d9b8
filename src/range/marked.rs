//! Marked ranges
//!
//! A marked range is the screen-space projection of a selection segment
//! onto one rendered line: a start point, an end point, and the owning
//! range's flags. Marked ranges are created per visible line while a frame
//! is rendered and discarded with it; they are never persisted.

use serde::{Deserialize, Serialize};

use crate::geom::{MoveDirection, Point, Rect};

/// Flag values below this use the legacy line-band intersection
pub const RANGE_FLAGS_ENHANCED: u32 = 0x10;

/// One rendered-line segment of a selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkedRange {
    pub start: Point,
    pub end: Point,
    pub flags: u32,
}

impl MarkedRange {
    pub fn new(start: Point, end: Point, flags: u32) -> Self {
        MarkedRange { start, end, flags }
    }

    pub fn is_empty(&self) -> bool {
        self.start.y > self.end.y || (self.start.y == self.end.y && self.start.x >= self.end.x)
    }

    fn legacy(&self) -> bool {
        self.flags < RANGE_FLAGS_ENHANCED
    }

    /// Intersection with a rendered line rectangle.
    ///
    /// Legacy mode assumes every line spans the full paragraph width left
    /// to right: a line is intersected whenever its vertical band overlaps
    /// the range's, and the horizontal bound is clipped only on the
    /// first/last line of the range. Deliberately wrong for right-to-left
    /// or floated layouts; callers opt in via the flags. Enhanced mode is
    /// an exact rectangle intersection.
    pub fn intersects(&self, line: &Rect) -> Option<Rect> {
        if self.legacy() {
            if self.start.y >= line.bottom || self.end.y < line.top {
                return None;
            }
            let mut clipped = *line;
            if self.start.y >= line.top && self.start.y < line.bottom {
                clipped.left = clipped.left.max(self.start.x);
            }
            if self.end.y >= line.top && self.end.y < line.bottom {
                clipped.right = clipped.right.min(self.end.x);
            }
            if clipped.is_empty() {
                return None;
            }
            return Some(clipped);
        }
        let range_rect = Rect::new(self.start.x, self.start.y, self.end.x, self.end.y);
        line.intersection(&range_rect)
    }

    /// Midpoint when both points share a line, the start point otherwise
    pub fn middle_point(&self) -> Point {
        if self.start.y == self.end.y {
            return Point::new((self.start.x + self.end.x) / 2, self.start.y);
        }
        self.start
    }

    /// Direction-weighted distance from a screen point to this range's
    /// middle. Vertical motion weighs vertical distance 100x so the nearest
    /// candidate on the correct line wins even when horizontally far.
    pub fn calc_distance(&self, x: i32, y: i32, dir: MoveDirection) -> i32 {
        let middle = self.middle_point();
        let dx = (middle.x - x).abs();
        let dy = (middle.y - y).abs();
        match dir {
            MoveDirection::Any | MoveDirection::Left | MoveDirection::Right => dx + dy,
            MoveDirection::Up | MoveDirection::Down => dx + dy * 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy_range(start: (i32, i32), end: (i32, i32)) -> MarkedRange {
        MarkedRange::new(Point::new(start.0, start.1), Point::new(end.0, end.1), 0)
    }

    fn enhanced_range(start: (i32, i32), end: (i32, i32)) -> MarkedRange {
        MarkedRange::new(
            Point::new(start.0, start.1),
            Point::new(end.0, end.1),
            RANGE_FLAGS_ENHANCED,
        )
    }

    #[test]
    fn test_legacy_middle_line_full_width() {
        // range spans y=100 to y=300; the line at y=150..170 lies strictly
        // between, so the whole line width is reported regardless of the
        // range's horizontal bounds
        let r = legacy_range((500, 100), (20, 300));
        let line = Rect::new(0, 150, 640, 170);
        assert_eq!(r.intersects(&line), Some(line));
    }

    #[test]
    fn test_legacy_first_line_clips_left() {
        let r = legacy_range((200, 100), (400, 300));
        let line = Rect::new(0, 95, 640, 115);
        let hit = r.intersects(&line).unwrap();
        assert_eq!(hit.left, 200);
        assert_eq!(hit.right, 640);
    }

    #[test]
    fn test_legacy_last_line_clips_right() {
        let r = legacy_range((200, 100), (400, 300));
        let line = Rect::new(0, 295, 640, 315);
        let hit = r.intersects(&line).unwrap();
        assert_eq!(hit.left, 0);
        assert_eq!(hit.right, 400);
    }

    #[test]
    fn test_legacy_outside_band_misses() {
        let r = legacy_range((0, 100), (100, 300));
        assert_eq!(r.intersects(&Rect::new(0, 0, 640, 90)), None);
        assert_eq!(r.intersects(&Rect::new(0, 320, 640, 340)), None);
    }

    #[test]
    fn test_enhanced_exact_intersection() {
        let r = enhanced_range((100, 100), (300, 200));
        let line = Rect::new(0, 150, 640, 170);
        assert_eq!(r.intersects(&line), Some(Rect::new(100, 150, 300, 170)));
        // horizontally disjoint misses even with vertical overlap
        assert_eq!(r.intersects(&Rect::new(400, 150, 640, 170)), None);
    }

    #[test]
    fn test_middle_point_multi_line_is_start() {
        let single = legacy_range((100, 50), (200, 50));
        assert_eq!(single.middle_point(), Point::new(150, 50));
        let multi = legacy_range((100, 50), (200, 90));
        assert_eq!(multi.middle_point(), Point::new(100, 50));
    }

    #[test]
    fn test_vertical_dominant_distance() {
        let near = legacy_range((10, 100), (10, 100));
        let far = legacy_range((10, 200), (10, 200));
        let d_near = near.calc_distance(10, 90, MoveDirection::Down);
        let d_far = far.calc_distance(10, 90, MoveDirection::Down);
        assert_eq!(d_near, 1000);
        assert_eq!(d_far, 11000);
        assert!(d_near < d_far);
        // horizontal motion uses the plain sum
        assert_eq!(near.calc_distance(10, 90, MoveDirection::Right), 10);
    }
}
