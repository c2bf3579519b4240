// THEORY:
// The `FrameDifferencer` is the temporal layer of the engine. Edge maps by
// themselves say where structure is; comparing edge maps across time says where
// structure *moved*. It keeps a bounded sliding window of the most recent edge maps
// and compares the oldest against the newest, so motion accumulates over the
// window instead of being limited to a single frame step.
//
// Key architectural principles:
// 1.  **Ownership Transfer**: Edge maps are moved into the window. Once pushed, the
//     frame that produced a map no longer has access to it.
// 2.  **Selectable Policy**: `ExactMatch` marks any change at all (the right choice
//     for binary edge maps); `MagnitudeAverage` keeps the size of the change.
// 3.  **Fatal Preconditions**: Edge maps of different sizes cannot be compared. A
//     mismatch is returned as `DimensionMismatch` before the window is touched, and
//     callers are expected to stop processing rather than retry.

use crate::core_modules::pixel_grid::EdgeMap;
use crate::error::{MotionError, Result};
use image::{GrayImage, Luma};
use log::debug;
use std::collections::VecDeque;

/// Value of a foreground pixel in a motion mask.
pub const FOREGROUND: u8 = 255;

/// Default number of edge maps kept in the window.
pub const DEFAULT_WINDOW_SIZE: usize = 4;

/// How two edge maps are turned into a motion mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DiffPolicy {
    /// Foreground wherever the two values differ at all.
    #[default]
    ExactMatch,
    /// The averaged absolute per-channel difference, as a single intensity.
    MagnitudeAverage,
}

/// Compares each new edge map against the oldest one in a sliding window.
#[derive(Debug)]
pub struct FrameDifferencer {
    window: VecDeque<EdgeMap>,
    window_size: usize,
    policy: DiffPolicy,
}

impl FrameDifferencer {
    pub fn new(window_size: usize, policy: DiffPolicy) -> Result<Self> {
        if window_size < 2 {
            return Err(MotionError::InvalidConfig(format!(
                "diff_frame_window_size must be at least 2, got {window_size}"
            )));
        }
        Ok(Self {
            window: VecDeque::with_capacity(window_size),
            window_size,
            policy,
        })
    }

    pub fn policy(&self) -> DiffPolicy {
        self.policy
    }

    /// Number of edge maps currently buffered.
    pub fn len(&self) -> usize {
        self.window.len()
    }

    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }

    /// Adds `edge_map` to the window and returns the motion mask between the oldest
    /// and the newest buffered map. The first map is compared with itself.
    pub fn push(&mut self, edge_map: EdgeMap) -> Result<GrayImage> {
        match self.window.front() {
            Some(oldest) => check_dimensions(oldest, &edge_map)?,
            None => debug!(
                "frame differencer primed with a {}x{} edge map",
                edge_map.width(),
                edge_map.height()
            ),
        }

        if self.window.len() == self.window_size {
            self.window.pop_front();
        }
        let mask = match self.window.front() {
            Some(oldest) => difference(oldest, &edge_map, self.policy)?,
            None => difference(&edge_map, &edge_map, self.policy)?,
        };
        self.window.push_back(edge_map);

        Ok(mask)
    }

    /// Drops every buffered edge map.
    pub fn reset(&mut self) {
        self.window.clear();
    }
}

/// Compares two edge maps of identical dimensions under `policy`.
pub fn difference(oldest: &EdgeMap, newest: &EdgeMap, policy: DiffPolicy) -> Result<GrayImage> {
    check_dimensions(oldest, newest)?;

    let mask = GrayImage::from_fn(newest.width(), newest.height(), |x, y| {
        let (before, after) = (oldest.get(x, y), newest.get(x, y));
        let value = match policy {
            DiffPolicy::ExactMatch => {
                if before == after { 0 } else { FOREGROUND }
            }
            DiffPolicy::MagnitudeAverage => {
                // One intensity channel stands in for all three color channels.
                let per_channel = (before - after).abs();
                ((per_channel * 3) / 3).clamp(0, 255) as u8
            }
        };
        Luma([value])
    });
    Ok(mask)
}

fn check_dimensions(expected: &EdgeMap, found: &EdgeMap) -> Result<()> {
    if expected.dimensions() != found.dimensions() {
        return Err(MotionError::DimensionMismatch {
            expected_width: expected.width(),
            expected_height: expected.height(),
            found_width: found.width(),
            found_height: found.height(),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::pixel_grid::PixelGrid;

    fn map_with_edge_at(x: u32, y: u32) -> EdgeMap {
        let mut map = PixelGrid::new(6, 5);
        map.set(x, y, 255);
        map
    }

    #[test]
    fn identical_maps_give_an_empty_mask() {
        let map = map_with_edge_at(2, 2);
        for policy in [DiffPolicy::ExactMatch, DiffPolicy::MagnitudeAverage] {
            let mask = difference(&map, &map.clone(), policy).expect("same size");
            assert!(mask.as_raw().iter().all(|&v| v == 0));
        }
    }

    #[test]
    fn exact_match_marks_any_difference_as_foreground() {
        let before = PixelGrid::filled(3, 1, 10);
        let after = PixelGrid::from_vec(3, 1, vec![10, 11, 200]).expect("valid grid");
        let mask = difference(&before, &after, DiffPolicy::ExactMatch).expect("same size");
        assert_eq!(mask.as_raw(), &vec![0, FOREGROUND, FOREGROUND]);
    }

    #[test]
    fn magnitude_average_keeps_the_size_of_the_change() {
        let before = PixelGrid::filled(3, 1, 10);
        let after = PixelGrid::from_vec(3, 1, vec![10, 11, 200]).expect("valid grid");
        let mask = difference(&before, &after, DiffPolicy::MagnitudeAverage).expect("same size");
        assert_eq!(mask.as_raw(), &vec![0, 1, 190]);
    }

    #[test]
    fn first_frame_is_compared_with_itself() {
        let mut differ = FrameDifferencer::new(4, DiffPolicy::ExactMatch).expect("valid window");
        let mask = differ.push(map_with_edge_at(1, 1)).expect("same size");
        assert!(mask.as_raw().iter().all(|&v| v == 0));
        assert_eq!(differ.len(), 1);
    }

    #[test]
    fn compares_oldest_against_newest_in_the_window() {
        let mut differ = FrameDifferencer::new(3, DiffPolicy::ExactMatch).expect("valid window");
        differ.push(map_with_edge_at(0, 0)).expect("same size");
        differ.push(map_with_edge_at(1, 0)).expect("same size");

        // Window [a, b, c]: oldest a has its edge at (0, 0).
        let mask = differ.push(map_with_edge_at(2, 0)).expect("same size");
        assert_eq!(mask.get_pixel(0, 0).0, [FOREGROUND]);
        assert_eq!(mask.get_pixel(1, 0).0, [0]);
        assert_eq!(mask.get_pixel(2, 0).0, [FOREGROUND]);

        // Window slides to [b, c, d]: (0, 0) no longer differs.
        let mask = differ.push(map_with_edge_at(3, 0)).expect("same size");
        assert_eq!(differ.len(), 3);
        assert_eq!(mask.get_pixel(0, 0).0, [0]);
        assert_eq!(mask.get_pixel(1, 0).0, [FOREGROUND]);
        assert_eq!(mask.get_pixel(3, 0).0, [FOREGROUND]);
    }

    #[test]
    fn dimension_mismatch_is_fatal_and_leaves_the_window_alone() {
        let mut differ = FrameDifferencer::new(4, DiffPolicy::ExactMatch).expect("valid window");
        differ.push(PixelGrid::new(6, 5)).expect("first map");

        let err = differ.push(PixelGrid::new(5, 6)).expect_err("sizes differ");
        assert!(matches!(
            err,
            MotionError::DimensionMismatch { expected_width: 6, found_width: 5, .. }
        ));
        assert_eq!(differ.len(), 1);
    }

    #[test]
    fn window_must_hold_two_maps() {
        assert!(FrameDifferencer::new(1, DiffPolicy::ExactMatch).is_err());
        assert!(FrameDifferencer::new(2, DiffPolicy::ExactMatch).is_ok());
    }
}
