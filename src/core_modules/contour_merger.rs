// THEORY:
// The `ContourMerger` is the concurrency core of the engine. It turns a cleaned
// binary motion mask into contours: maximal sets of 8-connected foreground pixels.
//
// Algorithm:
// 1.  **Row Fan-Out**: The mask is split into one scan task per row, run on a rayon
//     pool sized to the available hardware. Rows are not ordered relative to
//     one another.
// 2.  **Per-Pixel Critical Section**: Each task walks its row left to right. For every
//     foreground pixel it takes the single arena lock, looks up which live contours
//     own any of the 8 neighbors (possibly in rows another task is scanning right
//     now), and applies exactly one of three mutations:
//       - no adjacent contour   -> allocate a new contour holding just this pixel;
//       - one adjacent contour  -> append the pixel to it;
//       - several               -> allocate one union contour of all of them plus the
//                                  pixel, relabel, and retire the originals.
//     The guard is dropped at the end of the pixel, on every path.
// 3.  **Determinism**: Because lookup and mutation happen under one lock, no two tasks
//     can both decide to create a contour for the same blob or miss a merge. The final
//     partition of foreground pixels is the same for any interleaving; only the
//     insertion order inside a contour varies.
//
// The shared state is an arena: contour records addressed by `ContourId`, plus a
// label grid mapping each pixel to the contour that owns it. A retired record is an
// empty slot, so handles are never reused within a scan.

use crate::core_modules::contour::{Contour, ContourId, Point};
use crate::error::{MotionError, Result};
use image::GrayImage;
use log::debug;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::{Mutex, PoisonError};

/// Offsets of the 8 neighbors: N, NE, E, SE, S, SW, W, NW.
pub const NEIGHBOR_OFFSETS: [(i64, i64); 8] = [
    (0, -1),
    (1, -1),
    (1, 0),
    (1, 1),
    (0, 1),
    (-1, 1),
    (-1, 0),
    (-1, -1),
];

/// The neighbor of `point` at `offset`, if it lies inside a `width` x `height` grid.
#[inline]
pub fn neighbor(point: Point, offset: (i64, i64), width: u32, height: u32) -> Option<Point> {
    let x = point.x as i64 + offset.0;
    let y = point.y as i64 + offset.1;
    if x < 0 || y < 0 || x >= width as i64 || y >= height as i64 {
        return None;
    }
    Some(Point::new(x as u32, y as u32))
}

/// Contour records and the pixel-to-contour label grid. Only ever touched under the
/// merger's lock.
struct ContourArena {
    width: u32,
    height: u32,
    labels: Vec<Option<ContourId>>,
    records: Vec<Option<Contour>>,
}

impl ContourArena {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            labels: vec![None; width as usize * height as usize],
            records: Vec::new(),
        }
    }

    #[inline]
    fn label_index(&self, point: Point) -> usize {
        point.y as usize * self.width as usize + point.x as usize
    }

    /// Distinct live contours owning at least one neighbor of `point`.
    fn adjacent_contours(&self, point: Point) -> Vec<ContourId> {
        let mut adjacent = Vec::with_capacity(4);
        for offset in NEIGHBOR_OFFSETS {
            let Some(next) = neighbor(point, offset, self.width, self.height) else {
                continue;
            };
            if let Some(id) = self.labels[self.label_index(next)] {
                if !adjacent.contains(&id) {
                    adjacent.push(id);
                }
            }
        }
        adjacent
    }

    fn allocate(&mut self, contour: Contour) -> ContourId {
        let id = ContourId(self.records.len());
        for &point in contour.pixels() {
            let index = self.label_index(point);
            self.labels[index] = Some(id);
        }
        self.records.push(Some(contour));
        id
    }

    /// Adds one scanned foreground pixel, creating, growing or merging contours.
    fn insert(&mut self, point: Point) {
        let index = self.label_index(point);
        debug_assert!(self.labels[index].is_none(), "{point:?} scanned twice");

        match self.adjacent_contours(point).as_slice() {
            [] => {
                self.allocate(Contour::new(vec![point]));
            }
            [id] => {
                debug_assert!(self.records[id.0].is_some(), "label points at retired contour {id:?}");
                if let Some(contour) = self.records[id.0].as_mut() {
                    contour.push(point);
                    self.labels[index] = Some(*id);
                }
            }
            many => {
                // The largest record's buffer becomes the union.
                let mut retired: Vec<Contour> = many
                    .iter()
                    .filter_map(|id| self.records[id.0].take())
                    .collect();
                debug_assert_eq!(retired.len(), many.len(), "label points at a retired contour");
                retired.sort_by_key(|c| std::cmp::Reverse(c.len()));

                let mut retired = retired.into_iter();
                let mut union = retired.next().map(Contour::into_pixels).unwrap_or_default();
                for contour in retired {
                    union.extend(contour.into_pixels());
                }
                union.push(point);
                self.allocate(Contour::new(union));
            }
        }
    }

    fn live_contours(self) -> Vec<Contour> {
        self.records.into_iter().flatten().collect()
    }
}

/// Extracts 8-connected contours from a motion mask using parallel row scans.
pub struct ContourMerger {
    min_pixel_count: usize,
    pool: ThreadPool,
}

impl ContourMerger {
    /// A merger using one worker per available CPU.
    pub fn new(min_pixel_count: usize) -> Result<Self> {
        Self::with_workers(min_pixel_count, num_cpus::get())
    }

    /// A merger with an explicit number of row-scan workers.
    pub fn with_workers(min_pixel_count: usize, workers: usize) -> Result<Self> {
        if workers == 0 {
            return Err(MotionError::InvalidConfig("the contour merger needs at least one worker".into()));
        }
        let pool = ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|index| format!("contour-row-{index}"))
            .build()?;
        Ok(Self { min_pixel_count, pool })
    }

    pub fn min_pixel_count(&self) -> usize {
        self.min_pixel_count
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Every contour in `mask`, before size filtering.
    pub fn scan(&self, mask: &GrayImage) -> Vec<Contour> {
        let (width, height) = mask.dimensions();
        let arena = Mutex::new(ContourArena::new(width, height));

        self.pool.install(|| {
            (0..height).into_par_iter().for_each(|y| scan_row(mask, y, &arena));
        });

        // A panic inside `insert` would have propagated out of `install` already.
        arena
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
            .live_contours()
    }

    /// Contours with at least `min_pixel_count` pixels.
    pub fn find_contours(&self, mask: &GrayImage) -> Vec<Contour> {
        let contours = self.scan(mask);
        let total = contours.len();
        let kept: Vec<Contour> = contours
            .into_iter()
            .filter(|c| c.len() >= self.min_pixel_count)
            .collect();
        debug!(
            "contour merger: {} contours, {} with at least {} pixels",
            total,
            kept.len(),
            self.min_pixel_count
        );
        kept
    }
}

/// Scans one row, taking the arena lock once per foreground pixel.
fn scan_row(mask: &GrayImage, y: u32, arena: &Mutex<ContourArena>) {
    for x in 0..mask.width() {
        if mask.get_pixel(x, y).0[0] == 0 {
            continue;
        }
        let mut guard = arena.lock().unwrap_or_else(PoisonError::into_inner);
        guard.insert(Point::new(x, y));
    }
}
