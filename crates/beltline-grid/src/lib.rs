//! Spatial primitives for the Beltline simulation: grid coordinates, machine
//! footprints, the sparse item layer, and the machine occupancy index.
//!
//! The grid is unbounded in both axes. Both the item layer ([`SparseGrid`])
//! and the occupancy index ([`SpatialIndex`]) are backed by `BTreeMap`, so
//! iteration always runs in ascending coordinate order. The tick engine
//! leans on that ordering for deterministic machine evaluation.

use serde::{Deserialize, Serialize};
use slotmap::{Key, SecondaryMap};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Coord
// ---------------------------------------------------------------------------

/// A position (or relative offset) on the 2D grid.
///
/// Ordering is lexicographic on `(x, y)`, which fixes the iteration order of
/// every `BTreeMap<Coord, _>` in the workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Coord {
    pub x: i32,
    pub y: i32,
}

impl Coord {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Translate this position by a relative offset.
    pub fn offset(self, delta: Coord) -> Coord {
        Coord::new(self.x + delta.x, self.y + delta.y)
    }

    /// Manhattan distance to another position.
    pub fn manhattan_distance(&self, other: &Coord) -> u32 {
        (self.x - other.x).unsigned_abs() + (self.y - other.y).unsigned_abs()
    }
}

// ---------------------------------------------------------------------------
// Footprint
// ---------------------------------------------------------------------------

/// The rectangular area a machine occupies on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Footprint {
    pub width: u32,
    pub height: u32,
}

impl Footprint {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A 1x1 footprint (every conveyor).
    pub fn single() -> Self {
        Self {
            width: 1,
            height: 1,
        }
    }

    /// Iterate over all tiles occupied by this footprint, row-major, with the
    /// anchor at the top-left corner.
    pub fn tiles(&self, anchor: Coord) -> impl Iterator<Item = Coord> {
        let w = self.width as i32;
        let h = self.height as i32;
        let ax = anchor.x;
        let ay = anchor.y;
        (0..h).flat_map(move |dy| (0..w).map(move |dx| Coord::new(ax + dx, ay + dy)))
    }

    /// True when a relative offset falls inside the rectangle.
    pub fn contains_offset(&self, offset: Coord) -> bool {
        offset.x >= 0
            && offset.y >= 0
            && (offset.x as i64) < self.width as i64
            && (offset.y as i64) < self.height as i64
    }

    /// True when a relative offset falls inside the rectangle or in the
    /// one-cell ring around it. Port offsets must satisfy this: anything
    /// further out can never resolve to an adjacent cell.
    pub fn touches(&self, offset: Coord) -> bool {
        (offset.x as i64) >= -1
            && (offset.y as i64) >= -1
            && (offset.x as i64) <= self.width as i64
            && (offset.y as i64) <= self.height as i64
    }
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors from occupancy-index operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("tile {0:?} is already occupied")]
    Occupied(Coord),
    #[error("machine is already placed on the grid")]
    AlreadyPlaced,
    #[error("machine is not placed on the grid")]
    NotPlaced,
}

// ---------------------------------------------------------------------------
// SparseGrid
// ---------------------------------------------------------------------------

/// A true sparse map from grid coordinates to values: the item layer.
///
/// Supports arbitrarily negative and positive coordinates with no
/// pre-allocation. `keys()` yields populated coordinates in ascending order,
/// stable for as long as the grid is not mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseGrid<T> {
    cells: BTreeMap<Coord, T>,
}

impl<T> Default for SparseGrid<T> {
    fn default() -> Self {
        Self {
            cells: BTreeMap::new(),
        }
    }
}

impl<T> SparseGrid<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up the value at a cell.
    pub fn get(&self, coord: Coord) -> Option<&T> {
        self.cells.get(&coord)
    }

    /// Assign a cell. `None` clears it. Returns the displaced value, if any.
    pub fn set(&mut self, coord: Coord, value: Option<T>) -> Option<T> {
        match value {
            Some(v) => self.cells.insert(coord, v),
            None => self.cells.remove(&coord),
        }
    }

    /// Put a value into a cell. Returns the displaced value, if any.
    pub fn insert(&mut self, coord: Coord, value: T) -> Option<T> {
        self.cells.insert(coord, value)
    }

    /// Remove and return the value at a cell.
    pub fn take(&mut self, coord: Coord) -> Option<T> {
        self.cells.remove(&coord)
    }

    pub fn contains(&self, coord: Coord) -> bool {
        self.cells.contains_key(&coord)
    }

    /// Populated coordinates, ascending.
    pub fn keys(&self) -> impl Iterator<Item = Coord> + '_ {
        self.cells.keys().copied()
    }

    /// Populated cells and their values, in ascending coordinate order.
    pub fn iter(&self) -> impl Iterator<Item = (Coord, &T)> {
        self.cells.iter().map(|(&c, v)| (c, v))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

// ---------------------------------------------------------------------------
// SpatialIndex
// ---------------------------------------------------------------------------

/// Occupancy index mapping grid tiles to machines, generic over the slotmap
/// key used by the owning engine.
///
/// Maintains three views:
/// - `tiles`: every occupied tile -> key
/// - `anchors`: anchor tile -> key, ascending (the engine's evaluation order)
/// - `origins` / `footprints`: key -> placement data
#[derive(Debug)]
pub struct SpatialIndex<K: Key> {
    tiles: BTreeMap<Coord, K>,
    anchors: BTreeMap<Coord, K>,
    origins: SecondaryMap<K, Coord>,
    footprints: SecondaryMap<K, Footprint>,
}

impl<K: Key> Default for SpatialIndex<K> {
    fn default() -> Self {
        Self {
            tiles: BTreeMap::new(),
            anchors: BTreeMap::new(),
            origins: SecondaryMap::new(),
            footprints: SecondaryMap::new(),
        }
    }
}

impl<K: Key> SpatialIndex<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim every tile of `footprint` at `anchor` for `key`.
    pub fn place(&mut self, key: K, anchor: Coord, footprint: Footprint) -> Result<(), GridError> {
        if self.origins.contains_key(key) {
            return Err(GridError::AlreadyPlaced);
        }
        for tile in footprint.tiles(anchor) {
            if self.tiles.contains_key(&tile) {
                return Err(GridError::Occupied(tile));
            }
        }

        for tile in footprint.tiles(anchor) {
            self.tiles.insert(tile, key);
        }
        self.anchors.insert(anchor, key);
        self.origins.insert(key, anchor);
        self.footprints.insert(key, footprint);
        Ok(())
    }

    /// Release a machine's tiles. Returns its anchor.
    pub fn remove(&mut self, key: K) -> Result<Coord, GridError> {
        let anchor = *self.origins.get(key).ok_or(GridError::NotPlaced)?;
        let footprint = *self.footprints.get(key).ok_or(GridError::NotPlaced)?;

        for tile in footprint.tiles(anchor) {
            self.tiles.remove(&tile);
        }
        self.anchors.remove(&anchor);
        self.origins.remove(key);
        self.footprints.remove(key);
        Ok(anchor)
    }

    /// Check whether a footprint would fit at `anchor` without overlap.
    pub fn can_place(&self, anchor: Coord, footprint: Footprint) -> bool {
        footprint
            .tiles(anchor)
            .all(|tile| !self.tiles.contains_key(&tile))
    }

    /// The machine occupying a tile, if any.
    pub fn key_at(&self, coord: Coord) -> Option<K> {
        self.tiles.get(&coord).copied()
    }

    pub fn anchor_of(&self, key: K) -> Option<Coord> {
        self.origins.get(key).copied()
    }

    pub fn footprint_of(&self, key: K) -> Option<Footprint> {
        self.footprints.get(key).copied()
    }

    /// All placed machines in ascending anchor order.
    pub fn anchors(&self) -> impl Iterator<Item = (Coord, K)> + '_ {
        self.anchors.iter().map(|(&c, &k)| (c, k))
    }

    /// Number of placed machines.
    pub fn len(&self) -> usize {
        self.origins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.origins.is_empty()
    }

    /// Total number of occupied tiles.
    pub fn tile_count(&self) -> usize {
        self.tiles.len()
    }
}
