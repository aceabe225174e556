//! Uniform-grid broadphase for proximity queries.
//!
//! The grid is a snapshot: it is cleared and refilled from world state every
//! tick and owns no entity lifecycle. Each entity is stored in every cell its
//! bounding circle touches, so a query only has to visit the cells covered by
//! its own circle and then run the exact distance test.
//!
//! The grid is the one combat structure shared between worker threads. It
//! guards its cells with a reader/writer lock: inserts and clears are
//! exclusive, queries are shared.

use ahash::{AHashMap, AHashSet};
use parking_lot::RwLock;
use riposte_common::{CombatError, CombatResult, EntityId, Vec2};
use serde::{Deserialize, Serialize};

/// Integer cell coordinate.
pub type CellCoord = (i32, i32);

/// Snapshot of one entity for broadphase purposes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialEntity {
    /// Entity id.
    pub id: EntityId,
    /// Center of the bounding circle.
    pub position: Vec2,
    /// Radius of the bounding circle (clamped to be non-negative).
    pub radius: f32,
}

impl SpatialEntity {
    /// Creates a snapshot.
    #[must_use]
    pub fn new(id: EntityId, position: Vec2, radius: f32) -> Self {
        Self {
            id,
            position,
            radius: radius.max(0.0),
        }
    }

    /// Whether this entity's circle intersects the given circle.
    #[must_use]
    pub fn intersects(&self, center: Vec2, radius: f32) -> bool {
        self.position.distance(center) <= radius + self.radius
    }
}

/// Uniform spatial grid keyed by cell coordinate.
#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: RwLock<AHashMap<CellCoord, Vec<SpatialEntity>>>,
}

impl SpatialGrid {
    /// Creates an empty grid.
    ///
    /// A cell size of roughly twice the average entity radius keeps most
    /// entities in one to four cells.
    pub fn new(cell_size: f32) -> CombatResult<Self> {
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(CombatError::InvalidCellSize(cell_size));
        }
        Ok(Self {
            cell_size,
            cells: RwLock::new(AHashMap::new()),
        })
    }

    /// Edge length of one cell.
    #[must_use]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    fn cell_of(&self, value: f32) -> i32 {
        (value / self.cell_size).floor() as i32
    }

    /// Inclusive cell range covered by a circle's bounding box.
    fn cell_range(&self, center: Vec2, radius: f32) -> (CellCoord, CellCoord) {
        let radius = radius.max(0.0);
        (
            (self.cell_of(center.x - radius), self.cell_of(center.y - radius)),
            (self.cell_of(center.x + radius), self.cell_of(center.y + radius)),
        )
    }

    fn insert_locked(
        &self,
        cells: &mut AHashMap<CellCoord, Vec<SpatialEntity>>,
        entity: SpatialEntity,
    ) {
        let ((min_x, min_y), (max_x, max_y)) = self.cell_range(entity.position, entity.radius);
        for cx in min_x..=max_x {
            for cy in min_y..=max_y {
                cells.entry((cx, cy)).or_default().push(entity);
            }
        }
    }

    /// Adds an entity to every cell its circle overlaps.
    ///
    /// Inserting the same id twice is allowed; queries de-duplicate.
    pub fn insert(&self, entity: SpatialEntity) {
        let mut cells = self.cells.write();
        self.insert_locked(&mut cells, entity);
    }

    /// Clears the grid and inserts a fresh batch under one write lock.
    pub fn rebuild(&self, entities: impl IntoIterator<Item = SpatialEntity>) {
        let mut cells = self.cells.write();
        cells.clear();
        for entity in entities {
            self.insert_locked(&mut cells, entity);
        }
    }

    /// Removes every entity.
    pub fn clear(&self) {
        self.cells.write().clear();
    }

    /// Snapshots of entities whose circle intersects the query circle.
    ///
    /// Each id appears at most once (the first stored snapshot that matches
    /// wins). Order is unspecified.
    #[must_use]
    pub fn query_entities(&self, x: f32, y: f32, radius: f32) -> Vec<SpatialEntity> {
        let center = Vec2::new(x, y);
        let radius = radius.max(0.0);
        let ((min_x, min_y), (max_x, max_y)) = self.cell_range(center, radius);

        let cells = self.cells.read();
        let mut seen = AHashSet::new();
        let mut found = Vec::new();
        let mut visit = |bucket: &[SpatialEntity]| {
            for entity in bucket {
                if !seen.contains(&entity.id) && entity.intersects(center, radius) {
                    seen.insert(entity.id);
                    found.push(*entity);
                }
            }
        };

        let span = |min: i32, max: i32| i64::from(max) - i64::from(min) + 1;
        let box_cells = span(min_x, max_x).saturating_mul(span(min_y, max_y));
        if box_cells > i64::try_from(cells.len()).unwrap_or(i64::MAX) {
            // Wide query: walk occupied cells only
            for (&(cx, cy), bucket) in cells.iter() {
                if (min_x..=max_x).contains(&cx) && (min_y..=max_y).contains(&cy) {
                    visit(bucket);
                }
            }
        } else {
            for cx in min_x..=max_x {
                for cy in min_y..=max_y {
                    if let Some(bucket) = cells.get(&(cx, cy)) {
                        visit(bucket);
                    }
                }
            }
        }
        found
    }

    /// Ids of entities whose circle intersects the query circle.
    #[must_use]
    pub fn query(&self, x: f32, y: f32, radius: f32) -> Vec<EntityId> {
        self.query_entities(x, y, radius)
            .into_iter()
            .map(|e| e.id)
            .collect()
    }

    /// Number of non-empty cells.
    #[must_use]
    pub fn occupied_cells(&self) -> usize {
        self.cells.read().values().filter(|b| !b.is_empty()).count()
    }

    /// Number of distinct ids stored.
    #[must_use]
    pub fn len(&self) -> usize {
        let cells = self.cells.read();
        cells
            .values()
            .flatten()
            .map(|e| e.id)
            .collect::<AHashSet<_>>()
            .len()
    }

    /// Whether the grid holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.read().values().all(Vec::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::Arc;

    fn id(raw: u64) -> EntityId {
        EntityId::from_raw(raw)
    }

    #[test]
    fn test_rejects_bad_cell_size() {
        assert!(matches!(
            SpatialGrid::new(0.0),
            Err(CombatError::InvalidCellSize(_))
        ));
        assert!(SpatialGrid::new(-4.0).is_err());
        assert!(SpatialGrid::new(f32::NAN).is_err());
        assert!(SpatialGrid::new(f32::INFINITY).is_err());
    }

    #[test]
    fn test_single_cell_entity() {
        let grid = SpatialGrid::new(10.0).expect("valid cell size");
        grid.insert(SpatialEntity::new(id(1), Vec2::new(5.0, 5.0), 1.0));
        assert_eq!(grid.occupied_cells(), 1);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_entity_spans_multiple_cells() {
        // Circle of radius 6 at (10, 10) covers cells 0..=1 on each axis.
        let grid = SpatialGrid::new(10.0).expect("valid cell size");
        grid.insert(SpatialEntity::new(id(1), Vec2::new(10.0, 10.0), 6.0));
        assert_eq!(grid.occupied_cells(), 4);

        let hits = grid.query(10.0, 10.0, 6.0);
        assert_eq!(hits, vec![id(1)]);
    }

    #[test]
    fn test_duplicate_insert_deduplicated() {
        let grid = SpatialGrid::new(4.0).expect("valid cell size");
        let entity = SpatialEntity::new(id(3), Vec2::new(2.0, 2.0), 3.0);
        grid.insert(entity);
        grid.insert(entity);

        assert_eq!(grid.query(2.0, 2.0, 1.0), vec![id(3)]);
        assert_eq!(grid.len(), 1);
    }

    #[test]
    fn test_query_uses_both_radii() {
        let grid = SpatialGrid::new(5.0).expect("valid cell size");
        grid.insert(SpatialEntity::new(id(1), Vec2::new(10.0, 0.0), 2.0));

        assert!(grid.query(0.0, 0.0, 7.9).is_empty());
        assert_eq!(grid.query(0.0, 0.0, 8.0), vec![id(1)]);
    }

    #[test]
    fn test_zero_radius_point_queries() {
        let grid = SpatialGrid::new(1.0).expect("valid cell size");
        grid.insert(SpatialEntity::new(id(1), Vec2::new(3.5, 3.5), 0.0));

        assert_eq!(grid.query(3.5, 3.5, 0.0), vec![id(1)]);
        assert!(grid.query(3.6, 3.5, 0.0).is_empty());
        assert_eq!(grid.query(3.6, 3.5, 0.2), vec![id(1)]);
    }

    #[test]
    fn test_huge_radius_walks_occupied_cells() {
        let grid = SpatialGrid::new(1.0).expect("valid cell size");
        grid.rebuild([
            SpatialEntity::new(id(1), Vec2::new(-900.0, 40.0), 0.5),
            SpatialEntity::new(id(2), Vec2::new(3.0, 3.0), 0.5),
        ]);

        let mut wide = grid.query(0.0, 0.0, 4000.0);
        wide.sort();
        assert_eq!(wide, vec![id(1), id(2)]);

        let mut unbounded = grid.query(0.0, 0.0, f32::INFINITY);
        unbounded.sort();
        assert_eq!(unbounded, vec![id(1), id(2)]);

        // Box still bounds the occupied-cell walk
        assert_eq!(grid.query(3.0, 3.0, 10.0), vec![id(2)]);
    }

    #[test]
    fn test_negative_coordinates() {
        let grid = SpatialGrid::new(2.0).expect("valid cell size");
        grid.insert(SpatialEntity::new(id(9), Vec2::new(-7.0, -3.0), 0.5));
        assert_eq!(grid.query(-7.0, -3.0, 0.1), vec![id(9)]);
        assert!(grid.query(7.0, 3.0, 1.0).is_empty());
    }

    #[test]
    fn test_clear_and_rebuild() {
        let grid = SpatialGrid::new(3.0).expect("valid cell size");
        grid.insert(SpatialEntity::new(id(1), Vec2::ZERO, 1.0));
        grid.clear();
        assert!(grid.is_empty());
        assert!(grid.query(0.0, 0.0, 10.0).is_empty());

        grid.rebuild([
            SpatialEntity::new(id(2), Vec2::new(1.0, 1.0), 0.5),
            SpatialEntity::new(id(3), Vec2::new(20.0, 20.0), 0.5),
        ]);
        assert_eq!(grid.len(), 2);
        assert_eq!(grid.query(1.0, 1.0, 1.0), vec![id(2)]);
    }

    #[test]
    fn test_concurrent_queries() {
        let grid = Arc::new(SpatialGrid::new(4.0).expect("valid cell size"));
        grid.rebuild((0..100).map(|i| {
            let position = Vec2::new((i % 10) as f32 * 3.0, (i / 10) as f32 * 3.0);
            SpatialEntity::new(id(i + 1), position, 1.0)
        }));

        std::thread::scope(|scope| {
            for worker in 0..4 {
                let grid = Arc::clone(&grid);
                scope.spawn(move || {
                    let x = worker as f32 * 6.0;
                    let hits = grid.query(x, 0.0, 0.5);
                    assert!(!hits.is_empty());
                });
            }
        });
    }

    proptest! {
        #[test]
        fn prop_query_matches_brute_force(
            points in proptest::collection::vec(
                (-50.0f32..50.0, -50.0f32..50.0, 0.0f32..5.0),
                1..40,
            ),
            qx in -50.0f32..50.0,
            qy in -50.0f32..50.0,
            qr in 0.0f32..20.0,
            cell in 0.5f32..16.0,
        ) {
            let grid = SpatialGrid::new(cell).expect("valid cell size");
            let entities: Vec<_> = points
                .iter()
                .enumerate()
                .map(|(i, &(x, y, r))| SpatialEntity::new(id(i as u64 + 1), Vec2::new(x, y), r))
                .collect();
            grid.rebuild(entities.iter().copied());

            let mut expected: Vec<_> = entities
                .iter()
                .filter(|e| e.intersects(Vec2::new(qx, qy), qr))
                .map(|e| e.id)
                .collect();
            let mut actual = grid.query(qx, qy, qr);
            expected.sort();
            actual.sort();
            prop_assert_eq!(expected, actual);
        }
    }
}
