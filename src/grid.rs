//! Owning (slot, entity) container.
//!
//! `SlotGrid` stores one cell per parallel slot and entity in a single
//! contiguous vector. Access is bounds-checked on both axes, and the cells
//! are released when the grid is dropped or replaced.

use std::collections::TryReserveError;
use std::ops::{Index, IndexMut};

/// Two-dimensional container keyed by `(slot, entity)`.
///
/// # Examples
///
/// ```rust
/// use adqstat::grid::SlotGrid;
///
/// let mut grid = SlotGrid::try_new_with(2, 3, || Ok(0u32)).unwrap();
/// grid[(1, 2)] += 5;
///
/// assert_eq!(grid[(1, 2)], 5);
/// assert_eq!(grid.slot(0), &[0, 0, 0]);
/// assert_eq!(grid.len(), 6);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SlotGrid<T> {
    slots: usize,
    entities: usize,
    cells: Vec<T>,
}

impl<T> SlotGrid<T> {
    /// A grid with no cells.
    pub fn empty() -> Self {
        Self {
            slots: 0,
            entities: 0,
            cells: Vec::new(),
        }
    }

    /// Allocate `slots * entities` cells, each built by `make`.
    pub fn try_new_with<F>(
        slots: usize,
        entities: usize,
        mut make: F,
    ) -> Result<Self, TryReserveError>
    where
        F: FnMut() -> Result<T, TryReserveError>,
    {
        let len = slots * entities;
        let mut cells = Vec::new();
        cells.try_reserve_exact(len)?;
        for _ in 0..len {
            cells.push(make()?);
        }
        Ok(Self {
            slots,
            entities,
            cells,
        })
    }

    pub fn slots(&self) -> usize {
        self.slots
    }

    pub fn entities(&self) -> usize {
        self.entities
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Cells of one slot, in entity order.
    pub fn slot(&self, slot: usize) -> &[T] {
        assert!(slot < self.slots || self.entities == 0, "slot {slot} out of range");
        let start = slot * self.entities;
        &self.cells[start..start + self.entities]
    }

    /// Mutable cells of one slot, in entity order.
    pub fn slot_mut(&mut self, slot: usize) -> &mut [T] {
        assert!(slot < self.slots || self.entities == 0, "slot {slot} out of range");
        let start = slot * self.entities;
        &mut self.cells[start..start + self.entities]
    }

    pub fn get(&self, slot: usize, entity: usize) -> Option<&T> {
        if slot < self.slots && entity < self.entities {
            self.cells.get(slot * self.entities + entity)
        } else {
            None
        }
    }

    #[inline]
    fn offset(&self, (slot, entity): (usize, usize)) -> usize {
        assert!(
            slot < self.slots && entity < self.entities,
            "cell ({slot}, {entity}) out of range for {}x{} grid",
            self.slots,
            self.entities
        );
        slot * self.entities + entity
    }
}

impl<T> Default for SlotGrid<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> Index<(usize, usize)> for SlotGrid<T> {
    type Output = T;

    #[inline]
    fn index(&self, cell: (usize, usize)) -> &T {
        &self.cells[self.offset(cell)]
    }
}

impl<T> IndexMut<(usize, usize)> for SlotGrid<T> {
    #[inline]
    fn index_mut(&mut self, cell: (usize, usize)) -> &mut T {
        let offset = self.offset(cell);
        &mut self.cells[offset]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_are_disjoint() {
        let mut grid = SlotGrid::try_new_with(3, 2, || Ok(0i32)).unwrap();
        for cell in grid.slot_mut(1) {
            *cell = 7;
        }
        assert_eq!(grid.slot(0), &[0, 0]);
        assert_eq!(grid.slot(1), &[7, 7]);
        assert_eq!(grid.slot(2), &[0, 0]);
    }

    #[test]
    fn test_zero_entities_has_empty_slots() {
        let grid: SlotGrid<f64> = SlotGrid::try_new_with(4, 0, || Ok(0.0)).unwrap();
        assert!(grid.is_empty());
        assert_eq!(grid.slot(2).len(), 0);
        assert!(grid.get(0, 0).is_none());
    }

    #[test]
    #[should_panic]
    fn test_entity_out_of_range_panics() {
        let grid = SlotGrid::try_new_with(2, 2, || Ok(0u8)).unwrap();
        // (0, 2) would alias (1, 0) without the per-axis check.
        let _ = grid[(0, 2)];
    }

    #[test]
    fn test_get_checks_both_axes() {
        let grid = SlotGrid::try_new_with(2, 2, || Ok(1u8)).unwrap();
        assert_eq!(grid.get(1, 1), Some(&1));
        assert!(grid.get(0, 2).is_none());
        assert!(grid.get(2, 0).is_none());
    }
}
