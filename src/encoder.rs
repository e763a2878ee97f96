use crate::grid::{GridLayout, Pos};

/// Bitmask of items that are still present, bit `i` for the `i`-th item in row-major order
pub type ItemMask = u32;

/// Maps an agent position plus the set of remaining items to a dense state index
///
/// index = mask * (rows * cols) + row * cols + col
///
/// Item bits follow the row-major order of the item cells, so a given cell keeps its bit
/// across rebuilds as long as the item set is unchanged. Any change to the dimensions or
/// the item set changes the whole index space.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateEncoder {
    rows: usize,
    cols: usize,
    items: Vec<Pos>,
}

impl StateEncoder {
    pub fn new(layout: &GridLayout) -> Self {
        Self {
            rows: layout.rows(),
            cols: layout.cols(),
            items: layout.items().iter().copied().collect(),
        }
    }

    /// Number of states for a grid of `rows x cols` with `item_count` collectible items
    pub fn total_states(rows: usize, cols: usize, item_count: usize) -> usize {
        rows * cols * (1 << item_count)
    }

    /// Number of states this encoder maps onto
    pub fn len(&self) -> usize {
        Self::total_states(self.rows, self.cols, self.items.len())
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Mask with every item present, the state at the start of an episode
    pub fn full_mask(&self) -> ItemMask {
        ((1u64 << self.items.len()) - 1) as ItemMask
    }

    /// The bit assigned to the item at `pos`, if there is one
    pub fn item_bit(&self, pos: Pos) -> Option<ItemMask> {
        self.items.binary_search(&pos).ok().map(|i| 1 << i)
    }

    /// Encode a position and item mask
    ///
    /// **Panics** if `pos` is outside the grid or `mask` has bits beyond the item count
    pub fn encode(&self, pos: Pos, mask: ItemMask) -> usize {
        assert!(
            pos.0 < self.rows && pos.1 < self.cols,
            "cannot encode {pos:?} on a {}x{} grid",
            self.rows,
            self.cols
        );
        assert!(
            mask <= self.full_mask(),
            "item mask {mask:#b} has bits beyond {} items",
            self.items.len()
        );
        mask as usize * (self.rows * self.cols) + pos.0 * self.cols + pos.1
    }

    /// Inverse of [`encode`](Self::encode)
    pub fn decode(&self, index: usize) -> (Pos, ItemMask) {
        assert!(index < self.len(), "state {index} out of range");
        let cells = self.rows * self.cols;
        let cell = index % cells;
        ((cell / self.cols, cell % self.cols), (index / cells) as ItemMask)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::grid::LayoutConfig;

    fn encoder(rows: usize, cols: usize, items: Vec<Pos>) -> StateEncoder {
        let layout = GridLayout::new(LayoutConfig {
            rows,
            cols,
            start: (0, 0),
            goal: Some((rows - 1, cols - 1)),
            hazard: None,
            walls: Vec::new(),
            items,
        })
        .unwrap();
        StateEncoder::new(&layout)
    }

    #[test]
    fn total_states_formula() {
        assert_eq!(StateEncoder::total_states(5, 5, 0), 25);
        assert_eq!(StateEncoder::total_states(3, 4, 2), 48);
        assert_eq!(encoder(4, 3, vec![(0, 1), (1, 1), (2, 2)]).len(), 96);
    }

    #[test]
    fn encoding_is_a_bijection() {
        let enc = encoder(3, 4, vec![(0, 2), (2, 0)]);
        let mut seen = HashSet::new();
        for mask in 0..=enc.full_mask() {
            for r in 0..3 {
                for c in 0..4 {
                    let ix = enc.encode((r, c), mask);
                    assert!(ix < enc.len(), "index in range");
                    assert!(seen.insert(ix), "index {ix} produced twice");
                    assert_eq!(enc.decode(ix), ((r, c), mask));
                }
            }
        }
        assert_eq!(seen.len(), enc.len(), "range is covered exactly");
    }

    #[test]
    fn item_bits_follow_row_major_order() {
        let enc = encoder(4, 4, vec![(2, 1), (0, 3), (2, 0)]);
        assert_eq!(enc.item_bit((0, 3)), Some(0b001));
        assert_eq!(enc.item_bit((2, 0)), Some(0b010));
        assert_eq!(enc.item_bit((2, 1)), Some(0b100));
        assert_eq!(enc.item_bit((1, 1)), None);
        assert_eq!(enc.full_mask(), 0b111);

        let rebuilt = encoder(4, 4, vec![(2, 0), (2, 1), (0, 3)]);
        assert_eq!(rebuilt, enc, "bit assignment independent of insertion order");
    }

    #[test]
    fn no_items_means_empty_mask() {
        let enc = encoder(2, 2, Vec::new());
        assert_eq!(enc.full_mask(), 0);
        assert_eq!(enc.encode((1, 1), 0), 3);
    }

    #[test]
    #[should_panic(expected = "cannot encode")]
    fn encode_out_of_bounds_panics() {
        encoder(3, 3, Vec::new()).encode((3, 0), 0);
    }

    #[test]
    #[should_panic(expected = "item mask")]
    fn encode_unknown_item_bit_panics() {
        encoder(3, 3, vec![(1, 1)]).encode((0, 0), 0b10);
    }
}
