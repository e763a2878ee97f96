use std::{collections::BTreeSet, fmt};

use thiserror::Error;

/// Cell coordinates as `(row, col)`
pub type Pos = (usize, usize);

/// Smallest allowed number of rows or columns
pub const MIN_DIM: usize = 2;
/// Largest allowed number of rows or columns
pub const MAX_DIM: usize = 8;
/// Upper bound on collectible items, which keeps the value table small (`2^items` copies of the grid)
pub const MAX_ITEMS: usize = 12;

/// Errors produced when building a [`GridLayout`] from a [`LayoutConfig`]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GridError {
    #[error("grid dimensions {rows}x{cols} must each be within [{MIN_DIM}, {MAX_DIM}]")]
    Dimensions { rows: usize, cols: usize },

    #[error("cell {0:?} lies outside the grid")]
    OutOfBounds(Pos),

    #[error("cell {0:?} is assigned more than one kind")]
    Overlap(Pos),

    #[error("layout needs a goal or a hazard cell")]
    NoTerminal,

    #[error("{0} items exceed the maximum of {MAX_ITEMS}")]
    TooManyItems(usize),
}

/// The kind of a single grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellKind {
    Empty,
    Start,
    Goal,
    Hazard,
    Wall,
    Item,
}

impl CellKind {
    /// The next kind in the click-to-edit cycle: item, wall, hazard, goal, empty, item, ...
    ///
    /// The start cell is not editable and maps to itself.
    pub fn next(self) -> Self {
        match self {
            CellKind::Item => CellKind::Wall,
            CellKind::Wall => CellKind::Hazard,
            CellKind::Hazard => CellKind::Goal,
            CellKind::Goal => CellKind::Empty,
            CellKind::Empty => CellKind::Item,
            CellKind::Start => CellKind::Start,
        }
    }

    /// Goal and hazard cells end an episode
    pub fn is_terminal(self) -> bool {
        matches!(self, CellKind::Goal | CellKind::Hazard)
    }

    fn symbol(self) -> char {
        match self {
            CellKind::Empty => '.',
            CellKind::Start => 'S',
            CellKind::Goal => 'G',
            CellKind::Hazard => 'H',
            CellKind::Wall => '#',
            CellKind::Item => '*',
        }
    }
}

/// Plain description of a grid, validated by [`GridLayout::new`]
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub rows: usize,
    pub cols: usize,
    pub start: Pos,
    pub goal: Option<Pos>,
    pub hazard: Option<Pos>,
    pub walls: Vec<Pos>,
    pub items: Vec<Pos>,
}

impl Default for LayoutConfig {
    /// 5x5 grid with the goal in the far corner, a hazard in the middle and two walls
    fn default() -> Self {
        Self {
            rows: 5,
            cols: 5,
            start: (0, 0),
            goal: Some((4, 4)),
            hazard: Some((2, 2)),
            walls: vec![(1, 3), (3, 1)],
            items: Vec::new(),
        }
    }
}

/// Result of a successful [`GridLayout::edit_cell`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EditOutcome {
    /// Kind the cell ended up with
    pub kind: CellKind,
    /// The edit would have removed the last terminal cell, so the cell became the goal instead
    pub promoted: bool,
    /// The item set changed, which changes the state encoding
    pub items_changed: bool,
}

/// Static layout of a grid world
///
/// Invariants, upheld by every constructor and edit:
/// - all cells lie within `rows x cols`, both in `[MIN_DIM, MAX_DIM]`
/// - the start cell holds nothing else
/// - there is a goal, a hazard, or both
/// - a cell has exactly one kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GridLayout {
    rows: usize,
    cols: usize,
    start: Pos,
    goal: Option<Pos>,
    hazard: Option<Pos>,
    walls: BTreeSet<Pos>,
    items: BTreeSet<Pos>,
}

impl Default for GridLayout {
    fn default() -> Self {
        let LayoutConfig {
            rows,
            cols,
            start,
            goal,
            hazard,
            walls,
            items,
        } = LayoutConfig::default();
        Self {
            rows,
            cols,
            start,
            goal,
            hazard,
            walls: walls.into_iter().collect(),
            items: items.into_iter().collect(),
        }
    }
}

impl GridLayout {
    /// Validate a [`LayoutConfig`] and build the layout from it
    pub fn new(config: LayoutConfig) -> Result<Self, GridError> {
        let LayoutConfig {
            rows,
            cols,
            start,
            goal,
            hazard,
            walls,
            items,
        } = config;

        if !(MIN_DIM..=MAX_DIM).contains(&rows) || !(MIN_DIM..=MAX_DIM).contains(&cols) {
            return Err(GridError::Dimensions { rows, cols });
        }
        if goal.is_none() && hazard.is_none() {
            return Err(GridError::NoTerminal);
        }

        let features = std::iter::once(start)
            .chain(goal)
            .chain(hazard)
            .chain(walls.iter().copied())
            .chain(items.iter().copied());

        let mut seen = BTreeSet::new();
        for pos in features {
            if pos.0 >= rows || pos.1 >= cols {
                return Err(GridError::OutOfBounds(pos));
            }
            if !seen.insert(pos) {
                return Err(GridError::Overlap(pos));
            }
        }

        if items.len() > MAX_ITEMS {
            return Err(GridError::TooManyItems(items.len()));
        }

        Ok(Self {
            rows,
            cols,
            start,
            goal,
            hazard,
            walls: walls.into_iter().collect(),
            items: items.into_iter().collect(),
        })
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn start(&self) -> Pos {
        self.start
    }

    pub fn goal(&self) -> Option<Pos> {
        self.goal
    }

    pub fn hazard(&self) -> Option<Pos> {
        self.hazard
    }

    pub fn walls(&self) -> &BTreeSet<Pos> {
        &self.walls
    }

    /// Item cells in row-major order, which is also their bit order in the state encoding
    pub fn items(&self) -> &BTreeSet<Pos> {
        &self.items
    }

    pub fn contains(&self, pos: Pos) -> bool {
        pos.0 < self.rows && pos.1 < self.cols
    }

    /// Kind of the cell at `pos`
    ///
    /// **Panics** if `pos` is outside the grid
    pub fn kind(&self, pos: Pos) -> CellKind {
        assert!(self.contains(pos), "cell {pos:?} lies outside the grid");
        if pos == self.start {
            CellKind::Start
        } else if self.goal == Some(pos) {
            CellKind::Goal
        } else if self.hazard == Some(pos) {
            CellKind::Hazard
        } else if self.walls.contains(&pos) {
            CellKind::Wall
        } else if self.items.contains(&pos) {
            CellKind::Item
        } else {
            CellKind::Empty
        }
    }

    /// All cells with their kinds in row-major order
    pub fn cells(&self) -> impl Iterator<Item = (Pos, CellKind)> + '_ {
        (0..self.rows)
            .flat_map(move |r| (0..self.cols).map(move |c| (r, c)))
            .map(|pos| (pos, self.kind(pos)))
    }

    /// Set the cell at `pos` to `kind`
    ///
    /// There is at most one goal and one hazard, so making a cell the goal (hazard)
    /// moves the goal (hazard) there. Edits of the start cell, cells outside the grid,
    /// requests for [`CellKind::Start`], no-change edits, and an item beyond
    /// [`MAX_ITEMS`] are ignored and return `None`. An edit that would leave the grid
    /// without a terminal cell turns the edited cell into the goal instead.
    pub fn edit_cell(&mut self, pos: Pos, kind: CellKind) -> Option<EditOutcome> {
        if !self.contains(pos) || pos == self.start || kind == CellKind::Start {
            return None;
        }
        let current = self.kind(pos);
        if current == kind {
            return None;
        }
        if kind == CellKind::Item && self.items.len() >= MAX_ITEMS {
            return None;
        }

        let goal_left = self.goal.is_some_and(|g| g != pos);
        let hazard_left = self.hazard.is_some_and(|h| h != pos);
        let promoted = !kind.is_terminal() && !goal_left && !hazard_left;
        let kind = if promoted { CellKind::Goal } else { kind };

        let items_before = self.items.len();
        self.clear(pos);
        match kind {
            CellKind::Empty | CellKind::Start => {}
            CellKind::Goal => self.goal = Some(pos),
            CellKind::Hazard => self.hazard = Some(pos),
            CellKind::Wall => {
                self.walls.insert(pos);
            }
            CellKind::Item => {
                self.items.insert(pos);
            }
        }

        Some(EditOutcome {
            kind,
            promoted,
            items_changed: items_before != self.items.len(),
        })
    }

    /// Change the grid dimensions, clamped to `[MIN_DIM, MAX_DIM]`
    ///
    /// Walls, items and a hazard that fall outside the new bounds are dropped, a start
    /// outside moves to `(0, 0)` and a goal outside moves to the bottom-right corner.
    ///
    /// **Returns** whether the dimensions changed
    pub fn resize(&mut self, rows: usize, cols: usize) -> bool {
        let rows = rows.clamp(MIN_DIM, MAX_DIM);
        let cols = cols.clamp(MIN_DIM, MAX_DIM);
        if (rows, cols) == (self.rows, self.cols) {
            return false;
        }

        self.rows = rows;
        self.cols = cols;
        let inside = |pos: &Pos| pos.0 < rows && pos.1 < cols;

        self.walls.retain(inside);
        self.items.retain(inside);
        self.hazard = self.hazard.filter(inside);
        if !inside(&self.start) {
            self.start = (0, 0);
        }
        if let Some(goal) = self.goal.filter(|g| !inside(g)) {
            log::debug!("goal {goal:?} moved inside resized {rows}x{cols} grid");
            self.goal = Some((rows - 1, cols - 1));
        }

        // Whatever shares the start cell yields to it
        let start = self.start;
        self.clear(start);
        if self.goal == Some(self.start) {
            self.goal = None;
        }
        if self.goal.is_none() && self.hazard.is_none() {
            let fallback = self.fallback_goal();
            self.clear(fallback);
            self.goal = Some(fallback);
        }
        if let Some(goal) = self.goal {
            self.walls.remove(&goal);
            self.items.remove(&goal);
            if self.hazard == Some(goal) {
                self.hazard = None;
            }
        }

        true
    }

    fn clear(&mut self, pos: Pos) {
        self.walls.remove(&pos);
        self.items.remove(&pos);
        if self.goal == Some(pos) {
            self.goal = None;
        }
        if self.hazard == Some(pos) {
            self.hazard = None;
        }
    }

    /// Last cell in row-major order that is not the start
    fn fallback_goal(&self) -> Pos {
        let corner = (self.rows - 1, self.cols - 1);
        if corner != self.start {
            corner
        } else {
            (self.rows - 1, self.cols - 2)
        }
    }
}

impl fmt::Display for GridLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in 0..self.rows {
            let line: String = (0..self.cols).map(|c| self.kind((r, c)).symbol()).collect();
            writeln!(f, "{line}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(goal: Option<Pos>, hazard: Option<Pos>) -> GridLayout {
        GridLayout::new(LayoutConfig {
            goal,
            hazard,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn default_layout_renders() {
        let grid = GridLayout::default();
        assert_eq!(grid.to_string(), "S....\n...#.\n..H..\n.#...\n....G\n");
        assert_eq!(GridLayout::new(LayoutConfig::default()), Ok(grid));
    }

    #[test]
    fn new_rejects_invalid_layouts() {
        let err = |config| GridLayout::new(config).unwrap_err();

        assert_eq!(
            err(LayoutConfig {
                rows: 9,
                ..Default::default()
            }),
            GridError::Dimensions { rows: 9, cols: 5 }
        );
        assert_eq!(
            err(LayoutConfig {
                goal: None,
                hazard: None,
                ..Default::default()
            }),
            GridError::NoTerminal
        );
        assert_eq!(
            err(LayoutConfig {
                walls: vec![(0, 0)],
                ..Default::default()
            }),
            GridError::Overlap((0, 0)),
            "start cell cannot hold a wall"
        );
        assert_eq!(
            err(LayoutConfig {
                items: vec![(5, 0)],
                ..Default::default()
            }),
            GridError::OutOfBounds((5, 0))
        );
        assert_eq!(
            err(LayoutConfig {
                rows: 8,
                cols: 8,
                goal: Some((7, 7)),
                hazard: None,
                walls: Vec::new(),
                items: (1..=13).map(|i| (i / 8, i % 8)).collect(),
                ..Default::default()
            }),
            GridError::TooManyItems(13)
        );
    }

    #[test]
    fn cell_kind_cycle() {
        let mut kind = CellKind::Item;
        let mut seen = Vec::new();
        for _ in 0..5 {
            seen.push(kind);
            kind = kind.next();
        }
        assert_eq!(kind, CellKind::Item, "cycle returns to item");
        assert_eq!(
            seen,
            [
                CellKind::Item,
                CellKind::Wall,
                CellKind::Hazard,
                CellKind::Goal,
                CellKind::Empty
            ]
        );
        assert_eq!(CellKind::Start.next(), CellKind::Start);
    }

    #[test]
    fn edit_moves_singletons() {
        let mut grid = GridLayout::default();

        let outcome = grid.edit_cell((0, 4), CellKind::Goal).unwrap();
        assert!(!outcome.promoted);
        assert_eq!(grid.goal(), Some((0, 4)));
        assert_eq!(grid.kind((4, 4)), CellKind::Empty, "old goal cleared");

        grid.edit_cell((1, 3), CellKind::Hazard).unwrap();
        assert_eq!(grid.hazard(), Some((1, 3)));
        assert!(!grid.walls().contains(&(1, 3)), "wall replaced");
        assert_eq!(grid.kind((2, 2)), CellKind::Empty, "old hazard cleared");
    }

    #[test]
    fn edit_ignores_start_and_out_of_bounds() {
        let mut grid = GridLayout::default();
        assert_eq!(grid.edit_cell((0, 0), CellKind::Wall), None);
        assert_eq!(grid.edit_cell((5, 5), CellKind::Wall), None);
        assert_eq!(grid.edit_cell((3, 1), CellKind::Wall), None, "no change");
        assert_eq!(grid.edit_cell((0, 1), CellKind::Start), None);
        assert_eq!(grid, GridLayout::default());
    }

    #[test]
    fn edit_keeps_a_terminal() {
        let mut grid = layout(Some((4, 4)), None);

        let outcome = grid.edit_cell((4, 4), CellKind::Empty).unwrap();
        assert!(outcome.promoted, "last terminal is auto-corrected");
        assert_eq!(outcome.kind, CellKind::Goal);
        assert_eq!(grid.goal(), Some((4, 4)));

        let mut grid = layout(None, Some((2, 2)));
        let outcome = grid.edit_cell((2, 2), CellKind::Wall).unwrap();
        assert!(outcome.promoted);
        assert_eq!(grid.goal(), Some((2, 2)));
        assert_eq!(grid.hazard(), None);
        assert!(!grid.walls().contains(&(2, 2)));

        let mut grid = GridLayout::default();
        let outcome = grid.edit_cell((4, 4), CellKind::Empty).unwrap();
        assert!(!outcome.promoted, "hazard still terminates");
        assert_eq!(grid.goal(), None);
    }

    #[test]
    fn edit_reports_item_changes() {
        let mut grid = GridLayout::default();
        let outcome = grid.edit_cell((0, 2), CellKind::Item).unwrap();
        assert!(outcome.items_changed);
        assert_eq!(grid.items().len(), 1);

        let outcome = grid.edit_cell((0, 2), CellKind::Item.next()).unwrap();
        assert!(outcome.items_changed, "item replaced by wall");
        assert!(grid.items().is_empty());

        let outcome = grid.edit_cell((0, 3), CellKind::Wall).unwrap();
        assert!(!outcome.items_changed);
    }

    #[test]
    fn edit_caps_items() {
        let mut grid = GridLayout::new(LayoutConfig {
            rows: 8,
            cols: 8,
            goal: Some((7, 7)),
            hazard: None,
            walls: Vec::new(),
            items: (1..=MAX_ITEMS).map(|i| (i / 8, i % 8)).collect(),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(grid.edit_cell((5, 5), CellKind::Item), None);
        assert_eq!(grid.items().len(), MAX_ITEMS);
    }

    #[test]
    fn resize_clamps_and_restores_invariants() {
        let mut grid = GridLayout::default();
        assert!(!grid.resize(5, 5));

        assert!(grid.resize(3, 3));
        assert_eq!((grid.rows(), grid.cols()), (3, 3));
        assert_eq!(grid.goal(), Some((2, 2)), "goal moved into corner");
        assert_eq!(grid.hazard(), None, "hazard shared the corner with the goal");
        assert!(grid.walls().is_empty());

        assert!(grid.resize(0, 100));
        assert_eq!((grid.rows(), grid.cols()), (MIN_DIM, MAX_DIM));
        assert!(grid.goal().is_some());
        assert!(grid.cells().all(|(pos, _)| grid.contains(pos)));
    }

    #[test]
    fn resize_keeps_inner_features() {
        let mut grid = GridLayout::new(LayoutConfig {
            rows: 6,
            cols: 6,
            start: (1, 1),
            goal: Some((5, 5)),
            hazard: Some((0, 3)),
            walls: vec![(2, 2), (4, 4)],
            items: vec![(0, 1), (5, 0)],
        })
        .unwrap();

        assert!(grid.resize(4, 4));
        assert_eq!(grid.start(), (1, 1));
        assert_eq!(grid.goal(), Some((3, 3)));
        assert_eq!(grid.hazard(), Some((0, 3)));
        assert_eq!(grid.walls().iter().copied().collect::<Vec<_>>(), [(2, 2)]);
        assert_eq!(grid.items().iter().copied().collect::<Vec<_>>(), [(0, 1)]);
    }
}
