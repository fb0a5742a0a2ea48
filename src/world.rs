use serde::{Deserialize, Serialize};
use std::collections::HashSet;

pub type AgentId = u32;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Heading {
    Up = 0,
    Right = 1,
    Down = 2,
    Left = 3,
}

impl Heading {
    pub const ALL: [Heading; 4] = [Heading::Up, Heading::Right, Heading::Down, Heading::Left];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Wraps any integer onto `0..4`, negatives included.
    pub fn from_index(index: i32) -> Self {
        Self::ALL[index.rem_euclid(4) as usize]
    }

    /// Rotates clockwise by `quarter_turns` (negative turns counter-clockwise).
    pub fn turned(self, quarter_turns: i32) -> Self {
        Self::from_index(self as i32 + quarter_turns)
    }

    pub fn reverse(self) -> Self {
        self.turned(2)
    }

    /// The two perpendicular headings, counter-clockwise first.
    pub fn laterals(self) -> [Heading; 2] {
        [self.turned(-1), self.turned(1)]
    }

    /// Every heading but the reverse: left lateral, `self`, right lateral.
    pub fn candidates(self) -> [Heading; 3] {
        let [left, right] = self.laterals();
        [left, self, right]
    }

    /// `(d_row, d_col)` for one step. Row 0 is the top of the grid.
    pub fn delta(self) -> (i32, i32) {
        match self {
            Heading::Up => (-1, 0),
            Heading::Right => (0, 1),
            Heading::Down => (1, 0),
            Heading::Left => (0, -1),
        }
    }

    pub fn glyph(self) -> char {
        match self {
            Heading::Up => '^',
            Heading::Right => '>',
            Heading::Down => 'V',
            Heading::Left => '<',
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cell {
    pub row: i32,
    pub col: i32,
}

impl Cell {
    pub fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    pub fn step(self, heading: Heading, steps: i32) -> Self {
        let (dr, dc) = heading.delta();
        Self {
            row: self.row + dr * steps,
            col: self.col + dc * steps,
        }
    }

    pub fn chebyshev(self, other: Cell) -> i32 {
        (self.row - other.row)
            .abs()
            .max((self.col - other.col).abs())
    }

    pub fn in_bounds(self, grid_count: i32) -> bool {
        self.row >= 0 && self.col >= 0 && self.row < grid_count && self.col < grid_count
    }
}

/// Dense square ownership table. Every cell holds exactly one owner state.
#[derive(Clone, Debug)]
pub struct Grid {
    size: i32,
    owners: Vec<Option<AgentId>>,
}

impl Grid {
    pub fn new(size: i32) -> Self {
        let size = size.max(0);
        Self {
            size,
            owners: vec![None; (size * size) as usize],
        }
    }

    pub fn size(&self) -> i32 {
        self.size
    }

    fn slot(&self, cell: Cell) -> Option<usize> {
        cell.in_bounds(self.size)
            .then(|| (cell.row * self.size + cell.col) as usize)
    }

    /// Out-of-bounds cells are reported as unowned.
    pub fn owner_of(&self, cell: Cell) -> Option<AgentId> {
        self.slot(cell).and_then(|idx| self.owners[idx])
    }

    pub fn is_owned_by(&self, cell: Cell, agent: AgentId) -> bool {
        self.owner_of(cell) == Some(agent)
    }

    /// Returns the previous owner. Out-of-bounds writes are ignored.
    pub fn set_owner(&mut self, cell: Cell, owner: Option<AgentId>) -> Option<AgentId> {
        match self.slot(cell) {
            Some(idx) => std::mem::replace(&mut self.owners[idx], owner),
            None => None,
        }
    }

    pub fn owned_by(&self, agent: AgentId) -> usize {
        self.owners.iter().filter(|o| **o == Some(agent)).count()
    }

    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        let size = self.size;
        (0..size).flat_map(move |row| (0..size).map(move |col| Cell::new(row, col)))
    }
}

/// Cells an agent has crossed since it last stood on its own land.
#[derive(Clone, Debug, Default)]
pub struct Tail {
    cells: Vec<Cell>,
    index: HashSet<Cell>,
}

impl Tail {
    pub fn hits(&self, cell: Cell) -> bool {
        self.index.contains(&cell)
    }

    pub fn push(&mut self, cell: Cell) {
        if self.index.insert(cell) {
            self.cells.push(cell);
        }
    }

    pub fn clear(&mut self) {
        self.cells.clear();
        self.index.clear();
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[derive(Clone, Debug)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub cell: Cell,
    pub heading: Heading,
    pub tail: Tail,
}

impl Agent {
    pub fn new(id: AgentId, name: impl Into<String>, cell: Cell, heading: Heading) -> Self {
        Self {
            id,
            name: name.into(),
            cell,
            heading,
            tail: Tail::default(),
        }
    }
}

/// Everything the engine may look at during one tick.
#[derive(Clone, Copy, Debug)]
pub struct Snapshot<'a> {
    pub grid: &'a Grid,
    pub me: &'a Agent,
    pub opponents: &'a [&'a Agent],
}

impl<'a> Snapshot<'a> {
    pub fn owns(&self, cell: Cell) -> bool {
        self.grid.is_owned_by(cell, self.me.id)
    }

    pub fn opponent_at(&self, cell: Cell) -> bool {
        self.opponents.iter().any(|other| other.cell == cell)
    }

    pub fn opponents_on_tail(&self, cell: Cell) -> impl Iterator<Item = &'a Agent> + 'a {
        let opponents: &'a [&'a Agent] = self.opponents;
        opponents
            .iter()
            .copied()
            .filter(move |other| other.tail.hits(cell))
    }
}

pub fn render_ascii(snapshot: &Snapshot<'_>) -> String {
    let size = snapshot.grid.size();
    let mut rows: Vec<Vec<char>> = (0..size)
        .map(|row| {
            (0..size)
                .map(|col| {
                    let cell = Cell::new(row, col);
                    if snapshot.me.tail.hits(cell) {
                        't'
                    } else {
                        match snapshot.grid.owner_of(cell) {
                            Some(owner) => char::from_digit(owner % 10, 10).unwrap_or('?'),
                            None => '.',
                        }
                    }
                })
                .collect()
        })
        .collect();

    let mut plot = |cell: Cell, glyph: char| {
        if cell.in_bounds(size) {
            rows[cell.row as usize][cell.col as usize] = glyph;
        }
    };
    for other in snapshot.opponents {
        plot(other.cell, 'x');
    }
    plot(snapshot.me.cell, snapshot.me.heading.glyph());

    let mut out = String::with_capacity(((size + 1) * size) as usize);
    for row in rows {
        out.push('\n');
        out.extend(row);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn heading_arithmetic_wraps() {
        assert_eq!(Heading::from_index(-1), Heading::Left);
        assert_eq!(Heading::from_index(6), Heading::Down);
        assert_eq!(Heading::Up.reverse(), Heading::Down);
        assert_eq!(Heading::Right.laterals(), [Heading::Up, Heading::Down]);
        assert_eq!(Heading::Left.turned(1), Heading::Up);
        assert_eq!(
            Heading::Up.candidates(),
            [Heading::Left, Heading::Up, Heading::Right]
        );
    }

    #[test]
    fn grid_reports_out_of_bounds_as_unowned() {
        let mut grid = Grid::new(4);
        grid.set_owner(Cell::new(0, 0), Some(7));
        assert_eq!(grid.owner_of(Cell::new(0, 0)), Some(7));
        assert_eq!(grid.owner_of(Cell::new(-1, 0)), None);
        assert_eq!(grid.set_owner(Cell::new(4, 4), Some(1)), None);
        assert_eq!(grid.owned_by(7), 1);
    }

    #[test]
    fn tail_membership_ignores_duplicates() {
        let mut tail = Tail::default();
        tail.push(Cell::new(1, 1));
        tail.push(Cell::new(1, 1));
        tail.push(Cell::new(1, 2));
        assert_eq!(tail.len(), 2);
        assert!(tail.hits(Cell::new(1, 2)));
        tail.clear();
        assert!(!tail.hits(Cell::new(1, 1)));
    }

    #[test]
    fn ascii_render_marks_self_and_opponents() {
        let mut grid = Grid::new(3);
        grid.set_owner(Cell::new(0, 0), Some(12));
        let me = Agent::new(12, "me", Cell::new(1, 1), Heading::Right);
        let other = Agent::new(3, "other", Cell::new(2, 2), Heading::Up);
        let opponents = [&other];
        let snapshot = Snapshot {
            grid: &grid,
            me: &me,
            opponents: &opponents,
        };
        assert_eq!(render_ascii(&snapshot), "\n2..\n.>.\n..x");
    }
}
