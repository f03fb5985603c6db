use std::str::FromStr;

use strum::{EnumIter, IntoEnumIterator};

use crate::{
    assert_interval,
    env::{DiscreteSpace, Mdp},
    error::{Error, Result},
};

/// One square of a [`Gridworld`]
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Open,
    Wall,
    /// Open square every episode starts from
    Start,
    /// Square whose only action is [`GridAction::Exit`], paying the given reward
    Exit(f64),
}

/// Cartesian coordinates with the origin in the bottom-left corner, or the single absorbing
/// state every exit leads to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridState {
    Cell(usize, usize),
    Terminal,
}

#[derive(EnumIter, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GridAction {
    North,
    West,
    South,
    East,
    Exit,
}

impl GridAction {
    fn is_move(&self) -> bool {
        !matches!(self, GridAction::Exit)
    }

    /// The two moves a noisy agent slips into instead
    fn perpendicular(&self) -> [GridAction; 2] {
        match self {
            GridAction::North | GridAction::South => [GridAction::West, GridAction::East],
            GridAction::West | GridAction::East => [GridAction::North, GridAction::South],
            GridAction::Exit => unreachable!("exit has no direction"),
        }
    }
}

/// The classic gridworld MDP from the Russell & Norvig textbook
///
/// Moves succeed with probability `1 - noise` and otherwise slip to one of the two
/// perpendicular directions. Moving into a wall or off the grid leaves the agent in place.
/// Rewards depend on the square being left: exits pay their value, every other move pays
/// `living_reward`.
///
/// Layouts are written one row per line, top row first, with whitespace-separated tokens:
/// `_` for open squares, `#` for walls, `S` for the start and a number for an exit.
#[derive(Debug, Clone)]
pub struct Gridworld {
    /// Indexed `[x][y]`
    cells: Vec<Vec<Cell>>,
    width: usize,
    height: usize,
    start: GridState,
    noise: f64,
    living_reward: f64,
    discount: f64,
}

const BOOK: &str = "
    _ _ _ 1
    _ # _ -1
    S _ _ _
";

const BRIDGE: &str = "
    # -100 -100 -100 -100 -100 #
    1 S _ _ _ _ 10
    # -100 -100 -100 -100 -100 #
";

const CLIFF: &str = "
    _ _ _ _ _
    S _ _ _ 10
    -100 -100 -100 -100 -100
";

const DISCOUNT: &str = "
    _ _ _ _ _
    _ # _ _ _
    _ # 1 # 10
    S _ _ _ _
    -10 -10 -10 -10 -10
";

const MAZE: &str = "
    _ _ _ 1
    # # _ #
    _ # _ _
    _ # # _
    S _ _ _
";

impl Gridworld {
    fn builtin(layout: &str) -> Self {
        layout.parse().expect("built-in layouts are well formed")
    }

    /// The 4x3 grid of the textbook: +1 and -1 exits on the right
    pub fn book() -> Self {
        Self::builtin(BOOK)
    }

    /// A narrow bridge between a near +1 exit and a far +10 exit, flanked by -100 exits
    pub fn bridge() -> Self {
        Self::builtin(BRIDGE)
    }

    /// A +10 exit reachable along a row of -100 exits
    pub fn cliff() -> Self {
        Self::builtin(CLIFF)
    }

    /// A close +1 exit and a distant +10 exit above a row of -10 exits
    pub fn discount() -> Self {
        Self::builtin(DISCOUNT)
    }

    /// A winding corridor to a single +1 exit
    pub fn maze() -> Self {
        Self::builtin(MAZE)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn cell(&self, x: usize, y: usize) -> Option<Cell> {
        self.cells.get(x).and_then(|col| col.get(y)).copied()
    }

    pub fn noise(&self) -> f64 {
        self.noise
    }

    /// **Panics** if `noise` is not in `[0, 1]`
    pub fn set_noise(&mut self, noise: f64) {
        assert_interval!(noise, 0.0, 1.0);
        self.noise = noise;
    }

    pub fn living_reward(&self) -> f64 {
        self.living_reward
    }

    /// The reward for leaving any square that is not an exit, typically negative
    pub fn set_living_reward(&mut self, reward: f64) {
        self.living_reward = reward;
    }

    fn is_open(&self, x: isize, y: isize) -> bool {
        if x < 0 || y < 0 {
            return false;
        }
        !matches!(self.cell(x as usize, y as usize), None | Some(Cell::Wall))
    }

    /// Where a move in `direction` from `(x, y)` ends up
    fn neighbor(&self, x: usize, y: usize, direction: GridAction) -> GridState {
        let (dx, dy) = match direction {
            GridAction::North => (0, 1),
            GridAction::West => (-1, 0),
            GridAction::South => (0, -1),
            GridAction::East => (1, 0),
            GridAction::Exit => (0, 0),
        };
        let (nx, ny) = (x as isize + dx, y as isize + dy);
        if self.is_open(nx, ny) {
            GridState::Cell(nx as usize, ny as usize)
        } else {
            GridState::Cell(x, y)
        }
    }
}

impl FromStr for Gridworld {
    type Err = Error;

    fn from_str(layout: &str) -> Result<Self> {
        let rows = layout
            .lines()
            .map(|line| line.split_whitespace().collect::<Vec<_>>())
            .filter(|tokens| !tokens.is_empty())
            .collect::<Vec<_>>();

        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        if width == 0 {
            return Err(Error::InvalidParameter("gridworld layout is empty".into()));
        }

        let mut cells = vec![vec![Cell::Open; height]; width];
        let mut start = None;
        for (row, tokens) in rows.iter().enumerate() {
            if tokens.len() != width {
                return Err(Error::InvalidParameter(format!(
                    "gridworld row {row} has {} squares, expected {width}",
                    tokens.len()
                )));
            }
            let y = height - row - 1;
            for (x, token) in tokens.iter().enumerate() {
                cells[x][y] = match *token {
                    "_" => Cell::Open,
                    "#" => Cell::Wall,
                    "S" => {
                        start = Some(GridState::Cell(x, y));
                        Cell::Start
                    }
                    other => other.parse().map(Cell::Exit).map_err(|_| {
                        Error::InvalidParameter(format!("unknown gridworld square `{other}`"))
                    })?,
                };
            }
        }

        Ok(Self {
            cells,
            width,
            height,
            start: start.ok_or(Error::NoStartState)?,
            noise: 0.2,
            living_reward: 0.0,
            discount: 0.9,
        })
    }
}

impl DiscreteSpace for Gridworld {
    type State = GridState;
    type Action = GridAction;

    fn actions(&self, state: &GridState) -> Vec<GridAction> {
        match *state {
            GridState::Terminal => Vec::new(),
            GridState::Cell(x, y) => match self.cell(x, y) {
                Some(Cell::Exit(_)) => vec![GridAction::Exit],
                Some(Cell::Wall) | None => Vec::new(),
                _ => GridAction::iter().filter(GridAction::is_move).collect(),
            },
        }
    }

    fn is_terminal(&self, state: &GridState) -> bool {
        *state == GridState::Terminal
    }
}

impl Mdp for Gridworld {
    /// The terminal state first, then every non-wall square column by column
    fn states(&self) -> Vec<GridState> {
        let squares = (0..self.width)
            .flat_map(|x| (0..self.height).map(move |y| (x, y)))
            .filter(|&(x, y)| self.cells[x][y] != Cell::Wall)
            .map(|(x, y)| GridState::Cell(x, y));
        std::iter::once(GridState::Terminal).chain(squares).collect()
    }

    fn transitions(&self, state: &GridState, action: &GridAction) -> Result<Vec<(GridState, f64)>> {
        if !self.actions(state).contains(action) {
            return Err(Error::invalid_action(state, action));
        }
        let GridState::Cell(x, y) = *state else {
            return Ok(Vec::new());
        };
        if *action == GridAction::Exit {
            return Ok(vec![(GridState::Terminal, 1.0)]);
        }

        let [left, right] = action.perpendicular();
        let moves = [
            (*action, 1.0 - self.noise),
            (left, self.noise / 2.0),
            (right, self.noise / 2.0),
        ];

        // merge moves that end in the same square
        let mut successors: Vec<(GridState, f64)> = Vec::with_capacity(3);
        for (direction, prob) in moves {
            if prob <= 0.0 {
                continue;
            }
            let next_state = self.neighbor(x, y, direction);
            match successors.iter_mut().find(|(s, _)| *s == next_state) {
                Some((_, p)) => *p += prob,
                None => successors.push((next_state, prob)),
            }
        }
        Ok(successors)
    }

    fn reward(&self, state: &GridState, _action: &GridAction, _next_state: &GridState) -> f64 {
        match *state {
            GridState::Terminal => 0.0,
            GridState::Cell(x, y) => match self.cell(x, y) {
                Some(Cell::Exit(reward)) => reward,
                _ => self.living_reward,
            },
        }
    }

    fn start_state(&self) -> GridState {
        self.start
    }

    fn discount(&self) -> f64 {
        self.discount
    }

    /// **Panics** if `discount` is not in `[0, 1)`
    fn set_discount(&mut self, discount: f64) {
        assert!(
            (0.0..1.0).contains(&discount),
            "Invalid value for `discount`. Must be in the interval [0, 1)."
        );
        self.discount = discount;
    }
}
