//! ## ROBOT NAVIGATION STATE
//!
//! Tracks one remote robot's position and facing across the lifetime of a
//! [`Session`](crate::session::Session), and implements the "walk it toward
//! the origin while evading obstacles" algorithm described by the
//! navigation component.

/// A point on the unbounded grid the robot reports its position on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0, y: 0 };

    pub fn new(x: i32, y: i32) -> Self {
        Position { x, y }
    }
}

/// Compass facing, ordered cyclically for right turns:
/// `North -> East -> South -> West -> North`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    East,
    South,
    West,
    Unknown,
}

impl Direction {
    /// Advances one step clockwise. `Unknown` has no well-defined successor
    /// and is left as-is; by the time a rotation is needed the direction has
    /// always already been inferred from a movement.
    fn turn_right(self) -> Direction {
        match self {
            Direction::North => Direction::East,
            Direction::East => Direction::South,
            Direction::South => Direction::West,
            Direction::West => Direction::North,
            Direction::Unknown => Direction::Unknown,
        }
    }
}

impl Default for Direction {
    fn default() -> Self {
        Direction::Unknown
    }
}

/// Per-connection navigation state for a single robot.
///
/// `pos`/`last_pos` start at a sentinel pair (`(1000, 1000)` /
/// `(-1000, -1000)`) that cannot collide with any position a real robot
/// would report, so the very first [`Robot::set_location`] call is never
/// mistaken for "the robot didn't move".
#[derive(Debug, Clone, Copy)]
pub struct Robot {
    pos: Position,
    last_pos: Position,
    direction: Direction,
    needed_direction: Direction,
    inverse_navigation: bool,
}

impl Default for Robot {
    fn default() -> Self {
        Robot {
            pos: Position::new(1000, 1000),
            last_pos: Position::new(-1000, -1000),
            direction: Direction::Unknown,
            needed_direction: Direction::Unknown,
            inverse_navigation: false,
        }
    }
}

impl Robot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn pos(&self) -> Position {
        self.pos
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Records a freshly reported position, sliding the previous `pos` into
    /// `last_pos`.
    pub fn set_location(&mut self, pos: Position) {
        self.last_pos = self.pos;
        self.pos = pos;
    }

    pub fn is_at_origin(&self) -> bool {
        self.pos == Position::ORIGIN
    }

    /// Whether the most recent [`Robot::set_location`] changed the reported
    /// position at all.
    pub fn position_changed(&self) -> bool {
        self.pos != self.last_pos
    }

    /// Infers `direction` from the delta between `last_pos` and `pos`,
    /// preferring the X axis: `x` changed -> East/West, else `y` changed ->
    /// North/South.
    pub fn infer_direction_from_motion(&mut self) {
        if self.pos.x > self.last_pos.x {
            self.direction = Direction::East;
        } else if self.pos.x < self.last_pos.x {
            self.direction = Direction::West;
        } else if self.pos.y > self.last_pos.y {
            self.direction = Direction::North;
        } else if self.pos.y < self.last_pos.y {
            self.direction = Direction::South;
        }
    }

    /// Picks the direction that should be faced next, prioritizing the Y
    /// axis unless `inverse_navigation` flips that priority to X.
    pub fn calculate_needed_direction(&mut self) {
        self.needed_direction = if self.inverse_navigation {
            Self::desired_direction_x_first(self.pos)
        } else {
            Self::desired_direction_y_first(self.pos)
        };
    }

    fn desired_direction_y_first(pos: Position) -> Direction {
        if pos.y < 0 {
            Direction::North
        } else if pos.y > 0 {
            Direction::South
        } else if pos.x < 0 {
            Direction::East
        } else if pos.x > 0 {
            Direction::West
        } else {
            Direction::Unknown
        }
    }

    fn desired_direction_x_first(pos: Position) -> Direction {
        if pos.x < 0 {
            Direction::East
        } else if pos.x > 0 {
            Direction::West
        } else if pos.y < 0 {
            Direction::North
        } else if pos.y > 0 {
            Direction::South
        } else {
            Direction::Unknown
        }
    }

    pub fn is_facing_needed_direction(&self) -> bool {
        self.direction == self.needed_direction
    }

    /// The server only ever instructs right turns; this advances the facing
    /// direction by one step. Reaching the target may take up to three of
    /// these, one per round-trip.
    pub fn rotate_right(&mut self) {
        self.direction = self.direction.turn_right();
    }

    pub fn toggle_inverse_navigation(&mut self) {
        self.inverse_navigation = !self.inverse_navigation;
    }
}
