//! Action encoding for the auto-battler environment boundary.
//!
//! The planner and the environment exchange actions in two formats:
//!
//! - a wire string of 1-4 underscore-delimited integers
//!   (`"<type>"`, `"<type>_<arg>"` or `"<type>_<arg1>_<arg2>"`), and
//! - a fixed 4-slot integer tuple with unused trailing slots zero-filled,
//!   which is what gets stored in transitions and training sequences.
//!
//! Internally the pipeline works with the [`Action`] sum type and only
//! serializes at the boundary. Both round-trips are exact.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Number of distinct action types.
pub const NUM_ACTION_TYPES: usize = 7;

/// Tuple stored for window-head and absorbing sequence slots.
///
/// This reuses the pass encoding; absorbing slots are always masked out of
/// the loss, and the window head is never used as an action-conditioned
/// prediction target.
pub const NOOP_ACTION: [u8; 4] = [0, 0, 0, 0];

/// A single agent action.
///
/// Each variant carries only the fields its type needs. Slot/position
/// bounds are the environment's concern; the codec enforces structure only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Action {
    /// Do nothing this tick.
    Pass,
    /// Buy the unit in the given shop slot.
    Buy(u8),
    /// Move a unit between two board/bench positions.
    Move(u8, u8),
    /// Attach the given item to the unit at a board position.
    Item(u8, u8),
    /// Sell the unit at a board/bench position.
    Sell(u8),
    /// Buy experience toward the next level.
    Level,
    /// Refresh the shop.
    Refresh,
}

impl Action {
    /// Type discriminant as transmitted on the wire.
    pub fn type_id(&self) -> u8 {
        match self {
            Action::Pass => 0,
            Action::Buy(_) => 1,
            Action::Move(_, _) => 2,
            Action::Item(_, _) => 3,
            Action::Sell(_) => 4,
            Action::Level => 5,
            Action::Refresh => 6,
        }
    }

    /// Number of argument fields this type carries on the wire.
    pub fn arity(&self) -> usize {
        Self::arity_of(self.type_id()).expect("own type id is valid")
    }

    fn arity_of(type_id: u8) -> Result<usize, ActionCodeError> {
        match type_id {
            0 | 5 | 6 => Ok(0),
            1 | 4 => Ok(1),
            2 | 3 => Ok(2),
            t => Err(ActionCodeError::UnknownType(t)),
        }
    }

    /// Fixed 4-slot tuple with unused trailing slots zero-filled.
    pub fn to_tuple(&self) -> [u8; 4] {
        match *self {
            Action::Pass => [0, 0, 0, 0],
            Action::Buy(slot) => [1, slot, 0, 0],
            Action::Move(from, to) => [2, from, to, 0],
            Action::Item(unit, item) => [3, unit, item, 0],
            Action::Sell(slot) => [4, slot, 0, 0],
            Action::Level => [5, 0, 0, 0],
            Action::Refresh => [6, 0, 0, 0],
        }
    }

    /// Decode a zero-filled 4-slot tuple.
    ///
    /// Unused slots must be zero so that tuple round-trips are exact.
    pub fn from_tuple(tuple: [u8; 4]) -> Result<Self, ActionCodeError> {
        let arity = Self::arity_of(tuple[0])?;
        if tuple[1 + arity..].iter().any(|&x| x != 0) {
            return Err(ActionCodeError::NonZeroPadding(tuple));
        }
        Ok(match tuple[0] {
            0 => Action::Pass,
            1 => Action::Buy(tuple[1]),
            2 => Action::Move(tuple[1], tuple[2]),
            3 => Action::Item(tuple[1], tuple[2]),
            4 => Action::Sell(tuple[1]),
            5 => Action::Level,
            6 => Action::Refresh,
            _ => unreachable!("arity_of rejects unknown types"),
        })
    }

    /// Wire string: type id plus exactly the arguments the type needs.
    pub fn encode(&self) -> String {
        let t = self.to_tuple();
        match self.arity() {
            0 => format!("{}", t[0]),
            1 => format!("{}_{}", t[0], t[1]),
            _ => format!("{}_{}_{}", t[0], t[1], t[2]),
        }
    }

    /// Parse a wire string. Field count must match the type's arity.
    pub fn decode(wire: &str) -> Result<Self, ActionCodeError> {
        let mut fields = [0u8; 4];
        let mut count = 0;
        for part in wire.split('_') {
            if count == 4 {
                return Err(ActionCodeError::TooManyFields(wire.to_string()));
            }
            fields[count] = part
                .parse()
                .map_err(|_| ActionCodeError::BadField(wire.to_string()))?;
            count += 1;
        }
        let arity = Self::arity_of(fields[0])?;
        if count != arity + 1 {
            return Err(ActionCodeError::WrongArity {
                type_id: fields[0],
                got: count - 1,
                want: arity,
            });
        }
        Self::from_tuple(fields)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl FromStr for Action {
    type Err = ActionCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::decode(s)
    }
}

/// Errors from the action codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionCodeError {
    /// Type discriminant outside the known range.
    UnknownType(u8),
    /// A wire field failed to parse as an integer.
    BadField(String),
    /// Wire string carried more than four fields.
    TooManyFields(String),
    /// Field count does not match the type's arity.
    WrongArity { type_id: u8, got: usize, want: usize },
    /// Tuple had non-zero values in unused trailing slots.
    NonZeroPadding([u8; 4]),
}

impl fmt::Display for ActionCodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ActionCodeError::UnknownType(t) => write!(f, "unknown action type {}", t),
            ActionCodeError::BadField(s) => write!(f, "non-integer field in action '{}'", s),
            ActionCodeError::TooManyFields(s) => write!(f, "too many fields in action '{}'", s),
            ActionCodeError::WrongArity { type_id, got, want } => write!(
                f,
                "action type {} takes {} argument(s), got {}",
                type_id, want, got
            ),
            ActionCodeError::NonZeroPadding(t) => {
                write!(f, "non-zero padding in action tuple {:?}", t)
            }
        }
    }
}

impl std::error::Error for ActionCodeError {}
