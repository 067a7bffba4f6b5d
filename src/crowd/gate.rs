//! Arithmetic gates
//!
//! A gate rewrites the total population (agents + leader) with one arithmetic
//! operation. Mystery gates pick their operation when triggered, weighted by the
//! track's current flow state.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Gate operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GateOp {
    Add,
    Multiply,
    Subtract,
    Divide,
}

impl GateOp {
    /// Population total after applying this operation to `current`
    ///
    /// Results are floored to whole units. Division by zero or a non-finite
    /// operand yields a non-finite value, which callers treat as "no survivors".
    pub fn target_total(self, current: u32, operand: f64) -> f64 {
        let current = f64::from(current);
        let raw = match self {
            GateOp::Add => current + operand,
            GateOp::Multiply => current * operand,
            GateOp::Subtract => current - operand,
            GateOp::Divide => current / operand,
        };
        raw.floor()
    }

    pub fn symbol(self) -> char {
        match self {
            GateOp::Add => '+',
            GateOp::Multiply => 'x',
            GateOp::Subtract => '-',
            GateOp::Divide => '÷',
        }
    }
}

impl fmt::Display for GateOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.symbol())
    }
}

/// Unknown gate operator symbol
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown gate operator: {0:?}")]
pub struct ParseGateError(pub String);

impl FromStr for GateOp {
    type Err = ParseGateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "+" => Ok(GateOp::Add),
            "x" | "X" | "*" | "×" => Ok(GateOp::Multiply),
            "-" => Ok(GateOp::Subtract),
            "/" | "÷" => Ok(GateOp::Divide),
            other => Err(ParseGateError(other.to_string())),
        }
    }
}

/// Track difficulty phase, owned by the track generator and passed in when a
/// mystery gate triggers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowState {
    Recovery,
    Challenge,
    Grinder,
}

/// A resolved gate: operation and operand
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub op: GateOp,
    pub operand: f64,
}

impl Gate {
    pub const fn new(op: GateOp, operand: f64) -> Self {
        Self { op, operand }
    }

    #[inline]
    pub fn target_total(&self, current: u32) -> f64 {
        self.op.target_total(current, self.operand)
    }

    /// Resolve a mystery gate for the given flow state
    ///
    /// - Recovery: 40% x2, 50% +50, 10% -5
    /// - Challenge: 15% x3, 35% +25, 35% -30, 15% /2
    /// - Grinder: 5% x5, 45% -100, 50% /2
    pub fn resolve_mystery<R: Rng>(flow: FlowState, rng: &mut R) -> Self {
        Self::from_roll(flow, rng.gen::<f64>())
    }

    /// Mystery outcome for a uniform roll in [0, 1)
    pub fn from_roll(flow: FlowState, roll: f64) -> Self {
        use GateOp::*;
        match flow {
            FlowState::Recovery => {
                if roll < 0.40 {
                    Gate::new(Multiply, 2.0)
                } else if roll < 0.90 {
                    Gate::new(Add, 50.0)
                } else {
                    Gate::new(Subtract, 5.0)
                }
            }
            FlowState::Challenge => {
                if roll < 0.15 {
                    Gate::new(Multiply, 3.0)
                } else if roll < 0.50 {
                    Gate::new(Add, 25.0)
                } else if roll < 0.85 {
                    Gate::new(Subtract, 30.0)
                } else {
                    Gate::new(Divide, 2.0)
                }
            }
            FlowState::Grinder => {
                if roll < 0.05 {
                    Gate::new(Multiply, 5.0)
                } else if roll < 0.50 {
                    Gate::new(Subtract, 100.0)
                } else {
                    Gate::new(Divide, 2.0)
                }
            }
        }
    }
}

impl fmt::Display for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.op, self.operand)
    }
}
