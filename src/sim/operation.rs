//! Arithmetic operations carried by falling objects

use serde::{Deserialize, Serialize};

/// Arithmetic transform kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl OperationKind {
    /// Symbol shown on screen
    pub fn symbol(&self) -> &'static str {
        match self {
            OperationKind::Add => "+",
            OperationKind::Subtract => "\u{2212}",
            OperationKind::Multiply => "\u{00d7}",
            OperationKind::Divide => "\u{00f7}",
        }
    }

    /// Word used when the operation is read aloud
    pub fn spoken(&self) -> &'static str {
        match self {
            OperationKind::Add => "plus",
            OperationKind::Subtract => "minus",
            OperationKind::Multiply => "times",
            OperationKind::Divide => "divided by",
        }
    }
}

/// Serialized form of an operation (texts are derived, never stored)
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
struct RawOperation {
    kind: OperationKind,
    operand: u32,
}

/// An immutable arithmetic operation with precomputed display and speech text
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "RawOperation", into = "RawOperation")]
pub struct Operation {
    kind: OperationKind,
    operand: u32,
    display: String,
    speech: String,
}

impl From<RawOperation> for Operation {
    fn from(raw: RawOperation) -> Self {
        Operation::new(raw.kind, raw.operand)
    }
}

impl From<Operation> for RawOperation {
    fn from(op: Operation) -> Self {
        RawOperation {
            kind: op.kind,
            operand: op.operand,
        }
    }
}

impl Operation {
    pub fn new(kind: OperationKind, operand: u32) -> Self {
        Self {
            kind,
            operand,
            display: format!("{}{}", kind.symbol(), operand),
            speech: format!("{} {}", kind.spoken(), operand),
        }
    }

    pub fn add(operand: u32) -> Self {
        Self::new(OperationKind::Add, operand)
    }

    pub fn subtract(operand: u32) -> Self {
        Self::new(OperationKind::Subtract, operand)
    }

    pub fn multiply(operand: u32) -> Self {
        Self::new(OperationKind::Multiply, operand)
    }

    pub fn divide(operand: u32) -> Self {
        Self::new(OperationKind::Divide, operand)
    }

    pub fn kind(&self) -> OperationKind {
        self.kind
    }

    pub fn operand(&self) -> u32 {
        self.operand
    }

    /// Short label, e.g. `+3`
    pub fn display(&self) -> &str {
        &self.display
    }

    /// Spoken form, e.g. `plus 3`
    pub fn speech(&self) -> &str {
        &self.speech
    }
}

/// Apply an operation to a score.
///
/// Division rounds to the nearest integer with ties away from zero
/// (`5 ÷ 2 = 3`, `-5 ÷ 2 = -3`). A zero divisor leaves the score unchanged.
pub fn apply_operation(score: i64, op: &Operation) -> i64 {
    let operand = op.operand as i64;
    match op.kind {
        OperationKind::Add => score.saturating_add(operand),
        OperationKind::Subtract => score.saturating_sub(operand),
        OperationKind::Multiply => score.saturating_mul(operand),
        OperationKind::Divide => {
            if operand == 0 {
                return score;
            }
            let quotient = score / operand;
            let remainder = score % operand;
            if 2 * remainder.abs() >= operand {
                quotient + score.signum()
            } else {
                quotient
            }
        }
    }
}
