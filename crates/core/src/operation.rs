//! The operation codes carried by `OPR` instructions.
use std::fmt;

/// Sub-operations dispatched by the `OPR` opcode: arithmetic, comparisons,
/// control (`RETURN`), and the two IO operations (`WRITE`, `DEBUG`).
///
/// The discriminants are explicit and deliberately skip `7` — the original
/// PL/0 implementation this toolchain descends from has a gap between
/// `ODD = 6` and `EQUAL = 8`. Nothing in the VM depends on the codes being
/// contiguous, so the gap is preserved rather than renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Return = 0,
    Negate = 1,
    Add = 2,
    Sub = 3,
    Mult = 4,
    Div = 5,
    Odd = 6,
    Equal = 8,
    NotEqual = 9,
    Less = 10,
    GreaterEqual = 11,
    Greater = 12,
    LessEqual = 13,
    Write = 14,
    Debug = 15,
}

impl Operation {
    pub fn from_code(code: i64) -> Option<Self> {
        use Operation::*;
        Some(match code {
            0 => Return,
            1 => Negate,
            2 => Add,
            3 => Sub,
            4 => Mult,
            5 => Div,
            6 => Odd,
            8 => Equal,
            9 => NotEqual,
            10 => Less,
            11 => GreaterEqual,
            12 => Greater,
            13 => LessEqual,
            14 => Write,
            15 => Debug,
            _ => return None,
        })
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Return => "RETURN",
            Operation::Negate => "NEGATE",
            Operation::Add => "ADD",
            Operation::Sub => "SUB",
            Operation::Mult => "MULT",
            Operation::Div => "DIV",
            Operation::Odd => "ODD",
            Operation::Equal => "EQUAL",
            Operation::NotEqual => "NOT_EQUAL",
            Operation::Less => "LESS",
            Operation::GreaterEqual => "GREATER_EQUAL",
            Operation::Greater => "GREATER",
            Operation::LessEqual => "LESS_EQUAL",
            Operation::Write => "WRITE",
            Operation::Debug => "DEBUG",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gap_between_odd_and_equal_is_preserved() {
        assert_eq!(Operation::Odd as i64, 6);
        assert_eq!(Operation::Equal as i64, 8);
        assert!(Operation::from_code(7).is_none());
    }

    #[test]
    fn round_trips_every_defined_code() {
        let all = [
            Operation::Return,
            Operation::Negate,
            Operation::Add,
            Operation::Sub,
            Operation::Mult,
            Operation::Div,
            Operation::Odd,
            Operation::Equal,
            Operation::NotEqual,
            Operation::Less,
            Operation::GreaterEqual,
            Operation::Greater,
            Operation::LessEqual,
            Operation::Write,
            Operation::Debug,
        ];
        for op in all {
            assert_eq!(Operation::from_code(op as i64), Some(op));
        }
    }
}
