//! Runtime error types.
//!
//! Follows the same shape as `pl0-compiler`'s `CodegenError`: a small enum
//! with a hand-written `Display` impl rather than a dependency on an
//! error-derive crate, since the three failure modes are fixed and known
//! ahead of time.

use std::fmt;

/// A fatal condition raised while executing an instruction stream. The VM
/// has no recovery path for any of these — execution stops immediately.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    /// `sp` would leave `[-1, capacity)`.
    StackOverflow { capacity: usize },
    /// `DIV` with a zero right-hand side.
    DivisionByZero,
    /// `pc` ran off the end of the instruction stream, or an `OPR`
    /// instruction carried a value with no matching `Operation`.
    UndefinedOpcode { pc: usize },
}

impl fmt::Display for VmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VmError::StackOverflow { capacity } => {
                write!(f, "stack overflow: data segment capacity {capacity} exceeded")
            }
            VmError::DivisionByZero => write!(f, "division by zero"),
            VmError::UndefinedOpcode { pc } => {
                write!(f, "undefined instruction at pc={pc}")
            }
        }
    }
}

impl std::error::Error for VmError {}
