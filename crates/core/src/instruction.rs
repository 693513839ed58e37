//! The instruction format shared by the code generator and the VM.
//!
//! An instruction is always the same three-field shape: an opcode, a
//! lexical `level` (only meaningful for `Lod`/`Sto`/`Cal`), and a `value`
//! whose meaning depends on the opcode (a literal, a code address, or an
//! [`Operation`](crate::Operation) code).

use std::fmt;

use crate::Operation;

/// One of the eight instructions the VM understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    /// Push a literal value.
    Lit,
    /// Perform an arithmetic/IO/control operation, see [`Operation`].
    Opr,
    /// Load a variable onto the stack.
    Lod,
    /// Pop the stack into a variable.
    Sto,
    /// Call a procedure, establishing a new stack frame.
    Cal,
    /// Allocate `value` words on top of the stack.
    Int,
    /// Unconditional jump.
    Jmp,
    /// Pop the stack; jump if the popped value is zero.
    Jpc,
    /// Pop one word (caller-side argument cleanup after `Cal`).
    Det,
}

impl fmt::Display for Opcode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Opcode::Lit => "LIT",
            Opcode::Opr => "OPR",
            Opcode::Lod => "LOD",
            Opcode::Sto => "STO",
            Opcode::Cal => "CAL",
            Opcode::Int => "INT",
            Opcode::Jmp => "JMP",
            Opcode::Jpc => "JPC",
            Opcode::Det => "DET",
        };
        f.write_str(name)
    }
}

/// A single instruction in a compiled PL/0 program.
///
/// `level` and `value` are always present even when an opcode doesn't use
/// one of them (`Int`/`Jmp`/`Jpc`/`Det` ignore `level`) — this mirrors the
/// original three-tuple instruction format and keeps the instruction array
/// a flat `Vec<Instruction>` rather than an enum with differently-shaped
/// variants, which simplifies fixup patching (see [`Instruction::patch`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub op: Opcode,
    pub level: i64,
    pub value: i64,
}

impl Instruction {
    pub fn new(op: Opcode, level: i64, value: i64) -> Self {
        Instruction { op, level, value }
    }

    pub fn lit(value: i64) -> Self {
        Instruction::new(Opcode::Lit, 0, value)
    }

    pub fn opr(operation: Operation) -> Self {
        Instruction::new(Opcode::Opr, 0, operation as i64)
    }

    pub fn lod(level: i64, offset: i64) -> Self {
        Instruction::new(Opcode::Lod, level, offset)
    }

    pub fn sto(level: i64, offset: i64) -> Self {
        Instruction::new(Opcode::Sto, level, offset)
    }

    pub fn cal(level: i64, address: i64) -> Self {
        Instruction::new(Opcode::Cal, level, address)
    }

    pub fn int(n: i64) -> Self {
        Instruction::new(Opcode::Int, 0, n)
    }

    pub fn jmp(address: i64) -> Self {
        Instruction::new(Opcode::Jmp, 0, address)
    }

    pub fn jpc(address: i64) -> Self {
        Instruction::new(Opcode::Jpc, 0, address)
    }

    pub fn det() -> Self {
        Instruction::new(Opcode::Det, 0, 0)
    }

    /// Overwrite this instruction's `value` in place. Used to back-patch a
    /// forward jump once its target address is known.
    pub fn patch(&mut self, value: i64) {
        self.value = value;
    }

    /// The operation this instruction performs, if it's an `OPR`.
    pub fn operation(&self) -> Option<Operation> {
        if self.op == Opcode::Opr {
            Operation::from_code(self.value)
        } else {
            None
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.operation() {
            Some(operation) => write!(f, "{} {} {}  ; {}", self.op, self.level, self.value, operation),
            None => write!(f, "{} {} {}", self.op, self.level, self.value),
        }
    }
}
