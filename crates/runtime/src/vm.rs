//! The PL/0 Virtual Machine
//! =========================
//!
//! The VM consists of two data stores and three registers.
//!
//! Stores
//! ------
//! `code` - a read-only segment of instructions to execute.
//! `data` - a read-write segment organized as a stack.
//!
//! Registers
//! ---------
//! `sp` - index of the top element of `data` (`-1` when empty).
//! `pc` - index of the next instruction to fetch from `code`.
//! `bp` - index of the base of the most recently allocated stack frame.
//!
//! Stack frames
//! ------------
//! Every procedure invocation's frame begins with three book-keeping
//! words before its local variables:
//!
//! ```text
//!   bp+0: SL  (static link)  - base of the lexically enclosing frame
//!   bp+1: DL  (dynamic link) - base of the caller's frame
//!   bp+2: RA  (return addr)  - code index to resume at after RETURN
//!   bp+3.. local variables
//!   bp-1, bp-2, ... parameters, pushed by the caller below its frame
//! ```
//!
//! A frame with `DL = 0` is the global frame; `RETURN`ing from it halts
//! the VM (`pc` becomes `0`).

use std::io::{self, BufRead, Write};
use std::rc::Rc;

use pl0_core::{Instruction, Opcode, Operation};

use crate::arithmetic::{floor_div, odd};
use crate::config::VmConfig;
use crate::error::VmError;

/// A single stack machine run. Constructed fresh for each execution of a
/// compiled program — `code` is a cheaply-clonable `Rc<[Instruction]>` so
/// the same compiled program can be run repeatedly without recompiling,
/// each run getting its own `data` segment and registers.
pub struct Vm<W: Write> {
    code: Rc<[Instruction]>,
    data: Vec<i64>,
    capacity: usize,
    pc: usize,
    bp: usize,
    sp: i64,
    debug: bool,
    interactive: bool,
    out: W,
}

impl<W: Write> Vm<W> {
    pub fn new(code: Rc<[Instruction]>, config: VmConfig, out: W) -> Self {
        let mut data = vec![0i64; config.stack_size];
        // Global frame's SL, DL, RA all start at zero.
        if config.stack_size >= 3 {
            data[0] = 0;
            data[1] = 0;
            data[2] = 0;
        }
        Vm {
            code,
            data,
            capacity: config.stack_size,
            pc: 0,
            bp: 0,
            sp: -1,
            debug: config.debug,
            interactive: config.interactive,
            out,
        }
    }

    /// Current contents of the data segment, `0..=sp`. Exposed for tests
    /// that assert frame discipline (spec.md §8's "Frame discipline"
    /// property) and for snapshot-style assertions.
    pub fn stack(&self) -> &[i64] {
        if self.sp < 0 {
            &[]
        } else {
            &self.data[..=self.sp as usize]
        }
    }

    pub fn bp(&self) -> usize {
        self.bp
    }

    pub fn sp(&self) -> i64 {
        self.sp
    }

    pub fn into_writer(self) -> W {
        self.out
    }

    /// Run to completion: fetch-decode-execute until a `RETURN` from the
    /// global frame sets `pc` back to zero, or a fatal error occurs.
    pub fn run(&mut self) -> Result<(), VmError> {
        loop {
            let instruction = *self
                .code
                .get(self.pc)
                .ok_or(VmError::UndefinedOpcode { pc: self.pc })?;
            self.pc += 1;

            if self.debug {
                self.report_debug_state(instruction);
            }

            self.execute(instruction)?;

            if self.pc == 0 {
                break;
            }
        }
        Ok(())
    }

    fn execute(&mut self, instruction: Instruction) -> Result<(), VmError> {
        let Instruction { op, level, value } = instruction;
        match op {
            Opcode::Lit => self.push(value)?,
            Opcode::Opr => self.perform_operation(value)?,
            Opcode::Lod => {
                let addr = self.base_at(level) as i64 + value;
                let loaded = self.data[addr as usize];
                self.push(loaded)?;
            }
            Opcode::Sto => {
                let addr = self.base_at(level) as i64 + value;
                let popped = self.pop();
                self.data[addr as usize] = popped;
            }
            Opcode::Cal => {
                let sl = self.base_at(level) as i64;
                self.ensure_capacity((self.sp + 3) as usize)?;
                self.data[(self.sp + 1) as usize] = sl;
                self.data[(self.sp + 2) as usize] = self.bp as i64;
                self.data[(self.sp + 3) as usize] = self.pc as i64;
                self.bp = (self.sp + 1) as usize;
                self.pc = value as usize;
            }
            Opcode::Int => {
                self.ensure_capacity((self.sp + value) as usize)?;
                self.sp += value;
            }
            Opcode::Jmp => self.pc = value as usize,
            Opcode::Jpc => {
                let popped = self.pop();
                if popped == 0 {
                    self.pc = value as usize;
                }
            }
            Opcode::Det => self.sp -= 1,
        }
        Ok(())
    }

    fn perform_operation(&mut self, code: i64) -> Result<(), VmError> {
        let operation = Operation::from_code(code)
            .ok_or(VmError::UndefinedOpcode { pc: self.pc - 1 })?;
        match operation {
            Operation::Return => {
                self.sp = self.bp as i64 - 1;
                self.pc = self.data[(self.sp + 3) as usize] as usize;
                self.bp = self.data[(self.sp + 2) as usize] as usize;
            }
            Operation::Add => self.binary(|l, r| Ok(l + r))?,
            Operation::Sub => self.binary(|l, r| Ok(l - r))?,
            Operation::Mult => self.binary(|l, r| Ok(l * r))?,
            Operation::Div => self.binary(|l, r| {
                if r == 0 {
                    Err(VmError::DivisionByZero)
                } else {
                    Ok(floor_div(l, r))
                }
            })?,
            Operation::Equal => self.binary(|l, r| Ok((l == r) as i64))?,
            Operation::NotEqual => self.binary(|l, r| Ok((l != r) as i64))?,
            Operation::Less => self.binary(|l, r| Ok((l < r) as i64))?,
            Operation::LessEqual => self.binary(|l, r| Ok((l <= r) as i64))?,
            Operation::Greater => self.binary(|l, r| Ok((l > r) as i64))?,
            Operation::GreaterEqual => self.binary(|l, r| Ok((l >= r) as i64))?,
            Operation::Negate => {
                let top = self.sp as usize;
                self.data[top] = -self.data[top];
            }
            Operation::Odd => {
                let popped = self.pop();
                self.push(odd(popped))?;
            }
            Operation::Write => {
                let top = self.data[self.sp as usize];
                let _ = writeln!(self.out, "{top}");
            }
            Operation::Debug => self.debug = true,
        }
        Ok(())
    }

    fn binary(&mut self, f: impl FnOnce(i64, i64) -> Result<i64, VmError>) -> Result<(), VmError> {
        let rhs = self.pop();
        let lhs = self.pop();
        let result = f(lhs, rhs)?;
        self.push(result)
    }

    /// Follow the static-link chain `level` times from the current `bp`.
    fn base_at(&self, level: i64) -> usize {
        let mut base = self.bp;
        for _ in 0..level {
            base = self.data[base] as usize;
        }
        base
    }

    fn push(&mut self, value: i64) -> Result<(), VmError> {
        self.ensure_capacity((self.sp + 1) as usize)?;
        self.sp += 1;
        self.data[self.sp as usize] = value;
        Ok(())
    }

    fn pop(&mut self) -> i64 {
        let value = self.data[self.sp as usize];
        self.sp -= 1;
        value
    }

    fn ensure_capacity(&self, index: usize) -> Result<(), VmError> {
        if index >= self.capacity {
            Err(VmError::StackOverflow {
                capacity: self.capacity,
            })
        } else {
            Ok(())
        }
    }

    fn report_debug_state(&mut self, next: Instruction) {
        if !self.interactive {
            return;
        }
        eprintln!(
            "pc={} bp={} sp={} next={}",
            self.pc - 1,
            self.bp,
            self.sp,
            next
        );
        eprintln!("data[0..=sp] = {:?}", self.stack());
        eprint!("> ");
        let _ = io::stderr().flush();
        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_ok() && line.trim().eq_ignore_ascii_case("q")
        {
            self.debug = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pl0_core::{Instruction, Operation};

    fn run_program(code: Vec<Instruction>) -> (Vec<i64>, String) {
        let mut out = Vec::new();
        let rc: Rc<[Instruction]> = code.into();
        let mut vm = Vm::new(rc, VmConfig::new().with_interactive(false), &mut out);
        vm.run().expect("program runs to completion");
        let stack = vm.stack().to_vec();
        drop(vm);
        (stack, String::from_utf8(out).unwrap())
    }

    #[test]
    fn write_does_not_pop() {
        // JMP 0 1; INT 0 3; LIT 0 42; OPR 0 WRITE; OPR 0 RETURN
        let code = vec![
            Instruction::jmp(1),
            Instruction::int(3),
            Instruction::lit(42),
            Instruction::opr(Operation::Write),
            Instruction::opr(Operation::Return),
        ];
        let (stack, out) = run_program(code);
        assert_eq!(out, "42\n");
        assert_eq!(stack.last(), Some(&42));
    }

    #[test]
    fn division_by_zero_is_fatal() {
        let code = vec![
            Instruction::jmp(1),
            Instruction::int(3),
            Instruction::lit(1),
            Instruction::lit(0),
            Instruction::opr(Operation::Div),
            Instruction::opr(Operation::Return),
        ];
        let mut out = Vec::new();
        let rc: Rc<[Instruction]> = code.into();
        let mut vm = Vm::new(rc, VmConfig::new().with_interactive(false), &mut out);
        assert_eq!(vm.run(), Err(VmError::DivisionByZero));
    }

    #[test]
    fn stack_overflow_is_fatal_not_a_panic() {
        let code = vec![Instruction::jmp(1), Instruction::int(10)];
        let mut out = Vec::new();
        let rc: Rc<[Instruction]> = code.into();
        let config = VmConfig::new().with_stack_size(3).with_interactive(false);
        let mut vm = Vm::new(rc, config, &mut out);
        assert_eq!(
            vm.run(),
            Err(VmError::StackOverflow { capacity: 3 })
        );
    }

    #[test]
    fn debug_opcode_arms_debug_mode_without_blocking() {
        let code = vec![
            Instruction::jmp(1),
            Instruction::int(3),
            Instruction::opr(Operation::Debug),
            Instruction::opr(Operation::Return),
        ];
        let mut out = Vec::new();
        let rc: Rc<[Instruction]> = code.into();
        let mut vm = Vm::new(rc, VmConfig::new().with_interactive(false), &mut out);
        vm.run().unwrap();
        assert!(vm.debug);
    }

    #[test]
    fn frame_discipline_restores_registers_after_call() {
        // A single parameterless procedure that writes a constant, called
        // once from the main block.
        // code: JMP 0 6; JMP 0 2; INT 0 3; LIT 0 7; OPR 0 WRITE; OPR 0 RETURN;
        //       INT 0 3; CAL 0 2; OPR 0 RETURN
        let code = vec![
            Instruction::jmp(6),
            Instruction::jmp(2),
            Instruction::int(3),
            Instruction::lit(7),
            Instruction::opr(Operation::Write),
            Instruction::opr(Operation::Return),
            Instruction::int(3),
            Instruction::cal(0, 2),
            Instruction::opr(Operation::Return),
        ];
        let mut out = Vec::new();
        let rc: Rc<[Instruction]> = code.into();
        let mut vm = Vm::new(rc, VmConfig::new().with_interactive(false), &mut out);
        let bp_before = vm.bp;
        let sp_before = vm.sp;
        vm.run().unwrap();
        assert_eq!(vm.bp, bp_before);
        assert_eq!(vm.sp, sp_before);
    }
}
