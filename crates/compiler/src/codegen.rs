//! AST to instruction stream.
//!
//! A single linear pass with forward-branch back-patching (spec §4.C,
//! §9 "Forward-branch patching"). Scope is a stack of flat maps rather
//! than a true chained dictionary — push/pop is scope entry/exit, and
//! lookup walks the stack top-down, which is what a `ChainMap` gives you
//! for free and a `Vec<HashMap<_, _>>` gives you with one extra loop.
//!
//! The compiler trusts the AST is well-formed (spec §7.2 — the parser is
//! the only validator). [`CodegenError`] exists for the one case that
//! isn't actually guaranteed by construction: a reference to a name not
//! present in any enclosing scope, which would be a bug in this module
//! or the parser rather than a malformed program, but is cheap to check
//! and not worth a panic.

use std::collections::HashMap;
use std::fmt;

use pl0_core::{Instruction, Operation};

use crate::ast::Node;
use crate::lexer::Symbol;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodegenError {
    UnresolvedIdentifier(String),
    UnresolvedProcedure(String),
}

impl fmt::Display for CodegenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodegenError::UnresolvedIdentifier(name) => {
                write!(f, "codegen: no binding for identifier '{name}'")
            }
            CodegenError::UnresolvedProcedure(name) => {
                write!(f, "codegen: no binding for procedure '{name}'")
            }
        }
    }
}

impl std::error::Error for CodegenError {}

#[derive(Debug, Clone)]
enum Binding {
    Const { value: i64 },
    Var { level: usize, offset: i64 },
    Parameter { level: usize, offset: i64 },
    Procedure { level: usize, address: usize },
}

/// Walks an AST, emitting a flat `Vec<Instruction>`. One `Generator` per
/// compiled program; internal scope stack exists only for the duration of
/// `generate`.
pub struct Generator {
    scope: Vec<HashMap<String, Binding>>,
    code: Vec<Instruction>,
}

impl Generator {
    pub fn generate(blocks: &[Node]) -> Result<Vec<Instruction>, CodegenError> {
        let mut generator = Generator {
            scope: vec![HashMap::new()],
            code: Vec::new(),
        };
        let jmp_idx = generator.emit(Instruction::jmp(0));
        for node in blocks {
            if Self::should_fixup(node) {
                generator.fixup(jmp_idx);
            }
            generator.visit(node)?;
        }
        generator.emit(Instruction::opr(Operation::Return));
        Ok(generator.code)
    }

    fn emit(&mut self, instruction: Instruction) -> usize {
        self.code.push(instruction);
        self.code.len() - 1
    }

    fn should_fixup(node: &Node) -> bool {
        !matches!(node, Node::Const { .. } | Node::Var { .. } | Node::Procedure { .. })
    }

    /// Back-patch the placeholder `JMP` at `jmp_idx` to the current code
    /// position, then reserve frame space for SL/DL/RA plus every `Var`
    /// declared so far in the current (innermost) scope.
    fn fixup(&mut self, jmp_idx: usize) {
        let var_count = self.declaration_count();
        let target = self.code.len();
        self.code[jmp_idx].patch(target as i64);
        self.emit(Instruction::int(var_count + 3));
    }

    fn declaration_count(&self) -> i64 {
        self.scope
            .last()
            .expect("scope stack is never empty during generate")
            .values()
            .filter(|b| matches!(b, Binding::Var { .. }))
            .count() as i64
    }

    fn current_level(&self) -> usize {
        self.scope.len() - 1
    }

    fn push_scope(&mut self) {
        self.scope.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scope.pop();
    }

    fn lookup(&self, name: &str) -> Option<&Binding> {
        self.scope.iter().rev().find_map(|map| map.get(name))
    }

    fn visit(&mut self, node: &Node) -> Result<(), CodegenError> {
        match node {
            Node::Const { name, value } => {
                self.scope
                    .last_mut()
                    .expect("scope stack is never empty")
                    .insert(name.clone(), Binding::Const { value: *value });
                Ok(())
            }
            Node::Var { name } => {
                let offset = self.declaration_count() + 3;
                let level = self.current_level();
                self.scope
                    .last_mut()
                    .expect("scope stack is never empty")
                    .insert(name.clone(), Binding::Var { level, offset });
                Ok(())
            }
            Node::Procedure {
                name,
                parameters,
                blocks,
            } => self.visit_procedure(name, parameters, blocks),
            Node::Assignment { name, value } => self.visit_assignment(name, value),
            Node::Call { name, arguments } => self.visit_call(name, arguments),
            Node::Block { statements } => {
                for statement in statements {
                    self.visit(statement)?;
                }
                Ok(())
            }
            Node::If { condition, body } => {
                self.visit(condition)?;
                let jpc_idx = self.emit(Instruction::jpc(0));
                self.visit(body)?;
                let target = self.code.len() as i64;
                self.code[jpc_idx].patch(target);
                Ok(())
            }
            Node::Loop { condition, body } => {
                let cond_idx = self.code.len() as i64;
                self.visit(condition)?;
                let jpc_idx = self.emit(Instruction::jpc(0));
                self.visit(body)?;
                self.emit(Instruction::jmp(cond_idx));
                let target = self.code.len() as i64;
                self.code[jpc_idx].patch(target);
                Ok(())
            }
            Node::Output { value } => {
                self.visit(value)?;
                self.emit(Instruction::opr(Operation::Write));
                Ok(())
            }
            Node::Debug => {
                self.emit(Instruction::opr(Operation::Debug));
                Ok(())
            }
            Node::Binary { op, left, right } => {
                self.visit(left)?;
                self.visit(right)?;
                self.emit(Instruction::opr(operation_for(*op)));
                Ok(())
            }
            Node::Unary { right, .. } => {
                self.visit(right)?;
                self.emit(Instruction::opr(Operation::Negate));
                Ok(())
            }
            Node::Odd { expression } => {
                self.visit(expression)?;
                self.emit(Instruction::opr(Operation::Odd));
                Ok(())
            }
            Node::Identifier { name } => self.visit_identifier(name),
            Node::Number { value } => {
                self.emit(Instruction::lit(*value));
                Ok(())
            }
            Node::Grouping { expression } => self.visit(expression),
        }
    }

    fn visit_procedure(
        &mut self,
        name: &str,
        parameters: &[String],
        blocks: &[Node],
    ) -> Result<(), CodegenError> {
        let level = self.current_level();
        // Bind at the outer level first so recursive calls resolve.
        self.scope
            .last_mut()
            .expect("scope stack is never empty")
            .insert(
                name.to_string(),
                Binding::Procedure { level, address: 0 },
            );

        self.push_scope();
        for (i, param) in parameters.iter().enumerate() {
            let offset = -((i + 1) as i64);
            let param_level = self.current_level();
            self.scope
                .last_mut()
                .expect("scope stack is never empty")
                .insert(
                    param.clone(),
                    Binding::Parameter {
                        level: param_level,
                        offset,
                    },
                );
        }

        let jmp_idx = self.emit(Instruction::jmp(0));
        let mut address = None;
        for block in blocks {
            // A block's statement list has at most one executable node
            // (the trailing statement; everything before it is a
            // declaration), so this triggers at most once.
            if Self::should_fixup(block) {
                self.fixup(jmp_idx);
                address = Some(self.code[jmp_idx].value as usize);
            }
            self.visit(block)?;
        }
        self.emit(Instruction::opr(Operation::Return));
        self.pop_scope();

        if let Some(address) = address {
            if let Some(Binding::Procedure {
                address: slot, ..
            }) = self
                .scope
                .last_mut()
                .expect("scope stack is never empty")
                .get_mut(name)
            {
                *slot = address;
            }
        }
        Ok(())
    }

    fn visit_assignment(&mut self, name: &str, value: &Node) -> Result<(), CodegenError> {
        let cur_level = self.current_level();
        let (level, offset) = match self.lookup(name) {
            Some(Binding::Var { level, offset }) => (*level, *offset),
            Some(Binding::Parameter { level, offset }) => (*level, *offset),
            _ => return Err(CodegenError::UnresolvedIdentifier(name.to_string())),
        };
        self.visit(value)?;
        self.emit(Instruction::sto((cur_level - level) as i64, offset));
        Ok(())
    }

    fn visit_call(&mut self, name: &str, arguments: &[Node]) -> Result<(), CodegenError> {
        let cur_level = self.current_level();
        let (level, address) = match self.lookup(name) {
            Some(Binding::Procedure { level, address }) => (*level, *address),
            _ => return Err(CodegenError::UnresolvedProcedure(name.to_string())),
        };
        for argument in arguments.iter().rev() {
            self.visit(argument)?;
        }
        self.emit(Instruction::cal((cur_level - level) as i64, address as i64));
        for _ in arguments {
            self.emit(Instruction::det());
        }
        Ok(())
    }

    fn visit_identifier(&mut self, name: &str) -> Result<(), CodegenError> {
        let cur_level = self.current_level();
        match self.lookup(name) {
            Some(Binding::Const { value }) => {
                self.emit(Instruction::lit(*value));
                Ok(())
            }
            Some(Binding::Var { level, offset }) => {
                self.emit(Instruction::lod((cur_level - level) as i64, *offset));
                Ok(())
            }
            Some(Binding::Parameter { level, offset }) => {
                self.emit(Instruction::lod((cur_level - level) as i64, *offset));
                Ok(())
            }
            _ => Err(CodegenError::UnresolvedIdentifier(name.to_string())),
        }
    }
}

fn operation_for(op: Symbol) -> Operation {
    match op {
        Symbol::Plus => Operation::Add,
        Symbol::Minus => Operation::Sub,
        Symbol::Times => Operation::Mult,
        Symbol::Slash => Operation::Div,
        Symbol::Eql => Operation::Equal,
        Symbol::Neq => Operation::NotEqual,
        Symbol::Less => Operation::Less,
        Symbol::Leq => Operation::LessEqual,
        Symbol::Gtr => Operation::Greater,
        Symbol::Geq => Operation::GreaterEqual,
        other => unreachable!("parser never emits Binary with operator {other}"),
    }
}
