//! Transpile an AST into an equivalent Python program.
//!
//! PL/0's only scoping rule that survives the trip to Python is that an
//! assignment to a name not already local to the current function needs a
//! `global` declaration first (spec §4.E). Everything else — nested
//! procedures becoming top-level `def`s, `odd e` becoming `e % 2 == 1`,
//! integer division staying floor (Python's `//` already floors) — is a
//! direct structural translation.
//!
//! Known bug preserved from upstream, *fixed* here per spec §9's redesign
//! note: `LEQ` (`<=`) must emit `<=`, not `>=`.

use std::collections::HashSet;
use std::fmt::{self, Write as _};

use crate::ast::Node;
use crate::lexer::Symbol;

const INDENT: &str = "    ";

#[derive(Debug)]
pub struct TranspileError(fmt::Error);

impl fmt::Display for TranspileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "transpile error: {}", self.0)
    }
}

impl std::error::Error for TranspileError {}

impl From<fmt::Error> for TranspileError {
    fn from(e: fmt::Error) -> Self {
        TranspileError(e)
    }
}

/// Renders an AST as Python source. One instance per translation.
pub struct PythonTranspiler {
    output: String,
    /// Names already local to the innermost function (or the module level
    /// for the outermost scope); an assignment to anything else needs a
    /// `global` statement first.
    scopes: Vec<HashSet<String>>,
    depth: usize,
}

impl PythonTranspiler {
    pub fn new() -> Self {
        PythonTranspiler {
            output: String::new(),
            scopes: vec![HashSet::new()],
            depth: 0,
        }
    }

    pub fn generate(blocks: &[Node]) -> Result<String, TranspileError> {
        let mut transpiler = PythonTranspiler::new();
        for node in blocks {
            transpiler.visit(node)?;
        }
        Ok(transpiler.output)
    }

    fn indent(&mut self) -> Result<(), TranspileError> {
        write!(self.output, "{}", INDENT.repeat(self.depth))?;
        Ok(())
    }

    fn visit(&mut self, node: &Node) -> Result<(), TranspileError> {
        match node {
            Node::Const { name, value } => {
                self.indent()?;
                writeln!(self.output, "{name} = {value}")?;
                Ok(())
            }
            Node::Var { name } => {
                self.indent()?;
                writeln!(self.output, "{name} = None")?;
                self.scopes
                    .last_mut()
                    .expect("scope stack is never empty")
                    .insert(name.clone());
                Ok(())
            }
            Node::Procedure {
                name,
                parameters,
                blocks,
            } => self.visit_procedure(name, parameters, blocks),
            Node::Assignment { name, value } => {
                if !self.scopes.last().unwrap().contains(name) {
                    self.indent()?;
                    writeln!(self.output, "global {name}")?;
                    self.scopes.last_mut().unwrap().insert(name.clone());
                }
                self.indent()?;
                write!(self.output, "{name} = ")?;
                self.visit(value)?;
                writeln!(self.output)?;
                Ok(())
            }
            Node::Call { name, arguments } => {
                self.indent()?;
                write!(self.output, "{name}(")?;
                for (i, argument) in arguments.iter().enumerate() {
                    if i > 0 {
                        write!(self.output, ", ")?;
                    }
                    self.visit(argument)?;
                }
                writeln!(self.output, ")")?;
                Ok(())
            }
            Node::Block { statements } => {
                for statement in statements {
                    self.visit(statement)?;
                }
                Ok(())
            }
            Node::If { condition, body } => {
                self.indent()?;
                write!(self.output, "if ")?;
                self.visit(condition)?;
                writeln!(self.output, ":")?;
                self.depth += 1;
                self.visit(body)?;
                self.depth -= 1;
                Ok(())
            }
            Node::Loop { condition, body } => {
                self.indent()?;
                write!(self.output, "while ")?;
                self.visit(condition)?;
                writeln!(self.output, ":")?;
                self.depth += 1;
                self.visit(body)?;
                self.depth -= 1;
                Ok(())
            }
            Node::Output { value } => {
                self.indent()?;
                write!(self.output, "print(")?;
                self.visit(value)?;
                writeln!(self.output, ")")?;
                Ok(())
            }
            Node::Debug => {
                self.indent()?;
                writeln!(self.output, "breakpoint()")?;
                Ok(())
            }
            Node::Odd { expression } => {
                self.visit(expression)?;
                write!(self.output, " % 2 == 1")?;
                Ok(())
            }
            Node::Binary { op, left, right } => {
                self.visit(left)?;
                write!(self.output, "{}", python_operator(*op))?;
                self.visit(right)?;
                Ok(())
            }
            Node::Unary { right, .. } => {
                write!(self.output, "-")?;
                self.visit(right)?;
                Ok(())
            }
            Node::Identifier { name } => {
                write!(self.output, "{name}")?;
                Ok(())
            }
            Node::Number { value } => {
                write!(self.output, "{value}")?;
                Ok(())
            }
            Node::Grouping { expression } => {
                write!(self.output, "(")?;
                self.visit(expression)?;
                write!(self.output, ")")?;
                Ok(())
            }
        }
    }

    fn visit_procedure(
        &mut self,
        name: &str,
        parameters: &[String],
        blocks: &[Node],
    ) -> Result<(), TranspileError> {
        self.indent()?;
        writeln!(self.output, "\ndef {name}({}):", parameters.join(", "))?;

        // Parameters are always local — never emit `global` for them.
        let locals: HashSet<String> = parameters.iter().cloned().collect();
        self.scopes.push(locals);
        self.depth += 1;
        for block in blocks {
            self.visit(block)?;
        }
        self.depth -= 1;
        self.scopes.pop();
        writeln!(self.output)?;
        Ok(())
    }
}

impl Default for PythonTranspiler {
    fn default() -> Self {
        PythonTranspiler::new()
    }
}

fn python_operator(op: Symbol) -> &'static str {
    match op {
        Symbol::Plus => " + ",
        Symbol::Minus => " - ",
        Symbol::Times => " * ",
        Symbol::Slash => " // ",
        Symbol::Eql => " == ",
        Symbol::Neq => " != ",
        Symbol::Less => " < ",
        Symbol::Geq => " >= ",
        Symbol::Gtr => " > ",
        Symbol::Leq => " <= ",
        other => unreachable!("parser never emits Binary with operator {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;

    fn transpile(source: &str) -> String {
        let program = Parser::parse(source).expect("source parses");
        PythonTranspiler::generate(&program.blocks).expect("transpile succeeds")
    }

    #[test]
    fn leq_maps_to_less_equal_not_greater_equal() {
        let out = transpile("var x; begin if x <= 1 then write x end.");
        assert!(out.contains("if x <= 1:"), "got: {out}");
        assert!(!out.contains(">="), "got: {out}");
    }

    #[test]
    fn outer_var_assignment_inside_procedure_gets_global() {
        let out = transpile(
            "var x; procedure bump; begin x := x + 1 end; begin call bump end.",
        );
        assert!(out.contains("global x"), "got: {out}");
    }

    #[test]
    fn procedure_parameters_become_function_parameters_without_global() {
        let out = transpile("procedure p(a); begin write a end; begin call p(1) end.");
        assert!(out.contains("def p(a):"), "got: {out}");
        assert!(!out.contains("global a"), "got: {out}");
    }

    #[test]
    fn odd_becomes_modulo_check() {
        let out = transpile("begin if odd 7 then write 1 end.");
        assert!(out.contains("7 % 2 == 1"), "got: {out}");
    }
}
