//! Recursive-descent parser: tokens to [`Program`].
//!
//! One token of lookahead (`self.token`), matching the grammar in spec
//! §4.B one production per method. Declaration tracking is intentionally
//! a single flat `HashMap` rather than a scope stack — see
//! [`Node`](crate::ast::Node)'s module docs and DESIGN.md for why this is
//! preserved from the original rather than "fixed".

use std::collections::HashMap;

use crate::ast::{Node, Program};
use crate::error::ParseError;
use crate::lexer::{Lexer, Symbol, Token};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DeclKind {
    Const,
    Var,
    Proc,
}

pub struct Parser<'a> {
    lexer: Lexer,
    token: Token,
    source: &'a str,
    declarations: HashMap<String, DeclKind>,
}

impl<'a> Parser<'a> {
    pub fn new(source: &'a str) -> Self {
        let trimmed = source.trim();
        let mut lexer = Lexer::new(trimmed);
        let token = lexer.get_token();
        Parser {
            lexer,
            token,
            source: trimmed,
            declarations: HashMap::new(),
        }
    }

    /// Parse a complete program. On failure, the returned [`ParseError`]
    /// is ready to print as-is; the caller decides what to do with a
    /// failed parse (the CLI writes it to stderr and exits non-zero).
    pub fn parse(source: &str) -> Result<Program, ParseError> {
        Parser::new(source).program()
    }

    fn advance(&mut self) -> Token {
        let current = std::mem::replace(&mut self.token, self.lexer.get_token());
        current
    }

    fn error(&self, code: u8) -> ParseError {
        ParseError::new(code, &self.token, self.source)
    }

    /// Consume the current token if it has symbol `symbol`, else raise
    /// `code`. Returns the consumed token so callers can read its payload.
    fn expect(&mut self, symbol: Symbol, code: u8) -> Result<Token, ParseError> {
        if self.token.symbol == symbol {
            Ok(self.advance())
        } else {
            Err(self.error(code))
        }
    }

    fn program(&mut self) -> Result<Program, ParseError> {
        let blocks = self.block()?;
        self.expect(Symbol::Period, 9)?;
        Ok(Program { blocks })
    }

    fn block(&mut self) -> Result<Vec<Node>, ParseError> {
        let mut blocks = Vec::new();

        if self.token.symbol == Symbol::Const {
            self.advance();
            blocks.push(self.const_declaration()?);
            while self.token.symbol == Symbol::Comma {
                self.advance();
                blocks.push(self.const_declaration()?);
            }
            self.expect(Symbol::Semicolon, 5)?;
        }

        if self.token.symbol == Symbol::Var {
            self.advance();
            blocks.push(self.var_declaration()?);
            while self.token.symbol == Symbol::Comma {
                self.advance();
                blocks.push(self.var_declaration()?);
            }
            self.expect(Symbol::Semicolon, 5)?;
        }

        while self.token.symbol == Symbol::Proc {
            self.advance();
            let name = self.expect_ident(4)?;
            self.declarations.insert(name.clone(), DeclKind::Proc);

            let parameters = if self.token.symbol == Symbol::LParen {
                self.advance();
                let mut params = vec![self.expect_ident(4)?];
                while self.token.symbol == Symbol::Comma {
                    self.advance();
                    params.push(self.expect_ident(4)?);
                }
                self.expect(Symbol::RParen, 22)?;
                params
            } else {
                Vec::new()
            };
            for param in &parameters {
                self.declarations.insert(param.clone(), DeclKind::Var);
            }

            self.expect(Symbol::Semicolon, 5)?;
            let body = self.block()?;
            self.expect(Symbol::Semicolon, 5)?;
            blocks.push(Node::Procedure {
                name,
                parameters,
                blocks: body,
            });
        }

        if let Some(statement) = self.statement()? {
            blocks.push(statement);
        }
        Ok(blocks)
    }

    fn const_declaration(&mut self) -> Result<Node, ParseError> {
        let name = self.expect_ident(4)?;
        self.expect(Symbol::Eql, 3)?;
        let number = self.expect(Symbol::Number, 2)?;
        let value = self.number_value(&number)?;
        self.declarations.insert(name.clone(), DeclKind::Const);
        Ok(Node::Const { name, value })
    }

    fn var_declaration(&mut self) -> Result<Node, ParseError> {
        let name = self.expect_ident(4)?;
        self.declarations.insert(name.clone(), DeclKind::Var);
        Ok(Node::Var { name })
    }

    fn statement(&mut self) -> Result<Option<Node>, ParseError> {
        match self.token.symbol {
            Symbol::Ident => {
                let name = self.token.ident().unwrap().to_string();
                match self.declarations.get(&name) {
                    None => return Err(self.error(11)),
                    Some(DeclKind::Var) => {}
                    Some(_) => return Err(self.error(12)),
                }
                self.advance();
                self.expect(Symbol::Becomes, 13)?;
                let value = Box::new(self.expression()?);
                Ok(Some(Node::Assignment { name, value }))
            }
            Symbol::Call => {
                self.advance();
                let name = self.expect_ident(14)?;
                match self.declarations.get(&name) {
                    None => return Err(self.error(11)),
                    Some(DeclKind::Proc) => {}
                    Some(_) => return Err(self.error(15)),
                }
                let arguments = if self.token.symbol == Symbol::LParen {
                    self.advance();
                    let mut args = vec![self.expression()?];
                    while self.token.symbol == Symbol::Comma {
                        self.advance();
                        args.push(self.expression()?);
                    }
                    self.expect(Symbol::RParen, 22)?;
                    args
                } else {
                    Vec::new()
                };
                Ok(Some(Node::Call { name, arguments }))
            }
            Symbol::If => {
                self.advance();
                let condition = Box::new(self.condition()?);
                self.expect(Symbol::Then, 16)?;
                let body = Box::new(self.statement_required()?);
                Ok(Some(Node::If { condition, body }))
            }
            Symbol::Begin => {
                self.advance();
                let mut statements = vec![self.statement_required()?];
                while self.token.symbol == Symbol::Semicolon {
                    self.advance();
                    if let Some(statement) = self.statement()? {
                        statements.push(statement);
                    }
                }
                self.expect(Symbol::End, 17)?;
                Ok(Some(Node::Block { statements }))
            }
            Symbol::While => {
                self.advance();
                let condition = Box::new(self.condition()?);
                self.expect(Symbol::Do, 18)?;
                let body = Box::new(self.statement_required()?);
                Ok(Some(Node::Loop { condition, body }))
            }
            Symbol::Write => {
                self.advance();
                let value = Box::new(self.expression()?);
                Ok(Some(Node::Output { value }))
            }
            Symbol::Debug => {
                self.advance();
                Ok(Some(Node::Debug))
            }
            _ => Ok(None),
        }
    }

    /// Like [`Self::statement`], but a missing statement is itself a
    /// parse error — used where the grammar requires one (`if ... then
    /// <statement>`, the first statement inside `begin ... end`).
    fn statement_required(&mut self) -> Result<Node, ParseError> {
        self.statement()?.ok_or_else(|| self.error(7))
    }

    fn condition(&mut self) -> Result<Node, ParseError> {
        if self.token.symbol == Symbol::Odd {
            self.advance();
            let expression = Box::new(self.expression()?);
            return Ok(Node::Odd { expression });
        }

        let left = self.expression()?;
        let relational = matches!(
            self.token.symbol,
            Symbol::Eql | Symbol::Neq | Symbol::Less | Symbol::Leq | Symbol::Gtr | Symbol::Geq
        );
        if !relational {
            return Err(self.error(20));
        }
        let op = self.token.symbol;
        self.advance();
        let right = self.expression()?;
        Ok(Node::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn expression(&mut self) -> Result<Node, ParseError> {
        let mut expr = if matches!(self.token.symbol, Symbol::Plus | Symbol::Minus) {
            let op = self.token.symbol;
            self.advance();
            if op == Symbol::Minus {
                Node::Unary {
                    op,
                    right: Box::new(self.term()?),
                }
            } else {
                self.term()?
            }
        } else {
            self.term()?
        };

        while matches!(self.token.symbol, Symbol::Plus | Symbol::Minus) {
            let op = self.token.symbol;
            self.advance();
            expr = Node::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(self.term()?),
            };
        }
        Ok(expr)
    }

    fn term(&mut self) -> Result<Node, ParseError> {
        let mut expr = self.factor()?;
        while matches!(self.token.symbol, Symbol::Times | Symbol::Slash) {
            let op = self.token.symbol;
            self.advance();
            expr = Node::Binary {
                op,
                left: Box::new(expr),
                right: Box::new(self.factor()?),
            };
        }
        Ok(expr)
    }

    fn factor(&mut self) -> Result<Node, ParseError> {
        match self.token.symbol {
            Symbol::Ident => {
                let name = self.token.ident().unwrap().to_string();
                match self.declarations.get(&name) {
                    None => return Err(self.error(11)),
                    Some(DeclKind::Proc) => return Err(self.error(21)),
                    Some(_) => {}
                }
                self.advance();
                Ok(Node::Identifier { name })
            }
            Symbol::Number => {
                let token = self.advance();
                let value = self.number_value(&token)?;
                Ok(Node::Number { value })
            }
            Symbol::LParen => {
                self.advance();
                let expression = Box::new(self.expression()?);
                self.expect(Symbol::RParen, 22)?;
                Ok(Node::Grouping { expression })
            }
            _ => Err(self.error(23)),
        }
    }

    fn expect_ident(&mut self, code: u8) -> Result<String, ParseError> {
        if self.token.symbol == Symbol::Ident {
            let name = self.token.ident().unwrap().to_string();
            self.advance();
            Ok(name)
        } else {
            Err(self.error(code))
        }
    }

    fn number_value(&self, token: &Token) -> Result<i64, ParseError> {
        if token.number_overflowed() {
            Err(ParseError::new(30, token, self.source))
        } else {
            Ok(token.number().expect("NUMBER token carries a value"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_program_is_an_empty_ast() {
        let program = Parser::parse(".").unwrap();
        assert_eq!(program.blocks, Vec::new());
    }

    #[test]
    fn condition_without_relational_operator_is_error_20() {
        let source = "var x; if 4 ~ 3 then x := 1.";
        let err = Parser::parse(source).unwrap_err();
        assert_eq!(err.code, 20);
    }

    #[test]
    fn missing_statement_after_then_is_error_7() {
        let source = "var x; if x = 0 then .";
        let err = Parser::parse(source).unwrap_err();
        assert_eq!(err.code, 7);
    }

    #[test]
    fn undeclared_identifier_is_error_11() {
        let source = "begin x := 1 end.";
        let err = Parser::parse(source).unwrap_err();
        assert_eq!(err.code, 11);
    }

    #[test]
    fn assignment_to_constant_is_error_12() {
        let source = "const a = 1; begin a := 2 end.";
        let err = Parser::parse(source).unwrap_err();
        assert_eq!(err.code, 12);
    }

    #[test]
    fn call_of_a_variable_is_error_15() {
        let source = "var x; begin call x end.";
        let err = Parser::parse(source).unwrap_err();
        assert_eq!(err.code, 15);
    }

    #[test]
    fn procedure_identifier_in_expression_is_error_21() {
        let source = "procedure p; ; begin write p end.";
        let err = Parser::parse(source).unwrap_err();
        assert_eq!(err.code, 21);
    }

    #[test]
    fn parses_square_program() {
        let source = "
            var x, squ;
            procedure square;
            begin
                squ := x * x
            end;
            begin
                x := 1;
                while x <= 10 do
                begin
                    call square;
                    write squ;
                    x := x + 1
                end
            end.
        ";
        let program = Parser::parse(source).unwrap();
        assert_eq!(program.blocks.len(), 4); // var x, var squ, procedure, main block
    }

    #[test]
    fn parses_recursive_procedure_with_parameters() {
        let source = "
            procedure fact(n);
            var r;
            begin
                if n = 0 then r := 1;
                if n > 0 then
                begin
                    call fact(n - 1);
                    r := n
                end
            end;
            begin
                call fact(5)
            end.
        ";
        let program = Parser::parse(source).unwrap();
        match &program.blocks[0] {
            Node::Procedure {
                name, parameters, ..
            } => {
                assert_eq!(name, "fact");
                assert_eq!(parameters, &vec!["n".to_string()]);
            }
            other => panic!("expected Procedure, got {other:?}"),
        }
    }
}
