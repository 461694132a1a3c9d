//! Recursive-descent parser producing the template AST.
//!
//! Precedence, lowest first: ternary, `or`, `and`, equality, comparison,
//! additive, multiplicative, unary, power, postfix (member, index, call).
//! Nesting is capped so hostile input cannot overflow the stack. Runs of
//! the same precedence level (`a + b - c`, `x and y and z`) parse into one
//! flat node, so a long run costs no depth.

use crate::error::EvaluationError;
use crate::lexer::{tokenize, LexKind, Lexeme};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Neg,
    Plus,
    Not,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Pow,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Pow => "^",
            BinaryOp::Eq => "==",
            BinaryOp::NotEq => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::LtEq => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::GtEq => ">=",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Null,
    Bool(bool),
    Number(f64),
    Str(String),
    Ident(String),
    Array(Vec<Expr>),
    Object(Vec<(String, Expr)>),
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    /// Only used for `^`, which is right-associative.
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// Left-associative run: `first op1 e1 op2 e2 ...`.
    Chain {
        first: Box<Expr>,
        rest: Vec<(BinaryOp, Expr)>,
    },
    /// Two or more operands joined by the same operator.
    Logical {
        op: LogicalOp,
        operands: Vec<Expr>,
    },
    Conditional {
        condition: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    Member {
        object: Box<Expr>,
        property: String,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
}

/// Parse a complete template source.
pub fn parse(src: &str, max_depth: usize) -> Result<Expr, EvaluationError> {
    let lexemes = tokenize(src)?;
    let mut parser = Parser {
        lexemes,
        pos: 0,
        depth: 0,
        max_depth,
    };
    if parser.peek() == &LexKind::Eof {
        return Err(EvaluationError::syntax(0, "empty expression"));
    }
    let expr = parser.expression()?;
    match parser.peek() {
        LexKind::Eof => Ok(expr),
        other => Err(EvaluationError::syntax(
            parser.offset(),
            format!("unexpected {}", other.describe()),
        )),
    }
}

struct Parser {
    lexemes: Vec<Lexeme>,
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl Parser {
    // -----------------------------------------------------------------
    // Cursor helpers
    // -----------------------------------------------------------------

    fn peek(&self) -> &LexKind {
        // tokenize always terminates the stream with Eof
        &self.lexemes[self.pos.min(self.lexemes.len() - 1)].kind
    }

    fn offset(&self) -> usize {
        self.lexemes[self.pos.min(self.lexemes.len() - 1)].offset
    }

    fn advance(&mut self) -> LexKind {
        let kind = self.peek().clone();
        if self.pos < self.lexemes.len() - 1 {
            self.pos += 1;
        }
        kind
    }

    fn eat(&mut self, kind: &LexKind) -> bool {
        if self.peek() == kind {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: LexKind) -> Result<(), EvaluationError> {
        if self.eat(&kind) {
            Ok(())
        } else {
            Err(EvaluationError::syntax(
                self.offset(),
                format!("expected {}, found {}", kind.describe(), self.peek().describe()),
            ))
        }
    }

    fn enter(&mut self) -> Result<(), EvaluationError> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(EvaluationError::DepthLimitExceeded(self.max_depth));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // -----------------------------------------------------------------
    // Grammar
    // -----------------------------------------------------------------

    fn expression(&mut self) -> Result<Expr, EvaluationError> {
        self.enter()?;
        let expr = self.ternary();
        self.leave();
        expr
    }

    fn ternary(&mut self) -> Result<Expr, EvaluationError> {
        let condition = self.logic_or()?;
        if !self.eat(&LexKind::Question) {
            return Ok(condition);
        }
        let then = self.expression()?;
        self.expect(LexKind::Colon)?;
        let otherwise = self.expression()?;
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn logic_or(&mut self) -> Result<Expr, EvaluationError> {
        self.logical(LogicalOp::Or, Self::logic_and, |kind| {
            matches!(kind, LexKind::Or | LexKind::OrOr)
        })
    }

    fn logic_and(&mut self) -> Result<Expr, EvaluationError> {
        self.logical(LogicalOp::And, Self::equality, |kind| {
            matches!(kind, LexKind::And | LexKind::AndAnd)
        })
    }

    fn equality(&mut self) -> Result<Expr, EvaluationError> {
        self.chain(Self::comparison, |kind| match kind {
            LexKind::EqEq => Some(BinaryOp::Eq),
            LexKind::NotEq => Some(BinaryOp::NotEq),
            _ => None,
        })
    }

    fn comparison(&mut self) -> Result<Expr, EvaluationError> {
        self.chain(Self::additive, |kind| match kind {
            LexKind::Lt => Some(BinaryOp::Lt),
            LexKind::LtEq => Some(BinaryOp::LtEq),
            LexKind::Gt => Some(BinaryOp::Gt),
            LexKind::GtEq => Some(BinaryOp::GtEq),
            _ => None,
        })
    }

    fn additive(&mut self) -> Result<Expr, EvaluationError> {
        self.chain(Self::multiplicative, |kind| match kind {
            LexKind::Plus => Some(BinaryOp::Add),
            LexKind::Minus => Some(BinaryOp::Sub),
            _ => None,
        })
    }

    fn multiplicative(&mut self) -> Result<Expr, EvaluationError> {
        self.chain(Self::unary, |kind| match kind {
            LexKind::Star => Some(BinaryOp::Mul),
            LexKind::Slash => Some(BinaryOp::Div),
            LexKind::Percent | LexKind::Mod => Some(BinaryOp::Rem),
            _ => None,
        })
    }

    fn chain(
        &mut self,
        operand: fn(&mut Self) -> Result<Expr, EvaluationError>,
        operator: fn(&LexKind) -> Option<BinaryOp>,
    ) -> Result<Expr, EvaluationError> {
        let first = operand(self)?;
        let mut rest = Vec::new();
        while let Some(op) = operator(self.peek()) {
            self.advance();
            rest.push((op, operand(self)?));
        }
        if rest.is_empty() {
            return Ok(first);
        }
        Ok(Expr::Chain {
            first: Box::new(first),
            rest,
        })
    }

    fn logical(
        &mut self,
        op: LogicalOp,
        operand: fn(&mut Self) -> Result<Expr, EvaluationError>,
        is_operator: fn(&LexKind) -> bool,
    ) -> Result<Expr, EvaluationError> {
        let first = operand(self)?;
        if !is_operator(self.peek()) {
            return Ok(first);
        }
        let mut operands = vec![first];
        while is_operator(self.peek()) {
            self.advance();
            operands.push(operand(self)?);
        }
        Ok(Expr::Logical { op, operands })
    }

    fn unary(&mut self) -> Result<Expr, EvaluationError> {
        let op = match self.peek() {
            LexKind::Minus => UnaryOp::Neg,
            LexKind::Plus => UnaryOp::Plus,
            LexKind::Bang | LexKind::Not => UnaryOp::Not,
            _ => return self.power(),
        };
        self.advance();
        self.enter()?;
        let operand = self.unary();
        self.leave();
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand?),
        })
    }

    fn power(&mut self) -> Result<Expr, EvaluationError> {
        let base = self.postfix()?;
        if !self.eat(&LexKind::Caret) {
            return Ok(base);
        }
        self.enter()?;
        let exponent = self.unary();
        self.leave();
        Ok(binary(BinaryOp::Pow, base, exponent?))
    }

    /// Every member, index or call link nests the tree one level, so each
    /// one is charged against the depth budget until the chain ends.
    fn postfix(&mut self) -> Result<Expr, EvaluationError> {
        let mut links = 0;
        let result = self.postfix_links(&mut links);
        self.depth -= links;
        result
    }

    fn postfix_links(&mut self, links: &mut usize) -> Result<Expr, EvaluationError> {
        let mut expr = self.primary()?;
        loop {
            if matches!(self.peek(), LexKind::Dot | LexKind::LBracket | LexKind::LParen) {
                *links += 1;
                self.enter()?;
            }
            match self.peek() {
                LexKind::Dot => {
                    self.advance();
                    let offset = self.offset();
                    let property = match self.advance() {
                        LexKind::Ident(name) => name,
                        other => {
                            return Err(EvaluationError::syntax(
                                offset,
                                format!("expected property name, found {}", other.describe()),
                            ))
                        }
                    };
                    expr = Expr::Member {
                        object: Box::new(expr),
                        property,
                    };
                }
                LexKind::LBracket => {
                    self.advance();
                    let index = self.expression()?;
                    self.expect(LexKind::RBracket)?;
                    expr = Expr::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    };
                }
                LexKind::LParen => {
                    self.advance();
                    let args = self.list(LexKind::RParen)?;
                    expr = Expr::Call {
                        callee: Box::new(expr),
                        args,
                    };
                }
                _ => return Ok(expr),
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, EvaluationError> {
        let offset = self.offset();
        match self.advance() {
            LexKind::Number(n) => Ok(Expr::Number(n)),
            LexKind::Str(s) => Ok(Expr::Str(s)),
            LexKind::True => Ok(Expr::Bool(true)),
            LexKind::False => Ok(Expr::Bool(false)),
            LexKind::Null => Ok(Expr::Null),
            LexKind::Ident(name) => Ok(Expr::Ident(name)),
            LexKind::LParen => {
                let inner = self.expression()?;
                self.expect(LexKind::RParen)?;
                Ok(inner)
            }
            LexKind::LBracket => Ok(Expr::Array(self.list(LexKind::RBracket)?)),
            LexKind::LBrace => self.object(),
            other => Err(EvaluationError::syntax(
                offset,
                format!("unexpected {}", other.describe()),
            )),
        }
    }

    /// Comma-separated expressions up to and including `close`.
    fn list(&mut self, close: LexKind) -> Result<Vec<Expr>, EvaluationError> {
        let mut items = Vec::new();
        if self.eat(&close) {
            return Ok(items);
        }
        loop {
            items.push(self.expression()?);
            if self.eat(&close) {
                return Ok(items);
            }
            self.expect(LexKind::Comma)?;
        }
    }

    fn object(&mut self) -> Result<Expr, EvaluationError> {
        let mut fields = Vec::new();
        if self.eat(&LexKind::RBrace) {
            return Ok(Expr::Object(fields));
        }
        loop {
            let offset = self.offset();
            let key = match self.advance() {
                LexKind::Ident(name) => name,
                LexKind::Str(s) => s,
                other => {
                    return Err(EvaluationError::syntax(
                        offset,
                        format!("expected object key, found {}", other.describe()),
                    ))
                }
            };
            self.expect(LexKind::Colon)?;
            fields.push((key, self.expression()?));
            if self.eat(&LexKind::RBrace) {
                return Ok(Expr::Object(fields));
            }
            self.expect(LexKind::Comma)?;
        }
    }
}

fn binary(op: BinaryOp, lhs: Expr, rhs: Expr) -> Expr {
    Expr::Binary {
        op,
        lhs: Box::new(lhs),
        rhs: Box::new(rhs),
    }
}
