use dotpipe_ast::{ast::*, span::Span};
use dotpipe_lexer::{lex_skip_comments, LexError, Lexed, Tok};

#[derive(thiserror::Error, Debug)]
pub enum ParseError {
    #[error("parse error: {0}")]
    Generic(String),
    #[error("parse error: unexpected {found} at offset {}", span.offset)]
    Unexpected { found: String, span: Span },
    #[error("parse error: {0}")]
    Lex(#[from] LexError),
}

/// Parse a whole program: statements separated by newlines or `;`.
pub fn parse_program(src: &str) -> Result<Vec<Expr>, ParseError> {
    let toks = lex_skip_comments(src)?;
    let mut p = Parser { toks, i: 0, nesting: vec![false] };
    let stmts = p.statements(None)?;
    if let Some(t) = p.toks.get(p.i) {
        return Err(unexpected(t));
    }
    Ok(stmts)
}

/// Parse a single expression; several statements become one block.
pub fn parse_expr(src: &str) -> Result<Expr, ParseError> {
    let mut stmts = parse_program(src)?;
    match stmts.len() {
        0 => Err(ParseError::Generic("empty input".into())),
        1 => Ok(stmts.remove(0)),
        _ => {
            let span = stmts[0].span.join(stmts[stmts.len() - 1].span);
            Ok(Expr::new(ExprKind::Block(stmts), span))
        }
    }
}

fn unexpected(t: &Lexed<'_>) -> ParseError {
    ParseError::Unexpected { found: format!("{:?}", t.text), span: t.span }
}

// Binding powers, loosest first. Left-associative operators bind their rhs one tighter.
const BP_ASSIGN: u8 = 1;
const BP_OR: u8 = 2;
const BP_AND: u8 = 3;
const BP_CMP: u8 = 4;
const BP_ADD: u8 = 5;
const BP_MUL: u8 = 6;
const BP_SPECIAL: u8 = 7;
const BP_UNARY: u8 = 8;

enum Infix {
    Op(String),
    Assign(AssignScope),
}

fn infix_of(tok: &Tok) -> Option<(u8, u8, Infix)> {
    let op = |s: &str| Infix::Op(s.to_string());
    Some(match tok {
        // right-associative
        Tok::LeftArrow => (BP_ASSIGN, BP_ASSIGN, Infix::Assign(AssignScope::Local)),
        Tok::SuperArrow => (BP_ASSIGN, BP_ASSIGN, Infix::Assign(AssignScope::Super)),
        Tok::OrOr => (BP_OR, BP_OR + 1, op("||")),
        Tok::AndAnd => (BP_AND, BP_AND + 1, op("&&")),
        Tok::EqEq => (BP_CMP, BP_CMP + 1, op("==")),
        Tok::BangEq => (BP_CMP, BP_CMP + 1, op("!=")),
        Tok::Less => (BP_CMP, BP_CMP + 1, op("<")),
        Tok::LessEq => (BP_CMP, BP_CMP + 1, op("<=")),
        Tok::Greater => (BP_CMP, BP_CMP + 1, op(">")),
        Tok::GreaterEq => (BP_CMP, BP_CMP + 1, op(">=")),
        Tok::Plus => (BP_ADD, BP_ADD + 1, op("+")),
        Tok::Minus => (BP_ADD, BP_ADD + 1, op("-")),
        Tok::Star => (BP_MUL, BP_MUL + 1, op("*")),
        Tok::Slash => (BP_MUL, BP_MUL + 1, op("/")),
        Tok::Special(s) => (BP_SPECIAL, BP_SPECIAL + 1, Infix::Op(s.clone())),
        _ => return None,
    })
}

struct Parser<'a> {
    toks: Vec<Lexed<'a>>,
    i: usize,
    // true while inside (...) or [...], where newlines carry no meaning
    nesting: Vec<bool>,
}

impl<'a> Parser<'a> {
    fn newlines_ignored(&self) -> bool {
        self.nesting.last().copied().unwrap_or(false)
    }

    fn skip_newlines(&mut self) {
        while matches!(self.toks.get(self.i).map(|t| &t.tok), Some(Tok::Newline)) {
            self.i += 1;
        }
    }

    fn peek(&mut self) -> Option<&Lexed<'a>> {
        if self.newlines_ignored() {
            self.skip_newlines();
        }
        self.toks.get(self.i)
    }

    fn peek_tok(&mut self) -> Option<Tok> {
        self.peek().map(|t| t.tok.clone())
    }

    fn bump(&mut self) -> Result<Lexed<'a>, ParseError> {
        if self.newlines_ignored() {
            self.skip_newlines();
        }
        let t = self
            .toks
            .get(self.i)
            .cloned()
            .ok_or_else(|| ParseError::Generic("unexpected end of input".into()))?;
        self.i += 1;
        Ok(t)
    }

    fn expect(&mut self, want: Tok, what: &str) -> Result<Lexed<'a>, ParseError> {
        let t = self.bump()?;
        if t.tok == want {
            Ok(t)
        } else {
            Err(ParseError::Generic(format!(
                "expected {} at offset {}, found {:?}",
                what, t.span.offset, t.text
            )))
        }
    }

    /// Statements up to `close` (or end of input when `close` is None).
    fn statements(&mut self, close: Option<Tok>) -> Result<Vec<Expr>, ParseError> {
        let mut out = Vec::new();
        loop {
            while matches!(
                self.toks.get(self.i).map(|t| &t.tok),
                Some(Tok::Newline) | Some(Tok::Semicolon)
            ) {
                self.i += 1;
            }
            match self.toks.get(self.i) {
                None => break,
                Some(t) if Some(&t.tok) == close.as_ref() => break,
                Some(_) => {}
            }
            out.push(self.expr_bp(0)?);
            match self.toks.get(self.i).map(|t| &t.tok) {
                None | Some(Tok::Newline) | Some(Tok::Semicolon) => {}
                Some(t) if Some(t) == close.as_ref() => {}
                Some(_) => return Err(unexpected(&self.toks[self.i])),
            }
        }
        Ok(out)
    }

    fn nested<T>(
        &mut self,
        ignore_newlines: bool,
        f: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        self.nesting.push(ignore_newlines);
        let res = f(self);
        self.nesting.pop();
        res
    }

    /// Comma separated items up to `close`; the opening token is already consumed.
    fn comma_list<T>(
        &mut self,
        close: Tok,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<(Vec<T>, Span), ParseError> {
        self.nested(true, |p| {
            let mut items = Vec::new();
            loop {
                if p.peek_tok().as_ref() == Some(&close) {
                    let end = p.bump()?;
                    return Ok((items, end.span));
                }
                items.push(item(p)?);
                let sep = p.bump()?;
                if sep.tok == close {
                    return Ok((items, sep.span));
                }
                if sep.tok != Tok::Comma {
                    return Err(unexpected(&sep));
                }
            }
        })
    }

    fn params(&mut self) -> Result<Vec<String>, ParseError> {
        self.expect(Tok::LParen, "(")?;
        let (names, _) = self.comma_list(Tok::RParen, |p| {
            let t = p.bump()?;
            match t.tok {
                Tok::Ident | Tok::Dot => Ok(t.text.to_string()),
                _ => Err(unexpected(&t)),
            }
        })?;
        Ok(names)
    }

    fn parse_atom(&mut self) -> Result<Expr, ParseError> {
        let t = self.bump()?;
        let span = t.span;
        Ok(match &t.tok {
            Tok::Int(n) => Expr::new(ExprKind::Int(*n), span),
            Tok::Float(f) => Expr::new(ExprKind::Float(*f), span),
            Tok::Str(s) => Expr::new(ExprKind::Str(s.clone()), span),
            Tok::True => Expr::new(ExprKind::Bool(true), span),
            Tok::False => Expr::new(ExprKind::Bool(false), span),
            Tok::Null => Expr::new(ExprKind::Null, span),
            Tok::Ident => Expr::sym(t.text, span),
            Tok::Dot => Expr::sym(PLACEHOLDER, span),
            Tok::Minus | Tok::Bang => {
                let op = if t.tok == Tok::Minus { "neg" } else { "!" };
                let operand = self.expr_bp(BP_UNARY)?;
                let all = span.join(operand.span);
                Expr::call(Expr::sym(op, span), vec![operand], all)
            }
            Tok::LParen => {
                let (inner, close) = self.nested(true, |p| {
                    let inner = p.expr_bp(0)?;
                    Ok((inner, p.expect(Tok::RParen, ")")?))
                })?;
                Expr::new(ExprKind::Paren(Box::new(inner)), span.join(close.span))
            }
            Tok::LBracket => {
                let (items, end) = self.comma_list(Tok::RBracket, |p| p.expr_bp(0))?;
                Expr::new(ExprKind::List(items), span.join(end))
            }
            Tok::LBrace => {
                let mut j = self.i;
                while matches!(self.toks.get(j).map(|t| &t.tok), Some(Tok::Newline)) {
                    j += 1;
                }
                let is_record = matches!(
                    (self.toks.get(j).map(|t| &t.tok), self.toks.get(j + 1).map(|t| &t.tok)),
                    (Some(Tok::Ident), Some(Tok::Colon))
                );
                if is_record {
                    let (fields, end) = self.comma_list(Tok::RBrace, |p| {
                        let key = p.expect(Tok::Ident, "field name")?;
                        p.expect(Tok::Colon, ":")?;
                        Ok((key.text.to_string(), p.expr_bp(0)?))
                    })?;
                    Expr::new(ExprKind::Record(fields), span.join(end))
                } else {
                    let stmts = self.nested(false, |p| p.statements(Some(Tok::RBrace)))?;
                    let close = self.expect(Tok::RBrace, "}")?;
                    Expr::new(ExprKind::Block(stmts), span.join(close.span))
                }
            }
            Tok::Function | Tok::Backslash => {
                let params = self.params()?;
                self.skip_newlines();
                let body = self.expr_bp(BP_ASSIGN)?;
                let all = span.join(body.span);
                Expr::new(ExprKind::Lambda { params, body: Box::new(body) }, all)
            }
            Tok::If => {
                self.expect(Tok::LParen, "(")?;
                let cond = self.nested(true, |p| {
                    let cond = p.expr_bp(0)?;
                    p.expect(Tok::RParen, ")")?;
                    Ok(cond)
                })?;
                self.skip_newlines();
                let then = self.expr_bp(BP_ASSIGN)?;
                // `else` may sit on the next line
                let save = self.i;
                self.skip_newlines();
                let otherwise = if self.toks.get(self.i).map(|t| &t.tok) == Some(&Tok::Else) {
                    self.i += 1;
                    self.skip_newlines();
                    Some(Box::new(self.expr_bp(BP_ASSIGN)?))
                } else {
                    self.i = save;
                    None
                };
                let end = otherwise.as_ref().map(|o| o.span).unwrap_or(then.span);
                Expr::new(
                    ExprKind::If { cond: Box::new(cond), then: Box::new(then), otherwise },
                    span.join(end),
                )
            }
            _ => return Err(unexpected(&t)),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_atom()?;
        loop {
            // postfix operators must start on the same line
            match self.toks.get(self.i).map(|t| &t.tok) {
                Some(Tok::LParen) => {
                    self.i += 1;
                    let (args, end) = self.comma_list(Tok::RParen, |p| p.expr_bp(0))?;
                    let span = lhs.span.join(end);
                    lhs = Expr::call(lhs, args, span);
                }
                Some(Tok::Dollar) => {
                    self.i += 1;
                    let name = self.expect(Tok::Ident, "field name after $")?;
                    let span = lhs.span.join(name.span);
                    lhs = Expr::new(
                        ExprKind::Field { target: Box::new(lhs), name: name.text.to_string() },
                        span,
                    );
                }
                _ => break,
            }
        }
        Ok(lhs)
    }

    fn expr_bp(&mut self, min_bp: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_postfix()?;
        loop {
            let Some(nxt) = self.peek().cloned() else { break };
            let Some((l_bp, r_bp, infix)) = infix_of(&nxt.tok) else { break };
            if l_bp < min_bp {
                break;
            }
            self.i += 1;
            // an operator at the end of a line continues onto the next one
            self.skip_newlines();
            let rhs = self.expr_bp(r_bp)?;
            let span = lhs.span.join(rhs.span);
            lhs = match infix {
                Infix::Op(op) => Expr::call(Expr::sym(op, nxt.span), vec![lhs, rhs], span),
                Infix::Assign(scope) => Expr::new(
                    ExprKind::Assign { target: Box::new(lhs), value: Box::new(rhs), scope },
                    span,
                ),
            };
        }
        Ok(lhs)
    }
}
