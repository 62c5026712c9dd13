use dotpipe_ast::span::Span;
use logos::{Lexer, Logos};

#[derive(Debug, Logos, PartialEq, Clone)]
pub enum Tok {
    // Horizontal whitespace is skipped; newlines end statements
    #[regex(r"[ \t\r]+", logos::skip)]
    _Whitespace,
    #[token("\n")]
    Newline,

    // Comments are preserved in token stream
    #[regex(r"#[^\n]*")]
    CommentLine,

    #[token("{")]
    LBrace,
    #[token("}")]
    RBrace,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(";")]
    Semicolon,
    #[token(":")]
    Colon,
    #[token("$")]
    Dollar,
    #[token("\\")]
    Backslash,
    // The pipe placeholder
    #[token(".")]
    Dot,

    // Assignment (longer first)
    #[token("<<-")]
    SuperArrow,
    #[token("<-")]
    LeftArrow,

    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,

    #[token("&&")]
    AndAnd,
    #[token("||")]
    OrOr,
    #[token("!")]
    Bang,

    // Comparison operators (longer first)
    #[token("<=")]
    LessEq,
    #[token("<")]
    Less,
    #[token(">=")]
    GreaterEq,
    #[token(">")]
    Greater,
    #[token("==")]
    EqEq,
    #[token("!=")]
    BangEq,

    // `%op%` specials: every pipe operator, and user infix functions
    #[regex(r"%[^%\n ]*%", |lex| Some(lex.slice().to_string()))]
    Special(String),

    #[token("function")]
    Function,
    #[token("if")]
    If,
    #[token("else")]
    Else,
    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    // Float literals should be matched before Int to avoid consuming prefix digits
    // Supports underscores and exponent part: 1_234.56_7, .5e-10, 10e3
    #[regex(r"([0-9][0-9_]*\.[0-9][0-9_]*([eE][+-]?[0-9_]+)?|\.[0-9][0-9_]*([eE][+-]?[0-9_]+)?|[0-9][0-9_]*[eE][+-]?[0-9_]+)", parse_float, priority = 5)]
    Float(f64),

    // Integer literals: binary 0b, octal 0o, hex 0x, or decimal (underscores allowed)
    #[regex(r"0b[01_]+", |lex| parse_int_radix(lex, 2))]
    #[regex(r"0o[0-7_]+", |lex| parse_int_radix(lex, 8))]
    #[regex(r"0x[0-9a-fA-F_]+", |lex| parse_int_radix(lex, 16))]
    #[regex(r"[0-9][0-9_]*", |lex| parse_int_radix(lex, 10))]
    Int(i64),

    #[regex(r#""([^"\\]|\\u\{[0-9a-fA-F]+\}|\\.)*""#, parse_string)]
    Str(String),

    // Plain and namespace-qualified names: x, my.var, base::with
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_.]*(::[a-zA-Z_][a-zA-Z0-9_.]*)?")]
    Ident,
}

fn parse_string(lex: &mut Lexer<Tok>) -> Option<String> {
    let s = lex.slice();
    let inner = &s[1..s.len() - 1];
    let mut out = String::new();
    let mut chars = inner.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next()? {
                '\\' => out.push('\\'),
                '"' => out.push('"'),
                '\'' => out.push('\''),
                'n' => out.push('\n'),
                'r' => out.push('\r'),
                't' => out.push('\t'),
                '0' => out.push('\0'),
                'u' => {
                    // expect {HEX+}
                    if chars.next()? != '{' {
                        return None;
                    }
                    let mut hex = String::new();
                    while let Some(&ch) = chars.peek() {
                        chars.next();
                        if ch == '}' {
                            break;
                        }
                        hex.push(ch);
                    }
                    let v = u32::from_str_radix(hex.trim(), 16).ok()?;
                    out.push(char::from_u32(v)?);
                }
                // Unknown escape, keep literally
                other => out.push(other),
            }
        } else {
            out.push(c);
        }
    }
    Some(out)
}

fn parse_int_radix(lex: &mut Lexer<Tok>, radix: u32) -> Option<i64> {
    let raw = lex.slice();
    let digits = match radix {
        2 | 8 | 16 => &raw[2..],
        10 => raw,
        _ => return None,
    };
    let cleaned: String = digits.chars().filter(|c| *c != '_').collect();
    i128::from_str_radix(&cleaned, radix).ok()?.try_into().ok()
}

fn parse_float(lex: &mut Lexer<Tok>) -> Option<f64> {
    let cleaned: String = lex.slice().chars().filter(|c| *c != '_').collect();
    cleaned.parse::<f64>().ok()
}

#[derive(Debug, Clone)]
pub struct Lexed<'a> {
    pub tok: Tok,
    pub span: Span,
    pub text: &'a str,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("unrecognized input {text:?} at offset {}", span.offset)]
pub struct LexError {
    pub span: Span,
    pub text: String,
}

/// Tokenize `input`, stopping at the first unrecognized character.
pub fn lex(input: &str) -> Result<Vec<Lexed<'_>>, LexError> {
    let mut out = Vec::new();
    let mut l = Tok::lexer(input);
    while let Some(res) = l.next() {
        let range = l.span();
        let span = Span::new(range.start, range.len());
        match res {
            Ok(tok) => out.push(Lexed { tok, span, text: &input[range] }),
            Err(()) => return Err(LexError { span, text: input[range].to_string() }),
        }
    }
    Ok(out)
}

// Convenience: lex while skipping comments (useful for parser)
pub fn lex_skip_comments(input: &str) -> Result<Vec<Lexed<'_>>, LexError> {
    Ok(lex(input)?.into_iter().filter(|lx| !matches!(lx.tok, Tok::CommentLine)).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(src: &str) -> Vec<Tok> {
        lex_skip_comments(src).unwrap().into_iter().map(|l| l.tok).collect()
    }

    #[test]
    fn pipe_operators_are_specials() {
        assert_eq!(
            toks("x %>% f() %T>% g"),
            vec![
                Tok::Ident,
                Tok::Special("%>%".into()),
                Tok::Ident,
                Tok::LParen,
                Tok::RParen,
                Tok::Special("%T>%".into()),
                Tok::Ident,
            ]
        );
    }

    #[test]
    fn placeholder_is_not_a_float() {
        assert_eq!(toks("f(.)"), vec![Tok::Ident, Tok::LParen, Tok::Dot, Tok::RParen]);
        assert_eq!(toks(".5"), vec![Tok::Float(0.5)]);
    }

    #[test]
    fn keywords_win_over_identifiers() {
        assert_eq!(toks("function functions"), vec![Tok::Function, Tok::Ident]);
    }

    #[test]
    fn qualified_names_are_single_identifiers() {
        let lexed = lex("base::with").unwrap();
        assert_eq!(lexed.len(), 1);
        assert_eq!(lexed[0].text, "base::with");
    }

    #[test]
    fn assignment_arrows_prefer_longest_match() {
        assert_eq!(toks("a <<- 1"), vec![Tok::Ident, Tok::SuperArrow, Tok::Int(1)]);
        assert_eq!(toks("a <- -1"), vec![Tok::Ident, Tok::LeftArrow, Tok::Minus, Tok::Int(1)]);
        assert_eq!(toks("a < b"), vec![Tok::Ident, Tok::Less, Tok::Ident]);
    }

    #[test]
    fn unknown_characters_are_errors() {
        let err = lex("x @ y").unwrap_err();
        assert_eq!(err.span.offset, 2);
        assert_eq!(err.to_string(), "unrecognized input \"@\" at offset 2");
        let boxed: Box<dyn std::error::Error> = Box::new(err);
        assert!(boxed.source().is_none());
    }
}
