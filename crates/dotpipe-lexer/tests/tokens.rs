use dotpipe_lexer::{lex, lex_skip_comments, Tok};

fn kinds(src: &str) -> String {
    let toks = lex_skip_comments(src).unwrap();
    let mut out = String::new();
    for t in toks {
        let k = match t.tok {
            Tok::Newline => "Newline".to_string(),
            Tok::LBrace => "LBrace".to_string(),
            Tok::RBrace => "RBrace".to_string(),
            Tok::LParen => "LParen".to_string(),
            Tok::RParen => "RParen".to_string(),
            Tok::Comma => "Comma".to_string(),
            Tok::Dot => "Dot".to_string(),
            Tok::Dollar => "Dollar".to_string(),
            Tok::LeftArrow => "LeftArrow".to_string(),
            Tok::Plus => "Plus".to_string(),
            Tok::Special(s) => format!("Special({s})"),
            Tok::Int(n) => format!("Int({n})"),
            Tok::Str(s) => format!("Str({s:?})"),
            Tok::Ident => format!("Ident({})", t.text),
            other => format!("{other:?}"),
        };
        out.push_str(&k);
        out.push('\n');
    }
    out
}

#[test]
fn multi_line_pipeline() {
    let src = "y <- x %>%\n  add(1) # bump\n  %$% size\n";
    let expected = "\
Ident(y)
LeftArrow
Ident(x)
Special(%>%)
Newline
Ident(add)
LParen
Int(1)
RParen
Newline
Special(%$%)
Ident(size)
Newline
";
    assert_eq!(kinds(src), expected);
}

#[test]
fn comments_are_kept_by_plain_lex() {
    let toks = lex("1 # one").unwrap();
    assert_eq!(toks.len(), 2);
    assert_eq!(toks[1].tok, Tok::CommentLine);
    assert_eq!(toks[1].text, "# one");
}

#[test]
fn string_escapes_and_radix_integers() {
    assert_eq!(kinds(r#""a\n\u{41}" 0x1F 0b101 1_000"#), "Str(\"a\\nA\")\nInt(31)\nInt(5)\nInt(1000)\n");
}

#[test]
fn record_field_access() {
    assert_eq!(kinds("r$name"), "Ident(r)\nDollar\nIdent(name)\n");
}
