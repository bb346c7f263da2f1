//! Lexer for the template source language using logos

use logos::Logos;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\n\r]+")]
pub enum Token {
    // Keywords
    #[token("template")]
    Template,
    #[token("use")]
    Use,
    #[token("export")]
    Export,

    // Point markers
    #[token("#")]
    Hash,
    #[token("*")]
    Star,

    // Delimiters
    #[token("{")]
    BraceOpen,
    #[token("}")]
    BraceClose,
    #[token("[")]
    BracketOpen,
    #[token("]")]
    BracketClose,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,

    // Literals - identifiers must come after keywords
    #[regex(r"[a-zA-Z_][a-zA-Z0-9_-]*", |lex| lex.slice().to_string(), priority = 1)]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape(&s[1..s.len()-1])
    })]
    String(String),

    // Comments (skip)
    #[regex(r"//[^\n]*", logos::skip)]
    LineComment,

    #[regex(r"/\*([^*]|\*[^/])*\*/", logos::skip)]
    BlockComment,
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

/// Lex input string into tokens with spans
pub fn lex(input: &str) -> impl Iterator<Item = (Token, Span)> + '_ {
    Token::lexer(input)
        .spanned()
        .filter_map(|(tok, span)| tok.ok().map(|t| (t, span)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keywords() {
        let tokens: Vec<_> = lex("template use export").map(|(t, _)| t).collect();
        assert_eq!(tokens, vec![Token::Template, Token::Use, Token::Export]);
    }

    #[test]
    fn test_keyword_prefix_is_identifier() {
        let tokens: Vec<_> = lex("user templates").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("user".to_string()),
                Token::Ident("templates".to_string())
            ]
        );
    }

    #[test]
    fn test_point_markers() {
        let tokens: Vec<_> = lex("li #items* export").map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("li".to_string()),
                Token::Hash,
                Token::Ident("items".to_string()),
                Token::Star,
                Token::Export
            ]
        );
    }

    #[test]
    fn test_identifiers_and_strings() {
        let tokens: Vec<_> = lex(r#"my-widget "say \"hi\"""#).map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("my-widget".to_string()),
                Token::String("say \"hi\"".to_string())
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        let tokens: Vec<_> = lex("div // comment\nspan /* block */ p")
            .map(|(t, _)| t)
            .collect();
        assert_eq!(
            tokens,
            vec![
                Token::Ident("div".to_string()),
                Token::Ident("span".to_string()),
                Token::Ident("p".to_string())
            ]
        );
    }

    #[test]
    fn test_attribute_list() {
        let tokens: Vec<_> = lex(r#"[class: "a", "data-x": "b"]"#).map(|(t, _)| t).collect();
        assert_eq!(
            tokens,
            vec![
                Token::BracketOpen,
                Token::Ident("class".to_string()),
                Token::Colon,
                Token::String("a".to_string()),
                Token::Comma,
                Token::String("data-x".to_string()),
                Token::Colon,
                Token::String("b".to_string()),
                Token::BracketClose
            ]
        );
    }
}
