//! Error types for parsing template source

use ariadne::{Color, Label, Report, ReportKind, Source};
use thiserror::Error;

/// Byte range in source text
pub type Span = std::ops::Range<usize>;

#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Parse error at {span:?}: {message}")]
    Syntax {
        span: Span,
        message: String,
        expected: Vec<String>,
    },
}

impl ParseError {
    pub fn span(&self) -> &Span {
        match self {
            ParseError::Syntax { span, .. } => span,
        }
    }

    /// Format the error with source context using ariadne
    pub fn format(&self, source: &str, filename: &str) -> String {
        let mut buf = Vec::new();
        let ParseError::Syntax {
            span,
            message,
            expected,
        } = self;

        let expected_str = if expected.is_empty() {
            String::new()
        } else {
            format!("\nExpected: {}", expected.join(", "))
        };

        let written = Report::build(ReportKind::Error, filename, span.start)
            .with_message(message)
            .with_label(
                Label::new((filename, span.clone()))
                    .with_message(format!("{}{}", message, expected_str))
                    .with_color(Color::Red),
            )
            .finish()
            .write((filename, Source::from(source)), &mut buf);
        if written.is_err() {
            return self.to_string();
        }
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl<'a> From<chumsky::error::Rich<'a, crate::parser::lexer::Token>> for ParseError {
    fn from(err: chumsky::error::Rich<'a, crate::parser::lexer::Token>) -> Self {
        use crate::parser::lexer::Token;
        use chumsky::error::RichReason;

        // keywords lex as their own tokens, so `use` or `export` can't name a tag or point
        let keyword = err
            .found()
            .filter(|tok| matches!(tok, Token::Template | Token::Use | Token::Export))
            .map(format_token);

        let message = match (keyword, err.reason()) {
            (Some(keyword), RichReason::ExpectedFound { .. }) => format!(
                "Cannot use {} as a name, quote it as text or pick another identifier",
                keyword
            ),
            (None, RichReason::ExpectedFound { found, .. }) => {
                let found_str = match found {
                    Some(tok) => format_token(tok),
                    None => "end of input".to_string(),
                };
                format!("Unexpected {}", found_str)
            }
            (_, RichReason::Custom(msg)) => msg.to_string(),
        };

        // Format expected tokens nicely
        let expected: Vec<String> = err
            .expected()
            .filter_map(|e| match e {
                chumsky::error::RichPattern::Token(tok) => Some(format_token(tok)),
                chumsky::error::RichPattern::Label(label) => Some(label.to_string()),
                chumsky::error::RichPattern::EndOfInput => Some("end of input".to_string()),
                chumsky::error::RichPattern::Identifier(s) => Some(format!("identifier '{}'", s)),
                chumsky::error::RichPattern::Any => Some("any token".to_string()),
                chumsky::error::RichPattern::SomethingElse => None,
            })
            .collect();

        ParseError::Syntax {
            span: err.span().into_range(),
            message,
            expected,
        }
    }
}

/// Format a token for human-readable error messages
fn format_token(tok: &crate::parser::lexer::Token) -> String {
    use crate::parser::lexer::Token;
    match tok {
        Token::Ident(s) => format!("identifier '{}'", s),
        Token::String(s) => format!("string \"{}\"", s),
        Token::Template => "keyword 'template'".to_string(),
        Token::Use => "keyword 'use'".to_string(),
        Token::Export => "keyword 'export'".to_string(),
        Token::Hash => "'#'".to_string(),
        Token::Star => "'*'".to_string(),
        Token::BraceOpen => "'{'".to_string(),
        Token::BraceClose => "'}'".to_string(),
        Token::BracketOpen => "'['".to_string(),
        Token::BracketClose => "']'".to_string(),
        Token::Comma => "','".to_string(),
        Token::Colon => "':'".to_string(),
        Token::LineComment | Token::BlockComment => "comment".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use crate::parser::parse;

    #[test]
    fn test_error_message_names_found_token() {
        let errors = parse("template { div }").unwrap_err();
        let message = errors[0].to_string();
        assert!(message.contains("Unexpected '{'"), "got: {}", message);
    }

    #[test]
    fn test_format_includes_filename() {
        let source = "template A { div ] }";
        let errors = parse(source).unwrap_err();
        let report = errors[0].format(source, "page.tpl");
        assert!(report.contains("page.tpl"), "got: {}", report);
    }

    #[test]
    fn test_keyword_as_point_name() {
        let errors = parse("template A { div #export }").unwrap_err();
        let message = errors[0].to_string();
        assert!(message.contains("keyword 'export'"), "got: {}", message);
    }
}
