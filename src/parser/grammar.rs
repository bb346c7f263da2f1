//! Parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::model::{
    Attributes, Cardinality, ElementNode, Node, PointInfo, PointOptions, PointSpec, ReferenceNode,
};
use crate::parser::ast::*;
use crate::parser::lexer::Token;

/// Parse template source into its declarations
pub fn parse(input: &str) -> Result<Vec<TemplateDecl>, Vec<crate::ParseError>> {
    let len = input.len();

    // Create a logos lexer and convert to token stream
    let token_iter = crate::parser::lexer::lex(input).map(|(tok, span)| (tok, span.into()));

    // Turn the token iterator into a stream that chumsky can use
    let token_stream = Stream::from_iter(token_iter)
        // Split (Token, SimpleSpan) into token and span parts
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    source_parser()
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Helper to extract span range from chumsky's MapExtra
fn span_range(e: &impl chumsky::span::Span<Offset = usize>) -> std::ops::Range<usize> {
    e.start()..e.end()
}

/// Build the point spec from `#id`, an optional `*` and an optional `export`
fn point_spec(point: Option<(String, Option<Token>)>, export: Option<Token>) -> PointSpec {
    let (id, cardinality) = match point {
        Some((id, Some(_))) => (Some(id), Cardinality::Multiple),
        Some((id, None)) => (Some(id), Cardinality::Single),
        None => (None, Cardinality::Single),
    };
    PointSpec {
        id,
        cardinality,
        options: PointOptions {
            export: export.is_some(),
        },
    }
}

fn source_parser<'a, I>() -> impl Parser<'a, I, Vec<TemplateDecl>, extra::Err<Rich<'a, Token>>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    // Basic token parsers
    let identifier = select! {
        Token::Ident(s) => s,
    };

    let string_literal = select! {
        Token::String(s) => s,
    };

    // Attribute list: `[class: "card", "data-id": "x"]`
    let attribute = choice((identifier.clone(), string_literal.clone()))
        .then_ignore(just(Token::Colon))
        .then(string_literal.clone());

    let attributes = attribute
        .separated_by(just(Token::Comma))
        .allow_trailing()
        .collect::<Vec<_>>()
        .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
        .or_not()
        .map(|attrs| attrs.unwrap_or_default().into_iter().collect::<Attributes>());

    // Point declaration: `#name`, `#name*`, each optionally followed by `export`
    let point = just(Token::Hash)
        .ignore_then(identifier.clone())
        .then(just(Token::Star).or_not())
        .or_not()
        .then(just(Token::Export).or_not())
        .map(|(point, export)| point_spec(point, export));

    let node = recursive(|node| {
        let body = node
            .clone()
            .repeated()
            .collect::<Vec<Node>>()
            .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
            .or_not()
            .map(Option::unwrap_or_default);

        let text = string_literal.clone().map(Node::Text);

        // Point override inside a reference: `title #heading [class: "x"] { ... }`
        let slot = identifier
            .clone()
            .then(just(Token::Hash).ignore_then(identifier.clone()).or_not())
            .then(attributes.clone())
            .then(body.clone())
            .map(|(((name, id), attributes), children)| {
                (
                    name,
                    PointInfo {
                        id,
                        attributes,
                        children,
                    },
                )
            });

        let reference = just(Token::Use)
            .ignore_then(identifier.clone())
            .then(point.clone())
            .then(attributes.clone())
            .then(
                slot.repeated()
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::BraceOpen), just(Token::BraceClose))
                    .or_not(),
            )
            .map(|(((template, point), attributes), slots)| {
                Node::Reference(ReferenceNode {
                    template,
                    point,
                    attributes,
                    slots: slots.unwrap_or_default().into_iter().collect(),
                })
            });

        let element = identifier
            .clone()
            .then(point.clone())
            .then(attributes.clone())
            .then(body)
            .map(|(((tag, point), attributes), children)| {
                Node::Element(ElementNode {
                    tag,
                    point,
                    attributes,
                    children,
                })
            });

        choice((text, reference, element)).boxed()
    });

    let template_decl = just(Token::Template)
        .ignore_then(
            identifier
                .clone()
                .map_with(|name, e| Spanned::new(name, span_range(&e.span()))),
        )
        .then(node.delimited_by(just(Token::BraceOpen), just(Token::BraceClose)))
        .map(|(name, root)| TemplateDecl { name, root });

    // Source is a list of template declarations
    template_decl.repeated().collect().then_ignore(end())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(source: &str) -> TemplateDecl {
        let mut decls = parse(source).expect("Should parse");
        assert_eq!(decls.len(), 1);
        decls.remove(0)
    }

    #[test]
    fn test_parse_simple_element() {
        let decl = single(r#"template Hello { p [class: "greeting"] { "Hello " b #name { "you" } } }"#);
        assert_eq!(decl.name.node, "Hello");
        assert_eq!(decl.name.span, 9..14);
        match &decl.root {
            Node::Element(p) => {
                assert_eq!(p.tag, "p");
                assert_eq!(p.attributes.get("class"), Some("greeting"));
                assert_eq!(p.children.len(), 2);
                assert_eq!(p.children[0], Node::text("Hello "));
                let b = p.children[1].point().expect("b should carry a point");
                assert_eq!(b.id.as_deref(), Some("name"));
                assert_eq!(b.cardinality, Cardinality::Single);
            }
            other => panic!("Expected element, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_repeated_export_point() {
        let decl = single("template List { ul { li #items* export } }");
        let Node::Element(ul) = &decl.root else {
            panic!("Expected element");
        };
        let li = ul.children[0].point().expect("li should carry a point");
        assert_eq!(li.id.as_deref(), Some("items"));
        assert!(li.is_multiple());
        assert!(li.options.export);
    }

    #[test]
    fn test_parse_reference_with_slots() {
        let decl = single(
            r#"
            template Card {
                use BaseCard #card [class: "wide"] {
                    title #title
                    content #body [role: "main"] { p { "Default" } }
                }
            }
            "#,
        );
        let Node::Reference(reference) = &decl.root else {
            panic!("Expected reference");
        };
        assert_eq!(reference.template, "BaseCard");
        assert_eq!(reference.point.id.as_deref(), Some("card"));
        assert_eq!(reference.attributes.get("class"), Some("wide"));
        assert_eq!(reference.slots.len(), 2);
        let content = &reference.slots["content"];
        assert_eq!(content.id.as_deref(), Some("body"));
        assert_eq!(content.attributes.get("role"), Some("main"));
        assert_eq!(content.children.len(), 1);
        assert!(reference.slots["title"].children.is_empty());
    }

    #[test]
    fn test_parse_multiple_templates() {
        let decls = parse(
            r#"
            // leaf first
            template A { span }
            template B { div { use A use A #second } }
            "#,
        )
        .expect("Should parse");
        assert_eq!(decls.len(), 2);
        let Node::Element(div) = &decls[1].root else {
            panic!("Expected element");
        };
        assert_eq!(div.children.len(), 2);
        assert_eq!(decls[1].root.referenced_templates().len(), 1);
    }

    #[test]
    fn test_parse_error_reports_span() {
        let errors = parse("template Broken { div [class \"x\"] }").unwrap_err();
        assert!(!errors.is_empty());
        let crate::ParseError::Syntax { span, .. } = &errors[0];
        assert!(span.start >= 22, "error should point into the attribute list");
    }

    #[test]
    fn test_template_needs_exactly_one_root() {
        assert!(parse("template Empty { }").is_err());
        assert!(parse("template Two { div span }").is_err());
    }
}
