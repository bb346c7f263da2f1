//! Binding engine properties: registration, rendering and point location

use pretty_assertions::assert_eq;

use slotmark::{
    Document, DomId, ElementNode, PointInfo, PointSelector, Record, ReferenceNode, TemplateRegistry,
    ROOT_KEY,
};

fn base_card(registry: &mut TemplateRegistry) {
    registry.ensure("BaseCard", |_| {
        ElementNode::new("div")
            .attr("class", "card")
            .child(ElementNode::new("h1").point("title").export())
            .child(ElementNode::new("section").point("content").export())
            .into()
    });
}

fn card(registry: &mut TemplateRegistry) {
    registry.ensure("Card", |registry| {
        base_card(registry);
        ReferenceNode::new("BaseCard")
            .slot("title", PointInfo::new().point("title"))
            .slot("content", PointInfo::new().point("content"))
            .into()
    });
}

fn list(registry: &mut TemplateRegistry) {
    registry.register(
        "List",
        ElementNode::new("ul")
            .attr("class", "list")
            .child(ElementNode::new("li").point("items").multiple())
            .into(),
    );
}

fn materialize(html: &str) -> (Document, DomId) {
    let mut document = Document::new();
    let root = document.materialize(html).expect("Should materialize");
    (document, root)
}

#[test]
fn test_register_is_idempotent() {
    let mut registry = TemplateRegistry::new();
    card(&mut registry);
    let before = registry.get("Card").unwrap().points().clone();

    registry.register("Card", ElementNode::new("p").point("other").into());
    card(&mut registry);

    assert_eq!(registry.names().filter(|n| *n == "Card").count(), 1);
    assert_eq!(registry.get("Card").unwrap().points(), &before);
}

#[test]
fn test_locate_every_populated_point() {
    let mut registry = TemplateRegistry::new();
    card(&mut registry);
    let data = Record::new().with("title", "T").with("content", "C");
    let html = registry.render("Card", &data).unwrap();
    let (document, root) = materialize(&html);

    let expected = [("title", "h1"), ("content", "section")];
    for (point, tag) in expected {
        let element = registry
            .locate(&document, root, "Card", &point.into())
            .unwrap_or_else(|| panic!("{} should be located", point));
        assert_eq!(document.tag(element), Some(tag));
    }
}

#[test]
fn test_single_point_round_trip() {
    let mut registry = TemplateRegistry::new();
    card(&mut registry);
    let data = Record::new().with("title", "Round");
    let html = registry.render("Card", &data).unwrap();
    let (document, root) = materialize(&html);

    let title = registry.locate(&document, root, "Card", &"title".into()).unwrap();
    let location = registry.reverse_locate(&document, root, "Card", title).unwrap();
    assert!(location.contains("title"));
    assert_eq!(location.index("title"), Some(0));
}

#[test]
fn test_multiple_point_indices() {
    let mut registry = TemplateRegistry::new();
    list(&mut registry);
    let data = Record::new().with("items", vec!["a", "b", "c"]);
    let html = registry.render("List", &data).unwrap();
    let (document, root) = materialize(&html);

    let located: Vec<DomId> = (0..3)
        .map(|i| {
            registry
                .locate(&document, root, "List", &PointSelector::new("items").at(i))
                .expect("Each item should be present")
        })
        .collect();
    assert_eq!(located.len(), 3);
    assert_ne!(located[0], located[1]);
    assert_ne!(located[1], located[2]);
    assert_ne!(located[0], located[2]);
    assert!(registry
        .locate(&document, root, "List", &PointSelector::new("items").at(3))
        .is_none());
}

#[test]
fn test_attribute_override_precedence() {
    let mut registry = TemplateRegistry::new();
    registry.register(
        "Box",
        ElementNode::new("div")
            .child(ElementNode::new("span").point("label").attr("class", "a").attr("id", "l"))
            .into(),
    );
    let data = Record::new().with_attributes("label", [("class", "b")]);
    let html = registry.render("Box", &data).unwrap();
    assert_eq!(html, "<div><span class='b' id='l'></span></div>");
}

#[test]
fn test_card_content_scenario() {
    let mut registry = TemplateRegistry::new();
    card(&mut registry);
    let html = registry
        .render("Card", &Record::new().with("content", "hello"))
        .unwrap();
    let (document, root) = materialize(&html);

    let content = registry.locate(&document, root, "Card", &"content".into()).unwrap();
    assert_eq!(document.text_content(content), "hello");
}

#[test]
fn test_items_scenario() {
    let mut registry = TemplateRegistry::new();
    list(&mut registry);
    let html = registry
        .render("List", &Record::new().with("items", vec!["a", "b"]))
        .unwrap();
    let (document, root) = materialize(&html);

    let items = document.element_children(root);
    assert_eq!(items.len(), 2);
    assert_eq!(document.text_content(items[0]), "a");
    assert_eq!(document.text_content(items[1]), "b");

    let location = registry.reverse_locate(&document, root, "List", items[1]).unwrap();
    assert_eq!(location.iter().collect::<Vec<_>>(), vec![("items", 1)]);
}

#[test]
fn test_item_on_multiple_point_renders_once() {
    let mut registry = TemplateRegistry::new();
    registry.register(
        "List",
        ElementNode::new("ul")
            .child(
                ElementNode::new("li")
                    .point("items")
                    .multiple()
                    .child(ElementNode::new("span").point("not")),
            )
            .into(),
    );
    let data = Record::new().with("items", Record::new().with("not", "an array"));
    let html = registry.render("List", &data).unwrap();
    assert_eq!(html, "<ul><li><span>an array</span></li></ul>");
    assert!(!html.contains("<error>"));
}

#[test]
fn test_reverse_locate_ancestor_of_root() {
    let mut registry = TemplateRegistry::new();
    list(&mut registry);
    let html = registry
        .render("List", &Record::new().with("items", vec!["a"]))
        .unwrap();
    let (document, root) = materialize(&html);
    let item = registry.locate(&document, root, "List", &"items".into()).unwrap();

    assert!(registry.reverse_locate(&document, item, "List", root).is_none());
}

#[test]
fn test_reference_multiple_with_indexed_overrides() {
    let mut registry = TemplateRegistry::new();
    registry.register(
        "Tag",
        ElementNode::new("span").child(ElementNode::new("b").point("label")).into(),
    );
    registry.register(
        "Tags",
        ElementNode::new("p")
            .child(
                ReferenceNode::new("Tag")
                    .point("tags")
                    .multiple()
                    .attr("class", "tag"),
            )
            .into(),
    );
    let data = Record::new()
        .with(
            "tags",
            vec![
                Record::new().with("label", "x"),
                Record::new().with("label", "y"),
            ],
        )
        .with_attributes_each(
            "tags",
            vec![
                [("class", "first")].into_iter().collect(),
                [("title", "second")].into_iter().collect(),
            ],
        );
    let html = registry.render("Tags", &data).unwrap();
    assert_eq!(
        html,
        "<p><span class='first'><b>x</b></span><span class='tag' title='second'><b>y</b></span></p>"
    );
}

#[test]
fn test_render_point_then_append() {
    let mut registry = TemplateRegistry::new();
    list(&mut registry);
    let html = registry
        .render("List", &Record::new().with("items", vec!["a", "b"]))
        .unwrap();
    let (mut document, root) = materialize(&html);

    let row = registry
        .render_point("List", "items", &Record::new().with(ROOT_KEY, "c"))
        .unwrap();
    assert_eq!(row, "<li>c</li>");
    let appended = document.materialize(&row).unwrap();
    assert!(document.append_child(root, appended));

    let third = registry
        .locate(&document, root, "List", &PointSelector::new("items").at(2))
        .unwrap();
    assert_eq!(third, appended);
    let location = registry.reverse_locate(&document, root, "List", appended).unwrap();
    assert_eq!(location.index("items"), Some(2));
}

#[test]
fn test_full_render_snapshot() {
    let mut registry = TemplateRegistry::new();
    card(&mut registry);
    let data = Record::new()
        .with("title", "Report")
        .with("content", "<p>Body</p>")
        .with_attributes("content", [("class", "body")]);
    let html = registry.render("Card", &data).unwrap();
    insta::assert_snapshot!(html, @"<div class='card'><h1>Report</h1><section class='body'><p>Body</p></section></div>");
}
