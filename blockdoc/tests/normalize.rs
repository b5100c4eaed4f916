use blockdoc::{
    AttachmentRef, Block, BlockId, Blocks, Content, DraftNode, LeafContent, Node, Payload,
    Untyped, coerce, normalize,
};

fn child_ids(node: &DraftNode) -> Vec<Option<&str>> {
    node.children()
        .iter()
        .map(|child| child.id().as_ref().map(BlockId::as_str))
        .collect()
}

fn markdown_text(node: &DraftNode) -> &str {
    match node.content() {
        Some(LeafContent::Markdown {
            text: Payload::Text(text),
        }) => text,
        other => panic!("expected a markdown leaf, got {:?}", other),
    }
}

#[test]
fn bare_string_becomes_markdown_leaf() {
    let block = coerce(Content::from("hello *world*"), &Default::default()).unwrap();
    assert_eq!(block.id, None);
    assert_eq!(
        block.content,
        LeafContent::Markdown {
            text: Payload::Text("hello *world*".to_string())
        }
    );
}

#[test]
fn typed_leaf_passes_through_coercion() {
    let block = Block::html("<b>hi</b>").with_id("raw");
    let coerced = coerce(Content::from(block.clone()), &Default::default()).unwrap();
    assert_eq!(coerced, block);
}

#[test]
fn untyped_value_is_rejected_with_its_path() {
    let top = vec![
        Content::from("fine"),
        Content::from(Blocks::new(vec![
            Content::from("also fine"),
            Content::from(Untyped::new("integer", "42")),
        ])),
    ];
    let err = normalize(top).unwrap_err();
    assert_eq!(err.path.indices(), &[1, 1]);
    assert_eq!(err.type_name, "integer");
    assert_eq!(err.repr, "42");
    assert!(err.to_string().contains("/1/1"), "got: {}", err);
}

#[test]
fn long_untyped_values_are_shortened_in_errors() {
    let long = "x".repeat(500);
    let err = normalize(vec![Content::from(Untyped::new("array", long))]).unwrap_err();
    assert!(err.repr.chars().count() <= 41);
}

#[test]
fn leaf_with_an_attachment_reference_is_rejected() {
    let block = Block::new(LeafContent::Media {
        name: None,
        mime: "image/png".to_string(),
        caption: None,
        data: Payload::Attached(AttachmentRef::new(7)),
    });
    let err = normalize(vec![Content::from("x"), Content::from(block)]).unwrap_err();
    assert_eq!(err.path.indices(), &[1]);
    assert_eq!(err.type_name, "Media with a payload reference");
    assert_eq!(err.repr, "attachment://7");
}

#[test]
fn groups_cannot_be_coerced_to_leaves() {
    let err = coerce(Content::from(Blocks::new(vec!["a"])), &Default::default()).unwrap_err();
    assert_eq!(err.type_name, "group");
}

#[test]
fn bare_sequence_gets_an_implicit_wrapper() {
    let tree = normalize(vec![
        Content::from(Block::markdown("# Title").with_id("test-id-1")),
        Content::from("Simple string Markdown"),
    ])
    .unwrap();
    assert!(tree.is_group());
    assert_eq!(tree.id(), &None);
    assert_eq!(child_ids(&tree), vec![Some("test-id-1"), None]);
    assert_eq!(markdown_text(&tree.children()[1]), "Simple string Markdown");
}

#[test]
fn sole_explicit_container_becomes_the_root() {
    let tree = normalize(vec![Blocks::new(vec![
        Content::from(Block::markdown("a").with_id("test-id-1")),
        Content::from("b"),
    ])
    .with_id("outer")])
    .unwrap();
    assert_eq!(tree.id().as_ref().map(BlockId::as_str), Some("outer"));
    assert_eq!(tree.children().len(), 2);
    assert!(tree.children().iter().all(Node::is_leaf));
}

#[test]
fn sibling_containers_keep_the_wrapper() {
    let tree = normalize(vec![
        Blocks::new(vec!["a", "b"]),
        Blocks::new(vec!["c", "d"]),
    ])
    .unwrap();
    assert_eq!(tree.id(), &None);
    assert_eq!(tree.children().len(), 2);
    assert!(tree.children().iter().all(Node::is_group));
}

#[test]
fn container_next_to_a_leaf_keeps_the_wrapper() {
    let tree = normalize(vec![
        Content::from(Blocks::new(vec!["a", "b"])),
        Content::from("c"),
    ])
    .unwrap();
    assert_eq!(tree.children().len(), 2);
    assert!(tree.children()[0].is_group());
    assert!(tree.children()[1].is_leaf());
}

#[test]
fn single_leaf_keeps_the_wrapper() {
    let tree = normalize(vec!["only"]).unwrap();
    assert!(tree.is_group());
    assert_eq!(tree.children().len(), 1);
    assert!(tree.children()[0].is_leaf());
}

#[test]
fn empty_input_yields_an_empty_group() {
    let tree = normalize(Vec::<Content>::new()).unwrap();
    assert!(tree.is_group());
    assert!(tree.children().is_empty());
}

#[test]
fn sole_empty_container_collapses() {
    let tree = normalize(vec![Blocks::default().with_id("empty")]).unwrap();
    assert_eq!(tree.id().as_ref().map(BlockId::as_str), Some("empty"));
    assert!(tree.children().is_empty());
}

#[test]
fn only_the_top_level_wrapper_collapses() {
    let inner = Blocks::new(vec!["deep"]).with_id("inner");
    let tree = normalize(vec![Blocks::new(vec![inner]).with_id("outer")]).unwrap();
    assert_eq!(tree.id().as_ref().map(BlockId::as_str), Some("outer"));
    assert_eq!(tree.children().len(), 1);
    assert_eq!(
        tree.children()[0].id().as_ref().map(BlockId::as_str),
        Some("inner")
    );
}

#[test]
fn sibling_order_is_preserved_at_every_depth() {
    let tree = normalize(vec![
        Content::from("one"),
        Content::from(Blocks::new(vec!["two", "three"])),
        Content::from("four"),
    ])
    .unwrap();
    let texts: Vec<&str> = tree
        .preorder()
        .filter(|node| node.is_leaf())
        .map(markdown_text)
        .collect();
    assert_eq!(texts, vec!["one", "two", "three", "four"]);
}

#[test]
fn deep_nesting_is_supported() {
    let mut value = Content::from("leaf");
    for _ in 0..200 {
        value = Content::from(Blocks::new(vec![value]));
    }
    let tree = normalize(vec![value]).unwrap();
    assert_eq!(tree.node_count(), 201);
}
