use blockdoc::document::serialize;
use quick_xml::Reader;
use quick_xml::events::Event;
use blockdoc::{
    AttachmentRef, BigNumber, BlockId, BlockNode, DocumentMeta, LeafContent, Node, OutputMode,
    Payload, Schema,
};

fn leaf(id: &str, content: LeafContent) -> BlockNode {
    Node::leaf(BlockId::new(id), content)
}

fn group(id: &str, children: Vec<BlockNode>) -> BlockNode {
    Node::group(BlockId::new(id), children)
}

fn markdown(id: &str, text: &str) -> BlockNode {
    leaf(
        id,
        LeafContent::Markdown {
            text: Payload::Text(text.to_string()),
        },
    )
}

fn meta() -> DocumentMeta {
    DocumentMeta::new(OutputMode::Attached)
        .with_title("TITLE")
        .with_description("DESCRIPTION")
}

fn render(tree: &BlockNode) -> String {
    serialize(tree, &meta()).expect("serialize failed").into_string()
}

#[test]
fn root_carries_metadata() {
    let xml = render(&group("block-1", vec![markdown("a", "hi")]));
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains(
        "<Report version=\"1\" mode=\"attached\" title=\"TITLE\" description=\"DESCRIPTION\">"
    ));
    assert!(xml.trim_end().ends_with("</Report>"));
}

#[test]
fn metadata_is_optional() {
    let tree = group("block-1", vec![]);
    let xml = serialize(&tree, &DocumentMeta::new(OutputMode::Embedded))
        .unwrap()
        .into_string();
    assert!(xml.contains("<Report version=\"1\" mode=\"embedded\">"));
    assert!(xml.contains("<Group id=\"block-1\"/>"));
    assert!(Schema::builtin().is_valid(&xml));
}

#[test]
fn markup_in_text_is_escaped() {
    let tree = group(
        "block-1",
        vec![markdown("test-id-1", "# Test <hello/> & </hello> \"quoted\"")],
    );
    let xml = render(&tree);
    assert!(!xml.contains("<hello/>"));
    assert!(xml.contains("&lt;hello/&gt; &amp; &lt;/hello&gt;"));
    assert!(Schema::builtin().is_valid(&xml));
}

#[test]
fn markup_in_attributes_is_escaped() {
    let tree = group("block-1", vec![]);
    let meta = DocumentMeta::new(OutputMode::Attached).with_title("a \"quoted\" <title> & more");
    let xml = serialize(&tree, &meta).unwrap().into_string();
    assert!(xml.contains("title=\"a &quot;quoted&quot; &lt;title&gt; &amp; more\""));
    assert!(Schema::builtin().is_valid(&xml));
}

fn read_attribute(xml: &str, element: &[u8], key: &[u8]) -> String {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event().unwrap() {
            Event::Start(tag) | Event::Empty(tag) if tag.name().as_ref() == element => {
                let attribute = tag
                    .try_get_attribute(key)
                    .unwrap()
                    .expect("attribute missing");
                return attribute.unescape_value().unwrap().into_owned();
            }
            Event::Eof => panic!("element not found"),
            _ => {}
        }
    }
}

#[test]
fn whitespace_in_attributes_survives_a_round_trip() {
    let title = "line one\nline two\tindented\r\nend";
    let caption = "first\nsecond";
    let tree = group(
        "root",
        vec![leaf(
            "t",
            LeafContent::Table {
                caption: Some(caption.to_string()),
                html: Payload::Text("<p/>".to_string()),
            },
        )],
    );
    let meta = DocumentMeta::new(OutputMode::Attached).with_title(title);
    let xml = serialize(&tree, &meta).unwrap().into_string();

    assert!(xml.contains("title=\"line one&#10;line two&#9;indented&#13;&#10;end\""));
    assert!(xml.contains("caption=\"first&#10;second\""));
    assert!(Schema::builtin().is_valid(&xml));
    assert_eq!(read_attribute(&xml, b"Report", b"title"), title);
    assert_eq!(read_attribute(&xml, b"Table", b"caption"), caption);
}

#[test]
fn children_follow_sibling_order() {
    let tree = group(
        "root",
        vec![
            markdown("first", "1"),
            group("middle", vec![markdown("inner", "2")]),
            markdown("last", "3"),
        ],
    );
    let xml = render(&tree);
    let first = xml.find("id=\"first\"").unwrap();
    let middle = xml.find("id=\"middle\"").unwrap();
    let inner = xml.find("id=\"inner\"").unwrap();
    let last = xml.find("id=\"last\"").unwrap();
    assert!(first < middle && middle < inner && inner < last);
}

#[test]
fn attached_payload_is_written_as_a_reference() {
    let tree = group(
        "root",
        vec![leaf(
            "logo",
            LeafContent::Media {
                name: Some("logo.png".to_string()),
                mime: "image/png".to_string(),
                caption: None,
                data: Payload::Attached(AttachmentRef::new(0)),
            },
        )],
    );
    let xml = render(&tree);
    assert!(xml.contains(
        "<Media id=\"logo\" name=\"logo.png\" type=\"image/png\" src=\"attachment://0\"/>"
    ));
    assert!(Schema::builtin().is_valid(&xml));
}

#[test]
fn inline_bytes_become_a_data_uri() {
    let tree = group(
        "root",
        vec![leaf(
            "data",
            LeafContent::File {
                name: "list.json".to_string(),
                mime: "application/json".to_string(),
                data: Payload::Bytes(b"[1,2,3]".to_vec()),
            },
        )],
    );
    let xml = render(&tree);
    assert!(xml.contains("src=\"data:application/json;base64,WzEsMiwzXQ==\""));
    assert!(Schema::builtin().is_valid(&xml));
}

#[test]
fn big_number_is_attributes_only() {
    let number = BigNumber {
        heading: "Tests written".to_string(),
        value: "11".to_string(),
        change: Some("2".to_string()),
        is_upward_change: Some(true),
        ..BigNumber::default()
    };
    let tree = group("root", vec![leaf("n", LeafContent::BigNumber(number))]);
    let xml = render(&tree);
    assert!(xml.contains(
        "<BigNumber id=\"n\" heading=\"Tests written\" value=\"11\" change=\"2\" is_upward_change=\"true\"/>"
    ));
    assert!(Schema::builtin().is_valid(&xml));
}

#[test]
fn text_outside_xml_characters_falls_back_to_a_data_uri() {
    let tree = group("root", vec![markdown("ctl", "bell \u{7} here")]);
    let xml = render(&tree);
    assert!(!xml.contains('\u{7}'));
    assert!(xml.contains("<Markdown id=\"ctl\" src=\"data:text/markdown;base64,"));
    assert!(Schema::builtin().is_valid(&xml));
}

#[test]
fn every_leaf_kind_validates() {
    let tree = group(
        "root",
        vec![
            markdown("md", "**bold**"),
            leaf(
                "code",
                LeafContent::Code {
                    language: "rust".to_string(),
                    code: Payload::Text("fn main() {}".to_string()),
                },
            ),
            leaf(
                "html",
                LeafContent::Html {
                    html: Payload::Text("<p>raw</p>".to_string()),
                },
            ),
            leaf(
                "plot",
                LeafContent::Plot {
                    caption: Some("Plot Asset".to_string()),
                    responsive: true,
                    spec: Payload::Bytes(b"{\"mark\":\"line\"}".to_vec()),
                },
            ),
            leaf(
                "table",
                LeafContent::Table {
                    caption: None,
                    html: Payload::Text("<table><tr><td>1</td></tr></table>".to_string()),
                },
            ),
            leaf(
                "dt",
                LeafContent::DataTable {
                    caption: Some("Test DataTable".to_string()),
                    can_pivot: true,
                    data: Payload::Attached(AttachmentRef::new(3)),
                },
            ),
            group("empty", vec![]),
        ],
    );
    let xml = render(&tree);
    assert_eq!(Schema::builtin().validate(&xml), Ok(()));
}

#[test]
fn serialization_is_deterministic() {
    let tree = group(
        "root",
        vec![markdown("a", "one"), group("g", vec![markdown("b", "two")])],
    );
    assert_eq!(render(&tree), render(&tree.clone()));
}
