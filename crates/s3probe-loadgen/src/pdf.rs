//! PDF rendering of generated test documents.
//!
//! One Helvetica text block per A4 page, as many pages as the wrapped lines
//! need, and an info dictionary carrying the title.

use lopdf::content::{Content, Operation};
use lopdf::{Document, Object, ObjectId, Stream, dictionary};

use crate::document::DocumentContent;

const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;
const MARGIN: i64 = 50;
const FONT_SIZE: i64 = 10;
const LEADING: i64 = 12;
const WRAP_AT: usize = 95;
const LINES_PER_PAGE: usize = 61;

/// Render `content` as a PDF document.
pub fn render_pdf(content: &DocumentContent) -> lopdf::Result<Vec<u8>> {
    let lines: Vec<String> = content
        .text_lines()
        .iter()
        .flat_map(|line| wrap(line, WRAP_AT))
        .collect();
    let title = format!("{} {}", content.title, content.uuid);
    render_lines(&title, &lines)
}

/// Render pre-wrapped lines under the given document title.
fn render_lines(title: &str, lines: &[String]) -> lopdf::Result<Vec<u8>> {
    let mut doc = Document::with_version("1.4");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });

    let chunks: Vec<&[String]> = if lines.is_empty() {
        vec![&[]]
    } else {
        lines.chunks(LINES_PER_PAGE).collect()
    };
    let mut kids: Vec<Object> = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        let content_id = doc.add_object(Stream::new(dictionary! {}, page_content(chunk).encode()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let count = Object::Integer(i64::try_from(kids.len()).unwrap_or(i64::MAX));
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
            "Resources" => resources_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(PAGE_WIDTH),
                Object::Integer(PAGE_HEIGHT),
            ],
        }),
    );

    let catalog_id: ObjectId = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => Object::string_literal(win_ansi(title)),
        "Producer" => Object::string_literal("s3probe"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    Ok(out)
}

fn page_content(lines: &[String]) -> Content {
    let mut operations = vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec!["F1".into(), Object::Integer(FONT_SIZE)]),
        Operation::new("TL", vec![Object::Integer(LEADING)]),
        Operation::new(
            "Td",
            vec![Object::Integer(MARGIN), Object::Integer(PAGE_HEIGHT - MARGIN)],
        ),
    ];
    for line in lines {
        operations.push(Operation::new("Tj", vec![Object::string_literal(win_ansi(line))]));
        operations.push(Operation::new("T*", vec![]));
    }
    operations.push(Operation::new("ET", vec![]));
    Content { operations }
}

/// Encode text for the WinAnsi font: Latin-1 characters map to their byte,
/// anything else becomes `?`.
fn win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

/// Greedy word wrap; words longer than `width` are split.
fn wrap(line: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in line.split_whitespace() {
        let mut word = word;
        while word.chars().count() > width {
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            let split = word.char_indices().nth(width).map_or(word.len(), |(i, _)| i);
            lines.push(word[..split].to_owned());
            word = &word[split..];
        }
        let needed = current.chars().count() + usize::from(!current.is_empty()) + word.chars().count();
        if needed > width && !current.is_empty() {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() || lines.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    fn title_of(doc: &Document) -> Vec<u8> {
        let info = doc
            .trailer
            .get(b"Info")
            .and_then(Object::as_reference)
            .expect("info reference");
        doc.get_object(info)
            .and_then(Object::as_dict)
            .and_then(|d| d.get(b"Title"))
            .and_then(Object::as_str)
            .expect("title")
            .to_vec()
    }

    fn shown_text(doc: &Document, page: ObjectId) -> Vec<Vec<u8>> {
        let content = Content::decode(&doc.get_page_content(page).expect("content")).expect("decode");
        content
            .operations
            .iter()
            .filter(|op| op.operator == "Tj")
            .filter_map(|op| op.operands.first().and_then(|o| o.as_str().ok()))
            .map(<[u8]>::to_vec)
            .collect()
    }

    #[test]
    fn test_should_encode_latin1_for_winansi() {
        assert_eq!(win_ansi("a(b)"), b"a(b)".to_vec());
        assert_eq!(win_ansi("Zwölf"), vec![b'Z', b'w', 0xf6, b'l', b'f']);
        assert_eq!(win_ansi("…"), b"?".to_vec());
    }

    #[test]
    fn test_should_wrap_on_word_boundaries() {
        assert_eq!(wrap("aaa bbb ccc", 7), vec!["aaa bbb", "ccc"]);
        assert_eq!(wrap("", 10), vec![""]);
        assert_eq!(wrap("abcdefghij", 4), vec!["abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_should_produce_loadable_document() {
        let pdf = render_lines("T", &["hello".to_owned()]).expect("render");
        assert!(pdf.starts_with(b"%PDF-1.4"));

        let doc = Document::load_mem(&pdf).expect("load");
        let pages = doc.get_pages();
        assert_eq!(pages.len(), 1);
        assert_eq!(shown_text(&doc, pages[&1]), vec![b"hello".to_vec()]);
    }

    #[test]
    fn test_should_split_long_text_into_pages() {
        let lines: Vec<String> = (0..=LINES_PER_PAGE).map(|i| format!("line {i}")).collect();
        let doc = Document::load_mem(&render_lines("T", &lines).expect("render")).expect("load");

        let pages = doc.get_pages();
        assert_eq!(pages.len(), 2);
        assert_eq!(shown_text(&doc, pages[&1]).len(), LINES_PER_PAGE);
        assert_eq!(shown_text(&doc, pages[&2]), vec![b"line 61".to_vec()]);
    }

    #[test]
    fn test_should_render_document_title() {
        let content = DocumentContent {
            uuid: "u-1".to_owned(),
            time: 0,
            counter: 1,
            title: "Spendenquittung (Kopie).pdf".to_owned(),
            meta_data: Default::default(),
        };
        let doc = Document::load_mem(&render_pdf(&content).expect("render")).expect("load");

        assert_eq!(title_of(&doc), b"Spendenquittung (Kopie).pdf u-1".to_vec());
        let pages = doc.get_pages();
        assert!(shown_text(&doc, pages[&1]).contains(&b"Counter = 1".to_vec()));
    }
}
