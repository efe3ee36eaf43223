use test_utils::codeblock_fixture;

use super::ContentParser;
use crate::domain::models::ContentSegment;
use crate::domain::models::SegmentKind;

fn reconstruct(segments: &[ContentSegment]) -> String {
    return segments
        .iter()
        .map(|segment| return segment.text.to_string())
        .collect::<Vec<String>>()
        .join("");
}

#[test]
fn it_returns_single_prose_without_fences() {
    for text in [
        "Hello there",
        "",
        "  leading and trailing whitespace  \n",
        "inline `code` and ``double`` ticks",
        "two backticks ``\nnot a fence",
    ] {
        let res = ContentParser::parse(text);
        assert_eq!(res, vec![ContentSegment::prose(text)]);
    }
}

#[test]
fn it_parses_alternating_segments() {
    let text = "Here you go:\n```rust\nfn main() {}\n```\nAnd in Python:\n```python\nprint(1)\n```";
    let res = ContentParser::parse(text);

    assert_eq!(
        res,
        vec![
            ContentSegment::prose("Here you go:\n"),
            ContentSegment::code("rust", "fn main() {}"),
            ContentSegment::prose("\nAnd in Python:\n"),
            ContentSegment::code("python", "print(1)"),
        ]
    );
}

#[test]
fn it_keeps_trailing_prose() {
    let res = ContentParser::parse("```js\nfoo()\n```\nDone.");
    assert_eq!(
        res,
        vec![
            ContentSegment::code("js", "foo()"),
            ContentSegment::prose("\nDone."),
        ]
    );
}

#[test]
fn it_defaults_language_to_plaintext() {
    let res = ContentParser::parse("```\nabc123\n```");
    assert_eq!(res, vec![ContentSegment::code("plaintext", "abc123")]);
}

#[test]
fn it_trims_code_bodies() {
    let res = ContentParser::parse("```go\n\n   package main\n\n\n```");
    assert_eq!(res, vec![ContentSegment::code("go", "package main")]);
}

#[test]
fn it_treats_unterminated_fences_as_prose() {
    let text = "```js\nfoo";
    let res = ContentParser::parse(text);
    assert_eq!(res, vec![ContentSegment::prose(text)]);
}

#[test]
fn it_treats_text_after_an_unterminated_fence_as_prose() {
    let text = "Intro\n```py\nx = 1\n```\nthen\n```js\nnever closed";
    let res = ContentParser::parse(text);
    assert_eq!(
        res,
        vec![
            ContentSegment::prose("Intro\n"),
            ContentSegment::code("py", "x = 1"),
            ContentSegment::prose("\nthen\n```js\nnever closed"),
        ]
    );
}

#[test]
fn it_requires_a_line_break_after_the_opening_marker() {
    let text = "```not a fence``` just ticks";
    let res = ContentParser::parse(text);
    assert_eq!(res, vec![ContentSegment::prose(text)]);
}

#[test]
fn it_accepts_symbolic_language_tags() {
    let res = ContentParser::parse("```c++\nint main() {}\n```\n```c#\nclass A {}\n```");
    assert_eq!(
        res,
        vec![
            ContentSegment::code("c++", "int main() {}"),
            ContentSegment::prose("\n"),
            ContentSegment::code("c#", "class A {}"),
        ]
    );
}

#[test]
fn it_accepts_crlf_line_breaks() {
    let res = ContentParser::parse("```sql\r\nSELECT 1;\r\n```");
    assert_eq!(res, vec![ContentSegment::code("sql", "SELECT 1;")]);
}

#[test]
fn it_parses_the_fixture() {
    let res = ContentParser::parse(codeblock_fixture());
    let kinds = res
        .iter()
        .map(|segment| return segment.kind)
        .collect::<Vec<SegmentKind>>();

    assert_eq!(
        kinds,
        vec![
            SegmentKind::Prose,
            SegmentKind::Code,
            SegmentKind::Prose,
            SegmentKind::Code,
            SegmentKind::Prose,
            SegmentKind::Code,
            SegmentKind::Prose,
            SegmentKind::Code,
            SegmentKind::Prose,
        ]
    );

    let languages = ContentParser::code_blocks(&res)
        .iter()
        .map(|segment| return segment.language.clone().unwrap_or_default())
        .collect::<Vec<String>>();
    assert_eq!(languages, vec!["rust", "javascript", "plaintext", "python"]);

    insta::assert_snapshot!(res[5].text, @"abc123");
    insta::assert_snapshot!(res[8].text.trim(), @"That's it!");
}

#[test]
fn it_reconstructs_prose_losslessly() {
    let text = "Some prose.\n```rust\nfn a() {}\n```\nMore prose with `ticks`.\n";
    let res = ContentParser::parse(text);
    let rebuilt = reconstruct(&res);
    assert_eq!(rebuilt, "Some prose.\nfn a() {}\nMore prose with `ticks`.\n");
}

#[test]
fn it_never_emits_empty_prose_between_adjacent_fences() {
    let res = ContentParser::parse("```a\n1\n``````b\n2\n```");
    assert_eq!(
        res,
        vec![ContentSegment::code("a", "1"), ContentSegment::code("b", "2")]
    );
}

#[test]
fn it_is_restartable() {
    let segments = ContentParser::segments(codeblock_fixture());
    let first = segments.clone().collect::<Vec<ContentSegment>>();
    let second = segments.collect::<Vec<ContentSegment>>();
    assert_eq!(first, second);
    assert_eq!(first, ContentParser::parse(codeblock_fixture()));
}

#[test]
fn it_handles_multibyte_prose() {
    let text = "Voilà, ça marche 🎉\n```rust\nlet é = 1;\n```\n终";
    let res = ContentParser::parse(text);
    assert_eq!(
        res,
        vec![
            ContentSegment::prose("Voilà, ça marche 🎉\n"),
            ContentSegment::code("rust", "let é = 1;"),
            ContentSegment::prose("\n终"),
        ]
    );
}
