//! Doc-comment extraction: plain-text description, verbatim code examples,
//! note sections and per-argument descriptions.

use crate::types::{CodeExample, Note, NoteKind};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

static INLINE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\([^)]*\)").unwrap());
static REFERENCE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]]+)\]\[[^\]]*\]").unwrap());
static SHORTCUT_LINK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\[([^\]]+)\]").unwrap());
static LINK_DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[[^\]]+\]:\s*\S+").unwrap());
static STRONG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*([^*]+)\*\*|__([^_]+)__").unwrap());
static EMPHASIS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*([^*\s][^*]*)\*").unwrap());
static HEADING: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s{0,3}(#{1,6})\s+(.*?)\s*#*\s*$").unwrap());
static ARGUMENT_BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*[-*+]\s+`?([A-Za-z_][A-Za-z0-9_]*)`?\s*(?:[-:\u{2013}\u{2014}]\s*)?(.*)$")
        .unwrap()
});

/// Rustdoc code block attributes that do not name a language.
const RUSTDOC_ATTRIBUTES: &[&str] = &[
    "ignore",
    "no_run",
    "should_panic",
    "compile_fail",
    "test_harness",
    "standalone_crate",
    "edition2015",
    "edition2018",
    "edition2021",
    "edition2024",
];

/// What a doc comment decomposes into.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtractedDocs {
    pub description: String,
    pub examples: Vec<CodeExample>,
    pub notes: Vec<Note>,
    pub argument_docs: HashMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Body,
    Note(NoteKind),
    Arguments,
    Examples,
}

fn classify_heading(heading: &str) -> Section {
    match heading.trim().to_ascii_lowercase().as_str() {
        "panics" | "panic" => Section::Note(NoteKind::Panics),
        "safety" => Section::Note(NoteKind::Safety),
        "errors" => Section::Note(NoteKind::Errors),
        "warning" | "warnings" => Section::Note(NoteKind::Warning),
        "arguments" | "parameters" | "args" => Section::Arguments,
        "examples" | "example" => Section::Examples,
        _ => Section::Body,
    }
}

/// Line-oriented extraction state.
struct Extractor {
    section: Section,
    heading: Option<String>,
    paragraph: Vec<String>,
    last_paragraph: Option<String>,
    body: Vec<String>,
    note_text: Vec<String>,
    out: ExtractedDocs,
}

impl Extractor {
    fn new() -> Self {
        Self {
            section: Section::Body,
            heading: None,
            paragraph: Vec::new(),
            last_paragraph: None,
            body: Vec::new(),
            note_text: Vec::new(),
            out: ExtractedDocs::default(),
        }
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let text = self.paragraph.join(" ");
        self.paragraph.clear();

        match self.section {
            Section::Body => self.body.push(text.clone()),
            Section::Note(_) => self.note_text.push(text.clone()),
            Section::Arguments | Section::Examples => {}
        }
        self.last_paragraph = Some(text);
    }

    fn flush_note(&mut self) {
        if let Section::Note(kind) = self.section
            && !self.note_text.is_empty()
        {
            self.out.notes.push(Note {
                kind,
                text: self.note_text.join("\n\n"),
            });
        }
        self.note_text.clear();
    }

    fn start_section(&mut self, heading: String) {
        self.flush_paragraph();
        self.flush_note();
        self.section = classify_heading(&heading);
        if self.section == Section::Body {
            self.body.push(heading.clone());
        }
        self.heading = Some(heading);
        self.last_paragraph = None;
    }

    fn prose_line(&mut self, line: &str) {
        if line.trim().is_empty() {
            self.flush_paragraph();
            return;
        }
        if LINK_DEFINITION.is_match(line) {
            return;
        }
        if self.section == Section::Arguments
            && let Some(caps) = ARGUMENT_BULLET.captures(line)
        {
            let name = caps[1].to_string();
            let description = strip_markdown(caps[2].trim());
            if !description.is_empty() {
                self.out.argument_docs.entry(name).or_insert(description);
            }
            return;
        }
        self.paragraph.push(strip_markdown(line.trim()));
    }

    fn code_block(&mut self, info: &str, code: String) {
        self.flush_paragraph();
        let caption = self.last_paragraph.clone().or_else(|| self.heading.clone());
        self.out.examples.push(CodeExample {
            code,
            language: fence_language(info),
            caption,
        });
    }

    fn finish(mut self) -> ExtractedDocs {
        self.flush_paragraph();
        self.flush_note();
        self.out.description = self.body.join("\n\n");
        self.out
    }
}

/// Opening fence of a fenced code block: the fence marker and its info string.
fn opening_fence(line: &str) -> Option<(&str, &str)> {
    let trimmed = line.trim_start();
    for marker in ["```", "~~~"] {
        if trimmed.starts_with(marker) {
            let len = trimmed.len() - trimmed.trim_start_matches(marker.chars().next()?).len();
            let (fence, info) = trimmed.split_at(len);
            return Some((fence, info.trim()));
        }
    }
    None
}

fn closes_fence(line: &str, fence: &str) -> bool {
    let trimmed = line.trim();
    trimmed.starts_with(fence) && trimmed.chars().all(|c| Some(c) == fence.chars().next())
}

/// Language of a fenced block. Rustdoc attributes imply Rust.
fn fence_language(info: &str) -> Option<String> {
    let first = info
        .split(|c: char| c == ',' || c.is_whitespace())
        .find(|token| !token.is_empty())?;
    if RUSTDOC_ATTRIBUTES.contains(&first) || first.starts_with("edition") {
        Some("rust".to_string())
    } else {
        Some(first.to_string())
    }
}

/// Splits a doc comment into description, examples, notes and argument docs.
///
/// Code blocks are copied byte-for-byte, including rustdoc's hidden `# ` lines.
pub fn extract(docs: &str) -> ExtractedDocs {
    let mut extractor = Extractor::new();
    let mut lines = docs.split('\n');

    while let Some(line) = lines.next() {
        if let Some((fence, info)) = opening_fence(line) {
            let fence = fence.to_string();
            let info = info.to_string();
            let mut code = Vec::new();
            for inner in lines.by_ref() {
                if closes_fence(inner, &fence) {
                    break;
                }
                code.push(inner);
            }
            extractor.code_block(&info, code.join("\n"));
            continue;
        }

        if let Some(caps) = HEADING.captures(line) {
            extractor.start_section(strip_markdown(&caps[2]));
            continue;
        }

        extractor.prose_line(line);
    }

    extractor.finish()
}

/// Removes inline markdown markup, leaving code spans' contents untouched.
pub fn strip_markdown(text: &str) -> String {
    let text = INLINE_LINK.replace_all(text, "$1");
    let text = REFERENCE_LINK.replace_all(&text, "$1");
    let text = SHORTCUT_LINK.replace_all(&text, "$1");

    let mut out = String::with_capacity(text.len());
    for (i, segment) in text.split('`').enumerate() {
        if i % 2 == 1 {
            out.push_str(segment);
        } else {
            let plain = STRONG.replace_all(segment, "$1$2");
            let plain = EMPHASIS.replace_all(&plain, "$1");
            out.push_str(&plain);
        }
    }
    out
}

/// First sentence of a description, capped at `max_chars` characters.
pub fn first_sentence(text: &str, max_chars: usize) -> String {
    let paragraph = text.split("\n\n").next().unwrap_or_default().trim();
    let sentence = paragraph
        .char_indices()
        .find(|&(i, c)| {
            c == '.'
                && paragraph[i + 1..]
                    .chars()
                    .next()
                    .is_none_or(char::is_whitespace)
        })
        .map_or(paragraph, |(i, _)| &paragraph[..=i]);

    if sentence.chars().count() <= max_chars {
        return sentence.to_string();
    }
    let mut truncated: String = sentence.chars().take(max_chars.saturating_sub(3)).collect();
    truncated.push_str("...");
    truncated
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert2::check;
    use rstest::rstest;

    const VEC_PUSH: &str = "Appends an element to the back of a collection.

# Panics

Panics if the new capacity exceeds `isize::MAX` _bytes_.

# Examples

Pushing onto a vector:

```
let mut vec = vec![1, 2];
vec.push(3);
# assert_eq!(vec, [1, 2, 3]);
```

Time complexity is *amortized* O(1).

```rust,no_run
let v: Vec<u8> = Vec::new();
```
";

    #[test]
    fn description_excludes_sections_and_code() {
        let docs = extract(VEC_PUSH);
        check!(docs.description == "Appends an element to the back of a collection.");
    }

    #[test]
    fn examples_are_verbatim_with_captions() {
        let docs = extract(VEC_PUSH);
        check!(docs.examples.len() == 2);
        check!(docs.examples[0].code == "let mut vec = vec![1, 2];\nvec.push(3);\n# assert_eq!(vec, [1, 2, 3]);");
        check!(docs.examples[0].language == None);
        check!(docs.examples[0].caption.as_deref() == Some("Pushing onto a vector:"));
        check!(docs.examples[1].language.as_deref() == Some("rust"));
        check!(docs.examples[1].caption.as_deref() == Some("Time complexity is amortized O(1)."));
    }

    #[test]
    fn panics_section_becomes_note() {
        let docs = extract(VEC_PUSH);
        check!(docs.notes.len() == 1);
        check!(docs.notes[0].kind == NoteKind::Panics);
        check!(docs.notes[0].text.contains("isize::MAX"));
    }

    #[test]
    fn caption_falls_back_to_heading() {
        let docs = extract("Does things.\n\n# Examples\n\n```\nthing();\n```\n");
        check!(docs.examples[0].caption.as_deref() == Some("Examples"));
    }

    #[test]
    fn argument_bullets_are_collected() {
        let docs = extract(
            "Adds two numbers.\n\n# Arguments\n\n* `a` - The first operand\n- `b`: The second operand\n",
        );
        check!(docs.argument_docs.get("a").map(String::as_str) == Some("The first operand"));
        check!(docs.argument_docs.get("b").map(String::as_str) == Some("The second operand"));
        check!(docs.description == "Adds two numbers.");
    }

    #[test]
    fn unknown_headings_stay_in_description() {
        let docs = extract("Intro.\n\n## Performance\n\nFast.\n\n# Safety\n\nCaller must check.");
        check!(docs.description == "Intro.\n\nPerformance\n\nFast.");
        check!(docs.notes[0].kind == NoteKind::Safety);
        check!(docs.notes[0].text == "Caller must check.");
    }

    #[rstest]
    #[case("See [`Vec::push`](Vec::push) for details.", "See Vec::push for details.")]
    #[case("Uses [`HashMap`] and **bold** text.", "Uses HashMap and bold text.")]
    #[case("Keeps `*const T` and `*mut T` intact.", "Keeps *const T and *mut T intact.")]
    #[case("snake_case_names stay", "snake_case_names stay")]
    fn strips_inline_markdown(#[case] input: &str, #[case] expected: &str) {
        check!(strip_markdown(input) == expected);
    }

    #[test]
    fn link_definitions_are_dropped() {
        let docs = extract("Text with [link].\n\n[link]: https://example.com");
        check!(docs.description == "Text with link.");
    }

    #[rstest]
    #[case("Adds two numbers. Returns the sum.", 160, "Adds two numbers.")]
    #[case("Version 1.0 is here", 160, "Version 1.0 is here")]
    #[case("abcdefghij", 8, "abcde...")]
    fn first_sentence_cases(#[case] input: &str, #[case] max: usize, #[case] expected: &str) {
        check!(first_sentence(input, max) == expected);
    }

    #[test]
    fn tilde_fences_and_unterminated_blocks() {
        let docs = extract("~~~text\nplain\n~~~\n\n```\nlet x = 1;");
        check!(docs.examples.len() == 2);
        check!(docs.examples[0].language.as_deref() == Some("text"));
        check!(docs.examples[1].code == "let x = 1;");
    }
}
