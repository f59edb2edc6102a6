//! VOTL (Vim Outliner) document tooling: a tree model, a line-oriented
//! parser, a canonical formatter, and the archiver that moves completed
//! checkbox items from an active task list into a dated archive.

pub mod core {
    use serde::{Deserialize, Serialize};

    /// Role of a single outline line.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub enum ElementKind {
        /// A plain outline line that groups the lines indented under it.
        Heading,
        /// A task line carrying a `[_]`/`[X]` completion marker.
        Checkbox,
        /// Body text (`:` wrapped, `;` unwrapped).
        Text,
        /// Preformatted or otherwise unclassified content (`|`, `<`, `>`, blanks).
        Other,
    }

    /// One node of an outline tree.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
    pub struct Element {
        pub kind: ElementKind,
        /// Textual content of the line, without indentation or checkbox marker.
        pub value: String,
        /// Completion flag; meaningful only when `kind` is `Checkbox`.
        #[serde(default)]
        pub checked: bool,
        #[serde(default)]
        pub children: Vec<Element>,
    }

    impl Element {
        fn new(kind: ElementKind, value: impl Into<String>) -> Self {
            Self {
                kind,
                value: value.into(),
                checked: false,
                children: vec![],
            }
        }

        pub fn heading(value: impl Into<String>) -> Self {
            Self::new(ElementKind::Heading, value)
        }

        pub fn checkbox(value: impl Into<String>, checked: bool) -> Self {
            Self {
                checked,
                ..Self::new(ElementKind::Checkbox, value)
            }
        }

        pub fn text(value: impl Into<String>) -> Self {
            Self::new(ElementKind::Text, value)
        }

        pub fn other(value: impl Into<String>) -> Self {
            Self::new(ElementKind::Other, value)
        }

        pub fn is_heading(&self) -> bool {
            self.kind == ElementKind::Heading
        }

        /// A completed task: a checkbox whose marker is checked.
        pub fn is_checked_box(&self) -> bool {
            self.kind == ElementKind::Checkbox && self.checked
        }

        pub fn add_child(&mut self, child: Element) {
            self.children.push(child);
        }
    }

    /// An ordered outline document. Element order is authoring order and is
    /// preserved by every operation except explicit archiving moves.
    #[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
    pub struct Document {
        #[serde(default)]
        pub elements: Vec<Element>,
    }

    impl Document {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn is_empty(&self) -> bool {
            self.elements.is_empty()
        }

        /// First top-level heading with exactly this value, if any.
        pub fn find_heading(&self, value: &str) -> Option<&Element> {
            self.elements
                .iter()
                .find(|e| e.is_heading() && e.value == value)
        }
    }
}

pub mod parser {
    //! Line-oriented VOTL parser.
    //!
    //! Depth is the count of leading tabs; the remainder of each line is
    //! classified with `nom` combinators and the tree is stack-built from
    //! consecutive depths.

    use crate::core::{Document, Element};
    use nom::{
        IResult,
        character::complete::{char, one_of},
        combinator::opt,
        sequence::delimited,
    };
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum ParseError {
        #[error(
            "line {line}: indented {depth} levels deep but the enclosing element is at depth {max}"
        )]
        IndentJump { line: usize, depth: usize, max: usize },
    }

    /// Parse a whole outline document from its text.
    pub fn parse_document(input: &str) -> Result<Document, ParseError> {
        let mut doc = Document::new();
        // Invariant: stack[n] is an open element at depth n.
        let mut stack: Vec<Element> = Vec::new();

        for (idx, raw) in input.lines().enumerate() {
            let depth = raw.chars().take_while(|c| *c == '\t').count();
            let element = classify(&raw[depth..]);

            while stack.len() > depth {
                close_top(&mut stack, &mut doc.elements);
            }
            if depth > stack.len() {
                return Err(ParseError::IndentJump {
                    line: idx + 1,
                    depth,
                    max: stack.len(),
                });
            }
            stack.push(element);
        }

        while !stack.is_empty() {
            close_top(&mut stack, &mut doc.elements);
        }

        Ok(doc)
    }

    fn close_top(stack: &mut Vec<Element>, roots: &mut Vec<Element>) {
        if let Some(done) = stack.pop() {
            match stack.last_mut() {
                Some(parent) => parent.children.push(done),
                None => roots.push(done),
            }
        }
    }

    /// Classify a line with its indentation already stripped.
    fn classify(line: &str) -> Element {
        if let Ok((text, checked)) = checkbox_marker(line) {
            return Element::checkbox(text, checked);
        }
        if line.trim().is_empty() {
            return Element::other(line);
        }
        match line.chars().next() {
            Some(':') | Some(';') => Element::text(line),
            Some('|') | Some('<') | Some('>') => Element::other(line),
            _ => Element::heading(line),
        }
    }

    fn checkbox_marker(i: &str) -> IResult<&str, bool> {
        let (i, state) = delimited(char('['), one_of("_Xx"), char(']'))(i)?;
        let (i, _) = opt(char(' '))(i)?;
        Ok((i, state != '_'))
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::core::ElementKind;

        #[test]
        fn classifies_line_kinds() {
            assert_eq!(classify("Projects").kind, ElementKind::Heading);
            assert_eq!(classify("[_] buy milk").kind, ElementKind::Checkbox);
            assert_eq!(classify(": wrapped body text").kind, ElementKind::Text);
            assert_eq!(classify("; unwrapped body text").kind, ElementKind::Text);
            assert_eq!(classify("| a | b |").kind, ElementKind::Other);
            assert_eq!(classify("").kind, ElementKind::Other);
        }

        #[test]
        fn checkbox_state_and_value() {
            let checked = classify("[X] call bank");
            assert!(checked.checked);
            assert_eq!(checked.value, "call bank");

            let lowercase = classify("[x] call bank");
            assert!(lowercase.checked);

            let open = classify("[_] call bank");
            assert!(!open.checked);
            assert_eq!(open.value, "call bank");
        }

        #[test]
        fn builds_tree_from_tab_depth() {
            let input =
                "Work\n\t[_] draft report\n\t\t: needs the Q3 numbers\n\t[X] expenses\nHome\n";
            let doc = parse_document(input).expect("parse");

            assert_eq!(doc.elements.len(), 2);
            let work = &doc.elements[0];
            assert_eq!(work.value, "Work");
            assert_eq!(work.children.len(), 2);
            assert_eq!(work.children[0].children.len(), 1);
            assert_eq!(work.children[0].children[0].value, ": needs the Q3 numbers");
            assert!(work.children[1].checked);
            assert!(doc.elements[1].children.is_empty());
        }

        #[test]
        fn rejects_indent_jump_with_line_number() {
            let input = "Work\n\t\t[_] orphaned\n";
            let err = parse_document(input).expect_err("must be malformed");
            match err {
                ParseError::IndentJump { line, depth, max } => {
                    assert_eq!(line, 2);
                    assert_eq!(depth, 2);
                    assert_eq!(max, 1);
                }
            }
        }

        #[test]
        fn blank_lines_are_preserved_as_other_elements() {
            let doc = parse_document("Work\n\nHome\n").expect("parse");
            assert_eq!(doc.elements.len(), 3);
            assert_eq!(doc.elements[1].kind, ElementKind::Other);
            assert_eq!(doc.elements[1].value, "");
        }
    }
}

pub mod format {
    use crate::core::{Document, Element, ElementKind};

    /// Render a document back to VOTL text: one tab per depth level, `[X] `
    /// or `[_] ` checkbox markers, all other values verbatim.
    pub fn format_document(doc: &Document) -> String {
        let mut out = String::new();
        for element in &doc.elements {
            render_element(&mut out, element, 0);
        }
        out
    }

    fn render_element(out: &mut String, element: &Element, depth: usize) {
        for _ in 0..depth {
            out.push('\t');
        }
        if element.kind == ElementKind::Checkbox {
            out.push_str(if element.checked { "[X]" } else { "[_]" });
            if !element.value.is_empty() {
                out.push(' ');
                out.push_str(&element.value);
            }
        } else {
            out.push_str(&element.value);
        }
        out.push('\n');
        for child in &element.children {
            render_element(out, child, depth + 1);
        }
    }

}

pub mod archive {
    //! The reconciliation pass: move every checked checkbox nested directly
    //! under a top-level heading of the active document into the archive
    //! heading with the same value, stamping each moved item with the date.
    //!
    //! The pass is a pure in-memory transformation. It performs no I/O and
    //! reads no clocks; the date is injected by the caller.

    use crate::core::{Document, Element};
    use chrono::NaiveDate;
    use serde::Serialize;

    /// Label of the marker element appended to every archived item.
    pub const ARCHIVED_MARKER: &str = "Archived";

    const DATE_FORMAT: &str = "%Y-%m-%d";

    /// Per-heading outcome of a reconciliation pass.
    #[derive(Debug, Clone, PartialEq, Eq, Serialize)]
    pub struct SectionReport {
        pub heading: String,
        pub moved: usize,
    }

    #[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
    pub struct ArchiveReport {
        /// One entry per top-level heading of the active document, in order.
        pub sections: Vec<SectionReport>,
    }

    impl ArchiveReport {
        pub fn total_moved(&self) -> usize {
            self.sections.iter().map(|s| s.moved).sum()
        }
    }

    /// Reconcile `active` against `archive` for the given date.
    ///
    /// Every top-level heading of `active` is processed in order: its checked
    /// checkbox children move (stamped) into the first archive heading with
    /// an identical value, which is created at the end of the archive if
    /// absent. All other elements keep their relative order and content.
    /// A heading with nothing to move still gets its archive counterpart.
    pub fn reconcile(
        active: &mut Document,
        archive: &mut Document,
        date: NaiveDate,
    ) -> ArchiveReport {
        let mut report = ArchiveReport::default();

        for element in &mut active.elements {
            if !element.is_heading() {
                continue;
            }

            let (mut moved, keep): (Vec<Element>, Vec<Element>) =
                std::mem::take(&mut element.children)
                    .into_iter()
                    .partition(Element::is_checked_box);
            for item in &mut moved {
                stamp_archived(item, date);
            }

            report.sections.push(SectionReport {
                heading: element.value.clone(),
                moved: moved.len(),
            });
            file_under_heading(archive, &element.value, moved);
            element.children = keep;
        }

        report
    }

    /// Append the two archival-metadata children: the marker line, then a
    /// text element valued with a tab followed by the `YYYY-MM-DD` date.
    fn stamp_archived(item: &mut Element, date: NaiveDate) {
        item.add_child(Element::heading(ARCHIVED_MARKER));
        item.add_child(Element::text(format!("\t{}", date.format(DATE_FORMAT))));
    }

    fn file_under_heading(archive: &mut Document, value: &str, moved: Vec<Element>) {
        let existing = archive
            .elements
            .iter_mut()
            .find(|e| e.is_heading() && e.value == value);
        match existing {
            Some(heading) => heading.children.extend(moved),
            None => {
                let mut heading = Element::heading(value);
                heading.children = moved;
                archive.elements.push(heading);
            }
        }
    }

}

pub mod storage {
    //! Filesystem collaborator for the reconciler: load a document from a
    //! path, persist one back. Load failures distinguish the recoverable
    //! cases (missing or malformed file) from real I/O trouble so the caller
    //! can decide which side of the run they are fatal for.

    use crate::core::Document;
    use crate::format::format_document;
    use crate::parser::{ParseError, parse_document};
    use std::{
        fs, io,
        path::{Path, PathBuf},
    };
    use thiserror::Error;

    #[derive(Debug, Error)]
    pub enum LoadError {
        #[error("{path:?}: file not found")]
        NotFound { path: PathBuf },
        #[error("{path:?}: {source}")]
        Malformed {
            path: PathBuf,
            #[source]
            source: ParseError,
        },
        #[error("{path:?}: {source}")]
        Io {
            path: PathBuf,
            #[source]
            source: io::Error,
        },
    }

    impl LoadError {
        /// Whether the caller may substitute an empty document: true for a
        /// missing or unparsable file, false for any other I/O failure.
        pub fn is_recoverable(&self) -> bool {
            matches!(self, Self::NotFound { .. } | Self::Malformed { .. })
        }
    }

    #[derive(Debug, Error)]
    #[error("writing {path:?}: {source}")]
    pub struct SaveError {
        pub path: PathBuf,
        #[source]
        pub source: io::Error,
    }

    pub trait DocumentStore {
        fn load(&self, path: &Path) -> Result<Document, LoadError>;
        fn save(&self, doc: &Document, path: &Path) -> Result<(), SaveError>;
    }

    /// Plain-file store: whole documents are read and written in full.
    pub struct FsStore;

    impl DocumentStore for FsStore {
        fn load(&self, path: &Path) -> Result<Document, LoadError> {
            let text = fs::read_to_string(path).map_err(|source| {
                if source.kind() == io::ErrorKind::NotFound {
                    LoadError::NotFound {
                        path: path.to_path_buf(),
                    }
                } else {
                    LoadError::Io {
                        path: path.to_path_buf(),
                        source,
                    }
                }
            })?;
            parse_document(&text).map_err(|source| LoadError::Malformed {
                path: path.to_path_buf(),
                source,
            })
        }

        fn save(&self, doc: &Document, path: &Path) -> Result<(), SaveError> {
            fs::write(path, format_document(doc)).map_err(|source| SaveError {
                path: path.to_path_buf(),
                source,
            })
        }
    }

    /// Resolved once from arguments and environment, then passed explicitly
    /// so nothing below the CLI reads ambient process state.
    #[derive(Debug, Clone)]
    pub struct Config {
        pub base_dir: PathBuf,
    }

    impl Config {
        pub fn resolve(&self, name: &str) -> PathBuf {
            self.base_dir.join(name)
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn missing_file_is_recoverable_not_found() {
            let tmp = tempfile::tempdir().expect("tempdir");
            let err = FsStore
                .load(&tmp.path().join("absent.otl"))
                .expect_err("must fail");
            assert!(matches!(err, LoadError::NotFound { .. }));
            assert!(err.is_recoverable());
        }

        #[test]
        fn malformed_file_is_recoverable() {
            let tmp = tempfile::tempdir().expect("tempdir");
            let path = tmp.path().join("bad.otl");
            fs::write(&path, "Work\n\t\t[_] jumped two levels\n").expect("write");

            let err = FsStore.load(&path).expect_err("must fail");
            assert!(matches!(err, LoadError::Malformed { .. }));
            assert!(err.is_recoverable());
        }

        #[test]
        fn save_then_load_returns_the_same_document() {
            let tmp = tempfile::tempdir().expect("tempdir");
            let path = tmp.path().join("list.otl");
            let doc = parse_document("Work\n\t[X] expenses\n\t: note\n").expect("parse");

            FsStore.save(&doc, &path).expect("save");
            let reloaded = FsStore.load(&path).expect("load");
            assert_eq!(reloaded, doc);
        }

        #[test]
        fn config_resolves_names_against_base_dir() {
            let config = Config {
                base_dir: PathBuf::from("/gtd"),
            };
            assert_eq!(
                config.resolve("next_actions.otl"),
                PathBuf::from("/gtd/next_actions.otl")
            );
        }
    }
}

pub use archive::{ArchiveReport, reconcile};
pub use format::format_document;
pub use parser::parse_document;
