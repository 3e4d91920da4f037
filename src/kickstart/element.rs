//! Document model for split kickstart files.
//!
//! A parsed kickstart document is an ordered sequence of [`KickstartElement`]
//! values. Each element is one command line or one section (header plus raw
//! body), tagged with the file and 1-based line number it came from. The
//! sequence lives in a [`KickstartElements`] store which tracks which
//! elements have already been claimed by a service module, so the remainder
//! can be reported as unprocessed kickstart.
//!
//! Elements are created once by the parser and never modified afterwards.
//! Claiming clones the matched elements into an [`ElementBundle`], which can
//! render itself back to literal kickstart text and answer "which original
//! line does rendered line N come from" via [`LineReferences`].

use std::fmt;

use serde::Serialize;

/// Filename used when the origin of a line is not known.
pub const UNKNOWN_PROVENANCE: &str = "<unknown>";

/// A (line, file) pair identifying where an element or error originated.
///
/// Line numbers are 1-based. Line 0 with an empty file is the "no position"
/// sentinel used for padding in [`LineReferences`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourcePosition {
    pub line: usize,
    pub file: String,
}

impl SourcePosition {
    pub fn new(line: usize, file: impl Into<String>) -> Self {
        Self {
            line,
            file: file.into(),
        }
    }

    /// The "no position" sentinel.
    pub fn none() -> Self {
        Self {
            line: 0,
            file: String::new(),
        }
    }

    /// A position whose line is known but whose file could not be resolved.
    ///
    /// Used when an error line reported by a module cannot be mapped back
    /// through the reverse line index.
    pub fn unknown_provenance(line: usize) -> Self {
        Self {
            line,
            file: UNKNOWN_PROVENANCE.to_string(),
        }
    }

    pub fn is_none(&self) -> bool {
        self.line == 0
    }
}

impl fmt::Display for SourcePosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Syntactic kind of a kickstart element.
///
/// Addons (`%addon <name> [args]`) share section syntax but are classified
/// separately: a filter asking for section `addon` never matches them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Command,
    Section,
    Addon,
}

/// One parsed unit of a kickstart document.
///
/// For commands, `lines` holds the verbatim source line(s). For sections and
/// addons, `lines` holds the raw body; the header is reconstructed from the
/// split `args` and the `%end` terminator is re-added on rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KickstartElement {
    args: Vec<String>,
    lines: Vec<String>,
    lineno: usize,
    filename: String,
}

impl KickstartElement {
    /// Create an element from split header args and raw content lines.
    ///
    /// Each entry of `lines` is expected to keep its trailing newline.
    pub fn new(
        args: Vec<String>,
        lines: Vec<String>,
        lineno: usize,
        filename: impl Into<String>,
    ) -> Self {
        Self {
            args,
            lines,
            lineno,
            filename: filename.into(),
        }
    }

    pub fn kind(&self) -> ElementKind {
        match self.args.first() {
            Some(first) if first == "%addon" => ElementKind::Addon,
            Some(first) if first.starts_with('%') => ElementKind::Section,
            _ => ElementKind::Command,
        }
    }

    pub fn is_command(&self) -> bool {
        self.kind() == ElementKind::Command
    }

    pub fn is_section(&self) -> bool {
        self.kind() == ElementKind::Section
    }

    pub fn is_addon(&self) -> bool {
        self.kind() == ElementKind::Addon
    }

    /// Name the element is filtered by.
    ///
    /// Commands use the command word, sections the header token without the
    /// leading `%`, addons their first argument. An addon without a name
    /// yields the empty string rather than an error.
    pub fn name(&self) -> &str {
        match self.kind() {
            ElementKind::Command => self.args.first().map(String::as_str).unwrap_or(""),
            ElementKind::Section => self.args[0].trim_start_matches('%'),
            ElementKind::Addon => self.args.get(1).map(String::as_str).unwrap_or(""),
        }
    }

    /// Header args as split by the parser. For commands this includes the
    /// command word itself.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Raw content lines (body lines for sections, source lines for commands).
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Line number of the element's header line in its originating file.
    pub fn lineno(&self) -> usize {
        self.lineno
    }

    /// Path of the file the element came from.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn source_position(&self) -> SourcePosition {
        SourcePosition::new(self.lineno, self.filename.clone())
    }

    /// Verbatim kickstart text that re-parses to this element.
    pub fn content(&self) -> String {
        match self.kind() {
            ElementKind::Command => self.lines.concat(),
            ElementKind::Section | ElementKind::Addon => {
                format!("{}\n{}%end\n", self.args.join(" "), self.lines.concat())
            }
        }
    }

    /// Number of lines `content()` occupies in rendered output.
    fn rendered_line_count(&self) -> usize {
        match self.kind() {
            ElementKind::Command => self.lines.len(),
            // header + body + %end
            ElementKind::Section | ElementKind::Addon => self.lines.len() + 2,
        }
    }
}

/// Selection criterion over elements: accepted command names, section names
/// (without the leading `%`) and addon names.
///
/// An empty filter selects nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ElementFilter {
    pub commands: Vec<String>,
    pub sections: Vec<String>,
    pub addons: Vec<String>,
}

impl ElementFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty() && self.sections.is_empty() && self.addons.is_empty()
    }

    pub fn matches(&self, element: &KickstartElement) -> bool {
        let name = element.name();
        match element.kind() {
            ElementKind::Command => self.commands.iter().any(|c| c == name),
            ElementKind::Section => self.sections.iter().any(|s| s == name),
            ElementKind::Addon => self.addons.iter().any(|a| a == name),
        }
    }
}

/// Helper for building a filter that accepts a set of command names.
pub fn commands(names: impl IntoIterator<Item = impl Into<String>>) -> ElementFilter {
    ElementFilter {
        commands: names.into_iter().map(|n| n.into()).collect(),
        ..ElementFilter::default()
    }
}

/// Ordered element store with per-element claim tracking.
///
/// Elements keep the order they appeared in the source document. Claiming
/// marks elements as processed; the claim is sticky, so reading the same
/// selection again never turns a processed element back into an unprocessed
/// one.
#[derive(Debug, Default)]
pub struct KickstartElements {
    elements: Vec<KickstartElement>,
    processed: Vec<bool>,
}

impl KickstartElements {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, element: KickstartElement) {
        self.elements.push(element);
        self.processed.push(false);
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// All elements in document order.
    pub fn all(&self) -> &[KickstartElement] {
        &self.elements
    }

    /// Indices of elements matching `filter`, in document order. Pure read;
    /// does not affect claim tracking.
    pub fn select(&self, filter: &ElementFilter) -> Vec<usize> {
        self.elements
            .iter()
            .enumerate()
            .filter(|(_, e)| filter.matches(e))
            .map(|(i, _)| i)
            .collect()
    }

    /// Claim the elements matching `filter`: mark them processed and return
    /// them as a bundle. Elements already processed by an earlier claim are
    /// still included when they match, so repeated claims are idempotent.
    pub fn claim(&mut self, filter: &ElementFilter) -> ElementBundle {
        let indices = self.select(filter);
        for &i in &indices {
            self.processed[i] = true;
        }
        self.bundle_of(&indices)
    }

    /// Bundle of all elements no module has claimed yet.
    pub fn unprocessed(&self) -> ElementBundle {
        let indices: Vec<usize> = (0..self.elements.len())
            .filter(|&i| !self.processed[i])
            .collect();
        self.bundle_of(&indices)
    }

    /// Bundle of every element in the document.
    pub fn full_bundle(&self) -> ElementBundle {
        let indices: Vec<usize> = (0..self.elements.len()).collect();
        self.bundle_of(&indices)
    }

    fn bundle_of(&self, indices: &[usize]) -> ElementBundle {
        ElementBundle {
            elements: indices.iter().map(|&i| self.elements[i].clone()).collect(),
        }
    }
}

/// Ordered subsequence of a document assigned to one module (or to the
/// unprocessed remainder).
#[derive(Debug, Clone, Default)]
pub struct ElementBundle {
    elements: Vec<KickstartElement>,
}

impl ElementBundle {
    pub fn elements(&self) -> &[KickstartElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Literal kickstart text of the bundle, elements concatenated in
    /// document order.
    pub fn render(&self) -> String {
        self.elements.iter().map(|e| e.content()).collect()
    }

    /// Reverse index from rendered line numbers back to original positions.
    pub fn line_references(&self) -> LineReferences {
        // Index 0 is padding so that rendered line N lives at index N.
        let mut refs = vec![SourcePosition::none()];
        for element in &self.elements {
            for _ in 0..element.rendered_line_count() {
                refs.push(element.source_position());
            }
        }
        LineReferences { refs }
    }
}

/// Mapping from every line number of a rendered bundle to the original
/// `(line, file)` the line came from.
#[derive(Debug, Clone)]
pub struct LineReferences {
    refs: Vec<SourcePosition>,
}

impl LineReferences {
    /// Original position of rendered line `line` (1-based). Line 0 and lines
    /// past the end of the rendered text have no position.
    pub fn lookup(&self, line: usize) -> Option<&SourcePosition> {
        if line == 0 {
            return None;
        }
        self.refs.get(line)
    }

    /// All positions, padding sentinel first.
    pub fn positions(&self) -> &[SourcePosition] {
        &self.refs
    }
}
