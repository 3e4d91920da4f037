//! Streaming kickstart parser that splits a document into elements.
//!
//! [`SplitKickstartParser`] walks a kickstart document line by line, follows
//! `%include` directives into other files, and records every command and
//! section it sees as a [`KickstartElement`] tagged with its true originating
//! file and line number. Commands are *not* grammar-checked here: an invalid
//! option or a conflicting command passes through untouched, because command
//! parsing is the job of the service module that owns the command. Only the
//! document structure itself can fail the split: an unknown section name, a
//! section missing its `%end`, or (optionally) a missing include file.
//!
//! The parse is a pure function of the input text and the parser options;
//! the only I/O is reading the kickstart file(s) themselves.

use std::fs;
use std::io;
use std::path::Path;

use thiserror::Error;
use tracing::{debug, warn};

use crate::kickstart::element::{KickstartElement, KickstartElements};

/// Filename attributed to elements parsed from an in-memory string when no
/// explicit filename is supplied.
pub const UNKNOWN_FILENAME: &str = "<MAIN>";

/// Section names recognized by default, including the leading `%`.
pub const DEFAULT_VALID_SECTIONS: &[&str] = &[
    "%pre",
    "%pre-install",
    "%post",
    "%onerror",
    "%traceback",
    "%packages",
    "%addon",
    "%anaconda",
];

/// Options threaded into the parser (and through it into the coordinator)
/// for the duration of one installation run.
#[derive(Debug, Clone)]
pub struct SplitOptions {
    /// Recognized section names, each including the leading `%`. A section
    /// header outside this vocabulary is a fatal parse error.
    pub valid_sections: Vec<String>,
    /// Whether a missing `%include` target aborts the parse. When false the
    /// directive is logged and skipped.
    pub missing_include_is_fatal: bool,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            valid_sections: DEFAULT_VALID_SECTIONS.iter().map(|s| s.to_string()).collect(),
            missing_include_is_fatal: true,
        }
    }
}

/// Fatal document-level errors raised while splitting a kickstart.
///
/// These abort the whole operation before any module is contacted, unlike
/// module-local semantic errors which are collected during distribution.
#[derive(Debug, Error)]
pub enum SplitKickstartError {
    #[error("unknown kickstart section '{name}' at {file}:{line}")]
    UnknownSection {
        name: String,
        line: usize,
        file: String,
    },

    #[error("section '{name}' opened at {file}:{line} does not end with %end")]
    UnclosedSection {
        name: String,
        line: usize,
        file: String,
    },

    #[error("cannot read file '{path}' included at {file}:{line}")]
    MissingInclude {
        path: String,
        line: usize,
        file: String,
        #[source]
        source: io::Error,
    },

    #[error("cannot read kickstart file '{path}'")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Parser that splits kickstart documents into ordered, provenance-tagged
/// elements.
///
/// The parser itself is stateless between calls; each `split*` call returns
/// a fresh [`KickstartElements`] store.
#[derive(Debug, Clone, Default)]
pub struct SplitKickstartParser {
    options: SplitOptions,
}

impl SplitKickstartParser {
    pub fn new(options: SplitOptions) -> Self {
        Self { options }
    }

    pub fn valid_sections(&self) -> &[String] {
        &self.options.valid_sections
    }

    pub fn set_valid_sections(&mut self, sections: Vec<String>) {
        self.options.valid_sections = sections;
    }

    /// Split the kickstart file at `path` into elements.
    pub fn split(&self, path: impl AsRef<Path>) -> Result<KickstartElements, SplitKickstartError> {
        let path = path.as_ref();
        let filename = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| SplitKickstartError::Io {
            path: filename.clone(),
            source,
        })?;
        let mut elements = KickstartElements::new();
        self.parse_document(&text, &filename, &mut elements)?;
        debug!(file = %filename, count = elements.len(), "split kickstart");
        Ok(elements)
    }

    /// Split an in-memory kickstart string. Elements are attributed to
    /// `filename`, or to [`UNKNOWN_FILENAME`] when none is given.
    pub fn split_from_string(
        &self,
        kickstart: &str,
        filename: Option<&str>,
    ) -> Result<KickstartElements, SplitKickstartError> {
        let filename = filename.unwrap_or(UNKNOWN_FILENAME);
        let mut elements = KickstartElements::new();
        self.parse_document(kickstart, filename, &mut elements)?;
        debug!(file = %filename, count = elements.len(), "split kickstart string");
        Ok(elements)
    }

    fn parse_document(
        &self,
        text: &str,
        filename: &str,
        out: &mut KickstartElements,
    ) -> Result<(), SplitKickstartError> {
        let mut lines: Vec<String> = text.split_inclusive('\n').map(str::to_string).collect();
        if let Some(last) = lines.last_mut() {
            if !last.ends_with('\n') {
                last.push('\n');
            }
        }

        let mut i = 0;
        while i < lines.len() {
            let lineno = i + 1;
            let stripped = lines[i].trim();

            if stripped.is_empty() || stripped.starts_with('#') {
                i += 1;
                continue;
            }

            if stripped.starts_with('%') {
                let header_args = split_args(stripped);
                let first = header_args.first().cloned().unwrap_or_else(|| "%".to_string());
                match first.as_str() {
                    "%include" => {
                        self.handle_include(header_args.get(1), lineno, filename, out)?;
                        i += 1;
                    }
                    // %ksappend lines are resolved by an earlier flattening
                    // step; at this stage there is nothing left to do.
                    "%ksappend" => {
                        debug!(file = %filename, line = lineno, "skipping %ksappend");
                        i += 1;
                    }
                    name if self.is_valid_section(name) => {
                        let consumed =
                            read_section(header_args, &lines[i + 1..], lineno, filename, out)?;
                        i += 1 + consumed;
                    }
                    name => {
                        return Err(SplitKickstartError::UnknownSection {
                            name: name.to_string(),
                            line: lineno,
                            file: filename.to_string(),
                        });
                    }
                }
                continue;
            }

            // Command line, possibly continued over trailing backslashes.
            let mut raw_lines = vec![lines[i].clone()];
            while raw_lines.last().is_some_and(|l| continues(l))
                && i + raw_lines.len() < lines.len()
            {
                let next = lines[i + raw_lines.len()].clone();
                raw_lines.push(next);
            }
            let logical: String = raw_lines
                .iter()
                .map(|l| l.trim_end().trim_end_matches('\\').trim())
                .collect::<Vec<_>>()
                .join(" ");
            let args = split_args(&logical);
            let count = raw_lines.len();
            if !args.is_empty() {
                out.push(KickstartElement::new(args, raw_lines, lineno, filename));
            }
            i += count;
        }

        Ok(())
    }

    fn is_valid_section(&self, name: &str) -> bool {
        self.options.valid_sections.iter().any(|s| s == name)
    }

    fn handle_include(
        &self,
        target: Option<&String>,
        lineno: usize,
        filename: &str,
        out: &mut KickstartElements,
    ) -> Result<(), SplitKickstartError> {
        let missing = |path: &str, source: io::Error| SplitKickstartError::MissingInclude {
            path: path.to_string(),
            line: lineno,
            file: filename.to_string(),
            source,
        };

        let Some(target) = target else {
            if self.options.missing_include_is_fatal {
                let err = io::Error::new(io::ErrorKind::InvalidInput, "missing include path");
                return Err(missing("", err));
            }
            warn!(file = %filename, line = lineno, "%include without a path, skipping");
            return Ok(());
        };

        match fs::read_to_string(target) {
            Ok(included) => self.parse_document(&included, target, out),
            Err(err) if !self.options.missing_include_is_fatal => {
                warn!(
                    file = %filename,
                    line = lineno,
                    include = %target,
                    error = %err,
                    "skipping missing include"
                );
                Ok(())
            }
            Err(err) => Err(missing(target, err)),
        }
    }
}

/// Whether a physical command line continues onto the next one.
fn continues(line: &str) -> bool {
    line.trim_end().ends_with('\\')
}

/// Consume a section body up to its `%end` terminator and store the element.
///
/// Returns the number of lines consumed after the header. Body lines are
/// kept raw: blanks, comments and even `%include` text stay untouched.
fn read_section(
    header_args: Vec<String>,
    rest: &[String],
    header_lineno: usize,
    filename: &str,
    out: &mut KickstartElements,
) -> Result<usize, SplitKickstartError> {
    let mut body = Vec::new();
    for (offset, line) in rest.iter().enumerate() {
        if line.split_whitespace().next() == Some("%end") {
            out.push(KickstartElement::new(
                header_args,
                body,
                header_lineno,
                filename,
            ));
            return Ok(offset + 1);
        }
        body.push(line.clone());
    }
    Err(SplitKickstartError::UnclosedSection {
        name: header_args[0].clone(),
        line: header_lineno,
        file: filename.to_string(),
    })
}

/// Split a header or command line into words, honoring single and double
/// quotes and backslash escapes. An unquoted `#` starts a trailing comment.
///
/// Unterminated quotes are tolerated: the rest of the line becomes part of
/// the current word.
fn split_args(line: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut has_token = false;
    let mut in_single = false;
    let mut in_double = false;

    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '\'' if !in_double => {
                in_single = !in_single;
                has_token = true;
            }
            '"' if !in_single => {
                in_double = !in_double;
                has_token = true;
            }
            '\\' if !in_single => {
                if let Some(&next) = chars.peek() {
                    current.push(next);
                    chars.next();
                    has_token = true;
                }
            }
            '#' if !in_single && !in_double => break,
            c if c.is_whitespace() && !in_single && !in_double => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }
    if has_token {
        args.push(current);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SIMPLE_KICKSTART: &str = "\
%pre
echo PRE
%end
network --device=ens3 --activate
network --device=ens4 --activate
%addon pony --fly=True
%end
firewall --enabled
%addon scorched --planet=Earth
nuke
%end
%post --nochroot --interpreter /usr/bin/bash
echo POST1
%end
";

    fn parser() -> SplitKickstartParser {
        SplitKickstartParser::default()
    }

    #[test]
    fn test_split_args() {
        assert_eq!(
            split_args("network --device=ens3 --activate"),
            vec!["network", "--device=ens3", "--activate"]
        );
        assert_eq!(
            split_args("keyboard --vckeymap=us --xlayouts='us'"),
            vec!["keyboard", "--vckeymap=us", "--xlayouts=us"]
        );
        assert_eq!(
            split_args(r#"%post --interpreter "/usr/bin/env bash""#),
            vec!["%post", "--interpreter", "/usr/bin/env bash"]
        );
        // unquoted # starts a comment
        assert_eq!(split_args("timezone UTC # the default"), vec!["timezone", "UTC"]);
        assert_eq!(split_args("rootpw '#secret#'"), vec!["rootpw", "#secret#"]);
        // backslash escapes
        assert_eq!(split_args(r"echo a\ b"), vec!["echo", "a b"]);
        assert_eq!(split_args(""), Vec::<String>::new());
        assert_eq!(split_args("   # only a comment"), Vec::<String>::new());
    }

    #[test]
    fn test_simple_split() {
        let expected = [
            ("pre", "%pre\necho PRE\n%end\n", 1),
            ("network", "network --device=ens3 --activate\n", 4),
            ("network", "network --device=ens4 --activate\n", 5),
            ("pony", "%addon pony --fly=True\n%end\n", 6),
            ("firewall", "firewall --enabled\n", 8),
            ("scorched", "%addon scorched --planet=Earth\nnuke\n%end\n", 9),
            (
                "post",
                "%post --nochroot --interpreter /usr/bin/bash\necho POST1\n%end\n",
                12,
            ),
        ];

        let result = parser().split_from_string(SIMPLE_KICKSTART, None).unwrap();
        assert_eq!(result.len(), expected.len());
        for (element, (name, content, lineno)) in result.all().iter().zip(expected.iter()) {
            assert_eq!(element.name(), *name);
            assert_eq!(element.content(), *content);
            assert_eq!(element.lineno(), *lineno);
            assert_eq!(element.filename(), UNKNOWN_FILENAME);
        }

        // the rendered document reproduces the input
        assert_eq!(result.full_bundle().render(), SIMPLE_KICKSTART);
    }

    #[test]
    fn test_split_from_string_filename() {
        let result = parser().split_from_string(SIMPLE_KICKSTART, None).unwrap();
        for element in result.all() {
            assert_eq!(element.filename(), UNKNOWN_FILENAME);
        }

        let result = parser()
            .split_from_string(SIMPLE_KICKSTART, Some("MY_FILENAME"))
            .unwrap();
        for element in result.all() {
            assert_eq!(element.filename(), "MY_FILENAME");
        }
    }

    #[test]
    fn test_split_file() {
        // reading from a file attributes elements to its path
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ks.cfg");
        fs::write(&path, SIMPLE_KICKSTART).unwrap();

        let result = parser().split(&path).unwrap();
        assert_eq!(result.len(), 7);
        for element in result.all() {
            assert_eq!(element.filename(), path.display().to_string());
        }
    }

    #[test]
    fn test_split_missing_file() {
        let err = parser().split("definitely/not/there.cfg").unwrap_err();
        assert!(matches!(err, SplitKickstartError::Io { .. }));
    }

    #[test]
    fn test_split_with_includes() {
        let dir = TempDir::new().unwrap();
        let include2 = dir.path().join("ks.include2.cfg");
        let include1 = dir.path().join("ks.include1.cfg");
        let main = dir.path().join("ks.cfg");

        fs::write(
            &include2,
            "repo --name=repo1 --baseurl=http://mirror/repo1\n\
             network --device=ens541 --activate\n\
             %post\n\
             echo POST_include2\n\
             %end\n",
        )
        .unwrap();
        fs::write(
            &include1,
            format!(
                "network --device=ens51 --activate\n\
                 %include {}\n\
                 network --device=ens55 --activate\n\
                 %packages\n\
                 @include1\n\
                 %end\n",
                include2.display()
            ),
        )
        .unwrap();
        fs::write(
            &main,
            format!(
                "timezone --utc Asia/Tokyo\n\
                 %include {}\n\
                 firewall --enabled\n",
                include1.display()
            ),
        )
        .unwrap();

        let result = parser().split(&main).unwrap();
        let expected = [
            ("timezone", 1, main.display().to_string()),
            ("network", 1, include1.display().to_string()),
            ("repo", 1, include2.display().to_string()),
            ("network", 2, include2.display().to_string()),
            ("post", 3, include2.display().to_string()),
            ("network", 3, include1.display().to_string()),
            ("packages", 4, include1.display().to_string()),
            ("firewall", 3, main.display().to_string()),
        ];
        assert_eq!(result.len(), expected.len());
        for (element, (name, lineno, filename)) in result.all().iter().zip(expected.iter()) {
            assert_eq!(element.name(), *name);
            assert_eq!(element.lineno(), *lineno);
            assert_eq!(element.filename(), filename);
        }

        // re-splitting the flattened render is a fixed point
        let flat = result.full_bundle().render();
        let again = parser().split_from_string(&flat, None).unwrap();
        assert_eq!(again.full_bundle().render(), flat);
    }

    #[test]
    fn test_missing_include() {
        let ks = "network --device=ens3\n%include missing_include.cfg\ntimezone UTC\n";

        // fatal by default
        let err = parser().split_from_string(ks, None).unwrap_err();
        match err {
            SplitKickstartError::MissingInclude { path, line, file, .. } => {
                assert_eq!(path, "missing_include.cfg");
                assert_eq!(line, 2);
                assert_eq!(file, UNKNOWN_FILENAME);
            }
            other => panic!("unexpected error: {other}"),
        }

        // tolerated when configured so; the rest of the document still parses
        let lenient = SplitKickstartParser::new(SplitOptions {
            missing_include_is_fatal: false,
            ..SplitOptions::default()
        });
        let result = lenient.split_from_string(ks, None).unwrap();
        let names: Vec<&str> = result.all().iter().map(|e| e.name()).collect();
        assert_eq!(names, vec!["network", "timezone"]);
    }

    #[test]
    fn test_unknown_section() {
        let ks = "network --device=ens3\n%bogus\nstuff\n%end\n";
        let err = parser().split_from_string(ks, Some("ks.cfg")).unwrap_err();
        match err {
            SplitKickstartError::UnknownSection { name, line, file } => {
                assert_eq!(name, "%bogus");
                assert_eq!(line, 2);
                assert_eq!(file, "ks.cfg");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_section_without_end() {
        let ks = "text\n%packages\nanaconda\n";
        let err = parser().split_from_string(ks, None).unwrap_err();
        match err {
            SplitKickstartError::UnclosedSection { name, line, .. } => {
                assert_eq!(name, "%packages");
                assert_eq!(line, 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_valid_sections_override() {
        let ks = "%pre\necho PRE\n%end\n";

        let mut restricted = SplitKickstartParser::new(SplitOptions {
            valid_sections: vec!["%packages".to_string()],
            missing_include_is_fatal: true,
        });
        assert!(restricted.split_from_string(ks, None).is_err());

        restricted.set_valid_sections(
            DEFAULT_VALID_SECTIONS.iter().map(|s| s.to_string()).collect(),
        );
        assert!(restricted.split_from_string(ks, None).is_ok());
    }

    #[test]
    fn test_invalid_commands_pass_split() {
        // misspelled commands and options are not our problem at split time
        let ks = "\
network --device=ens3 --activate
netork --device=ens5 --activate
network --device=ens7 --activate
network --devce=ens9 --activate
";
        let result = parser().split_from_string(ks, None).unwrap();
        assert_eq!(result.len(), 4);
    }

    #[test]
    fn test_comments_and_blank_lines() {
        let ks = "\
# kickstart for the lab machines

network --device=ens3  # uplink

%post
# this comment stays
echo done

%end
";
        let result = parser().split_from_string(ks, None).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result.all()[0].name(), "network");
        // the command line is kept verbatim, comment included
        assert_eq!(result.all()[0].content(), "network --device=ens3  # uplink\n");
        // section bodies are raw: comments and blanks survive
        assert_eq!(
            result.all()[1].content(),
            "%post\n# this comment stays\necho done\n\n%end\n"
        );
    }

    #[test]
    fn test_command_line_continuation() {
        let ks = "network --device=ens3 \\\n    --activate\ntimezone UTC\n";
        let result = parser().split_from_string(ks, None).unwrap();
        assert_eq!(result.len(), 2);

        let element = &result.all()[0];
        assert_eq!(element.name(), "network");
        assert_eq!(element.lineno(), 1);
        assert_eq!(
            element.args(),
            &["network".to_string(), "--device=ens3".to_string(), "--activate".to_string()]
        );
        // content keeps the physical lines verbatim
        assert_eq!(element.content(), "network --device=ens3 \\\n    --activate\n");
        assert_eq!(result.all()[1].lineno(), 3);
    }

    #[test]
    fn test_empty_documents() {
        assert!(parser().split_from_string("", None).unwrap().is_empty());
        assert!(parser()
            .split_from_string("#version=DEVEL\n", None)
            .unwrap()
            .is_empty());
    }
}
