//! Kickstart document model and splitting parser.
//!
//! A kickstart document is an ordered mix of single-line commands and
//! `%section ... %end` blocks, possibly spanning several files through
//! `%include`. This module turns such a document into a flat, ordered list
//! of provenance-tagged elements and partitions that list into per-module
//! bundles:
//!
//! ```text
//! ks.cfg ──> SplitKickstartParser ──> KickstartElements
//!                                         │ claim(filter)     per module
//!                                         ├──> ElementBundle ──> render()
//!                                         │                 └──> LineReferences
//!                                         └──> unprocessed() ──> leftover text
//! ```
//!
//! Rendering a bundle concatenates element contents in original document
//! order; [`LineReferences`] maps every line of the rendered text back to
//! the `(line, file)` it came from, which is how module-reported error
//! lines are translated back into original-document coordinates.
//!
//! # Example
//!
//! ```rust
//! use installer_boss::kickstart::{commands, SplitKickstartParser};
//!
//! let ks = "network --device=ens3\ntimezone UTC\n";
//! let parser = SplitKickstartParser::default();
//! let mut elements = parser.split_from_string(ks, None).unwrap();
//!
//! let bundle = elements.claim(&commands(["network"]));
//! assert_eq!(bundle.render(), "network --device=ens3\n");
//! assert_eq!(elements.unprocessed().render(), "timezone UTC\n");
//! ```

pub mod element;
pub mod parser;

pub use element::{
    commands, ElementBundle, ElementFilter, ElementKind, KickstartElement, KickstartElements,
    LineReferences, SourcePosition, UNKNOWN_PROVENANCE,
};
pub use parser::{
    SplitKickstartError, SplitKickstartParser, SplitOptions, DEFAULT_VALID_SECTIONS,
    UNKNOWN_FILENAME,
};
