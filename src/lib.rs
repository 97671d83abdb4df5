
#![deny(missing_docs, missing_debug_implementations, unsafe_code)]
#![warn(dead_code, trivial_casts, trivial_numeric_casts)]

//! Reading, editing and writing trees of EBML (Extensible Binary Markup Language) elements.
//!
//! EBML is a binary cousin of XML: a document is a tree of elements, each an ID, a coded size and
//! a payload. A document type (Matroska and WebM being the best known) decides which element IDs
//! exist, what they hold and where they may appear. Here that schema is written in Rust: every
//! element type is an empty enum declared with `ebml_element!` or `ebml_container!`.
//!
//! Documents are read into a tree: leaves are `ElementImpl<E>` values, containers ("master"
//! elements) are `Master` nodes owning their children. The tree can be changed freely and
//! rendered back; sizes are resolved bottom-up with `update_size` before rendering. Containers
//! whose size is only known after their content has been produced can be streamed with
//! `Master::write_head` and patched with `Master::overwrite_head`.
//!
//! ## Features
//!
//! `chrono`: conversions between `DateValue` and `chrono::DateTime`.
//!
//! ## Limitations
//!
//! * 10 byte floats are kept as their raw bytes (`FloatValueRepr::F80`).
//! * Nesting levels are type-level integers, so a level range can not be open-ended. Use a large
//!   maximum such as `typenum::P8192` instead.
//! * Mandatory children are checked on request (`Master::check_mandatory`,
//!   `Master::find_all_missing_elements`), never while building or parsing a tree.
//! * A CRC-32 element is always written as the first child of its container.

#[macro_use]
mod macros;

pub mod checksum;
pub mod read;
pub mod semantic;
pub mod std_containers;
pub mod std_elems;
pub mod value;
pub mod write;

mod container;
mod element;
mod error;
mod id;
mod peek;
mod size;

pub use crate::checksum::{Checksum, Crc32};
pub use crate::container::{Container, Master, MissingElement};
pub use crate::element::{Dummy, EbmlElement, Element, ElementImpl, ElementState, ElementType};
pub use crate::error::{EbmlError, EbmlResult};
pub use crate::id::Id;
pub use crate::peek::PeekableReader;
pub use crate::read::{
    read_document, EbmlReader, ElementHeader, ReadOptions, ReadOutcome, Scope, UpperElement,
    DEFAULT_MAX_DEPTH,
};
pub use crate::semantic::{ChildDescriptor, ElementCallbacks, SemanticContext, GLOBAL_ELEMENTS};
pub use crate::size::{Size, MAX_VALUE, UNKNOWN_SIZE};
pub use crate::value::*;

/// The nesting level meaning "anywhere". The default for both level bounds of an element type.
pub type AnyLevel = typenum::N1;

/// How many elements of one type a container may hold.
pub mod cardinality {
    /// Implemented by the four cardinalities below only.
    pub trait Cardinality {
        /// At least one element is required.
        const MANDATORY: bool;
        /// At most one element is allowed.
        const UNIQUE: bool;
    }

    /// Optional, repeatable.
    #[derive(Debug)]
    pub enum ZeroOrMany {}
    impl Cardinality for ZeroOrMany {
        const MANDATORY: bool = false;
        const UNIQUE: bool = false;
    }

    /// Optional, at most once.
    #[derive(Debug)]
    pub enum ZeroOrOne {}
    impl Cardinality for ZeroOrOne {
        const MANDATORY: bool = false;
        const UNIQUE: bool = true;
    }

    /// Required, exactly once.
    #[derive(Debug)]
    pub enum ExactlyOne {}
    impl Cardinality for ExactlyOne {
        const MANDATORY: bool = true;
        const UNIQUE: bool = true;
    }

    /// Required, repeatable.
    #[derive(Debug)]
    pub enum OneOrMany {}
    impl Cardinality for OneOrMany {
        const MANDATORY: bool = true;
        const UNIQUE: bool = false;
    }
}

/// Whether a container's children have a canonical order.
pub mod child_order {
    /// Implemented by `Significant` and `Insignificant`.
    pub trait ChildOrder {
        /// Children have a canonical order.
        const SIGNIFICANT: bool;
    }

    /// `Master::sort` restores the order in which the children were declared.
    #[derive(Debug)]
    pub enum Significant {}
    impl ChildOrder for Significant {
        const SIGNIFICANT: bool = true;
    }

    /// Any order is as good as another; `Master::sort` leaves the children alone.
    #[derive(Debug)]
    pub enum Insignificant {}
    impl ChildOrder for Insignificant {
        const SIGNIFICANT: bool = false;
    }
}
