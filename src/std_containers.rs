
//! Standard EBML containers common to all documents.

use crate::semantic::ChildDescriptor;
use crate::std_elems::*;
use crate::{cardinality, child_order};

ebml_container! {
    /// The EBML header which all documents must begin with.
    pub enum EbmlHeader {
        id: 0x1A45DFA3,
        name: "EBML",
        cardinality: cardinality::OneOrMany,
        order: child_order::Significant,
        levels: typenum::Z0 => typenum::P8192,
        children: [
            EbmlVersion,
            EbmlReadVersion,
            EbmlMaxIdWidth,
            EbmlMaxSizeWidth,
            DocType,
            DocTypeVersion,
            DocTypeReadVersion,
        ],
    }
}

/// The top level of a bare EBML stream: only headers. Document types extend this with their own
/// root elements.
pub static EBML_TOP_LEVEL: [ChildDescriptor; 1] = [ChildDescriptor::of::<EbmlHeader>()];
