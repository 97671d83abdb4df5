
//! Standard EBML elements common to all documents.

use crate::cardinality;
use crate::value::{BinaryValue, StringValue, UintValue};

ebml_element! {
    /// A member of the header; the EBML version the document conforms to.
    pub enum EbmlVersion {
        id: 0x4286,
        name: "EBMLVersion",
        value: UintValue,
        cardinality: cardinality::ExactlyOne,
        default: UintValue::Uint1(1),
    }
}

ebml_element! {
    /// A member of the header; the minimum EBML version a parser must be aware of to read the
    /// document.
    pub enum EbmlReadVersion {
        id: 0x42F7,
        name: "EBMLReadVersion",
        value: UintValue,
        cardinality: cardinality::ExactlyOne,
        default: UintValue::Uint1(1),
    }
}

ebml_element! {
    /// A member of the header; an upper bound on the width of IDs used in the document.
    pub enum EbmlMaxIdWidth {
        id: 0x42F2,
        name: "EBMLMaxIDLength",
        value: UintValue,
        cardinality: cardinality::ExactlyOne,
        default: UintValue::Uint1(4),
    }
}

ebml_element! {
    /// A member of the header; an upper bound on the width of sizes used in the document.
    pub enum EbmlMaxSizeWidth {
        id: 0x42F3,
        name: "EBMLMaxSizeLength",
        value: UintValue,
        cardinality: cardinality::ExactlyOne,
        default: UintValue::Uint1(8),
    }
}

ebml_element! {
    /// A member of the header; the type of the document, such as "matroska" or "webm".
    pub enum DocType {
        id: 0x4282,
        name: "DocType",
        value: StringValue,
        cardinality: cardinality::ExactlyOne,
    }
}

ebml_element! {
    /// A member of the header; the version of the document type.
    pub enum DocTypeVersion {
        id: 0x4287,
        name: "DocTypeVersion",
        value: UintValue,
        cardinality: cardinality::ExactlyOne,
        default: UintValue::Uint1(1),
    }
}

ebml_element! {
    /// A member of the header; the minimum version of the document type a parser must support
    /// to read the document.
    pub enum DocTypeReadVersion {
        id: 0x4285,
        name: "DocTypeReadVersion",
        value: UintValue,
        cardinality: cardinality::ExactlyOne,
        default: UintValue::Uint1(1),
    }
}

ebml_element! {
    /// Padding. Legal in every container; its content is ignored.
    pub enum Void {
        id: 0xEC,
        name: "Void",
        value: BinaryValue,
        cardinality: cardinality::ZeroOrMany,
        default: BinaryValue::default(),
    }
}

ebml_element! {
    /// The CRC-32 of the other children of the container holding it, stored little-endian. Legal
    /// in every container; while reading it becomes the container's checksum rather than a child.
    pub enum Crc32Element {
        id: 0xBF,
        name: "CRC-32",
        value: BinaryValue,
        cardinality: cardinality::ZeroOrOne,
    }
}
