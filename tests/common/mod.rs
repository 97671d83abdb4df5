#![allow(dead_code)]

//! A small document type shared by the integration tests.
//!
//! ```text
//! Root (0x18538067, significant order)
//!   Alpha (0x81, uint, exactly one, default 1)
//!   Beta  (0x82, string, any number)
//!   Gamma (0x83, binary, at most one)
//!   Group (0xA0, insignificant order, any number)
//!     Item  (0xA1, uint, one or more, no default)
//!     Stamp (0xA2, int, at most one)
//!     Mark  (0xA3, binary, only legal at level 2)
//!   Deep  (0x84, binary, only legal at level 5)
//! ```

use ebml_tree::std_containers::EbmlHeader;
use ebml_tree::{
    cardinality, child_order, ebml_container, ebml_element, BinaryValue, ChildDescriptor,
    IntValue, StringValue, UintValue,
};

ebml_element! {
    pub enum Alpha {
        id: 0x81,
        name: "Alpha",
        value: UintValue,
        cardinality: cardinality::ExactlyOne,
        default: UintValue::Uint1(1),
    }
}

ebml_element! {
    pub enum Beta {
        id: 0x82,
        name: "Beta",
        value: StringValue,
        cardinality: cardinality::ZeroOrMany,
    }
}

ebml_element! {
    pub enum Gamma {
        id: 0x83,
        name: "Gamma",
        value: BinaryValue,
        cardinality: cardinality::ZeroOrOne,
    }
}

ebml_element! {
    pub enum Deep {
        id: 0x84,
        name: "Deep",
        value: BinaryValue,
        cardinality: cardinality::ZeroOrOne,
        levels: typenum::P5 => typenum::P5,
    }
}

ebml_element! {
    pub enum Item {
        id: 0xA1,
        name: "Item",
        value: UintValue,
        cardinality: cardinality::OneOrMany,
    }
}

ebml_element! {
    pub enum Stamp {
        id: 0xA2,
        name: "Stamp",
        value: IntValue,
        cardinality: cardinality::ZeroOrOne,
    }
}

ebml_element! {
    pub enum Mark {
        id: 0xA3,
        name: "Mark",
        value: BinaryValue,
        cardinality: cardinality::ZeroOrOne,
        levels: typenum::P2 => typenum::P2,
    }
}

ebml_container! {
    pub enum Group {
        id: 0xA0,
        name: "Group",
        cardinality: cardinality::ZeroOrMany,
        order: child_order::Insignificant,
        children: [Item, Stamp, Mark],
    }
}

ebml_container! {
    pub enum Root {
        id: 0x18538067,
        name: "Root",
        cardinality: cardinality::OneOrMany,
        order: child_order::Significant,
        levels: typenum::Z0 => typenum::Z0,
        children: [Alpha, Beta, Gamma, Group, Deep],
    }
}

pub static TOP_LEVEL: [ChildDescriptor; 2] = [
    ChildDescriptor::of::<EbmlHeader>(),
    ChildDescriptor::of::<Root>(),
];

/// A finite-size `Root` holding every kind of child, including an element (0xC0) the schema
/// does not know.
pub const DOC: [u8; 29] = [
    0x18, 0x53, 0x80, 0x67, 0x98, // Root, 24 bytes
    0x81, 0x81, 0x01, // Alpha 1
    0x82, 0x82, b'a', b'b', // Beta "ab"
    0x82, 0x81, b'c', // Beta "c"
    0xA0, 0x87, // Group, 7 bytes
    0xA1, 0x81, 0x05, // Item 5
    0xC0, 0x82, 0xAA, 0xBB, // unknown
    0x83, 0x83, 0x01, 0x02, 0x03, // Gamma
];

pub fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .with_test_writer()
        .try_init();
}
