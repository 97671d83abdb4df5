
//! Schema tables describing which element types may appear inside which containers.
//!
//! Every container type owns one static `SemanticContext`. Reading walks these tables to decide
//! whether an id belongs to the current container, to one of its open ancestors, or to nobody.

use crate::cardinality::Cardinality;
use crate::element::{create_boxed, EbmlElement, ElementType};
use crate::id::Id;
use crate::std_elems::{Crc32Element, Void};

/// How to recognize and construct one element type.
#[derive(Debug, Clone, Copy)]
pub struct ElementCallbacks {
    /// The element's id.
    pub id: Id,
    /// The element's name.
    pub name: &'static str,
    /// Constructs a default instance.
    pub create: fn() -> Box<dyn EbmlElement>,
    /// Lowest nesting level the element may occur at, or -1 for any.
    pub min_level: i64,
    /// Highest nesting level the element may occur at, or -1 for any.
    pub max_level: i64,
}
impl ElementCallbacks {
    /// The callbacks of element type `T`.
    pub const fn of<T: ElementType>() -> Self {
        ElementCallbacks {
            id: T::ID,
            name: T::NAME,
            create: create_boxed::<T>,
            min_level: <T::MinAllowedLevel as typenum::Integer>::I64,
            max_level: <T::MaxAllowedLevel as typenum::Integer>::I64,
        }
    }

    /// Returns true if the element may occur at nesting `level` (top-level elements are at 0).
    pub fn allows_level(&self, level: i64) -> bool {
        (self.min_level < 0 || level >= self.min_level)
            && (self.max_level < 0 || level <= self.max_level)
    }
}

/// One legal child type of a container.
#[derive(Debug, Clone, Copy)]
pub struct ChildDescriptor {
    /// How to recognize and construct the child.
    pub callbacks: ElementCallbacks,
    /// At least one child of this type is required.
    pub mandatory: bool,
    /// At most one child of this type is allowed.
    pub unique: bool,
}
impl ChildDescriptor {
    /// Describes element type `T` as a child, taking mandatory/unique from its cardinality.
    pub const fn of<T: ElementType>() -> Self {
        ChildDescriptor {
            callbacks: ElementCallbacks::of::<T>(),
            mandatory: <T::Cardinality as Cardinality>::MANDATORY,
            unique: <T::Cardinality as Cardinality>::UNIQUE,
        }
    }
}

/// The schema of one container type. When the child order is significant, the order of
/// `children` is the canonical order used by `Master::sort`.
#[derive(Debug)]
pub struct SemanticContext {
    /// The container's id.
    pub id: Id,
    /// The container's name.
    pub name: &'static str,
    /// The order of children is significant.
    pub ordered: bool,
    /// Legal child types, not counting the global elements.
    pub children: &'static [ChildDescriptor],
}
impl SemanticContext {
    /// Looks up a child type legal in this container, global elements included.
    pub fn find(&self, id: Id) -> Option<&'static ChildDescriptor> {
        find_in(self.children, id)
    }

    /// The index of `id` in the canonical child order.
    pub fn canonical_index(&self, id: Id) -> Option<usize> {
        self.children.iter().position(|d| d.callbacks.id == id)
    }

    /// The mandatory child types.
    pub fn mandatory(&self) -> impl Iterator<Item = &'static ChildDescriptor> {
        self.children.iter().filter(|d| d.mandatory)
    }
}

/// Elements legal inside every container.
pub static GLOBAL_ELEMENTS: [ChildDescriptor; 2] =
    [ChildDescriptor::of::<Void>(), ChildDescriptor::of::<Crc32Element>()];

/// Finds `id` in `legal` or among the global elements.
pub fn find_in(legal: &'static [ChildDescriptor], id: Id) -> Option<&'static ChildDescriptor> {
    legal
        .iter()
        .chain(GLOBAL_ELEMENTS.iter())
        .find(|d| d.callbacks.id == id)
}

/// The chain of levels still open while reading, innermost first. Each level lists the child
/// types legal there; the chain lives on the stack of the recursive read.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OpenLevels<'a> {
    pub(crate) legal: &'static [ChildDescriptor],
    pub(crate) level: i64,
    pub(crate) parent: Option<&'a OpenLevels<'a>>,
}
impl<'a> OpenLevels<'a> {
    pub(crate) fn top(legal: &'static [ChildDescriptor]) -> Self {
        Self::at(legal, 0)
    }

    /// An outermost level that sits `level` deep in the document.
    pub(crate) fn at(legal: &'static [ChildDescriptor], level: i64) -> Self {
        OpenLevels {
            legal,
            level,
            parent: None,
        }
    }

    pub(crate) fn nested(&'a self, legal: &'static [ChildDescriptor]) -> OpenLevels<'a> {
        OpenLevels {
            legal,
            level: self.level + 1,
            parent: Some(self),
        }
    }

    /// Finds the innermost level where `id` is legal, returning how many levels up it is (0 for
    /// this level) and its descriptor.
    pub(crate) fn locate(&self, id: Id) -> Option<(usize, &'static ChildDescriptor)> {
        let mut current = Some(self);
        let mut up = 0;
        while let Some(levels) = current {
            if let Some(descriptor) =
                find_in(levels.legal, id).filter(|d| d.callbacks.allows_level(levels.level))
            {
                return Some((up, descriptor));
            }
            up += 1;
            current = levels.parent;
        }
        None
    }
}
