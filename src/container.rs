
//! EBML containers, or master elements, which hold an ordered list of child elements.

use std::any::Any;
use std::fmt;
use std::io::Write;
use std::mem;
use std::ptr;

use tracing::{debug, trace};

use crate::checksum::{Checksum, Crc32};
use crate::child_order;
use crate::element::{EbmlElement, ElementState, ElementType};
use crate::error::{EbmlError, EbmlResult};
use crate::id::Id;
use crate::peek::PeekableReader;
use crate::read::ReadOptions;
use crate::semantic::{ElementCallbacks, SemanticContext};
use crate::size::Size;
use crate::std_elems::Crc32Element;

/// Implement this trait on an empty enum for each container type in your document.
pub trait Container: ElementType<Node = Master> {
    /// The importance of the order of elements in a container.
    type ChildOrder: child_order::ChildOrder;

    /// The schema shared by every container of this type.
    fn context() -> &'static SemanticContext;
}

/// The CRC-32 element is a one byte id, a one byte size and four bytes of checksum.
pub(crate) const CRC_ELEMENT_SIZE: u64 = 6;

/// A master element: a container owning an ordered list of children.
///
/// Sizes are cached. After changing the tree, call `update_size(true)` or render without
/// `keep_intact` before trusting `data_size`.
pub struct Master {
    context: &'static SemanticContext,
    pub(crate) state: ElementState,
    pub(crate) children: Vec<Box<dyn EbmlElement>>,
    pub(crate) checksum_enabled: bool,
    pub(crate) checksum: u32,
}

/// A problem reported by `Master::find_all_missing_elements`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MissingElement {
    /// A mandatory child type has no instance.
    Absent {
        /// Name of the missing element type.
        element: &'static str,
        /// Name of the container it is missing from.
        parent: &'static str,
    },
    /// A leaf exists but was never given a value and its type has no default.
    ValueNotSet {
        /// Name of the leaf.
        element: &'static str,
        /// Name of the container holding it.
        parent: &'static str,
    },
}
impl MissingElement {
    /// Name of the offending element type.
    pub fn element(&self) -> &'static str {
        match *self {
            MissingElement::Absent { element, .. } | MissingElement::ValueNotSet { element, .. } => {
                element
            }
        }
    }
}
impl fmt::Display for MissingElement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            MissingElement::Absent { element, parent } => {
                write!(f, "missing element \"{}\" in \"{}\"", element, parent)
            }
            MissingElement::ValueNotSet { element, parent } => {
                write!(f, "element \"{}\" in \"{}\" has no value", element, parent)
            }
        }
    }
}

impl Master {
    /// Creates a container for `context` and adds a default instance of every mandatory child
    /// type.
    pub fn new(context: &'static SemanticContext, size_is_finite: bool) -> Self {
        let mut master = Master {
            context,
            state: ElementState::new(size_is_finite),
            children: Vec::new(),
            checksum_enabled: false,
            checksum: 0,
        };
        master.process_mandatory();
        master
    }

    /// The schema of this container.
    pub fn context(&self) -> &'static SemanticContext {
        self.context
    }

    /// Switches between a finite and an unknown size.
    pub fn set_size_is_finite(&mut self, size_is_finite: bool) {
        self.state.size_is_finite = size_is_finite;
    }

    /// The number of children.
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Returns true if the container has no children.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// The children, in wire order.
    pub fn children(&self) -> &[Box<dyn EbmlElement>] {
        &self.children
    }

    /// The child at `index`.
    pub fn get(&self, index: usize) -> Option<&dyn EbmlElement> {
        self.children.get(index).map(|child| &**child)
    }

    /// The child at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut dyn EbmlElement> {
        match self.children.get_mut(index) {
            Some(child) => Some(&mut **child),
            None => None,
        }
    }

    /// Index of the first child with `id`.
    pub fn find_first_index(&self, id: Id) -> Option<usize> {
        self.children.iter().position(|child| child.id() == id)
    }

    /// Index of the next child with the same id as the child at `after`.
    pub fn find_next_index(&self, after: usize) -> Option<usize> {
        let id = self.children.get(after)?.id();
        self.children[after + 1..]
            .iter()
            .position(|child| child.id() == id)
            .map(|i| i + after + 1)
    }

    /// Index of the first child of the given type, appending a default instance if there is none.
    pub fn find_first_or_create(&mut self, callbacks: &ElementCallbacks) -> usize {
        match self.find_first_index(callbacks.id) {
            Some(index) => index,
            None => {
                self.children.push((callbacks.create)());
                self.children.len() - 1
            }
        }
    }

    /// Index of the next child with the same id as the child at `after`, appending a fresh
    /// instance of that type if there is none.
    pub fn find_next_or_create(&mut self, after: usize) -> EbmlResult<usize> {
        let len = self.children.len();
        let template = self
            .children
            .get(after)
            .ok_or(EbmlError::IndexOutOfRange { index: after, len })?;
        if let Some(index) = self.find_next_index(after) {
            return Ok(index);
        }
        let fresh = template.new_instance();
        self.children.push(fresh);
        Ok(len)
    }

    /// Index of `element` among the children, compared by identity.
    pub fn position_of(&self, element: &dyn EbmlElement) -> Option<usize> {
        let target = element as *const dyn EbmlElement as *const ();
        self.children
            .iter()
            .position(|child| ptr::eq(&**child as *const dyn EbmlElement as *const (), target))
    }

    /// The first child of type `T`.
    pub fn find_child<T: ElementType>(&self) -> Option<&T::Node> {
        self.children
            .iter()
            .filter(|child| child.id() == T::ID)
            .find_map(|child| child.as_any().downcast_ref::<T::Node>())
    }

    /// The first child of type `T`.
    pub fn find_child_mut<T: ElementType>(&mut self) -> Option<&mut T::Node> {
        self.children
            .iter_mut()
            .filter(|child| child.id() == T::ID)
            .find_map(|child| child.as_any_mut().downcast_mut::<T::Node>())
    }

    /// Every child of type `T`, in order.
    pub fn children_of<T: ElementType>(&self) -> impl Iterator<Item = &T::Node> + '_ {
        self.children
            .iter()
            .filter(|child| child.id() == T::ID)
            .filter_map(|child| child.as_any().downcast_ref::<T::Node>())
    }

    /// The first child of type `T`, created with its default if absent.
    pub fn get_child<T: ElementType>(&mut self) -> EbmlResult<&mut T::Node> {
        let index = match self.find_first_index(T::ID) {
            Some(index) => index,
            None => {
                self.children.push(Box::new(T::create()));
                self.children.len() - 1
            }
        };
        self.children[index]
            .as_any_mut()
            .downcast_mut::<T::Node>()
            .ok_or(EbmlError::TypeMismatch(T::NAME))
    }

    /// Appends a new child of type `T`, even if one exists.
    pub fn add_new_child<T: ElementType>(&mut self) -> EbmlResult<&mut T::Node> {
        self.children.push(Box::new(T::create()));
        let last = self.children.len() - 1;
        self.children[last]
            .as_any_mut()
            .downcast_mut::<T::Node>()
            .ok_or(EbmlError::TypeMismatch(T::NAME))
    }

    /// Inserts `element` at `index`. Legality is not checked here; see `check_mandatory`.
    pub fn insert(&mut self, element: Box<dyn EbmlElement>, index: usize) -> EbmlResult<()> {
        let len = self.children.len();
        if index > len {
            return Err(EbmlError::IndexOutOfRange { index, len });
        }
        self.children.insert(index, element);
        Ok(())
    }

    /// Inserts `element` before the first child with id `before`, or at the end if there is none.
    /// Returns the index it was inserted at.
    pub fn insert_before(&mut self, element: Box<dyn EbmlElement>, before: Id) -> usize {
        let index = self.find_first_index(before).unwrap_or(self.children.len());
        self.children.insert(index, element);
        index
    }

    /// Appends `element`.
    pub fn push_element(&mut self, element: Box<dyn EbmlElement>) {
        self.children.push(element);
    }

    /// Removes and returns the child at `index`.
    pub fn remove(&mut self, index: usize) -> Option<Box<dyn EbmlElement>> {
        if index < self.children.len() {
            Some(self.children.remove(index))
        } else {
            None
        }
    }

    /// Removes and returns every child.
    pub fn remove_all(&mut self) -> Vec<Box<dyn EbmlElement>> {
        mem::take(&mut self.children)
    }

    /// Reorders the children into the canonical order of the schema. Children of the same type
    /// keep their relative order; types unknown to the schema go last. Does nothing when the
    /// child order is insignificant.
    pub fn sort(&mut self) {
        if !self.context.ordered {
            return;
        }
        let context = self.context;
        self.children
            .sort_by_key(|child| context.canonical_index(child.id()).unwrap_or(usize::MAX));
    }

    /// Returns true if every mandatory child type has at least one instance. Only this level is
    /// checked.
    pub fn check_mandatory(&self) -> bool {
        self.context
            .mandatory()
            .all(|d| self.find_first_index(d.callbacks.id).is_some())
    }

    /// Appends a default instance of every mandatory child type that has none.
    pub fn process_mandatory(&mut self) {
        for descriptor in self.context.mandatory() {
            if self.find_first_index(descriptor.callbacks.id).is_none() {
                trace!(
                    element = descriptor.callbacks.name,
                    parent = self.context.name,
                    "adding mandatory element"
                );
                self.children.push((descriptor.callbacks.create)());
            }
        }
    }

    /// Reports every mandatory element missing in this subtree, and every leaf without a value.
    pub fn find_all_missing_elements(&self) -> Vec<MissingElement> {
        let mut missing = Vec::new();
        self.collect_missing(&mut missing);
        missing
    }

    fn collect_missing(&self, missing: &mut Vec<MissingElement>) {
        for child in &self.children {
            match child.as_master() {
                Some(master) => master.collect_missing(missing),
                None if !child.value_is_set() => missing.push(MissingElement::ValueNotSet {
                    element: child.name(),
                    parent: self.context.name,
                }),
                None => {}
            }
        }
        for descriptor in self.context.mandatory() {
            if self.find_first_index(descriptor.callbacks.id).is_none() {
                missing.push(MissingElement::Absent {
                    element: descriptor.callbacks.name,
                    parent: self.context.name,
                });
            }
        }
    }

    /// Turns the CRC-32 child on or off. The checksum is computed whenever the container is
    /// rendered.
    pub fn enable_checksum(&mut self, enabled: bool) {
        self.checksum_enabled = enabled;
    }

    /// Returns true if the container carries a CRC-32 child.
    pub fn has_checksum(&self) -> bool {
        self.checksum_enabled
    }

    /// The stored checksum: the one read from the stream, forced, or last computed.
    pub fn crc32(&self) -> u32 {
        self.checksum
    }

    /// Stores `value` as the checksum and enables it.
    pub fn force_checksum(&mut self, value: u32) {
        self.checksum_enabled = true;
        self.checksum = value;
    }

    /// Computes the checksum over the rendered children and stores it.
    pub fn compute_checksum(&mut self) -> EbmlResult<u32> {
        let mut content = Vec::new();
        self.render_children(&mut content, true, false)?;
        self.checksum = Crc32.compute(&content);
        Ok(self.checksum)
    }

    /// Returns true if the stored checksum matches the rendered children.
    pub fn verify_checksum(&mut self) -> EbmlResult<bool> {
        let mut content = Vec::new();
        self.render_children(&mut content, true, false)?;
        let valid = Crc32.verify(&content, self.checksum);
        if !valid {
            debug!(
                element = self.context.name,
                stored = self.checksum,
                "checksum mismatch"
            );
        }
        Ok(valid)
    }

    fn render_children(
        &mut self,
        out: &mut dyn Write,
        force_render: bool,
        keep_intact: bool,
    ) -> EbmlResult<u64> {
        let mut written = 0;
        for child in self.children.iter_mut() {
            written += child.render(out, force_render, keep_intact)?;
        }
        Ok(written)
    }
}
impl Clone for Master {
    fn clone(&self) -> Self {
        Master {
            context: self.context,
            state: self.state.clone(),
            children: self.children.iter().map(|c| c.clone_element()).collect(),
            checksum_enabled: self.checksum_enabled,
            checksum: self.checksum,
        }
    }
}
impl fmt::Debug for Master {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct(self.context.name)
            .field("state", &self.state)
            .field("checksum", &self.checksum_enabled.then_some(self.checksum))
            .field("children", &self.children)
            .finish()
    }
}
impl EbmlElement for Master {
    fn id(&self) -> Id {
        self.context.id
    }

    fn name(&self) -> &'static str {
        self.context.name
    }

    fn state(&self) -> &ElementState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ElementState {
        &mut self.state
    }

    fn update_size(&mut self, force_render: bool) -> EbmlResult<u64> {
        if !self.state.loaded {
            return Ok(self.state.data_size);
        }
        let mut size = 0;
        for child in self.children.iter_mut() {
            if force_render {
                if child.is_finite_size() {
                    child.update_size(true)?;
                } else {
                    // measure by rendering; this also caches the child's size
                    let mut scratch = Vec::new();
                    child.render(&mut scratch, true, false)?;
                }
            }
            size += child.total_size();
        }
        if self.checksum_enabled {
            size += CRC_ELEMENT_SIZE;
        }
        self.state.data_size = size;
        Ok(size)
    }

    fn render_data(
        &mut self,
        out: &mut dyn Write,
        force_render: bool,
        keep_intact: bool,
    ) -> EbmlResult<u64> {
        if !self.state.loaded {
            return Err(EbmlError::NotLoaded(self.context.name));
        }
        if !self.checksum_enabled {
            return self.render_children(out, force_render, keep_intact);
        }

        let mut content = Vec::new();
        self.render_children(&mut content, force_render, keep_intact)?;
        self.checksum = Crc32.compute(&content);
        Crc32Element::ID.write(out)?;
        Size::from(4u8).write(out)?;
        out.write_all(&self.checksum.to_le_bytes())?;
        out.write_all(&content)?;
        Ok(CRC_ELEMENT_SIZE + content.len() as u64)
    }

    fn read_data(&mut self, source: &mut PeekableReader, options: &ReadOptions) -> EbmlResult<()> {
        self.read_standalone(source, options, options.scope)
    }

    fn as_master(&self) -> Option<&Master> {
        Some(self)
    }

    fn as_master_mut(&mut self) -> Option<&mut Master> {
        Some(self)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn clone_element(&self) -> Box<dyn EbmlElement> {
        Box::new(self.clone())
    }

    fn new_instance(&self) -> Box<dyn EbmlElement> {
        Box::new(Master::new(self.context, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::std_containers::EbmlHeader;
    use crate::std_elems::{DocType, DocTypeVersion, EbmlVersion, Void};
    use crate::ElementImpl;

    fn header() -> Master {
        EbmlHeader::create()
    }

    #[test]
    fn mandatory_children_are_created() {
        let mut master = header();
        assert_eq!(7, master.len());
        assert!(master.check_mandatory());

        let removed = master.remove(master.find_first_index(DocType::ID).unwrap());
        assert_eq!(DocType::ID, removed.unwrap().id());
        assert!(!master.check_mandatory());
        master.process_mandatory();
        assert!(master.check_mandatory());
        assert_eq!(DocType::ID, master.children()[6].id());
    }

    #[test]
    fn missing_elements() {
        let mut master = header();
        let missing = master.find_all_missing_elements();
        assert_eq!(
            vec![MissingElement::ValueNotSet {
                element: "DocType",
                parent: "EBML",
            }],
            missing
        );

        master.get_child::<DocType>().unwrap().set_value("webm");
        master.remove(0);
        let missing = master.find_all_missing_elements();
        assert_eq!(1, missing.len());
        assert_eq!("EBMLVersion", missing[0].element());
        assert_eq!(
            "missing element \"EBMLVersion\" in \"EBML\"",
            missing[0].to_string()
        );
    }

    #[test]
    fn typed_access() {
        let mut master = header();
        assert_eq!(1, master.find_child::<EbmlVersion>().unwrap().to_value());
        master.find_child_mut::<DocTypeVersion>().unwrap().set_value(4u8);
        assert_eq!(4, master.find_child::<DocTypeVersion>().unwrap().to_value());

        assert!(master.find_child::<Void>().is_none());
        master.add_new_child::<Void>().unwrap().set_value(vec![0u8; 2]);
        master.add_new_child::<Void>().unwrap();
        assert_eq!(2, master.children_of::<Void>().count());
        let first = master.find_first_index(Void::ID).unwrap();
        assert_eq!(Some(first + 1), master.find_next_index(first));
        assert_eq!(None, master.find_next_index(first + 1));
    }

    #[test]
    fn find_or_create() {
        let mut master = Master::new(EbmlHeader::context(), true);
        master.remove_all();
        let callbacks = ElementCallbacks::of::<DocType>();
        assert_eq!(0, master.find_first_or_create(&callbacks));
        assert_eq!(0, master.find_first_or_create(&callbacks));
        assert_eq!(1, master.find_next_or_create(0).unwrap());
        assert_eq!(DocType::ID, master.children()[1].id());
        assert!(master.find_next_or_create(5).is_err());
    }

    #[test]
    fn insertion() {
        let mut master = header();
        master.remove_all();
        master.push_element(Box::new(ElementImpl::<DocType>::with_value("a")));
        master
            .insert(Box::new(ElementImpl::<EbmlVersion>::new()), 0)
            .unwrap();
        assert!(master
            .insert(Box::new(ElementImpl::<EbmlVersion>::new()), 5)
            .is_err());
        let at = master.insert_before(Box::new(ElementImpl::<Void>::new()), DocType::ID);
        assert_eq!(1, at);
        let again = master.insert_before(Box::new(ElementImpl::<Void>::new()), Void::ID);
        assert_eq!(1, again);

        let second = master.get(2).unwrap();
        assert_eq!(Some(2), master.position_of(second));
        let copy = second.clone_element();
        assert_eq!(None, master.position_of(&*copy));
    }

    #[test]
    fn checksum_is_rendered_first() {
        let mut master = header();
        master.remove_all();
        master.push_element(Box::new(ElementImpl::<Void>::with_value(vec![1u8, 2, 3])));
        master.enable_checksum(true);

        let mut out = Vec::new();
        master.render(&mut out, true, false).unwrap();
        let crc = Crc32.compute(&[0xEC, 0x83, 1, 2, 3]);
        let mut expected = vec![0x1A, 0x45, 0xDF, 0xA3, 0x8B, 0xBF, 0x84];
        expected.extend_from_slice(&crc.to_le_bytes());
        expected.extend_from_slice(&[0xEC, 0x83, 1, 2, 3]);
        assert_eq!(expected, out);
        assert_eq!(crc, master.crc32());
        assert!(master.verify_checksum().unwrap());
    }

    #[test]
    fn deep_clone() {
        let mut master = header();
        master.get_child::<DocType>().unwrap().set_value("webm");
        let copy = master.clone_element();
        master.remove_all();
        let copy = copy.as_master().unwrap();
        assert_eq!(7, copy.len());
        assert_eq!("webm", copy.find_child::<DocType>().unwrap().to_value());
    }
}
