
// Elements are serialized as their ID, their size, then the data.
// Data can be either more elements, or a Value. The size is the number of bytes of data.

//! EBML elements, or values with semantic significance.

use std::any::Any;
use std::cmp;
use std::fmt;
use std::io::{Read, Seek, SeekFrom, Write};
use std::marker::PhantomData;

use tracing::trace;

use crate::cardinality;
use crate::container::Master;
use crate::error::{EbmlError, EbmlResult};
use crate::id::Id;
use crate::peek::PeekableReader;
use crate::read::ReadOptions;
use crate::size::{self, Size};
use crate::value::EbmlValue;

/// The type-level description of an element type: its id, name and where it may appear. Every
/// element or container type in a document implements this, usually through `ebml_element!` or
/// `ebml_container!`.
pub trait ElementType: 'static {
    /// The runtime node for elements of this type: `ElementImpl<Self>` for leaves, `Master` for
    /// containers.
    type Node: EbmlElement + 'static;

    /// The cardinality of elements of this type within their parent.
    type Cardinality: cardinality::Cardinality;

    /// The minimum possible nesting level of elements of this type. If this type is not restricted
    /// by nesting level, set this to the special type `AnyLevel`.
    type MinAllowedLevel: typenum::Integer;

    /// The maximum possible nesting level of elements of this type. If this type is not restricted
    /// by nesting level, set this to the special type `AnyLevel`.
    ///
    /// If there should be no maximum, set this to a large value. It is recommended to use
    /// `typenum::P8192`.
    type MaxAllowedLevel: typenum::Integer;

    /// The ID of the element type.
    const ID: Id;

    /// The name of the element type. This is a symbolic identifier for the element, and the set of
    /// element and container names must have a 1-to-1 mapping onto the set of element and
    /// container IDs.
    const NAME: &'static str;

    /// Creates a fresh element of this type, holding its default value (or, for containers, its
    /// mandatory children).
    fn create() -> Self::Node;
}

/// Implement this trait on an empty enum for each leaf element type in your document.
pub trait Element: ElementType {
    /// The kind of value for elements of this type.
    type Value: EbmlValue;

    /// The default value for elements of this type.
    ///
    /// The default implementation returns `None`, indicating no default.
    fn default_value() -> Option<Self::Value> {
        None
    }
}

/// Bookkeeping shared by every element: where it was read from and how big its content is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementState {
    pub(crate) position: Option<u64>,
    pub(crate) size_is_finite: bool,
    pub(crate) data_size: u64,
    pub(crate) size_width: usize,
    pub(crate) loaded: bool,
    pub(crate) level: i64,
}
impl ElementState {
    pub(crate) fn new(size_is_finite: bool) -> Self {
        ElementState {
            position: None,
            size_is_finite,
            data_size: 0,
            size_width: 0,
            loaded: true,
            level: 0,
        }
    }

    /// The offset of the element's header in the stream it was read from or written to.
    pub fn position(&self) -> Option<u64> {
        self.position
    }

    /// Returns false if the element's size is unknown.
    pub fn is_finite(&self) -> bool {
        self.size_is_finite
    }

    /// The cached size of the content, excluding the header. Only valid after `update_size`.
    pub fn data_size(&self) -> u64 {
        self.data_size
    }

    /// The minimum width of the coded size, or 0 for the shortest encoding.
    pub fn size_width(&self) -> usize {
        self.size_width
    }

    /// Returns false if the content was skipped while reading, or if reading it failed.
    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// The nesting level the element was read at, 0 for top-level elements.
    pub fn level(&self) -> i64 {
        self.level
    }

    /// Forces the coded size to be written with at least `width` bytes (at most 8). Elements read
    /// from a stream keep the width they were stored with.
    pub fn set_size_width(&mut self, width: usize) {
        self.size_width = cmp::min(width, size::MAX_WIDTH);
    }

    pub(crate) fn coded_size(&self) -> EbmlResult<Size> {
        if self.size_is_finite {
            Size::encode(self.data_size, cmp::max(self.size_width, 1))
        } else {
            Ok(Size::unknown(self.size_width))
        }
    }

    pub(crate) fn coded_size_width(&self) -> usize {
        if self.size_is_finite {
            Size::min_width(self.data_size).map_or(size::MAX_WIDTH, |w| cmp::max(w, self.size_width))
        } else {
            self.size_width.clamp(1, size::MAX_WIDTH)
        }
    }
}

/// The runtime interface of every element in a tree. Trees own their children as
/// `Box<dyn EbmlElement>`.
pub trait EbmlElement: fmt::Debug {
    /// The ID of the element.
    fn id(&self) -> Id;

    /// The name of the element type.
    fn name(&self) -> &'static str;

    /// Position and size bookkeeping.
    fn state(&self) -> &ElementState;

    /// Mutable position and size bookkeeping.
    fn state_mut(&mut self) -> &mut ElementState;

    /// Recomputes the size of the content and caches it. With `force_render`, containers resolve
    /// every descendant first, rendering unknown-size children to measure them.
    fn update_size(&mut self, force_render: bool) -> EbmlResult<u64>;

    /// Writes the content (without the header), returning the number of bytes written.
    fn render_data(
        &mut self,
        out: &mut dyn Write,
        force_render: bool,
        keep_intact: bool,
    ) -> EbmlResult<u64>;

    /// Reads the content of the element. `source` must be positioned just after the header, which
    /// has already been applied to `state_mut()`.
    fn read_data(&mut self, source: &mut PeekableReader, options: &ReadOptions) -> EbmlResult<()>;

    /// Returns true if the element holds a value (leaves) or always (containers).
    fn value_is_set(&self) -> bool {
        true
    }

    /// Views the element as a container.
    fn as_master(&self) -> Option<&Master> {
        None
    }

    /// Mutably views the element as a container.
    fn as_master_mut(&mut self) -> Option<&mut Master> {
        None
    }

    /// Used for typed lookups.
    fn as_any(&self) -> &dyn Any;

    /// Used for typed lookups.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Deep copy, including all children.
    fn clone_element(&self) -> Box<dyn EbmlElement>;

    /// A fresh element of the same type.
    fn new_instance(&self) -> Box<dyn EbmlElement>;

    /// The cached size of the content.
    fn data_size(&self) -> u64 {
        self.state().data_size
    }

    /// Returns false if the element's size is unknown.
    fn is_finite_size(&self) -> bool {
        self.state().size_is_finite
    }

    /// Returns false if the content was skipped while reading.
    fn is_loaded(&self) -> bool {
        self.state().loaded
    }

    /// The offset of the element's header in its stream.
    fn position(&self) -> Option<u64> {
        self.state().position
    }

    /// The size of the ID plus the coded size.
    fn head_size(&self) -> u64 {
        (self.id().get_width() + self.state().coded_size_width()) as u64
    }

    /// The size of the whole element.
    fn total_size(&self) -> u64 {
        self.head_size() + self.data_size()
    }

    /// The offset of the first content byte in the element's stream.
    fn data_start(&self) -> Option<u64> {
        self.position().map(|p| p + self.head_size())
    }

    /// Writes the ID and the coded size.
    fn render_head(&self, out: &mut dyn Write) -> EbmlResult<u64> {
        let id_width = self.id().write(out)?;
        let size_width = self.state().coded_size()?.write(out)?;
        Ok((id_width + size_width) as u64)
    }

    /// Writes the whole element. Unless `keep_intact` is set the size is resolved first with
    /// `update_size(force_render)`.
    fn render(
        &mut self,
        out: &mut dyn Write,
        force_render: bool,
        keep_intact: bool,
    ) -> EbmlResult<u64> {
        if !keep_intact {
            self.update_size(force_render)?;
        }
        let head = self.render_head(out)?;
        let written = self.render_data(out, force_render, keep_intact)?;
        if self.is_finite_size() {
            if written != self.data_size() {
                return Err(EbmlError::SizeMismatch {
                    name: self.name(),
                    declared: self.data_size(),
                    actual: written,
                });
            }
        } else {
            self.state_mut().data_size = written;
        }
        Ok(head + written)
    }
}

pub(crate) fn create_boxed<T: ElementType>() -> Box<dyn EbmlElement> {
    Box::new(T::create())
}

/// A leaf element containing some data.
pub struct ElementImpl<E: Element> {
    state: ElementState,
    value: E::Value,
    value_is_set: bool,
    _element: PhantomData<fn() -> E>,
}
impl<E: Element> ElementImpl<E> {
    /// Creates an element holding the type's default value, if it has one.
    pub fn new() -> Self {
        let default = E::default_value();
        let value_is_set = default.is_some();
        Self::with_state(default.unwrap_or_default(), value_is_set)
    }

    /// Creates an element holding `value`.
    pub fn with_value<V: Into<E::Value>>(value: V) -> Self {
        Self::with_state(value.into(), true)
    }

    fn with_state(value: E::Value, value_is_set: bool) -> Self {
        let mut state = ElementState::new(true);
        state.data_size = value.get_size();
        ElementImpl {
            state,
            value,
            value_is_set,
            _element: PhantomData,
        }
    }

    /// Borrows the value.
    pub fn value(&self) -> &E::Value {
        &self.value
    }

    /// Mutably borrows the value. The cached size is not updated; call `update_size` (or render
    /// without `keep_intact`) afterwards.
    pub fn value_mut(&mut self) -> &mut E::Value {
        self.value_is_set = true;
        &mut self.value
    }

    /// Replaces the value and updates the cached size.
    pub fn set_value<V: Into<E::Value>>(&mut self, value: V) {
        self.value = value.into();
        self.value_is_set = true;
        self.state.data_size = self.value.get_size();
    }

    /// Retrieves the actual value of the Element.
    pub fn to_value(&self) -> <E::Value as EbmlValue>::Repr {
        self.value.to_repr()
    }

    /// Returns true if the element holds its type's default value.
    pub fn is_default_value(&self) -> bool {
        E::default_value().map_or(false, |default| default == self.value)
    }

    /// Reads the content of an element whose content was skipped, from the stream it was
    /// originally read from.
    pub fn load<R: Read + Seek>(&mut self, source: &mut R) -> EbmlResult<()> {
        let start = self.data_start().ok_or(EbmlError::NoPosition(E::NAME))?;
        source.seek(SeekFrom::Start(start))?;
        let mut reader = PeekableReader::at_offset(source, start);
        self.read_data(&mut reader, &ReadOptions::default())
    }
}
impl<E: Element> Default for ElementImpl<E> {
    fn default() -> Self {
        Self::new()
    }
}
impl<E: Element> Clone for ElementImpl<E> {
    fn clone(&self) -> Self {
        ElementImpl {
            state: self.state.clone(),
            value: self.value.clone(),
            value_is_set: self.value_is_set,
            _element: PhantomData,
        }
    }
}
impl<E: Element> fmt::Debug for ElementImpl<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct(E::NAME)
            .field("value", &self.value)
            .field("state", &self.state)
            .finish()
    }
}
impl<E: Element> EbmlElement for ElementImpl<E> {
    fn id(&self) -> Id {
        E::ID
    }

    fn name(&self) -> &'static str {
        E::NAME
    }

    fn state(&self) -> &ElementState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ElementState {
        &mut self.state
    }

    fn update_size(&mut self, _force_render: bool) -> EbmlResult<u64> {
        if self.state.loaded {
            self.state.data_size = self.value.get_size();
        }
        Ok(self.state.data_size)
    }

    fn render_data(
        &mut self,
        out: &mut dyn Write,
        _force_render: bool,
        _keep_intact: bool,
    ) -> EbmlResult<u64> {
        if !self.state.loaded {
            return Err(EbmlError::NotLoaded(E::NAME));
        }
        self.value.encode(out)?;
        Ok(self.value.get_size())
    }

    fn read_data(&mut self, source: &mut PeekableReader, _options: &ReadOptions) -> EbmlResult<()> {
        let position = source.position();
        let data = source.read_vec(self.state.data_size)?;
        self.value = E::Value::decode(&data, position)?;
        self.value_is_set = true;
        self.state.loaded = true;
        trace!(element = E::NAME, value = ?self.value, "read value");
        Ok(())
    }

    fn value_is_set(&self) -> bool {
        self.value_is_set
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
        Box::new(Self::new())
    }
}

/// An element whose ID is not known to the schema. Its content is kept as raw bytes so the
/// element is written back unchanged.
#[derive(Debug, Clone)]
pub struct Dummy {
    id: Id,
    state: ElementState,
    data: Vec<u8>,
}
impl Dummy {
    /// Creates an empty dummy element with the given ID.
    pub fn new(id: Id) -> Self {
        Dummy {
            id,
            state: ElementState::new(true),
            data: Vec::new(),
        }
    }

    /// The raw content.
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}
impl EbmlElement for Dummy {
    fn id(&self) -> Id {
        self.id
    }

    fn name(&self) -> &'static str {
        "Dummy"
    }

    fn state(&self) -> &ElementState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ElementState {
        &mut self.state
    }

    fn update_size(&mut self, _force_render: bool) -> EbmlResult<u64> {
        if self.state.loaded {
            self.state.data_size = self.data.len() as u64;
        }
        Ok(self.state.data_size)
    }

    fn render_data(
        &mut self,
        out: &mut dyn Write,
        _force_render: bool,
        _keep_intact: bool,
    ) -> EbmlResult<u64> {
        if !self.state.loaded {
            return Err(EbmlError::NotLoaded("Dummy"));
        }
        out.write_all(&self.data)?;
        Ok(self.data.len() as u64)
    }

    fn read_data(&mut self, source: &mut PeekableReader, _options: &ReadOptions) -> EbmlResult<()> {
        self.data = source.read_vec(self.state.data_size)?;
        self.state.loaded = true;
        Ok(())
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
        Box::new(Dummy::new(self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::std_elems::{DocType, EbmlVersion, Void};
    use crate::value::{BinaryValue, UintValue};
    use std::io::Cursor;

    #[test]
    fn defaults() {
        let version = ElementImpl::<EbmlVersion>::new();
        assert!(version.value_is_set());
        assert!(version.is_default_value());
        assert_eq!(1, version.to_value());

        let doc_type = ElementImpl::<DocType>::new();
        assert!(!doc_type.value_is_set());
        assert!(!doc_type.is_default_value());
    }

    #[test]
    fn sizes_follow_the_value() {
        let mut version = ElementImpl::<EbmlVersion>::new();
        assert_eq!(4, version.total_size());
        version.set_value(UintValue::Uint2(1));
        assert!(!version.is_default_value());
        assert_eq!(5, version.total_size());

        let mut void = ElementImpl::<Void>::with_value(vec![0u8; 130]);
        assert_eq!(130, void.update_size(false).unwrap());
        // 130 needs a two byte coded size
        assert_eq!(3, void.head_size());
    }

    #[test]
    fn render_with_preserved_width() {
        let mut version = ElementImpl::<EbmlVersion>::with_value(UintValue::Uint1(2));
        version.state_mut().set_size_width(4);
        let mut out = Vec::new();
        assert_eq!(7, version.render(&mut out, false, false).unwrap());
        assert_eq!(vec![0x42, 0x86, 0x10, 0x00, 0x00, 0x01, 0x02], out);
    }

    #[test]
    fn stale_size_is_rejected() {
        let mut void = ElementImpl::<Void>::with_value(BinaryValue::from(vec![0u8; 2]));
        void.value_mut().as_mut_vec().push(0);
        let mut out = Vec::new();
        match void.render(&mut out, false, true) {
            Err(EbmlError::SizeMismatch {
                declared: 2,
                actual: 3,
                ..
            }) => {}
            other => panic!("unexpected {:?}", other),
        }
        out.clear();
        assert_eq!(5, void.render(&mut out, false, false).unwrap());
    }

    #[test]
    fn lazy_load() {
        let bytes = vec![0x42u8, 0x86, 0x81, 0x07];
        let mut version = ElementImpl::<EbmlVersion>::new();
        {
            let state = version.state_mut();
            state.position = Some(0);
            state.data_size = 1;
            state.size_width = 1;
            state.loaded = false;
        }
        let mut out = Vec::new();
        assert!(version.render(&mut out, false, false).is_err());

        version.load(&mut Cursor::new(bytes)).unwrap();
        assert!(version.is_loaded());
        assert_eq!(7, version.to_value());
    }

    #[test]
    fn dummy_keeps_raw_bytes() {
        let id = Id::from_encoded(0x4FFF).unwrap();
        let mut dummy = Dummy::new(id);
        dummy.state_mut().data_size = 3;
        let mut source = PeekableReader::new(Cursor::new(vec![1u8, 2, 3]));
        dummy.read_data(&mut source, &ReadOptions::default()).unwrap();
        assert_eq!(&[1, 2, 3], dummy.data());

        let mut out = Vec::new();
        dummy.render(&mut out, true, false).unwrap();
        assert_eq!(vec![0x4F, 0xFF, 0x83, 1, 2, 3], out);
        assert_eq!(id, dummy.new_instance().id());
    }
}
