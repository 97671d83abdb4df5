
// If the size of a container is unknown, then the first element not allowed to be a child of the
// container is the next higher-level element.

//! Reading EBML documents.

use std::io::{Read, Seek, SeekFrom};

use tracing::{debug, trace, warn};

use crate::container::Master;
use crate::element::{Dummy, EbmlElement, ElementState, ElementType};
use crate::error::{EbmlError, EbmlResult};
use crate::id::Id;
use crate::peek::PeekableReader;
use crate::semantic::{ChildDescriptor, OpenLevels};
use crate::size::Size;
use crate::std_elems::Crc32Element;

/// How deep a read materializes the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Only the header is read; the content is skipped and can be loaded later. Unknown-size
    /// containers can not be skipped, so their children are read header-only instead.
    HeaderOnly,
    /// The content is read, and children are read with one level less.
    Depth(usize),
    /// Everything is read.
    All,
}
impl Scope {
    /// The scope for the children of an element read with this scope.
    pub fn descend(self) -> Scope {
        match self {
            Scope::All => Scope::All,
            Scope::Depth(0) | Scope::HeaderOnly => Scope::HeaderOnly,
            Scope::Depth(n) => Scope::Depth(n - 1),
        }
    }
}

/// Settings for a read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// How deep to read.
    pub scope: Scope,
    /// Keep elements with unknown ids as `Dummy` elements instead of skipping them.
    pub allow_dummy: bool,
    /// The deepest nesting level a container's children may sit at. Deeper input fails with
    /// `MalformedEncoding`.
    pub max_depth: usize,
}
impl Default for ReadOptions {
    fn default() -> Self {
        ReadOptions {
            scope: Scope::All,
            allow_dummy: true,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// The nesting limit of `ReadOptions::default()`.
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// The ID and coded size at the start of every element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementHeader {
    /// The element's ID.
    pub id: Id,
    /// The coded size of the content, possibly unknown.
    pub size: Size,
    /// Offset of the first byte of the ID.
    pub position: u64,
}
impl ElementHeader {
    /// Reads an ID and a coded size.
    pub fn load(source: &mut PeekableReader) -> EbmlResult<Self> {
        let position = source.position();
        let id = Id::load(source)?;
        let size = Size::load(source)?;
        Ok(ElementHeader { id, size, position })
    }

    /// The number of bytes the header occupies.
    pub fn head_size(&self) -> u64 {
        (self.id.get_width() + self.size.get_width()) as u64
    }

    /// The size of the content, or `None` if unknown.
    pub fn data_size(&self) -> Option<u64> {
        self.size.get_value()
    }

    /// The offset just past the content, or `None` if the size is unknown.
    pub fn end(&self) -> Option<u64> {
        self.data_size()
            .map(|size| self.position + self.head_size() + size)
    }

    fn apply(&self, state: &mut ElementState, level: i64) {
        state.position = Some(self.position);
        state.level = level;
        state.size_is_finite = !self.size.is_unknown();
        state.data_size = self.data_size().unwrap_or(0);
        state.size_width = self.size.get_width();
        state.loaded = false;
    }
}

/// An element found while reading a container which does not belong to it. Its header has been
/// consumed and must be handled by the level it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpperElement {
    /// The header that ended the container.
    pub header: ElementHeader,
    /// How many levels above the container that ended the element is legal, or `None` if it is
    /// legal at no open level.
    pub levels_up: Option<usize>,
}

/// How reading a container ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadOutcome {
    /// The declared size was reached, or the stream ended.
    Complete,
    /// An element of an upper level was found.
    Upper(UpperElement),
}

fn check_fits(header: &ElementHeader, end: Option<u64>) -> EbmlResult<()> {
    match (end, header.end()) {
        (Some(end), Some(child_end)) if child_end > end => Err(EbmlError::malformed(
            header.position,
            "element overruns its parent",
        )),
        _ => Ok(()),
    }
}

/// Reads the content of `element`, whose header has just been consumed. `levels` is the level
/// the element sits at.
fn read_element(
    element: &mut dyn EbmlElement,
    header: &ElementHeader,
    source: &mut PeekableReader,
    options: &ReadOptions,
    scope: Scope,
    levels: &OpenLevels,
) -> EbmlResult<ReadOutcome> {
    header.apply(element.state_mut(), levels.level);
    match element.as_master_mut() {
        Some(master) => {
            if let (Scope::HeaderOnly, Some(size)) = (scope, header.data_size()) {
                debug!(element = master.name(), size, "skipping content");
                master.children.clear();
                source.skip(size)?;
                return Ok(ReadOutcome::Complete);
            }
            master.read_content(source, options, scope, levels)
        }
        None => {
            let size = header.data_size().ok_or_else(|| {
                EbmlError::malformed(header.position, "unknown size on a non-master element")
            })?;
            if scope == Scope::HeaderOnly {
                source.skip(size)?;
            } else {
                element.read_data(source, options)?;
            }
            Ok(ReadOutcome::Complete)
        }
    }
}

/// Handles an element whose id no open level knows: a `Dummy` if allowed, otherwise skipped.
fn read_unknown(
    header: &ElementHeader,
    source: &mut PeekableReader,
    options: &ReadOptions,
    scope: Scope,
    level: i64,
) -> EbmlResult<Option<Box<dyn EbmlElement>>> {
    let size = header.data_size().ok_or_else(|| {
        EbmlError::malformed(header.position, "unknown element with an unknown size")
    })?;
    if !options.allow_dummy {
        warn!(
            id = %header.id,
            size,
            position = header.position,
            "skipping unknown element"
        );
        source.skip(size)?;
        return Ok(None);
    }

    debug!(id = %header.id, size, position = header.position, "keeping unknown element");
    let mut dummy = Dummy::new(header.id);
    header.apply(dummy.state_mut(), level);
    if scope == Scope::HeaderOnly {
        source.skip(size)?;
    } else {
        dummy.read_data(source, options)?;
    }
    Ok(Some(Box::new(dummy)))
}

impl Master {
    /// Reads a whole container, header included. The id in the stream must be this container's.
    ///
    /// The container is taken to sit at the level it was last read at, 0 for a new one.
    ///
    /// On error, the children read so far stay in place but the container is not marked loaded.
    pub fn read(&mut self, source: &mut PeekableReader, options: &ReadOptions) -> EbmlResult<()> {
        let header = ElementHeader::load(source)?;
        if header.id != self.id() {
            return Err(EbmlError::TypeMismatch(self.name()));
        }
        let level = self.state.level;
        header.apply(&mut self.state, level);
        self.read_standalone(source, options, options.scope)
    }

    /// Reads the content of a container whose content was skipped, from the stream it was
    /// originally read from.
    pub fn load<R: Read + Seek>(&mut self, source: &mut R, options: &ReadOptions) -> EbmlResult<()> {
        let start = self.data_start().ok_or(EbmlError::NoPosition(self.name()))?;
        source.seek(SeekFrom::Start(start))?;
        let mut reader = PeekableReader::at_offset(source, start);
        self.read_standalone(&mut reader, options, options.scope)
    }

    pub(crate) fn read_standalone(
        &mut self,
        source: &mut PeekableReader,
        options: &ReadOptions,
        scope: Scope,
    ) -> EbmlResult<()> {
        let top = OpenLevels::at(&[], self.state.level);
        if let ReadOutcome::Upper(upper) = self.read_content(source, options, scope, &top)? {
            debug!(
                element = self.name(),
                id = %upper.header.id,
                "stopped at an element of an upper level"
            );
        }
        Ok(())
    }

    /// Reads children until the declared size is reached, or for an unknown size until an
    /// element of another level shows up or the stream ends. `parent` holds the levels enclosing
    /// this container.
    pub(crate) fn read_content(
        &mut self,
        source: &mut PeekableReader,
        options: &ReadOptions,
        scope: Scope,
        parent: &OpenLevels,
    ) -> EbmlResult<ReadOutcome> {
        self.children.clear();
        self.checksum_enabled = false;
        self.state.loaded = false;

        let levels = parent.nested(self.context().children);
        let start = source.position();
        if levels.level > options.max_depth as i64 {
            return Err(EbmlError::malformed(
                self.state.position.unwrap_or(start),
                "containers nested too deep",
            ));
        }
        let end = if self.state.size_is_finite {
            Some(start + self.state.data_size)
        } else {
            None
        };
        let child_scope = scope.descend();
        let mut pending: Option<ElementHeader> = None;

        let outcome = loop {
            let header = match pending.take() {
                Some(header) => header,
                None => {
                    let position = source.position();
                    if end.map_or(false, |end| position >= end) {
                        break ReadOutcome::Complete;
                    }
                    if source.at_end()? {
                        if let Some(end) = end {
                            return Err(EbmlError::TruncatedStream {
                                position: start,
                                expected: end - start,
                                available: position - start,
                            });
                        }
                        break ReadOutcome::Complete;
                    }
                    ElementHeader::load(source)?
                }
            };
            trace!(
                parent = self.name(),
                id = %header.id,
                size = ?header.data_size(),
                position = header.position,
                "element header"
            );

            if header.id == Crc32Element::ID {
                self.read_checksum(source, &header, end)?;
                continue;
            }

            match levels.locate(header.id) {
                Some((0, descriptor)) => {
                    check_fits(&header, end)?;
                    let mut child = (descriptor.callbacks.create)();
                    let result = read_element(
                        &mut *child,
                        &header,
                        source,
                        options,
                        child_scope,
                        &levels,
                    );
                    // a container that failed part way stays, unloaded, with what it got
                    if result.is_ok() || child.as_master().is_some() {
                        self.children.push(child);
                    }
                    let outcome = result?;
                    if let ReadOutcome::Upper(upper) = outcome {
                        match upper.levels_up {
                            Some(up) if up <= 1 => pending = Some(upper.header),
                            Some(up) => {
                                break ReadOutcome::Upper(UpperElement {
                                    header: upper.header,
                                    levels_up: Some(up - 1),
                                })
                            }
                            None if end.is_some() => self.keep_unknown(
                                &upper.header,
                                source,
                                options,
                                child_scope,
                                &levels,
                                end,
                            )?,
                            None => break ReadOutcome::Upper(upper),
                        }
                    }
                }
                Some((up, _)) => {
                    break ReadOutcome::Upper(UpperElement {
                        header,
                        levels_up: Some(up),
                    })
                }
                None if end.is_some() => {
                    self.keep_unknown(&header, source, options, child_scope, &levels, end)?
                }
                None => {
                    break ReadOutcome::Upper(UpperElement {
                        header,
                        levels_up: None,
                    })
                }
            }
        };

        if end.is_none() {
            let stop = match outcome {
                ReadOutcome::Upper(ref upper) => upper.header.position,
                ReadOutcome::Complete => source.position(),
            };
            self.state.data_size = stop - start;
        }
        self.state.loaded = true;
        Ok(outcome)
    }

    fn keep_unknown(
        &mut self,
        header: &ElementHeader,
        source: &mut PeekableReader,
        options: &ReadOptions,
        scope: Scope,
        levels: &OpenLevels,
        end: Option<u64>,
    ) -> EbmlResult<()> {
        check_fits(header, end)?;
        if let Some(dummy) = read_unknown(header, source, options, scope, levels.level)? {
            self.children.push(dummy);
        }
        Ok(())
    }

    fn read_checksum(
        &mut self,
        source: &mut PeekableReader,
        header: &ElementHeader,
        end: Option<u64>,
    ) -> EbmlResult<()> {
        if header.data_size() != Some(4) {
            return Err(EbmlError::malformed(
                header.position,
                "CRC-32 element must hold 4 bytes",
            ));
        }
        check_fits(header, end)?;
        let mut raw = [0u8; 4];
        source.read_exact(&mut raw)?;
        self.checksum = u32::from_le_bytes(raw);
        self.checksum_enabled = true;
        Ok(())
    }
}

/// Reads the top-level elements of a stream one at a time.
///
/// After an error the reader is exhausted; elements returned before it are complete. A
/// top-level container that failed part way can be taken with `take_partial`.
#[derive(Debug)]
pub struct EbmlReader<'a> {
    source: PeekableReader<'a>,
    top_level: &'static [ChildDescriptor],
    options: ReadOptions,
    pending: Option<ElementHeader>,
    partial: Option<Box<dyn EbmlElement>>,
    done: bool,
}
impl<'a> EbmlReader<'a> {
    /// Creates a reader for a stream whose top-level elements are described by `top_level`, for
    /// example `&EBML_TOP_LEVEL`.
    pub fn new<R: Read + 'a>(
        source: R,
        top_level: &'static [ChildDescriptor],
        options: ReadOptions,
    ) -> Self {
        EbmlReader {
            source: PeekableReader::new(source),
            top_level,
            options,
            pending: None,
            partial: None,
            done: false,
        }
    }

    /// The offset of the next unread byte.
    pub fn position(&self) -> u64 {
        self.source.position()
    }

    /// The top-level container whose read failed, holding the children read before the error.
    /// It is not marked loaded.
    pub fn take_partial(&mut self) -> Option<Box<dyn EbmlElement>> {
        self.partial.take()
    }

    fn read_next(&mut self) -> EbmlResult<Option<Box<dyn EbmlElement>>> {
        let top = OpenLevels::top(self.top_level);
        loop {
            let header = match self.pending.take() {
                Some(header) => header,
                None => {
                    if self.source.at_end()? {
                        return Ok(None);
                    }
                    ElementHeader::load(&mut self.source)?
                }
            };
            trace!(id = %header.id, size = ?header.data_size(), position = header.position, "top-level header");

            if let Some((_, descriptor)) = top.locate(header.id) {
                let mut element = (descriptor.callbacks.create)();
                let outcome = match read_element(
                    &mut *element,
                    &header,
                    &mut self.source,
                    &self.options,
                    self.options.scope,
                    &top,
                ) {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        if element.as_master().is_some() {
                            self.partial = Some(element);
                        }
                        return Err(e);
                    }
                };
                if let ReadOutcome::Upper(upper) = outcome {
                    self.pending = Some(upper.header);
                }
                return Ok(Some(element));
            }
            if let Some(dummy) =
                read_unknown(&header, &mut self.source, &self.options, self.options.scope, 0)?
            {
                return Ok(Some(dummy));
            }
        }
    }
}
impl<'a> Iterator for EbmlReader<'a> {
    type Item = EbmlResult<Box<dyn EbmlElement>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.read_next() {
            Ok(Some(element)) => Some(Ok(element)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Reads every top-level element of a stream.
pub fn read_document<R: Read>(
    source: R,
    top_level: &'static [ChildDescriptor],
    options: ReadOptions,
) -> EbmlResult<Vec<Box<dyn EbmlElement>>> {
    EbmlReader::new(source, top_level, options).collect()
}
