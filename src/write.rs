
//! Streaming a container whose size is not known until its content has been written.
//!
//! `write_head` reserves a size field of a chosen width, children are streamed after it with
//! `stream_child`, and `overwrite_head` seeks back and patches the real size in. Only the size
//! field changes when patching.

use std::io::{Seek, SeekFrom, Write};

use tracing::debug;

use crate::container::Master;
use crate::element::EbmlElement;
use crate::error::{EbmlError, EbmlResult};
use crate::size::{self, Size};

impl Master {
    /// Writes the id and a size field exactly `size_width` bytes wide, and remembers where. An
    /// unknown-size container gets the unknown marker; a finite one its current cached size.
    /// Children the container already holds are rendered right after the head, so the size
    /// patched by `overwrite_head` covers them. Returns the number of bytes written.
    ///
    /// Checksums are not written in this mode, so this turns the checksum off.
    pub fn write_head<W: Write + Seek>(&mut self, out: &mut W, size_width: usize) -> EbmlResult<u64> {
        if size_width == 0 || size_width > size::MAX_WIDTH {
            return Err(EbmlError::PlaceholderTooNarrow {
                width: size_width,
                size: self.state.data_size,
            });
        }
        if self.checksum_enabled {
            debug!(element = self.name(), "checksum dropped for a streamed container");
            self.checksum_enabled = false;
        }

        let position = out.stream_position()?;
        let placeholder = if self.state.size_is_finite {
            Size::encode_exact(self.state.data_size, size_width).map_err(|_| {
                EbmlError::PlaceholderTooNarrow {
                    width: size_width,
                    size: self.state.data_size,
                }
            })?
        } else {
            Size::unknown(size_width)
        };
        let id_width = self.id().write(out)?;
        placeholder.write(out)?;

        self.state.position = Some(position);
        self.state.size_width = size_width;
        let mut written = (id_width + size_width) as u64;
        for child in self.children.iter_mut() {
            written += child.render(out, true, false)?;
        }
        Ok(written)
    }

    /// Renders `child` right after what has been written so far and takes ownership of it.
    pub fn stream_child<W: Write + Seek>(
        &mut self,
        out: &mut W,
        mut child: Box<dyn EbmlElement>,
    ) -> EbmlResult<u64> {
        let written = child.render(out, true, false)?;
        self.children.push(child);
        Ok(written)
    }

    /// Patches the size field written by `write_head` with the number of bytes written since,
    /// leaving the stream positioned at its end. The container has a finite size afterwards.
    pub fn overwrite_head<W: Write + Seek>(&mut self, out: &mut W) -> EbmlResult<()> {
        let position = self
            .state
            .position
            .ok_or(EbmlError::NoPosition(self.name()))?;
        let width = self.state.size_width;
        let size_position = position + self.id().get_width() as u64;
        let data_start = size_position + width as u64;

        let end = out.stream_position()?;
        let content = end
            .checked_sub(data_start)
            .ok_or(EbmlError::NoPosition(self.name()))?;
        let size = Size::encode_exact(content, width).map_err(|_| {
            EbmlError::PlaceholderTooNarrow {
                width,
                size: content,
            }
        })?;

        out.seek(SeekFrom::Start(size_position))?;
        size.write(out)?;
        out.seek(SeekFrom::Start(end))?;

        debug!(element = self.name(), size = content, width, "patched size");
        self.state.size_is_finite = true;
        self.state.data_size = content;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::std_containers::EbmlHeader;
    use crate::std_elems::{DocType, EbmlVersion};
    use crate::{Container, ElementImpl};
    use std::io::Cursor;

    #[test]
    fn patch_keeps_position() {
        let mut master = Master::new(EbmlHeader::context(), false);
        master.remove_all();
        let mut out = Cursor::new(vec![0xAAu8, 0xBB]);
        out.set_position(2);

        assert_eq!(6, master.write_head(&mut out, 2).unwrap());
        assert_eq!(Some(2), master.position());
        master
            .stream_child(&mut out, Box::new(ElementImpl::<DocType>::with_value("webm")))
            .unwrap();
        master.overwrite_head(&mut out).unwrap();

        assert_eq!(15, out.position());
        assert!(master.is_finite_size());
        assert_eq!(7, master.data_size());
        assert_eq!(
            vec![0xAA, 0xBB, 0x1A, 0x45, 0xDF, 0xA3, 0x40, 0x07],
            out.get_ref()[..8].to_vec()
        );
    }

    #[test]
    fn placeholder_too_narrow() {
        let mut master = Master::new(EbmlHeader::context(), false);
        master.remove_all();
        let mut out = Cursor::new(Vec::new());
        master.write_head(&mut out, 1).unwrap();
        for _ in 0..40 {
            master
                .stream_child(&mut out, Box::new(ElementImpl::<EbmlVersion>::new()))
                .unwrap();
        }
        match master.overwrite_head(&mut out) {
            Err(EbmlError::PlaceholderTooNarrow { width: 1, size: 160 }) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn needs_a_head() {
        let mut master = Master::new(EbmlHeader::context(), false);
        let mut out = Cursor::new(Vec::new());
        assert!(master.overwrite_head(&mut out).is_err());
        assert!(master.write_head(&mut out, 9).is_err());
    }
}
