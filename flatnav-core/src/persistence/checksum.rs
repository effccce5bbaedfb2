//! Reader and writer adaptors that CRC32 every byte passing through them.

use std::io::{self, Read, Write};

use crc32fast::Hasher;

#[derive(Debug)]
pub(crate) struct ChecksumWriter<W> {
    inner: W,
    hasher: Hasher,
}

impl<W: Write> ChecksumWriter<W> {
    pub(crate) fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Hasher::new(),
        }
    }

    /// Returns the checksum so far and the wrapped writer.
    pub(crate) fn finish(self) -> (u32, W) {
        (self.hasher.finalize(), self.inner)
    }
}

impl<W: Write> Write for ChecksumWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(buf.get(..written).unwrap_or(buf));
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

#[derive(Debug)]
pub(crate) struct ChecksumReader<R> {
    inner: R,
    hasher: Hasher,
    consumed: u64,
}

impl<R: Read> ChecksumReader<R> {
    pub(crate) fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Hasher::new(),
            consumed: 0,
        }
    }

    /// Bytes read through the adaptor so far.
    pub(crate) const fn consumed(&self) -> u64 {
        self.consumed
    }

    pub(crate) fn finish(self) -> (u32, R) {
        (self.hasher.finalize(), self.inner)
    }
}

impl<R: Read> Read for ChecksumReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let read = self.inner.read(buf)?;
        if let Some(filled) = buf.get(..read) {
            self.hasher.update(filled);
        }
        self.consumed += read as u64;
        Ok(read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_and_writer_agree() {
        let mut writer = ChecksumWriter::new(Vec::new());
        writer.write_all(b"flatnav").expect("write");
        let (written, bytes) = writer.finish();

        let mut reader = ChecksumReader::new(bytes.as_slice());
        let mut sink = Vec::new();
        reader.read_to_end(&mut sink).expect("read");
        assert_eq!(reader.consumed(), 7);
        let (read, _) = reader.finish();
        assert_eq!(written, read);
        assert_eq!(written, crc32fast::hash(b"flatnav"));
    }
}
