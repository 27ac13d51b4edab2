//! Gzip member framing (RFC 1952)
//!
//! A gzip file is one or more members, each a header, a raw DEFLATE stream
//! and an 8-byte trailer. Members are decoded back to back into the same
//! writer.

use std::io::{self, BufRead, Read, Write};

use log::{debug, warn};

use crate::deflate_decoder::DeflateDecoder;
use crate::error::{InflateError, InflateResult};

pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compression method: deflate
pub const CM_DEFLATE: u8 = 8;

pub const FTEXT: u8 = 0x01;
pub const FHCRC: u8 = 0x02;
pub const FEXTRA: u8 = 0x04;
pub const FNAME: u8 = 0x08;
pub const FCOMMENT: u8 = 0x10;
const FRESERVED: u8 = 0xE0;

/// Decoded gzip member header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GzipHeader {
    pub text: bool,
    /// Modification time, seconds since the Unix epoch (0 if unknown)
    pub mtime: u32,
    pub extra_flags: u8,
    pub os: u8,
    pub extra: Option<Vec<u8>>,
    /// Original file name, Latin-1 bytes without the terminating NUL
    pub filename: Option<Vec<u8>>,
    pub comment: Option<Vec<u8>>,
    /// Header CRC16 as stored; not verified
    pub header_crc: Option<u16>,
}

/// Byte-counting wrapper so truncation errors can report where they happened
struct FieldReader<'a, R> {
    inner: &'a mut R,
    /// Absolute byte offset in the gzip stream
    offset: u64,
}

impl<'a, R: Read> FieldReader<'a, R> {
    fn new(inner: &'a mut R, offset: u64) -> Self {
        Self { inner, offset }
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> InflateResult<()> {
        match self.inner.read_exact(buf) {
            Ok(()) => {
                self.offset += buf.len() as u64;
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(InflateError::UnexpectedEndOfInput {
                    bit_offset: self.offset * 8,
                })
            }
            Err(e) => Err(e.into()),
        }
    }

    fn read_u8(&mut self) -> InflateResult<u8> {
        let mut buf = [0u8; 1];
        self.read_exact(&mut buf)?;
        Ok(buf[0])
    }

    fn read_u16_le(&mut self) -> InflateResult<u16> {
        let mut buf = [0u8; 2];
        self.read_exact(&mut buf)?;
        Ok(u16::from_le_bytes(buf))
    }

    fn read_u32_le(&mut self) -> InflateResult<u32> {
        let mut buf = [0u8; 4];
        self.read_exact(&mut buf)?;
        Ok(u32::from_le_bytes(buf))
    }

    fn read_zero_terminated(&mut self) -> InflateResult<Vec<u8>> {
        let mut bytes = Vec::new();
        loop {
            match self.read_u8()? {
                0 => return Ok(bytes),
                b => bytes.push(b),
            }
        }
    }
}

impl GzipHeader {
    /// Read a member header, leaving `reader` at the start of the DEFLATE data.
    pub fn read_from<R: Read>(reader: &mut R) -> InflateResult<Self> {
        Self::read_at(reader, 0).map(|(header, _)| header)
    }

    /// Read a header starting at byte `start` of the stream. Returns the
    /// header and the offset just past it.
    fn read_at<R: Read>(reader: &mut R, start: u64) -> InflateResult<(Self, u64)> {
        let mut r = FieldReader::new(reader, start);

        let mut fixed = [0u8; 10];
        r.read_exact(&mut fixed)?;

        if fixed[..2] != GZIP_MAGIC {
            return Err(InflateError::invalid_gzip_header(format!(
                "bad magic {:02x} {:02x}",
                fixed[0], fixed[1]
            )));
        }
        if fixed[2] != CM_DEFLATE {
            return Err(InflateError::invalid_gzip_header(format!(
                "unsupported compression method {}",
                fixed[2]
            )));
        }
        let flags = fixed[3];
        if flags & FRESERVED != 0 {
            return Err(InflateError::invalid_gzip_header(format!(
                "reserved flag bits set ({:#04x})",
                flags
            )));
        }

        let mut header = GzipHeader {
            text: flags & FTEXT != 0,
            mtime: u32::from_le_bytes([fixed[4], fixed[5], fixed[6], fixed[7]]),
            extra_flags: fixed[8],
            os: fixed[9],
            ..Default::default()
        };

        if flags & FEXTRA != 0 {
            let xlen = r.read_u16_le()? as usize;
            let mut extra = vec![0u8; xlen];
            r.read_exact(&mut extra)?;
            header.extra = Some(extra);
        }
        if flags & FNAME != 0 {
            header.filename = Some(r.read_zero_terminated()?);
        }
        if flags & FCOMMENT != 0 {
            header.comment = Some(r.read_zero_terminated()?);
        }
        if flags & FHCRC != 0 {
            header.header_crc = Some(r.read_u16_le()?);
        }

        Ok((header, r.offset))
    }

    /// Operating system name from the OS byte
    pub fn os_name(&self) -> &'static str {
        match self.os {
            0 => "FAT filesystem (MS-DOS, OS/2, NT/Win32)",
            1 => "Amiga",
            2 => "VMS (or OpenVMS)",
            3 => "Unix",
            4 => "VM/CMS",
            5 => "Atari TOS",
            6 => "HPFS filesystem (OS/2, NT)",
            7 => "Macintosh",
            8 => "Z-System",
            9 => "CP/M",
            10 => "TOPS-20",
            11 => "NTFS filesystem (NT)",
            12 => "QDOS",
            13 => "Acorn RISCOS",
            _ => "unknown",
        }
    }

    /// "text" when the FTEXT flag is set, "binary" otherwise
    pub fn content_type(&self) -> &'static str {
        if self.text {
            "text"
        } else {
            "binary"
        }
    }

    /// Original file name decoded as Latin-1
    pub fn filename_lossy(&self) -> Option<String> {
        self.filename.as_deref().map(latin1_to_string)
    }

    /// Comment decoded as Latin-1
    pub fn comment_lossy(&self) -> Option<String> {
        self.comment.as_deref().map(latin1_to_string)
    }
}

fn latin1_to_string(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

/// Member trailer: CRC32 and length of the uncompressed data mod 2^32
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GzipTrailer {
    pub crc32: u32,
    pub isize: u32,
}

impl GzipTrailer {
    pub fn read_from<R: Read>(reader: &mut R) -> InflateResult<Self> {
        Self::read_at(reader, 0)
    }

    fn read_at<R: Read>(reader: &mut R, start: u64) -> InflateResult<Self> {
        let mut r = FieldReader::new(reader, start);
        let crc32 = r.read_u32_le()?;
        let isize = r.read_u32_le()?;
        Ok(Self { crc32, isize })
    }
}

/// One decoded member
#[derive(Debug, Clone)]
pub struct GzipMember {
    pub header: GzipHeader,
    pub trailer: GzipTrailer,
    pub output_len: u64,
    pub blocks: usize,
}

/// Result of decoding a whole gzip stream
#[derive(Debug, Clone, Default)]
pub struct GzipSummary {
    pub members: Vec<GzipMember>,
    pub total_output: u64,
}

/// Decode every member of a gzip stream into `writer`.
///
/// Bytes after the last member that do not start a new member are ignored
/// with a warning, as gzip does.
pub fn decompress_gzip<R: BufRead, W: Write>(
    mut source: R,
    writer: &mut W,
) -> InflateResult<GzipSummary> {
    let mut summary = GzipSummary::default();
    // Bytes of the stream consumed so far
    let mut offset = 0u64;
    // Magic of the next member, already taken from `source`
    let mut pending_magic: Option<[u8; 2]> = None;

    loop {
        let (header, header_end) = match pending_magic.take() {
            None => GzipHeader::read_at(&mut source, offset)?,
            Some(magic) => GzipHeader::read_at(&mut (&magic[..]).chain(&mut source), offset)?,
        };
        debug!(
            "gzip member {} at byte {}: name={:?} mtime={} os={} {}",
            summary.members.len(),
            offset,
            header.filename_lossy(),
            header.mtime,
            header.os_name(),
            header.content_type()
        );

        let mut decoder = DeflateDecoder::new(&mut source);
        let output_len = decoder.decode(writer)?;
        let blocks = decoder.blocks().len();
        offset = header_end + decoder.bit_position().div_ceil(8);

        let trailer = GzipTrailer::read_at(&mut source, offset)?;
        offset += 8;
        debug!(
            "gzip member {}: {} bytes in {} blocks, crc32 {:08x}",
            summary.members.len(),
            output_len,
            blocks,
            trailer.crc32
        );

        if trailer.isize != output_len as u32 {
            return Err(InflateError::SizeMismatch {
                expected: trailer.isize,
                actual: output_len as u32,
            });
        }

        summary.total_output += output_len;
        summary.members.push(GzipMember {
            header,
            trailer,
            output_len,
            blocks,
        });

        // Decide on exactly two bytes, however the source happens to be buffered
        let mut next = [0u8; 2];
        match read_up_to(&mut source, &mut next)? {
            0 => break,
            2 if next == GZIP_MAGIC => pending_magic = Some(next),
            n => {
                warn!(
                    "trailing garbage ignored after byte {} ({:02x?})",
                    offset,
                    &next[..n]
                );
                break;
            }
        }
    }

    Ok(summary)
}

/// Read until `buf` is full or the source ends; returns the bytes read.
fn read_up_to<R: Read>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    Ok(filled)
}
