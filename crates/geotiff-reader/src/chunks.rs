//! Raw strip and tile reading for multi-sample images.
//!
//! `tiff` decodes gray, RGB(A), CMYK and YCbCr pixel layouts only. Analytic
//! products store four or more bands as MinIsBlack, or as RGB with extra
//! samples, and separate-plane files need every plane back. Those images are
//! read here straight from their chunk offsets.
//!
//! Supports uncompressed, LZW (via `weezl`) and Deflate (via `flate2`)
//! chunks, with or without the horizontal differencing predictor.

use std::io::{Read, Seek, SeekFrom};

use tiff::decoder::{ChunkType, Decoder};
use tiff::tags::Tag;
use tracing::debug;

use crate::error::{RasterError, RasterResult};

/// TIFF compression codes.
pub mod compression {
    pub const NONE: u16 = 1;
    pub const LZW: u16 = 5;
    pub const DEFLATE: u16 = 8;
    pub const ADOBE_DEFLATE: u16 = 32946;
}

/// TIFF sample format codes.
pub mod sample_format {
    pub const UNSIGNED_INT: u16 = 1;
    pub const SIGNED_INT: u16 = 2;
    pub const FLOAT: u16 = 3;
}

const PREDICTOR_NONE: u16 = 1;
const PREDICTOR_HORIZONTAL: u16 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Little,
    Big,
}

impl Endian {
    /// Byte order from the `II` / `MM` mark at the start of the file.
    pub fn detect<R: Read + Seek>(reader: &mut R) -> RasterResult<Self> {
        let mut mark = [0u8; 2];
        reader.seek(SeekFrom::Start(0))?;
        reader.read_exact(&mut mark)?;
        match &mark {
            b"II" => Ok(Endian::Little),
            b"MM" => Ok(Endian::Big),
            _ => Err(RasterError::InvalidLayout(
                "missing TIFF byte-order mark".to_string(),
            )),
        }
    }
}

/// Where the chunks of one image live and how their samples are encoded.
#[derive(Debug, Clone)]
pub struct ChunkLayout {
    pub width: usize,
    pub height: usize,
    pub samples: usize,
    pub planar: bool,
    pub bits_per_sample: u16,
    pub sample_format: u16,
    pub compression: u16,
    pub predictor: u16,
    pub chunk_width: usize,
    pub chunk_height: usize,
    pub tiled: bool,
    pub offsets: Vec<u64>,
    pub byte_counts: Vec<u64>,
}

impl ChunkLayout {
    /// Collect the layout of the decoder's current image.
    pub fn from_decoder<R: Read + Seek>(
        decoder: &mut Decoder<R>,
        width: usize,
        height: usize,
        samples: usize,
        planar: bool,
    ) -> RasterResult<Self> {
        let bits_per_sample = decoder
            .get_tag_u16_vec(Tag::BitsPerSample)?
            .first()
            .copied()
            .unwrap_or(1);
        let sample_format = match decoder.find_tag(Tag::SampleFormat)? {
            Some(value) => value.into_u16_vec()?.first().copied().unwrap_or(1),
            None => sample_format::UNSIGNED_INT,
        };
        let compression = optional_u16(decoder, Tag::Compression)?.unwrap_or(compression::NONE);
        let predictor = optional_u16(decoder, Tag::Predictor)?.unwrap_or(PREDICTOR_NONE);

        let tiled = decoder.get_chunk_type() == ChunkType::Tile;
        let (offsets, byte_counts) = if tiled {
            (
                decoder.get_tag_u64_vec(Tag::TileOffsets)?,
                decoder.get_tag_u64_vec(Tag::TileByteCounts)?,
            )
        } else {
            (
                decoder.get_tag_u64_vec(Tag::StripOffsets)?,
                decoder.get_tag_u64_vec(Tag::StripByteCounts)?,
            )
        };
        let (chunk_width, chunk_height) = decoder.chunk_dimensions();

        let layout = Self {
            width,
            height,
            samples,
            planar,
            bits_per_sample,
            sample_format,
            compression,
            predictor,
            chunk_width: chunk_width as usize,
            chunk_height: chunk_height as usize,
            tiled,
            offsets,
            byte_counts,
        };
        layout.check()?;
        Ok(layout)
    }

    fn check(&self) -> RasterResult<()> {
        if self.chunk_width == 0 || self.chunk_height == 0 {
            return Err(RasterError::InvalidLayout("zero-sized chunks".to_string()));
        }
        if self.offsets.len() != self.byte_counts.len()
            || self.offsets.len() != self.chunks_per_plane() * self.planes()
        {
            return Err(RasterError::InvalidLayout(format!(
                "{} chunk offsets and {} byte counts for {} chunks",
                self.offsets.len(),
                self.byte_counts.len(),
                self.chunks_per_plane() * self.planes()
            )));
        }
        match self.compression {
            compression::NONE | compression::LZW | compression::DEFLATE | compression::ADOBE_DEFLATE => {}
            other => {
                return Err(RasterError::UnsupportedEncoding(format!(
                    "compression {}",
                    other
                )))
            }
        }
        let horizontal_ok = self.predictor == PREDICTOR_HORIZONTAL
            && self.sample_format != sample_format::FLOAT
            && matches!(self.bits_per_sample, 8 | 16 | 32);
        if self.predictor != PREDICTOR_NONE && !horizontal_ok {
            return Err(RasterError::UnsupportedEncoding(format!(
                "predictor {} with sample format {}",
                self.predictor, self.sample_format
            )));
        }
        sample_size(self.bits_per_sample, self.sample_format)?;
        Ok(())
    }

    fn planes(&self) -> usize {
        if self.planar {
            self.samples
        } else {
            1
        }
    }

    /// Samples stored per pixel inside one chunk.
    fn chunk_samples(&self) -> usize {
        if self.planar {
            1
        } else {
            self.samples
        }
    }

    fn chunks_across(&self) -> usize {
        (self.width + self.chunk_width - 1) / self.chunk_width
    }

    fn chunks_per_plane(&self) -> usize {
        self.chunks_across() * ((self.height + self.chunk_height - 1) / self.chunk_height)
    }

    /// Read every chunk and return the image pixel-interleaved
    /// (`b0 b1 .. bn b0 b1 ..`), whatever the on-disk planar configuration.
    pub fn read_interleaved<R: Read + Seek>(&self, reader: &mut R) -> RasterResult<Vec<f64>> {
        let endian = Endian::detect(reader)?;
        let total = self
            .width
            .checked_mul(self.height)
            .and_then(|pixels| pixels.checked_mul(self.samples))
            .ok_or_else(|| RasterError::InvalidLayout("image too large".to_string()))?;
        let mut out = vec![0.0; total];

        let per_plane = self.chunks_per_plane();
        let across = self.chunks_across();
        let chunk_samples = self.chunk_samples();
        let row_samples = self.chunk_width * chunk_samples;
        let sample_bytes = sample_size(self.bits_per_sample, self.sample_format)?;

        for plane in 0..self.planes() {
            for chunk in 0..per_plane {
                let index = plane * per_plane + chunk;
                let row0 = (chunk / across) * self.chunk_height;
                let col0 = (chunk % across) * self.chunk_width;
                let rows = self.chunk_height.min(self.height - row0);
                let cols = self.chunk_width.min(self.width - col0);

                // Strips stop at the last image row; tiles are always padded
                let stored_rows = if self.tiled { self.chunk_height } else { rows };
                let needed = stored_rows * row_samples * sample_bytes;

                let compressed = self.read_chunk(reader, index)?;
                let mut raw = decompress(&compressed, self.compression, needed)?;
                if raw.len() < needed {
                    return Err(RasterError::InvalidLayout(format!(
                        "chunk {} holds {} bytes, expected {}",
                        index,
                        raw.len(),
                        needed
                    )));
                }
                raw.truncate(needed);

                if self.predictor == PREDICTOR_HORIZONTAL {
                    undo_horizontal_predictor(
                        &mut raw,
                        row_samples,
                        chunk_samples,
                        self.bits_per_sample,
                        endian,
                    );
                }
                let values = bytes_to_f64(&raw, self.bits_per_sample, self.sample_format, endian)?;

                for r in 0..rows {
                    for c in 0..cols {
                        let pixel = (row0 + r) * self.width + col0 + c;
                        let src = r * row_samples + c * chunk_samples;
                        if self.planar {
                            out[pixel * self.samples + plane] = values[src];
                        } else {
                            let dst = pixel * self.samples;
                            out[dst..dst + self.samples]
                                .copy_from_slice(&values[src..src + self.samples]);
                        }
                    }
                }
            }
        }

        debug!(
            chunks = self.offsets.len(),
            tiled = self.tiled,
            compression = self.compression,
            "Read raw chunks"
        );
        Ok(out)
    }

    fn read_chunk<R: Read + Seek>(&self, reader: &mut R, index: usize) -> RasterResult<Vec<u8>> {
        let len = usize::try_from(self.byte_counts[index])
            .map_err(|_| RasterError::InvalidLayout(format!("chunk {} is too large", index)))?;
        let mut buf = vec![0u8; len];
        reader.seek(SeekFrom::Start(self.offsets[index]))?;
        reader.read_exact(&mut buf)?;
        Ok(buf)
    }
}

fn optional_u16<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> RasterResult<Option<u16>> {
    match decoder.find_tag(tag)? {
        Some(value) => Ok(Some(value.into_u16()?)),
        None => Ok(None),
    }
}

/// Bytes per sample, or an error for encodings the reader does not handle.
fn sample_size(bits: u16, format: u16) -> RasterResult<usize> {
    match (bits, format) {
        (8, sample_format::UNSIGNED_INT | sample_format::SIGNED_INT) => Ok(1),
        (16, sample_format::UNSIGNED_INT | sample_format::SIGNED_INT) => Ok(2),
        (32, _) => Ok(4),
        (64, _) => Ok(8),
        _ => Err(RasterError::UnsupportedEncoding(format!(
            "{}-bit samples with format {}",
            bits, format
        ))),
    }
}

/// Decompress one chunk.
pub fn decompress(data: &[u8], compression_code: u16, expected_raw_size: usize) -> RasterResult<Vec<u8>> {
    match compression_code {
        compression::NONE => Ok(data.to_vec()),
        compression::LZW => {
            let mut decoder =
                weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8);
            decoder
                .decode(data)
                .map_err(|e| RasterError::InvalidLayout(format!("LZW: {}", e)))
        }
        compression::DEFLATE | compression::ADOBE_DEFLATE => {
            let mut decoder = flate2::read::ZlibDecoder::new(data);
            let mut out = Vec::with_capacity(expected_raw_size);
            decoder
                .read_to_end(&mut out)
                .map_err(|e| RasterError::InvalidLayout(format!("Deflate: {}", e)))?;
            Ok(out)
        }
        other => Err(RasterError::UnsupportedEncoding(format!("compression {}", other))),
    }
}

/// Reverse horizontal differencing in place. Each row holds `row_samples`
/// samples, and a sample is predicted from the one `stride` samples before it.
fn undo_horizontal_predictor(raw: &mut [u8], row_samples: usize, stride: usize, bits: u16, endian: Endian) {
    match bits {
        8 => {
            for row in raw.chunks_exact_mut(row_samples) {
                for i in stride..row.len() {
                    row[i] = row[i].wrapping_add(row[i - stride]);
                }
            }
        }
        16 => {
            for row in raw.chunks_exact_mut(row_samples * 2) {
                for i in stride..row_samples {
                    let prev = read_u16(&row[(i - stride) * 2..], endian);
                    let cur = read_u16(&row[i * 2..], endian);
                    write_u16(&mut row[i * 2..], cur.wrapping_add(prev), endian);
                }
            }
        }
        32 => {
            for row in raw.chunks_exact_mut(row_samples * 4) {
                for i in stride..row_samples {
                    let prev = read_u32(&row[(i - stride) * 4..], endian);
                    let cur = read_u32(&row[i * 4..], endian);
                    write_u32(&mut row[i * 4..], cur.wrapping_add(prev), endian);
                }
            }
        }
        _ => {}
    }
}

/// Interpret raw chunk bytes as samples of the given width and format.
pub fn bytes_to_f64(raw: &[u8], bits: u16, format: u16, endian: Endian) -> RasterResult<Vec<f64>> {
    let values = match (bits, format) {
        (8, sample_format::UNSIGNED_INT) => raw.iter().map(|&b| f64::from(b)).collect(),
        (8, sample_format::SIGNED_INT) => raw.iter().map(|&b| f64::from(b as i8)).collect(),
        (16, sample_format::UNSIGNED_INT) => raw
            .chunks_exact(2)
            .map(|b| f64::from(read_u16(b, endian)))
            .collect(),
        (16, sample_format::SIGNED_INT) => raw
            .chunks_exact(2)
            .map(|b| f64::from(read_u16(b, endian) as i16))
            .collect(),
        (32, sample_format::UNSIGNED_INT) => raw
            .chunks_exact(4)
            .map(|b| f64::from(read_u32(b, endian)))
            .collect(),
        (32, sample_format::SIGNED_INT) => raw
            .chunks_exact(4)
            .map(|b| f64::from(read_u32(b, endian) as i32))
            .collect(),
        (32, sample_format::FLOAT) => raw
            .chunks_exact(4)
            .map(|b| f64::from(f32::from_bits(read_u32(b, endian))))
            .collect(),
        (64, sample_format::UNSIGNED_INT) => raw
            .chunks_exact(8)
            .map(|b| read_u64(b, endian) as f64)
            .collect(),
        (64, sample_format::SIGNED_INT) => raw
            .chunks_exact(8)
            .map(|b| read_u64(b, endian) as i64 as f64)
            .collect(),
        (64, sample_format::FLOAT) => raw
            .chunks_exact(8)
            .map(|b| f64::from_bits(read_u64(b, endian)))
            .collect(),
        _ => {
            return Err(RasterError::UnsupportedEncoding(format!(
                "{}-bit samples with format {}",
                bits, format
            )))
        }
    };
    Ok(values)
}

fn read_u16(b: &[u8], endian: Endian) -> u16 {
    let bytes = [b[0], b[1]];
    match endian {
        Endian::Little => u16::from_le_bytes(bytes),
        Endian::Big => u16::from_be_bytes(bytes),
    }
}

fn write_u16(b: &mut [u8], value: u16, endian: Endian) {
    let bytes = match endian {
        Endian::Little => value.to_le_bytes(),
        Endian::Big => value.to_be_bytes(),
    };
    b[..2].copy_from_slice(&bytes);
}

fn read_u32(b: &[u8], endian: Endian) -> u32 {
    let bytes = [b[0], b[1], b[2], b[3]];
    match endian {
        Endian::Little => u32::from_le_bytes(bytes),
        Endian::Big => u32::from_be_bytes(bytes),
    }
}

fn write_u32(b: &mut [u8], value: u32, endian: Endian) {
    let bytes = match endian {
        Endian::Little => value.to_le_bytes(),
        Endian::Big => value.to_be_bytes(),
    };
    b[..4].copy_from_slice(&bytes);
}

fn read_u64(b: &[u8], endian: Endian) -> u64 {
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&b[..8]);
    match endian {
        Endian::Little => u64::from_le_bytes(bytes),
        Endian::Big => u64::from_be_bytes(bytes),
    }
}
