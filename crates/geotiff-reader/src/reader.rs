//! Band decoding.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::Path;

use field_common::{AnalysisResult, BandSet, Plane, RasterMetadata};
use tiff::decoder::{Decoder, DecodingResult, Limits};
use tiff::tags::Tag;
use tracing::{debug, instrument};

use crate::chunks::ChunkLayout;
use crate::error::{RasterError, RasterResult};
use crate::geokeys;

/// PlanarConfiguration value for separate sample planes.
const PLANAR_SEPARATE: u16 = 2;

/// Every band of a raster as `f64` planes, plus georeferencing.
#[derive(Debug, Clone)]
pub struct DecodedRaster {
    pub bands: Vec<Plane>,
    pub metadata: RasterMetadata,
}

impl DecodedRaster {
    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    /// Map bands 1-4 onto blue, green, red, near-infrared.
    pub fn into_band_set(self) -> AnalysisResult<BandSet> {
        if self.bands.len() < crate::REQUIRED_BANDS {
            return Err(RasterError::TooFewBands {
                required: crate::REQUIRED_BANDS,
                found: self.bands.len(),
            }
            .into());
        }
        BandSet::from_ordered_bands(self.bands, self.metadata)
    }
}

/// Open and decode a GeoTIFF file.
#[instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_raster(path: impl AsRef<Path>) -> RasterResult<DecodedRaster> {
    let file = File::open(path.as_ref())?;
    decode_raster(BufReader::new(file))
}

/// Decode a GeoTIFF from any seekable source.
pub fn decode_raster<R: Read + Seek>(mut reader: R) -> RasterResult<DecodedRaster> {
    let mut decoder = Decoder::new(&mut reader)?.with_limits(decoding_limits());

    let (width, height) = decoder.dimensions()?;
    let (width, height) = (width as usize, height as usize);

    let transform = geokeys::read_transform(&mut decoder);
    let crs = geokeys::read_crs(&mut decoder);
    let metadata = match transform {
        Some(t) => RasterMetadata::from_transform(t, crs, width, height),
        None => {
            let mut meta = RasterMetadata::pixel_grid(width, height);
            meta.crs = crs;
            meta
        }
    };

    let samples = tag_u16(&mut decoder, Tag::SamplesPerPixel)?.unwrap_or(1) as usize;
    let planar = tag_u16(&mut decoder, Tag::PlanarConfiguration)? == Some(PLANAR_SEPARATE);
    debug!(width, height, samples, planar, "Decoding raster");

    if samples == 1 {
        let bands = read_pages(&mut decoder, width, height)?;
        debug!(bands = bands.len(), "Decoded raster");
        return Ok(DecodedRaster { bands, metadata });
    }

    // `tiff` only decodes chunky gray/RGB(A)-style layouts; multiband
    // MinIsBlack, RGB with extra samples and separate planes are read raw
    let values = if !planar && decoder.colortype().is_ok() {
        to_f64(decoder.read_image()?)
    } else {
        let layout = ChunkLayout::from_decoder(&mut decoder, width, height, samples, planar)?;
        drop(decoder);
        layout.read_interleaved(&mut reader)?
    };

    let bands = deinterleave(&values, width, height, samples)?;
    debug!(bands = bands.len(), "Decoded raster");
    Ok(DecodedRaster { bands, metadata })
}

/// Analytic scenes can be large; the default limits reject them.
fn decoding_limits() -> Limits {
    let mut limits = Limits::default();
    limits.decoding_buffer_size = 1024 * 1024 * 1024;
    limits.intermediate_buffer_size = 1024 * 1024 * 1024;
    limits.ifd_value_size = 64 * 1024 * 1024;
    limits
}

/// One band per single-sample page, starting at the current page.
fn read_pages<R: Read + Seek>(
    decoder: &mut Decoder<R>,
    width: usize,
    height: usize,
) -> RasterResult<Vec<Plane>> {
    let mut bands = vec![plane(to_f64(decoder.read_image()?), width, height)?];
    while decoder.more_images() {
        decoder.next_image()?;
        let (w, h) = decoder.dimensions()?;
        if (w as usize, h as usize) != (width, height) {
            // Overviews and masks come after the bands
            debug!(page = bands.len(), w, h, "Stopping at page with different size");
            break;
        }
        bands.push(plane(to_f64(decoder.read_image()?), width, height)?);
    }
    Ok(bands)
}

fn tag_u16<R: Read + Seek>(decoder: &mut Decoder<R>, tag: Tag) -> RasterResult<Option<u16>> {
    match decoder.find_tag(tag)? {
        Some(value) => Ok(Some(value.into_u16()?)),
        None => Ok(None),
    }
}

fn plane(values: Vec<f64>, width: usize, height: usize) -> RasterResult<Plane> {
    let len = values.len();
    Plane::new(width, height, values).ok_or_else(|| {
        RasterError::InvalidLayout(format!(
            "{} samples for a {}x{} band",
            len, width, height
        ))
    })
}

/// Split pixel-interleaved samples (`b0 b1 b2 b3 b0 b1 ...`) into bands.
fn deinterleave(values: &[f64], width: usize, height: usize, samples: usize) -> RasterResult<Vec<Plane>> {
    let pixels = width * height;
    if values.len() != pixels * samples {
        return Err(RasterError::InvalidLayout(format!(
            "expected {} interleaved samples, got {}",
            pixels * samples,
            values.len()
        )));
    }

    let mut bands = vec![Vec::with_capacity(pixels); samples];
    for pixel in values.chunks_exact(samples) {
        for (band, &v) in bands.iter_mut().zip(pixel) {
            band.push(v);
        }
    }
    bands
        .into_iter()
        .map(|values| plane(values, width, height))
        .collect()
}

fn to_f64(result: DecodingResult) -> Vec<f64> {
    match result {
        DecodingResult::U8(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::U16(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::U32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::U64(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::I8(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I16(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::I64(data) => data.into_iter().map(|v| v as f64).collect(),
        DecodingResult::F32(data) => data.into_iter().map(f64::from).collect(),
        DecodingResult::F64(data) => data,
    }
}
