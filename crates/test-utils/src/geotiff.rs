//! GeoTIFF writer for building imagery fixtures.
//!
//! Writes 16-bit bands in one of three layouts:
//!
//! - pixel-interleaved RGB-style (1, 3, 4 or 5 bands; 5 is RGB plus two
//!   extra samples)
//! - pixel-interleaved MinIsBlack multiband (4 or 5 bands), the layout GDAL
//!   and rasterio write for analytic products
//! - one single-sample page per band

use std::io::{Cursor, Seek, Write};
use std::path::Path;

use tiff::encoder::colortype::{ColorType, Gray16, RGB16, RGBA16};
use tiff::encoder::compression::{Compression, Deflate, Lzw, Uncompressed};
use tiff::encoder::TiffEncoder;
use tiff::tags::{PhotometricInterpretation, SampleFormat, Tag};
use tiff::TiffResult;

const UINT4: &[SampleFormat] = &[
    SampleFormat::Uint,
    SampleFormat::Uint,
    SampleFormat::Uint,
    SampleFormat::Uint,
];
const UINT5: &[SampleFormat] = &[
    SampleFormat::Uint,
    SampleFormat::Uint,
    SampleFormat::Uint,
    SampleFormat::Uint,
    SampleFormat::Uint,
];

/// Four 16-bit bands, MinIsBlack.
pub struct Multiband16x4;
impl ColorType for Multiband16x4 {
    type Inner = u16;
    const TIFF_VALUE: PhotometricInterpretation = PhotometricInterpretation::BlackIsZero;
    const BITS_PER_SAMPLE: &'static [u16] = &[16, 16, 16, 16];
    const SAMPLE_FORMAT: &'static [SampleFormat] = UINT4;
}

/// Five 16-bit bands, MinIsBlack.
pub struct Multiband16x5;
impl ColorType for Multiband16x5 {
    type Inner = u16;
    const TIFF_VALUE: PhotometricInterpretation = PhotometricInterpretation::BlackIsZero;
    const BITS_PER_SAMPLE: &'static [u16] = &[16, 16, 16, 16, 16];
    const SAMPLE_FORMAT: &'static [SampleFormat] = UINT5;
}

/// RGB plus two extra 16-bit samples.
pub struct Rgb16Extra2;
impl ColorType for Rgb16Extra2 {
    type Inner = u16;
    const TIFF_VALUE: PhotometricInterpretation = PhotometricInterpretation::RGB;
    const BITS_PER_SAMPLE: &'static [u16] = &[16, 16, 16, 16, 16];
    const SAMPLE_FORMAT: &'static [SampleFormat] = UINT5;
}

/// Strip compression for fixtures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureCompression {
    None,
    Lzw,
    Deflate,
}

/// Where the image sits on the ground.
#[derive(Debug, Clone, Copy)]
pub struct Georeference {
    pub origin_x: f64,
    pub origin_y: f64,
    pub pixel_size: f64,
    pub epsg: u16,
}

impl Georeference {
    /// UTM 43N scene from [`crate::fixtures::georef`].
    pub fn utm_43n() -> Self {
        use crate::fixtures::georef::*;
        Self {
            origin_x: ORIGIN_X,
            origin_y: ORIGIN_Y,
            pixel_size: PIXEL_SIZE,
            epsg: UTM_43N_EPSG,
        }
    }

    fn is_projected(&self) -> bool {
        self.epsg != 4326
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Layout {
    Interleaved,
    Multiband,
    Pages,
}

/// Builder for synthetic GeoTIFF files.
///
/// ```ignore
/// let bytes = GeoTiffBuilder::new(8, 8)
///     .bands(create_uniform_bands(8, 8, VEGETATION))
///     .georeference(Georeference::utm_43n())
///     .to_bytes()?;
/// ```
#[derive(Debug, Clone)]
pub struct GeoTiffBuilder {
    width: u32,
    height: u32,
    bands: Vec<Vec<u16>>,
    georeference: Option<Georeference>,
    layout: Layout,
    overview: Option<(u32, u32)>,
    compression: FixtureCompression,
    rows_per_strip: Option<u32>,
}

impl GeoTiffBuilder {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            bands: Vec::new(),
            georeference: None,
            layout: Layout::Interleaved,
            overview: None,
            compression: FixtureCompression::None,
            rows_per_strip: None,
        }
    }

    pub fn bands(mut self, bands: Vec<Vec<u16>>) -> Self {
        self.bands = bands;
        self
    }

    pub fn georeference(mut self, georeference: Georeference) -> Self {
        self.georeference = Some(georeference);
        self
    }

    /// Write one single-sample page per band instead of interleaving.
    pub fn paged(mut self) -> Self {
        self.layout = Layout::Pages;
        self
    }

    /// Write all bands interleaved in one MinIsBlack image.
    pub fn multiband(mut self) -> Self {
        self.layout = Layout::Multiband;
        self
    }

    pub fn compression(mut self, compression: FixtureCompression) -> Self {
        self.compression = compression;
        self
    }

    /// Split each image into strips of `rows` rows.
    pub fn rows_per_strip(mut self, rows: u32) -> Self {
        self.rows_per_strip = Some(rows);
        self
    }

    /// Append a smaller page after the bands, like an embedded overview.
    pub fn with_overview(mut self, width: u32, height: u32) -> Self {
        self.overview = Some((width, height));
        self
    }

    pub fn write(&self, path: impl AsRef<Path>) -> TiffResult<()> {
        let file = std::fs::File::create(path)?;
        self.encode(file)
    }

    pub fn to_bytes(&self) -> TiffResult<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::new());
        self.encode(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    fn encode<W: Write + Seek>(&self, writer: W) -> TiffResult<()> {
        let pixels = (self.width * self.height) as usize;
        for (i, band) in self.bands.iter().enumerate() {
            assert_eq!(band.len(), pixels, "band {} has the wrong length", i + 1);
        }

        let mut encoder = TiffEncoder::new(writer)?;
        match self.layout {
            Layout::Interleaved => {
                let data = interleave(&self.bands, pixels);
                match self.bands.len() {
                    1 => self.write_image::<Gray16, _>(&mut encoder, &data)?,
                    3 => self.write_image::<RGB16, _>(&mut encoder, &data)?,
                    4 => self.write_image::<RGBA16, _>(&mut encoder, &data)?,
                    5 => self.write_image::<Rgb16Extra2, _>(&mut encoder, &data)?,
                    n => panic!("{} bands cannot be interleaved; use paged()", n),
                }
            }
            Layout::Multiband => {
                let data = interleave(&self.bands, pixels);
                match self.bands.len() {
                    4 => self.write_image::<Multiband16x4, _>(&mut encoder, &data)?,
                    5 => self.write_image::<Multiband16x5, _>(&mut encoder, &data)?,
                    n => panic!("no multiband color type for {} bands", n),
                }
            }
            Layout::Pages => {
                for band in &self.bands {
                    self.write_image::<Gray16, _>(&mut encoder, band)?;
                }
            }
        }

        if let Some((w, h)) = self.overview {
            let data = vec![0u16; (w * h) as usize];
            encoder.write_image::<Gray16>(w, h, &data)?;
        }
        Ok(())
    }

    fn write_image<C, W>(&self, encoder: &mut TiffEncoder<W>, data: &[u16]) -> TiffResult<()>
    where
        C: ColorType<Inner = u16>,
        W: Write + Seek,
    {
        match self.compression {
            FixtureCompression::None => self.write_compressed::<C, W, _>(encoder, data, Uncompressed),
            FixtureCompression::Lzw => self.write_compressed::<C, W, _>(encoder, data, Lzw),
            FixtureCompression::Deflate => {
                self.write_compressed::<C, W, _>(encoder, data, Deflate::default())
            }
        }
    }

    fn write_compressed<C, W, D>(
        &self,
        encoder: &mut TiffEncoder<W>,
        data: &[u16],
        compression: D,
    ) -> TiffResult<()>
    where
        C: ColorType<Inner = u16>,
        W: Write + Seek,
        D: Compression,
    {
        let mut image =
            encoder.new_image_with_compression::<C, D>(self.width, self.height, compression)?;
        if let Some(rows) = self.rows_per_strip {
            image.rows_per_strip(rows)?;
        }
        if let Some(georef) = self.georeference {
            let scale = [georef.pixel_size, georef.pixel_size, 0.0];
            image
                .encoder()
                .write_tag(Tag::ModelPixelScaleTag, &scale[..])?;

            let tiepoint = [0.0, 0.0, 0.0, georef.origin_x, georef.origin_y, 0.0];
            image
                .encoder()
                .write_tag(Tag::ModelTiepointTag, &tiepoint[..])?;

            image
                .encoder()
                .write_tag(Tag::GeoKeyDirectoryTag, &geokeys(&georef)[..])?;
        }
        image.write_data(data)
    }
}

/// GeoKeyDirectory with the model type and one CRS key.
fn geokeys(georef: &Georeference) -> [u16; 12] {
    let (model_type, crs_key) = if georef.is_projected() {
        (1, 3072)
    } else {
        (2, 2048)
    };
    [
        1, 1, 0, 2, // header, two keys
        1024, 0, 1, model_type, // GTModelTypeGeoKey
        crs_key, 0, 1, georef.epsg,
    ]
}

/// `[[b0...], [b1...]]` to `[b0 b1 b0 b1 ...]`
fn interleave(bands: &[Vec<u16>], pixels: usize) -> Vec<u16> {
    let mut data = Vec::with_capacity(pixels * bands.len());
    for i in 0..pixels {
        for band in bands {
            data.push(band[i]);
        }
    }
    data
}
