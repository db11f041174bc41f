//! GeoTIFF reading/writing on top of the `tiff` crate
//!
//! Georeferencing comes from the ModelPixelScale + ModelTiepoint pair, the
//! CRS from the EPSG code in the GeoKeyDirectory, and the nodata sentinel
//! from the GDAL_NODATA ASCII tag. Anything richer (rotated model
//! transforms, user-defined CRSs) is read as "absent" rather than guessed.

use crate::crs::CRS;
use crate::error::{Error, Result};
use crate::raster::{GeoTransform, Raster, RasterElement};
use num_traits::NumCast;
use std::fs::File;
use std::io::{BufReader, BufWriter, Cursor, Read, Seek, Write};
use std::path::Path;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::Gray32Float;
use tiff::encoder::TiffEncoder;
use tiff::tags::Tag;
use tracing::{debug, warn};

const KEY_MODEL_TYPE: u32 = 1024;
const KEY_RASTER_TYPE: u32 = 1025;
const KEY_GEOGRAPHIC_TYPE: u32 = 2048;
const KEY_PROJECTED_CS_TYPE: u32 = 3072;
const MODEL_TYPE_PROJECTED: u32 = 1;
const MODEL_TYPE_GEOGRAPHIC: u32 = 2;
const RASTER_PIXEL_IS_AREA: u16 = 1;
const USER_DEFINED: u32 = 32767;

/// Options for writing GeoTIFF files
#[derive(Debug, Clone, Default)]
pub struct GeoTiffOptions {
    /// Override the nodata sentinel written to GDAL_NODATA
    pub nodata: Option<f64>,
}

/// Read one band of a GeoTIFF file.
///
/// `band` is 1-based and defaults to the first band.
pub fn read_geotiff<T, P>(path: P, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let file = File::open(path)?;
    debug!(path = %path.display(), "reading GeoTIFF");
    decode_geotiff(BufReader::new(file), band)
}

/// Read one band of a GeoTIFF held in memory.
pub fn read_geotiff_from_buffer<T>(data: &[u8], band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
{
    decode_geotiff(Cursor::new(data), band)
}

fn tiff_err(context: &'static str) -> impl Fn(tiff::TiffError) -> Error {
    move |e| Error::Other(format!("{context}: {e}"))
}

fn decode_geotiff<T, R>(reader: R, band: Option<usize>) -> Result<Raster<T>>
where
    T: RasterElement,
    R: Read + Seek,
{
    let mut decoder = Decoder::new(reader).map_err(tiff_err("TIFF decode error"))?;

    let (width, height) = decoder
        .dimensions()
        .map_err(tiff_err("Cannot read dimensions"))?;
    let rows = height as usize;
    let cols = width as usize;

    let samples = decoder
        .get_tag_u32(Tag::SamplesPerPixel)
        .map(|s| s as usize)
        .unwrap_or(1);
    if samples == 0 || rows == 0 || cols == 0 {
        return Err(Error::ZeroBandRaster);
    }

    let band = band.unwrap_or(1);
    if band == 0 || band > samples {
        return Err(Error::InvalidParameter {
            name: "band",
            value: band.to_string(),
            reason: format!("raster has {samples} band(s), bands are numbered from 1"),
        });
    }
    let offset = band - 1;

    let transform = read_geotransform(&mut decoder);
    let crs = read_crs(&mut decoder);
    let nodata = read_nodata::<T, R>(&mut decoder);

    let image = decoder
        .read_image()
        .map_err(tiff_err("Cannot read image data"))?;

    let data: Vec<T> = match image {
        DecodingResult::F32(buf) => select_band(&buf, samples, offset),
        DecodingResult::F64(buf) => select_band(&buf, samples, offset),
        DecodingResult::U8(buf) => select_band(&buf, samples, offset),
        DecodingResult::U16(buf) => select_band(&buf, samples, offset),
        DecodingResult::U32(buf) => select_band(&buf, samples, offset),
        DecodingResult::U64(buf) => select_band(&buf, samples, offset),
        DecodingResult::I8(buf) => select_band(&buf, samples, offset),
        DecodingResult::I16(buf) => select_band(&buf, samples, offset),
        DecodingResult::I32(buf) => select_band(&buf, samples, offset),
        DecodingResult::I64(buf) => select_band(&buf, samples, offset),
        #[allow(unreachable_patterns)]
        _ => {
            return Err(Error::UnsupportedDataType(
                "unsupported TIFF sample format".to_string(),
            ))
        }
    };

    if data.len() != rows * cols {
        return Err(Error::InvalidDimensions {
            width: cols,
            height: rows,
        });
    }

    let mut raster = Raster::from_vec(data, rows, cols)?.with_crs(crs).with_nodata(nodata);
    match transform {
        Some(gt) => raster.set_transform(gt),
        None => warn!("GeoTIFF has no pixel scale/tiepoint tags, using a unit grid"),
    }
    Ok(raster)
}

/// Pick every `samples`-th value starting at `offset` from interleaved data.
fn select_band<S, T>(buf: &[S], samples: usize, offset: usize) -> Vec<T>
where
    S: Copy + NumCast,
    T: RasterElement,
{
    buf.iter()
        .skip(offset)
        .step_by(samples)
        .map(|&v| num_traits::cast(v).unwrap_or_else(T::default_nodata))
        .collect()
}

fn read_geotransform<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<GeoTransform> {
    let scale = decoder.get_tag_f64_vec(Tag::ModelPixelScaleTag).ok()?;
    let tiepoint = decoder.get_tag_f64_vec(Tag::ModelTiepointTag).ok()?;

    if scale.len() < 2 || tiepoint.len() < 6 {
        return None;
    }

    // tiepoint: [I, J, K, X, Y, Z], scale: [ScaleX, ScaleY, ScaleZ]
    let origin_x = tiepoint[3] - tiepoint[0] * scale[0];
    let origin_y = tiepoint[4] + tiepoint[1] * scale[1];
    Some(GeoTransform::new(origin_x, origin_y, scale[0], -scale[1]))
}

fn read_crs<R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<CRS> {
    let keys = decoder.get_tag_u32_vec(Tag::GeoKeyDirectoryTag).ok()?;
    crs_from_geokeys(&keys)
}

/// Short value of one GeoKey, if present and stored inline.
fn geokey(keys: &[u32], wanted: u32) -> Option<u32> {
    keys.get(4..)?
        .chunks_exact(4)
        .find(|e| e[0] == wanted && e[1] == 0)
        .map(|e| e[3])
}

/// CRS from a GeoKeyDirectory, following the declared model type.
///
/// A projected model with a user-defined PCS has no usable CRS: its
/// GeographicType only names the base datum. A geographic model without a
/// usable code is read as WGS84 so its degrees are never taken for metres.
fn crs_from_geokeys(keys: &[u32]) -> Option<CRS> {
    let code = |key: u32| geokey(keys, key).filter(|c| *c != 0 && *c != USER_DEFINED);

    match geokey(keys, KEY_MODEL_TYPE) {
        Some(MODEL_TYPE_PROJECTED) => {
            code(KEY_PROJECTED_CS_TYPE).map(|c| CRS::from_epsg(c).with_geographic(false))
        }
        Some(MODEL_TYPE_GEOGRAPHIC) => match code(KEY_GEOGRAPHIC_TYPE) {
            Some(c) => Some(CRS::from_epsg(c).with_geographic(true)),
            None => {
                warn!("geographic GeoTIFF without a known datum, reading it as WGS84");
                Some(CRS::wgs84().with_geographic(true))
            }
        },
        _ if geokey(keys, KEY_PROJECTED_CS_TYPE) == Some(USER_DEFINED) => None,
        _ => code(KEY_PROJECTED_CS_TYPE)
            .or_else(|| code(KEY_GEOGRAPHIC_TYPE))
            .map(CRS::from_epsg),
    }
}

fn read_nodata<T: RasterElement, R: Read + Seek>(decoder: &mut Decoder<R>) -> Option<T> {
    let text = decoder.get_tag_ascii_string(Tag::GdalNodata).ok()?;
    let text = text.trim_matches(|c: char| c.is_whitespace() || c == '\0');
    let parsed = match text.to_ascii_lowercase().as_str() {
        "nan" => Some(f64::NAN),
        other => other.parse::<f64>().ok(),
    };
    match parsed.and_then(T::from_f64) {
        Some(v) => Some(v),
        None => {
            warn!(nodata = text, cell_type = T::TYPE_NAME, "ignoring unusable GDAL_NODATA tag");
            None
        }
    }
}

/// Write a raster as a single-band Float32 GeoTIFF file.
pub fn write_geotiff<T, P>(raster: &Raster<T>, path: P, options: Option<GeoTiffOptions>) -> Result<()>
where
    T: RasterElement,
    P: AsRef<Path>,
{
    let file = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(file);
    encode_geotiff(raster, &mut writer, options.unwrap_or_default())?;
    writer.flush()?;
    Ok(())
}

/// Write a raster to an in-memory GeoTIFF buffer.
pub fn write_geotiff_to_buffer<T>(raster: &Raster<T>, options: Option<GeoTiffOptions>) -> Result<Vec<u8>>
where
    T: RasterElement,
{
    let mut buf = Vec::new();
    encode_geotiff(raster, Cursor::new(&mut buf), options.unwrap_or_default())?;
    Ok(buf)
}

fn encode_geotiff<T, W>(raster: &Raster<T>, writer: W, options: GeoTiffOptions) -> Result<()>
where
    T: RasterElement,
    W: Write + Seek,
{
    let mut encoder = TiffEncoder::new(writer).map_err(tiff_err("TIFF encoder error"))?;

    let (rows, cols) = raster.shape();
    let data: Vec<f32> = raster
        .data()
        .iter()
        .map(|&v| num_traits::cast(v).unwrap_or(f32::NAN))
        .collect();

    let mut image = encoder
        .new_image::<Gray32Float>(cols as u32, rows as u32)
        .map_err(tiff_err("Cannot create TIFF image"))?;

    let gt = raster.transform();
    let scale = [gt.pixel_width, gt.pixel_height.abs(), 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &scale[..])
        .map_err(tiff_err("Cannot write scale tag"))?;

    let tiepoint = [0.0, 0.0, 0.0, gt.origin_x, gt.origin_y, 0.0];
    image
        .encoder()
        .write_tag(Tag::ModelTiepointTag, &tiepoint[..])
        .map_err(tiff_err("Cannot write tiepoint tag"))?;

    let geokeys = geokeys_for(raster.crs());
    image
        .encoder()
        .write_tag(Tag::GeoKeyDirectoryTag, geokeys.as_slice())
        .map_err(tiff_err("Cannot write geokey tag"))?;

    let nodata = options
        .nodata
        .or_else(|| raster.nodata().and_then(RasterElement::to_f64));
    if let Some(nd) = nodata {
        let text = format!("{nd}");
        image
            .encoder()
            .write_tag(Tag::GdalNodata, text.as_str())
            .map_err(tiff_err("Cannot write nodata tag"))?;
    }

    image
        .write_data(&data)
        .map_err(tiff_err("Cannot write image data"))?;

    Ok(())
}

fn geokeys_for(crs: Option<&CRS>) -> Vec<u16> {
    let code = crs
        .and_then(CRS::epsg)
        .and_then(|c| u16::try_from(c).ok());
    let geographic = crs.is_some_and(CRS::is_geographic);
    let model = if geographic {
        MODEL_TYPE_GEOGRAPHIC as u16
    } else {
        MODEL_TYPE_PROJECTED as u16
    };

    let mut entries: Vec<[u16; 4]> = vec![
        [KEY_MODEL_TYPE as u16, 0, 1, model],
        [KEY_RASTER_TYPE as u16, 0, 1, RASTER_PIXEL_IS_AREA],
    ];
    if let Some(code) = code {
        let key = if geographic {
            KEY_GEOGRAPHIC_TYPE
        } else {
            KEY_PROJECTED_CS_TYPE
        };
        entries.push([key as u16, 0, 1, code]);
    }

    let mut keys = vec![1, 1, 0, entries.len() as u16];
    keys.extend(entries.into_iter().flatten());
    keys
}
