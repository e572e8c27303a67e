/// Radiance RGBE (.hdr) decoder for environment maps
use nom::{
    branch::alt,
    bytes::complete::{tag, take_till},
    character::complete::{char, digit1, line_ending, space1},
    combinator::{map_res, opt},
    sequence::{terminated, tuple},
    IResult,
};

use crate::error::HdrError;

const MIN_RLE_WIDTH: usize = 8;
const MAX_RLE_WIDTH: usize = 0x7fff;
/// Largest side accepted, well above any environment map in use
const MAX_DIMENSION: usize = 32_768;

/// Decoded image in linear RGB, rows top to bottom
#[derive(Debug, Clone, PartialEq)]
pub struct HdrImage {
    pub width: usize,
    pub height: usize,
    pub pixels: Vec<[f32; 3]>,
}

impl HdrImage {
    pub fn pixel(&self, x: usize, y: usize) -> Option<[f32; 3]> {
        if x >= self.width {
            return None;
        }
        self.pixels.get(y * self.width + x).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Header {
    format: Option<String>,
    width: usize,
    height: usize,
    /// Rows stored bottom to top
    flipped: bool,
}

fn line(input: &[u8]) -> IResult<&[u8], &[u8]> {
    terminated(take_till(|b| b == b'\n' || b == b'\r'), line_ending)(input)
}

fn magic(input: &[u8]) -> IResult<&[u8], &[u8]> {
    terminated(alt((tag("#?RADIANCE"), tag("#?RGBE"))), line)(input)
}

fn dimension(input: &[u8]) -> IResult<&[u8], usize> {
    map_res(digit1, |digits: &[u8]| {
        std::str::from_utf8(digits)
            .map_err(|_| ())
            .and_then(|s| s.parse::<usize>().map_err(|_| ()))
    })(input)
}

/// `-Y <height> +X <width>`, optionally `+Y` for bottom-up storage
fn resolution(input: &[u8]) -> IResult<&[u8], (bool, usize, usize)> {
    let (input, (sign, _, _, height, _, _, _, width, _)) = tuple((
        alt((char('-'), char('+'))),
        char('Y'),
        space1,
        dimension,
        space1,
        tag("+X"),
        space1,
        dimension,
        opt(line_ending),
    ))(input)?;
    Ok((input, (sign == '+', height, width)))
}

fn parse_header(input: &[u8]) -> Result<(&[u8], Header), HdrError> {
    let (mut input, _) = magic(input).map_err(|_| HdrError::BadMagic)?;

    let mut format = None;
    loop {
        let (rest, text) = line(input)
            .map_err(|_| HdrError::Header("unterminated header".into()))?;
        input = rest;
        if text.is_empty() {
            break;
        }
        if let Some(value) = text.strip_prefix(b"FORMAT=") {
            format = Some(String::from_utf8_lossy(value).into_owned());
        }
        // Comments and other variables (EXPOSURE, GAMMA, ...) are ignored
    }

    let (input, (flipped, height, width)) = resolution(input)
        .map_err(|_| HdrError::Header("bad resolution line".into()))?;

    if width == 0 || height == 0 {
        return Err(HdrError::Header(format!("empty image {width}x{height}")));
    }
    if width > MAX_DIMENSION || height > MAX_DIMENSION {
        return Err(HdrError::Header(format!("image too large {width}x{height}")));
    }

    Ok((
        input,
        Header {
            format,
            width,
            height,
            flipped,
        },
    ))
}

/// Decode a complete `.hdr` file
pub fn decode(data: &[u8]) -> Result<HdrImage, HdrError> {
    let (mut body, header) = parse_header(data)?;

    if let Some(format) = &header.format {
        if format != "32-bit_rle_rgbe" {
            return Err(HdrError::UnsupportedFormat(format.clone()));
        }
    }

    // Every scanline takes at least one 4-byte word, so the body bounds the height
    let width = header.width;
    let pixel_count = width
        .checked_mul(header.height)
        .filter(|_| header.height.saturating_mul(4) <= body.len())
        .ok_or_else(|| {
            HdrError::Header(format!(
                "{width}x{} image does not fit in {} bytes",
                header.height,
                body.len()
            ))
        })?;
    let mut pixels = Vec::with_capacity(pixel_count);
    let mut scanline = vec![[0u8; 4]; width];

    for row in 0..header.height {
        body = read_scanline(body, &mut scanline, row)?;
        pixels.extend(scanline.iter().map(rgbe_to_rgb));
    }

    if header.flipped {
        let rows: Vec<&[[f32; 3]]> = pixels.chunks(width).rev().collect();
        pixels = rows.concat();
    }

    tracing::debug!(width, height = header.height, "decoded HDR image");

    Ok(HdrImage {
        width,
        height: header.height,
        pixels,
    })
}

fn read_scanline<'a>(data: &'a [u8], out: &mut [[u8; 4]], row: usize) -> Result<&'a [u8], HdrError> {
    let width = out.len();
    let prefix = data.get(..4).ok_or(HdrError::Truncated(row))?;

    let run_length = (MIN_RLE_WIDTH..=MAX_RLE_WIDTH).contains(&width)
        && prefix[0] == 2
        && prefix[1] == 2
        && prefix[2] & 0x80 == 0;
    if !run_length {
        return read_flat_scanline(data, out, row);
    }

    if ((prefix[2] as usize) << 8 | prefix[3] as usize) != width {
        return Err(HdrError::BadScanline(row));
    }

    // Each channel is run-length encoded separately
    let mut data = &data[4..];
    for channel in 0..4 {
        let mut x = 0;
        while x < width {
            let (&count, rest) = data.split_first().ok_or(HdrError::Truncated(row))?;
            data = rest;
            if count > 128 {
                let run = (count - 128) as usize;
                let (&value, rest) = data.split_first().ok_or(HdrError::Truncated(row))?;
                data = rest;
                if x + run > width {
                    return Err(HdrError::BadScanline(row));
                }
                for pixel in &mut out[x..x + run] {
                    pixel[channel] = value;
                }
                x += run;
            } else {
                let count = count as usize;
                if count == 0 || x + count > width {
                    return Err(HdrError::BadScanline(row));
                }
                let literal = data.get(..count).ok_or(HdrError::Truncated(row))?;
                for (pixel, &value) in out[x..x + count].iter_mut().zip(literal) {
                    pixel[channel] = value;
                }
                data = &data[count..];
                x += count;
            }
        }
    }

    Ok(data)
}

/// Uncompressed or old-style (1,1,1,n repeat) scanline
fn read_flat_scanline<'a>(mut data: &'a [u8], out: &mut [[u8; 4]], row: usize) -> Result<&'a [u8], HdrError> {
    let width = out.len();
    let mut x = 0;
    let mut shift = 0;

    while x < width {
        let bytes = data.get(..4).ok_or(HdrError::Truncated(row))?;
        data = &data[4..];

        if bytes[0] == 1 && bytes[1] == 1 && bytes[2] == 1 {
            let previous = *out.get(x.wrapping_sub(1)).ok_or(HdrError::BadScanline(row))?;
            if shift > 16 {
                return Err(HdrError::BadScanline(row));
            }
            let repeat = (bytes[3] as usize) << shift;
            if x + repeat > width {
                return Err(HdrError::BadScanline(row));
            }
            out[x..x + repeat].fill(previous);
            x += repeat;
            shift += 8;
        } else {
            out[x] = [bytes[0], bytes[1], bytes[2], bytes[3]];
            x += 1;
            shift = 0;
        }
    }

    Ok(data)
}

fn rgbe_to_rgb(rgbe: &[u8; 4]) -> [f32; 3] {
    if rgbe[3] == 0 {
        return [0.0; 3];
    }
    let scale = 2f32.powi(rgbe[3] as i32 - (128 + 8));
    [
        (rgbe[0] as f32 + 0.5) * scale,
        (rgbe[1] as f32 + 0.5) * scale,
        (rgbe[2] as f32 + 0.5) * scale,
    ]
}
