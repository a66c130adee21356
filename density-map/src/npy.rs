//! Reading and writing 2D float arrays in the `.npy` format.

use crate::common::*;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

const MAGIC: &[u8] = b"\x93NUMPY";
const ALIGNMENT: usize = 64;

/// Write a `f32` array as a version 1.0 `.npy` file.
pub fn write_npy(path: impl AsRef<Path>, array: &Array2<f32>) -> Result<()> {
    let path = path.as_ref();
    let file = fs::File::create(path)
        .with_context(|| format!("failed to create '{}'", path.display()))?;
    let mut writer = BufWriter::new(file);
    encode_npy(&mut writer, array)?;
    writer.flush()?;
    Ok(())
}

/// Read a `.npy` file holding a `f32` or `f64` matrix.
pub fn read_npy(path: impl AsRef<Path>) -> Result<Array2<f32>> {
    let path = path.as_ref();
    let file =
        fs::File::open(path).with_context(|| format!("failed to open '{}'", path.display()))?;
    decode_npy(&mut BufReader::new(file))
        .with_context(|| format!("failed to decode '{}'", path.display()))
}

pub fn encode_npy<W: Write>(writer: &mut W, array: &Array2<f32>) -> Result<()> {
    let (height, width) = array.dim();
    let mut header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {}), }}",
        height, width
    );

    // magic + version + header length + header + newline
    let unpadded = MAGIC.len() + 2 + 2 + header.len() + 1;
    let padding = (ALIGNMENT - unpadded % ALIGNMENT) % ALIGNMENT;
    header.extend(iter_spaces(padding));
    header.push('\n');

    let header_len = u16::try_from(header.len())
        .map_err(|_| format_err!("npy header is too long"))?;

    writer.write_all(MAGIC)?;
    writer.write_all(&[1, 0])?;
    writer.write_u16::<LittleEndian>(header_len)?;
    writer.write_all(header.as_bytes())?;
    for &value in array.iter() {
        writer.write_f32::<LittleEndian>(value)?;
    }
    Ok(())
}

pub fn decode_npy<R: Read>(reader: &mut R) -> Result<Array2<f32>> {
    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic)?;
    if magic != MAGIC {
        return Err(invalid("bad magic string"));
    }

    let major = reader.read_u8()?;
    let _minor = reader.read_u8()?;
    let header_len = match major {
        1 => reader.read_u16::<LittleEndian>()? as usize,
        2 | 3 => reader.read_u32::<LittleEndian>()? as usize,
        _ => return Err(invalid(format!("unsupported version {}", major))),
    };

    let mut header = vec![0u8; header_len];
    reader.read_exact(&mut header)?;
    let header = String::from_utf8(header).map_err(|_| invalid("header is not valid text"))?;
    let Header {
        descr,
        fortran_order,
        shape,
    } = parse_header(&header)?;

    if fortran_order {
        return Err(invalid("fortran order is not supported"));
    }

    let (height, width) = match shape[..] {
        [h, w] => (h, w),
        [1, h, w] => (h, w),
        _ => return Err(invalid(format!("expect a 2D shape, but get {:?}", shape))),
    };
    let len = height * width;

    let values: Vec<f32> = match descr.as_str() {
        "<f4" => (0..len)
            .map(|_| reader.read_f32::<LittleEndian>())
            .try_collect()?,
        "<f8" => (0..len)
            .map(|_| reader.read_f64::<LittleEndian>().map(|value| value as f32))
            .try_collect()?,
        other => return Err(invalid(format!("unsupported dtype '{}'", other))),
    };

    let array = Array2::from_shape_vec((height, width), values)?;
    Ok(array)
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Header {
    descr: String,
    fortran_order: bool,
    shape: Vec<usize>,
}

/// Parse the Python dict literal of an npy header.
fn parse_header(text: &str) -> Result<Header> {
    let text = text.trim();
    let body = text
        .strip_prefix('{')
        .and_then(|text| text.strip_suffix('}'))
        .ok_or_else(|| invalid("header is not a dict"))?;

    let descr = {
        let rest = value_of(body, "descr")?;
        let rest = rest
            .strip_prefix('\'')
            .ok_or_else(|| invalid("descr is not a string"))?;
        let end = rest
            .find('\'')
            .ok_or_else(|| invalid("unterminated descr"))?;
        rest[..end].to_owned()
    };

    let fortran_order = {
        let rest = value_of(body, "fortran_order")?;
        if rest.starts_with("True") {
            true
        } else if rest.starts_with("False") {
            false
        } else {
            return Err(invalid("fortran_order is not a bool"));
        }
    };

    let shape: Vec<usize> = {
        let rest = value_of(body, "shape")?;
        let rest = rest
            .strip_prefix('(')
            .ok_or_else(|| invalid("shape is not a tuple"))?;
        let end = rest
            .find(')')
            .ok_or_else(|| invalid("unterminated shape"))?;
        rest[..end]
            .split(',')
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| {
                token
                    .parse::<usize>()
                    .map_err(|_| invalid(format!("bad dimension '{}'", token)))
            })
            .try_collect()?
    };

    Ok(Header {
        descr,
        fortran_order,
        shape,
    })
}

fn value_of<'a>(body: &'a str, key: &str) -> Result<&'a str> {
    let pattern = format!("'{}':", key);
    let start = body
        .find(&pattern)
        .ok_or_else(|| invalid(format!("missing key '{}'", key)))?;
    Ok(body[start + pattern.len()..].trim_start())
}

fn iter_spaces(count: usize) -> impl Iterator<Item = char> {
    std::iter::repeat(' ').take(count)
}

fn invalid(reason: impl Into<String>) -> Error {
    DensityError::InvalidArray {
        reason: reason.into(),
    }
    .into()
}
