// MATLAB level-5 MAT-file reader
//
// Layout (byte order given by the endian indicator in the header):
//   header:   text(116) | subsys offset(8) | version(u16 = 0x0100) | endian("IM" or "MI")
//   elements: type(u32) | nbytes(u32) | data(nbytes) | padding to 8 bytes
//
// A "small" element packs nbytes into the upper 16 bits of the type word
// and carries up to 4 data bytes inside the tag itself. miCOMPRESSED
// elements hold a zlib stream that inflates to one ordinary element.
//
// miMATRIX sub-elements: array flags | dimensions | name | real part | [imag part]
// Numeric data is stored column-major and may use a narrower storage type
// than the declared class (e.g. a double array stored as miUINT8).

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use std::io::{Read, Write};
use tracing::debug;

use crate::errors::{FetchError, FetchResult};

const HEADER_LEN: usize = 128;
const TAG_LEN: usize = 8;

const MI_INT8: u32 = 1;
const MI_UINT8: u32 = 2;
const MI_INT16: u32 = 3;
const MI_UINT16: u32 = 4;
const MI_INT32: u32 = 5;
const MI_UINT32: u32 = 6;
const MI_SINGLE: u32 = 7;
const MI_DOUBLE: u32 = 9;
const MI_INT64: u32 = 12;
const MI_UINT64: u32 = 13;
const MI_MATRIX: u32 = 14;
const MI_COMPRESSED: u32 = 15;

const FLAG_COMPLEX: u32 = 0x0800;

/// Array class declared in the array flags sub-element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatClass {
    Double,
    Single,
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
}

impl MatClass {
    fn from_code(code: u32) -> Option<Self> {
        Some(match code {
            6 => Self::Double,
            7 => Self::Single,
            8 => Self::Int8,
            9 => Self::UInt8,
            10 => Self::Int16,
            11 => Self::UInt16,
            12 => Self::Int32,
            13 => Self::UInt32,
            14 => Self::Int64,
            15 => Self::UInt64,
            _ => return None,
        })
    }
}

/// A numeric variable read from a MAT file.
#[derive(Debug, Clone, PartialEq)]
pub struct MatArray {
    pub name: String,
    pub class: MatClass,
    pub dims: Vec<usize>,
    pub complex: bool,
    /// Real part, column-major.
    pub data: Vec<f64>,
}

/// The numeric variables of a MAT file, in file order.
#[derive(Debug, Clone, Default)]
pub struct MatFile {
    arrays: Vec<MatArray>,
}

impl MatFile {
    /// Parse a complete MAT v5 file.
    ///
    /// Non-numeric variables (cells, structs, char, sparse) are skipped.
    pub fn parse(bytes: &[u8]) -> FetchResult<Self> {
        let big_endian = parse_header(bytes)?;
        let mut reader = ElementReader::new(&bytes[HEADER_LEN..], big_endian);
        let mut arrays = Vec::new();

        while !reader.is_empty() {
            let (ty, body) = reader.next_element()?;
            match ty {
                MI_MATRIX => arrays.extend(parse_matrix(body, big_endian)?),
                MI_COMPRESSED => {
                    let inflated = inflate(body)?;
                    let mut inner = ElementReader::new(&inflated, big_endian);
                    while !inner.is_empty() {
                        let (inner_ty, inner_body) = inner.next_element()?;
                        if inner_ty == MI_MATRIX {
                            arrays.extend(parse_matrix(inner_body, big_endian)?);
                        }
                    }
                }
                other => debug!("Skipping top-level MAT element of type {}", other),
            }
        }

        Ok(Self { arrays })
    }

    pub fn arrays(&self) -> &[MatArray] {
        &self.arrays
    }

    pub fn get(&self, name: &str) -> Option<&MatArray> {
        self.arrays.iter().find(|a| a.name == name)
    }

    pub fn into_array(self, name: &str) -> Option<MatArray> {
        self.arrays.into_iter().find(|a| a.name == name)
    }
}

/// Validate the 128-byte header and return whether the file is big-endian.
fn parse_header(bytes: &[u8]) -> FetchResult<bool> {
    if bytes.len() < HEADER_LEN {
        return Err(FetchError::format(format!(
            "MAT file too short: {} bytes, header needs {HEADER_LEN}",
            bytes.len()
        )));
    }
    if bytes.starts_with(b"MATLAB 7.3") {
        return Err(FetchError::format(
            "MAT v7.3 (HDF5) files are not supported",
        ));
    }
    let big_endian = match &bytes[126..128] {
        b"IM" => false,
        b"MI" => true,
        other => {
            return Err(FetchError::format(format!(
                "not a MAT v5 file: endian indicator {other:?}"
            )));
        }
    };
    let version = read_u16(&bytes[124..126], big_endian);
    if version != 0x0100 {
        return Err(FetchError::format(format!(
            "unsupported MAT version {version:#06x}"
        )));
    }
    Ok(big_endian)
}

struct ElementReader<'a> {
    data: &'a [u8],
    pos: usize,
    big_endian: bool,
}

impl<'a> ElementReader<'a> {
    fn new(data: &'a [u8], big_endian: bool) -> Self {
        Self {
            data,
            pos: 0,
            big_endian,
        }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    /// Read one tagged element and return `(type, body)`.
    fn next_element(&mut self) -> FetchResult<(u32, &'a [u8])> {
        if self.pos + TAG_LEN > self.data.len() {
            // Trailing bytes too short for a tag are alignment slack.
            if self.pos + 4 > self.data.len() {
                self.pos = self.data.len();
                return Ok((0, &[]));
            }
            // A small element only needs the 8-byte tag as well.
            return Err(FetchError::format(format!(
                "truncated element tag at offset {}",
                self.pos
            )));
        }

        let word = read_u32(&self.data[self.pos..], self.big_endian);
        let small_len = word >> 16;
        if small_len != 0 {
            let ty = word & 0xFFFF;
            let len = small_len as usize;
            if len > 4 {
                return Err(FetchError::format(format!(
                    "small element claims {len} bytes at offset {}",
                    self.pos
                )));
            }
            let start = self.pos + 4;
            self.pos += TAG_LEN;
            return Ok((ty, &self.data[start..start + len]));
        }

        let ty = word;
        let len = read_u32(&self.data[self.pos + 4..], self.big_endian) as usize;
        let start = self.pos + TAG_LEN;
        let end = start
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| {
                FetchError::format(format!(
                    "element of type {ty} at offset {} claims {len} bytes, only {} available",
                    self.pos,
                    self.data.len().saturating_sub(start)
                ))
            })?;

        self.pos = if ty == MI_COMPRESSED {
            end
        } else {
            (end + 7) & !7
        };
        Ok((ty, &self.data[start..end]))
    }
}

fn inflate(body: &[u8]) -> FetchResult<Vec<u8>> {
    let mut inflated = Vec::new();
    ZlibDecoder::new(body)
        .read_to_end(&mut inflated)
        .map_err(|e| FetchError::format(format!("failed to inflate compressed element: {e}")))?;
    Ok(inflated)
}

fn parse_matrix(body: &[u8], big_endian: bool) -> FetchResult<Option<MatArray>> {
    if body.is_empty() {
        return Ok(None);
    }
    let mut reader = ElementReader::new(body, big_endian);

    let (flags_ty, flags) = reader.next_element()?;
    if flags_ty != MI_UINT32 || flags.len() != 8 {
        return Err(FetchError::format("matrix is missing its array flags"));
    }
    let flags_word = read_u32(flags, big_endian);
    let class_code = flags_word & 0xFF;
    let complex = flags_word & FLAG_COMPLEX != 0;

    let (dims_ty, dims_raw) = reader.next_element()?;
    if dims_ty != MI_INT32 || dims_raw.is_empty() || dims_raw.len() % 4 != 0 {
        return Err(FetchError::format("matrix is missing its dimensions"));
    }
    let dims = dims_raw
        .chunks_exact(4)
        .map(|c| {
            let d = read_u32(c, big_endian) as i32;
            usize::try_from(d)
                .map_err(|_| FetchError::format(format!("negative dimension {d}")))
        })
        .collect::<FetchResult<Vec<usize>>>()?;

    let (name_ty, name_raw) = reader.next_element()?;
    if name_ty != MI_INT8 {
        return Err(FetchError::format("matrix is missing its name"));
    }
    let name = String::from_utf8_lossy(name_raw).into_owned();

    let Some(class) = MatClass::from_code(class_code) else {
        debug!("Skipping non-numeric MAT variable '{}' (class {})", name, class_code);
        return Ok(None);
    };

    let (data_ty, data_raw) = reader.next_element()?;
    let data = decode_numeric(data_ty, data_raw, big_endian)?;

    let expected = dims
        .iter()
        .try_fold(1usize, |acc, &d| acc.checked_mul(d))
        .ok_or_else(|| FetchError::format(format!("dimensions {dims:?} overflow")))?;
    if data.len() != expected {
        return Err(FetchError::format(format!(
            "variable '{name}' has {} values but dimensions {dims:?} need {expected}",
            data.len()
        )));
    }

    Ok(Some(MatArray {
        name,
        class,
        dims,
        complex,
        data,
    }))
}

macro_rules! decode_as {
    ($bytes:expr, $big:expr, $t:ty) => {{
        const N: usize = std::mem::size_of::<$t>();
        $bytes
            .chunks_exact(N)
            .map(|c| {
                let mut buf = [0u8; N];
                buf.copy_from_slice(c);
                let v = if $big {
                    <$t>::from_be_bytes(buf)
                } else {
                    <$t>::from_le_bytes(buf)
                };
                v as f64
            })
            .collect::<Vec<f64>>()
    }};
}

fn decode_numeric(ty: u32, bytes: &[u8], big_endian: bool) -> FetchResult<Vec<f64>> {
    let width = match ty {
        MI_INT8 | MI_UINT8 => 1,
        MI_INT16 | MI_UINT16 => 2,
        MI_INT32 | MI_UINT32 | MI_SINGLE => 4,
        MI_DOUBLE | MI_INT64 | MI_UINT64 => 8,
        other => {
            return Err(FetchError::format(format!(
                "unsupported numeric storage type {other}"
            )));
        }
    };
    if bytes.len() % width != 0 {
        return Err(FetchError::format(format!(
            "numeric data of {} bytes is not a multiple of {width}",
            bytes.len()
        )));
    }

    Ok(match ty {
        MI_INT8 => decode_as!(bytes, big_endian, i8),
        MI_UINT8 => decode_as!(bytes, big_endian, u8),
        MI_INT16 => decode_as!(bytes, big_endian, i16),
        MI_UINT16 => decode_as!(bytes, big_endian, u16),
        MI_INT32 => decode_as!(bytes, big_endian, i32),
        MI_UINT32 => decode_as!(bytes, big_endian, u32),
        MI_SINGLE => decode_as!(bytes, big_endian, f32),
        MI_INT64 => decode_as!(bytes, big_endian, i64),
        MI_UINT64 => decode_as!(bytes, big_endian, u64),
        _ => decode_as!(bytes, big_endian, f64),
    })
}

fn read_u16(bytes: &[u8], big_endian: bool) -> u16 {
    let buf = [bytes[0], bytes[1]];
    if big_endian {
        u16::from_be_bytes(buf)
    } else {
        u16::from_le_bytes(buf)
    }
}

fn read_u32(bytes: &[u8], big_endian: bool) -> u32 {
    let buf = [bytes[0], bytes[1], bytes[2], bytes[3]];
    if big_endian {
        u32::from_be_bytes(buf)
    } else {
        u32::from_le_bytes(buf)
    }
}

// Builder helpers

/// Writes little-endian MAT v5 files (useful for tests and fixtures).
#[derive(Debug, Default)]
pub struct MatBuilder {
    elements: Vec<Vec<u8>>,
    compress: bool,
}

impl MatBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap every variable in a zlib-compressed element, as MATLAB does by default.
    pub fn compressed(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Add a `uint8` variable; `data` is column-major.
    pub fn add_u8(mut self, name: &str, dims: &[usize], data: &[u8]) -> Self {
        self.elements
            .push(matrix_element(name, 9, dims, MI_UINT8, data.to_vec()));
        self
    }

    /// Add a `double` variable; `data` is column-major.
    pub fn add_f64(mut self, name: &str, dims: &[usize], data: &[f64]) -> Self {
        let raw = data.iter().flat_map(|v| v.to_le_bytes()).collect();
        self.elements
            .push(matrix_element(name, 6, dims, MI_DOUBLE, raw));
        self
    }

    pub fn build(self) -> std::io::Result<Vec<u8>> {
        let mut buf = Vec::new();
        let mut text = b"MATLAB 5.0 MAT-file, written by olivetti-fetch".to_vec();
        text.resize(116, b' ');
        buf.extend_from_slice(&text);
        buf.extend_from_slice(&[0u8; 8]);
        buf.extend_from_slice(&0x0100u16.to_le_bytes());
        buf.extend_from_slice(b"IM");

        for element in self.elements {
            if self.compress {
                let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
                encoder.write_all(&element)?;
                let compressed = encoder.finish()?;
                buf.extend_from_slice(&MI_COMPRESSED.to_le_bytes());
                buf.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
                buf.extend_from_slice(&compressed);
            } else {
                buf.extend_from_slice(&element);
            }
        }
        Ok(buf)
    }
}

fn matrix_element(name: &str, class_code: u32, dims: &[usize], ty: u32, data: Vec<u8>) -> Vec<u8> {
    let mut body = Vec::new();

    let mut flags = Vec::new();
    flags.extend_from_slice(&class_code.to_le_bytes());
    flags.extend_from_slice(&0u32.to_le_bytes());
    push_element(&mut body, MI_UINT32, &flags);

    let dims_raw: Vec<u8> = dims
        .iter()
        .flat_map(|&d| (d as i32).to_le_bytes())
        .collect();
    push_element(&mut body, MI_INT32, &dims_raw);

    let name_raw = name.as_bytes();
    if name_raw.len() <= 4 {
        let word = ((name_raw.len() as u32) << 16) | MI_INT8;
        body.extend_from_slice(&word.to_le_bytes());
        let mut packed = [0u8; 4];
        packed[..name_raw.len()].copy_from_slice(name_raw);
        body.extend_from_slice(&packed);
    } else {
        push_element(&mut body, MI_INT8, name_raw);
    }

    push_element(&mut body, ty, &data);

    let mut element = Vec::new();
    push_element(&mut element, MI_MATRIX, &body);
    element
}

fn push_element(buf: &mut Vec<u8>, ty: u32, data: &[u8]) {
    buf.extend_from_slice(&ty.to_le_bytes());
    buf.extend_from_slice(&(data.len() as u32).to_le_bytes());
    buf.extend_from_slice(data);
    let padded = (buf.len() + 7) & !7;
    buf.resize(padded, 0);
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn header(big_endian: bool) -> Vec<u8> {
        let mut buf = vec![b' '; 116];
        buf.extend_from_slice(&[0u8; 8]);
        if big_endian {
            buf.extend_from_slice(&0x0100u16.to_be_bytes());
            buf.extend_from_slice(b"MI");
        } else {
            buf.extend_from_slice(&0x0100u16.to_le_bytes());
            buf.extend_from_slice(b"IM");
        }
        buf
    }

    #[test]
    fn test_parse_uncompressed_u8_variable() {
        let bytes = MatBuilder::new()
            .add_u8("faces", &[2, 3], &[1, 2, 3, 4, 5, 6])
            .build()
            .unwrap();
        let file = MatFile::parse(&bytes).unwrap();
        let faces = file.get("faces").unwrap();
        assert_eq!(faces.class, MatClass::UInt8);
        assert_eq!(faces.dims, vec![2, 3]);
        assert!(!faces.complex);
        assert_eq!(faces.data, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_parse_compressed_double_variable() {
        let bytes = MatBuilder::new()
            .compressed(true)
            .add_f64("faces", &[1, 3], &[0.5, -1.0, 2.25])
            .build()
            .unwrap();
        let file = MatFile::parse(&bytes).unwrap();
        let faces = file.get("faces").unwrap();
        assert_eq!(faces.class, MatClass::Double);
        assert_eq!(faces.data, vec![0.5, -1.0, 2.25]);
    }

    #[test]
    fn test_small_element_names_and_multiple_variables() {
        let bytes = MatBuilder::new()
            .add_u8("ids", &[1, 2], &[7, 9])
            .add_f64("faces", &[1, 1], &[3.0])
            .build()
            .unwrap();
        let file = MatFile::parse(&bytes).unwrap();
        assert_eq!(file.arrays().len(), 2);
        assert_eq!(file.get("ids").unwrap().data, vec![7.0, 9.0]);
        assert!(file.into_array("faces").is_some());
    }

    #[test]
    fn test_big_endian_header_and_values() {
        let mut buf = header(true);

        let mut body = Vec::new();
        let be_element = |buf: &mut Vec<u8>, ty: u32, data: &[u8]| {
            buf.extend_from_slice(&ty.to_be_bytes());
            buf.extend_from_slice(&(data.len() as u32).to_be_bytes());
            buf.extend_from_slice(data);
            let padded = (buf.len() + 7) & !7;
            buf.resize(padded, 0);
        };
        let mut flags = 9u32.to_be_bytes().to_vec();
        flags.extend_from_slice(&[0u8; 4]);
        be_element(&mut body, MI_UINT32, &flags);
        let dims: Vec<u8> = [1i32, 2].iter().flat_map(|d| d.to_be_bytes()).collect();
        be_element(&mut body, MI_INT32, &dims);
        be_element(&mut body, MI_INT8, b"faces");
        let data: Vec<u8> = [258u16, 3].iter().flat_map(|v| v.to_be_bytes()).collect();
        be_element(&mut body, MI_UINT16, &data);
        be_element(&mut buf, MI_MATRIX, &body);

        let file = MatFile::parse(&buf).unwrap();
        assert_eq!(file.get("faces").unwrap().data, vec![258.0, 3.0]);
    }

    #[test]
    fn test_too_short_is_format_error() {
        let err = MatFile::parse(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, FetchError::Format { .. }));
    }

    #[test]
    fn test_bad_endian_indicator() {
        let mut bytes = MatBuilder::new()
            .add_u8("x", &[1, 1], &[1])
            .build()
            .unwrap();
        bytes[126] = b'X';
        let err = MatFile::parse(&bytes).unwrap_err();
        assert!(err.to_string().contains("endian"));
    }

    #[test]
    fn test_hdf5_mat_is_rejected() {
        let mut bytes = b"MATLAB 7.3 MAT-file".to_vec();
        bytes.resize(HEADER_LEN, b' ');
        let err = MatFile::parse(&bytes).unwrap_err();
        assert!(err.to_string().contains("7.3"));
    }

    #[test]
    fn test_truncated_element_is_format_error() {
        let bytes = MatBuilder::new()
            .add_u8("faces", &[4, 4], &[0u8; 16])
            .build()
            .unwrap();
        let err = MatFile::parse(&bytes[..bytes.len() - 20]).unwrap_err();
        assert!(matches!(err, FetchError::Format { .. }));
    }

    #[test]
    fn test_dimension_mismatch_is_format_error() {
        let bytes = MatBuilder::new()
            .add_u8("faces", &[4, 4], &[0u8; 15])
            .build()
            .unwrap();
        let err = MatFile::parse(&bytes).unwrap_err();
        assert!(err.to_string().contains("need 16"));
    }

    #[test]
    fn test_corrupt_compressed_stream() {
        let mut bytes = MatBuilder::new()
            .compressed(true)
            .add_u8("faces", &[2, 2], &[1, 2, 3, 4])
            .build()
            .unwrap();
        for b in bytes.iter_mut().skip(HEADER_LEN + TAG_LEN) {
            *b = 0xFF;
        }
        let err = MatFile::parse(&bytes).unwrap_err();
        assert!(matches!(err, FetchError::Format { .. }));
    }

    #[test]
    fn test_overflowing_dimensions_are_format_error() {
        let bytes = MatBuilder::new()
            .add_u8("faces", &[65536; 4], &[1, 2])
            .build()
            .unwrap();
        let err = MatFile::parse(&bytes).unwrap_err();
        assert!(matches!(err, FetchError::Format { .. }));
        assert!(err.to_string().contains("overflow"));
    }

    #[test]
    fn test_compressed_element_claiming_too_many_bytes() {
        let mut bytes = MatBuilder::new()
            .compressed(true)
            .add_u8("faces", &[2, 2], &[1, 2, 3, 4])
            .build()
            .unwrap();
        let size_at = HEADER_LEN + 4;
        let claimed = read_u32(&bytes[size_at..], false) + 64;
        bytes[size_at..size_at + 4].copy_from_slice(&claimed.to_le_bytes());
        let err = MatFile::parse(&bytes).unwrap_err();
        assert!(err.to_string().contains("claims"));
    }

    #[test]
    fn test_compressed_element_claiming_too_few_bytes() {
        let mut bytes = MatBuilder::new()
            .compressed(true)
            .add_u8("faces", &[2, 2], &[1, 2, 3, 4])
            .build()
            .unwrap();
        let size_at = HEADER_LEN + 4;
        let claimed = read_u32(&bytes[size_at..], false) - 4;
        bytes[size_at..size_at + 4].copy_from_slice(&claimed.to_le_bytes());
        let err = MatFile::parse(&bytes).unwrap_err();
        assert!(matches!(err, FetchError::Format { .. }));
    }

    proptest! {
        #[test]
        fn test_arbitrary_body_never_panics(
            big_endian in any::<bool>(),
            body in proptest::collection::vec(any::<u8>(), 0..512),
        ) {
            let mut bytes = header(big_endian);
            bytes.extend_from_slice(&body);
            if let Err(err) = MatFile::parse(&bytes) {
                let is_format = matches!(err, FetchError::Format { .. });
                prop_assert!(is_format);
            }
        }

        #[test]
        fn test_arbitrary_compressed_payload_never_panics(
            payload in proptest::collection::vec(any::<u8>(), 0..256),
        ) {
            let mut element = Vec::new();
            push_element(&mut element, MI_MATRIX, &payload);
            let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&element).unwrap();
            let compressed = encoder.finish().unwrap();

            let mut bytes = header(false);
            bytes.extend_from_slice(&MI_COMPRESSED.to_le_bytes());
            bytes.extend_from_slice(&(compressed.len() as u32).to_le_bytes());
            bytes.extend_from_slice(&compressed);
            if let Err(err) = MatFile::parse(&bytes) {
                let is_format = matches!(err, FetchError::Format { .. });
                prop_assert!(is_format);
            }
        }
    }
}
