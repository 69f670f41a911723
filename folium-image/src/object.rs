//! An in-memory representation of the PDF objects an image is described by.
//!
//! Parsing PDF files is not the concern of this crate, the caller builds these
//! objects (or converts them from their own parser) and hands them over.

use rustc_hash::FxHashMap;
use std::sync::Arc;

/// A PDF object.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// The null object.
    Null,
    /// A boolean.
    Bool(bool),
    /// An integer number.
    Integer(i64),
    /// A real number.
    Real(f32),
    /// A name, without the leading slash.
    Name(String),
    /// A byte string.
    String(Vec<u8>),
    /// An array.
    Array(Vec<Object>),
    /// A dictionary.
    Dict(Dict),
    /// A stream.
    Stream(Box<Stream>),
}

impl Object {
    /// Create a name object.
    pub fn name(name: &str) -> Self {
        Self::Name(name.to_string())
    }

    /// Create an array of numbers.
    pub fn numbers(values: &[f32]) -> Self {
        Self::Array(values.iter().map(|v| Self::Real(*v)).collect())
    }

    /// The value as a number, if it is one.
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            Self::Integer(i) => Some(*i as f32),
            Self::Real(r) => Some(*r),
            _ => None,
        }
    }

    /// The value as an integer. Reals are truncated.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            Self::Real(r) => Some(*r as i64),
            _ => None,
        }
    }

    /// The value as a name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(n) => Some(n),
            _ => None,
        }
    }

    /// The value as an array.
    pub fn as_array(&self) -> Option<&[Self]> {
        match self {
            Self::Array(a) => Some(a),
            _ => None,
        }
    }

    /// The value as a dictionary. For streams, this is the stream dictionary.
    pub fn as_dict(&self) -> Option<&Dict> {
        match self {
            Self::Dict(d) => Some(d),
            Self::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// The value as a stream.
    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Self::Stream(s) => Some(s),
            _ => None,
        }
    }

    /// The bytes of a string or the data of a stream.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Self::String(s) => Some(s),
            Self::Stream(s) => Some(s.data()),
            _ => None,
        }
    }
}

impl From<Dict> for Object {
    fn from(value: Dict) -> Self {
        Self::Dict(value)
    }
}

impl From<Stream> for Object {
    fn from(value: Stream) -> Self {
        Self::Stream(Box::new(value))
    }
}

impl From<i64> for Object {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f32> for Object {
    fn from(value: f32) -> Self {
        Self::Real(value)
    }
}

impl From<bool> for Object {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// Conversion of a borrowed object into a typed value.
pub trait FromObject<'a>: Sized {
    /// Convert the object, returning `None` if it has a different type.
    fn from_object(object: &'a Object) -> Option<Self>;
}

macro_rules! int_from_object {
    ($($t:ty),*) => {
        $(
            impl FromObject<'_> for $t {
                fn from_object(object: &Object) -> Option<Self> {
                    object.as_int().and_then(|i| <$t>::try_from(i).ok())
                }
            }
        )*
    };
}

int_from_object!(i32, i64, u8, u32, usize);

impl FromObject<'_> for f32 {
    fn from_object(object: &Object) -> Option<Self> {
        object.as_f32()
    }
}

impl FromObject<'_> for bool {
    fn from_object(object: &Object) -> Option<Self> {
        match object {
            Object::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl<'a> FromObject<'a> for &'a str {
    fn from_object(object: &'a Object) -> Option<Self> {
        object.as_name()
    }
}

impl<'a> FromObject<'a> for &'a [Object] {
    fn from_object(object: &'a Object) -> Option<Self> {
        object.as_array()
    }
}

impl<'a> FromObject<'a> for &'a Dict {
    fn from_object(object: &'a Object) -> Option<Self> {
        object.as_dict()
    }
}

impl<'a> FromObject<'a> for &'a Stream {
    fn from_object(object: &'a Object) -> Option<Self> {
        object.as_stream()
    }
}

impl<'a> FromObject<'a> for &'a Object {
    fn from_object(object: &'a Object) -> Option<Self> {
        Some(object)
    }
}

impl FromObject<'_> for Vec<f32> {
    fn from_object(object: &Object) -> Option<Self> {
        object.as_array()?.iter().map(Object::as_f32).collect()
    }
}

impl<const N: usize> FromObject<'_> for [f32; N] {
    fn from_object(object: &Object) -> Option<Self> {
        let values = object.as_array()?;

        if values.len() != N {
            return None;
        }

        let mut out = [0.0; N];
        for (o, v) in out.iter_mut().zip(values) {
            *o = v.as_f32()?;
        }

        Some(out)
    }
}

/// A PDF dictionary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dict(FxHashMap<String, Object>);

impl Dict {
    /// Create an empty dictionary.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any previous value.
    pub fn insert(&mut self, key: &str, value: impl Into<Object>) {
        self.0.insert(key.to_string(), value.into());
    }

    /// Builder-style variant of [`Dict::insert`].
    #[must_use]
    pub fn with(mut self, key: &str, value: impl Into<Object>) -> Self {
        self.insert(key, value);
        self
    }

    /// Whether the dictionary has an entry for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    /// The raw object stored for `key`.
    pub fn get_object(&self, key: &str) -> Option<&Object> {
        self.0.get(key)
    }

    /// The value stored for `key`, converted to `T`.
    pub fn get<'a, T: FromObject<'a>>(&'a self, key: &str) -> Option<T> {
        T::from_object(self.0.get(key)?)
    }
}

/// A dictionary key.
#[allow(missing_docs)]
pub mod keys {
    macro_rules! key {
        ($i:ident, $e:expr) => {
            pub const $i: &str = $e;
        };
    }

    key!(ALTERNATE, "Alternate");
    key!(BITS_PER_COMPONENT, "BitsPerComponent");
    key!(BITS_PER_SAMPLE, "BitsPerSample");
    key!(BLACK_IS_1, "BlackIs1");
    key!(BLACK_POINT, "BlackPoint");
    key!(C0, "C0");
    key!(C1, "C1");
    key!(COLORS, "Colors");
    key!(COLOR_SPACE, "ColorSpace");
    key!(COLOR_TRANSFORM, "ColorTransform");
    key!(COLUMNS, "Columns");
    key!(DECODE, "Decode");
    key!(DECODE_PARMS, "DecodeParms");
    key!(DOMAIN, "Domain");
    key!(DP, "DP");
    key!(ENCODE, "Encode");
    key!(ENCODED_BYTE_ALIGN, "EncodedByteAlign");
    key!(F, "F");
    key!(FILTER, "Filter");
    key!(FUNCTION_TYPE, "FunctionType");
    key!(GAMMA, "Gamma");
    key!(HEIGHT, "Height");
    key!(IMAGE_MASK, "ImageMask");
    key!(JBIG2_GLOBALS, "JBIG2Globals");
    key!(K, "K");
    key!(MASK, "Mask");
    key!(MATRIX, "Matrix");
    key!(MATTE, "Matte");
    key!(N, "N");
    key!(PREDICTOR, "Predictor");
    key!(RANGE, "Range");
    key!(ROWS, "Rows");
    key!(SIZE, "Size");
    key!(SMASK, "SMask");
    key!(SMASK_IN_DATA, "SMaskInData");
    key!(WHITE_POINT, "WhitePoint");
    key!(WIDTH, "Width");
}

/// The image filters that can terminate a stream's filter chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImageFilter {
    /// `CCITTFaxDecode`.
    CcittFax,
    /// `FlateDecode`.
    Flate,
    /// `RunLengthDecode`.
    RunLength,
    /// `DCTDecode`.
    Dct,
    /// `JBIG2Decode`.
    Jbig2,
    /// `JPXDecode`.
    Jpx,
}

impl ImageFilter {
    /// Look up a filter by its name or abbreviation.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "CCITTFaxDecode" | "CCF" => Some(Self::CcittFax),
            "FlateDecode" | "Fl" => Some(Self::Flate),
            "RunLengthDecode" | "RL" => Some(Self::RunLength),
            "DCTDecode" | "DCT" => Some(Self::Dct),
            "JBIG2Decode" => Some(Self::Jbig2),
            "JPXDecode" => Some(Self::Jpx),
            _ => None,
        }
    }
}

/// An image stream whose bytes are still encoded with (at most) the terminal
/// filter of its filter chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    dict: Dict,
    data: Arc<[u8]>,
    cache_key: u64,
    inline: bool,
}

impl Stream {
    /// Create a new stream.
    pub fn new(dict: Dict, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            dict,
            data: data.into(),
            cache_key: 0,
            inline: false,
        }
    }

    /// Set the key that identifies this stream in caches.
    #[must_use]
    pub fn with_cache_key(mut self, cache_key: u64) -> Self {
        self.cache_key = cache_key;
        self
    }

    /// Mark the stream as an inline image.
    #[must_use]
    pub fn inline(mut self) -> Self {
        self.inline = true;
        self
    }

    /// The stream dictionary.
    pub fn dict(&self) -> &Dict {
        &self.dict
    }

    /// The (still filtered) stream data.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// The cache key of the stream.
    pub fn cache_key(&self) -> u64 {
        self.cache_key
    }

    /// Whether the stream is an inline image.
    pub fn is_inline(&self) -> bool {
        self.inline
    }

    fn filter_names(&self) -> Vec<&str> {
        let filter = self
            .dict
            .get_object(keys::FILTER)
            .or_else(|| self.dict.get_object(keys::F));

        match filter {
            Some(Object::Name(n)) => vec![n.as_str()],
            Some(Object::Array(a)) => a.iter().filter_map(Object::as_name).collect(),
            _ => vec![],
        }
    }

    /// The name of the last filter in the filter chain, if any.
    pub fn terminal_filter_name(&self) -> Option<&str> {
        self.filter_names().last().copied()
    }

    /// The terminal filter, if it is one of the image filters.
    pub fn image_filter(&self) -> Option<ImageFilter> {
        self.terminal_filter_name().and_then(ImageFilter::from_name)
    }

    /// The decode parameters belonging to the terminal filter.
    pub fn decode_params(&self) -> Option<&Dict> {
        let params = self
            .dict
            .get_object(keys::DECODE_PARMS)
            .or_else(|| self.dict.get_object(keys::DP))?;

        match params {
            Object::Dict(d) => Some(d),
            Object::Array(a) => {
                let idx = self.filter_names().len().checked_sub(1)?;
                a.get(idx)?.as_dict()
            }
            _ => None,
        }
    }
}
