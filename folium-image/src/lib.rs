/*!
Turns filter-encoded PDF image streams into addressable pixel scanlines.

`folium-image` takes an image XObject (or inline image) whose data is still
encoded with the last filter of its filter chain, resolves its colorspace,
decode ranges and color key, and produces rows in one of a small set of
canonical pixel formats: 1-bit masks, 1- and 8-bit indexed rows and 24/32-bit
BGR(A) rows.

Flate, run-length, DCT and CCITT data is decoded with built-in decoders. JBIG2
and JPEG 2000 decoding is plugged in through a [`CodecProvider`].

# Example
```rust
use folium_image::object::keys::{BITS_PER_COMPONENT, COLOR_SPACE, HEIGHT, WIDTH};
use folium_image::object::{Dict, Object, Stream};
use folium_image::{LoadContext, LoadOptions, PixelFormat, PixelSource, SampleSource};

let dict = Dict::new()
    .with(WIDTH, 2_i64)
    .with(HEIGHT, 1_i64)
    .with(BITS_PER_COMPONENT, 8_i64)
    .with(COLOR_SPACE, Object::name("DeviceRGB"));
let stream = Stream::new(dict, vec![255, 0, 0, 0, 0, 255]);

let mut source = SampleSource::load(stream, &LoadContext::default(), LoadOptions::default())
    .unwrap();

assert_eq!(source.format(), PixelFormat::Bgr24);
assert_eq!(&source.scanline(0)[..6], &[0, 0, 255, 255, 0, 0]);
```

# Safety
This crate forbids unsafe code via a crate-level attribute.

# Cargo features
- `dct` (default): built-in JPEG decoding via `zune-jpeg`.
- `ccitt` (default): built-in CCITT group 3 and 4 decoding via `fax`.
- `logging` (default): warnings and diagnostics via the `log` crate.
*/

#![forbid(unsafe_code)]
#![deny(missing_docs)]

pub mod codec;
pub mod color;
pub mod error;
pub mod jpx;
mod log;
pub mod object;
pub mod resolve;
mod source;

pub use codec::{CodecProvider, DefaultCodecs};
pub use error::{DecodeError, Result};
pub use folium_common::raster::{Bitmap, PauseIndicator, PixelFormat, PixelSource};
pub use source::{LoadContext, LoadOptions, LoadState, SampleSource};
