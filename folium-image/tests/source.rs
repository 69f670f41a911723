use flate2::Compression;
use flate2::write::ZlibEncoder;
use folium_image::codec::{
    CodecProvider, DecodedRows, DecoderParams, Jbig2Decoder, Jbig2Status, ScanlineDecoder,
};
use folium_image::error::{CodecError, ColorError, DecoderError, ImageError};
use folium_image::object::keys::{
    BITS_PER_COMPONENT, COLOR_SPACE, COLUMNS, DECODE, DECODE_PARMS, FILTER, HEIGHT, IMAGE_MASK,
    JBIG2_GLOBALS, MASK, MATTE, PREDICTOR, SMASK, WIDTH,
};
use folium_image::object::{Dict, ImageFilter, Object, Stream};
use folium_image::{
    Bitmap, DecodeError, LoadContext, LoadOptions, LoadState, PauseIndicator, PixelFormat,
    PixelSource, SampleSource,
};
use std::io::Write;

fn image_dict(width: i64, height: i64, bpc: i64, cs: &str) -> Dict {
    Dict::new()
        .with(WIDTH, width)
        .with(HEIGHT, height)
        .with(BITS_PER_COMPONENT, bpc)
        .with(COLOR_SPACE, Object::name(cs))
}

fn load(stream: Stream) -> SampleSource {
    load_with(stream, &LoadContext::default(), LoadOptions::default())
}

fn load_with(stream: Stream, ctx: &LoadContext<'_>, options: LoadOptions) -> SampleSource {
    let mut source = SampleSource::new(stream);
    let mut state = source.start_load(ctx, options);

    while state == LoadState::Continue {
        state = source.continue_load(None);
    }

    source
}

fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(vec![], Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

#[test]
fn gray_1bpc_round_trip() {
    let data = vec![0b1011_0011, 0b0100_0000, 0b0101_0101, 0b1000_0000];
    let mut source = load(Stream::new(image_dict(10, 2, 1, "DeviceGray"), data));

    assert_eq!(source.state(), LoadState::Success);
    assert_eq!(source.format(), PixelFormat::Indexed1);
    assert!(source.palette().is_none());
    assert_eq!(source.scanline(0), &[0b1011_0011, 0b0100_0000]);
    assert_eq!(source.scanline(1), &[0b0101_0101, 0b1000_0000]);
}

#[test]
fn repeated_scanlines_are_identical() {
    let data: Vec<u8> = (0..24).collect();
    let mut source = load(Stream::new(image_dict(4, 2, 8, "DeviceRGB"), data));

    let first = source.scanline(1).to_vec();
    source.scanline(0);
    assert_eq!(source.scanline(1), first.as_slice());
    assert_eq!(&first[..3], &[14, 13, 12]);
}

#[test]
fn rgb_16_bit_keeps_high_bytes() {
    let data = vec![0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC];
    let mut source = load(Stream::new(image_dict(1, 1, 16, "DeviceRGB"), data));

    assert_eq!(source.format(), PixelFormat::Bgr24);
    assert_eq!(&source.scanline(0)[..3], &[0x9A, 0x56, 0x12]);
}

#[test]
fn truncated_rows_are_zero_filled() {
    let mut source = load(Stream::new(
        image_dict(4, 3, 8, "DeviceGray"),
        vec![1, 2, 3, 4, 5, 6],
    ));

    assert_eq!(source.state(), LoadState::Success);
    assert_eq!(source.scanline(0), &[1, 2, 3, 4]);
    assert_eq!(source.scanline(1), &[5, 6, 0, 0]);
    assert_eq!(source.scanline(2), &[0, 0, 0, 0]);
}

#[test]
fn inverted_gray_decode_builds_palette() {
    let dict = image_dict(2, 1, 8, "DeviceGray").with(DECODE, Object::numbers(&[1.0, 0.0]));
    let source = load(Stream::new(dict, vec![0, 255]));

    let palette = source.palette().unwrap();
    assert_eq!(palette.len(), 256);
    assert_eq!(palette[0], 0xFFFFFFFF);
    assert_eq!(palette[255], 0xFF000000);
}

#[test]
fn single_entry_indexed_palette() {
    let cs = Object::Array(vec![
        Object::name("Indexed"),
        Object::name("DeviceRGB"),
        Object::Integer(0),
        Object::String(vec![0xFF, 0x00, 0x00]),
    ]);
    let dict = Dict::new()
        .with(WIDTH, 8_i64)
        .with(HEIGHT, 1_i64)
        .with(BITS_PER_COMPONENT, 1_i64)
        .with(COLOR_SPACE, cs);
    let source = load(Stream::new(dict, vec![0x0F]));

    assert_eq!(source.format(), PixelFormat::Indexed1);
    assert_eq!(source.palette(), Some(&[0xFFFF0000, 0xFF000000][..]));
}

#[test]
fn gray_color_key() {
    let dict = image_dict(2, 1, 8, "DeviceGray").with(MASK, Object::numbers(&[0.0, 10.0]));
    let mut source = load(Stream::new(dict, vec![5, 50]));

    assert_eq!(source.format(), PixelFormat::Bgra32);
    assert_eq!(source.scanline(0), &[5, 5, 5, 0, 50, 50, 50, 0xFF]);
}

#[test]
fn rgb_color_key() {
    let dict = image_dict(2, 1, 8, "DeviceRGB").with(MASK, Object::numbers(&[0.0; 6]));
    let mut source = load(Stream::new(dict, vec![0, 0, 0, 10, 20, 30]));

    assert_eq!(source.format(), PixelFormat::Bgra32);
    assert_eq!(source.scanline(0), &[0, 0, 0, 0, 30, 20, 10, 0xFF]);
}

#[test]
fn one_bit_color_key() {
    let dict = image_dict(8, 1, 1, "DeviceGray").with(MASK, Object::numbers(&[0.0, 0.0]));
    let mut source = load(Stream::new(dict, vec![0b1000_0000]));
    let row = source.scanline(0);

    assert_eq!(row.len(), 32);
    assert_eq!(&row[..4], &0xFFFFFFFF_u32.to_le_bytes());
    assert_eq!(&row[4..8], &[0; 4]);
}

#[test]
fn flate_rows() {
    let dict = image_dict(2, 2, 8, "DeviceRGB").with(FILTER, Object::name("FlateDecode"));
    let data = zlib(&[1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12]);
    let mut source = load(Stream::new(dict, data));

    assert_eq!(source.state(), LoadState::Success);
    assert_eq!(&source.scanline(1)[..6], &[9, 8, 7, 12, 11, 10]);
}

#[test]
fn partial_flate_row_keeps_its_bytes() {
    let dict = image_dict(3, 2, 8, "DeviceGray").with(FILTER, Object::name("FlateDecode"));
    let mut source = load(Stream::new(dict, zlib(&[1, 2, 3, 4, 5])));

    assert_eq!(source.state(), LoadState::Success);
    assert_eq!(source.scanline(1), &[4, 5, 0]);
}

#[test]
fn flate_with_png_predictor() {
    let params = Dict::new().with(PREDICTOR, 12_i64).with(COLUMNS, 2_i64);
    let dict = image_dict(2, 2, 8, "DeviceGray")
        .with(FILTER, Object::name("FlateDecode"))
        .with(DECODE_PARMS, params);
    let mut source = load(Stream::new(dict, zlib(&[2, 5, 6, 2, 1, 1])));

    assert_eq!(source.scanline(0), &[5, 6]);
    assert_eq!(source.scanline(1), &[6, 7]);
}

#[test]
fn corrupt_flate_fails() {
    let dict = image_dict(2, 2, 8, "DeviceGray").with(FILTER, Object::name("FlateDecode"));
    let source = load(Stream::new(dict, vec![0xFF, 0xFF, 0xFF]));

    assert_eq!(source.state(), LoadState::Fail);
    assert_eq!(
        source.last_error(),
        Some(DecoderError::Construction(ImageFilter::Flate).into())
    );
}

#[test]
fn invalid_headers_fail() {
    let source = load(Stream::new(image_dict(2, 0, 8, "DeviceGray"), vec![0]));
    assert_eq!(
        source.last_error(),
        Some(ImageError::InvalidDimensions.into())
    );

    let source = load(Stream::new(image_dict(2, 2, 5, "DeviceGray"), vec![0]));
    assert_eq!(source.last_error(), Some(ImageError::InvalidBitDepth.into()));

    let source = load(Stream::new(image_dict(2, 2, 8, "Unknown"), vec![0]));
    assert_eq!(source.last_error(), Some(ColorError::Unresolved.into()));

    let source = load(Stream::new(image_dict(2, 2, 8, "DeviceGray"), vec![]));
    assert_eq!(source.last_error(), Some(ImageError::EmptyData.into()));
}

#[test]
fn synchronous_load() {
    let ctx = LoadContext::default();

    let stream = Stream::new(image_dict(1, 1, 8, "DeviceGray"), vec![7]);
    let mut source = SampleSource::load(stream, &ctx, LoadOptions::default()).unwrap();
    assert_eq!(source.scanline(0), &[7]);

    let stream = Stream::new(image_dict(1, 1, 8, "DeviceGray"), vec![]);
    let err = SampleSource::load(stream, &ctx, LoadOptions::default()).err();
    assert_eq!(err, Some(DecodeError::Image(ImageError::EmptyData)));
}

#[test]
fn form_resources_only_apply_to_inline_images() {
    let resources =
        Dict::new().with(COLOR_SPACE, Dict::new().with("CS0", Object::name("DeviceRGB")));
    let dict = image_dict(1, 1, 8, "CS0");

    let form = LoadContext::default().with_resources(Some(&resources), None);
    let source = load_with(
        Stream::new(dict.clone(), vec![1, 2, 3]),
        &form,
        LoadOptions::default(),
    );
    assert_eq!(source.last_error(), Some(ColorError::Unresolved.into()));

    let source = load_with(
        Stream::new(dict.clone(), vec![1, 2, 3]).inline(),
        &form,
        LoadOptions::default(),
    );
    assert_eq!(source.state(), LoadState::Success);

    let page = LoadContext::default().with_resources(None, Some(&resources));
    let source = load_with(
        Stream::new(dict, vec![1, 2, 3]),
        &page,
        LoadOptions::default(),
    );
    assert_eq!(source.format(), PixelFormat::Bgr24);
}

struct NarrowFlate;

impl CodecProvider for NarrowFlate {
    fn flate(&self, _: &[u8], params: DecoderParams<'_>) -> Option<Box<dyn ScanlineDecoder>> {
        let rows = DecodedRows::new(
            params.width - 1,
            params.height,
            params.components,
            params.bpc,
            vec![0; 64],
        )?;

        Some(Box::new(rows))
    }
}

#[test]
fn short_decoder_rows_fail() {
    let dict = image_dict(4, 2, 8, "DeviceGray").with(FILTER, Object::name("FlateDecode"));
    let ctx = LoadContext {
        codecs: &NarrowFlate,
        ..LoadContext::default()
    };
    let source = load_with(Stream::new(dict, vec![0]), &ctx, LoadOptions::default());

    assert_eq!(
        source.last_error(),
        Some(DecoderError::PitchMismatch.into())
    );
}

struct FakeJpeg {
    width: u32,
    height: u32,
    components: u32,
}

impl CodecProvider for FakeJpeg {
    fn dct(&self, _: &[u8], _: DecoderParams<'_>) -> Option<Box<dyn ScanlineDecoder>> {
        let len = (self.width * self.height * self.components) as usize;
        let data = (0..len).map(|i| i as u8).collect();
        let rows = DecodedRows::new(self.width, self.height, self.components, 8, data)?;

        Some(Box::new(rows))
    }
}

fn load_jpeg(cs: &str, jpeg: FakeJpeg) -> SampleSource {
    let dict = image_dict(2, 2, 8, cs).with(FILTER, Object::name("DCTDecode"));
    let ctx = LoadContext {
        codecs: &jpeg,
        ..LoadContext::default()
    };

    load_with(Stream::new(dict, vec![0xFF, 0xD8]), &ctx, LoadOptions::default())
}

#[test]
fn jpeg_header_overrides_dictionary() {
    let mut source = load_jpeg(
        "DeviceGray",
        FakeJpeg {
            width: 4,
            height: 3,
            components: 1,
        },
    );

    assert_eq!(source.state(), LoadState::Success);
    assert_eq!((source.width(), source.height()), (4, 3));
    assert_eq!(source.scanline(1), &[4, 5, 6, 7]);
}

#[test]
fn jpeg_components_are_validated() {
    let source = load_jpeg(
        "DeviceRGB",
        FakeJpeg {
            width: 2,
            height: 2,
            components: 1,
        },
    );
    assert_eq!(
        source.last_error(),
        Some(ImageError::InvalidComponents.into())
    );

    let source = load_jpeg(
        "DeviceRGB",
        FakeJpeg {
            width: 2,
            height: 2,
            components: 4,
        },
    );
    assert_eq!(source.state(), LoadState::Success);
    assert_eq!(source.color_info().components, 4);
}

struct StripeDecoder {
    calls: u32,
    fail: bool,
}

impl Jbig2Decoder for StripeDecoder {
    fn decode(
        &mut self,
        data: &[u8],
        globals: Option<&[u8]>,
        bitmap: &mut Bitmap,
        _: Option<&mut dyn PauseIndicator>,
    ) -> Jbig2Status {
        assert_eq!(data, b"PAGE");
        assert_eq!(globals, Some(&b"GLOBALS"[..]));

        self.calls += 1;

        if self.fail {
            return Jbig2Status::Error;
        }

        if self.calls == 1 {
            return Jbig2Status::Continue;
        }

        for row in 0..bitmap.height() {
            bitmap.row_mut(row).unwrap()[0] = 0b1100_0000;
        }

        Jbig2Status::Done
    }
}

struct Jbig2Codecs {
    fail: bool,
}

impl CodecProvider for Jbig2Codecs {
    fn jbig2(&self) -> Option<Box<dyn Jbig2Decoder>> {
        Some(Box::new(StripeDecoder {
            calls: 0,
            fail: self.fail,
        }))
    }
}

fn jbig2_stream(image_mask: bool) -> Stream {
    let globals = Stream::new(Dict::new(), b"GLOBALS".to_vec());
    let mut dict = Dict::new()
        .with(WIDTH, 8_i64)
        .with(HEIGHT, 2_i64)
        .with(FILTER, Object::name("JBIG2Decode"))
        .with(DECODE_PARMS, Dict::new().with(JBIG2_GLOBALS, globals));

    if image_mask {
        dict.insert(IMAGE_MASK, true);
    } else {
        dict.insert(BITS_PER_COMPONENT, 1_i64);
        dict.insert(COLOR_SPACE, Object::name("DeviceGray"));
    }

    Stream::new(dict, b"PAGE".to_vec())
}

#[test]
fn jbig2_is_decoded_incrementally() {
    let codecs = Jbig2Codecs { fail: false };
    let ctx = LoadContext {
        codecs: &codecs,
        ..LoadContext::default()
    };

    let mut source = SampleSource::new(jbig2_stream(false));
    assert_eq!(
        source.start_load(&ctx, LoadOptions::default()),
        LoadState::Continue
    );
    assert!(source.is_jbig2());
    assert_eq!(source.continue_load(None), LoadState::Continue);
    assert_eq!(source.continue_load(None), LoadState::Success);
    assert_eq!(source.continue_load(None), LoadState::Success);

    // Black JBIG2 pixels become black gray samples.
    assert_eq!(source.format(), PixelFormat::Indexed1);
    assert_eq!(source.scanline(0), &[0b0011_1111]);
    assert_eq!(source.scanline(1), &[0b0011_1111]);
}

#[test]
fn jbig2_image_mask() {
    let codecs = Jbig2Codecs { fail: false };
    let ctx = LoadContext {
        codecs: &codecs,
        ..LoadContext::default()
    };
    let mut source = load_with(jbig2_stream(true), &ctx, LoadOptions::default());

    assert_eq!(source.format(), PixelFormat::Mask1);
    assert_eq!(source.scanline(0), &[0b1100_0000]);
}

#[test]
fn jbig2_failures() {
    let codecs = Jbig2Codecs { fail: true };
    let ctx = LoadContext {
        codecs: &codecs,
        ..LoadContext::default()
    };
    let source = load_with(jbig2_stream(false), &ctx, LoadOptions::default());
    assert_eq!(source.last_error(), Some(CodecError::Jbig2.into()));

    let source = load(jbig2_stream(false));
    assert_eq!(
        source.last_error(),
        Some(DecoderError::Unavailable(ImageFilter::Jbig2).into())
    );
}

fn smask(width: i64, data: Vec<u8>) -> Stream {
    let dict = image_dict(width, 1, 8, "DeviceGray").with(MATTE, Object::numbers(&[1.0, 0.0, 0.0]));

    Stream::new(dict, data)
}

#[test]
fn soft_mask_with_matte() {
    let dict = image_dict(2, 1, 8, "DeviceRGB").with(SMASK, smask(2, vec![128, 255]));
    let mut source = load(Stream::new(dict, vec![0; 6]));

    assert_eq!(source.state(), LoadState::Success);
    assert_eq!(source.matte_color(), 0x00FF0000);

    let mut mask = source.take_mask().unwrap();
    assert_eq!(mask.format(), PixelFormat::Indexed8);
    assert_eq!(mask.scanline(0), &[128, 255]);
    assert!(source.mask().is_none());
}

#[test]
fn broken_soft_mask_is_dropped() {
    let dict = image_dict(2, 1, 8, "DeviceRGB").with(SMASK, smask(0, vec![1]));
    let source = load(Stream::new(dict, vec![0; 6]));

    assert_eq!(source.state(), LoadState::Success);
    assert!(source.mask().is_none());
}

#[test]
fn masks_can_be_skipped() {
    let dict = image_dict(2, 1, 8, "DeviceRGB").with(SMASK, smask(2, vec![1, 2]));
    let options = LoadOptions {
        has_mask: false,
        ..LoadOptions::default()
    };
    let source = load_with(Stream::new(dict, vec![0; 6]), &LoadContext::default(), options);

    assert!(source.mask().is_none());
    assert_eq!(source.matte_color(), 0xFFFFFFFF);
}

#[test]
fn stencil_mask_stream() {
    let stencil = Stream::new(
        Dict::new()
            .with(WIDTH, 8_i64)
            .with(HEIGHT, 1_i64)
            .with(IMAGE_MASK, true),
        vec![0xF0],
    );
    let dict = image_dict(1, 1, 8, "DeviceGray").with(MASK, stencil);
    let source = load(Stream::new(dict, vec![0]));

    let mask = source.mask().unwrap();
    assert_eq!(mask.format(), PixelFormat::Mask1);
    assert!(mask.is_image_mask());
}
