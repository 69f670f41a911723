//! Loading image streams into scanline sources.
//!
//! A [`SampleSource`] resolves the colorspace of an image, sets up the decoder
//! for its terminal filter and turns the decoded samples into rows of one of
//! the canonical [`PixelFormat`]s. Loading is split into
//! [`SampleSource::start_load`] and [`SampleSource::continue_load`] so that
//! JBIG2 decoding can yield to a [`PauseIndicator`].

mod scanline;

use crate::codec::{
    CodecProvider, DecoderParams, DefaultCodecs, Jbig2Decoder, Jbig2Status, JpxOptions,
    ScanlineDecoder,
};
use crate::color::{ColorSpace, ColorSpaceLookup, DefaultColorSpaceLookup, Family};
use crate::error::{
    CodecError, ColorError, DecodeError, DecoderError, ImageError, Result, bail, err,
};
use crate::jpx::{self, JpxAction, JpxConversion};
use crate::log::{OptionLog, ldebug, ltrace, lwarn};
use crate::object::keys::{
    BITS_PER_COMPONENT, COLOR_SPACE, HEIGHT, JBIG2_GLOBALS, MASK, MATTE, SMASK, SMASK_IN_DATA,
    WIDTH,
};
use crate::object::{Dict, ImageFilter, Object, Stream};
use crate::resolve::{ColorInfo, argb_from_rgb};
use folium_common::pitch::{pitch8, pitch32};
use folium_common::raster::{Bitmap, PauseIndicator, PixelFormat, PixelSource, reborrow};
use std::mem;

/// The largest width and height an image may declare.
const MAX_DIMENSION: i64 = 0x1FFFF;

/// The collaborators used while loading an image.
#[derive(Clone, Copy)]
pub struct LoadContext<'a> {
    /// Resolves colorspace objects.
    pub lookup: &'a dyn ColorSpaceLookup,
    /// Creates the decoders for the image filters.
    pub codecs: &'a dyn CodecProvider,
    /// The resources of the form the image is drawn from. Only consulted for
    /// inline images.
    pub form_resources: Option<&'a Dict>,
    /// The resources of the page.
    pub page_resources: Option<&'a Dict>,
}

impl Default for LoadContext<'_> {
    fn default() -> Self {
        Self {
            lookup: &DefaultColorSpaceLookup,
            codecs: &DefaultCodecs,
            form_resources: None,
            page_resources: None,
        }
    }
}

impl<'a> LoadContext<'a> {
    /// Create a context with the given collaborators and no resources.
    pub fn new(lookup: &'a dyn ColorSpaceLookup, codecs: &'a dyn CodecProvider) -> Self {
        Self {
            lookup,
            codecs,
            form_resources: None,
            page_resources: None,
        }
    }

    /// Set the form and page resources.
    #[must_use]
    pub fn with_resources(
        mut self,
        form_resources: Option<&'a Dict>,
        page_resources: Option<&'a Dict>,
    ) -> Self {
        self.form_resources = form_resources;
        self.page_resources = page_resources;
        self
    }
}

/// Options for loading an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Whether to load the soft mask or stencil mask of the image.
    pub has_mask: bool,
    /// Whether to build the palette with device conversions instead of
    /// embedded ICC profiles.
    pub std_cs: bool,
    /// The colorspace family of the transparency group the image is drawn
    /// into.
    pub group_family: Option<Family>,
    /// Whether the image is drawn as part of a mask.
    pub load_mask: bool,
    /// The largest size the image is displayed at. JPEG 2000 images skip
    /// resolution levels they don't need for it.
    pub max_size: Option<(u32, u32)>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            has_mask: true,
            std_cs: false,
            group_family: None,
            load_mask: false,
            max_size: None,
        }
    }
}

/// The state of a loading operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    /// Loading paused and has to be resumed with
    /// [`SampleSource::continue_load`].
    Continue,
    /// The image is ready to produce scanlines.
    Success,
    /// Loading failed, see [`SampleSource::last_error`].
    Fail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LoadPhase {
    Idle,
    Jbig2,
    Mask,
    Done,
}

/// An image stream that produces scanlines in a canonical pixel format.
pub struct SampleSource {
    stream: Stream,
    filter: Option<ImageFilter>,
    width: u32,
    height: u32,
    color: ColorInfo,
    format: PixelFormat,
    palette: Option<Vec<u32>>,
    decoder: Option<Box<dyn ScanlineDecoder>>,
    cached: Option<Bitmap>,
    jbig2: Option<Box<dyn Jbig2Decoder>>,
    // The alpha channel embedded in JPEG 2000 data, with its dimensions.
    jpx_alpha: Option<(u32, u32, Vec<u8>)>,
    line_buf: Vec<u8>,
    mask_buf: Vec<u8>,
    pad_buf: Vec<u8>,
    mask: Option<Box<Self>>,
    matte: u32,
    options: LoadOptions,
    phase: LoadPhase,
    state: LoadState,
    error: Option<DecodeError>,
}

impl SampleSource {
    /// Create an unloaded source for `stream`.
    pub fn new(stream: Stream) -> Self {
        Self {
            stream,
            filter: None,
            width: 0,
            height: 0,
            color: ColorInfo::default(),
            format: PixelFormat::Indexed8,
            palette: None,
            decoder: None,
            cached: None,
            jbig2: None,
            jpx_alpha: None,
            line_buf: vec![],
            mask_buf: vec![],
            pad_buf: vec![],
            mask: None,
            matte: 0xFFFFFFFF,
            options: LoadOptions::default(),
            phase: LoadPhase::Idle,
            state: LoadState::Fail,
            error: None,
        }
    }

    /// Load `stream` to completion.
    pub fn load(stream: Stream, ctx: &LoadContext<'_>, options: LoadOptions) -> Result<Self> {
        let mut source = Self::new(stream);
        let mut state = source.start_load(ctx, options);

        while state == LoadState::Continue {
            state = source.continue_load(None);
        }

        match state {
            LoadState::Success => Ok(source),
            _ => err!(source.error.unwrap_or(DecodeError::Unsupported)),
        }
    }

    /// Start loading the image.
    ///
    /// Returns [`LoadState::Continue`] if [`SampleSource::continue_load`] has
    /// to be called to finish loading.
    pub fn start_load(&mut self, ctx: &LoadContext<'_>, options: LoadOptions) -> LoadState {
        self.reset(options);

        ltrace!("start loading image {}", self.stream.cache_key());

        match self.start_inner(ctx) {
            Ok(LoadPhase::Done) => self.succeed(),
            Ok(phase) => {
                ltrace!("image {} paused in {:?}", self.stream.cache_key(), phase);

                self.phase = phase;
                self.state = LoadState::Continue;

                LoadState::Continue
            }
            Err(e) => self.fail(e),
        }
    }

    /// Resume loading. On a source that isn't paused this returns the
    /// current state.
    pub fn continue_load(&mut self, mut pause: Option<&mut dyn PauseIndicator>) -> LoadState {
        if self.state != LoadState::Continue {
            return self.state;
        }

        if self.phase == LoadPhase::Jbig2 {
            match self.decode_jbig2(reborrow(&mut pause)) {
                Ok(Jbig2Status::Continue) => return LoadState::Continue,
                Ok(_) => {
                    self.phase = if self.mask_pending() {
                        LoadPhase::Mask
                    } else {
                        LoadPhase::Done
                    };
                }
                Err(e) => return self.fail(e),
            }
        }

        if self.phase == LoadPhase::Mask && self.continue_mask(pause) == LoadState::Continue {
            return LoadState::Continue;
        }

        self.succeed()
    }

    /// The current load state.
    pub fn state(&self) -> LoadState {
        self.state
    }

    /// The error that made loading fail.
    pub fn last_error(&self) -> Option<DecodeError> {
        self.error
    }

    /// The image stream.
    pub fn stream(&self) -> &Stream {
        &self.stream
    }

    /// The resolved color information.
    pub fn color_info(&self) -> &ColorInfo {
        &self.color
    }

    /// Whether the image is a stencil mask.
    pub fn is_image_mask(&self) -> bool {
        self.color.image_mask
    }

    /// Whether the image is JBIG2 encoded.
    pub fn is_jbig2(&self) -> bool {
        self.filter == Some(ImageFilter::Jbig2)
    }

    /// The loaded mask of the image, if any.
    pub fn mask(&self) -> Option<&Self> {
        self.mask.as_deref()
    }

    /// Take ownership of the loaded mask.
    pub fn take_mask(&mut self) -> Option<Box<Self>> {
        self.mask.take()
    }

    /// The color the image was preblended with, from the `/Matte` entry of
    /// its soft mask. `0xFFFFFFFF` if there is none.
    pub fn matte_color(&self) -> u32 {
        self.matte
    }

    fn reset(&mut self, options: LoadOptions) {
        let stream = mem::replace(&mut self.stream, Stream::new(Dict::new(), Vec::<u8>::new()));

        *self = Self {
            options,
            ..Self::new(stream)
        };
    }

    fn succeed(&mut self) -> LoadState {
        ltrace!("image {} loaded", self.stream.cache_key());

        self.phase = LoadPhase::Done;
        self.state = LoadState::Success;

        LoadState::Success
    }

    fn fail(&mut self, error: DecodeError) -> LoadState {
        lwarn!("failed to load image {}: {}", self.stream.cache_key(), error);

        self.decoder = None;
        self.cached = None;
        self.jbig2 = None;
        self.mask = None;
        self.line_buf = vec![];
        self.mask_buf = vec![];
        self.phase = LoadPhase::Done;
        self.state = LoadState::Fail;
        self.error = Some(error);

        LoadState::Fail
    }

    fn start_inner(&mut self, ctx: &LoadContext<'_>) -> Result<LoadPhase> {
        let ctx = LoadContext {
            form_resources: ctx.form_resources.filter(|_| self.stream.is_inline()),
            ..*ctx
        };

        self.load_header(&ctx)?;

        let skip = self.resolution_skip();
        self.create_decoder(&ctx, skip)?;
        self.setup_output()?;

        let mut phase = if self.jbig2.is_some() {
            LoadPhase::Jbig2
        } else {
            LoadPhase::Done
        };

        if self.options.has_mask
            && self.start_mask(&ctx) == LoadState::Continue
            && phase == LoadPhase::Done
        {
            phase = LoadPhase::Mask;
        }

        Ok(phase)
    }

    fn load_header(&mut self, ctx: &LoadContext<'_>) -> Result<()> {
        let dict = self.stream.dict();
        let width = dict.get::<i64>(WIDTH).unwrap_or(0);
        let height = dict.get::<i64>(HEIGHT).unwrap_or(0);

        if !(1..=MAX_DIMENSION).contains(&width) || !(1..=MAX_DIMENSION).contains(&height) {
            bail!(ImageError::InvalidDimensions);
        }

        self.width = width as u32;
        self.height = height as u32;

        if let Some(name) = self.stream.terminal_filter_name()
            && ImageFilter::from_name(name).is_none()
        {
            lwarn!("unsupported image filter {}", name);

            bail!(DecodeError::Unsupported);
        }

        self.filter = self.stream.image_filter();
        self.color = ColorInfo::resolve(
            dict,
            self.filter,
            ctx.lookup,
            ctx.form_resources,
            ctx.page_resources,
        )?;

        if self.color.do_bpc_check && (self.color.bpc == 0 || self.color.components == 0) {
            bail!(ImageError::InvalidBitDepth);
        }

        pitch8(self.color.bpc, self.color.components, self.width)
            .and_then(|p| p.checked_mul(self.height))
            .ok_or(DecodeError::Overflow)?;

        if self.stream.data().is_empty() {
            bail!(ImageError::EmptyData);
        }

        Ok(())
    }

    fn resolution_skip(&self) -> u8 {
        let Some((max_width, max_height)) = self.options.max_size else {
            return 0;
        };

        if max_width == 0 || max_height == 0 {
            return 0;
        }

        let ratio = (self.width / max_width).min(self.height / max_height);

        ratio.max(1).ilog2() as u8
    }

    fn create_decoder(&mut self, ctx: &LoadContext<'_>, skip: u8) -> Result<()> {
        let Some(filter) = self.filter else {
            return Ok(());
        };

        if self.color.do_bpc_check && self.color.bpc == 0 {
            bail!(ImageError::InvalidBitDepth);
        }

        let data = self.stream.data();
        let params = DecoderParams {
            width: self.width,
            height: self.height,
            components: self.color.components,
            bpc: self.color.bpc,
            params: self.stream.decode_params(),
        };

        let decoder = match filter {
            ImageFilter::Jpx => return self.load_jpx(ctx, skip),
            ImageFilter::Jbig2 => return self.prepare_jbig2(ctx),
            ImageFilter::CcittFax => ctx.codecs.ccitt(data, params),
            ImageFilter::Flate => ctx.codecs.flate(data, params),
            ImageFilter::RunLength => ctx.codecs.run_length(data, params),
            ImageFilter::Dct => ctx.codecs.dct(data, params),
        };

        let Some(decoder) = decoder else {
            bail!(DecoderError::Construction(filter));
        };

        ldebug!(
            "created {:?} decoder for {}x{} image",
            filter,
            decoder.width(),
            decoder.height()
        );

        if filter == ImageFilter::Dct {
            self.adopt_jpeg_layout(decoder.as_ref())?;
        }

        let required = pitch8(self.color.bpc, self.color.components, self.width);
        let provided = pitch8(decoder.bpc(), decoder.components(), decoder.width());

        match (required, provided) {
            (Some(required), Some(provided)) if provided >= required => {}
            (Some(_), Some(_)) => bail!(DecoderError::PitchMismatch),
            _ => bail!(DecodeError::Overflow),
        }

        self.decoder = Some(decoder);

        Ok(())
    }

    /// Take over the layout of a JPEG whose header disagrees with the image
    /// dictionary.
    fn adopt_jpeg_layout(&mut self, decoder: &dyn ScanlineDecoder) -> Result<()> {
        let components = decoder.components();

        if decoder.width() == self.width
            && decoder.height() == self.height
            && components == self.color.components
        {
            return Ok(());
        }

        ldebug!(
            "JPEG header says {}x{} with {} components, using it",
            decoder.width(),
            decoder.height(),
            components
        );

        if !(1..=MAX_DIMENSION as u32).contains(&decoder.width())
            || !(1..=MAX_DIMENSION as u32).contains(&decoder.height())
        {
            bail!(ImageError::InvalidDimensions);
        }

        self.width = decoder.width();
        self.height = decoder.height();
        self.color.bpc = decoder.bpc();

        if components == self.color.components {
            return Ok(());
        }

        if let Some(cs) = &self.color.color_space {
            let cs_components = cs.component_count();

            let valid = match self.color.family {
                Some(Family::DeviceGray | Family::DeviceRgb | Family::DeviceCmyk) => {
                    let min = match self.color.family {
                        Some(Family::DeviceGray) => 1,
                        Some(Family::DeviceRgb) => 3,
                        _ => 4,
                    };

                    cs_components >= min && components >= min
                }
                Some(Family::Lab) => components == 3 && cs_components >= 3,
                Some(Family::IccBased) => {
                    let valid_icc = |n: u32| matches!(n, 1 | 3 | 4);

                    valid_icc(cs_components)
                        && valid_icc(components)
                        && cs_components >= components
                }
                _ => cs_components == components,
            };

            if !valid {
                bail!(ImageError::InvalidComponents);
            }
        } else if self.color.family == Some(Family::Lab) && components != 3 {
            bail!(ImageError::InvalidComponents);
        }

        self.color.components = components;

        if self.color.color_space.is_some() {
            self.color.component_data(self.stream.dict())?;
        } else {
            self.color.comp_data.clear();
        }

        Ok(())
    }

    fn prepare_jbig2(&mut self, ctx: &LoadContext<'_>) -> Result<()> {
        let format = if self.color.image_mask {
            PixelFormat::Mask1
        } else {
            PixelFormat::Indexed1
        };

        let bitmap = Bitmap::new(self.width, self.height, format).ok_or(DecodeError::Overflow)?;

        let Some(decoder) = ctx.codecs.jbig2() else {
            bail!(DecoderError::Unavailable(ImageFilter::Jbig2));
        };

        ldebug!("created JBIG2 decoder");

        self.cached = Some(bitmap);
        self.jbig2 = Some(decoder);

        Ok(())
    }

    fn decode_jbig2(&mut self, pause: Option<&mut dyn PauseIndicator>) -> Result<Jbig2Status> {
        let (Some(decoder), Some(bitmap)) = (self.jbig2.as_deref_mut(), self.cached.as_mut())
        else {
            return err!(CodecError::Jbig2);
        };

        let globals = self
            .stream
            .decode_params()
            .and_then(|p| p.get::<&Stream>(JBIG2_GLOBALS))
            .map(Stream::data);

        match decoder.decode(self.stream.data(), globals, bitmap, pause) {
            Jbig2Status::Continue => Ok(Jbig2Status::Continue),
            Jbig2Status::Done => {
                // JBIG2 marks black pixels with 1, PDF samples use 0.
                for byte in bitmap.data_mut() {
                    *byte = !*byte;
                }

                self.jbig2 = None;

                Ok(Jbig2Status::Done)
            }
            Jbig2Status::Error => err!(CodecError::Jbig2),
        }
    }

    fn load_jpx(&mut self, ctx: &LoadContext<'_>, skip: u8) -> Result<()> {
        let options = JpxOptions {
            resolution_levels_to_skip: skip,
            indexed: self.color.family == Some(Family::Indexed),
        };

        let Some(mut image) = ctx
            .codecs
            .jpx(self.stream.data(), options)
            .warn_none("failed to decode JPEG 2000 image")
        else {
            bail!(DecoderError::Construction(ImageFilter::Jpx));
        };

        image.normalize();

        let inline_alpha = self.stream.dict().get::<i64>(SMASK_IN_DATA) == Some(1);

        let Some(conversion) =
            JpxConversion::new(&image, self.color.color_space.as_ref(), inline_alpha)
        else {
            lwarn!("JPEG 2000 colorspace does not fit the image colorspace");

            bail!(ColorError::JpxMismatch);
        };

        if image.width < self.width >> skip || image.height < self.height >> skip {
            bail!(CodecError::Jpx);
        }

        conversion.apply_colorspace(&mut self.color.color_space);
        self.color.family = self.color.color_space.as_ref().map(ColorSpace::family);

        if let Some(components) = conversion.components() {
            if components == 0 {
                bail!(ImageError::InvalidComponents);
            }

            self.color.components = components;
        }

        let (bitmap_width, format) = conversion
            .output_layout(image.width, image.channels())
            .ok_or(DecodeError::Overflow)?;
        let mut bitmap =
            Bitmap::new(bitmap_width, image.height, format).ok_or(DecodeError::Overflow)?;

        let channels = conversion.output_channels(image.channels(), self.color.components);
        jpx::decode_into(&image, &mut bitmap, conversion.swap_rgb(), channels)?;

        match conversion.action() {
            JpxAction::ConvertArgbToRgb => {
                let (converted, alpha) =
                    jpx::argb_to_rgb(&bitmap, inline_alpha).ok_or(CodecError::Jpx)?;

                bitmap = converted;
                self.jpx_alpha = alpha.map(|a| (image.width, image.height, a));
            }
            JpxAction::UseIndexed if self.color.bpc < 8 => {
                jpx::shift_indexed(&mut bitmap, self.color.bpc);
            }
            _ => {}
        }

        self.color.bpc = 8;

        if self.color.color_space.is_some() {
            self.color.component_data(self.stream.dict())?;
        } else {
            self.color.color_key = false;
        }

        self.width = (self.width >> skip).max(1);
        self.height = (self.height >> skip).max(1);
        self.cached = Some(bitmap);

        Ok(())
    }

    /// Pick the output format and allocate the row buffers.
    fn setup_output(&mut self) -> Result<()> {
        if self.color.image_mask {
            self.color.bpc = 1;
            self.color.components = 1;
            self.format = PixelFormat::Mask1;
        } else {
            self.format = match self.color.bpp() {
                0 => bail!(ImageError::InvalidBitDepth),
                1 => PixelFormat::Indexed1,
                2..=8 => PixelFormat::Indexed8,
                _ => PixelFormat::Bgr24,
            };
        }

        let pitch = pitch32(self.format.bpp(), self.width).ok_or(DecodeError::Overflow)?;
        self.line_buf = vec![0; pitch as usize];
        self.palette = self.build_palette();

        if self.color.color_key {
            self.format = PixelFormat::Bgra32;

            let pitch = pitch32(32, self.width).ok_or(DecodeError::Overflow)?;
            self.mask_buf = vec![0; pitch as usize];
        }

        Ok(())
    }

    fn build_palette(&self) -> Option<Vec<u32>> {
        if self.options.std_cs
            && let Some(cs) = &self.color.color_space
        {
            let info = ColorInfo {
                color_space: Some(cs.clone().with_std_conversion()),
                ..self.color.clone()
            };

            return info.build_palette();
        }

        self.color.build_palette()
    }

    fn start_mask(&mut self, ctx: &LoadContext<'_>) -> LoadState {
        self.matte = 0xFFFFFFFF;

        let dict = self.stream.dict();

        let mask_stream = if let Some((width, height, alpha)) = self.jpx_alpha.take() {
            let mask_dict = Dict::new()
                .with(COLOR_SPACE, Object::name("DeviceGray"))
                .with(BITS_PER_COMPONENT, 8_i64)
                .with(WIDTH, i64::from(width))
                .with(HEIGHT, i64::from(height));

            Stream::new(mask_dict, alpha)
        } else if let Some(smask) = dict.get::<&Stream>(SMASK) {
            if let Some(matte) = smask.dict().get::<Vec<f32>>(MATTE)
                && let Some(cs) = &self.color.color_space
                && cs.family() != Family::Pattern
                && matte.len() == self.color.components as usize
                && cs.component_count() <= self.color.components
            {
                self.matte = argb_from_rgb(0, cs.rgb_or_black(&matte));
            }

            smask.clone()
        } else if let Some(mask) = dict.get::<&Stream>(MASK) {
            mask.clone()
        } else {
            return LoadState::Success;
        };

        let options = LoadOptions {
            has_mask: false,
            std_cs: true,
            group_family: None,
            load_mask: false,
            max_size: None,
        };
        let ctx = ctx.with_resources(None, None);

        let mut mask = Box::new(Self::new(mask_stream));

        match mask.start_load(&ctx, options) {
            LoadState::Fail => {
                lwarn!("dropping mask of image {}", self.stream.cache_key());

                LoadState::Success
            }
            state => {
                self.mask = Some(mask);

                state
            }
        }
    }

    fn mask_pending(&self) -> bool {
        self.mask
            .as_ref()
            .is_some_and(|m| m.state() == LoadState::Continue)
    }

    fn continue_mask(&mut self, pause: Option<&mut dyn PauseIndicator>) -> LoadState {
        let Some(mask) = &mut self.mask else {
            return LoadState::Success;
        };

        match mask.continue_load(pause) {
            LoadState::Continue => LoadState::Continue,
            LoadState::Success => LoadState::Success,
            LoadState::Fail => {
                lwarn!("dropping mask of image {}", self.stream.cache_key());

                self.mask = None;

                LoadState::Success
            }
        }
    }
}

impl PixelSource for SampleSource {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn format(&self) -> PixelFormat {
        self.format
    }

    fn palette(&self) -> Option<&[u32]> {
        self.palette.as_deref()
    }

    /// Return the row at `line`. A source that failed to load returns an
    /// empty row.
    fn scanline(&mut self, line: u32) -> &[u8] {
        if self.state == LoadState::Fail {
            return &[];
        }

        self.produce_scanline(line)
    }

    fn skip_to_scanline(&mut self, line: u32, pause: Option<&mut dyn PauseIndicator>) -> bool {
        self.decoder
            .as_deref_mut()
            .is_some_and(|d| d.skip_to_scanline(line, pause))
    }
}
