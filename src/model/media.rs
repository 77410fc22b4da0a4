//! Loaded media held by a view: decoded images, videos and their frames.

use std::cell::RefCell;
use std::rc::Rc;

use image::{DynamicImage, ImageBuffer, Luma, Rgba, RgbaImage};
use serde::{Deserialize, Serialize};

use crate::frame_store::FrameStore;
use crate::index_map::FrameIndex;
use crate::model::ItemId;

/// Quality tier of a decoded frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Quality {
    /// Low quality, loaded first for responsiveness
    Low,
    /// High quality, loaded once the frame is current
    High,
}

impl Quality {
    pub fn name(&self) -> &'static str {
        match self {
            Quality::Low => "lq",
            Quality::High => "hq",
        }
    }
}

/// Intensity window applied before display.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WindowLevels {
    pub low: f32,
    pub high: f32,
}

impl WindowLevels {
    pub fn new(low: f32, high: f32) -> Self {
        Self { low, high }
    }

    /// Full range for 8-bit data.
    pub fn full_8bit() -> Self {
        Self::new(0.0, 255.0)
    }

    /// Full range for 16-bit data.
    pub fn full_16bit() -> Self {
        Self::new(0.0, f32::from(u16::MAX))
    }

    /// Map a raw intensity into `0..=255`.
    pub fn apply(&self, v: f32) -> u8 {
        if v <= self.low {
            0
        } else if v >= self.high {
            255
        } else {
            ((v - self.low) * 255.0 / (self.high - self.low)) as u8
        }
    }
}

/// Color map applied to single-channel intensities.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMap {
    /// RGB data is windowed per channel; 16-bit data is shown as gray
    #[default]
    Default,
    Gray,
    Inverted,
}

impl ColorMap {
    fn map(&self, sv: u8) -> Rgba<u8> {
        match self {
            ColorMap::Default | ColorMap::Gray => Rgba([sv, sv, sv, 255]),
            ColorMap::Inverted => Rgba([255 - sv, 255 - sv, 255 - sv, 255]),
        }
    }
}

/// Per-view display settings that invalidate transformed image data.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageSettings {
    /// `None` means the full range of the source data
    pub window_levels: Option<WindowLevels>,
    pub color_map: ColorMap,
}

struct Transformed {
    settings: ImageSettings,
    image: Rc<RgbaImage>,
}

/// Decoded bitmap ready for drawing, with a single-entry transform cache.
pub struct RenderableImage {
    data: Rc<RgbaImage>,
    raw16: Option<ImageBuffer<Luma<u16>, Vec<u16>>>,
    transformed: RefCell<Option<Transformed>>,
}

impl RenderableImage {
    pub fn new(data: RgbaImage) -> Self {
        Self {
            data: Rc::new(data),
            raw16: None,
            transformed: RefCell::new(None),
        }
    }

    /// Wrap a decoded image, keeping 16-bit intensities for windowing.
    pub fn from_dynamic(image: DynamicImage) -> Self {
        let raw16 = match &image {
            DynamicImage::ImageLuma16(buf) => Some(buf.clone()),
            _ => None,
        };
        Self {
            data: Rc::new(image.to_rgba8()),
            raw16,
            transformed: RefCell::new(None),
        }
    }

    pub fn width(&self) -> u32 {
        self.data.width()
    }

    pub fn height(&self) -> u32 {
        self.data.height()
    }

    /// The untransformed bitmap.
    pub fn data(&self) -> &Rc<RgbaImage> {
        &self.data
    }

    pub fn has_raw16(&self) -> bool {
        self.raw16.is_some()
    }

    /// Bitmap to draw under `settings`.
    ///
    /// The transformed bitmap is recomputed only when `settings` differ from the
    /// ones used for the cached result.
    pub fn resolve(&self, settings: &ImageSettings) -> Rc<RgbaImage> {
        if let Some(cached) = self.transformed.borrow().as_ref() {
            if cached.settings == *settings {
                return Rc::clone(&cached.image);
            }
        }

        let image = self.transform(settings);
        *self.transformed.borrow_mut() = Some(Transformed {
            settings: *settings,
            image: Rc::clone(&image),
        });
        image
    }

    fn transform(&self, settings: &ImageSettings) -> Rc<RgbaImage> {
        if let Some(raw) = &self.raw16 {
            let levels = settings.window_levels.unwrap_or_else(WindowLevels::full_16bit);
            let out = ImageBuffer::from_fn(raw.width(), raw.height(), |x, y| {
                let v = f32::from(raw.get_pixel(x, y).0[0]);
                settings.color_map.map(levels.apply(v))
            });
            return Rc::new(out);
        }

        let levels = settings.window_levels.unwrap_or_else(WindowLevels::full_8bit);
        match settings.color_map {
            ColorMap::Default => {
                if levels == WindowLevels::full_8bit() {
                    return Rc::clone(&self.data);
                }
                let mut out = (*self.data).clone();
                for px in out.pixels_mut() {
                    let [r, g, b, _] = px.0;
                    *px = Rgba([
                        levels.apply(f32::from(r)),
                        levels.apply(f32::from(g)),
                        levels.apply(f32::from(b)),
                        255,
                    ]);
                }
                Rc::new(out)
            }
            map => {
                let out = ImageBuffer::from_fn(self.data.width(), self.data.height(), |x, y| {
                    let [r, g, b, _] = self.data.get_pixel(x, y).0;
                    let grey = f32::from(r) * 0.3 + f32::from(g) * 0.59 + f32::from(b) * 0.11;
                    map.map(levels.apply(grey))
                });
                Rc::new(out)
            }
        }
    }
}

impl std::fmt::Debug for RenderableImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderableImage")
            .field("width", &self.width())
            .field("height", &self.height())
            .field("raw16", &self.raw16.is_some())
            .finish()
    }
}

/// A single image resolved for a view.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub id: ItemId,
    pub dataset_image_id: Option<u64>,
    pub width: u32,
    pub height: u32,
    pub data: Option<Rc<RenderableImage>>,
}

impl LoadedImage {
    pub fn new(id: ItemId, data: RenderableImage) -> Self {
        Self {
            id,
            dataset_image_id: None,
            width: data.width(),
            height: data.height(),
            data: Some(Rc::new(data)),
        }
    }
}

/// One frame of a multi-frame item with two independently loaded tiers.
///
/// Tier data can only be set, never cleared, so the loaded flags move
/// false to true exactly once.
#[derive(Debug, Clone)]
pub struct FrameRecord {
    pub seq: u64,
    pub hq_url: Option<String>,
    pub lq_url: String,
    hq_data: Option<Rc<RenderableImage>>,
    lq_data: Option<Rc<RenderableImage>>,
}

impl FrameRecord {
    pub fn new(seq: u64, lq_url: impl Into<String>, hq_url: Option<String>) -> Self {
        Self {
            seq,
            hq_url,
            lq_url: lq_url.into(),
            hq_data: None,
            lq_data: None,
        }
    }

    pub fn url(&self, quality: Quality) -> Option<&str> {
        match quality {
            Quality::Low => Some(&self.lq_url),
            Quality::High => self.hq_url.as_deref(),
        }
    }

    pub fn is_loaded(&self, quality: Quality) -> bool {
        self.data(quality).is_some()
    }

    pub fn lq_data_loaded(&self) -> bool {
        self.lq_data.is_some()
    }

    pub fn hq_data_loaded(&self) -> bool {
        self.hq_data.is_some()
    }

    pub fn data(&self, quality: Quality) -> Option<&Rc<RenderableImage>> {
        match quality {
            Quality::Low => self.lq_data.as_ref(),
            Quality::High => self.hq_data.as_ref(),
        }
    }

    /// Best available tier for drawing: hq first, then lq.
    pub fn best(&self) -> Option<&Rc<RenderableImage>> {
        self.hq_data.as_ref().or(self.lq_data.as_ref())
    }

    /// Store decoded data for a tier. Returns false if the tier was already loaded.
    pub(crate) fn set_data(&mut self, quality: Quality, data: Rc<RenderableImage>) -> bool {
        let slot = match quality {
            Quality::Low => &mut self.lq_data,
            Quality::High => &mut self.hq_data,
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(data);
        true
    }
}

/// A multi-frame item resolved for a view.
#[derive(Debug, Clone)]
pub struct LoadedVideo {
    pub id: ItemId,
    pub frames: FrameStore,
    pub current_frame_index: FrameIndex,
    pub fps: Option<f32>,
}

impl LoadedVideo {
    pub fn new(id: ItemId, frames: FrameStore) -> Self {
        let current_frame_index = frames.first_index().unwrap_or(FrameIndex(0));
        Self {
            id,
            frames,
            current_frame_index,
            fps: None,
        }
    }

    pub fn with_fps(mut self, fps: f32) -> Self {
        self.fps = Some(fps);
        self
    }
}
