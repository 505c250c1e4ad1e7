//! The loaded document: header, layers, shared assets and lookup tables.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use kurbo::BezPath;

use crate::color::remap::ColorRemap;
use crate::model::interpolator::Interpolator;
use crate::model::layer::Layer;
use crate::model::object::ImageData;
use crate::model::slot::{self, PropertyValue, Slot};

/// Layers of a precomposition asset.
#[derive(Clone, Debug, Default)]
pub struct Precomp {
    /// Layers, topmost first.
    pub layers: Vec<Layer>,
}

/// Shared asset referenced by `refId`.
#[derive(Clone, Debug)]
pub enum Asset {
    /// Nested composition.
    Precomp(Precomp),
    /// Bitmap payload.
    Image(ImageData),
}

/// Named time range.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Marker {
    /// Marker name.
    pub name: String,
    /// First frame.
    pub time: f32,
    /// Length in frames.
    pub duration: f32,
}

/// Font declaration from the `fonts` table.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Font {
    /// Name referenced by text documents.
    pub name: String,
    /// Family.
    pub family: String,
    /// Style (`Regular`, `Bold`, ...).
    pub style: String,
    /// Ascent in percent of the size.
    pub ascent: f32,
}

/// Embedded glyph outline from the `chars` table.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Glyph {
    /// The character, possibly a multi-byte sequence.
    pub ch: String,
    /// Family this glyph belongs to.
    pub family: String,
    /// Style this glyph belongs to.
    pub style: String,
    /// Design size the outline is drawn at.
    pub size: f32,
    /// Advance width at the design size.
    pub advance: f32,
    /// Outline at the design size, y pointing down, baseline at zero.
    pub outline: BezPath,
}

/// Interned easing curves keyed by their tangent bits.
#[derive(Clone, Debug, Default)]
pub struct InterpolatorTable {
    by_key: HashMap<[u32; 4], Arc<Interpolator>>,
}

impl InterpolatorTable {
    /// Shared curve for the given tangents, created on first use.
    pub fn intern(&mut self, out_tangent: (f32, f32), in_tangent: (f32, f32)) -> Arc<Interpolator> {
        let key = [
            out_tangent.0.to_bits(),
            out_tangent.1.to_bits(),
            in_tangent.0.to_bits(),
            in_tangent.1.to_bits(),
        ];
        Arc::clone(
            self.by_key
                .entry(key)
                .or_insert_with(|| Arc::new(Interpolator::new(out_tangent, in_tangent))),
        )
    }

    /// Number of distinct curves.
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// `true` when no curve is interned.
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }
}

/// Root container of a loaded animation.
#[derive(Clone, Debug)]
pub struct Composition {
    /// Format version string.
    pub version: Option<String>,
    /// Document name.
    pub name: Option<String>,
    /// Frames per second.
    pub frame_rate: f32,
    /// First frame.
    pub in_frame: f32,
    /// End frame (exclusive).
    pub out_frame: f32,
    /// Canvas width.
    pub width: f32,
    /// Canvas height.
    pub height: f32,
    /// Root layers, topmost first.
    pub layers: Vec<Layer>,
    /// Shared assets by id.
    pub assets: BTreeMap<String, Arc<Asset>>,
    /// Font declarations.
    pub fonts: Vec<Font>,
    /// Embedded glyphs.
    pub glyphs: Vec<Glyph>,
    /// Named time ranges.
    pub markers: Vec<Marker>,
    /// Slot bindings.
    pub slots: Vec<Slot>,
    /// Shared easing curves.
    pub interpolators: InterpolatorTable,
}

impl Default for Composition {
    fn default() -> Self {
        Self {
            version: None,
            name: None,
            frame_rate: 30.0,
            in_frame: 0.0,
            out_frame: 0.0,
            width: 0.0,
            height: 0.0,
            layers: Vec::new(),
            assets: BTreeMap::new(),
            fonts: Vec::new(),
            glyphs: Vec::new(),
            markers: Vec::new(),
            slots: Vec::new(),
            interpolators: InterpolatorTable::default(),
        }
    }
}

impl Composition {
    /// Number of frames between the in and out points.
    pub fn frame_count(&self) -> f32 {
        (self.out_frame - self.in_frame).max(0.0)
    }

    /// Duration in seconds.
    pub fn duration(&self) -> f32 {
        if self.frame_rate <= 0.0 {
            return 0.0;
        }
        self.frame_count() / self.frame_rate
    }

    /// Frame number at `seconds`, clamped at the start.
    pub fn frame_at_time(&self, seconds: f32) -> f32 {
        seconds.max(0.0) * self.frame_rate
    }

    /// Marker with the given name.
    pub fn marker(&self, name: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.name == name)
    }

    /// Precomp asset layers by id.
    pub fn precomp(&self, id: &str) -> Option<&Precomp> {
        match self.assets.get(id)?.as_ref() {
            Asset::Precomp(p) => Some(p),
            Asset::Image(_) => None,
        }
    }

    /// Image asset payload by id.
    pub fn image(&self, id: &str) -> Option<&ImageData> {
        match self.assets.get(id)?.as_ref() {
            Asset::Image(d) => Some(d),
            Asset::Precomp(_) => None,
        }
    }

    /// Run the one-time prepare pass on every layer, asset layers included, then gather the
    /// slot bindings.
    pub fn prepare(&mut self) {
        for layer in &mut self.layers {
            layer.prepare();
        }
        for asset in self.assets.values_mut() {
            if let Asset::Precomp(p) = Arc::make_mut(asset) {
                for layer in &mut p.layers {
                    layer.prepare();
                }
            }
        }
        self.slots = slot::collect(&self.layers, &self.assets);
    }

    /// Slot by id.
    pub fn slot(&self, sid: &str) -> Option<&Slot> {
        self.slots.iter().find(|s| s.sid() == sid)
    }

    /// Write `value` through the slot `sid`. Returns `false` for an unknown id.
    pub fn assign_slot(
        &mut self,
        sid: &str,
        value: &PropertyValue,
        by_default: bool,
        remap: &ColorRemap,
    ) -> bool {
        let Some(slot) = self.slots.iter_mut().find(|s| s.sid() == sid) else {
            return false;
        };
        slot.assign(&mut self.layers, &mut self.assets, value, by_default, remap);
        true
    }

    /// Restore the originals behind slot `sid`. Returns `false` for an unknown id.
    pub fn reset_slot(&mut self, sid: &str, remap: &ColorRemap) -> bool {
        let Some(slot) = self.slots.iter_mut().find(|s| s.sid() == sid) else {
            return false;
        };
        slot.reset(&mut self.layers, &mut self.assets, remap);
        true
    }

    /// Restore every overridden slot.
    pub fn reset_slots(&mut self, remap: &ColorRemap) {
        for slot in &mut self.slots {
            slot.reset(&mut self.layers, &mut self.assets, remap);
        }
    }
}
