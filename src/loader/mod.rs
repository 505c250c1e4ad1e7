//! Document loading: JSON bytes to a prepared [`Composition`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::color::remap::ColorRemap;
use crate::foundation::error::{KinegraphError, KinegraphResult};
use crate::loader::convert::{Converter, image_asset};
use crate::loader::raw::{RawComposition, RawSlot};
use crate::model::composition::{Asset, Composition, Font, Marker, Precomp};
use crate::model::object::ImageObject;
use crate::model::slot::PropertyValue;

pub(crate) mod convert;
pub(crate) mod raw;
pub(crate) mod value;

/// Load-time options.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// `(source, replacement)` color pairs as `0xAARRGGBB`. Alpha is ignored.
    pub color_pairs: Vec<(u32, u32)>,
    /// Shift every color by the offset between the first pair instead of exact matching.
    pub offset_mode: bool,
}

impl LoadOptions {
    /// Color remap table these options describe.
    pub fn remap(&self) -> ColorRemap {
        ColorRemap::from_pairs(&self.color_pairs, self.offset_mode)
    }
}

/// Parse and prepare a composition.
///
/// Document slot values are applied as the new defaults before this returns.
#[tracing::instrument(level = "debug", skip_all, fields(bytes = bytes.len()))]
pub fn parse(bytes: &[u8], opts: &LoadOptions) -> KinegraphResult<Composition> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(KinegraphError::load("empty composition data"));
    }
    let raw: RawComposition = serde_json::from_slice(bytes)
        .map_err(|e| KinegraphError::load(format!("malformed composition: {e}")))?;
    if !(raw.w >= 1.0 && raw.h >= 1.0) {
        return Err(KinegraphError::load(format!(
            "composition size {}x{} is smaller than 1x1",
            raw.w, raw.h
        )));
    }
    if !(raw.fr > 0.0 && raw.fr.is_finite()) {
        return Err(KinegraphError::load(format!("invalid frame rate {}", raw.fr)));
    }
    if raw.op < raw.ip {
        return Err(KinegraphError::load(format!(
            "out point {} precedes in point {}",
            raw.op, raw.ip
        )));
    }

    let remap = opts.remap();
    let mut comp = Composition {
        version: raw.v.clone(),
        name: raw.nm.clone(),
        frame_rate: raw.fr,
        in_frame: raw.ip,
        out_frame: raw.op,
        width: raw.w,
        height: raw.h,
        fonts: raw
            .fonts
            .iter()
            .flat_map(|f| &f.list)
            .map(|f| Font {
                name: f.name.clone(),
                family: f.family.clone(),
                style: f.style.clone(),
                ascent: f.ascent,
            })
            .collect(),
        markers: raw
            .markers
            .iter()
            .map(|m| Marker {
                name: m.cm.clone(),
                time: m.tm,
                duration: m.dr,
            })
            .collect(),
        ..Composition::default()
    };

    let images: HashMap<String, ImageObject> = raw
        .assets
        .iter()
        .filter(|a| a.layers.is_none())
        .map(|a| (a.id.clone(), image_asset(a)))
        .collect();

    let mut cv = Converter::new(&mut comp.interpolators, &remap, &images);
    let layers = cv.layers(&raw.layers);
    let mut assets = BTreeMap::new();
    for a in &raw.assets {
        let asset = match (&a.layers, images.get(&a.id)) {
            (Some(layers), _) => Asset::Precomp(Precomp {
                layers: cv.layers(layers),
            }),
            (None, Some(img)) => Asset::Image(img.data.clone()),
            (None, None) => continue,
        };
        assets.insert(a.id.clone(), Arc::new(asset));
    }
    let glyphs = raw.chars.iter().map(|c| cv.glyph(c)).collect();

    comp.layers = layers;
    comp.assets = assets;
    comp.glyphs = glyphs;
    comp.prepare();

    for (sid, value) in slot_values(&mut comp, &raw.slots, &remap) {
        comp.assign_slot(&sid, &value, true, &remap);
    }

    tracing::debug!(
        layers = comp.layers.len(),
        assets = comp.assets.len(),
        slots = comp.slots.len(),
        frames = comp.frame_count(),
        "composition loaded"
    );
    Ok(comp)
}

/// Parse a slot override document `{"<sid>": {"p": <value>}, ...}`.
///
/// Unknown ids and values that do not fit their slot are skipped.
pub(crate) fn parse_slot_overrides(
    comp: &mut Composition,
    json: &str,
    remap: &ColorRemap,
) -> KinegraphResult<Vec<(String, PropertyValue)>> {
    let doc: BTreeMap<String, RawSlot> = serde_json::from_str(json)?;
    Ok(slot_values(comp, &doc, remap))
}

fn slot_values(
    comp: &mut Composition,
    doc: &BTreeMap<String, RawSlot>,
    remap: &ColorRemap,
) -> Vec<(String, PropertyValue)> {
    let kinds: Vec<_> = doc
        .iter()
        .filter_map(|(sid, raw)| match comp.slot(sid) {
            Some(slot) => Some((sid.clone(), slot.kind(), &raw.p)),
            None => {
                tracing::debug!(sid = %sid, "no property is bound to slot");
                None
            }
        })
        .collect();

    let images = HashMap::new();
    let mut cv = Converter::new(&mut comp.interpolators, remap, &images);
    kinds
        .into_iter()
        .filter_map(|(sid, kind, p)| match cv.slot_value(kind, p) {
            Some(v) => Some((sid, v)),
            None => {
                tracing::warn!(sid = %sid, ?kind, "slot value does not fit its property");
                None
            }
        })
        .collect()
}

#[cfg(test)]
#[path = "../../tests/unit/loader/mod.rs"]
mod tests;
