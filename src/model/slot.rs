//! Externally driven property overrides.
//!
//! A [`Slot`] binds one slot id to every property in the composition carrying that id. Values
//! written through a slot replace the bound properties; the first write after a reset keeps
//! the originals so [`Slot::reset`] can put them back.

use std::collections::BTreeMap;
use std::sync::Arc;

use kurbo::Vec2;

use crate::color::remap::ColorRemap;
use crate::foundation::core::Rgb8;
use crate::model::composition::Asset;
use crate::model::gradient::{ColorStops, Gradient};
use crate::model::group::Group;
use crate::model::layer::Layer;
use crate::model::object::{ImageData, Object, Position, Transform};
use crate::model::property::Property;
use crate::model::text::TextDocument;

/// Discriminant of a [`PropertyValue`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum PropertyKind {
    Position,
    Scale,
    Rotation,
    Opacity,
    Color,
    ColorStop,
    TextDoc,
    Image,
}

/// A value that can be written through a slot.
#[derive(Clone, Debug, PartialEq)]
pub enum PropertyValue {
    /// Transform position.
    Position(Position),
    /// Transform scale in percent.
    Scale(Property<Vec2>),
    /// Transform rotation in degrees.
    Rotation(Property<f32>),
    /// Transform or solid style opacity in percent.
    Opacity(Property<f32>),
    /// Solid fill or stroke color.
    Color(Property<Rgb8>),
    /// Gradient stop samples.
    ColorStop(ColorStops),
    /// Text document.
    TextDoc(Property<TextDocument>),
    /// Image payload.
    Image(ImageData),
}

impl PropertyValue {
    /// Discriminant.
    pub fn kind(&self) -> PropertyKind {
        match self {
            Self::Position(_) => PropertyKind::Position,
            Self::Scale(_) => PropertyKind::Scale,
            Self::Rotation(_) => PropertyKind::Rotation,
            Self::Opacity(_) => PropertyKind::Opacity,
            Self::Color(_) => PropertyKind::Color,
            Self::ColorStop(_) => PropertyKind::ColorStop,
            Self::TextDoc(_) => PropertyKind::TextDoc,
            Self::Image(_) => PropertyKind::Image,
        }
    }
}

/// Layer list a route starts from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RouteScope {
    /// The composition's root layers.
    Root,
    /// Layers of the precomp asset with this id.
    Asset(String),
}

/// Object a route ends at, inside the addressed layer.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RouteTarget {
    /// The layer's own transform.
    LayerTransform,
    /// Child indices from the layer's root group down to the object.
    Child(Vec<usize>),
}

/// Structural address of a slot-bound object.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ObjectRoute {
    /// Layer list.
    pub scope: RouteScope,
    /// Index into the layer list.
    pub layer: usize,
    /// Object inside the layer.
    pub target: RouteTarget,
}

/// One bound property and the value it held before the slot took over.
#[derive(Clone, Debug, PartialEq)]
pub struct SlotPair {
    /// Address of the owning object.
    pub route: ObjectRoute,
    backup: Option<PropertyValue>,
}

impl SlotPair {
    /// Pair without a backup.
    pub fn new(route: ObjectRoute) -> Self {
        Self {
            route,
            backup: None,
        }
    }

    /// `true` while an original value is held.
    pub fn has_backup(&self) -> bool {
        self.backup.is_some()
    }
}

/// All properties sharing one slot id.
#[derive(Clone, Debug, PartialEq)]
pub struct Slot {
    sid: String,
    kind: PropertyKind,
    pairs: Vec<SlotPair>,
    overridden: bool,
}

impl Slot {
    /// Empty slot.
    pub fn new(sid: impl Into<String>, kind: PropertyKind) -> Self {
        Self {
            sid: sid.into(),
            kind,
            pairs: Vec::new(),
            overridden: false,
        }
    }

    /// Slot id.
    pub fn sid(&self) -> &str {
        &self.sid
    }

    /// Kind every bound property shares.
    pub fn kind(&self) -> PropertyKind {
        self.kind
    }

    /// Bound properties.
    pub fn pairs(&self) -> &[SlotPair] {
        &self.pairs
    }

    /// `true` after a non-default assign, until the next reset.
    pub fn overridden(&self) -> bool {
        self.overridden
    }

    /// Bind one more property.
    pub fn push(&mut self, route: ObjectRoute) {
        self.pairs.push(SlotPair::new(route));
    }

    /// Write `value` into every bound property.
    ///
    /// The first write that is neither a document default nor a repeat keeps the displaced
    /// originals. Color values pass through `remap` first. A value of the wrong kind, or a
    /// route that no longer resolves, is ignored.
    pub fn assign(
        &mut self,
        layers: &mut [Layer],
        assets: &mut BTreeMap<String, Arc<Asset>>,
        value: &PropertyValue,
        by_default: bool,
        remap: &ColorRemap,
    ) {
        if value.kind() != self.kind || self.pairs.is_empty() {
            return;
        }
        let value = match value {
            PropertyValue::Color(c) if !remap.is_empty() => PropertyValue::Color(remap_color(c, remap)),
            v => v.clone(),
        };

        let copy = !self.overridden && !by_default;
        for pair in &mut self.pairs {
            let Some(target) = resolve(layers, assets, &pair.route) else {
                tracing::debug!(sid = %self.sid, route = ?pair.route, "slot route no longer resolves");
                continue;
            };
            let Some(old) = target.swap(value.clone(), remap) else {
                continue;
            };
            if copy {
                pair.backup = Some(old);
            }
        }
        if !by_default {
            self.overridden = true;
        }
    }

    /// Restore every backed-up original and clear the override.
    pub fn reset(
        &mut self,
        layers: &mut [Layer],
        assets: &mut BTreeMap<String, Arc<Asset>>,
        remap: &ColorRemap,
    ) {
        if !self.overridden {
            return;
        }
        for pair in &mut self.pairs {
            let Some(backup) = pair.backup.take() else {
                continue;
            };
            if let Some(target) = resolve(layers, assets, &pair.route) {
                target.swap(backup, remap);
            }
        }
        self.overridden = false;
    }
}

fn remap_color(c: &Property<Rgb8>, remap: &ColorRemap) -> Property<Rgb8> {
    let mut out = c.clone();
    out.value = remap.apply(out.value);
    for k in out.frames.iter_mut().flatten() {
        k.value = remap.apply(k.value);
    }
    out
}

/// Mutable view of the object a route points at.
enum TargetMut<'a> {
    Transform(&'a mut Transform),
    Object(&'a mut Object),
}

fn resolve<'a>(
    layers: &'a mut [Layer],
    assets: &'a mut BTreeMap<String, Arc<Asset>>,
    route: &ObjectRoute,
) -> Option<TargetMut<'a>> {
    let layers: &mut [Layer] = match &route.scope {
        RouteScope::Root => layers,
        RouteScope::Asset(id) => match Arc::make_mut(assets.get_mut(id)?) {
            Asset::Precomp(p) => &mut p.layers,
            Asset::Image(_) => return None,
        },
    };
    let layer = layers.get_mut(route.layer)?;
    match &route.target {
        RouteTarget::LayerTransform => Some(TargetMut::Transform(&mut layer.transform)),
        RouteTarget::Child(path) => {
            let (last, head) = path.split_last()?;
            let mut group = &mut layer.group;
            for &i in head {
                match group.children.get_mut(i)? {
                    Object::Group(g) => group = g,
                    _ => return None,
                }
            }
            group.children.get_mut(*last).map(TargetMut::Object)
        }
    }
}

impl TargetMut<'_> {
    /// Write `value` and hand back the displaced one. `None` when the target has no property
    /// of that kind.
    fn swap(self, value: PropertyValue, remap: &ColorRemap) -> Option<PropertyValue> {
        use PropertyValue as V;
        match self {
            Self::Transform(t) => swap_transform(t, value),
            Self::Object(obj) => match (obj, value) {
                (Object::Transform(t), v) => swap_transform(t, v),
                (Object::SolidFill(f), V::Color(c)) => Some(V::Color(replace(&mut f.color, c))),
                (Object::SolidFill(f), V::Opacity(o)) => Some(V::Opacity(replace(&mut f.opacity, o))),
                (Object::SolidStroke(s), V::Color(c)) => Some(V::Color(replace(&mut s.color, c))),
                (Object::SolidStroke(s), V::Opacity(o)) => {
                    Some(V::Opacity(replace(&mut s.opacity, o)))
                }
                (Object::GradientFill(g), V::ColorStop(s)) => {
                    Some(V::ColorStop(swap_stops(&mut g.gradient, s, remap)))
                }
                (Object::GradientStroke(g), V::ColorStop(s)) => {
                    Some(V::ColorStop(swap_stops(&mut g.gradient, s, remap)))
                }
                (Object::Text(t), V::TextDoc(d)) => Some(V::TextDoc(replace(&mut t.doc, d))),
                (Object::Image(i), V::Image(d)) => Some(V::Image(std::mem::replace(&mut i.data, d))),
                _ => None,
            },
        }
    }
}

fn swap_transform(t: &mut Transform, value: PropertyValue) -> Option<PropertyValue> {
    use PropertyValue as V;
    match value {
        V::Position(p) => Some(V::Position(std::mem::replace(&mut t.position, p))),
        V::Scale(s) => Some(V::Scale(replace(&mut t.scale, s))),
        V::Rotation(r) => Some(V::Rotation(replace(&mut t.rotation, r))),
        V::Opacity(o) => Some(V::Opacity(replace(&mut t.opacity, o))),
        _ => None,
    }
}

fn swap_stops(g: &mut Gradient, stops: ColorStops, remap: &ColorRemap) -> ColorStops {
    let old = std::mem::replace(&mut g.stops, stops);
    g.prepare(remap);
    old
}

/// Swap in `value`, keeping the slot id on whichever property sits in the tree.
fn replace<T>(dst: &mut Property<T>, mut value: Property<T>) -> Property<T> {
    value.sid = dst.sid.take();
    let mut old = std::mem::replace(dst, value);
    old.sid = dst.sid.clone();
    old
}

/// Walk the composition and gather one [`Slot`] per slot id, in first-seen order.
///
/// A slot id reused for a property of another kind keeps only the properties of the
/// first kind seen.
pub fn collect(layers: &[Layer], assets: &BTreeMap<String, Arc<Asset>>) -> Vec<Slot> {
    let mut out = Vec::new();
    walk_layers(&mut out, RouteScope::Root, layers);
    for (id, asset) in assets {
        if let Asset::Precomp(p) = asset.as_ref() {
            walk_layers(&mut out, RouteScope::Asset(id.clone()), &p.layers);
        }
    }
    out
}

fn bind(out: &mut Vec<Slot>, sid: Option<&String>, kind: PropertyKind, route: impl FnOnce() -> ObjectRoute) {
    let Some(sid) = sid else {
        return;
    };
    match out.iter_mut().find(|s| s.sid == *sid) {
        Some(slot) if slot.kind == kind => slot.push(route()),
        Some(slot) => {
            tracing::warn!(%sid, expected = ?slot.kind, found = ?kind, "slot id bound to mixed kinds");
        }
        None => {
            let mut slot = Slot::new(sid.clone(), kind);
            slot.push(route());
            out.push(slot);
        }
    }
}

fn walk_layers(out: &mut Vec<Slot>, scope: RouteScope, layers: &[Layer]) {
    for (li, layer) in layers.iter().enumerate() {
        let route = |target: RouteTarget| ObjectRoute {
            scope: scope.clone(),
            layer: li,
            target,
        };
        walk_transform(out, &layer.transform, &|| route(RouteTarget::LayerTransform));
        walk_group(out, &layer.group, &mut Vec::new(), &|path: &[usize]| {
            route(RouteTarget::Child(path.to_vec()))
        });
    }
}

fn walk_transform(out: &mut Vec<Slot>, t: &Transform, route: &dyn Fn() -> ObjectRoute) {
    if let Position::Combined(p) = &t.position {
        bind(out, p.sid.as_ref(), PropertyKind::Position, route);
    }
    bind(out, t.scale.sid.as_ref(), PropertyKind::Scale, route);
    bind(out, t.rotation.sid.as_ref(), PropertyKind::Rotation, route);
    bind(out, t.opacity.sid.as_ref(), PropertyKind::Opacity, route);
}

fn walk_group(
    out: &mut Vec<Slot>,
    group: &Group,
    path: &mut Vec<usize>,
    route: &dyn Fn(&[usize]) -> ObjectRoute,
) {
    for (i, child) in group.children.iter().enumerate() {
        path.push(i);
        let here = || route(path.as_slice());
        match child {
            Object::Group(g) => walk_group(out, g, path, route),
            Object::Transform(t) => walk_transform(out, t, &here),
            Object::SolidFill(f) => {
                bind(out, f.color.sid.as_ref(), PropertyKind::Color, here);
                bind(out, f.opacity.sid.as_ref(), PropertyKind::Opacity, here);
            }
            Object::SolidStroke(s) => {
                bind(out, s.color.sid.as_ref(), PropertyKind::Color, here);
                bind(out, s.opacity.sid.as_ref(), PropertyKind::Opacity, here);
            }
            Object::GradientFill(g) => {
                bind(out, g.gradient.stops.input.sid.as_ref(), PropertyKind::ColorStop, here)
            }
            Object::GradientStroke(g) => {
                bind(out, g.gradient.stops.input.sid.as_ref(), PropertyKind::ColorStop, here)
            }
            Object::Text(t) => bind(out, t.doc.sid.as_ref(), PropertyKind::TextDoc, here),
            Object::Image(img) => bind(out, img.sid.as_ref(), PropertyKind::Image, here),
            _ => {}
        }
        path.pop();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/model/slot.rs"]
mod tests;
