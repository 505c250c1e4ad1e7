//! Serde mirror of the document format. Field names follow the format's short keys.

use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `true`, `1`, `1.0` are all set; anything else, `null` included, is unset.
pub(crate) fn flag<'de, D: Deserializer<'de>>(d: D) -> Result<bool, D::Error> {
    Ok(match Value::deserialize(d)? {
        Value::Bool(b) => b,
        Value::Number(n) => n.as_f64().is_some_and(|v| v != 0.0),
        _ => false,
    })
}

fn yes() -> bool {
    true
}

fn default_frame_rate() -> f32 {
    30.0
}

fn default_stretch() -> f32 {
    1.0
}

/// Animatable property: `{"a": 0|1, "k": ..., "sid": ...}`.
///
/// The `a` flag is ignored; keyframe lists are recognized by their shape.
#[derive(Clone, Debug, Default, Deserialize)]
pub(crate) struct RawProp {
    #[serde(default)]
    pub k: Value,
    #[serde(default)]
    pub sid: Option<String>,
    #[serde(default)]
    pub x: Option<Value>,
}

/// Easing tangent. Either component may be a scalar or a per-dimension array.
#[derive(Clone, Debug, Deserialize)]
pub(crate) struct RawTangent {
    pub x: Value,
    pub y: Value,
}

#[derive(Clone, Debug, Deserialize)]
pub(crate) struct RawKeyframe {
    #[serde(default)]
    pub t: f32,
    #[serde(default)]
    pub s: Option<Value>,
    #[serde(default)]
    pub e: Option<Value>,
    #[serde(default)]
    pub i: Option<RawTangent>,
    #[serde(default)]
    pub o: Option<RawTangent>,
    #[serde(default, deserialize_with = "flag")]
    pub h: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawComposition {
    #[serde(default)]
    pub v: Option<String>,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default = "default_frame_rate")]
    pub fr: f32,
    #[serde(default)]
    pub ip: f32,
    #[serde(default)]
    pub op: f32,
    pub w: f32,
    pub h: f32,
    #[serde(default)]
    pub layers: Vec<RawLayer>,
    #[serde(default)]
    pub assets: Vec<RawAsset>,
    #[serde(default)]
    pub fonts: Option<RawFonts>,
    #[serde(default)]
    pub chars: Vec<RawChar>,
    #[serde(default)]
    pub markers: Vec<RawMarker>,
    #[serde(default)]
    pub slots: BTreeMap<String, RawSlot>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawSlot {
    #[serde(default)]
    pub p: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawAsset {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub layers: Option<Vec<RawLayer>>,
    #[serde(default)]
    pub w: Option<f32>,
    #[serde(default)]
    pub h: Option<f32>,
    #[serde(default)]
    pub u: Option<String>,
    #[serde(default)]
    pub p: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub e: bool,
    #[serde(default)]
    pub sid: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawFonts {
    #[serde(default)]
    pub list: Vec<RawFont>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawFont {
    #[serde(rename = "fName", default)]
    pub name: String,
    #[serde(rename = "fFamily", default)]
    pub family: String,
    #[serde(rename = "fStyle", default)]
    pub style: String,
    #[serde(default)]
    pub ascent: f32,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawChar {
    #[serde(default)]
    pub ch: String,
    #[serde(rename = "fFamily", default)]
    pub family: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub w: f32,
    #[serde(default)]
    pub data: Option<RawCharData>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawCharData {
    #[serde(default)]
    pub shapes: Vec<RawShape>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMarker {
    #[serde(default)]
    pub cm: String,
    #[serde(default)]
    pub tm: f32,
    #[serde(default)]
    pub dr: f32,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawTransform {
    #[serde(default)]
    pub a: Option<RawProp>,
    #[serde(default)]
    pub p: Option<Value>,
    #[serde(default)]
    pub s: Option<RawProp>,
    #[serde(default)]
    pub r: Option<RawProp>,
    #[serde(default)]
    pub rz: Option<RawProp>,
    #[serde(default)]
    pub sk: Option<RawProp>,
    #[serde(default)]
    pub sa: Option<RawProp>,
    #[serde(default)]
    pub o: Option<RawProp>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawLayer {
    #[serde(default = "null_layer")]
    pub ty: i64,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default)]
    pub ind: Option<f64>,
    #[serde(default)]
    pub parent: Option<f64>,
    #[serde(default)]
    pub ks: RawTransform,
    #[serde(default)]
    pub ip: f32,
    #[serde(default)]
    pub op: f32,
    #[serde(default)]
    pub st: f32,
    #[serde(default = "default_stretch")]
    pub sr: f32,
    #[serde(default)]
    pub tm: Option<RawProp>,
    #[serde(default, deserialize_with = "flag")]
    pub hd: bool,
    #[serde(rename = "masksProperties", default)]
    pub masks: Vec<RawMask>,
    #[serde(default)]
    pub tt: Option<i64>,
    #[serde(default, deserialize_with = "flag")]
    pub td: bool,
    #[serde(default)]
    pub bm: i64,
    #[serde(default)]
    pub ef: Vec<RawEffect>,
    #[serde(rename = "refId", default)]
    pub ref_id: Option<String>,
    #[serde(default)]
    pub w: Option<f32>,
    #[serde(default)]
    pub h: Option<f32>,
    #[serde(default)]
    pub sw: Option<f32>,
    #[serde(default)]
    pub sh: Option<f32>,
    #[serde(default)]
    pub sc: Option<String>,
    #[serde(default)]
    pub shapes: Vec<RawShape>,
    #[serde(default)]
    pub t: Option<RawText>,
}

fn null_layer() -> i64 {
    3
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawMask {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub pt: RawProp,
    #[serde(default)]
    pub o: Option<RawProp>,
    #[serde(default, deserialize_with = "flag")]
    pub inv: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawEffect {
    #[serde(default)]
    pub ty: i64,
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default = "yes", deserialize_with = "flag")]
    pub en: bool,
    #[serde(default)]
    pub ef: Vec<RawEffectValue>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawEffectValue {
    #[serde(default)]
    pub v: Option<RawProp>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawText {
    #[serde(default)]
    pub d: RawProp,
    #[serde(default)]
    pub a: Vec<RawTextAnimator>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTextAnimator {
    #[serde(default)]
    pub s: Option<RawSelector>,
    #[serde(default)]
    pub a: RawTextStyle,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawSelector {
    #[serde(default)]
    pub s: Option<RawProp>,
    #[serde(default)]
    pub e: Option<RawProp>,
    #[serde(default)]
    pub o: Option<RawProp>,
    #[serde(default)]
    pub r: Option<i64>,
    #[serde(default)]
    pub b: Option<i64>,
    #[serde(default)]
    pub sh: Option<i64>,
    #[serde(default)]
    pub xe: Option<RawProp>,
    #[serde(default)]
    pub ne: Option<RawProp>,
    #[serde(default)]
    pub a: Option<RawProp>,
    #[serde(default)]
    pub sm: Option<RawProp>,
    #[serde(default, deserialize_with = "flag")]
    pub rn: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawTextStyle {
    #[serde(default)]
    pub p: Option<RawProp>,
    #[serde(default)]
    pub s: Option<RawProp>,
    #[serde(default)]
    pub r: Option<RawProp>,
    #[serde(default)]
    pub o: Option<RawProp>,
    #[serde(default)]
    pub fc: Option<RawProp>,
    #[serde(default)]
    pub sc: Option<RawProp>,
    #[serde(default)]
    pub t: Option<RawProp>,
}

/// Text document value: `{"t": text, "f": font, "s": size, ...}`.
#[derive(Debug, Deserialize)]
pub(crate) struct RawTextDocument {
    #[serde(default)]
    pub t: String,
    #[serde(default)]
    pub f: String,
    #[serde(default)]
    pub s: Option<f32>,
    #[serde(default)]
    pub fc: Option<Value>,
    #[serde(default)]
    pub sc: Option<Value>,
    #[serde(default)]
    pub sw: f32,
    #[serde(default)]
    pub j: i64,
    #[serde(default)]
    pub tr: f32,
    #[serde(default)]
    pub lh: Option<f32>,
    #[serde(default)]
    pub ls: f32,
    #[serde(default)]
    pub sz: Option<[f32; 2]>,
    #[serde(default)]
    pub ps: Option<[f32; 2]>,
}

/// Shape-tree item, tagged by `ty`.
#[derive(Debug, Deserialize)]
#[serde(tag = "ty")]
pub(crate) enum RawShape {
    #[serde(rename = "gr")]
    Group(RawGroupShape),
    #[serde(rename = "rc")]
    Rect(RawRect),
    #[serde(rename = "el")]
    Ellipse(RawEllipse),
    #[serde(rename = "sh")]
    Path(RawPath),
    #[serde(rename = "sr")]
    Polystar(RawPolystar),
    #[serde(rename = "fl")]
    Fill(RawFill),
    #[serde(rename = "st")]
    Stroke(RawStroke),
    #[serde(rename = "gf")]
    GradientFill(RawGradientShape),
    #[serde(rename = "gs")]
    GradientStroke(RawGradientShape),
    #[serde(rename = "tm")]
    Trim(RawTrim),
    #[serde(rename = "tr")]
    Transform(RawTransform),
    #[serde(other)]
    Unsupported,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawGroupShape {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub hd: bool,
    #[serde(default)]
    pub bm: i64,
    #[serde(default)]
    pub it: Vec<RawShape>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawRect {
    #[serde(default, deserialize_with = "flag")]
    pub hd: bool,
    #[serde(default)]
    pub d: Option<i64>,
    #[serde(default)]
    pub p: Option<RawProp>,
    #[serde(default)]
    pub s: Option<RawProp>,
    #[serde(default)]
    pub r: Option<RawProp>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawEllipse {
    #[serde(default, deserialize_with = "flag")]
    pub hd: bool,
    #[serde(default)]
    pub d: Option<i64>,
    #[serde(default)]
    pub p: Option<RawProp>,
    #[serde(default)]
    pub s: Option<RawProp>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPath {
    #[serde(default, deserialize_with = "flag")]
    pub hd: bool,
    #[serde(default)]
    pub d: Option<i64>,
    #[serde(default)]
    pub ks: RawProp,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawPolystar {
    #[serde(default, deserialize_with = "flag")]
    pub hd: bool,
    #[serde(default)]
    pub d: Option<i64>,
    #[serde(default)]
    pub sy: i64,
    #[serde(default)]
    pub p: Option<RawProp>,
    #[serde(default)]
    pub pt: Option<RawProp>,
    #[serde(default)]
    pub r: Option<RawProp>,
    #[serde(default)]
    pub ir: Option<RawProp>,
    #[serde(default)]
    pub or: Option<RawProp>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawFill {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub hd: bool,
    #[serde(default)]
    pub c: Option<RawProp>,
    #[serde(default)]
    pub o: Option<RawProp>,
    #[serde(default)]
    pub r: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawDash {
    #[serde(default)]
    pub n: String,
    #[serde(default)]
    pub v: Option<RawProp>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawStroke {
    #[serde(default)]
    pub nm: Option<String>,
    #[serde(default, deserialize_with = "flag")]
    pub hd: bool,
    #[serde(default)]
    pub c: Option<RawProp>,
    #[serde(default)]
    pub o: Option<RawProp>,
    #[serde(default)]
    pub w: Option<RawProp>,
    #[serde(default)]
    pub lc: Option<i64>,
    #[serde(default)]
    pub lj: Option<i64>,
    #[serde(default)]
    pub ml: Option<f32>,
    #[serde(default)]
    pub d: Vec<RawDash>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawGradientStops {
    #[serde(default)]
    pub p: usize,
    #[serde(default)]
    pub k: RawProp,
}

/// Shared by gradient fills (`gf`) and gradient strokes (`gs`).
#[derive(Debug, Deserialize)]
pub(crate) struct RawGradientShape {
    #[serde(default, deserialize_with = "flag")]
    pub hd: bool,
    #[serde(default)]
    pub t: i64,
    #[serde(default)]
    pub s: Option<RawProp>,
    #[serde(default)]
    pub e: Option<RawProp>,
    #[serde(default)]
    pub h: Option<RawProp>,
    #[serde(default)]
    pub a: Option<RawProp>,
    #[serde(default)]
    pub o: Option<RawProp>,
    pub g: RawGradientStops,
    #[serde(default)]
    pub r: Option<i64>,
    #[serde(default)]
    pub w: Option<RawProp>,
    #[serde(default)]
    pub lc: Option<i64>,
    #[serde(default)]
    pub lj: Option<i64>,
    #[serde(default)]
    pub ml: Option<f32>,
    #[serde(default)]
    pub d: Vec<RawDash>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawTrim {
    #[serde(default, deserialize_with = "flag")]
    pub hd: bool,
    #[serde(default)]
    pub s: Option<RawProp>,
    #[serde(default)]
    pub e: Option<RawProp>,
    #[serde(default)]
    pub o: Option<RawProp>,
    #[serde(default)]
    pub m: Option<i64>,
}
