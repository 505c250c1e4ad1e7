pub(crate) mod canvas;
pub(crate) mod composite;
pub(crate) mod cpu;
pub(crate) mod effect;
pub(crate) mod filter;
pub(crate) mod method;
pub(crate) mod paint;
pub(crate) mod picture;
pub(crate) mod scene;
pub(crate) mod shape;
pub(crate) mod surface_pool;

#[cfg(test)]
#[path = "../../tests/unit/render/recorder.rs"]
pub(crate) mod recorder;
