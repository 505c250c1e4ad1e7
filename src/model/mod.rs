pub(crate) mod composition;
pub(crate) mod gradient;
pub(crate) mod group;
pub(crate) mod interpolator;
pub(crate) mod layer;
pub(crate) mod object;
pub(crate) mod property;
pub(crate) mod slot;
pub(crate) mod text;
