pub(crate) mod argon;
pub(crate) mod oh;
pub(crate) mod xenon;
