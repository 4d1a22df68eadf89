pub mod normalize;
pub mod reconcile;
mod record;
mod window;

pub use record::{EmissionDate, NormalizedRecord, RawErpRecord, RawPosRecord, Source};
pub use window::DateWindow;

pub use anyhow::Result;
