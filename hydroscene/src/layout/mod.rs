//! Display wall layouts.

mod manager;
mod types;

pub use manager::{ActiveLayout, LayoutManager, PersistedLayout, SlotState, SlotTarget};
pub use types::{Arrangement, CellPosition, Layout, LayoutId, LayoutSpec};
