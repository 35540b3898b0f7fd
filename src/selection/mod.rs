//! Interactive region selection.
//!
//! The selector is a plain finite-state machine fed with abstract
//! [`SelectionEvent`](crate::events::SelectionEvent)s, so it can be driven by
//! real input devices ([`EvdevSelectionSource`]) or by a scripted sequence in tests.

mod evdev_source;
pub mod region;
pub mod selector;
pub mod state;

pub use evdev_source::EvdevSelectionSource;
pub use region::{Region, VirtualDesktopBounds};
pub use selector::{select_region, RegionSelector, SelectionEventSource};
pub use state::SelectionState;
