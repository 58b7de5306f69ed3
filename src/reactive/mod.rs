//! Reactive layer — change notifications and live query views.
//!
//! - [`bus`] — [`ChangeBus`], [`ChangeNotice`], [`WriteToken`].
//! - [`view`] — [`ReactiveView`].

pub mod bus;
pub mod view;

pub use bus::{ChangeBus, ChangeNotice, SubscriptionId, WriteToken};
pub use view::ReactiveView;
