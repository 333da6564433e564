//! Typed calendar model: the generic component tree, date/time values, and
//! the event and document types built from them.

pub mod calendar;
pub mod component;
pub mod datetime;
pub mod duration;
pub mod event;
pub mod offset;
pub mod property;

pub use calendar::CalendarDocument;
pub use component::{Component, ComponentKind};
pub use datetime::{DateTimeForm, DateTimeValue, days_in_month, is_leap_year};
pub use duration::Duration;
pub use event::EventComponent;
pub use offset::UtcOffset;
pub use property::{
    ContentLine, Parameter, PropertyValue, PropertyValues, canonical_name, names, split_unescaped,
};
