//! Input drivers and peripheral helpers.

pub mod button;
