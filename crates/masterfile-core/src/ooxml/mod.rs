//! Minimal Office Open XML support: a zip part store, an element tree over
//! `quick-xml`, and editable models for the worksheet, stylesheet and
//! presentation parts this crate writes.

pub mod dom;
pub mod package;
pub mod presentation;
pub mod sheet;
pub mod styles;
pub mod workbook;

#[cfg(test)]
pub(crate) mod fixtures;
