mod catalog;

pub use catalog::{StyleCatalog, StyleCategory, StylePreset, CUSTOM_STYLE_ID};
