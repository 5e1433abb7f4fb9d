//! Segment tree renderer for the courier chat-bot dispatch library.
//!
//! A [`Renderer`] walks a declarative [`courier_core::Node`] tree and produces
//! a flat, ordered list of segments. Native elements resolve through a
//! [`ComponentRegistry`]; general formatting elements through its
//! [`GeneralRenderer`]. Rendering is pure: no network or storage access.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod component;
mod helpers;
mod renderer;

pub use component::{
    ComponentRegistry, GeneralRenderer, NativeComponent, PlainTextRenderer, Recurse, RenderResult,
};
pub use helpers::{
    assert_kinds, element_path, index_path, render_children, render_text_content, slot_path,
};
pub use renderer::{ROOT_PATH, Renderer, render_plain_text};
