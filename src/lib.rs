#![doc(html_root_url = "https://docs.rs/grove-dom/0.0.1")]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

//! A component tree for incremental UI rendering.
//!
//! Components render [`Template`]s, which are materialised into a [`Tree`] of virtual nodes.
//! Each update diffs a freshly rendered candidate against the live tree and applies the resulting [`Patch`]es to a [`Surface`],
//! running component lifecycle hooks along the way.
//!
//! Nothing renders before [`configure`] was called.

#[cfg(doctest)]
pub mod readme {
	doc_comment::doctest!("../README.md");
}

mod app;
mod component;
pub mod component_tree;
pub mod config;
mod diff;
pub mod dom;
mod error;
mod lifecycle;
pub mod memory;
mod node;
mod patch;
mod render;
mod root;
mod sandbox;
pub mod service;
pub mod surface;
pub mod template;
mod tree;

pub use app::{create, Action, App, Dispatch, Mounted, Reducer};
pub use component::{CleanupTask, Component, ComponentNode, Context, RenderContext, Stage};
pub use config::{assert, configure, is_debug, ready, warn, Level, Options, Settings};
pub use diff::Diff;
pub use dom::DomSurface;
pub use error::Error;
pub use memory::{MemoryNode, MemorySurface};
pub use node::{Comment, Element, Key, Node, NodeId, NodeKind, NodeType};
pub use patch::Patch;
pub use render::{render, Updater};
pub use root::{RootComponent, RootNode};
pub use sandbox::Sandbox;
pub use service::{Disconnect, DisconnectError, Service, Topic};
pub use surface::{Event, Handle, Listener, Surface, SurfaceError};
pub use template::{ComponentTemplate, Content, ElementTemplate, Template};
pub use tree::{ElementRef, RootElement, Tree};
