use crate::{
	node::{NodeId, NodeType},
	surface::SurfaceError,
};

/// Errors surfaced by tree operations, patches and the render loop.
///
/// Broken tree-shape invariants are *not* reported here. Those go through [`crate::assert`].
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum Error {
	#[error("unknown node {0}")]
	UnknownNode(NodeId),

	#[error("expected {expected} node at {id} but found {actual}")]
	UnexpectedNodeType { id: NodeId, expected: NodeType, actual: NodeType },

	#[error("index {index} is out of range for {len} children of {parent}")]
	IndexOutOfRange { parent: NodeId, index: usize, len: usize },

	#[error("{0} has no live representation")]
	NotLive(NodeId),

	#[error("component {component} is destroyed and can't connect to service {service:?}")]
	ComponentDestroyed { component: NodeId, service: String },

	#[error("service {0:?} did not return a disconnect operation")]
	MissingDisconnect(String),

	#[error("configuration has not been applied yet")]
	NotConfigured,

	#[error("configuration has already been applied")]
	AlreadyConfigured,

	#[error("an update is already in progress")]
	UpdateInProgress,

	#[error("the tree has been unmounted")]
	Unmounted,

	#[error("invalid options: {0}")]
	Options(#[from] serde_json::Error),

	#[error("surface error: {0}")]
	Surface(#[from] SurfaceError),
}
