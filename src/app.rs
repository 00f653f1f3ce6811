//! State-driven apps: a [`RootComponent`] whose props are folded from dispatched [`Action`]s.

use crate::{
	component::ComponentNode,
	config,
	render::{TemplateSource, Updater},
	root::RootComponent,
	surface::{Handle, Surface},
	Error,
};
use core::{
	any::Any,
	cell::{Cell, OnceCell, RefCell},
	fmt::{self, Debug, Formatter},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::{
	collections::VecDeque,
	rc::{Rc, Weak},
};
use tracing::{error, instrument, trace, warn};

/// Something that happened, as far as reducers are concerned.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Action {
	pub kind: String,
	#[serde(default)]
	pub payload: Value,
}

impl Action {
	#[must_use]
	pub fn new(kind: impl Into<String>) -> Self {
		Self { kind: kind.into(), payload: Value::Null }
	}

	#[must_use]
	pub fn with_payload(kind: impl Into<String>, payload: Value) -> Self {
		Self { kind: kind.into(), payload }
	}
}

/// Queues an [`Action`] for the app it belongs to.
///
/// Dispatching never re-enters a running update: The action is processed once the current one is done.
pub type Dispatch = Rc<dyn Fn(Action)>;

/// A state transition. Reducers that don't handle an action should return the state unchanged.
pub type Reducer<S> = Rc<dyn Fn(S, &Action) -> S>;

/// An app that hasn't been mounted yet.
pub struct App<R> {
	root: R,
}

impl<R: Debug> Debug for App<R> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("App").field("root", &self.root).finish()
	}
}

/// Wraps `root` into an [`App`].
///
/// # Errors
///
/// [`Error::NotConfigured`] before [`configure`](`crate::configure`).
pub fn create<R: RootComponent>(root: R) -> Result<App<R>, Error> {
	if config::settings().is_none() {
		return Err(Error::NotConfigured);
	}
	Ok(App { root })
}

impl<R: RootComponent> App<R>
where
	R::Props: Clone,
{
	/// Mounts the app into `container`, starting from [`RootComponent::initial_state`] of `default_props`.
	///
	/// # Errors
	///
	/// Iff the initial render fails.
	#[instrument(skip(self, surface, default_props))]
	pub fn mount<S: Surface + 'static>(self, surface: S, container: Handle, default_props: R::Props) -> Result<Mounted<R::Props, S>, Error> {
		let state = self.root.initial_state(default_props);
		let reducers = self.root.reducers();

		let queue: Rc<RefCell<VecDeque<Action>>> = Rc::new(RefCell::new(VecDeque::new()));
		let link: Rc<OnceCell<Weak<Shared<R::Props, S>>>> = Rc::new(OnceCell::new());
		let dispatch: Dispatch = {
			let queue = Rc::clone(&queue);
			let link = Rc::clone(&link);
			Rc::new(move |action: Action| {
				trace!(?action, "Dispatched.");
				queue.borrow_mut().push_back(action);
				if let Some(shared) = link.get().and_then(Weak::upgrade) {
					shared.drain();
				}
			})
		};

		let component = ComponentNode::new(Box::new(self.root), Rc::new(state.clone()), None);
		let updater = Updater::mount(
			surface,
			container,
			TemplateSource::Root(|state: &R::Props| Rc::new(state.clone()) as Rc<dyn Any>),
			component,
			Some(Rc::clone(&dispatch)),
			&state,
		)?;

		let shared = Rc::new(Shared {
			state: RefCell::new(state),
			reducers,
			queue,
			draining: Cell::new(false),
			stale: Cell::new(false),
			updater,
		});
		if link.set(Rc::downgrade(&shared)).is_err() {
			crate::assert(false, "An app is only linked once");
		}
		shared.drain();
		Ok(Mounted { shared, dispatch })
	}
}

struct Shared<P, S> {
	state: RefCell<P>,
	reducers: Vec<Reducer<P>>,
	queue: Rc<RefCell<VecDeque<Action>>>,
	draining: Cell<bool>,
	/// The state has changed since it was last rendered.
	stale: Cell<bool>,
	updater: Updater<P, S>,
}

impl<P: Clone, S: Surface> Shared<P, S> {
	/// Reduces and renders queued actions until the queue is empty.
	///
	/// Re-entrant calls return immediately, the outer call picks up whatever they queued.
	fn drain(&self) {
		if self.draining.replace(true) {
			return;
		}

		loop {
			let next = self.queue.borrow_mut().pop_front();
			match next {
				Some(action) => {
					let previous = self.state.borrow().clone();
					let state = self.reducers.iter().fold(previous, |state, reducer| reducer(state, &action));
					*self.state.borrow_mut() = state;
					self.stale.set(true);
					trace!(kind = %action.kind, "Reduced.");
				}
				None if self.stale.get() => (),
				None => break,
			}

			let state = self.state.borrow().clone();
			match self.updater.update(&state) {
				Ok(()) => self.stale.set(false),
				Err(Error::UpdateInProgress) => {
					warn!("Deferred rendering until the running update is done.");
					break;
				}
				Err(error) => {
					error!("Failed to render: {}", error);
					self.stale.set(false);
				}
			}
		}

		self.draining.set(false);
	}
}

/// A running [`App`].
pub struct Mounted<P, S> {
	shared: Rc<Shared<P, S>>,
	dispatch: Dispatch,
}

impl<P, S> Debug for Mounted<P, S> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("Mounted").field("updater", &self.shared.updater).finish_non_exhaustive()
	}
}

impl<P: Clone, S: Surface> Mounted<P, S> {
	/// Reduces `action` into the state and re-renders, after any actions already queued.
	pub fn dispatch(&self, action: Action) {
		(self.dispatch)(action);
	}

	#[must_use]
	pub fn dispatcher(&self) -> Dispatch {
		Rc::clone(&self.dispatch)
	}

	#[must_use]
	pub fn state(&self) -> P {
		self.shared.state.borrow().clone()
	}

	#[must_use]
	pub fn updater(&self) -> &Updater<P, S> {
		&self.shared.updater
	}

	/// Renders state changes that were deferred because they arrived during an update.
	pub fn flush(&self) {
		self.shared.drain();
	}

	/// # Errors
	///
	/// As [`Updater::unmount`].
	pub fn unmount(self) -> Result<(), Error> {
		self.shared.updater.unmount()
	}
}
