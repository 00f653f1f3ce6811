use crate::{
	app::{Action, Dispatch},
	node::{Key, NodeId},
	sandbox::Sandbox,
	service::{Disconnect, Service},
	surface::{Event, Listener},
	template::Template,
	Error,
};
use core::{
	any::{type_name, Any, TypeId},
	fmt::{self, Debug, Formatter},
};
use serde_json::Value;
use std::rc::Rc;
use tracing::{error, trace, trace_span, warn};

/// A composable unit of UI.
///
/// Instances are created from templates with [`Default`] and rendered from their props alone,
/// so anything that must survive re-renders belongs in the props (or the [`Sandbox`]), not in `self`.
///
/// The hooks run in this order over a component's life:
/// `on_created` → `on_attached` → (`on_props_received` → `on_updated`)* → `on_detached` → `on_destroyed`.
#[allow(unused_variables)]
pub trait Component: 'static {
	type Props: 'static;

	/// Produces the single child of this component, or [`None`] to show a placeholder.
	fn render(&self, props: &Self::Props, cx: &RenderContext) -> Option<Template> {
		None
	}

	/// After materialisation, before the component is live.
	fn on_created(&mut self, cx: &mut Context<'_>) {}
	/// After the component's output is live.
	fn on_attached(&mut self, cx: &mut Context<'_>) {}
	/// When new props arrive, before the rest of the re-render is applied.
	///
	/// A nested component's new content is rendered from these props while its parent's candidate is built,
	/// so by the time this runs [`render`](`Component::render`) has already seen them.
	/// Only a root gets this hook ahead of its own render.
	fn on_props_received(&mut self, props: &Self::Props, cx: &mut Context<'_>) {}
	/// After a re-render's patches were applied.
	fn on_updated(&mut self, cx: &mut Context<'_>) {}
	/// After removal from the live tree.
	fn on_detached(&mut self, cx: &mut Context<'_>) {}
	/// Terminal. Cleanup tasks have already run.
	fn on_destroyed(&mut self, cx: &mut Context<'_>) {}

	/// Label of this component's placeholder comment.
	fn name() -> &'static str
	where
		Self: Sized,
	{
		short_type_name::<Self>()
	}
}

pub(crate) fn short_type_name<T: ?Sized>() -> &'static str {
	let full = type_name::<T>();
	let base = full.split('<').next().unwrap_or(full);
	base.rsplit("::").next().unwrap_or(base)
}

/// Object-safe face of [`Component`].
pub(crate) trait AnyComponent {
	fn component_type(&self) -> TypeId;
	fn display_name(&self) -> &'static str;
	fn render_erased(&self, props: &dyn Any, cx: &RenderContext) -> Option<Template>;
	fn created(&mut self, cx: &mut Context<'_>);
	fn attached(&mut self, cx: &mut Context<'_>);
	fn props_received(&mut self, props: &dyn Any, cx: &mut Context<'_>);
	fn updated(&mut self, cx: &mut Context<'_>);
	fn detached(&mut self, cx: &mut Context<'_>);
	fn destroyed(&mut self, cx: &mut Context<'_>);
}

impl<C: Component> AnyComponent for C {
	fn component_type(&self) -> TypeId {
		TypeId::of::<C>()
	}

	fn display_name(&self) -> &'static str {
		<C as Component>::name()
	}

	fn render_erased(&self, props: &dyn Any, cx: &RenderContext) -> Option<Template> {
		match props.downcast_ref::<C::Props>() {
			Some(props) => Component::render(self, props, cx),
			None => {
				error!(component = <C as Component>::name(), "Props don't match the component type. Rendering a placeholder.");
				None
			}
		}
	}

	fn created(&mut self, cx: &mut Context<'_>) {
		self.on_created(cx);
	}

	fn attached(&mut self, cx: &mut Context<'_>) {
		self.on_attached(cx);
	}

	fn props_received(&mut self, props: &dyn Any, cx: &mut Context<'_>) {
		match props.downcast_ref::<C::Props>() {
			Some(props) => self.on_props_received(props, cx),
			None => error!(component = <C as Component>::name(), "Received props of the wrong type."),
		}
	}

	fn updated(&mut self, cx: &mut Context<'_>) {
		self.on_updated(cx);
	}

	fn detached(&mut self, cx: &mut Context<'_>) {
		self.on_detached(cx);
	}

	fn destroyed(&mut self, cx: &mut Context<'_>) {
		self.on_destroyed(cx);
	}
}

/// Position of a component in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
	Constructed,
	Created,
	Attached,
	Detached,
	Destroyed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Hook {
	Created,
	Attached,
	PropsReceived,
	Updated,
	Detached,
	Destroyed,
}

/// A teardown registered through [`Context::connect_to`], tagged with its service.
pub struct CleanupTask {
	service: String,
	disconnect: Disconnect,
}

impl CleanupTask {
	#[must_use]
	pub fn service(&self) -> &str {
		&self.service
	}
}

impl Debug for CleanupTask {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("CleanupTask").field("service", &self.service).finish_non_exhaustive()
	}
}

/// A [`Tree::broadcast`](`crate::Tree::broadcast`) requested from within a hook.
#[derive(Debug)]
pub(crate) struct Broadcast {
	pub from: NodeId,
	pub name: String,
	pub detail: Value,
}

/// The virtual node of a component.
///
/// Exactly one of [`child`](`ComponentNode::child`) and [`comment`](`ComponentNode::comment`) is set at any time.
pub struct ComponentNode {
	behavior: Box<dyn AnyComponent>,
	props: Rc<dyn Any>,
	key: Option<Key>,
	pub(crate) child: Option<NodeId>,
	pub(crate) comment: Option<NodeId>,
	cleanup_tasks: Vec<CleanupTask>,
	sandbox: Option<Sandbox>,
	stage: Stage,
}

impl Debug for ComponentNode {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("ComponentNode")
			.field("name", &self.name())
			.field("key", &self.key)
			.field("child", &self.child)
			.field("comment", &self.comment)
			.field("cleanup_tasks", &self.cleanup_tasks)
			.field("sandbox", &self.sandbox)
			.field("stage", &self.stage)
			.finish_non_exhaustive()
	}
}

impl ComponentNode {
	/// The placeholder comment still has to be created by the caller.
	pub(crate) fn new(behavior: Box<dyn AnyComponent>, props: Rc<dyn Any>, key: Option<Key>) -> Self {
		Self {
			behavior,
			props,
			key,
			child: None,
			comment: None,
			cleanup_tasks: Vec::new(),
			sandbox: None,
			stage: Stage::Constructed,
		}
	}

	/// Short type name of the component.
	#[must_use]
	pub fn name(&self) -> &'static str {
		self.behavior.display_name()
	}

	#[must_use]
	pub fn component_type(&self) -> TypeId {
		self.behavior.component_type()
	}

	#[must_use]
	pub fn key(&self) -> Option<&str> {
		self.key.as_deref()
	}

	#[must_use]
	pub fn child(&self) -> Option<NodeId> {
		self.child
	}

	#[must_use]
	pub fn comment(&self) -> Option<NodeId> {
		self.comment
	}

	#[must_use]
	pub fn stage(&self) -> Stage {
		self.stage
	}

	#[must_use]
	pub fn props<T: 'static>(&self) -> Option<&T> {
		self.props.downcast_ref()
	}

	#[must_use]
	pub fn cleanup_tasks(&self) -> &[CleanupTask] {
		&self.cleanup_tasks
	}

	/// Whether the sandbox has been materialised yet.
	#[must_use]
	pub fn has_sandbox(&self) -> bool {
		self.sandbox.is_some()
	}

	pub(crate) fn erased_props(&self) -> &Rc<dyn Any> {
		&self.props
	}

	pub(crate) fn set_props(&mut self, props: Rc<dyn Any>) {
		self.props = props;
	}

	pub(crate) fn set_stage(&mut self, stage: Stage) {
		trace!(component = self.name(), from = ?self.stage, to = ?stage, "Stage transition.");
		self.stage = stage;
	}

	pub(crate) fn render(&self, cx: &RenderContext) -> Option<Template> {
		self.behavior.render_erased(&*self.props, cx)
	}

	pub(crate) fn connect_to<S: Service + ?Sized>(&mut self, id: NodeId, service: &S, listeners: S::Listeners) -> Result<(), Error> {
		connect(id, self.stage, &mut self.cleanup_tasks, service, listeners)
	}

	pub(crate) fn run_hook(&mut self, id: NodeId, hook: Hook, dispatch: Option<Dispatch>, broadcasts: &mut Vec<Broadcast>) {
		let name = self.name();
		let span = trace_span!("Running hook", component = name, %id, ?hook);
		let _enter = span.enter();

		let Self { behavior, props, cleanup_tasks, sandbox, stage, .. } = self;
		let props: &dyn Any = &**props;
		let mut cx = Context { id, stage: *stage, props, cleanup_tasks, sandbox, dispatch, broadcasts };
		match hook {
			Hook::Created => behavior.created(&mut cx),
			Hook::Attached => behavior.attached(&mut cx),
			Hook::PropsReceived => behavior.props_received(props, &mut cx),
			Hook::Updated => behavior.updated(&mut cx),
			Hook::Detached => behavior.detached(&mut cx),
			Hook::Destroyed => behavior.destroyed(&mut cx),
		}
	}

	/// Runs and drops every cleanup task in registration order.
	///
	/// A failing task is logged and doesn't keep the others from running.
	pub(crate) fn run_cleanup_tasks(&mut self, id: NodeId) {
		for CleanupTask { service, disconnect } in self.cleanup_tasks.drain(..) {
			trace!(component = %id, service = %service, "Running cleanup task.");
			if let Err(error) = disconnect() {
				error!(component = %id, service = %service, "Cleanup task failed: {}", error);
			}
		}
	}

	pub(crate) fn drop_sandbox(&mut self) {
		if let Some(sandbox) = self.sandbox.take() {
			trace!(component = %sandbox.owner(), slots = sandbox.len(), "Dropped sandbox.");
		}
	}
}

fn connect<S: Service + ?Sized>(
	component: NodeId,
	stage: Stage,
	cleanup_tasks: &mut Vec<CleanupTask>,
	service: &S,
	listeners: S::Listeners,
) -> Result<(), Error> {
	let name = service.name();
	if stage == Stage::Destroyed {
		warn!(%component, service = %name, "Refusing to connect a destroyed component.");
		return Err(Error::ComponentDestroyed { component, service: name });
	}

	let disconnect = match service.connect(listeners) {
		Some(disconnect) => disconnect,
		None => {
			crate::assert(false, "The result of `Service::connect` has to be a disconnect operation");
			return Err(Error::MissingDisconnect(name));
		}
	};
	trace!(%component, service = %name, "Registered cleanup task.");
	cleanup_tasks.push(CleanupTask { service: name, disconnect });
	Ok(())
}

/// What a lifecycle hook can reach.
pub struct Context<'a> {
	id: NodeId,
	stage: Stage,
	props: &'a dyn Any,
	cleanup_tasks: &'a mut Vec<CleanupTask>,
	sandbox: &'a mut Option<Sandbox>,
	dispatch: Option<Dispatch>,
	broadcasts: &'a mut Vec<Broadcast>,
}

impl Context<'_> {
	#[must_use]
	pub fn id(&self) -> NodeId {
		self.id
	}

	#[must_use]
	pub fn stage(&self) -> Stage {
		self.stage
	}

	#[must_use]
	pub fn props<T: 'static>(&self) -> Option<&T> {
		self.props.downcast_ref()
	}

	/// The component's sandbox, created on first access.
	pub fn sandbox(&mut self) -> &mut Sandbox {
		let id = self.id;
		self.sandbox.get_or_insert_with(|| {
			trace!(component = %id, "Created sandbox.");
			Sandbox::new(id)
		})
	}

	/// Subscribes to `service` until this component is destroyed.
	///
	/// # Errors
	///
	/// [`Error::ComponentDestroyed`] from `on_destroyed`, and [`Error::MissingDisconnect`] iff the service breaks its contract.
	pub fn connect_to<S: Service + ?Sized>(&mut self, service: &S, listeners: S::Listeners) -> Result<(), Error> {
		connect(self.id, self.stage, self.cleanup_tasks, service, listeners)
	}

	/// Queues a bubbling, composed event from this component's root element. Sent once the current patch batch is done.
	pub fn broadcast(&mut self, name: impl Into<String>, detail: Value) {
		self.broadcasts.push(Broadcast { from: self.id, name: name.into(), detail });
	}

	/// Sends `action` to the root's dispatcher, if there is one.
	pub fn dispatch(&self, action: Action) {
		match &self.dispatch {
			Some(dispatch) => dispatch(action),
			None => trace!(component = %self.id, ?action, "No dispatcher. Dropping action."),
		}
	}
}

/// What [`Component::render`] can reach.
#[derive(Clone, Default)]
pub struct RenderContext {
	dispatch: Option<Dispatch>,
}

impl Debug for RenderContext {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		f.debug_struct("RenderContext").field("dispatch", &self.dispatch.is_some()).finish()
	}
}

impl RenderContext {
	pub(crate) fn new(dispatch: Option<Dispatch>) -> Self {
		Self { dispatch }
	}

	pub fn dispatch(&self, action: Action) {
		if let Some(dispatch) = &self.dispatch {
			dispatch(action)
		}
	}

	/// A [`Listener`] that dispatches `action` whenever it is called.
	#[must_use]
	pub fn on(&self, action: Action) -> Listener {
		self.on_event(move |_| action.clone())
	}

	/// A [`Listener`] that dispatches the [`Action`] computed from each event.
	pub fn on_event(&self, f: impl 'static + Fn(&Event) -> Action) -> Listener {
		let dispatch = self.dispatch.clone();
		Listener::new(move |event| {
			if let Some(dispatch) = &dispatch {
				dispatch(f(event))
			}
		})
	}
}
