use crate::{
	app::Dispatch,
	component::{ComponentNode, Hook, RenderContext},
	component_tree::create_from_template,
	config,
	diff::Diff,
	lifecycle,
	node::NodeId,
	root::Host,
	surface::{Handle, Surface},
	template::Template,
	Error, Tree,
};
use core::{
	any::Any,
	fmt::{self, Debug, Formatter},
};
use serde_json::Value;
use std::{cell::RefCell, rc::Rc};
use tracing::{error, instrument, trace, trace_span};

/// Where the root's content comes from on each update.
pub(crate) enum TemplateSource<P> {
	/// A free-standing render function, see [`render`].
	Function(Box<dyn Fn(&P, &RenderContext) -> Option<Template>>),
	/// The root component's own [`render`](`crate::Component::render`), after handing it the props.
	Root(fn(&P) -> Rc<dyn Any>),
}

pub(crate) struct Renderer<P, S> {
	tree: Tree,
	surface: S,
	root: Option<NodeId>,
	source: TemplateSource<P>,
	/// Whether the initial render went through. Root hooks for new props only run after that.
	rendered: bool,
}

impl<P, S: Surface> Renderer<P, S> {
	#[instrument(skip(self, props))]
	fn update(&mut self, props: &P) -> Result<(), Error> {
		let root = self.root.ok_or(Error::Unmounted)?;
		let cx = self.tree.render_context(root);
		let notify = match &self.source {
			TemplateSource::Function(_) => false,
			TemplateSource::Root(_) => self.rendered,
		};
		let template = match &self.source {
			TemplateSource::Function(render) => render(props, &cx),
			TemplateSource::Root(erase) => {
				self.tree.receive_props(root, erase(props), notify)?;
				self.tree.render_component(root)?
			}
		};

		let candidate = match template {
			Some(template) => Some(create_from_template(&mut self.tree, template, &cx)?),
			None => None,
		};
		let mut result = self.reconcile(root, candidate);
		if let Some(candidate) = candidate {
			self.tree.discard(candidate);
		}
		if result.is_ok() {
			if notify {
				result = self.tree.run_hook(root, Hook::Updated);
			}
			self.rendered = true;
		}
		self.tree.flush_broadcasts(&mut self.surface);
		result
	}

	fn reconcile(&mut self, root: NodeId, candidate: Option<NodeId>) -> Result<(), Error> {
		let old = self.tree.component(root)?.child();
		let patches = Diff::calculate(&self.tree, old, candidate, root)?;
		let span = trace_span!("Applying patches", count = patches.len());
		let _enter = span.enter();
		for patch in patches {
			patch.apply(&mut self.tree, &mut self.surface)?;
		}
		Ok(())
	}
}

/// Handle to a mounted tree. Cloning it shares the tree.
///
/// The tree can only be updated from one place at a time. Updates from within its own hooks or listeners fail with [`Error::UpdateInProgress`].
pub struct Updater<P, S> {
	renderer: Rc<RefCell<Renderer<P, S>>>,
}

impl<P, S> Clone for Updater<P, S> {
	fn clone(&self) -> Self {
		Self { renderer: Rc::clone(&self.renderer) }
	}
}

impl<P, S> Debug for Updater<P, S> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		let root = self.renderer.try_borrow().map(|renderer| renderer.root);
		f.debug_struct("Updater").field("root", &root).finish_non_exhaustive()
	}
}

impl<P, S: Surface> Updater<P, S> {
	pub(crate) fn mount(surface: S, container: Handle, source: TemplateSource<P>, component: ComponentNode, dispatch: Option<Dispatch>, props: &P) -> Result<Self, Error> {
		let mut tree = Tree::new();
		let root = tree.insert_root(component, container, dispatch);
		let mut renderer = Renderer { tree, surface, root: Some(root), source, rendered: false };

		lifecycle::mount_root(&mut renderer.tree, &mut renderer.surface, root)?;
		renderer.tree.flush_broadcasts(&mut renderer.surface);
		renderer.update(props)?;
		trace!(%root, "Mounted.");
		Ok(Self { renderer: Rc::new(RefCell::new(renderer)) })
	}

	/// Renders `props` and applies the difference to the live tree.
	///
	/// # Errors
	///
	/// [`Error::UpdateInProgress`] when called re-entrantly, [`Error::Unmounted`] after [`unmount`](`Updater::unmount`),
	/// or the first error of the patch batch. Candidate nodes are cleaned up either way.
	pub fn update(&self, props: &P) -> Result<(), Error> {
		let mut renderer = self.renderer.try_borrow_mut().map_err(|_| Error::UpdateInProgress)?;
		renderer.update(props).map_err(|error| {
			error!("Failed to update: {}", error);
			error
		})
	}

	/// Takes the tree off its container and destroys it.
	///
	/// # Errors
	///
	/// [`Error::Unmounted`] iff this already happened.
	#[instrument(skip(self))]
	pub fn unmount(&self) -> Result<(), Error> {
		let mut renderer = self.renderer.try_borrow_mut().map_err(|_| Error::UpdateInProgress)?;
		let root = renderer.root.take().ok_or(Error::Unmounted)?;
		let Renderer { tree, surface, .. } = &mut *renderer;
		lifecycle::unmount_root(tree, surface, root)
	}

	/// The root node, unless unmounted.
	#[must_use]
	pub fn root(&self) -> Option<NodeId> {
		self.renderer.borrow().root
	}

	/// # Panics
	///
	/// Iff called from within an update.
	pub fn with_tree<R>(&self, f: impl FnOnce(&Tree) -> R) -> R {
		f(&self.renderer.borrow().tree)
	}

	/// # Panics
	///
	/// Iff called from within an update.
	pub fn with_surface<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
		f(&mut self.renderer.borrow_mut().surface)
	}

	/// [`Tree::broadcast`] from `id`.
	///
	/// # Errors
	///
	/// [`Error::UpdateInProgress`] iff called from within an update.
	pub fn broadcast(&self, id: NodeId, name: &str, detail: Value) -> Result<(), Error> {
		let mut renderer = self.renderer.try_borrow_mut().map_err(|_| Error::UpdateInProgress)?;
		let Renderer { tree, surface, .. } = &mut *renderer;
		tree.broadcast(surface, id, name, detail);
		Ok(())
	}
}

/// Mounts the output of `render` for `props` into `container` and returns a handle for later updates.
///
/// # Errors
///
/// [`Error::NotConfigured`] before [`configure`](`crate::configure`), otherwise as [`Updater::update`].
///
/// # Example
///
/// ```rust
/// use grove_dom::{configure, render, MemorySurface, Options, Template};
///
/// # let _ = configure(Options::default());
/// let mut surface = MemorySurface::new();
/// let container = surface.create_container("main")?;
///
/// let updater = render(
/// 	|name: &String, _cx| Some(Template::element("p").text(format!("Hello, {}!", name)).into()),
/// 	&"world".to_owned(),
/// 	surface,
/// 	container,
/// )?;
/// assert_eq!(updater.with_surface(|surface| surface.inner_markup(container)), "<p>Hello, world!</p>");
///
/// updater.update(&"there".to_owned())?;
/// assert_eq!(updater.with_surface(|surface| surface.inner_markup(container)), "<p>Hello, there!</p>");
/// # Ok::<(), grove_dom::Error>(())
/// ```
pub fn render<P: 'static, S: Surface>(render: impl 'static + Fn(&P, &RenderContext) -> Option<Template>, props: &P, surface: S, container: Handle) -> Result<Updater<P, S>, Error> {
	if config::settings().is_none() {
		return Err(Error::NotConfigured);
	}
	let span = trace_span!("render", ?container);
	let _enter = span.enter();
	Updater::mount(surface, container, TemplateSource::Function(Box::new(render)), ComponentNode::new(Box::new(Host), Rc::new(()), None), None, props)
}
