//! Configuration is process-wide, so this binary holds a single test.

use grove_dom::{config::settings, configure, create, is_debug, ready, render, Component, Error, Level, MemorySurface, Options, RootComponent, Template};

#[derive(Debug, Default)]
struct Shell;
impl Component for Shell {
	type Props = ();
}
impl RootComponent for Shell {}

#[tokio::test]
async fn configuration_gates_rendering() {
	assert!(settings().is_none());
	assert!(!is_debug());

	let mut surface = MemorySurface::new();
	let container = surface.create_container("main").unwrap();
	assert!(matches!(render(|(): &(), _| None, &(), surface, container), Err(Error::NotConfigured)));
	assert!(matches!(create(Shell), Err(Error::NotConfigured)));

	let waiting = tokio::spawn(ready());
	tokio::task::yield_now().await;
	assert!(!waiting.is_finished());

	let options = Options::from_json(r#"{"level": "warn", "plugins": ["a"], "bundleRootPath": "/bundles", "preload": true}"#).unwrap();
	let applied = configure(options).unwrap();
	assert_eq!(applied.level(), Level::Warn);
	assert_eq!(applied.plugins(), ["a"]);
	assert_eq!(applied.bundle_root_path(), "/bundles");
	assert!(applied.preload());
	assert!(!applied.debug());

	waiting.await.unwrap();
	ready().await;
	assert!(matches!(configure(Options::default()), Err(Error::AlreadyConfigured)));
	assert_eq!(settings().map(grove_dom::Settings::level), Some(Level::Warn));

	// Tolerated without the debug option.
	grove_dom::assert(false, "ignored");

	let mut surface = MemorySurface::new();
	let container = surface.create_container("main").unwrap();
	let updater = render(|(): &(), _| Some(Template::element("p").into()), &(), surface, container).unwrap();
	assert_eq!(updater.with_surface(|surface| surface.inner_markup(container)), "<p></p>");
	assert!(create(Shell).is_ok());
}
