//! Process-wide configuration, applied once and then frozen.
//!
//! Rendering is gated on configuration: [`render`](`crate::render()`) and [`create`](`crate::create`) refuse to run before [`configure`] was called,
//! and [`ready`] lets asynchronous callers wait for that moment.

use crate::Error;
use serde::{Deserialize, Deserializer};
use std::sync::OnceLock;
use tokio::sync::watch;
use tracing::{info, instrument, trace};

static SETTINGS: OnceLock<Settings> = OnceLock::new();

fn readiness() -> &'static watch::Sender<bool> {
	static READY: OnceLock<watch::Sender<bool>> = OnceLock::new();
	READY.get_or_init(|| watch::channel(false).0)
}

/// Log verbosity. Unrecognised values fall back to [`Level::Info`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Level {
	Debug,
	#[default]
	Info,
	Warn,
	Error,
}

impl Level {
	#[must_use]
	pub fn parse_lenient(value: &str) -> Self {
		match value {
			"debug" => Self::Debug,
			"warn" => Self::Warn,
			"error" => Self::Error,
			_ => Self::Info,
		}
	}
}

impl From<Level> for tracing::Level {
	fn from(level: Level) -> Self {
		match level {
			Level::Debug => tracing::Level::DEBUG,
			Level::Info => tracing::Level::INFO,
			Level::Warn => tracing::Level::WARN,
			Level::Error => tracing::Level::ERROR,
		}
	}
}

fn lenient_level<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
	let value = serde_json::Value::deserialize(deserializer)?;
	Ok(value.as_str().map_or(Level::Info, Level::parse_lenient))
}

/// Recognised configuration options. Missing fields take their defaults.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Options {
	/// Plugin names. Recorded only; plugins are loaded by the host.
	pub plugins: Vec<String>,
	#[serde(deserialize_with = "lenient_level")]
	pub level: Level,
	/// Enables [`assert`] checks.
	pub debug: bool,
	pub preload: bool,
	pub bundles: Vec<String>,
	pub bundle_root_path: String,
}

impl Options {
	/// Parses options from a JSON object such as `{"level": "warn", "debug": true}`.
	///
	/// # Errors
	///
	/// Iff `json` isn't a JSON object with fields of the expected shape.
	pub fn from_json(json: &str) -> Result<Self, Error> {
		Ok(serde_json::from_str(json)?)
	}
}

/// The frozen form of [`Options`].
#[derive(Debug)]
pub struct Settings {
	plugins: Vec<String>,
	level: Level,
	debug: bool,
	preload: bool,
	bundles: Vec<String>,
	bundle_root_path: String,
}

impl From<Options> for Settings {
	fn from(options: Options) -> Self {
		let Options { plugins, level, debug, preload, bundles, bundle_root_path } = options;
		Self { plugins, level, debug, preload, bundles, bundle_root_path }
	}
}

impl Settings {
	#[must_use]
	pub fn plugins(&self) -> &[String] {
		&self.plugins
	}

	#[must_use]
	pub fn level(&self) -> Level {
		self.level
	}

	#[must_use]
	pub fn debug(&self) -> bool {
		self.debug
	}

	#[must_use]
	pub fn preload(&self) -> bool {
		self.preload
	}

	#[must_use]
	pub fn bundles(&self) -> &[String] {
		&self.bundles
	}

	#[must_use]
	pub fn bundle_root_path(&self) -> &str {
		&self.bundle_root_path
	}
}

/// Applies `options` for the rest of the process lifetime and opens the [`ready`] gate.
///
/// Also installs a [`tracing`] subscriber filtered to [`Options::level`], unless one is already installed.
///
/// # Errors
///
/// [`Error::AlreadyConfigured`] on any call after the first.
#[instrument]
pub fn configure(options: Options) -> Result<&'static Settings, Error> {
	let mut applied = false;
	let settings = SETTINGS.get_or_init(|| {
		applied = true;
		Settings::from(options)
	});
	if !applied {
		return Err(Error::AlreadyConfigured);
	}

	install_subscriber(settings.level);
	readiness().send_replace(true);
	info!(level = ?settings.level, debug = settings.debug, "Configured.");
	Ok(settings)
}

/// Resolves once [`configure`] has been applied.
pub async fn ready() {
	let mut receiver = readiness().subscribe();
	// The sender is never dropped, so this can't fail.
	let _ = receiver.wait_for(|ready| *ready).await;
}

/// The frozen settings, if [`configure`] has been called.
#[must_use]
pub fn settings() -> Option<&'static Settings> {
	SETTINGS.get()
}

#[must_use]
pub fn is_debug() -> bool {
	settings().map_or(false, Settings::debug)
}

/// Checks a tree-shape invariant.
///
/// Violations are caller or collaborator bugs. They panic only if the `debug` option is enabled and are tolerated otherwise.
///
/// # Panics
///
/// Iff `condition` is `false` and [`is_debug`].
#[track_caller]
pub fn assert(condition: bool, message: &str) {
	if condition {
		return;
	}
	if is_debug() {
		panic!("Assertion failed: {}", message)
	}
	trace!(message, "Tolerated assertion failure.");
}

pub fn warn(message: &str) {
	tracing::warn!("{}", message);
}

#[cfg(target_arch = "wasm32")]
fn install_subscriber(level: Level) {
	let config = tracing_wasm::WASMLayerConfigBuilder::new().set_max_level(level.into()).build();
	tracing_wasm::set_as_global_default_with_config(config);
}

#[cfg(not(target_arch = "wasm32"))]
fn install_subscriber(level: Level) {
	if let Err(error) = tracing_subscriber::fmt().with_max_level(tracing::Level::from(level)).try_init() {
		tracing::debug!("Keeping the existing tracing subscriber: {}", error);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn unknown_level_is_info() {
		let options = Options::from_json(r#"{"level": "verbose", "bundleRootPath": "/bundles"}"#).unwrap();
		assert_eq!(options.level, Level::Info);
		assert_eq!(options.bundle_root_path, "/bundles");
		assert!(!options.debug);
	}

	#[test]
	fn recognised_level() {
		let options = Options::from_json(r#"{"level": "warn", "debug": true, "plugins": ["a"]}"#).unwrap();
		assert_eq!(options.level, Level::Warn);
		assert!(options.debug);
		assert_eq!(options.plugins, ["a"]);
	}

	#[test]
	fn empty_object_is_default() {
		let options = Options::from_json("{}").unwrap();
		assert_eq!(options.level, Level::Info);
		assert!(options.bundles.is_empty());
		assert!(!options.preload);
	}
}
