use grove_dom::{configure, Error, Level, Options};

/// Configures once per test binary, with assertions enabled.
pub fn setup() {
	match configure(Options { debug: true, level: Level::Warn, ..Options::default() }) {
		Ok(_) | Err(Error::AlreadyConfigured) => (),
		Err(error) => panic!("Failed to configure: {}", error),
	}
}
