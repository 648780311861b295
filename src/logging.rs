//! Log output for the binary.

use tracing::Level;
use tracing_subscriber::fmt::SubscriberBuilder;

/// Install a plain-text subscriber at INFO.
///
/// The level is fixed; nothing is read from the environment. Calling this
/// again, or after another subscriber was installed, does nothing.
pub fn init() {
    let _ = builder().try_init();
}

/// The line format shared by [`init`] and anything that captures output.
pub(crate) fn builder() -> SubscriberBuilder {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .with_target(false)
}
