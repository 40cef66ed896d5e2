//! Plugin system for attaching reusable behaviour to a [`Router`].
//!
//! A plugin is configured up front and installs itself (usually as router-level
//! middleware) when passed to [`Router::plugin`].

use anyhow::Result;

use crate::router::Router;

/// CORS (Cross-Origin Resource Sharing) plugin for browser clients.
pub mod cors;

pub trait Plugin: Send + Sync + 'static {
    /// Returns the unique name identifier for this plugin.
    fn name(&self) -> &'static str;

    /// Installs the plugin on the given router.
    fn setup(&self, router: &mut Router) -> Result<()>;
}
