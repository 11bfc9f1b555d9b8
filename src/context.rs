//! Engine context
//!
//! The original design hid the allocator state and the fatal-error handler
//! behind process-wide singletons; here both are an explicitly constructed,
//! explicitly owned value injected into the components that need them. The
//! fatal hook is the single escalation point for unrecoverable failures
//! (arena exhaustion, internal consistency violations) — everything else in
//! the engine reports errors through `Result` or sentinel values.

use std::path::PathBuf;
use std::process;

use tracing::error;

/// Current document-shape version produced by the tree builder
pub const DOM_VERSION_CURRENT: u32 = 20200824;

/// Documents requesting at least this version use normalized (V2) addresses
pub const DOM_VERSION_NORMALIZED_ADDRESSES: u32 = 20200223;

/// Engine-wide options that affect parse/layout output. They are folded into
/// the cache flags word, so changing any of them invalidates cache entries.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Document-shape version requested for this document; controls which
    /// address serialization format is used and is validated against the
    /// cache header on reopen
    pub dom_version_requested: u32,
    /// Whether the document cache may be used at all
    pub caching_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            dom_version_requested: DOM_VERSION_CURRENT,
            caching_enabled: true,
        }
    }
}

/// Handler invoked on unrecoverable failure. Runs after best-effort cleanup;
/// must not return control to the engine.
pub type FatalHandler = Box<dyn Fn(i32, &str) + Send>;

/// Explicitly owned engine context: configuration plus the fatal-error hook
pub struct EngineContext {
    config: EngineConfig,
    fatal_handler: Option<FatalHandler>,
    /// Temporary file removed before escalating a fatal error
    temp_file: Option<PathBuf>,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("config", &self.config)
            .field("temp_file", &self.temp_file)
            .finish_non_exhaustive()
    }
}

impl EngineContext {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            fatal_handler: None,
            temp_file: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Install a custom fatal-error handler (the default aborts the process)
    pub fn set_fatal_handler(&mut self, handler: FatalHandler) {
        self.fatal_handler = Some(handler);
    }

    /// Register a temporary file to remove before fatal escalation
    pub fn set_temp_file(&mut self, path: PathBuf) {
        self.temp_file = Some(path);
    }

    /// Escalate an unrecoverable failure. Never returns.
    pub fn fatal(&self, code: i32, message: &str) -> ! {
        error!(code, message, "fatal engine error");
        if let Some(path) = &self.temp_file {
            let _ = std::fs::remove_file(path);
        }
        if let Some(handler) = &self.fatal_handler {
            handler(code, message);
        }
        process::abort();
    }
}

impl Default for EngineContext {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_uses_current_dom_version() {
        let ctx = EngineContext::default();
        assert_eq!(ctx.config().dom_version_requested, DOM_VERSION_CURRENT);
        assert!(ctx.config().caching_enabled);
    }

    #[test]
    fn test_normalized_threshold_below_current() {
        assert!(DOM_VERSION_NORMALIZED_ADDRESSES <= DOM_VERSION_CURRENT);
    }
}
