//! Rendering of classified results.
//!
//! A [`Presenter`] writes a [`ClassifiedResult`] to any `io::Write`. Presenters are looked
//! up by name through a [`PresenterRegistry`]. The built-in ones are:
//!
//! | name              | output                                                   |
//! |-------------------|----------------------------------------------------------|
//! | `pretty`          | stats table, then the slow/duplicate/similar statements |
//! | `raw_line`        | one `key: value` line per stat, then the same details    |
//! | `simple`          | `total: N queries in X.XX seconds`                       |
//! | `only_slow_query` | one line per slow statement                              |
//!
//! Other crates can add presenters at link time:
//!
//! ```ignore
//! pgcapture::inventory::submit! {
//!     pgcapture::PresenterRegistration {
//!         name: "json",
//!         build: build_json_presenter,
//!     }
//! }
//! ```

mod lines;
mod only_slow;
mod pretty;
mod raw_line;
mod simple;

#[cfg(test)]
mod tests;

pub use only_slow::OnlySlowQueryPresenter;
pub use pretty::PrettyPresenter;
pub use raw_line::RawLinePresenter;
pub use simple::SimplePresenter;

use crate::classify::ClassifiedResult;
use crate::config::CaptureConfig;
use crate::error::{CaptureError, CaptureResult};
use std::collections::BTreeMap;
use std::io::Write;
use std::sync::Arc;

/// Renders a [`ClassifiedResult`].
pub trait Presenter: Send + Sync {
    /// Registry name of this presenter.
    fn name(&self) -> &str;

    /// Write the result to `out`.
    ///
    /// The default implementation fails with [`CaptureError::PresenterNotImplemented`].
    fn render(&self, result: &ClassifiedResult, out: &mut dyn Write) -> CaptureResult<()> {
        let _ = (result, out);
        Err(CaptureError::PresenterNotImplemented(self.name().to_string()))
    }
}

/// Render `result` into a `String`.
pub fn render_to_string(
    presenter: &dyn Presenter,
    result: &ClassifiedResult,
) -> CaptureResult<String> {
    let mut buf = Vec::new();
    presenter.render(result, &mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Builds a presenter from the active configuration.
pub type PresenterFactory = fn(&CaptureConfig) -> Arc<dyn Presenter>;

/// Registration entry for link-time presenter registration.
pub struct PresenterRegistration {
    /// Name used in `PRESENTER`.
    pub name: &'static str,
    /// Factory called when a scope resolves this name.
    pub build: PresenterFactory,
}

inventory::collect!(PresenterRegistration);

fn build_pretty(config: &CaptureConfig) -> Arc<dyn Presenter> {
    Arc::new(PrettyPresenter::new(config))
}

fn build_raw_line(config: &CaptureConfig) -> Arc<dyn Presenter> {
    Arc::new(RawLinePresenter::new(config))
}

fn build_simple(_: &CaptureConfig) -> Arc<dyn Presenter> {
    Arc::new(SimplePresenter)
}

fn build_only_slow_query(config: &CaptureConfig) -> Arc<dyn Presenter> {
    Arc::new(OnlySlowQueryPresenter::new(config))
}

inventory::submit! {
    PresenterRegistration { name: "pretty", build: build_pretty }
}

inventory::submit! {
    PresenterRegistration { name: "raw_line", build: build_raw_line }
}

inventory::submit! {
    PresenterRegistration { name: "simple", build: build_simple }
}

inventory::submit! {
    PresenterRegistration { name: "only_slow_query", build: build_only_slow_query }
}

/// Name-keyed presenter factories.
#[derive(Clone)]
pub struct PresenterRegistry {
    factories: BTreeMap<String, PresenterFactory>,
}

impl PresenterRegistry {
    /// Create a registry holding every presenter registered through `inventory`.
    pub fn new() -> Self {
        let mut registry = Self::empty();
        for reg in inventory::iter::<PresenterRegistration> {
            registry.register(reg.name, reg.build);
        }
        registry
    }

    /// Create a registry with no presenters.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Add or replace a presenter.
    pub fn register(&mut self, name: impl Into<String>, build: PresenterFactory) -> &mut Self {
        self.factories.insert(name.into(), build);
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }

    /// Build the presenter registered under `name`.
    pub fn resolve(
        &self,
        name: &str,
        config: &CaptureConfig,
    ) -> CaptureResult<Arc<dyn Presenter>> {
        match self.factories.get(name) {
            Some(build) => Ok(build(config)),
            None => Err(CaptureError::PresenterNotFound {
                name: name.to_string(),
                available: self.names(),
            }),
        }
    }
}

impl Default for PresenterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PresenterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenterRegistry")
            .field("names", &self.names())
            .finish()
    }
}
