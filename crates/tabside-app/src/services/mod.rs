//! Collaborator ports
//!
//! The reconciler never touches the browser directly. Everything it needs
//! from the outside world goes through one of these traits, bundled into
//! [`Ports`] and handed to the [`Engine`](crate::Engine) at construction.
//!
//! ## Key Components
//!
//! - [`InjectionPort`]: inject/remove the sidebar overlay (async, fallible)
//! - [`AnnotationCountPort`]: remote annotation count for a URL (async)
//! - [`TabsPort`]: live tab lookup before install/remove evaluation (async)
//! - [`ActionIndicator`]: browser-action icon and badge (sync, fire-and-forget)
//! - [`HelpSurface`]: error help display (sync, fire-and-forget)

mod annotations;
mod injection;
mod surfaces;
mod tabs;

use std::sync::Arc;

pub use annotations::{is_countable_url, AnnotationCountPort, LocalAnnotationCountPort};
pub use injection::{InjectionPort, LocalInjectionPort};
pub use surfaces::{ActionIndicator, HelpSurface, IndicatorBadge};
pub use tabs::{LocalTabsPort, TabsPort};

#[cfg(test)]
pub use surfaces::{MockActionIndicator, MockHelpSurface};

/// Every collaborator the engine talks to
pub struct Ports<I, A, T> {
    pub injection: Arc<I>,
    pub annotations: Arc<A>,
    pub tabs: Arc<T>,
    pub indicator: Arc<dyn ActionIndicator>,
    pub help: Arc<dyn HelpSurface>,
}

impl<I, A, T> Ports<I, A, T> {
    pub fn new(
        injection: Arc<I>,
        annotations: Arc<A>,
        tabs: Arc<T>,
        indicator: Arc<dyn ActionIndicator>,
        help: Arc<dyn HelpSurface>,
    ) -> Self {
        Self {
            injection,
            annotations,
            tabs,
            indicator,
            help,
        }
    }
}

impl<I, A, T> Clone for Ports<I, A, T> {
    fn clone(&self) -> Self {
        Self {
            injection: Arc::clone(&self.injection),
            annotations: Arc::clone(&self.annotations),
            tabs: Arc::clone(&self.tabs),
            indicator: Arc::clone(&self.indicator),
            help: Arc::clone(&self.help),
        }
    }
}
