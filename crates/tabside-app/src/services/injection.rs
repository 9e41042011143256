//! Sidebar injection port

use tabside_core::{InjectionError, Tab};

/// Adds or removes the sidebar overlay in a live tab.
///
/// Both calls may take arbitrarily long; the reconciler marks the tab's
/// install status as in flight before calling and only trusts the result if
/// the record still describes that call when it completes.
#[trait_variant::make(InjectionPort: Send)]
pub trait LocalInjectionPort {
    /// Inject the sidebar into `tab`
    async fn inject(&self, tab: &Tab) -> Result<(), InjectionError>;

    /// Remove a previously injected sidebar from `tab`
    async fn remove(&self, tab: &Tab) -> Result<(), InjectionError>;
}
