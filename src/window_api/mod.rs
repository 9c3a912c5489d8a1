//! Contains logic for probing the focused window in different environments.
//! [GenericWindowProbe] is the main artifact of this module that abstracts
//! the operations.

#[cfg(feature = "win")]
pub mod win;
#[cfg(feature = "x11")]
pub mod x11;

#[cfg(feature = "win")]
extern crate windows;

#[cfg(feature = "x11")]
extern crate xcb;

use std::sync::Arc;

use anyhow::Result;

/// Platform specific identifier of a window. Only used for comparing samples with each other.
pub type WindowId = u64;

/// A single observation of the focused window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowIdentity {
    /// Opaque platform window id. Two samples belong to the same session iff these are equal.
    pub id: WindowId,
    /// Name of the window. For example 'bash in hello' or 'Document 1' or 'Vibing in YouTube -
    /// Chrome'
    pub title: Arc<str>,
    /// Name of the application owning the window. Native probes report the executable path.
    pub app_name: Arc<str>,
    /// Only present for browser-like windows whose probe can see the url.
    pub url: Option<Arc<str>>,
}

/// Intended to serve as a contract windows and linux systems must implement.
#[cfg_attr(test, mockall::automock)]
pub trait WindowProbe {
    /// Returns the focused window, or `None` if nothing is focusable right now (no windows,
    /// locked screen and so on).
    fn get_active_window(&mut self) -> Result<Option<WindowIdentity>>;
}

/// Serves as a cross-compatible WindowProbe implementation.
pub struct GenericWindowProbe {
    inner: Box<dyn WindowProbe>,
}

impl GenericWindowProbe {
    pub fn new() -> Result<Self> {
        cfg_if::cfg_if! {
            if #[cfg(feature = "win")] {
                use win::WindowsWindowProbe;
                Ok(Self {
                    inner: Box::new(WindowsWindowProbe::new()),
                })
            }
            else if #[cfg(feature = "x11")] {
                use x11::LinuxWindowProbe;
                Ok(Self {
                    inner: Box::new(LinuxWindowProbe::new()?),
                })
            }
            else {
                Err(anyhow::anyhow!(
                    "No window probe was compiled in. Enable either the `x11` or the `win` feature"
                ))
            }
        }
    }
}

impl WindowProbe for GenericWindowProbe {
    fn get_active_window(&mut self) -> Result<Option<WindowIdentity>> {
        self.inner.get_active_window()
    }
}
