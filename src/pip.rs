//! Picture-in-Picture bridge.
//!
//! The bridge asks the platform for a PiP surface and then *observes* its
//! lifecycle; `active` is derived from the platform's entered/exited signals,
//! never from the request having been issued. PiP is an independent axis
//! from the display mode: it suspends whichever overlay is visible and
//! restores it on exit, whoever initiated that exit.

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum PipError {
    #[error("picture-in-picture is not supported on this platform")]
    Unsupported,
    #[error("picture-in-picture request rejected: {0}")]
    Rejected(String),
}

/// Lifecycle signals reported by the platform surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipEvent {
    Entered,
    Exited,
}

/// Observed PiP state. One flag; everything else belongs to the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipState {
    pub active: bool,
}

/// Platform seam for the native PiP window.
///
/// The real implementation drives an always-on-top OS viewport from the app
/// layer; tests use a scripted fake.
pub trait PipSurface {
    /// Ask the platform to present the PiP surface. Success here only means
    /// the request was accepted; `Entered` arrives via `poll`.
    fn request(&mut self) -> Result<(), PipError>;

    /// Ask the platform to dismiss the surface.
    fn close(&mut self);

    /// Drain lifecycle signals. Called once per UI frame.
    fn poll(&mut self) -> Vec<PipEvent>;
}

/// Requests and observes the platform PiP surface.
pub struct PipBridge {
    surface: Box<dyn PipSurface>,
    state: PipState,
    /// A request was accepted but `Entered` has not been polled yet. An exit
    /// in this window must still dismiss the surface.
    requested: bool,
}

impl PipBridge {
    pub fn new(surface: Box<dyn PipSurface>) -> Self {
        Self {
            surface,
            state: PipState::default(),
            requested: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    /// Request PiP. The caller maps an error to the minimized-mode fallback.
    pub fn request(&mut self) -> Result<(), PipError> {
        if self.state.active || self.requested {
            return Ok(());
        }
        self.surface.request()?;
        self.requested = true;
        Ok(())
    }

    /// Dismiss the surface, e.g. from the restore affordance or on close.
    /// Also covers an accepted request whose `Entered` is still in flight;
    /// the state flips only once the platform reports `Exited`.
    pub fn exit(&mut self) {
        if self.state.active || self.requested {
            self.surface.close();
        }
    }

    /// Drain platform signals; returns them so the owner can restore or
    /// suspend overlays.
    pub fn pump(&mut self) -> Vec<PipEvent> {
        let events = self.surface.poll();
        for event in &events {
            match event {
                PipEvent::Entered => {
                    debug!("entered picture-in-picture");
                    self.state.active = true;
                    self.requested = false;
                }
                PipEvent::Exited => {
                    debug!("exited picture-in-picture");
                    self.state.active = false;
                    self.requested = false;
                }
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scripted platform: confirms entry on the poll after a request, and
    /// can simulate a platform-initiated exit.
    #[derive(Default)]
    struct FakeSurface {
        supported: bool,
        pending: Vec<PipEvent>,
        requests: usize,
        closes: usize,
    }

    impl PipSurface for FakeSurface {
        fn request(&mut self) -> Result<(), PipError> {
            self.requests += 1;
            if !self.supported {
                return Err(PipError::Unsupported);
            }
            self.pending.push(PipEvent::Entered);
            Ok(())
        }

        fn close(&mut self) {
            self.closes += 1;
            self.pending.push(PipEvent::Exited);
        }

        fn poll(&mut self) -> Vec<PipEvent> {
            std::mem::take(&mut self.pending)
        }
    }

    #[test]
    fn active_only_after_platform_confirms() {
        let mut bridge = PipBridge::new(Box::new(FakeSurface {
            supported: true,
            ..Default::default()
        }));

        bridge.request().unwrap();
        assert!(!bridge.is_active());

        let events = bridge.pump();
        assert_eq!(events, vec![PipEvent::Entered]);
        assert!(bridge.is_active());
    }

    #[test]
    fn unsupported_platform_reports_error() {
        let mut bridge = PipBridge::new(Box::new(FakeSurface::default()));
        assert!(bridge.request().is_err());
        assert!(!bridge.is_active());
    }

    #[test]
    fn platform_initiated_exit_clears_active() {
        let surface = FakeSurface {
            supported: true,
            ..Default::default()
        };
        let mut bridge = PipBridge::new(Box::new(surface));
        bridge.request().unwrap();
        bridge.pump();
        assert!(bridge.is_active());

        bridge.exit();
        let events = bridge.pump();
        assert_eq!(events, vec![PipEvent::Exited]);
        assert!(!bridge.is_active());
    }

    #[test]
    fn request_while_active_is_idempotent() {
        let mut bridge = PipBridge::new(Box::new(FakeSurface {
            supported: true,
            ..Default::default()
        }));
        bridge.request().unwrap();
        bridge.pump();
        bridge.request().unwrap();
        assert!(bridge.pump().is_empty());
        assert!(bridge.is_active());
    }

    #[test]
    fn exit_before_entry_is_confirmed_still_dismisses_surface() {
        let mut bridge = PipBridge::new(Box::new(FakeSurface {
            supported: true,
            ..Default::default()
        }));
        bridge.request().unwrap();
        // `Entered` is still queued; the exit must not be dropped.
        bridge.exit();

        let events = bridge.pump();
        assert_eq!(events, vec![PipEvent::Entered, PipEvent::Exited]);
        assert!(!bridge.is_active());
    }

    #[test]
    fn exit_when_inactive_is_a_noop() {
        let mut bridge = PipBridge::new(Box::new(FakeSurface {
            supported: true,
            ..Default::default()
        }));
        bridge.exit();
        assert!(bridge.pump().is_empty());
    }
}
