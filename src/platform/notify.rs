//! Notification delivery sinks.

use std::path::PathBuf;
use std::process::Command;

use crate::core::system_monitor::{NotificationRequest, NotificationSink};

/// Desktop notifications via `notify-send`
///
/// Each request runs on a detached thread; failures are logged and dropped.
pub struct DesktopNotifier {
    program: Option<PathBuf>,
}

impl DesktopNotifier {
    pub fn new() -> Self {
        let program = which::which("notify-send").ok();
        if program.is_none() {
            log::warn!("notify-send not found, alerts will only be logged");
        }
        Self { program }
    }

    pub fn is_available(&self) -> bool {
        self.program.is_some()
    }
}

impl Default for DesktopNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationSink for DesktopNotifier {
    fn dispatch(&self, request: NotificationRequest) {
        let Some(program) = self.program.clone() else {
            LogNotifier.dispatch(request);
            return;
        };

        std::thread::spawn(move || {
            let status = Command::new(&program)
                .args([
                    "-u",
                    request.urgency.as_str(),
                    &request.title,
                    &request.message,
                ])
                .status();

            match status {
                Ok(status) if status.success() => {
                    log::info!("Notification delivered: {}", request.message)
                }
                Ok(status) => log::warn!("notify-send exited with {}", status),
                Err(e) => log::warn!("Failed to run notify-send: {}", e),
            }
        });
    }
}

/// Writes alerts to the log instead of the desktop
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl NotificationSink for LogNotifier {
    fn dispatch(&self, request: NotificationRequest) {
        log::warn!("{}: {}", request.title, request.message);
    }
}
