//! Short-lived notifications drawn over the bottom-right corner.

use std::time::{Duration, Instant};

const TOAST_TTL: Duration = Duration::from_secs(4);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub kind: ToastKind,
    pub message: String,
    created: Instant,
}

#[derive(Debug, Clone, Default)]
pub struct Toasts {
    items: Vec<Toast>,
}

impl Toasts {
    pub fn push(&mut self, kind: ToastKind, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!("toast: {}", message);
        self.items.push(Toast {
            kind,
            message,
            created: Instant::now(),
        });
    }

    pub fn info(&mut self, message: impl Into<String>) {
        self.push(ToastKind::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.push(ToastKind::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        self.push(ToastKind::Error, message);
    }

    /// Drop expired toasts.
    pub fn on_tick(&mut self) {
        self.items.retain(|t| t.created.elapsed() < TOAST_TTL);
    }

    pub fn items(&self) -> &[Toast] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fresh_toasts_survive_tick() {
        let mut toasts = Toasts::default();
        toasts.warn("careful");
        toasts.on_tick();
        assert_eq!(toasts.items().len(), 1);
        assert_eq!(toasts.items()[0].kind, ToastKind::Warning);
    }
}
