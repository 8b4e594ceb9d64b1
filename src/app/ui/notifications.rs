use std::time::{Duration, Instant};

use eframe::egui::{self, Color32, Context, RichText};

const TOAST_LIFETIME: Duration = Duration::from_secs(5);
const MAX_TOASTS: usize = 5;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(in crate::app) enum ToastLevel {
    Info,
    Error,
}

#[derive(Clone, Debug)]
struct Toast {
    level: ToastLevel,
    text: String,
    expires_at: Instant,
}

/// Short-lived messages stacked in the bottom-right corner.
#[derive(Default)]
pub(in crate::app) struct Toasts {
    items: Vec<Toast>,
}

impl Toasts {
    pub(in crate::app) fn info(&mut self, text: impl Into<String>) {
        self.push(ToastLevel::Info, text.into(), Instant::now());
    }

    pub(in crate::app) fn error(&mut self, text: impl Into<String>) {
        self.push(ToastLevel::Error, text.into(), Instant::now());
    }

    fn push(&mut self, level: ToastLevel, text: String, now: Instant) {
        if self.items.len() == MAX_TOASTS {
            self.items.remove(0);
        }
        self.items.push(Toast {
            level,
            text,
            expires_at: now + TOAST_LIFETIME,
        });
    }

    /// Drops expired toasts and returns how long until the next one expires.
    fn expire(&mut self, now: Instant) -> Option<Duration> {
        self.items.retain(|toast| toast.expires_at > now);
        self.items
            .iter()
            .map(|toast| toast.expires_at - now)
            .min()
    }

    pub(in crate::app) fn show(&mut self, ctx: &Context) {
        let Some(next_expiry) = self.expire(Instant::now()) else {
            return;
        };
        ctx.request_repaint_after(next_expiry);

        egui::Area::new(egui::Id::new("toasts"))
            .anchor(egui::Align2::RIGHT_BOTTOM, [-12.0, -12.0])
            .interactable(false)
            .show(ctx, |ui| {
                for toast in &self.items {
                    let color = match toast.level {
                        ToastLevel::Info => ui.visuals().text_color(),
                        ToastLevel::Error => Color32::from_rgb(235, 96, 96),
                    };
                    egui::Frame::popup(ui.style()).show(ui, |ui| {
                        ui.label(RichText::new(toast.text.as_str()).color(color));
                    });
                    ui.add_space(4.0);
                }
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toasts_expire_after_their_lifetime() {
        let now = Instant::now();
        let mut toasts = Toasts::default();
        toasts.push(ToastLevel::Info, "saved".to_owned(), now);
        toasts.push(
            ToastLevel::Error,
            "failed".to_owned(),
            now + Duration::from_secs(2),
        );

        assert_eq!(toasts.expire(now), Some(TOAST_LIFETIME));
        assert_eq!(
            toasts.expire(now + TOAST_LIFETIME),
            Some(Duration::from_secs(2))
        );
        assert_eq!(toasts.items.len(), 1);
        assert_eq!(toasts.items[0].level, ToastLevel::Error);
        assert_eq!(toasts.expire(now + TOAST_LIFETIME * 2), None);
    }

    #[test]
    fn oldest_toast_is_dropped_when_full() {
        let now = Instant::now();
        let mut toasts = Toasts::default();
        for index in 0..=MAX_TOASTS {
            toasts.push(ToastLevel::Info, index.to_string(), now);
        }
        assert_eq!(toasts.items.len(), MAX_TOASTS);
        assert_eq!(toasts.items[0].text, "1");
    }
}
