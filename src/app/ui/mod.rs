mod canvas;
mod controls;
mod details;
pub(super) mod notifications;
mod panels;
