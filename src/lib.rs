pub mod acquire;
pub mod api;
pub mod assemble;
pub mod caption;
pub mod config;
pub mod ffmpeg;
pub mod generator;
pub mod init;
pub mod job;
pub mod render;
pub mod request;
pub mod retry;
pub mod server;

pub(crate) fn logv(tag: &str, message: &str) {
    match tag {
        "WARN" => tracing::warn!(tag, "{}", message),
        "DEBUG" => tracing::debug!(tag, "{}", message),
        _ => tracing::info!(tag, "{}", message),
    }
}

pub(crate) fn logi(message: impl AsRef<str>) {
    logv("INFO", message.as_ref());
}

pub(crate) fn logok(message: impl AsRef<str>) {
    logv("OK", message.as_ref());
}

pub(crate) fn logw(message: impl AsRef<str>) {
    logv("WARN", message.as_ref());
}

pub(crate) fn logd(message: impl AsRef<str>) {
    logv("DEBUG", message.as_ref());
}
