//! Process-wide warning sink
//!
//! Non-fatal anomalies (unknown units in a file, hydrogen bonds removed
//! while guessing, fallback precision values) are reported through a
//! single sink. The default sink forwards to `tracing::warn!`; callers
//! may install their own callback with [`set_warning_callback`].

use std::sync::RwLock;

/// A callback receiving warning messages from the library
pub type WarningCallback = Box<dyn Fn(&str) + Send + Sync>;

static WARNING_CALLBACK: RwLock<Option<WarningCallback>> = RwLock::new(None);

/// Install a custom warning callback, replacing the default sink
///
/// The callback receives the full formatted message, including the name
/// of the component that emitted it.
pub fn set_warning_callback(callback: WarningCallback) {
    let mut guard = WARNING_CALLBACK
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = Some(callback);
}

/// Remove any installed callback and restore the default sink
pub fn reset_warning_callback() {
    let mut guard = WARNING_CALLBACK
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    *guard = None;
}

/// Send a warning through the process-wide sink
pub(crate) fn warning(component: &str, message: impl AsRef<str>) {
    let message = format!("{}: {}", component, message.as_ref());
    let guard = WARNING_CALLBACK
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    match guard.as_ref() {
        Some(callback) => callback(&message),
        None => tracing::warn!("{}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::sync::Mutex;

    #[test]
    fn test_custom_callback() {
        let (sender, receiver) = mpsc::channel::<String>();
        let sender = Mutex::new(sender);
        set_warning_callback(Box::new(move |message| {
            let _ = sender.lock().unwrap().send(message.to_string());
        }));

        warning("test component", "something odd");
        let received = receiver.recv().unwrap();
        assert_eq!(received, "test component: something odd");

        reset_warning_callback();
    }
}
