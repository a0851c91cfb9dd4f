//! Reduced-motion preference.
//!
//! The stored setting is `"on"`, `"off"` or unset; unset defers to what the
//! operating system reports. [`MotionPreferences`] handles are cheap to clone
//! and read the current value synchronously, never awaiting the writer. The
//! single [`MotionPreferenceWriter`] publishes changes to every handle and
//! stales the cached setting so views refetch it.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::info;

use crate::cache::QueryClient;
use crate::domain::entities::SettingRecord;
use crate::domain::error::DomainError;
use crate::keys::settings::{self, REDUCE_MOTION};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionSetting {
    On,
    Off,
    #[default]
    Unset,
}

impl MotionSetting {
    /// Parse a stored setting value; `None` and blank mean unset.
    pub fn from_value(value: Option<&str>) -> Result<Self, DomainError> {
        match value.map(str::trim) {
            None | Some("") => Ok(MotionSetting::Unset),
            Some(raw) => raw.parse(),
        }
    }

    pub fn from_record(record: &SettingRecord) -> Result<Self, DomainError> {
        Self::from_value(record.value.as_deref())
    }

    /// The value to store, `None` when unset.
    pub fn as_value(self) -> Option<&'static str> {
        match self {
            MotionSetting::On => Some("on"),
            MotionSetting::Off => Some("off"),
            MotionSetting::Unset => None,
        }
    }

    pub fn resolve(self, system: &dyn SystemMotionSignal) -> bool {
        match self {
            MotionSetting::On => true,
            MotionSetting::Off => false,
            MotionSetting::Unset => system.prefers_reduced_motion(),
        }
    }
}

impl fmt::Display for MotionSetting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_value().unwrap_or("unset"))
    }
}

impl FromStr for MotionSetting {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "on" => Ok(MotionSetting::On),
            "off" => Ok(MotionSetting::Off),
            "unset" | "" => Ok(MotionSetting::Unset),
            _ => Err(DomainError::invalid_setting(REDUCE_MOTION, value)),
        }
    }
}

/// The platform's own reduced-motion preference.
pub trait SystemMotionSignal: Send + Sync {
    fn prefers_reduced_motion(&self) -> bool;
}

/// A system signal with a fixed answer, taken from configuration.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedMotionSignal(pub bool);

impl SystemMotionSignal for FixedMotionSignal {
    fn prefers_reduced_motion(&self) -> bool {
        self.0
    }
}

/// Create the writer and a first reader for the motion preference.
pub fn motion_preferences(
    initial: MotionSetting,
    system: Arc<dyn SystemMotionSignal>,
    client: QueryClient,
) -> (MotionPreferenceWriter, MotionPreferences) {
    let (tx, rx) = watch::channel(initial);
    let reader = MotionPreferences {
        rx,
        system: Arc::clone(&system),
    };
    let writer = MotionPreferenceWriter { tx, system, client };
    (writer, reader)
}

/// Read handle on the motion preference.
#[derive(Clone)]
pub struct MotionPreferences {
    rx: watch::Receiver<MotionSetting>,
    system: Arc<dyn SystemMotionSignal>,
}

impl fmt::Debug for MotionPreferences {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MotionPreferences")
            .field("setting", &self.get())
            .finish()
    }
}

impl MotionPreferences {
    pub fn get(&self) -> MotionSetting {
        *self.rx.borrow()
    }

    /// Whether animations should be reduced right now.
    pub fn reduce_motion(&self) -> bool {
        self.get().resolve(self.system.as_ref())
    }

    /// A receiver notified on every change of the stored setting.
    pub fn subscribe(&self) -> watch::Receiver<MotionSetting> {
        self.rx.clone()
    }

    /// Wait for the next change. Returns `None` once the writer is gone.
    pub async fn changed(&mut self) -> Option<MotionSetting> {
        self.rx.changed().await.ok()?;
        Some(*self.rx.borrow_and_update())
    }
}

/// The one handle allowed to change the motion preference.
pub struct MotionPreferenceWriter {
    tx: watch::Sender<MotionSetting>,
    system: Arc<dyn SystemMotionSignal>,
    client: QueryClient,
}

impl MotionPreferenceWriter {
    /// Publish `setting`. Returns false when it equals the current value, in
    /// which case nobody is notified.
    pub fn set(&self, setting: MotionSetting) -> bool {
        let changed = self.tx.send_if_modified(|current| {
            if *current == setting {
                return false;
            }
            *current = setting;
            true
        });
        if changed {
            self.client.invalidate(&settings::detail(REDUCE_MOTION));
            info!(setting = %setting, "reduced motion preference changed");
        }
        changed
    }

    /// Publish the value of a freshly written setting record.
    pub fn apply_record(&self, record: &SettingRecord) -> Result<bool, DomainError> {
        Ok(self.set(MotionSetting::from_record(record)?))
    }

    pub fn reader(&self) -> MotionPreferences {
        MotionPreferences {
            rx: self.tx.subscribe(),
            system: Arc::clone(&self.system),
        }
    }
}
