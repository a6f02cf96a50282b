//! File-backed host implementations for the CLI.
//!
//! The durable and secure stores are each one JSON object per file,
//! mirroring the mobile app's storage layout. The "secure" store is a
//! plain file — fine for a developer CLI, nothing like a real host's
//! keychain.

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write as _};
use std::path::PathBuf;

use async_trait::async_trait;
use citypulse_core::platform::{
    BiometricCapability, BiometricOutcome, BiometricPrompt, KeyValueStore, PlatformHost,
    SecureStore, StoreError, StoreResult,
};
use citypulse_core::TextDirection;

/// String map persisted as pretty JSON in a single file.
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    fn read_map(&self) -> StoreResult<HashMap<String, String>> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw)
                .map_err(|err| StoreError::unavailable(format!("corrupt store file: {err}"))),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(HashMap::new()),
            Err(err) => Err(StoreError::unavailable(format!(
                "read {}: {err}",
                self.path.display()
            ))),
        }
    }

    fn write_map(&self, map: &HashMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|err| {
                StoreError::unavailable(format!("create {}: {err}", parent.display()))
            })?;
        }
        let raw = serde_json::to_string_pretty(map)
            .map_err(|err| StoreError::unavailable(format!("serialize store: {err}")))?;
        fs::write(&self.path, raw).map_err(|err| {
            StoreError::unavailable(format!("write {}: {err}", self.path.display()))
        })
    }

    fn get_value(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.read_map()?.get(key).cloned())
    }

    fn set_value(&self, key: &str, value: &str) -> StoreResult<()> {
        let mut map = self.read_map().unwrap_or_default();
        map.insert(key.to_string(), value.to_string());
        self.write_map(&map)
    }

    fn delete_value(&self, key: &str) -> StoreResult<()> {
        let mut map = self.read_map().unwrap_or_default();
        map.remove(key);
        self.write_map(&map)
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.get_value(key)
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.set_value(key, value)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.delete_value(key)
    }
}

#[async_trait]
impl SecureStore for FileStore {
    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        self.get_value(key)
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.set_value(key, value)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.delete_value(key)
    }
}

/// App shell of the CLI. Every invocation is already a fresh process, so a
/// restart request is satisfied by just saying so.
pub struct CliHost;

#[async_trait]
impl PlatformHost for CliHost {
    fn set_text_direction(&self, direction: TextDirection) -> StoreResult<()> {
        let label = match direction {
            TextDirection::Ltr => "left-to-right",
            TextDirection::Rtl => "right-to-left",
        };
        println!("text direction is now {label}");
        Ok(())
    }

    async fn request_restart(&self) -> StoreResult<()> {
        println!("restart requested; the next invocation picks the change up");
        Ok(())
    }
}

/// Biometric prompt standing in for device hardware: asks on the terminal.
pub struct TerminalBiometricPrompt;

#[async_trait]
impl BiometricPrompt for TerminalBiometricPrompt {
    async fn capability(&self) -> BiometricCapability {
        BiometricCapability::Available
    }

    async fn authenticate(&self, message: &str) -> BiometricOutcome {
        print!("{message} — confirm? [y/N] ");
        if io::stdout().flush().is_err() {
            return BiometricOutcome::Unavailable {
                reason: "terminal unavailable".to_string(),
            };
        }
        let mut answer = String::new();
        match io::stdin().read_line(&mut answer) {
            Ok(_) if answer.trim().eq_ignore_ascii_case("y") => BiometricOutcome::Success,
            Ok(_) => BiometricOutcome::Canceled,
            Err(err) => BiometricOutcome::Unavailable {
                reason: format!("terminal unavailable: {err}"),
            },
        }
    }
}
