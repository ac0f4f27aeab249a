use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

use super::encryption::{self, KdfParams, VaultKey, SALT_LEN};
use super::format::{VaultHeader, CURRENT_VERSION};
use super::traits::PortfolioStore;
use crate::errors::CoreError;
use crate::models::alert::Alert;
use crate::models::currency::CurrencyCode;
use crate::models::holding::Holding;
use crate::models::ledger::Ledger;
use crate::models::position::Position;
use crate::models::settings::Preferences;

/// Encrypted single-file store.
///
/// The whole `Ledger` is kept in memory and rewritten to disk on every
/// mutation: Ledger → bincode → AES-256-GCM(Argon2id(password)) → vault file.
/// A mutation only becomes visible once the file write succeeded.
pub struct VaultStore {
    path: PathBuf,
    password: String,
    kdf_params: KdfParams,
    ledger: Mutex<Ledger>,
}

impl std::fmt::Debug for VaultStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VaultStore")
            .field("path", &self.path)
            .field("kdf_params", &self.kdf_params)
            .finish_non_exhaustive()
    }
}

impl VaultStore {
    /// Create a new, empty vault at `path` (overwrites any existing file).
    pub fn create(path: impl AsRef<Path>, password: &str) -> Result<Self, CoreError> {
        Self::create_with_params(path, password, KdfParams::default())
    }

    /// Like `create`, with explicit Argon2 costs.
    pub fn create_with_params(
        path: impl AsRef<Path>,
        password: &str,
        kdf_params: KdfParams,
    ) -> Result<Self, CoreError> {
        let store = Self {
            path: path.as_ref().to_path_buf(),
            password: password.to_string(),
            kdf_params,
            ledger: Mutex::new(Ledger::new()),
        };
        store.persist(&Ledger::new())?;
        Ok(store)
    }

    /// Open an existing vault. Fails with `CoreError::Decryption` on a wrong password.
    pub fn open(path: impl AsRef<Path>, password: &str) -> Result<Self, CoreError> {
        let path = path.as_ref().to_path_buf();
        let bytes = std::fs::read(&path)?;
        let (header, _) = VaultHeader::decode(&bytes)?;
        let ledger = Self::unseal(&bytes, password)?;
        tracing::debug!(
            "Opened vault {} ({} holdings, {} alerts)",
            path.display(),
            ledger.holdings.len(),
            ledger.alerts.len()
        );
        Ok(Self {
            path,
            password: password.to_string(),
            kdf_params: header.kdf_params,
            ledger: Mutex::new(ledger),
        })
    }

    /// Serialize and encrypt a ledger to portable vault bytes.
    pub fn seal(ledger: &Ledger, password: &str, kdf_params: KdfParams) -> Result<Vec<u8>, CoreError> {
        let plaintext = bincode::serialize(ledger)
            .map_err(|e| CoreError::Serialization(format!("Failed to serialize ledger: {e}")))?;

        let salt = encryption::random_bytes::<SALT_LEN>()?;
        let key = VaultKey::derive(password, &salt, &kdf_params)?;
        let (nonce, ciphertext) = key.seal(&plaintext)?;

        let header = VaultHeader {
            version: CURRENT_VERSION,
            kdf_params,
            salt,
            nonce,
        };
        Ok(header.encode(&ciphertext))
    }

    /// Decrypt and deserialize vault bytes.
    pub fn unseal(data: &[u8], password: &str) -> Result<Ledger, CoreError> {
        let (header, ciphertext) = VaultHeader::decode(data)?;
        let key = VaultKey::derive(password, &header.salt, &header.kdf_params)?;
        let plaintext = key.open(&header.nonce, ciphertext)?;
        bincode::deserialize(&plaintext)
            .map_err(|e| CoreError::Deserialization(format!("Failed to deserialize ledger: {e}")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Copy of everything currently stored.
    pub fn snapshot(&self) -> Result<Ledger, CoreError> {
        Ok(self.lock()?.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Ledger>, CoreError> {
        self.ledger
            .lock()
            .map_err(|_| CoreError::Storage("vault lock poisoned".into()))
    }

    fn persist(&self, ledger: &Ledger) -> Result<(), CoreError> {
        let bytes = Self::seal(ledger, &self.password, self.kdf_params)?;
        std::fs::write(&self.path, bytes)?;
        Ok(())
    }

    /// Apply `change` to a copy of the ledger, write it, then commit in memory.
    fn mutate<T>(&self, change: impl FnOnce(&mut Ledger) -> Result<T, CoreError>) -> Result<T, CoreError> {
        let mut guard = self.lock()?;
        let mut next = guard.clone();
        let out = change(&mut next)?;
        self.persist(&next)?;
        *guard = next;
        Ok(out)
    }
}

#[cfg_attr(target_arch = "wasm32", async_trait(?Send))]
#[cfg_attr(not(target_arch = "wasm32"), async_trait)]
impl PortfolioStore for VaultStore {
    async fn list_holdings(&self, user_id: Uuid) -> Result<Vec<Holding>, CoreError> {
        Ok(self.lock()?.holdings_for(user_id))
    }

    async fn list_alerts(&self, user_id: Uuid) -> Result<Vec<Alert>, CoreError> {
        Ok(self.lock()?.alerts_for(user_id))
    }

    async fn save_portfolio(&self, holdings: &[Holding]) -> Result<(), CoreError> {
        self.mutate(|l| {
            l.upsert_holdings(holdings);
            Ok(())
        })
    }

    async fn save_alerts(&self, alerts: &[Alert]) -> Result<(), CoreError> {
        self.mutate(|l| {
            l.upsert_alerts(alerts);
            Ok(())
        })
    }

    async fn get_currency_preference(&self, user_id: Uuid) -> Result<CurrencyCode, CoreError> {
        Ok(self.lock()?.currency_for(user_id))
    }

    async fn set_currency_preference(
        &self,
        user_id: Uuid,
        currency: CurrencyCode,
    ) -> Result<(), CoreError> {
        self.mutate(|l| {
            l.set_currency(user_id, currency);
            Ok(())
        })
    }

    async fn get_preferences(&self, user_id: Uuid) -> Result<Preferences, CoreError> {
        Ok(self.lock()?.preferences_for(user_id))
    }

    async fn set_preferences(
        &self,
        user_id: Uuid,
        preferences: &Preferences,
    ) -> Result<(), CoreError> {
        self.mutate(|l| {
            l.set_preferences(user_id, preferences.clone());
            Ok(())
        })
    }

    async fn insert_holding(&self, holding: &Holding) -> Result<(), CoreError> {
        self.mutate(|l| {
            l.upsert_holdings(std::slice::from_ref(holding));
            Ok(())
        })
    }

    async fn delete_holding(&self, holding_id: Uuid) -> Result<(), CoreError> {
        self.mutate(|l| l.delete_holding(holding_id).map(|_| ()))
    }

    async fn list_positions(&self, holding_id: Uuid) -> Result<Vec<Position>, CoreError> {
        Ok(self.lock()?.positions_for(holding_id))
    }

    async fn insert_position(&self, position: &Position) -> Result<(), CoreError> {
        self.mutate(|l| l.insert_position(position.clone()))
    }

    async fn update_position(&self, position: &Position) -> Result<(), CoreError> {
        self.mutate(|l| l.update_position(position.clone()).map(|_| ()))
    }

    async fn delete_position(&self, position_id: Uuid) -> Result<Position, CoreError> {
        self.mutate(|l| l.delete_position(position_id))
    }

    async fn insert_alert(&self, alert: &Alert) -> Result<(), CoreError> {
        self.mutate(|l| {
            l.upsert_alerts(std::slice::from_ref(alert));
            Ok(())
        })
    }

    async fn delete_alert(&self, alert_id: Uuid) -> Result<(), CoreError> {
        self.mutate(|l| l.delete_alert(alert_id).map(|_| ()))
    }
}
