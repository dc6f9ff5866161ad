use std::sync::{Arc, Mutex, MutexGuard};

use notarius_key::KeySign;

use crate::{
    clock::{Clock, SystemClock},
    error::{CoreError, Result},
    identity::DomainIdentity,
    signature::SignatureRecord,
    signed::SignedEnvelope,
};

/// A [`SignedEnvelope`] several signers may co-sign from different threads.
///
/// Signing happens outside the lock over a snapshot of the envelope's
/// canonical bytes, which cannot change once the envelope is wrapped. Only
/// the append and re-sort run under the lock.
#[derive(Debug, Clone)]
pub struct SharedSignedEnvelope {
    inner: Arc<Mutex<SignedEnvelope>>,
}

impl SharedSignedEnvelope {
    pub fn new(signed: SignedEnvelope) -> Self {
        Self {
            inner: Arc::new(Mutex::new(signed)),
        }
    }

    pub fn add_signature(&self, identity: &DomainIdentity, key: &dyn KeySign) -> Result<()> {
        self.add_signature_at(identity, key, SystemClock.now_millis())
    }

    pub fn add_signature_at(
        &self,
        identity: &DomainIdentity,
        key: &dyn KeySign,
        timestamp_ms: i64,
    ) -> Result<()> {
        let payload = {
            let guard = self.lock()?;
            if guard.notary().is_some() {
                return Err(CoreError::AlreadyNotarized);
            }
            guard.envelope().canonical_serialize()?
        };
        let record = SignatureRecord::sign_at(&payload, identity, key, timestamp_ms)?;
        self.lock()?.insert_signature(record)
    }

    /// Clone out the current state
    pub fn snapshot(&self) -> Result<SignedEnvelope> {
        Ok(self.lock()?.clone())
    }

    /// Take the aggregate back if this is the last handle
    pub fn try_into_inner(self) -> std::result::Result<SignedEnvelope, Self> {
        match Arc::try_unwrap(self.inner) {
            Ok(mutex) => Ok(mutex
                .into_inner()
                .unwrap_or_else(|poisoned| poisoned.into_inner())),
            Err(inner) => Err(Self { inner }),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, SignedEnvelope>> {
        self.inner
            .lock()
            .map_err(|_| CoreError::InvalidEnvelope("signed envelope lock poisoned".to_string()))
    }
}
