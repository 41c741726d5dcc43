//! # Verification Store
//!
//! Email and phone verification with one-time codes, and the trust badges
//! that follow from it.
//!
//! ## Ticket Lifecycle
//! ```text
//! start_verification(user, channel, target)
//!      │  status[channel] = pending (verified stays verified)
//!      │  ticket { code: 6 digits, ttl: 10 min }
//!      ▼
//! confirm_verification(ticket_id, code)
//!      ├── expired ──────────────► ticket dropped, status = unverified
//!      ├── wrong code ───────────► attempts += 1
//!      │     └── 5th wrong code ─► ticket dropped, status = unverified
//!      └── correct ──────────────► ticket dropped, status = verified
//! ```
//!
//! Profiles persist under `verification-storage`; tickets live in memory,
//! so a `pending` status found at startup is reset to `unverified`. Statuses
//! changed before [`VerificationStore::initialize`] win over the stored ones
//! for their channel.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};
use hearth_core::validation::{validate_email, validate_phone};
use hearth_core::{
    generate_id, CoreError, TrustBadge, VerificationChannel, VerificationProfile,
    VerificationStatus, VerificationTicket, MAX_VERIFICATION_ATTEMPTS,
    VERIFICATION_CODE_TTL_MINUTES,
};
use hearth_kv::{PersistHandle, WriteQueue};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::{load_slice, LoadOutcome, VERIFICATION_KEY};
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VerificationSnapshot {
    #[serde(default)]
    profiles: BTreeMap<String, VerificationProfile>,
}

/// A freshly issued ticket. The host delivers `ticket.code` to the target.
#[derive(Debug)]
pub struct StartedVerification {
    pub ticket: VerificationTicket,
    pub persist: PersistHandle,
}

#[derive(Debug, Default)]
struct Inner {
    profiles: BTreeMap<String, VerificationProfile>,
    tickets: Vec<VerificationTicket>,
    hydrated: Option<LoadOutcome>,
    /// Channels whose status changed before hydration.
    touched: HashSet<(String, VerificationChannel)>,
}

impl Inner {
    fn profile_mut(&mut self, user_id: &str) -> &mut VerificationProfile {
        self.profiles
            .entry(user_id.to_string())
            .or_insert_with(|| VerificationProfile::new(user_id))
    }

    fn set_status(
        &mut self,
        user_id: &str,
        channel: VerificationChannel,
        status: VerificationStatus,
    ) {
        self.profile_mut(user_id).set_status(channel, status);
        if self.hydrated.is_none() {
            self.touched.insert((user_id.to_string(), channel));
        }
    }

    fn merge_loaded(&mut self, mut loaded: BTreeMap<String, VerificationProfile>) {
        for profile in loaded.values_mut() {
            for channel in [VerificationChannel::Email, VerificationChannel::Phone] {
                if profile.status(channel) == VerificationStatus::Pending {
                    profile.set_status(channel, VerificationStatus::Unverified);
                }
            }
        }
        for (user_id, channel) in self.touched.drain() {
            let status = self
                .profiles
                .get(&user_id)
                .map(|p| p.status(channel))
                .unwrap_or_default();
            loaded
                .entry(user_id.clone())
                .or_insert_with(|| VerificationProfile::new(&user_id))
                .set_status(channel, status);
        }
        self.profiles = loaded;
    }
}

pub struct VerificationStore {
    queue: Arc<WriteQueue>,
    inner: RwLock<Inner>,
}

/// Six digits, never a leading zero.
fn verification_code() -> String {
    rand::thread_rng().gen_range(100_000..1_000_000).to_string()
}

impl VerificationStore {
    pub fn new(queue: Arc<WriteQueue>) -> Self {
        queue.hold(VERIFICATION_KEY);
        VerificationStore {
            queue,
            inner: RwLock::new(Inner::default()),
        }
    }

    pub async fn initialize(&self) -> LoadOutcome {
        let hydrated = self.read().hydrated.clone();
        if let Some(outcome) = hydrated {
            return outcome;
        }

        let (stored, outcome) =
            load_slice::<VerificationSnapshot>(&self.queue, VERIFICATION_KEY).await;

        let mut inner = self.write();
        if let Some(outcome) = inner.hydrated.clone() {
            return outcome;
        }
        match stored {
            Some(snapshot) => inner.merge_loaded(snapshot.profiles),
            None => inner.touched.clear(),
        }
        inner.hydrated = Some(outcome.clone());
        debug!(profiles = inner.profiles.len(), "Verification profiles loaded");

        let snapshot = VerificationSnapshot {
            profiles: inner.profiles.clone(),
        };
        drop(self.queue.release_json(VERIFICATION_KEY, &snapshot));
        outcome
    }

    pub fn start_verification(
        &self,
        user_id: Option<&str>,
        channel: VerificationChannel,
        target: &str,
    ) -> AppResult<StartedVerification> {
        let Some(user_id) = user_id.map(str::trim).filter(|id| !id.is_empty()) else {
            warn!(%channel, "Verification requested without a user id");
            return Err(AppError::MissingUserId);
        };

        let target = match channel {
            VerificationChannel::Email => validate_email(target)?,
            VerificationChannel::Phone => validate_phone(target)?,
        };

        let ticket = VerificationTicket {
            id: generate_id(),
            user_id: user_id.to_string(),
            channel,
            target,
            code: verification_code(),
            expires_at: Utc::now() + Duration::minutes(VERIFICATION_CODE_TTL_MINUTES),
            attempts: 0,
        };

        let mut inner = self.write();
        inner
            .tickets
            .retain(|t| !(t.user_id == user_id && t.channel == channel));
        inner.tickets.push(ticket.clone());
        // Re-verifying keeps an earned badge; expiry and exhaustion only undo pending
        let current = inner.profile_mut(user_id).status(channel);
        let persist = if current == VerificationStatus::Verified {
            PersistHandle::skipped()
        } else {
            inner.set_status(user_id, channel, VerificationStatus::Pending);
            self.persist(&inner)
        };

        info!(user_id, %channel, ticket_id = %ticket.id, "Verification code issued");
        Ok(StartedVerification { ticket, persist })
    }

    pub fn confirm_verification(&self, ticket_id: &str, code: &str) -> AppResult<PersistHandle> {
        self.confirm_at(ticket_id, code, Utc::now())
    }

    fn confirm_at(&self, ticket_id: &str, code: &str, now: DateTime<Utc>) -> AppResult<PersistHandle> {
        let mut inner = self.write();
        let index = inner
            .tickets
            .iter()
            .position(|t| t.id == ticket_id)
            .ok_or_else(|| CoreError::TicketNotFound(ticket_id.to_string()))?;

        if inner.tickets[index].is_expired(now) {
            let ticket = inner.tickets.remove(index);
            self.reset_pending(&mut inner, &ticket);
            debug!(ticket_id, "Verification ticket expired");
            return Err(CoreError::TicketExpired.into());
        }

        if inner.tickets[index].code != code.trim() {
            inner.tickets[index].attempts += 1;
            let remaining = MAX_VERIFICATION_ATTEMPTS.saturating_sub(inner.tickets[index].attempts);
            if remaining == 0 {
                let ticket = inner.tickets.remove(index);
                self.reset_pending(&mut inner, &ticket);
                warn!(ticket_id, user_id = %ticket.user_id, "Verification attempts exhausted");
            }
            return Err(CoreError::IncorrectCode { remaining }.into());
        }

        let ticket = inner.tickets.remove(index);
        inner.set_status(&ticket.user_id, ticket.channel, VerificationStatus::Verified);
        info!(user_id = %ticket.user_id, channel = %ticket.channel, "Verified");
        Ok(self.persist(&inner))
    }

    /// Unknown users get an all-unverified profile.
    pub fn profile(&self, user_id: &str) -> VerificationProfile {
        self.read()
            .profiles
            .get(user_id)
            .cloned()
            .unwrap_or_else(|| VerificationProfile::new(user_id))
    }

    pub fn badges(&self, user_id: &str) -> Vec<TrustBadge> {
        self.profile(user_id).badges()
    }

    fn reset_pending(&self, inner: &mut Inner, ticket: &VerificationTicket) {
        let current = inner.profile_mut(&ticket.user_id).status(ticket.channel);
        if current == VerificationStatus::Pending {
            inner.set_status(&ticket.user_id, ticket.channel, VerificationStatus::Unverified);
            drop(self.persist(inner));
        }
    }

    // Called with the write lock held so queue order matches mutation order
    fn persist(&self, inner: &Inner) -> PersistHandle {
        let snapshot = VerificationSnapshot {
            profiles: inner.profiles.clone(),
        };
        self.queue.enqueue_json(VERIFICATION_KEY, &snapshot)
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}
