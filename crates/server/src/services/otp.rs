//! One-time verification code ledger.

use chrono::{Duration, Utc};
use rand::Rng;
use thiserror::Error;

use tourline_core::Email;

use crate::models::OtpCode;
use crate::notify::{Notification, Notifier};
use crate::store::{RepositoryError, Store};

/// How long a code stays redeemable after issuance.
pub const OTP_TTL_MINUTES: i64 = 5;

/// Errors from issuing or redeeming verification codes.
#[derive(Debug, Error)]
pub enum OtpError {
    /// No unused code matches. Wrong, already redeemed, and never issued are
    /// indistinguishable on purpose.
    #[error("verification code not found")]
    NotFound,

    /// The code matched but its redemption window has passed.
    #[error("verification code expired")]
    Expired,

    /// The code was persisted but the delivery send failed. The code stays
    /// redeemable.
    #[error("failed to deliver verification code")]
    DeliveryFailed,

    /// Storage failure.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Issues and redeems short-lived verification codes bound to an email
/// address.
pub struct OtpLedger<'a> {
    store: &'a dyn Store,
    notifier: &'a dyn Notifier,
}

impl<'a> OtpLedger<'a> {
    /// Create a new ledger over the given collaborators.
    #[must_use]
    pub const fn new(store: &'a dyn Store, notifier: &'a dyn Notifier) -> Self {
        Self { store, notifier }
    }

    /// Issue a fresh 6-digit code for `email` and deliver it.
    ///
    /// Repeated calls are allowed and each produces an independent valid
    /// code; resending never invalidates a code the user may already be
    /// typing.
    ///
    /// # Errors
    ///
    /// Returns [`OtpError::DeliveryFailed`] when the outbound send fails;
    /// the code is persisted first and stays redeemable regardless.
    pub async fn generate(&self, email: &Email) -> Result<OtpCode, OtpError> {
        let code = rand::rng().random_range(100_000..=999_999).to_string();
        let expire_at = Utc::now() + Duration::minutes(OTP_TTL_MINUTES);

        let otp = self.store.insert_otp(email, &code, expire_at).await?;

        if let Err(error) = self
            .notifier
            .notify(email, Notification::OtpIssued { code, expire_at })
            .await
        {
            tracing::warn!(%email, %error, "failed to deliver verification code");
            return Err(OtpError::DeliveryFailed);
        }

        tracing::debug!(%email, otp_id = %otp.id, "verification code issued");
        Ok(otp)
    }

    /// Redeem a code.
    ///
    /// On success the code is marked used and can never be redeemed again.
    /// The caller is responsible for flipping the account's verified flag.
    ///
    /// # Errors
    ///
    /// [`OtpError::NotFound`] when no unused code matches;
    /// [`OtpError::Expired`] when the match is past its window (the row is
    /// left unused, as audit history).
    pub async fn verify(&self, email: &Email, code: &str) -> Result<(), OtpError> {
        let otp = self
            .store
            .find_active_otp(email, code)
            .await?
            .ok_or(OtpError::NotFound)?;

        if otp.is_expired(Utc::now()) {
            return Err(OtpError::Expired);
        }

        if !self.store.mark_otp_used(otp.id).await? {
            // A concurrent redemption of the same code won the race.
            return Err(OtpError::NotFound);
        }

        tracing::debug!(%email, otp_id = %otp.id, "verification code redeemed");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::notify::MemoryNotifier;
    use crate::store::MemoryStore;

    fn email() -> Email {
        Email::parse("a@b.com").unwrap()
    }

    #[tokio::test]
    async fn test_generate_issues_six_digit_code_and_delivers_it() {
        let store = MemoryStore::new();
        let notifier = MemoryNotifier::new();
        let ledger = OtpLedger::new(&store, &notifier);

        let otp = ledger.generate(&email()).await.unwrap();

        assert_eq!(otp.code.len(), 6);
        let numeric: u32 = otp.code.parse().unwrap();
        assert!((100_000..=999_999).contains(&numeric));
        assert!(!otp.used);
        assert_eq!(notifier.sent_count().await, 1);
    }

    #[tokio::test]
    async fn test_verify_succeeds_once_then_not_found() {
        let store = MemoryStore::new();
        let notifier = MemoryNotifier::new();
        let ledger = OtpLedger::new(&store, &notifier);

        let otp = ledger.generate(&email()).await.unwrap();
        ledger.verify(&email(), &otp.code).await.unwrap();

        // The same code is excluded from the lookup once used.
        assert!(matches!(
            ledger.verify(&email(), &otp.code).await,
            Err(OtpError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_verify_unknown_code_is_not_found() {
        let store = MemoryStore::new();
        let notifier = MemoryNotifier::new();
        let ledger = OtpLedger::new(&store, &notifier);

        assert!(matches!(
            ledger.verify(&email(), "123456").await,
            Err(OtpError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_verify_expired_code_is_expired_and_left_unused() {
        let store = MemoryStore::new();
        let notifier = MemoryNotifier::new();
        let ledger = OtpLedger::new(&store, &notifier);

        let past = Utc::now() - Duration::minutes(1);
        store.insert_otp(&email(), "654321", past).await.unwrap();

        assert!(matches!(
            ledger.verify(&email(), "654321").await,
            Err(OtpError::Expired)
        ));
        // Still present, still unused: expiry does not consume the row.
        let row = store.find_active_otp(&email(), "654321").await.unwrap();
        assert!(row.is_some_and(|r| !r.used));
    }

    #[tokio::test]
    async fn test_delivery_failure_still_persists_a_redeemable_code() {
        let store = MemoryStore::new();
        let notifier = MemoryNotifier::new();
        notifier.set_failing(true);
        let ledger = OtpLedger::new(&store, &notifier);

        assert!(matches!(
            ledger.generate(&email()).await,
            Err(OtpError::DeliveryFailed)
        ));
        assert_eq!(store.otp_count().await, 1);
    }

    #[tokio::test]
    async fn test_resend_keeps_prior_codes_redeemable() {
        let store = MemoryStore::new();
        let notifier = MemoryNotifier::new();
        let ledger = OtpLedger::new(&store, &notifier);

        let first = ledger.generate(&email()).await.unwrap();
        let second = ledger.generate(&email()).await.unwrap();

        ledger.verify(&email(), &first.code).await.unwrap();
        if second.code != first.code {
            ledger.verify(&email(), &second.code).await.unwrap();
        }
    }
}
