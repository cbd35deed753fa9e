//! Retry state machine for a single batch.
//!
//! Each attempt ends in one of four ways:
//!
//! - **success**: the client returned a translation or a pass-through
//!   verdict on a malformed answer;
//! - **rate-limit retry**: the key is rotated and the batch re-sent after a
//!   short pause, without touching the retry counter;
//! - **transient retry**: after a longer pause, while the bounded counter
//!   allows it;
//! - **give up**: the batch is passed through untranslated.
//!
//! A batch is therefore never lost; the worst case is that it stays
//! untranslated.

use crate::config::RetryConfig;
use crate::credentials::CredentialRotator;
use crate::entry::Entry;
use crate::service::{CompletionService, ErrorKind};
use crate::translator::{Translation, TranslationClient};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use std::num::NonZeroU32;
use tokio::time::sleep;
use tracing::{debug, error, warn};

/// What happened to one batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Final result for the batch.
    pub translation: Translation,
    /// Completion calls made.
    pub calls: u32,
    /// Generic-failure retries consumed.
    pub retries: u32,
    /// Credential rotations performed.
    pub rotations: u32,
}

/// Drives batches through a [`TranslationClient`] with retries and key rotation.
pub struct BatchProcessor<S> {
    client: TranslationClient<S>,
    rotator: CredentialRotator,
    retry: RetryConfig,
    limiter: Option<DefaultDirectRateLimiter>,
}

impl<S: CompletionService> BatchProcessor<S> {
    /// Create a processor.
    pub fn new(client: TranslationClient<S>, rotator: CredentialRotator, retry: RetryConfig) -> Self {
        Self {
            client,
            rotator,
            retry,
            limiter: None,
        }
    }

    /// Pace completion calls to at most `per_minute` per minute.
    pub fn with_rate_limit(mut self, per_minute: NonZeroU32) -> Self {
        self.limiter = Some(RateLimiter::direct(Quota::per_minute(per_minute)));
        self
    }

    /// The credential rotator.
    pub fn rotator(&self) -> &CredentialRotator {
        &self.rotator
    }

    /// The translation client.
    pub fn client(&self) -> &TranslationClient<S> {
        &self.client
    }

    /// Translate one batch, retrying and rotating keys as needed.
    pub async fn process(&mut self, batch: &[Entry]) -> BatchOutcome {
        let mut calls = 0;
        let mut retries = 0;
        let mut rotations = 0;

        let first_word = batch.first().map(Entry::display_word).unwrap_or_default();

        loop {
            if let Some(limiter) = &self.limiter {
                limiter.until_ready().await;
            }

            calls += 1;
            debug!(
                size = batch.len(),
                first = %first_word,
                attempt = calls,
                key_index = self.rotator.index(),
                "Translating batch"
            );

            let error = match self.client.translate(self.rotator.current(), batch).await {
                Ok(translation) => {
                    return BatchOutcome {
                        translation,
                        calls,
                        retries,
                        rotations,
                    };
                }
                Err(error) => error,
            };

            match error.kind {
                ErrorKind::RateLimited => {
                    let index = self.rotator.rotate();
                    rotations += 1;
                    warn!(
                        size = batch.len(),
                        key_index = index,
                        error = %error.message,
                        "Quota exhausted, switched API key"
                    );
                    sleep(self.retry.rate_limit_delay).await;
                }
                ErrorKind::MalformedResponse => {
                    warn!(
                        size = batch.len(),
                        error = %error.message,
                        "Unreadable response, keeping batch untranslated"
                    );
                    return BatchOutcome {
                        translation: Translation::Passthrough(error.message),
                        calls,
                        retries,
                        rotations,
                    };
                }
                ErrorKind::Rejected | ErrorKind::Timeout | ErrorKind::Other => {
                    if retries >= self.retry.max_retries {
                        error!(
                            size = batch.len(),
                            first = %first_word,
                            attempts = calls,
                            error = %error,
                            "Batch failed, keeping it untranslated"
                        );
                        return BatchOutcome {
                            translation: Translation::Passthrough(error.to_string()),
                            calls,
                            retries,
                            rotations,
                        };
                    }

                    retries += 1;
                    warn!(
                        size = batch.len(),
                        retry = retries,
                        max_retries = self.retry.max_retries,
                        error = %error,
                        "Batch failed, retrying"
                    );

                    if error.kind == ErrorKind::Rejected {
                        self.rotator.rotate();
                        rotations += 1;
                    }
                    sleep(self.retry.retry_delay).await;
                }
            }
        }
    }
}

/// Copy translated fields into the matching entries, by position.
///
/// A pass-through leaves the Turkish fields as they were.
pub fn merge(batch: &mut [Entry], translation: &Translation) {
    if let Translation::Translated(fields) = translation {
        for (entry, fields) in batch.iter_mut().zip(fields) {
            entry.set_translation(fields);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::TranslatedFields;
    use crate::service::ServiceError;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Replays scripted answers, then repeats `fallback`.
    struct Scripted {
        script: Mutex<VecDeque<Result<String, ServiceError>>>,
        fallback: Result<String, ServiceError>,
        credentials: Mutex<Vec<String>>,
    }

    impl Scripted {
        fn new(
            script: Vec<Result<String, ServiceError>>,
            fallback: Result<String, ServiceError>,
        ) -> Self {
            Self {
                script: Mutex::new(script.into()),
                fallback,
                credentials: Mutex::new(Vec::new()),
            }
        }

        fn calls(&self) -> Vec<String> {
            self.credentials.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl CompletionService for Scripted {
        async fn complete(
            &self,
            credential: &str,
            _instructions: &str,
            _payload: &str,
        ) -> Result<String, ServiceError> {
            self.credentials.lock().unwrap().push(credential.to_string());
            self.script
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| self.fallback.clone())
        }
    }

    fn fail(kind: ErrorKind) -> Result<String, ServiceError> {
        Err(ServiceError::new(kind, format!("{kind:?}")))
    }

    fn valid(n: usize) -> Result<String, ServiceError> {
        let fields: Vec<TranslatedFields> = (0..n)
            .map(|i| TranslatedFields {
                meaning: format!("anlam{i}"),
                full_entry_text: format!("metin{i}"),
            })
            .collect();
        Ok(serde_json::to_string(&fields).unwrap())
    }

    fn batch(n: usize) -> Vec<Entry> {
        (0..n)
            .map(|i| Entry::new(format!("w{i}"), format!("m{i}"), format!("t{i}")))
            .collect()
    }

    fn processor(service: Scripted) -> BatchProcessor<Scripted> {
        let rotator =
            CredentialRotator::new(vec!["k0".into(), "k1".into(), "k2".into()], 0).unwrap();
        let retry = RetryConfig {
            max_retries: 3,
            rate_limit_delay: Duration::ZERO,
            retry_delay: Duration::ZERO,
        };
        BatchProcessor::new(TranslationClient::new(service), rotator, retry)
    }

    #[tokio::test]
    async fn test_success_first_try() {
        let mut p = processor(Scripted::new(vec![], valid(2)));
        let outcome = p.process(&batch(2)).await;

        assert!(outcome.translation.is_translated());
        assert_eq!(outcome.calls, 1);
        assert_eq!(outcome.retries, 0);
    }

    #[tokio::test]
    async fn test_generic_failure_gives_up_after_three_retries() {
        let mut p = processor(Scripted::new(vec![], fail(ErrorKind::Other)));
        let outcome = p.process(&batch(2)).await;

        assert_eq!(outcome.calls, 4);
        assert_eq!(outcome.retries, 3);
        assert_eq!(outcome.rotations, 0);
        assert!(matches!(outcome.translation, Translation::Passthrough(_)));
        assert_eq!(p.client().service().calls(), vec!["k0"; 4]);
    }

    #[tokio::test]
    async fn test_timeout_then_success() {
        let mut p = processor(Scripted::new(vec![fail(ErrorKind::Timeout)], valid(1)));
        let outcome = p.process(&batch(1)).await;

        assert!(outcome.translation.is_translated());
        assert_eq!(outcome.calls, 2);
        assert_eq!(outcome.retries, 1);
    }

    #[tokio::test]
    async fn test_rate_limit_rotates_without_consuming_retries() {
        let script = vec![
            fail(ErrorKind::RateLimited),
            fail(ErrorKind::RateLimited),
            fail(ErrorKind::RateLimited),
            fail(ErrorKind::RateLimited),
            fail(ErrorKind::RateLimited),
        ];
        let mut p = processor(Scripted::new(script, valid(1)));
        let outcome = p.process(&batch(1)).await;

        assert!(outcome.translation.is_translated());
        assert_eq!(outcome.calls, 6);
        assert_eq!(outcome.retries, 0);
        assert_eq!(outcome.rotations, 5);
        assert_eq!(
            p.client().service().calls(),
            vec!["k0", "k1", "k2", "k0", "k1", "k2"]
        );
        assert_eq!(p.rotator().index(), 2);
    }

    #[tokio::test]
    async fn test_rate_limits_interleaved_with_failures_keep_budget() {
        let script = vec![
            fail(ErrorKind::Other),
            fail(ErrorKind::RateLimited),
            fail(ErrorKind::Other),
            fail(ErrorKind::RateLimited),
            fail(ErrorKind::Other),
        ];
        let mut p = processor(Scripted::new(script, fail(ErrorKind::Other)));
        let outcome = p.process(&batch(1)).await;

        // 3 retries after the first generic failure, plus 2 rate-limit re-sends.
        assert_eq!(outcome.calls, 6);
        assert_eq!(outcome.retries, 3);
        assert_eq!(outcome.rotations, 2);
        assert!(!outcome.translation.is_translated());
    }

    #[tokio::test]
    async fn test_rejected_key_rotates_and_counts() {
        let mut p = processor(Scripted::new(vec![fail(ErrorKind::Rejected)], valid(1)));
        let outcome = p.process(&batch(1)).await;

        assert!(outcome.translation.is_translated());
        assert_eq!(outcome.retries, 1);
        assert_eq!(outcome.rotations, 1);
        assert_eq!(p.client().service().calls(), vec!["k0", "k1"]);
    }

    #[tokio::test]
    async fn test_wrong_length_is_passthrough_without_retry() {
        let mut p = processor(Scripted::new(vec![valid(1)], valid(3)));
        let outcome = p.process(&batch(3)).await;

        assert!(matches!(outcome.translation, Translation::Passthrough(_)));
        assert_eq!(outcome.calls, 1);
        assert_eq!(outcome.retries, 0);
    }

    #[tokio::test]
    async fn test_malformed_envelope_is_passthrough_without_retry() {
        let mut p = processor(Scripted::new(vec![fail(ErrorKind::MalformedResponse)], valid(1)));
        let outcome = p.process(&batch(1)).await;

        assert!(!outcome.translation.is_translated());
        assert_eq!(outcome.calls, 1);
    }

    #[tokio::test]
    async fn test_rate_limiter_allows_burst_under_quota() {
        let mut p = processor(Scripted::new(vec![], valid(1)))
            .with_rate_limit(NonZeroU32::new(600).unwrap());
        for _ in 0..3 {
            assert!(p.process(&batch(1)).await.translation.is_translated());
        }
        assert_eq!(p.client().service().calls().len(), 3);
    }

    #[test]
    fn test_merge_translated() {
        let mut entries = batch(2);
        let translation = Translation::Translated(vec![
            TranslatedFields {
                meaning: "a".into(),
                full_entry_text: "b".into(),
            },
            TranslatedFields {
                meaning: String::new(),
                full_entry_text: "d".into(),
            },
        ]);
        merge(&mut entries, &translation);

        assert_eq!(entries[0].meaning_tr(), Some("a"));
        assert_eq!(entries[0].full_entry_text_tr(), Some("b"));
        assert_eq!(entries[1].meaning_tr(), Some(""));
        assert_eq!(entries[1].meaning(), "m1");
    }

    #[test]
    fn test_merge_passthrough_leaves_entries() {
        let mut entries = batch(2);
        let before = entries.clone();
        merge(&mut entries, &Translation::Passthrough("gave up".into()));
        assert_eq!(entries, before);
    }
}
