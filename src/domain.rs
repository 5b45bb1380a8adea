//! Per-domain registration state and notification decisions.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeDelta, Utc};
use log::{debug, info};
use tokio_util::sync::CancellationToken;

use crate::diff;
use crate::error::Error;
use crate::integration::Integrations;
use crate::message;
use crate::whois::{RegistrationRecord, RegistryClient};

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// One watched domain and what was last observed about it.
#[derive(Debug, Clone)]
pub struct Domain {
    pub name: String,
    thresholds: Arc<[i64]>,
    pub curr_whois: Option<RegistrationRecord>,
    pub prev_whois: Option<RegistrationRecord>,
    pub expires_at: Option<DateTime<Local>>,
    /// Time until `expires_at`, floored to whole days. May be negative.
    pub time_left: TimeDelta,
    /// Last threshold a notification fired for. Never reset.
    pub triggered_threshold: Option<i64>,
}

impl Domain {
    /// Creates a domain with nothing fetched yet. `thresholds` are day
    /// counts, checked in the given order.
    #[must_use]
    pub fn new(name: impl Into<String>, thresholds: Arc<[i64]>) -> Self {
        Self {
            name: name.into(),
            thresholds,
            curr_whois: None,
            prev_whois: None,
            expires_at: None,
            time_left: TimeDelta::zero(),
            triggered_threshold: None,
        }
    }

    /// Whole days left until expiration, rounded down.
    #[must_use]
    pub fn days_left(&self) -> i64 {
        self.time_left.num_days()
    }

    /// Fetches the current registration record and sends any notification
    /// it calls for.
    ///
    /// Whatever the outcome, the previous record becomes the current one once
    /// the attempt is over.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fetch`] or [`Error::Cancelled`] if the record could not
    /// be fetched, [`Error::NoExpiration`] if it has no expiration date, and
    /// [`Error::Diff`] if the status lists could not be compared.
    pub async fn run(
        &mut self,
        registry: &dyn RegistryClient,
        integrations: &Integrations,
        token: &CancellationToken,
    ) -> Result<(), Error> {
        let result = self.update(registry, integrations, token).await;
        self.prev_whois.clone_from(&self.curr_whois);
        result
    }

    async fn update(
        &mut self,
        registry: &dyn RegistryClient,
        integrations: &Integrations,
        token: &CancellationToken,
    ) -> Result<(), Error> {
        let record = tokio::select! {
            biased;
            () = token.cancelled() => return Err(Error::Cancelled),
            result = registry.fetch(&self.name) => {
                result.map_err(|e| Error::Fetch(Box::new(e)))?
            }
        };

        let expiration = record.expiration_date;
        self.curr_whois = Some(record);
        let Some(expiration) = expiration else {
            self.expires_at = None;
            self.time_left = TimeDelta::zero();
            return Err(Error::NoExpiration);
        };

        self.set_expiration(expiration, Utc::now());
        info!(
            "domain={} Fetched whois: expires {}, {} days left",
            self.name,
            self.expires_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            self.days_left()
        );

        self.check_notifications(integrations, token).await
    }

    fn set_expiration(&mut self, expiration: DateTime<Utc>, now: DateTime<Utc>) {
        self.expires_at = Some(expiration.with_timezone(&Local));
        let secs = (expiration - now).num_seconds();
        self.time_left = TimeDelta::days(secs.div_euclid(SECONDS_PER_DAY));
    }

    /// Runs the threshold check, then the status change check.
    async fn check_notifications(
        &mut self,
        integrations: &Integrations,
        token: &CancellationToken,
    ) -> Result<(), Error> {
        if let Some(msg) = self.threshold_message() {
            integrations.send(token, &msg).await;
        }
        if let Some(msg) = self.status_change_message()? {
            integrations.send(token, &msg).await;
        }
        Ok(())
    }

    /// Picks the first configured threshold that has been reached and is
    /// more urgent than the one already notified, and marks it as triggered.
    fn threshold_message(&mut self) -> Option<String> {
        if self.time_left.is_zero() {
            return None;
        }

        let days_left = self.days_left();
        let threshold = self.thresholds.iter().copied().find(|&threshold| {
            days_left <= threshold
                && self
                    .triggered_threshold
                    .is_none_or(|triggered| threshold < triggered)
        })?;

        debug!("domain={} Reached {threshold} day threshold", self.name);
        self.triggered_threshold = Some(threshold);
        Some(message::threshold(&self.name, days_left))
    }

    fn status_change_message(&self) -> Result<Option<String>, Error> {
        let (Some(prev), Some(curr)) = (&self.prev_whois, &self.curr_whois) else {
            return Ok(None);
        };

        let changes = diff::diff(&prev.status, &curr.status)?;
        if changes.is_empty() {
            return Ok(None);
        }

        debug!("domain={} Status changed: {changes:?}", self.name);
        Ok(Some(message::status_changed(&self.name, &changes)))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::integration::tests::Recorder;
    use async_trait::async_trait;
    use std::{collections::VecDeque, sync::Mutex};

    /// Hands out scripted results, one per fetch.
    #[derive(Default)]
    pub(crate) struct Scripted {
        results: Mutex<VecDeque<Result<RegistrationRecord, Error>>>,
        pub(crate) fetched: Mutex<Vec<String>>,
    }

    impl Scripted {
        pub(crate) fn push(&self, result: Result<RegistrationRecord, Error>) {
            self.results.lock().unwrap().push_back(result);
        }
    }

    #[async_trait]
    impl RegistryClient for Scripted {
        async fn fetch(&self, domain: &str) -> Result<RegistrationRecord, Error> {
            self.fetched.lock().unwrap().push(domain.to_string());
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(Error::Whois("no scripted response".into())))
        }
    }

    /// Record expiring `days` whole days (plus an hour of slack) from now.
    pub(crate) fn record(days: i64, status: &[&str]) -> RegistrationRecord {
        RegistrationRecord {
            domain: "example.com".into(),
            expiration_date: Some(Utc::now() + TimeDelta::days(days) + TimeDelta::hours(1)),
            status: status.iter().map(ToString::to_string).collect(),
            ..Default::default()
        }
    }

    fn setup(thresholds: &[i64]) -> (Domain, Scripted, Recorder, Integrations) {
        let recorder = Recorder::default();
        let integrations = Integrations::new(vec![Box::new(recorder.clone())]);
        let domain = Domain::new("example.com", thresholds.into());
        (domain, Scripted::default(), recorder, integrations)
    }

    #[test]
    fn test_time_left_is_floored_to_days() {
        let now = Utc::now();
        let mut domain = Domain::new("example.com", Arc::from([]));

        domain.set_expiration(now + TimeDelta::days(10) + TimeDelta::hours(23), now);
        assert_eq!(domain.time_left, TimeDelta::days(10));

        domain.set_expiration(now + TimeDelta::hours(23), now);
        assert_eq!(domain.time_left, TimeDelta::zero());
    }

    #[test]
    fn test_time_left_may_be_negative() {
        let now = Utc::now();
        let mut domain = Domain::new("example.com", Arc::from([]));

        domain.set_expiration(now - TimeDelta::hours(36), now);
        assert_eq!(domain.time_left, TimeDelta::days(-2));
        assert_eq!(domain.days_left(), -2);
        assert_eq!(
            domain.expires_at.map(|t| t.with_timezone(&Utc)),
            Some(now - TimeDelta::hours(36))
        );
    }

    #[tokio::test]
    async fn test_threshold_fires_once() {
        let (mut domain, registry, recorder, integrations) = setup(&[7]);
        let token = CancellationToken::new();

        for days in [10, 5, 3] {
            registry.push(Ok(record(days, &["active"])));
            domain.run(&registry, &integrations, &token).await.unwrap();
        }

        assert_eq!(recorder.messages(), vec!["`example.com` expires in 5 days."]);
        assert_eq!(domain.triggered_threshold, Some(7));
        assert_eq!(domain.days_left(), 3);
    }

    #[tokio::test]
    async fn test_threshold_follows_configured_order() {
        let (mut domain, registry, recorder, integrations) = setup(&[30, 14]);
        let token = CancellationToken::new();

        registry.push(Ok(record(10, &[])));
        domain.run(&registry, &integrations, &token).await.unwrap();
        assert_eq!(domain.triggered_threshold, Some(30));

        registry.push(Ok(record(10, &[])));
        domain.run(&registry, &integrations, &token).await.unwrap();
        assert_eq!(domain.triggered_threshold, Some(14));

        registry.push(Ok(record(9, &[])));
        domain.run(&registry, &integrations, &token).await.unwrap();
        assert_eq!(domain.triggered_threshold, Some(14));

        assert_eq!(recorder.messages().len(), 2);
    }

    #[tokio::test]
    async fn test_threshold_is_not_reset_by_renewal() {
        let (mut domain, registry, recorder, integrations) = setup(&[7]);
        let token = CancellationToken::new();

        for days in [5, 365, 6] {
            registry.push(Ok(record(days, &[])));
            domain.run(&registry, &integrations, &token).await.unwrap();
        }

        assert_eq!(recorder.messages().len(), 1);
    }

    #[tokio::test]
    async fn test_expired_domain_notifies() {
        let (mut domain, registry, recorder, integrations) = setup(&[1]);
        registry.push(Ok(record(-3, &[])));

        domain
            .run(&registry, &integrations, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(recorder.messages(), vec!["`example.com` expired 3 days ago."]);
    }

    #[tokio::test]
    async fn test_no_status_check_on_first_fetch() {
        let (mut domain, registry, recorder, integrations) = setup(&[]);
        registry.push(Ok(record(100, &["active"])));

        domain
            .run(&registry, &integrations, &CancellationToken::new())
            .await
            .unwrap();

        assert!(recorder.messages().is_empty());
        assert_eq!(domain.prev_whois, domain.curr_whois);
    }

    #[tokio::test]
    async fn test_status_change_notifies_once() {
        let (mut domain, registry, recorder, integrations) = setup(&[]);
        let token = CancellationToken::new();

        registry.push(Ok(record(100, &["active"])));
        registry.push(Ok(record(100, &["active", "clientHold"])));
        registry.push(Ok(record(100, &["active", "clientHold"])));
        for _ in 0..3 {
            domain.run(&registry, &integrations, &token).await.unwrap();
        }

        assert_eq!(
            recorder.messages(),
            vec!["`example.com` status changed:\n+ `clientHold`"]
        );
    }

    #[tokio::test]
    async fn test_fetch_error_keeps_previous_record() {
        let (mut domain, registry, recorder, integrations) = setup(&[]);
        let token = CancellationToken::new();

        registry.push(Ok(record(100, &["active"])));
        registry.push(Err(Error::Timeout("Read timed out".into())));
        registry.push(Ok(record(100, &["inactive"])));

        domain.run(&registry, &integrations, &token).await.unwrap();
        let err = domain
            .run(&registry, &integrations, &token)
            .await
            .unwrap_err();
        assert!(err.is_fetch());
        assert_eq!(domain.prev_whois, domain.curr_whois);
        assert!(domain.prev_whois.is_some());

        domain.run(&registry, &integrations, &token).await.unwrap();
        assert_eq!(
            recorder.messages(),
            vec!["`example.com` status changed:\n- `active`\n+ `inactive`"]
        );
    }

    #[tokio::test]
    async fn test_missing_expiration_still_advances_previous() {
        let (mut domain, registry, recorder, integrations) = setup(&[7]);
        let token = CancellationToken::new();

        registry.push(Ok(record(100, &["active"])));
        registry.push(Ok(RegistrationRecord {
            status: vec!["clientHold".into()],
            ..Default::default()
        }));
        registry.push(Ok(record(100, &["clientHold"])));

        domain.run(&registry, &integrations, &token).await.unwrap();
        let err = domain
            .run(&registry, &integrations, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoExpiration));
        assert!(!err.is_fetch());
        assert!(domain.expires_at.is_none());
        assert!(domain.time_left.is_zero());
        assert_eq!(
            domain.prev_whois.as_ref().map(|r| r.status.clone()),
            Some(vec!["clientHold".to_string()])
        );

        // The status change was absorbed by the incomplete record
        domain.run(&registry, &integrations, &token).await.unwrap();
        assert!(recorder.messages().is_empty());
    }

    #[tokio::test]
    async fn test_diff_failure_keeps_threshold_notification() {
        let (mut domain, registry, recorder, integrations) = setup(&[7]);
        let token = CancellationToken::new();
        let status: Vec<String> = (0..1100).map(|i| format!("status{i}")).collect();

        registry.push(Ok(RegistrationRecord {
            status: status.clone(),
            ..record(100, &[])
        }));
        registry.push(Ok(RegistrationRecord {
            status,
            ..record(5, &[])
        }));

        domain.run(&registry, &integrations, &token).await.unwrap();
        let err = domain
            .run(&registry, &integrations, &token)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Diff(_)));
        assert!(!err.is_fetch());
        assert_eq!(recorder.messages(), vec!["`example.com` expires in 5 days."]);
        assert_eq!(domain.triggered_threshold, Some(7));
        assert_eq!(domain.prev_whois, domain.curr_whois);
    }

    #[tokio::test]
    async fn test_cancelled_fetch() {
        let (mut domain, registry, recorder, integrations) = setup(&[7]);
        let token = CancellationToken::new();
        token.cancel();
        registry.push(Ok(record(1, &[])));

        let err = domain
            .run(&registry, &integrations, &token)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Cancelled));
        assert!(err.is_fetch());
        assert!(domain.curr_whois.is_none());
        assert!(recorder.messages().is_empty());
    }
}
