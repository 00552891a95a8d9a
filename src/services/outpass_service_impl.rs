//! `SeaORM` implementation of the [`OutPassService`] trait.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::config::Config;
use crate::db::Store;
use crate::domain::{
    self, GateEvent, OutPassId, OutPassReason, OutPassStatus, PassDecision, UNKNOWN_ROOM,
};
use crate::models::{HostelPageFilter, NewOutPass, OutPass, OutPassWithRefs};
use crate::services::outpass_service::{
    ActingIdentity, CreateOutPassRequest, OutPassError, OutPassService,
};

/// SeaORM-backed implementation of [`OutPassService`].
///
/// Transitions rely on the repository's conditional updates; this layer
/// turns a missed update into the precise error the caller should see.
pub struct SeaOrmOutPassService {
    store: Store,
    config: Arc<RwLock<Config>>,
}

impl SeaOrmOutPassService {
    #[must_use]
    pub const fn new(store: Store, config: Arc<RwLock<Config>>) -> Self {
        Self { store, config }
    }

    fn parse_timestamp(field: &str, value: &str) -> Result<DateTime<FixedOffset>, Vec<String>> {
        DateTime::parse_from_rfc3339(value)
            .map_err(|e| vec![format!("{field}: not a valid RFC 3339 timestamp ({e})")])
    }

    /// Validates the raw payload, reporting all field problems at once.
    fn validate(
        payload: &CreateOutPassRequest,
    ) -> Result<(OutPassReason, DateTime<FixedOffset>, DateTime<FixedOffset>), OutPassError> {
        let mut problems: Vec<String> = Vec::new();

        if payload.room_number.trim().is_empty() {
            problems.push("room_number: must not be empty".to_string());
        }
        if payload.address.trim().is_empty() {
            problems.push("address: must not be empty".to_string());
        }

        let reason: Option<OutPassReason> = match payload.reason.parse() {
            Ok(r) => Some(r),
            Err(e) => {
                problems.push(format!("reason: {e}"));
                None
            }
        };

        let out_time = Self::parse_timestamp("expected_out_time", &payload.expected_out_time)
            .map_err(|mut e| problems.append(&mut e))
            .ok();
        let in_time = Self::parse_timestamp("expected_in_time", &payload.expected_in_time)
            .map_err(|mut e| problems.append(&mut e))
            .ok();

        if let (Some(out), Some(inn)) = (out_time, in_time)
            && inn < out
        {
            problems.push("expected_in_time: must not precede expected_out_time".to_string());
        }

        if problems.is_empty() {
            // problems is empty only when all three parsed
            if let (Some(reason), Some(out), Some(inn)) = (reason, out_time, in_time) {
                return Ok((reason, out, inn));
            }
        }

        Err(OutPassError::InvalidArgument(problems.join("; ")))
    }

    /// Reconstructs the right error after a conditional update matched no row.
    async fn explain_missed_transition(
        &self,
        id: OutPassId,
        expected: OutPassStatus,
        already_message: &str,
        duplicate: impl Fn(&OutPass) -> bool,
    ) -> OutPassError {
        match self.store.get_outpass(id.value()).await {
            Ok(Some(pass)) => {
                if duplicate(&pass) {
                    OutPassError::FailedPrecondition(already_message.to_string())
                } else {
                    OutPassError::FailedPrecondition(format!(
                        "Outpass is not {} (status: {})",
                        expected, pass.status
                    ))
                }
            }
            Ok(None) => OutPassError::NotFound(format!("Outpass {id} not found")),
            Err(e) => OutPassError::Internal(e.to_string()),
        }
    }

    async fn fetch_after_transition(&self, id: OutPassId) -> Result<OutPass, OutPassError> {
        self.store
            .get_outpass(id.value())
            .await?
            .ok_or_else(|| OutPassError::Internal(format!("Outpass {id} vanished after update")))
    }
}

#[async_trait]
impl OutPassService for SeaOrmOutPassService {
    async fn create_request(
        &self,
        identity: &ActingIdentity,
        payload: CreateOutPassRequest,
    ) -> Result<OutPass, OutPassError> {
        let (reason, out_time, in_time) = Self::validate(&payload)?;

        let hosteler = self
            .store
            .get_hosteler_by_email(&identity.email)
            .await?
            .ok_or_else(|| {
                OutPassError::NotFound("No hosteler record for this account".to_string())
            })?;

        let hostel = self
            .store
            .get_hostel(hosteler.hostel_id)
            .await?
            .ok_or_else(|| OutPassError::NotFound("Hostel not found".to_string()))?;

        if hosteler.banned {
            let till = hosteler.banned_till.as_deref().unwrap_or("unknown");
            return Err(OutPassError::Forbidden(format!(
                "You are banned from creating out-passes till {till}"
            )));
        }

        let room = payload.room_number.trim();
        if room != hosteler.room_number && room != UNKNOWN_ROOM {
            self.store.update_hosteler_room(hosteler.id, room).await?;
        }

        let extended_days = self.config.read().await.policy.extended_stay_days;
        let valid_till = domain::compute_valid_till(reason, in_time, extended_days)
            .ok_or_else(|| {
                OutPassError::InvalidArgument(
                    "expected_in_time: date out of representable range".to_string(),
                )
            })?;

        let new = NewOutPass {
            hosteler_id: hosteler.id,
            hostel_id: hostel.id,
            room_number: room.to_string(),
            address: payload.address.trim().to_string(),
            reason,
            expected_out_time: domain::to_storage_timestamp(out_time),
            expected_in_time: domain::to_storage_timestamp(in_time),
            valid_till: domain::to_storage_timestamp(valid_till),
        };

        Ok(self.store.insert_outpass(&new).await?)
    }

    async fn decide(&self, id: OutPassId, decision: PassDecision) -> Result<OutPass, OutPassError> {
        let applied = self
            .store
            .transition_outpass_status(
                id.value(),
                OutPassStatus::Pending,
                decision.resulting_status(),
            )
            .await?;

        if applied {
            return self.fetch_after_transition(id).await;
        }

        // Either the row is gone or someone else moved it first.
        match self.store.get_outpass(id.value()).await? {
            None => Err(OutPassError::NotFound(format!("Outpass {id} not found"))),
            Some(pass) => {
                warn!(
                    "Decision on out-pass {} rejected: status is {}",
                    id, pass.status
                );
                Err(OutPassError::FailedPrecondition(
                    "Outpass is not pending".to_string(),
                ))
            }
        }
    }

    async fn record_gate_event(
        &self,
        id: OutPassId,
        event: GateEvent,
    ) -> Result<OutPass, OutPassError> {
        let stamp = domain::to_storage_timestamp(Utc::now().fixed_offset());

        let applied = self
            .store
            .record_outpass_gate_event(id.value(), event, &stamp)
            .await?;

        if applied {
            return self.fetch_after_transition(id).await;
        }

        let err = match event {
            GateEvent::Exit => {
                self.explain_missed_transition(
                    id,
                    OutPassStatus::Approved,
                    "Already allowed exit",
                    |pass| pass.actual_out_time.is_some(),
                )
                .await
            }
            GateEvent::Entry => {
                self.explain_missed_transition(
                    id,
                    OutPassStatus::InUse,
                    "Already allowed entry",
                    |pass| pass.actual_in_time.is_some(),
                )
                .await
            }
        };

        Err(err)
    }

    async fn list_for_hostel(
        &self,
        hostel_id: i32,
        mut filter: HostelPageFilter,
    ) -> Result<Vec<OutPassWithRefs>, OutPassError> {
        if self.store.get_hostel(hostel_id).await?.is_none() {
            return Err(OutPassError::NotFound(format!(
                "Hostel {hostel_id} not found"
            )));
        }

        let policy = self.config.read().await.policy.clone();
        if filter.limit == 0 {
            filter.limit = policy.hostel_page_limit;
        }
        filter.limit = filter.limit.min(policy.hostel_page_max_limit);

        Ok(self
            .store
            .list_outpasses_for_hostel(hostel_id, &filter)
            .await?)
    }

    async fn list_for_student(&self, hosteler_id: i32) -> Result<Vec<OutPass>, OutPassError> {
        let limit = self.config.read().await.policy.student_history_limit;
        Ok(self
            .store
            .list_outpasses_for_hosteler(hosteler_id, limit)
            .await?)
    }

    async fn get_by_id(&self, id: OutPassId) -> Result<OutPassWithRefs, OutPassError> {
        self.store
            .get_outpass_with_refs(id.value())
            .await?
            .ok_or_else(|| OutPassError::NotFound(format!("Outpass {id} not found")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::NewHosteler;
    use crate::models::SortDirection;

    async fn service_with_store() -> (SeaOrmOutPassService, Store) {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let config = Arc::new(RwLock::new(Config::default()));
        (
            SeaOrmOutPassService::new(store.clone(), config),
            store,
        )
    }

    async fn seed_hosteler(store: &Store, email: &str, roll: &str, room: &str) -> i32 {
        let hostel = match store.get_hostel_by_slug("aravali").await.unwrap() {
            Some(h) => h,
            None => store.add_hostel("Aravali", "aravali", "male").await.unwrap(),
        };
        store
            .add_hosteler(&NewHosteler {
                name: format!("Student {roll}"),
                email: email.to_string(),
                roll_number: roll.to_string(),
                hostel_id: hostel.id,
                room_number: room.to_string(),
            })
            .await
            .unwrap()
            .id
    }

    fn identity(email: &str) -> ActingIdentity {
        ActingIdentity {
            user_id: 1,
            username: "student".to_string(),
            email: email.to_string(),
        }
    }

    fn payload(reason: &str, room: &str) -> CreateOutPassRequest {
        CreateOutPassRequest {
            room_number: room.to_string(),
            address: "14 MG Road".to_string(),
            reason: reason.to_string(),
            expected_out_time: "2024-03-01T08:00:00Z".to_string(),
            expected_in_time: "2024-03-01T18:00:00Z".to_string(),
        }
    }

    #[tokio::test]
    async fn create_sets_pending_and_computed_validity() {
        let (service, store) = service_with_store().await;
        seed_hosteler(&store, "a@college.edu", "21B001", "101").await;

        let pass = service
            .create_request(&identity("a@college.edu"), payload("outing", "101"))
            .await
            .unwrap();

        assert_eq!(pass.status, OutPassStatus::Pending);
        assert_eq!(pass.reason, OutPassReason::Outing);
        assert_eq!(pass.valid_till, "2024-03-01T23:59:59.999Z");
        assert!(pass.actual_out_time.is_none());
        assert!(pass.actual_in_time.is_none());
    }

    #[tokio::test]
    async fn create_extends_validity_for_home() {
        let (service, store) = service_with_store().await;
        seed_hosteler(&store, "b@college.edu", "21B002", "102").await;

        let mut p = payload("home", "102");
        p.expected_in_time = "2024-03-01T10:00:00Z".to_string();
        let pass = service
            .create_request(&identity("b@college.edu"), p)
            .await
            .unwrap();

        assert_eq!(pass.valid_till, "2024-03-05T23:59:59.999Z");
    }

    #[tokio::test]
    async fn create_rejects_unknown_reason_with_field_error() {
        let (service, store) = service_with_store().await;
        seed_hosteler(&store, "c@college.edu", "21B003", "103").await;

        let err = service
            .create_request(&identity("c@college.edu"), payload("vacation", "103"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "invalid_argument");
        assert!(err.to_string().contains("reason"));
    }

    #[tokio::test]
    async fn create_fails_for_unknown_identity() {
        let (service, _store) = service_with_store().await;

        let err = service
            .create_request(&identity("ghost@college.edu"), payload("outing", "101"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn banned_hosteler_cannot_create_and_nothing_is_written() {
        let (service, store) = service_with_store().await;
        let hosteler_id = seed_hosteler(&store, "d@college.edu", "21B004", "104").await;
        store
            .set_hosteler_ban(hosteler_id, true, Some("2024-06-01T00:00:00Z"))
            .await
            .unwrap();

        let err = service
            .create_request(&identity("d@college.edu"), payload("outing", "104"))
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "forbidden");
        assert!(err.to_string().contains("2024-06-01T00:00:00Z"));
        assert!(service
            .list_for_student(hosteler_id)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn ban_message_without_expiry_says_unknown() {
        let (service, store) = service_with_store().await;
        let hosteler_id = seed_hosteler(&store, "e@college.edu", "21B005", "105").await;
        store.set_hosteler_ban(hosteler_id, true, None).await.unwrap();

        let err = service
            .create_request(&identity("e@college.edu"), payload("outing", "105"))
            .await
            .unwrap_err();

        assert!(err.to_string().contains("unknown"));
    }

    #[tokio::test]
    async fn differing_room_updates_room_of_record_once() {
        let (service, store) = service_with_store().await;
        let hosteler_id = seed_hosteler(&store, "f@college.edu", "21B006", "UNKNOWN").await;

        service
            .create_request(&identity("f@college.edu"), payload("outing", "205"))
            .await
            .unwrap();
        let hosteler = store.get_hosteler(hosteler_id).await.unwrap().unwrap();
        assert_eq!(hosteler.room_number, "205");
        let first_update = hosteler.updated_at;

        // Matching room: no further write to the hosteler row
        service
            .create_request(&identity("f@college.edu"), payload("outing", "205"))
            .await
            .unwrap();
        let hosteler = store.get_hosteler(hosteler_id).await.unwrap().unwrap();
        assert_eq!(hosteler.room_number, "205");
        assert_eq!(hosteler.updated_at, first_update);
    }

    #[tokio::test]
    async fn unknown_room_sentinel_never_updates() {
        let (service, store) = service_with_store().await;
        let hosteler_id = seed_hosteler(&store, "g@college.edu", "21B007", "301").await;

        service
            .create_request(&identity("g@college.edu"), payload("outing", "UNKNOWN"))
            .await
            .unwrap();

        let hosteler = store.get_hosteler(hosteler_id).await.unwrap().unwrap();
        assert_eq!(hosteler.room_number, "301");
    }

    #[tokio::test]
    async fn full_lifecycle_walk() {
        let (service, store) = service_with_store().await;
        seed_hosteler(&store, "h@college.edu", "21B008", "106").await;

        let pass = service
            .create_request(&identity("h@college.edu"), payload("home", "106"))
            .await
            .unwrap();
        let id = OutPassId::new(pass.id);

        let pass = service.decide(id, PassDecision::Approve).await.unwrap();
        assert_eq!(pass.status, OutPassStatus::Approved);

        let pass = service.record_gate_event(id, GateEvent::Exit).await.unwrap();
        assert_eq!(pass.status, OutPassStatus::InUse);
        assert!(pass.actual_out_time.is_some());

        let pass = service.record_gate_event(id, GateEvent::Entry).await.unwrap();
        assert_eq!(pass.status, OutPassStatus::Processed);
        assert!(pass.actual_in_time.is_some());
    }

    #[tokio::test]
    async fn decide_on_non_pending_fails_and_preserves_status() {
        let (service, store) = service_with_store().await;
        seed_hosteler(&store, "i@college.edu", "21B009", "107").await;

        let pass = service
            .create_request(&identity("i@college.edu"), payload("outing", "107"))
            .await
            .unwrap();
        let id = OutPassId::new(pass.id);

        service.decide(id, PassDecision::Reject).await.unwrap();

        let err = service.decide(id, PassDecision::Approve).await.unwrap_err();
        assert_eq!(err.kind(), "failed_precondition");
        assert!(err.to_string().contains("not pending"));

        let pass = store.get_outpass(id.value()).await.unwrap().unwrap();
        assert_eq!(pass.status, OutPassStatus::Rejected);
    }

    #[tokio::test]
    async fn duplicate_exit_keeps_first_timestamp() {
        let (service, store) = service_with_store().await;
        seed_hosteler(&store, "j@college.edu", "21B010", "108").await;

        let pass = service
            .create_request(&identity("j@college.edu"), payload("outing", "108"))
            .await
            .unwrap();
        let id = OutPassId::new(pass.id);
        service.decide(id, PassDecision::Approve).await.unwrap();

        let first = service.record_gate_event(id, GateEvent::Exit).await.unwrap();
        let err = service
            .record_gate_event(id, GateEvent::Exit)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "failed_precondition");
        assert!(err.to_string().contains("Already allowed exit"));

        let pass = store.get_outpass(id.value()).await.unwrap().unwrap();
        assert_eq!(pass.actual_out_time, first.actual_out_time);
    }

    #[tokio::test]
    async fn duplicate_entry_keeps_first_timestamp() {
        let (service, store) = service_with_store().await;
        seed_hosteler(&store, "k@college.edu", "21B011", "109").await;

        let pass = service
            .create_request(&identity("k@college.edu"), payload("outing", "109"))
            .await
            .unwrap();
        let id = OutPassId::new(pass.id);
        service.decide(id, PassDecision::Approve).await.unwrap();
        service.record_gate_event(id, GateEvent::Exit).await.unwrap();

        let first = service
            .record_gate_event(id, GateEvent::Entry)
            .await
            .unwrap();
        let err = service
            .record_gate_event(id, GateEvent::Entry)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), "failed_precondition");
        assert!(err.to_string().contains("Already allowed entry"));

        let pass = store.get_outpass(id.value()).await.unwrap().unwrap();
        assert_eq!(pass.actual_in_time, first.actual_in_time);
    }

    // Exit needs approved and entry needs in_use. A pending pass cannot
    // pass the gate in either direction.
    #[tokio::test]
    async fn pending_pass_cannot_record_gate_events() {
        let (service, store) = service_with_store().await;
        seed_hosteler(&store, "l@college.edu", "21B012", "110").await;

        let pass = service
            .create_request(&identity("l@college.edu"), payload("outing", "110"))
            .await
            .unwrap();
        let id = OutPassId::new(pass.id);

        let err = service
            .record_gate_event(id, GateEvent::Exit)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "failed_precondition");

        let err = service
            .record_gate_event(id, GateEvent::Entry)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "failed_precondition");
    }

    #[tokio::test]
    async fn gate_event_on_missing_pass_is_not_found() {
        let (service, _store) = service_with_store().await;
        let err = service
            .record_gate_event(OutPassId::new(9999), GateEvent::Exit)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }

    #[tokio::test]
    async fn hostel_listing_filters_and_pages() {
        let (service, store) = service_with_store().await;
        seed_hosteler(&store, "m@college.edu", "21B013", "111").await;
        seed_hosteler(&store, "n@college.edu", "21B014", "112").await;
        let hostel = store.get_hostel_by_slug("aravali").await.unwrap().unwrap();

        service
            .create_request(&identity("m@college.edu"), payload("outing", "111"))
            .await
            .unwrap();
        service
            .create_request(&identity("n@college.edu"), payload("market", "112"))
            .await
            .unwrap();

        let all = service
            .list_for_hostel(hostel.id, HostelPageFilter::default())
            .await
            .unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].hostel.slug, "aravali");

        let filtered = service
            .list_for_hostel(
                hostel.id,
                HostelPageFilter {
                    query: Some("21b014".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].student.roll_number, "21B014");

        // A query matching nothing is an empty page, not an error
        let none = service
            .list_for_hostel(
                hostel.id,
                HostelPageFilter {
                    query: Some("nobody".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(none.is_empty());

        let asc = service
            .list_for_hostel(
                hostel.id,
                HostelPageFilter {
                    sort: SortDirection::Asc,
                    limit: 1,
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(asc.len(), 1);
    }

    #[tokio::test]
    async fn listing_query_wildcards_match_literally() {
        let (service, store) = service_with_store().await;
        seed_hosteler(&store, "o@college.edu", "21B015", "113").await;
        let hostel = store.get_hostel_by_slug("aravali").await.unwrap().unwrap();

        service
            .create_request(&identity("o@college.edu"), payload("outing", "113"))
            .await
            .unwrap();

        // % and _ are literal characters in a search, not LIKE wildcards
        for query in ["%", "_", "21B_15"] {
            let rows = service
                .list_for_hostel(
                    hostel.id,
                    HostelPageFilter {
                        query: Some(query.to_string()),
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            assert!(rows.is_empty(), "query {query:?} should match nothing");
        }
    }

    #[tokio::test]
    async fn listing_unknown_hostel_is_not_found() {
        let (service, _store) = service_with_store().await;
        let err = service
            .list_for_hostel(42, HostelPageFilter::default())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), "not_found");
    }
}
