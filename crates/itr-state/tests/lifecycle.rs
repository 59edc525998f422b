//! End-to-end filing lifecycle through the registry.

use std::sync::Arc;

use itr_core::{
    AssessmentYear, FactSource, FieldCode, FieldId, FilingFor, FilingId, ItrType, OwnerId, Pan,
    Regime, Timestamp,
};
use itr_forms::ScheduleKind;
use itr_reconcile::{FactDraft, Reconciler};
use itr_state::{
    Action, Actor, FilingError, FilingRegistry, FilingStatus, GatewayError, NewFiling,
    ProcessingEvent, RetryPolicy, Role, SandboxGateway, StaticFeed, SubmissionError,
    VerificationEvent,
};
use itr_tax::TableSet;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn setup() -> (FilingRegistry, Arc<SandboxGateway>) {
    let gateway = Arc::new(SandboxGateway::new());
    let registry = FilingRegistry::new(
        Arc::new(TableSet::builtin().unwrap()),
        Reconciler::default(),
        gateway.clone(),
    )
    .unwrap();
    (registry, gateway)
}

fn user() -> Actor {
    Actor::new("taxpayer-1", Role::Taxpayer)
}

fn ca() -> Actor {
    Actor::new("ca-7", Role::CharteredAccountant)
}

fn admin() -> Actor {
    Actor::new("ops-1", Role::Admin)
}

fn new_filing(owner: OwnerId) -> NewFiling {
    NewFiling {
        owner,
        pan: Pan::new("ABCPE1234F").unwrap(),
        assessment_year: AssessmentYear::parse("2025-26").unwrap(),
        filing_for: FilingFor::Own,
        itr_type: ItrType::Itr1,
    }
}

fn rev(registry: &FilingRegistry, id: FilingId) -> u64 {
    registry.get(id, &user()).unwrap().revision
}

fn add(registry: &FilingRegistry, id: FilingId, code: FieldCode, amount: Decimal) {
    registry
        .add_fact(id, &user(), rev(registry, id), FactDraft::user_entered(FieldId::new(code), amount))
        .unwrap();
}

/// A salaried ITR-1 filing taken to `ready_to_submit`.
fn ready_filing(registry: &FilingRegistry, owner: OwnerId) -> FilingId {
    let id = registry.create_filing(&user(), new_filing(owner)).unwrap().id;
    add(registry, id, FieldCode::SalaryIncome, dec!(900000));
    add(registry, id, FieldCode::InterestIncome, dec!(12000));
    add(registry, id, FieldCode::TdsSalary, dec!(30000));
    registry.select_regime(id, &user(), rev(registry, id), Regime::New).unwrap();
    registry.complete_intake(id, &user(), rev(registry, id)).unwrap();
    registry.compute(id, &user(), rev(registry, id)).unwrap();
    registry.review(id, &ca(), rev(registry, id)).unwrap();
    registry.mark_ready(id, &user(), rev(registry, id)).unwrap();
    id
}

#[test]
fn full_lifecycle_reaches_processed() {
    let (registry, _) = setup();
    let id = ready_filing(&registry, OwnerId::new());

    let receipt = registry.submit(id, &user(), rev(&registry, id)).unwrap();
    assert!(!receipt.replayed);
    assert_eq!(receipt.idempotency_key, format!("{id}:v1"));

    let filing = registry
        .apply_verification(
            &Actor::system(),
            &VerificationEvent {
                filing_id: id,
                verified: true,
                verified_at: Timestamp::now(),
            },
        )
        .unwrap();
    assert_eq!(filing.status, FilingStatus::EVerified);

    let filing = registry
        .mark_processed(
            &Actor::system(),
            &ProcessingEvent {
                filing_id: id,
                processed_at: Timestamp::now(),
                intimation_ref: "CPC/2526/000123".into(),
            },
        )
        .unwrap();
    assert_eq!(filing.status, FilingStatus::Processed);
    assert_eq!(filing.view().ack_number, Some(receipt.ack_number));

    let path: Vec<FilingStatus> = filing.transitions.iter().map(|t| t.to).collect();
    assert_eq!(
        path,
        vec![
            FilingStatus::IntakeComplete,
            FilingStatus::Computed,
            FilingStatus::Reviewed,
            FilingStatus::ReadyToSubmit,
            FilingStatus::Submitted,
            FilingStatus::EVerified,
            FilingStatus::Processed,
        ]
    );
}

#[test]
fn computation_snapshot_matches_the_document() {
    let (registry, _) = setup();
    let id = ready_filing(&registry, OwnerId::new());
    let filing = registry.get(id, &user()).unwrap();
    let computation = filing.current_computation().unwrap();
    let version = filing.current_version().unwrap();
    assert_eq!(version.version, 1);
    assert_eq!(version.computation_id, computation.id);
    assert_eq!(computation.computation.gross_total_income, dec!(912000));
    assert_eq!(computation.computation.taxes_paid, dec!(30000));
    let parsed = itr_schema::parse_resolved_fields(&version.document.document).unwrap();
    assert_eq!(parsed, filing.resolved_values());
}

#[test]
fn submit_is_idempotent() {
    let (registry, gateway) = setup();
    let id = ready_filing(&registry, OwnerId::new());
    let revision = rev(&registry, id);

    let first = registry.submit(id, &user(), revision).unwrap();
    let second = registry.submit(id, &user(), revision).unwrap();
    assert_eq!(first.ack_number, second.ack_number);
    assert_eq!(first.idempotency_key, second.idempotency_key);
    assert!(second.replayed);
    assert_eq!(gateway.calls(), 1);
}

#[test]
fn acknowledgements_are_unique_across_filings() {
    let (registry, _) = setup();
    let a = ready_filing(&registry, OwnerId::new());
    let b = ready_filing(&registry, OwnerId::new());
    let ack_a = registry.submit(a, &user(), rev(&registry, a)).unwrap().ack_number;
    let ack_b = registry.submit(b, &user(), rev(&registry, b)).unwrap().ack_number;
    assert_ne!(ack_a, ack_b);
}

#[test]
fn submitted_filings_reject_every_mutation() {
    let (registry, _) = setup();
    let id = ready_filing(&registry, OwnerId::new());
    registry.submit(id, &user(), rev(&registry, id)).unwrap();
    let before = registry.get(id, &user()).unwrap();
    let r = before.revision;

    let attempts: Vec<(&str, Result<(), FilingError>)> = vec![
        (
            "add_fact",
            registry
                .add_fact(id, &user(), r, FactDraft::user_entered(FieldId::new(FieldCode::DividendIncome), dec!(10)))
                .map(drop),
        ),
        ("reconcile", registry.reconcile(id, &user(), r).map(drop)),
        ("select_regime", registry.select_regime(id, &user(), r, Regime::Old).map(drop)),
        (
            "attach_schedule",
            registry
                .attach_schedule(id, &user(), r, ScheduleKind::Salary, "form16".into())
                .map(drop),
        ),
        ("complete_intake", registry.complete_intake(id, &user(), r).map(drop)),
        ("compute", registry.compute(id, &user(), r).map(drop)),
        ("review", registry.review(id, &ca(), r).map(drop)),
        ("mark_ready", registry.mark_ready(id, &user(), r).map(drop)),
        ("reject", registry.reject(id, &ca(), r, "late".into()).map(drop)),
        ("restart", registry.restart(id, &user(), r).map(drop)),
        ("void", registry.void(id, &admin(), r, "duplicate".into()).map(drop)),
        ("propose_itr_switch", registry.propose_itr_switch(id, &user(), r, Some(ItrType::Itr2)).map(drop)),
        ("confirm_itr_switch", registry.confirm_itr_switch(id, &user(), r, ItrType::Itr2).map(drop)),
    ];
    for (op, result) in attempts {
        assert!(
            matches!(
                result,
                Err(FilingError::ImmutableStateViolation {
                    state: FilingStatus::Submitted,
                    ..
                })
            ),
            "{op} was not rejected: {result:?}"
        );
    }
    assert_eq!(registry.get(id, &user()).unwrap(), before);

    registry
        .apply_verification(
            &Actor::system(),
            &VerificationEvent {
                filing_id: id,
                verified: true,
                verified_at: Timestamp::now(),
            },
        )
        .unwrap();
    assert!(matches!(
        registry.select_regime(id, &user(), rev(&registry, id), Regime::Old),
        Err(FilingError::ImmutableStateViolation {
            state: FilingStatus::EVerified,
            ..
        })
    ));
}

#[test]
fn stale_revisions_are_refused() {
    let (registry, _) = setup();
    let id = registry.create_filing(&user(), new_filing(OwnerId::new())).unwrap().id;
    registry.select_regime(id, &user(), 0, Regime::New).unwrap();
    let before = registry.get(id, &user()).unwrap();

    let err = registry.select_regime(id, &user(), 0, Regime::Old).unwrap_err();
    assert!(matches!(
        err,
        FilingError::ConcurrentModification {
            expected: 0,
            actual: 1
        }
    ));
    assert_eq!(registry.get(id, &user()).unwrap(), before);
}

#[test]
fn concurrent_writers_with_one_revision_yield_one_winner() {
    let (registry, _) = setup();
    let id = registry.create_filing(&user(), new_filing(OwnerId::new())).unwrap().id;
    let registry = Arc::new(registry);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let registry = Arc::clone(&registry);
            std::thread::spawn(move || {
                registry
                    .add_fact(
                        id,
                        &user(),
                        0,
                        FactDraft::user_entered(FieldId::new(FieldCode::InterestIncome), Decimal::from(100 + i)),
                    )
                    .is_ok()
            })
        })
        .collect();
    let winners = handles
        .into_iter()
        .map(|h| h.join().unwrap())
        .filter(|ok| *ok)
        .count();
    assert_eq!(winners, 1);
    assert_eq!(registry.get(id, &user()).unwrap().facts.len(), 1);
}

#[test]
fn intake_without_salary_names_the_field() {
    let (registry, _) = setup();
    let id = registry.create_filing(&user(), new_filing(OwnerId::new())).unwrap().id;
    add(&registry, id, FieldCode::InterestIncome, dec!(4000));
    let err = registry.complete_intake(id, &user(), rev(&registry, id)).unwrap_err();
    assert!(matches!(err, FilingError::Validation(_)));
    assert_eq!(err.fields(), vec!["salary_income".to_string()]);
    assert_eq!(registry.get(id, &user()).unwrap().status, FilingStatus::Draft);
}

#[test]
fn capital_gains_on_itr1_switch_to_itr2() {
    let (registry, _) = setup();
    let id = registry.create_filing(&user(), new_filing(OwnerId::new())).unwrap().id;
    add(&registry, id, FieldCode::SalaryIncome, dec!(800000));
    add(&registry, id, FieldCode::ShortTermCapitalGains, dec!(45000));
    registry.select_regime(id, &user(), rev(&registry, id), Regime::New).unwrap();
    registry.complete_intake(id, &user(), rev(&registry, id)).unwrap();

    // The builder refuses capital gains on ITR-1 and nothing changes.
    let before = registry.get(id, &user()).unwrap();
    let err = registry.compute(id, &user(), before.revision).unwrap_err();
    assert_eq!(err.fields(), vec!["short_term_capital_gains".to_string()]);
    assert_eq!(registry.get(id, &user()).unwrap(), before);

    let recommendation = registry.recommend(id, &user()).unwrap();
    assert_eq!(recommendation.recommended, ItrType::Itr2);
    assert!(recommendation.requires_switch);

    let proposal = registry
        .propose_itr_switch(id, &user(), rev(&registry, id), None)
        .unwrap()
        .unwrap();
    assert_eq!((proposal.from, proposal.to), (ItrType::Itr1, ItrType::Itr2));
    assert_eq!(registry.get(id, &user()).unwrap().itr_type, ItrType::Itr1);

    let switched = registry
        .confirm_itr_switch(id, &user(), rev(&registry, id), ItrType::Itr2)
        .unwrap();
    assert_eq!(switched.status, FilingStatus::Draft);
    assert_eq!(switched.itr_type, ItrType::Itr2);
    assert_eq!(switched.reconciliation.resolutions, before.reconciliation.resolutions);
    assert!(switched.pending_switch.is_none());

    registry.complete_intake(id, &user(), switched.revision).unwrap();
    let version = registry.compute(id, &user(), rev(&registry, id)).unwrap();
    assert_eq!(version.itr_type, ItrType::Itr2);
}

#[test]
fn switching_to_an_ineligible_form_is_refused() {
    let (registry, _) = setup();
    let id = registry.create_filing(&user(), new_filing(OwnerId::new())).unwrap().id;
    add(&registry, id, FieldCode::SalaryIncome, dec!(800000));
    add(&registry, id, FieldCode::LongTermCapitalGains, dec!(90000));
    let err = registry
        .propose_itr_switch(id, &user(), rev(&registry, id), Some(ItrType::Itr4))
        .unwrap_err();
    assert_eq!(err.fields(), vec!["itr_type".to_string()]);
}

#[test]
fn the_recommended_form_always_completes_intake() {
    let profiles: Vec<Vec<(FieldCode, Decimal)>> = vec![
        vec![(FieldCode::SalaryIncome, dec!(900000))],
        vec![(FieldCode::InterestIncome, dec!(400000))],
        vec![(FieldCode::ForeignAssetValue, dec!(2500000))],
        vec![(FieldCode::AgriculturalIncome, dec!(80000))],
        vec![(FieldCode::PresumptiveProfessionalIncome, dec!(800000))],
        vec![
            (FieldCode::PresumptiveBusinessIncome, dec!(800000)),
            (FieldCode::ShortTermCapitalGains, dec!(10000)),
        ],
        vec![(FieldCode::SalaryIncome, dec!(300000)), (FieldCode::BusinessIncome, dec!(1500000))],
    ];
    let (registry, _) = setup();
    for items in profiles {
        let id = registry.create_filing(&user(), new_filing(OwnerId::new())).unwrap().id;
        for (code, amount) in &items {
            add(&registry, id, *code, *amount);
        }
        let recommendation = registry.recommend(id, &user()).unwrap();
        if recommendation.requires_switch {
            registry
                .propose_itr_switch(id, &user(), rev(&registry, id), None)
                .unwrap()
                .unwrap();
            registry
                .confirm_itr_switch(id, &user(), rev(&registry, id), recommendation.recommended)
                .unwrap();
        }
        let filing = registry
            .complete_intake(id, &user(), rev(&registry, id))
            .unwrap_or_else(|e| panic!("{items:?} on {}: {e}", recommendation.recommended));
        assert_eq!(filing.itr_type, recommendation.recommended);
        assert_eq!(filing.status, FilingStatus::IntakeComplete);
    }
}

#[test]
fn a_stale_switch_proposal_is_rechecked() {
    let (registry, _) = setup();
    let id = registry.create_filing(&user(), new_filing(OwnerId::new())).unwrap().id;
    add(&registry, id, FieldCode::SalaryIncome, dec!(800000));
    add(&registry, id, FieldCode::LongTermCapitalGains, dec!(90000));
    registry
        .propose_itr_switch(id, &user(), rev(&registry, id), None)
        .unwrap()
        .unwrap();
    add(&registry, id, FieldCode::BusinessIncome, dec!(600000));

    let err = registry
        .confirm_itr_switch(id, &user(), rev(&registry, id), ItrType::Itr2)
        .unwrap_err();
    assert_eq!(err.fields(), vec!["itr_type".to_string()]);
    assert_eq!(registry.get(id, &user()).unwrap().itr_type, ItrType::Itr1);
}

#[test]
fn computations_and_versions_are_append_only() {
    let (registry, _) = setup();
    let id = registry.create_filing(&user(), new_filing(OwnerId::new())).unwrap().id;
    add(&registry, id, FieldCode::SalaryIncome, dec!(900000));
    registry.select_regime(id, &user(), rev(&registry, id), Regime::New).unwrap();
    registry.complete_intake(id, &user(), rev(&registry, id)).unwrap();
    let v1 = registry.compute(id, &user(), rev(&registry, id)).unwrap();
    assert_eq!(v1.version, 1);

    let computed = registry.get(id, &user()).unwrap();
    let v1_bytes = serde_json::to_vec(&computed.versions[0]).unwrap();
    let c1_bytes = serde_json::to_vec(&computed.computations[0]).unwrap();

    add(&registry, id, FieldCode::InterestIncome, dec!(25000));
    let reopened = registry.get(id, &user()).unwrap();
    assert_eq!(reopened.status, FilingStatus::Draft);
    assert!(reopened.current_computation.is_none());
    assert!(reopened.current_version.is_none());
    assert_eq!(reopened.versions.len(), 1);

    registry.complete_intake(id, &user(), rev(&registry, id)).unwrap();
    let v2 = registry.compute(id, &user(), rev(&registry, id)).unwrap();
    assert_eq!(v2.version, 2);
    assert_ne!(v2.document.digest, v1.document.digest);

    let recomputed = registry.get(id, &user()).unwrap();
    assert_eq!(recomputed.versions.len(), 2);
    assert_eq!(recomputed.computations.len(), 2);
    assert_eq!(recomputed.current_version, Some(v2.id));
    assert_eq!(serde_json::to_vec(&recomputed.versions[0]).unwrap(), v1_bytes);
    assert_eq!(serde_json::to_vec(&recomputed.computations[0]).unwrap(), c1_bytes);
    assert_eq!(recomputed.versions[0].document.digest, v1.document.digest);
}

#[test]
fn one_in_progress_filing_per_key() {
    let (registry, _) = setup();
    let owner = OwnerId::new();
    let first = registry.create_filing(&user(), new_filing(owner)).unwrap();
    assert!(matches!(
        registry.create_filing(&user(), new_filing(owner)),
        Err(FilingError::DuplicateFiling { existing }) if existing == first.id
    ));

    let mut family = new_filing(owner);
    family.filing_for = FilingFor::Family {
        member: "mother".into(),
    };
    registry.create_filing(&user(), family).unwrap();

    registry.void(first.id, &admin(), first.revision, "created by mistake".into()).unwrap();
    let voided = registry.get(first.id, &user()).unwrap();
    assert!(voided.current_version.is_none());
    registry.create_filing(&user(), new_filing(owner)).unwrap();
}

#[test]
fn revised_return_corrects_a_submitted_original() {
    let (registry, _) = setup();
    let owner = OwnerId::new();
    let original = ready_filing(&registry, owner);
    assert!(registry.create_revised_return(original, &user()).is_err());

    let ack = registry.submit(original, &user(), rev(&registry, original)).unwrap().ack_number;
    let original_before = registry.get(original, &user()).unwrap();

    let revised = registry.create_revised_return(original, &user()).unwrap();
    assert_eq!(revised.status, FilingStatus::Draft);
    assert_eq!(revised.original.as_ref().map(|o| o.ack_number.clone()), Some(ack.clone()));
    assert_eq!(revised.reconciliation, original_before.reconciliation);
    assert_eq!(registry.get(original, &user()).unwrap(), original_before);
    assert!(matches!(
        registry.create_revised_return(original, &user()),
        Err(FilingError::DuplicateFiling { .. })
    ));

    let id = revised.id;
    add(&registry, id, FieldCode::Section80CCD2, dec!(20000));
    registry.complete_intake(id, &user(), rev(&registry, id)).unwrap();
    let version = registry.compute(id, &user(), rev(&registry, id)).unwrap();
    let status = &version.document.document["ITR"]["ITR1"]["FilingStatus"];
    assert_eq!(status["ReturnFileSec"], 17);
    assert_eq!(status["OrigRetFiledAckNo"], ack.as_str());
}

#[test]
fn retriable_failures_are_retried() {
    let (registry, gateway) = setup();
    let id = ready_filing(&registry, OwnerId::new());
    gateway.fail_next(GatewayError::Timeout);
    gateway.fail_next(GatewayError::Unavailable {
        reason: "maintenance".into(),
    });

    let receipt = registry
        .submit_with_retry(id, &user(), rev(&registry, id), &RetryPolicy::immediate(3))
        .unwrap();
    let filing = registry.get(id, &user()).unwrap();
    assert_eq!(filing.status, FilingStatus::Submitted);
    assert_eq!(filing.submission_attempts.len(), 3);
    assert_eq!(filing.submission_attempts[2].attempt, 3);
    assert!(filing.submission_attempts[2].error.is_none());
    assert!(filing.submission_attempts[0].retriable);
    assert_eq!(filing.view().ack_number, Some(receipt.ack_number));
}

#[test]
fn exhausted_retries_leave_the_filing_ready() {
    let (registry, gateway) = setup();
    let id = ready_filing(&registry, OwnerId::new());
    for _ in 0..3 {
        gateway.fail_next(GatewayError::Timeout);
    }
    let revision = rev(&registry, id);
    let err = registry
        .submit_with_retry(id, &user(), revision, &RetryPolicy::immediate(3))
        .unwrap_err();
    assert!(matches!(
        err,
        FilingError::Submission(SubmissionError::RetryBudgetExhausted { attempts: 3, .. })
    ));
    let filing = registry.get(id, &user()).unwrap();
    assert_eq!(filing.status, FilingStatus::ReadyToSubmit);
    assert_eq!(filing.revision, revision);
    assert_eq!(filing.submission_attempts.len(), 3);

    // The budget is per call; a later submit goes through.
    registry.submit(id, &user(), revision).unwrap();
}

#[test]
fn rejected_submissions_are_not_retried() {
    let (registry, gateway) = setup();
    let id = ready_filing(&registry, OwnerId::new());
    gateway.fail_next(GatewayError::Rejected {
        reason: "schema version retired".into(),
    });
    let err = registry
        .submit_with_retry(id, &user(), rev(&registry, id), &RetryPolicy::immediate(5))
        .unwrap_err();
    assert!(matches!(
        err,
        FilingError::Submission(SubmissionError::Gateway { attempt: 1, .. })
    ));
    assert_eq!(gateway.calls(), 1);
}

#[test]
fn blocking_discrepancies_hold_back_readiness() {
    let (registry, _) = setup();
    let id = registry.create_filing(&user(), new_filing(OwnerId::new())).unwrap().id;
    let salary = FieldId::new(FieldCode::SalaryIncome);
    registry
        .add_fact(id, &user(), rev(&registry, id), FactDraft::user_entered(salary.clone(), dec!(900000)))
        .unwrap();
    let statement = StaticFeed::new(
        FactSource::AggregatedStatement,
        vec![FactDraft {
            field: salary.clone(),
            amount: dec!(500000),
            source: FactSource::AggregatedStatement,
            confidence: None,
            origin: Some("AIS".into()),
            reported_at: None,
        }],
    );
    registry.import_facts(id, &user(), rev(&registry, id), &statement).unwrap();
    registry.select_regime(id, &user(), rev(&registry, id), Regime::Old).unwrap();
    registry.complete_intake(id, &user(), rev(&registry, id)).unwrap();
    registry.compute(id, &user(), rev(&registry, id)).unwrap();
    registry.review(id, &ca(), rev(&registry, id)).unwrap();

    let err = registry.mark_ready(id, &user(), rev(&registry, id)).unwrap_err();
    assert_eq!(err.fields(), vec!["salary_income".to_string()]);

    // Pinning the user's figure acknowledges the conflict and reopens the draft.
    let filing = registry.get(id, &user()).unwrap();
    let user_fact = filing
        .facts
        .iter()
        .find(|f| f.source == FactSource::UserEntered)
        .unwrap()
        .id;
    let resolution = registry
        .resolve_manually(id, &ca(), filing.revision, &salary, user_fact, "arrears per Form 16".into())
        .unwrap();
    assert!(resolution.manual_override);
    assert_eq!(resolution.amount, dec!(900000));
    assert_eq!(registry.get(id, &user()).unwrap().status, FilingStatus::Draft);

    registry.complete_intake(id, &user(), rev(&registry, id)).unwrap();
    registry.compute(id, &user(), rev(&registry, id)).unwrap();
    registry.review(id, &ca(), rev(&registry, id)).unwrap();
    registry.mark_ready(id, &user(), rev(&registry, id)).unwrap();
}

#[test]
fn feeds_must_label_their_facts() {
    let (registry, _) = setup();
    let id = registry.create_filing(&user(), new_filing(OwnerId::new())).unwrap().id;
    let feed = StaticFeed::new(
        FactSource::OcrExtracted,
        vec![FactDraft::user_entered(FieldId::new(FieldCode::SalaryIncome), dec!(1))],
    );
    assert!(matches!(
        registry.import_facts(id, &user(), 0, &feed),
        Err(FilingError::Validation(_))
    ));
    assert!(registry.get(id, &user()).unwrap().facts.is_empty());
}

#[test]
fn roles_are_checked_before_the_table() {
    let (registry, _) = setup();
    let id = registry.create_filing(&user(), new_filing(OwnerId::new())).unwrap().id;
    assert!(matches!(
        registry.void(id, &user(), 0, "no".into()),
        Err(FilingError::Unauthorized {
            role: Role::Taxpayer,
            action: Action::Void
        })
    ));
    assert!(matches!(
        registry.reject(id, &user(), 0, "no".into()),
        Err(FilingError::Unauthorized { .. })
    ));
    // Unauthorized even though the transition itself would also be illegal.
    assert!(matches!(
        registry.apply_verification(
            &user(),
            &VerificationEvent {
                filing_id: id,
                verified: true,
                verified_at: Timestamp::now(),
            }
        ),
        Err(FilingError::Unauthorized { .. })
    ));
    assert!(matches!(
        registry.apply_verification(
            &Actor::system(),
            &VerificationEvent {
                filing_id: id,
                verified: true,
                verified_at: Timestamp::now(),
            }
        ),
        Err(FilingError::InvalidTransition {
            from: FilingStatus::Draft,
            to: FilingStatus::EVerified
        })
    ));
}

#[test]
fn regime_comparison_is_read_only() {
    let (registry, _) = setup();
    let id = registry.create_filing(&user(), new_filing(OwnerId::new())).unwrap().id;
    add(&registry, id, FieldCode::SalaryIncome, dec!(480000));
    add(&registry, id, FieldCode::Section80C, dec!(150000));
    let before = registry.get(id, &user()).unwrap();
    let comparison = registry.compare_regimes(id, &user()).unwrap();
    assert_eq!(comparison.old.taxable_income, dec!(280000));
    assert_eq!(comparison.old.total_tax, Decimal::ZERO);
    assert_eq!(registry.get(id, &user()).unwrap(), before);
}

#[test]
fn unknown_filings_are_not_found() {
    let (registry, _) = setup();
    assert!(matches!(
        registry.get(FilingId::new(), &user()),
        Err(FilingError::NotFound { .. })
    ));
}
