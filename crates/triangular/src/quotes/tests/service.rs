use super::common::*;
use std::sync::Arc;
use std::time::Duration;

use crate::config::StorageConfig;
use crate::identity::{Caller, UserId};
use crate::quotes::{
    QuoteRepository, QuoteRequestStatus, QuoteService, QuoteServiceError, QuoteStatus,
    QuoteValidation, ScoringError,
};
use crate::store::InMemoryStore;
use crate::tiers::Tier;
use crate::users::{UserRepository, UserType};

fn as_user(id: &UserId) -> Caller {
    Caller {
        user_id: id.clone(),
        role: None,
    }
}

#[tokio::test]
async fn submitted_quote_carries_score_and_bumps_counter() {
    let (service, store) = build_service();
    let buyer = requester(&store, "usr-buyer");
    let studio = provider(&store, "usr-studio", &["react developer", "python"], Tier::Gold, 4.0);

    let request = service
        .open_request(&buyer, request_draft(&["React", "Node"], None))
        .await
        .expect("request opened");
    let quote = service
        .submit_quote(&request.id, &studio, quote_draft(45_000.0))
        .await
        .expect("quote submitted");

    // 20 skills + 20 tier + 16 rating, no projects or reputation yet
    assert_eq!(quote.match_score, 56);
    assert_eq!(quote.status, QuoteStatus::Pending);
    let stored = store
        .fetch_request(&request.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(stored.quotes_received, 1);
}

#[tokio::test]
async fn ranking_orders_by_score_with_ties_in_submission_order() {
    let (service, store) = build_service();
    let buyer = requester(&store, "usr-rank-buyer");
    let request = service
        .open_request(&buyer, request_draft(&["logo"], None))
        .await
        .expect("request opened");

    let weak = provider(&store, "usr-weak", &["copywriting"], Tier::Bronze, 1.0);
    let tie_a = provider(&store, "usr-tie-a", &["logo design"], Tier::Bronze, 3.0);
    let strong = provider(&store, "usr-strong", &["Logo Design"], Tier::Gold, 5.0);
    let tie_b = provider(&store, "usr-tie-b", &["logos"], Tier::Silver, 3.0);
    for provider_id in [&weak, &tie_a, &strong, &tie_b] {
        service
            .submit_quote(&request.id, provider_id, quote_draft(1_000.0))
            .await
            .expect("quote submitted");
    }

    let ranked = service.rank_quotes(&request.id).await.expect("ranked");
    let order: Vec<&UserId> = ranked.iter().map(|quote| &quote.provider_id).collect();
    assert_eq!(order, vec![&strong, &tie_a, &tie_b, &weak]);
}

#[tokio::test]
async fn one_quote_per_provider_and_only_enabled_providers() {
    let (service, store) = build_service();
    let buyer = requester(&store, "usr-dup-buyer");
    let studio = provider(&store, "usr-dup-studio", &["seo"], Tier::Bronze, 3.0);
    let request = service
        .open_request(&buyer, request_draft(&["seo"], None))
        .await
        .expect("request opened");

    service
        .submit_quote(&request.id, &studio, quote_draft(10.0))
        .await
        .expect("first quote");
    assert!(matches!(
        service.submit_quote(&request.id, &studio, quote_draft(9.0)).await,
        Err(QuoteServiceError::Duplicate)
    ));

    assert!(matches!(
        service.submit_quote(&request.id, &buyer, quote_draft(9.0)).await,
        Err(QuoteServiceError::Validation(QuoteValidation::NotAProvider))
    ));

    let mut lapsed = store
        .fetch_user(&studio)
        .expect("fetch")
        .expect("present");
    lapsed.platforms.quotify = false;
    let version = lapsed.version;
    store.update_user(lapsed, version).expect("update");
    let second = service
        .open_request(&buyer, request_draft(&["seo"], None))
        .await
        .expect("second request");
    assert!(matches!(
        service.submit_quote(&second.id, &studio, quote_draft(9.0)).await,
        Err(QuoteServiceError::Validation(QuoteValidation::NotAProvider))
    ));
}

#[tokio::test]
async fn invalid_drafts_are_rejected() {
    let (service, store) = build_service();
    let buyer = requester(&store, "usr-invalid-buyer");

    assert!(matches!(
        service
            .open_request(&buyer, request_draft(&["ok", " "], None))
            .await,
        Err(QuoteServiceError::Validation(QuoteValidation::Scoring(
            ScoringError::BlankSkill { index: 1 }
        )))
    ));

    let mut inverted = request_draft(&["ok"], None);
    inverted.budget.min = Some(500.0);
    inverted.budget.max = Some(100.0);
    assert!(matches!(
        service.open_request(&buyer, inverted).await,
        Err(QuoteServiceError::Validation(QuoteValidation::InvertedBudget { .. }))
    ));

    let request = service
        .open_request(&buyer, request_draft(&["ok"], None))
        .await
        .expect("request opened");
    let studio = provider(&store, "usr-negative", &["ok"], Tier::Bronze, 2.0);
    assert!(matches!(
        service
            .submit_quote(&request.id, &studio, quote_draft(-5.0))
            .await,
        Err(QuoteServiceError::Validation(QuoteValidation::InvalidAmount(_)))
    ));

    let unrated = provider(&store, "usr-unrated", &["ok"], Tier::Bronze, 9.0);
    assert!(matches!(
        service
            .submit_quote(&request.id, &unrated, quote_draft(5.0))
            .await,
        Err(QuoteServiceError::Validation(QuoteValidation::Scoring(
            ScoringError::RatingOutOfRange(_)
        )))
    ));
}

#[tokio::test]
async fn accepting_a_viewed_quote_awards_the_request() {
    let (service, store) = build_service();
    let buyer = requester(&store, "usr-award-buyer");
    let studio = provider(&store, "usr-award-studio", &["video"], Tier::Silver, 4.5);
    let rival = provider(&store, "usr-award-rival", &["video"], Tier::Silver, 4.0);
    let request = service
        .open_request(&buyer, request_draft(&["video"], None))
        .await
        .expect("request opened");
    let quote = service
        .submit_quote(&request.id, &studio, quote_draft(20_000.0))
        .await
        .expect("quote");
    let other = service
        .submit_quote(&request.id, &rival, quote_draft(18_000.0))
        .await
        .expect("quote");

    let buyer_caller = as_user(&buyer);
    assert!(matches!(
        service
            .update_quote_status(&buyer_caller, &quote.id, QuoteStatus::Accepted)
            .await,
        Err(QuoteServiceError::InvalidTransition {
            from: QuoteStatus::Pending,
            to: QuoteStatus::Accepted
        })
    ));
    assert!(matches!(
        service
            .update_quote_status(&as_user(&rival), &quote.id, QuoteStatus::Viewed)
            .await,
        Err(QuoteServiceError::Forbidden)
    ));

    for next in [QuoteStatus::Viewed, QuoteStatus::Accepted] {
        service
            .update_quote_status(&buyer_caller, &quote.id, next)
            .await
            .expect("transition");
    }

    let awarded = service.request(&request.id).await.expect("request");
    assert_eq!(awarded.status, QuoteRequestStatus::Awarded);
    assert_eq!(awarded.selected_quote, Some(quote.id.clone()));
    assert_eq!(awarded.quotes_received, 2);

    service
        .update_quote_status(&buyer_caller, &other.id, QuoteStatus::Viewed)
        .await
        .expect("view rival");
    assert!(matches!(
        service
            .update_quote_status(&buyer_caller, &other.id, QuoteStatus::Accepted)
            .await,
        Err(QuoteServiceError::RequestClosed {
            status: QuoteRequestStatus::Awarded
        })
    ));

    let latecomer = provider(&store, "usr-late", &["video"], Tier::Gold, 5.0);
    assert!(matches!(
        service
            .submit_quote(&request.id, &latecomer, quote_draft(1.0))
            .await,
        Err(QuoteServiceError::RequestClosed { .. })
    ));
}

#[tokio::test]
async fn provider_may_withdraw_own_quote() {
    let (service, store) = build_service();
    let buyer = requester(&store, "usr-wd-buyer");
    let studio = provider(&store, "usr-wd-studio", &["audio"], Tier::Bronze, 3.0);
    let request = service
        .open_request(&buyer, request_draft(&["audio"], None))
        .await
        .expect("request opened");
    let quote = service
        .submit_quote(&request.id, &studio, quote_draft(300.0))
        .await
        .expect("quote");

    assert!(matches!(
        service
            .update_quote_status(&as_user(&buyer), &quote.id, QuoteStatus::Withdrawn)
            .await,
        Err(QuoteServiceError::Forbidden)
    ));
    let withdrawn = service
        .update_quote_status(&as_user(&studio), &quote.id, QuoteStatus::Withdrawn)
        .await
        .expect("withdrawn");
    assert_eq!(withdrawn.status, QuoteStatus::Withdrawn);
}

#[tokio::test]
async fn rescore_picks_up_provider_changes() {
    let (service, store) = build_service();
    let buyer = requester(&store, "usr-rs-buyer");
    let studio = provider(&store, "usr-rs-studio", &["branding"], Tier::Bronze, 2.0);
    let request = service
        .open_request(&buyer, request_draft(&["branding"], Some(Tier::Gold)))
        .await
        .expect("request opened");
    let quote = service
        .submit_quote(&request.id, &studio, quote_draft(700.0))
        .await
        .expect("quote");
    assert_eq!(quote.match_score, 48);

    let mut promoted = store.fetch_user(&studio).expect("fetch").expect("present");
    promoted.tier = Tier::Gold;
    promoted.quotify.provider.completed_projects = 10;
    let version = promoted.version;
    store.update_user(promoted, version).expect("update");

    let rescored = service.rescore(&request.id).await.expect("rescored");
    assert_eq!(rescored[0].match_score, 78);
    let stored = store.fetch_quote(&quote.id).expect("fetch").expect("present");
    assert_eq!(stored.match_score, 78);

    let breakdown = service.breakdown(&quote.id).await.expect("breakdown");
    assert_eq!(breakdown.tier, 20.0);
    assert_eq!(breakdown.volume, 10.0);
    assert_eq!(breakdown.total(), 78);
}

#[tokio::test]
async fn admin_may_move_any_quote() {
    let (service, store) = build_service();
    let buyer = requester(&store, "usr-admin-buyer");
    let studio = provider(&store, "usr-admin-studio", &["ops"], Tier::Bronze, 3.0);
    let request = service
        .open_request(&buyer, request_draft(&["ops"], None))
        .await
        .expect("request opened");
    let quote = service
        .submit_quote(&request.id, &studio, quote_draft(1.0))
        .await
        .expect("quote");

    let admin = Caller {
        user_id: UserId::from("usr-moderator"),
        role: Some(UserType::Admin),
    };
    let viewed = service
        .update_quote_status(&admin, &quote.id, QuoteStatus::Viewed)
        .await
        .expect("admin override");
    assert_eq!(viewed.status, QuoteStatus::Viewed);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_accepts_award_the_request_once() {
    let inner = InMemoryStore::new();
    let buyer = requester(&inner, "usr-race-buyer");
    let first = provider(&inner, "usr-race-a", &["seo"], Tier::Gold, 4.0);
    let second = provider(&inner, "usr-race-b", &["seo"], Tier::Gold, 4.0);

    let service = Arc::new(QuoteService::new(
        Arc::new(StalledQuoteStore {
            inner: inner.clone(),
            stall: Duration::from_millis(100),
        }),
        StorageConfig::default(),
    ));
    let request = service
        .open_request(&buyer, request_draft(&["seo"], None))
        .await
        .expect("request opened");
    let mut quote_ids = Vec::new();
    for provider_id in [&first, &second] {
        let quote = service
            .submit_quote(&request.id, provider_id, quote_draft(9_000.0))
            .await
            .expect("quote");
        service
            .update_quote_status(&as_user(&buyer), &quote.id, QuoteStatus::Viewed)
            .await
            .expect("viewed");
        quote_ids.push(quote.id);
    }

    let handles: Vec<_> = quote_ids
        .iter()
        .cloned()
        .map(|quote_id| {
            let service = Arc::clone(&service);
            let actor = as_user(&buyer);
            tokio::spawn(async move {
                service
                    .update_quote_status(&actor, &quote_id, QuoteStatus::Accepted)
                    .await
            })
        })
        .collect();
    let mut outcomes = Vec::new();
    for handle in handles {
        outcomes.push(handle.await.expect("accept task"));
    }

    let winners: Vec<_> = outcomes.iter().filter_map(|outcome| outcome.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1, "one accept commits: {outcomes:?}");
    assert!(outcomes.iter().any(|outcome| matches!(
        outcome,
        Err(QuoteServiceError::RequestClosed {
            status: QuoteRequestStatus::Awarded
        })
    )));

    let awarded = inner
        .fetch_request(&request.id)
        .expect("fetch")
        .expect("present");
    assert_eq!(awarded.selected_quote.as_ref(), Some(&winners[0].id));
    let accepted = inner
        .quotes_for(&request.id)
        .expect("quotes")
        .into_iter()
        .filter(|quote| quote.status == QuoteStatus::Accepted)
        .count();
    assert_eq!(accepted, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn withdrawal_racing_acceptance_leaves_one_outcome() {
    let inner = InMemoryStore::new();
    let buyer = requester(&inner, "usr-race2-buyer");
    let studio = provider(&inner, "usr-race2-studio", &["seo"], Tier::Gold, 4.0);
    let service = Arc::new(QuoteService::new(
        Arc::new(StalledQuoteStore {
            inner: inner.clone(),
            stall: Duration::from_millis(100),
        }),
        StorageConfig::default(),
    ));
    let request = service
        .open_request(&buyer, request_draft(&["seo"], None))
        .await
        .expect("request opened");
    let quote = service
        .submit_quote(&request.id, &studio, quote_draft(9_000.0))
        .await
        .expect("quote");
    service
        .update_quote_status(&as_user(&buyer), &quote.id, QuoteStatus::Viewed)
        .await
        .expect("viewed");

    let accept = {
        let service = Arc::clone(&service);
        let (actor, id) = (as_user(&buyer), quote.id.clone());
        tokio::spawn(async move {
            service
                .update_quote_status(&actor, &id, QuoteStatus::Accepted)
                .await
        })
    };
    let withdraw = {
        let service = Arc::clone(&service);
        let (actor, id) = (as_user(&studio), quote.id.clone());
        tokio::spawn(async move {
            service
                .update_quote_status(&actor, &id, QuoteStatus::Withdrawn)
                .await
        })
    };
    let accept = accept.await.expect("accept task");
    let withdraw = withdraw.await.expect("withdraw task");
    assert_eq!(accept.is_ok() as u8 + withdraw.is_ok() as u8, 1);

    let stored = inner
        .fetch_quote(&quote.id)
        .expect("fetch")
        .expect("present");
    let request = inner
        .fetch_request(&request.id)
        .expect("fetch")
        .expect("present");
    if accept.is_ok() {
        assert_eq!(stored.status, QuoteStatus::Accepted);
        assert_eq!(request.status, QuoteRequestStatus::Awarded);
        assert!(matches!(
            withdraw,
            Err(QuoteServiceError::InvalidTransition { .. })
        ));
    } else {
        assert_eq!(stored.status, QuoteStatus::Withdrawn);
        assert_eq!(request.status, QuoteRequestStatus::Open);
        assert!(matches!(
            accept,
            Err(QuoteServiceError::InvalidTransition { .. })
        ));
    }
}
