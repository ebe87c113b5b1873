use crate::infra::{build_services, parse_tier};
use chrono::Utc;
use clap::Args;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use triangular::config::{LedgerConfig, StorageConfig};
use triangular::error::AppError;
use triangular::events::InMemoryEventLog;
use triangular::identity::{OpportunityId, UserId};
use triangular::opportunities::{ApplicationDraft, Opportunity, Platform};
use triangular::quotes::{
    match_breakdown, MatchBreakdown, Pricing, PricingKind, QuoteDraft, QuoteRequest,
    QuoteRequestDraft, QuoteRequirements,
};
use triangular::reputation::LedgerRepository;
use triangular::tiers::{can_graduate, meets_minimum, Tier, TierBreakpoints};
use triangular::users::{ProviderProfile, User, UserRepository, UserType};

#[derive(Args, Debug)]
pub(crate) struct TierArgs {
    /// Reputation total to classify
    pub(crate) reputation: u64,
    /// Treat the user as holding an active subscription
    #[arg(long)]
    pub(crate) subscribed: bool,
    /// Also check the derived tier against an access-control minimum
    #[arg(long, value_parser = parse_tier)]
    pub(crate) minimum: Option<Tier>,
}

#[derive(Args, Debug)]
pub(crate) struct ScoreArgs {
    /// JSON file with `requirements` and `provider` objects
    pub(crate) input: PathBuf,
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Number of concurrent ledger writers in the contention walkthrough
    #[arg(long, default_value_t = 4)]
    pub(crate) writers: u32,
}

/// Offline scoring input: quote requirements plus the provider attributes the scorer reads.
#[derive(Debug, Deserialize)]
pub(crate) struct ScoreInput {
    pub(crate) requirements: QuoteRequirements,
    pub(crate) provider: ProviderInput,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProviderInput {
    #[serde(default)]
    pub(crate) tier: Tier,
    #[serde(default)]
    pub(crate) reputation: u64,
    #[serde(flatten)]
    pub(crate) profile: ProviderProfile,
}

pub(crate) fn run_tier(args: TierArgs) -> Result<(), AppError> {
    let schedule = TierBreakpoints::default();
    let standing = schedule.standing(args.reputation);

    println!("Reputation {}", args.reputation);
    println!("- tier: {}", standing.tier);
    println!("- progress within tier: {:.1}%", standing.progress);
    match (standing.next_tier, standing.points_to_next) {
        (Some(next), Some(points)) => println!("- next tier: {next} in {points} points"),
        _ => println!("- top of the schedule"),
    }
    println!(
        "- can graduate: {}",
        can_graduate(args.reputation, args.subscribed)
    );
    if let Some(minimum) = args.minimum {
        println!(
            "- meets {minimum} access minimum: {}",
            meets_minimum(standing.tier, minimum)
        );
    }
    Ok(())
}

pub(crate) fn run_score(args: ScoreArgs) -> Result<(), AppError> {
    let raw = std::fs::read_to_string(&args.input)?;
    let breakdown = score_input(&raw)?;
    print_breakdown(&breakdown);
    Ok(())
}

pub(crate) fn score_input(raw: &str) -> Result<MatchBreakdown, AppError> {
    let input: ScoreInput = serde_json::from_str(raw)?;
    let request = QuoteRequest::from_draft(
        UserId::from("usr-offline-requester"),
        QuoteRequestDraft {
            title: "offline".to_string(),
            category: "offline".to_string(),
            requirements: input.requirements,
            budget: Default::default(),
            deadline: None,
        },
    );

    let mut provider = User::new(
        UserId::from("usr-offline-provider"),
        "offline",
        "offline@example.com",
        UserType::Contributor,
    );
    provider.tier = input.provider.tier;
    provider.reputation = input.provider.reputation;
    provider.quotify.is_provider = true;
    provider.quotify.provider = input.provider.profile;

    Ok(match_breakdown(&request, &provider)?)
}

fn print_breakdown(breakdown: &MatchBreakdown) {
    println!("Match score {}", breakdown.total());
    println!(
        "- skills: {:.2} ({}/{} matched)",
        breakdown.skills, breakdown.matched_skills, breakdown.required_skills
    );
    println!("- tier: {:.2}", breakdown.tier);
    println!("- rating: {:.2}", breakdown.rating);
    println!("- volume: {:.2}", breakdown.volume);
    println!("- reputation: {:.2}", breakdown.reputation);
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let events = Arc::new(InMemoryEventLog::default());
    let services = build_services(
        Arc::clone(&events),
        LedgerConfig {
            max_attempts: args.writers.max(1) * 2,
            ..LedgerConfig::default()
        },
        StorageConfig::default(),
    );
    let store = Arc::clone(&services.store);

    println!("Triangular marketplace demo");

    let mentor = store
        .insert_user(User::new(
            UserId::from("usr-demo-mentor"),
            "Priya",
            "priya@example.com",
            UserType::Recruiter,
        ))
        .map_err(triangular::reputation::LedgerError::from)?;
    let student = store
        .insert_user(User::new(
            UserId::from("usr-demo-student"),
            "Arjun",
            "arjun@example.com",
            UserType::Student,
        ))
        .map_err(triangular::reputation::LedgerError::from)?;

    println!("\nReputation ledger");
    for (amount, reason) in [(400, "workshop attendance"), (750, "peer mentoring")] {
        let entry = services.ledger.append(&student.id, amount, reason).await?;
        println!("- +{amount} {reason} -> balance {}", entry.balance_after);
    }

    let mut handles = Vec::new();
    for writer in 0..args.writers {
        let ledger = Arc::clone(&services.ledger);
        let id = student.id.clone();
        handles.push(tokio::spawn(async move {
            ledger.append(&id, 100, &format!("hackathon judge {writer}")).await
        }));
    }
    for handle in handles {
        match handle.await {
            Ok(result) => {
                result?;
            }
            Err(err) => println!("- writer task failed: {err}"),
        }
    }
    let entries = store
        .entries_for(&student.id)
        .map_err(triangular::reputation::LedgerError::from)?;
    let standing = services.ledger.standing(&student.id).await?;
    println!(
        "- {} concurrent writers landed; {} entries, reputation {}, tier {} ({:.1}% to next)",
        args.writers,
        entries.len(),
        standing.reputation,
        standing.tier,
        standing.progress
    );
    let report = services.ledger.reconcile(&student.id).await?;
    println!(
        "- reconcile: ledger sum {} matches stored total",
        report.ledger_sum
    );

    println!("\nEligibility gate");
    let mut gold_only = Opportunity::new(
        OpportunityId::generate(),
        mentor.id.clone(),
        "Gold-tier research assistant",
        Platform::HuseCircle,
    );
    gold_only.min_tier = Tier::Gold;
    let gold_only = services.applications.publish(gold_only).await?;
    let open_role = services
        .applications
        .publish(Opportunity::new(
            OpportunityId::generate(),
            mentor.id.clone(),
            "Frontend intern",
            Platform::HuseCircle,
        ))
        .await?;

    for opportunity in [&gold_only, &open_role] {
        let view = services
            .applications
            .eligibility(&opportunity.id, &student.id)
            .await?;
        match view.reason {
            None => println!("- {}: eligible", opportunity.title),
            Some(reason) => println!("- {}: blocked ({reason})", opportunity.title),
        }
    }

    let application = services
        .applications
        .apply(
            &open_role.id,
            &student.id,
            ApplicationDraft {
                cover_letter: "Built three React side projects.".to_string(),
                ..Default::default()
            },
        )
        .await?;
    let stats = services.applications.stats(&open_role.id).await?;
    println!(
        "- applied to {} as {}; stats: {} applications, {} shortlisted",
        open_role.title, application.id, stats.applications, stats.shortlisted
    );

    println!("\nQuote matching");
    let mut studio = User::new(
        UserId::from("usr-demo-studio"),
        "Pixel Forge",
        "studio@example.com",
        UserType::Contributor,
    );
    studio.tier = Tier::Gold;
    studio.reputation = 50_000;
    studio.quotify.is_provider = true;
    studio.quotify.provider = ProviderProfile {
        services: vec!["react developer".to_string(), "python".to_string()],
        rating: 4.0,
        total_reviews: 12,
        completed_projects: 5,
    };
    let studio = store
        .insert_user(studio)
        .map_err(triangular::reputation::LedgerError::from)?;

    let request = services
        .quotes
        .open_request(
            &mentor.id,
            QuoteRequestDraft {
                title: "Cohort dashboard".to_string(),
                category: "Web Development".to_string(),
                requirements: QuoteRequirements {
                    skills: vec!["React".to_string(), "Node".to_string()],
                    experience: None,
                    min_tier: Some(Tier::Bronze),
                },
                budget: Default::default(),
                deadline: Some(Utc::now() + chrono::Duration::days(14)),
            },
        )
        .await?;
    let quote = services
        .quotes
        .submit_quote(
            &request.id,
            &studio.id,
            QuoteDraft {
                title: "Two-week build".to_string(),
                description: "React front end on the existing API".to_string(),
                pricing: Pricing {
                    amount: 85_000.0,
                    currency: "INR".to_string(),
                    kind: PricingKind::Fixed,
                },
            },
        )
        .await?;
    println!("- {} quoted {}", studio.name, quote.id);
    print_breakdown(&services.quotes.breakdown(&quote.id).await?);

    println!("\nDomain events recorded: {}", events.names().join(", "));
    Ok(())
}
