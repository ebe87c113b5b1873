pub mod domain;
pub mod repository;

pub use domain::{
    Platforms, ProviderProfile, QuotifyProfile, Subscription, SubscriptionPlan, User, UserType,
};
pub use repository::UserRepository;
