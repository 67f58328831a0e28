//! Remote collaborators of the docquery reconciler.
//!
//! Provides the GraphQL-over-HTTP job API client, the GraphQL-over-WebSocket
//! completion subscription, typed frame parsing for the subscription
//! protocol, and the [`JobApi`] / [`NotificationChannel`] traits the
//! reconciler is written against.

pub mod api;
pub mod client;
pub mod documents;
pub mod events;
pub mod messages;
pub mod processor;
pub mod service;
pub mod subscription;

pub use api::{AnalyticsApi, AnalyticsApiError};
pub use events::ChannelEvent;
pub use service::{JobApi, NotificationChannel};
pub use subscription::{GraphqlNotificationChannel, SubscriptionError, SubscriptionHandle};
