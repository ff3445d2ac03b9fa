pub mod auth;
pub mod contact;
pub mod content;
pub mod error;
pub mod events;
pub mod families;
pub mod invitations;
pub mod photos;
pub mod posts;
pub mod subscriptions;
pub mod users;
pub mod webhooks;

#[cfg(test)]
pub mod testing;
