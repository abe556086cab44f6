pub mod missing;
pub mod rules;
pub mod webhooks;
