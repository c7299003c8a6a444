pub(crate) mod health;
pub(crate) mod search;
pub(crate) mod subscriptions;
pub(crate) mod watches;
