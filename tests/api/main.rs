mod admin;
mod contact;
mod helpers;
mod subscriptions;
