pub mod api;
pub mod auth;
pub mod chart;
pub mod compass;
pub mod dashboard;
pub mod localize;
pub mod query;
pub mod recommendations;
pub mod request;
