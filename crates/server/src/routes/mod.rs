pub mod auth;
pub mod care_plan;
pub mod feed;
pub mod residents;
pub mod staff;
