pub mod auth;
pub mod care_plan;
pub mod feed;
pub mod resident;
pub mod staff;
