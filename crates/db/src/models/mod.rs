pub mod care_plan;
pub mod feed_post;
pub mod resident;
pub mod user;
