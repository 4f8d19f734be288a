pub mod assignment;
pub mod course;
pub mod filter;
pub mod group;
pub mod ids;
pub mod submission;
pub mod user;
