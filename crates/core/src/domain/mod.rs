pub mod history;
pub mod item;
pub mod report;
pub mod user;
