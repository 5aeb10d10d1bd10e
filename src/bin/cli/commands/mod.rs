pub mod add;
pub mod jobs;
pub mod list;
pub mod run;
