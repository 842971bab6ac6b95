pub mod pool;
pub mod submitter;
