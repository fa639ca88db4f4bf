// Deploy passes and their dry run
pub mod deploy;

// Read-only API access
pub mod api;
