pub mod scheduler_tests;
pub mod filter_tests;
pub mod manifest_tests;
pub mod loader_tests;
