//! Deterministic chain generation and index seeding, used by integration
//! tests across the workspace. Not linked into the production binary.

pub mod chain;
pub mod schema;
pub mod seed;

pub use chain::{generate, Accounts, GeneratedChain};
pub use seed::Seeder;
