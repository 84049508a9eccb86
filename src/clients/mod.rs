pub mod igdb;
pub use igdb::IgdbClient;
