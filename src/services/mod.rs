pub mod catalog;
pub use catalog::{Catalog, MirrorCatalog};

pub mod matcher;
pub use matcher::MatchService;

pub mod metadata;
pub use metadata::{MetadataRequest, MetadataService};
