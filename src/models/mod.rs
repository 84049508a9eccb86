pub mod company;
pub mod external;
pub mod game;
pub mod names;

pub use company::Company;
pub use external::{ExternalGame, ExternalStoreCategory};
pub use game::{DEFAULT_SEARCH_CATEGORIES, Game, GameCategory};
pub use names::{AlternativeName, GameLocalization};
