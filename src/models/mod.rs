pub mod action;
pub mod analysis;
pub mod behavior;
pub mod context;
pub mod crm;
pub mod entities;
pub mod prediction;
pub mod profile;
pub mod response;
pub mod settings;

pub use action::*;
pub use analysis::*;
pub use behavior::*;
pub use context::*;
pub use crm::*;
pub use entities::*;
pub use prediction::*;
pub use profile::*;
pub use response::*;
pub use settings::*;
