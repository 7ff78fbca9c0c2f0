pub mod group;
pub mod load;
pub mod state;

pub use group::*;
pub use load::*;
pub use state::*;
