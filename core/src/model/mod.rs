mod asset;
mod id_types;
mod lookup;
mod tracking;
pub use asset::*;
pub use id_types::*;
pub use lookup::*;
pub use tracking::*;
