pub mod engine;
pub mod run;
pub mod session;
pub mod shared;

pub mod prelude {
    pub use crate::engine::prelude::*;
    pub use crate::run::prelude::*;
    pub use crate::session::prelude::*;
    pub use crate::shared::prelude::*;
}
