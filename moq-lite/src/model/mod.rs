mod broadcast;
mod delivery;
mod expires;
mod frame;
mod group;
mod origin;
mod produce;
mod state;
mod subscriber;
mod time;
mod track;
mod waiter;

pub use broadcast::*;
pub use delivery::*;
pub use expires::*;
pub use frame::*;
pub use group::*;
pub use origin::*;
pub use produce::*;
pub use subscriber::*;
pub use time::*;
pub use track::*;

pub(crate) use state::*;
pub(crate) use waiter::*;
