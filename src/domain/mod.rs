pub mod event;
pub mod member;
pub mod payment;
pub mod user;

pub use event::*;
pub use member::*;
pub use payment::*;
pub use user::*;
