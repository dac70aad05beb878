pub mod corp;
pub mod kai;
pub mod message;
pub mod store;
pub mod traits;

pub use corp::CorpState;
pub use kai::KaiState;
pub use store::StateStore;
