pub mod detector;
pub mod election;
pub mod message;
pub mod order;
pub mod peers;
pub mod processor;
pub mod sink;

pub use detector::*;
pub use election::*;
pub use message::*;
pub use order::*;
pub use peers::*;
pub use processor::*;
pub use sink::*;
