pub mod array;
pub mod buffer;
pub mod cell;
pub mod feed;
pub mod mac;
pub mod ram;
pub mod word;

pub use array::SystolicArray;
pub use buffer::{BufferArena, BufferId, HandshakeBuffer};
pub use cell::{Cell, Edge};
pub use feed::SourceFeed;
pub use mac::MultiplyAccumulate;
pub use ram::ConstantStore;
pub use word::{Scalar, Word};
