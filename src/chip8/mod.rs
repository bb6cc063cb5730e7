mod execute;
mod font;
mod machine;
mod opcode;
mod screen;
mod types;

pub use font::*;
pub use machine::*;
pub use opcode::*;
pub use screen::*;
pub use types::*;
