/// Error types that can occur while loading or running a program.
///
/// The original hardware guarded none of these conditions. Memory and stack
/// violations surface as typed errors here so a host can stop cleanly
/// instead of reading garbage.
#[derive(Debug, thiserror::Error)]
pub enum Chip8Error {
    #[error("ROM is too large ({size} bytes), max size is {max_size} bytes")]
    RomTooLarge { size: usize, max_size: usize },

    #[error("Memory access out of bounds at address {address:#06X}")]
    MemoryOutOfBounds { address: u16 },

    #[error("Stack overflow: subroutine calls nested deeper than 16 levels")]
    StackOverflow,

    #[error("Stack underflow: attempted to return with an empty call stack")]
    StackUnderflow,
}
