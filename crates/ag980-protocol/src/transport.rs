//! Byte-stream transport abstraction
//!
//! The session layer talks to the receiver through a [`ByteChannel`]. A real
//! serial port and the simulated receiver both implement it.

use std::io;

/// A blocking, bidirectional byte stream with a bounded read timeout
pub trait ByteChannel: Send {
    /// Send raw bytes
    fn write(&mut self, data: &[u8]) -> io::Result<()>;

    /// Read up to `n` bytes, blocking no longer than the channel's timeout
    ///
    /// Returns fewer than `n` bytes (possibly none) if the timeout expires
    /// first. A timeout is not an error.
    fn read(&mut self, n: usize) -> io::Result<Vec<u8>>;

    /// Drop anything received but not yet read
    ///
    /// Called before each status request so a reply that arrived after an
    /// earlier timeout cannot shift the next frame.
    fn discard_input(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: ByteChannel + ?Sized> ByteChannel for Box<T> {
    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        (**self).write(data)
    }

    fn read(&mut self, n: usize) -> io::Result<Vec<u8>> {
        (**self).read(n)
    }

    fn discard_input(&mut self) -> io::Result<()> {
        (**self).discard_input()
    }
}
