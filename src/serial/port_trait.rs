//! Trait abstraction for the request/response link to enable testing

use std::io;

/// Blocking request/response exchange with a single slave
///
/// Implementations write the whole frame and then block until a response
/// arrives or their timeout elapses. A timeout is not an error: whatever was
/// read (possibly nothing) is returned.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// Send `frame` and return the bytes received in reply
    fn send_and_receive(&mut self, frame: &[u8]) -> io::Result<Vec<u8>>;
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send_and_receive(&mut self, frame: &[u8]) -> io::Result<Vec<u8>> {
        (**self).send_and_receive(frame)
    }
}
