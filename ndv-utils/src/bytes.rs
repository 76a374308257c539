//
// Copyright (c) The Holo Core Contributors
//
// SPDX-License-Identifier: MIT
//

use std::cell::RefCell;

use bytes::{Buf, BufMut, Bytes, BytesMut, TryGetError};

thread_local!(
    pub static TLS_BUF: RefCell<BytesMut> =
        RefCell::new(BytesMut::with_capacity(4096))
);

/// Extension methods for [`Bytes`] used by the name and state-vector codecs.
pub trait BytesExt {
    /// Gets a length-prefixed (`u16` big-endian length) byte blob from
    /// `self`.
    fn try_get_blob(&mut self) -> Result<Bytes, TryGetError>;
}

/// Extension methods for [`BytesMut`] used by the name and state-vector
/// codecs.
pub trait BytesMutExt {
    /// Writes a length-prefixed (`u16` big-endian length) byte blob to
    /// `self`.
    fn put_blob(&mut self, value: &[u8]);
}

impl BytesExt for Bytes {
    fn try_get_blob(&mut self) -> Result<Bytes, TryGetError> {
        let len = self.try_get_u16()? as usize;
        if self.remaining() < len {
            return Err(TryGetError {
                requested: len,
                available: self.remaining(),
            });
        }
        Ok(self.split_to(len))
    }
}

impl BytesMutExt for BytesMut {
    fn put_blob(&mut self, value: &[u8]) {
        self.put_u16(value.len() as u16);
        self.put_slice(value);
    }
}
