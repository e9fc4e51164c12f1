//! Owned, length-bounded symbol sequences.
//!
//! One buffer type serves both input framing (a whole training or test
//! stream) and the small rolling-context scratch the predictor shortens
//! symbol by symbol while backing off.

use std::io::{ErrorKind, Read};

use byteorder::{LittleEndian, ReadBytesExt};

use mp_common::Symbol;

/// A heap-allocated sequence of 16-bit symbols with fixed capacity.
pub struct SymbolBuffer {
    data: Vec<Symbol>,
    len: usize,
}

impl SymbolBuffer {
    /// Allocate a zeroed buffer of the given capacity, length 0.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: vec![0; capacity],
            len: 0,
        }
    }

    /// Build a buffer exactly holding `symbols`.
    pub fn from_slice(symbols: &[Symbol]) -> Self {
        Self {
            data: symbols.to_vec(),
            len: symbols.len(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Symbol at `offset`; panics past the current length.
    pub fn get(&self, offset: usize) -> Symbol {
        assert!(offset < self.len, "offset {offset} past length {}", self.len);
        self.data[offset]
    }

    /// Store a symbol at `offset` (within capacity); does not adjust length.
    pub fn put(&mut self, offset: usize, symbol: Symbol) {
        self.data[offset] = symbol;
    }

    /// Set the logical length, e.g. after a batch of `put`s.
    pub fn set_len(&mut self, len: usize) {
        assert!(len <= self.capacity(), "length {len} past capacity");
        self.len = len;
    }

    pub fn as_slice(&self) -> &[Symbol] {
        &self.data[..self.len]
    }

    /// Copy `n` symbols from `src` starting at `offset` into this buffer's
    /// prefix and set this buffer's length to `n`.
    ///
    /// Panics if the source range or `n` exceeds the respective capacity.
    pub fn copy_slice(&mut self, src: &SymbolBuffer, offset: usize, n: usize) {
        assert!(offset + n <= src.capacity(), "source range out of bounds");
        assert!(n <= self.capacity(), "destination too small");
        self.data[..n].copy_from_slice(&src.data[offset..offset + n]);
        self.len = n;
    }

    /// Drop the first symbol, preserving the order of the rest.
    pub fn shift_left(&mut self) {
        if self.len == 0 {
            return;
        }
        self.data.copy_within(1..self.len, 0);
        self.len -= 1;
    }

    /// Fill from a little-endian 16-bit stream, up to capacity.
    ///
    /// Reads until EOF or the buffer is full; a trailing odd byte is
    /// discarded. Sets the length to the number of symbols read and returns
    /// it.
    pub fn read_from_stream<R: Read>(&mut self, reader: &mut R) -> std::io::Result<usize> {
        let mut count = 0;
        while count < self.capacity() {
            match reader.read_i16::<LittleEndian>() {
                Ok(symbol) => {
                    self.data[count] = symbol;
                    count += 1;
                }
                Err(e) if e.kind() == ErrorKind::UnexpectedEof => break,
                Err(e) => return Err(e),
            }
        }
        self.len = count;
        Ok(count)
    }

    /// Space-separated hex rendering for diagnostics.
    pub fn format_hex(&self) -> String {
        let mut out = String::with_capacity(self.len * 5);
        for (i, &symbol) in self.as_slice().iter().enumerate() {
            if i > 0 {
                out.push(' ');
            }
            out.push_str(&format!("{:04x}", symbol as u16));
        }
        out
    }
}

impl std::fmt::Debug for SymbolBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "SymbolBuffer[{}]", self.format_hex())
    }
}
