use byteorder::{BigEndian, ByteOrder, LittleEndian};
use matiq_types::{ConvertError, ConvertResult};

pub fn read_u16_local(
    buf: &[u8],
    off: &mut usize,
    is_le: bool,
) -> u16 {
    let b = &buf[*off..*off + 2];
    *off += 2;
    if is_le {
        LittleEndian::read_u16(b)
    } else {
        BigEndian::read_u16(b)
    }
}

pub fn read_u32_local(
    buf: &[u8],
    off: &mut usize,
    is_le: bool,
) -> u32 {
    let b = &buf[*off..*off + 4];
    *off += 4;
    if is_le {
        LittleEndian::read_u32(b)
    } else {
        BigEndian::read_u32(b)
    }
}

pub fn read_u64_local(
    buf: &[u8],
    off: &mut usize,
    is_le: bool,
) -> u64 {
    let b = &buf[*off..*off + 8];
    *off += 8;
    if is_le {
        LittleEndian::read_u64(b)
    } else {
        BigEndian::read_u64(b)
    }
}

/// Курсор по срезу байт с проверкой границ и заданным порядком байт.
#[derive(Debug, Clone)]
pub struct ByteReader<'a> {
    buf: &'a [u8],
    off: usize,
    is_le: bool,
}

impl<'a> ByteReader<'a> {
    pub fn new(
        buf: &'a [u8],
        is_le: bool,
    ) -> Self {
        Self { buf, off: 0, is_le }
    }

    pub fn position(&self) -> usize {
        self.off
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.off
    }

    pub fn is_at_end(&self) -> bool {
        self.off >= self.buf.len()
    }

    fn ensure(
        &self,
        n: usize,
    ) -> ConvertResult<()> {
        if self.remaining() < n {
            return Err(ConvertError::parse(format!(
                "Unexpected end of data at offset {}: need {n} bytes, {} left",
                self.off,
                self.remaining()
            )));
        }
        Ok(())
    }

    pub fn read_u32(&mut self) -> ConvertResult<u32> {
        self.ensure(4)?;
        Ok(read_u32_local(self.buf, &mut self.off, self.is_le))
    }

    /// Возвращает следующие `n` байт без копирования.
    pub fn read_bytes(
        &mut self,
        n: usize,
    ) -> ConvertResult<&'a [u8]> {
        self.ensure(n)?;
        let out = &self.buf[self.off..self.off + n];
        self.off += n;
        Ok(out)
    }

    /// Пропускает до `n` байт (не дальше конца буфера).
    pub fn skip_lenient(
        &mut self,
        n: usize,
    ) {
        self.off += n.min(self.remaining());
    }
}
