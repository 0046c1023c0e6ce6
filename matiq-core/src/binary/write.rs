use byteorder::{BigEndian, ByteOrder, LittleEndian, WriteBytesExt};

pub fn write_u16_local(
    buf: &mut [u8],
    off: &mut usize,
    is_le: bool,
    val: u16,
) {
    if is_le {
        LittleEndian::write_u16(&mut buf[*off..*off + 2], val);
    } else {
        BigEndian::write_u16(&mut buf[*off..*off + 2], val);
    }
    *off += 2;
}

pub fn write_u64_local(
    buf: &mut [u8],
    off: &mut usize,
    is_le: bool,
    val: u64,
) {
    if is_le {
        LittleEndian::write_u64(&mut buf[*off..*off + 8], val);
    } else {
        BigEndian::write_u64(&mut buf[*off..*off + 8], val);
    }
    *off += 8;
}

/// Дописывает u32 в конец буфера.
pub fn push_u32(
    buf: &mut Vec<u8>,
    is_le: bool,
    val: u32,
) {
    // Запись в Vec<u8> не может завершиться ошибкой
    let _ = if is_le {
        buf.write_u32::<LittleEndian>(val)
    } else {
        buf.write_u32::<BigEndian>(val)
    };
}

pub fn push_i32(
    buf: &mut Vec<u8>,
    is_le: bool,
    val: i32,
) {
    let _ = if is_le {
        buf.write_i32::<LittleEndian>(val)
    } else {
        buf.write_i32::<BigEndian>(val)
    };
}

pub fn push_u16(
    buf: &mut Vec<u8>,
    is_le: bool,
    val: u16,
) {
    let _ = if is_le {
        buf.write_u16::<LittleEndian>(val)
    } else {
        buf.write_u16::<BigEndian>(val)
    };
}

pub fn push_f64(
    buf: &mut Vec<u8>,
    is_le: bool,
    val: f64,
) {
    let _ = if is_le {
        buf.write_f64::<LittleEndian>(val)
    } else {
        buf.write_f64::<BigEndian>(val)
    };
}
