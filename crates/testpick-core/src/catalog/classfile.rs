//! Minimal JVM class-file header reader.
//!
//! Only the part of the format needed for catalog construction is decoded:
//! the constant pool (to resolve names), the access flags, `this_class`,
//! `super_class` and the implemented interfaces. Fields, methods and
//! attributes are never read.

const MAGIC: u32 = 0xCAFE_BABE;

pub const ACC_INTERFACE: u16 = 0x0200;
pub const ACC_ABSTRACT: u16 = 0x0400;
pub const ACC_SYNTHETIC: u16 = 0x1000;
pub const ACC_MODULE: u16 = 0x8000;

/// Header information of one compiled class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassHeader {
    pub access_flags: u16,
    /// Internal name, e.g. `basic/project/ChildTest`.
    pub this_class: String,
    /// Internal name of the declared supertype; `None` only for `java/lang/Object`
    /// and module descriptors.
    pub super_class: Option<String>,
    /// Internal names of directly implemented (or, for interfaces, extended) interfaces.
    pub interfaces: Vec<String>,
}

impl ClassHeader {
    pub fn is_abstract(&self) -> bool {
        self.access_flags & (ACC_ABSTRACT | ACC_INTERFACE) != 0
    }

    pub fn is_interface(&self) -> bool {
        self.access_flags & ACC_INTERFACE != 0
    }

    pub fn is_synthetic(&self) -> bool {
        self.access_flags & ACC_SYNTHETIC != 0
    }

    pub fn is_module(&self) -> bool {
        self.access_flags & ACC_MODULE != 0
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClassFileError {
    #[error("truncated class file at byte {offset}")]
    Truncated { offset: usize },

    #[error("bad magic 0x{0:08X}")]
    BadMagic(u32),

    #[error("unknown constant pool tag {tag} at index {index}")]
    UnknownConstantTag { tag: u8, index: u16 },

    #[error("constant pool index {0} does not name a class")]
    BadConstantIndex(u16),

    #[error("8-byte constant at index {0} runs past the end of the constant pool")]
    WideConstantOverflow(u16),
}

#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Class { name_index: u16 },
    Other,
    /// Second slot of a long or double.
    Unusable,
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], ClassFileError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(ClassFileError::Truncated { offset: self.pos })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ClassFileError> {
        Ok(self.take(1)?[0])
    }

    fn u16(&mut self) -> Result<u16, ClassFileError> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    fn u32(&mut self) -> Result<u32, ClassFileError> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn skip(&mut self, n: usize) -> Result<(), ClassFileError> {
        self.take(n).map(|_| ())
    }
}

/// Decode the header of a class file.
pub fn parse_header(bytes: &[u8]) -> Result<ClassHeader, ClassFileError> {
    let mut reader = Reader::new(bytes);

    let magic = reader.u32()?;
    if magic != MAGIC {
        return Err(ClassFileError::BadMagic(magic));
    }
    reader.skip(4)?; // minor + major version

    let pool_count = reader.u16()?;
    let pool = read_constant_pool(&mut reader, pool_count)?;

    let access_flags = reader.u16()?;
    let this_index = reader.u16()?;
    let super_index = reader.u16()?;

    let this_class = class_name(&pool, this_index)?;
    let super_class = if super_index == 0 {
        None
    } else {
        Some(class_name(&pool, super_index)?)
    };

    let interface_count = reader.u16()?;
    let interfaces = (0..interface_count)
        .map(|_| reader.u16().and_then(|index| class_name(&pool, index)))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ClassHeader {
        access_flags,
        this_class,
        super_class,
        interfaces,
    })
}

fn read_constant_pool(reader: &mut Reader<'_>, count: u16) -> Result<Vec<Constant>, ClassFileError> {
    // Index 0 is unused; entries run from 1 to count - 1.
    let count = usize::from(count);
    let mut pool = Vec::with_capacity(count);
    pool.push(Constant::Unusable);

    let mut index = 1usize;
    while index < count {
        // index < count <= u16::MAX
        let slot = index as u16;
        let tag = reader.u8()?;
        let constant = match tag {
            1 => {
                let len = reader.u16()? as usize;
                let raw = reader.take(len)?;
                Constant::Utf8(String::from_utf8_lossy(raw).into_owned())
            }
            7 => Constant::Class {
                name_index: reader.u16()?,
            },
            3 | 4 => {
                reader.skip(4)?;
                Constant::Other
            }
            5 | 6 => {
                if index + 1 >= count {
                    return Err(ClassFileError::WideConstantOverflow(slot));
                }
                reader.skip(8)?;
                pool.push(Constant::Other);
                index += 1;
                Constant::Unusable
            }
            8 | 16 | 19 | 20 => {
                reader.skip(2)?;
                Constant::Other
            }
            9 | 10 | 11 | 12 | 17 | 18 => {
                reader.skip(4)?;
                Constant::Other
            }
            15 => {
                reader.skip(3)?;
                Constant::Other
            }
            other => return Err(ClassFileError::UnknownConstantTag { tag: other, index: slot }),
        };
        pool.push(constant);
        index += 1;
    }
    Ok(pool)
}

fn class_name(pool: &[Constant], index: u16) -> Result<String, ClassFileError> {
    let name_index = match pool.get(index as usize) {
        Some(Constant::Class { name_index }) => *name_index,
        _ => return Err(ClassFileError::BadConstantIndex(index)),
    };
    match pool.get(name_index as usize) {
        Some(Constant::Utf8(name)) => Ok(name.clone()),
        _ => Err(ClassFileError::BadConstantIndex(name_index)),
    }
}

/// Encode a minimal class file with the given header. Used by tests and
/// fixtures to stand in for compiler output.
pub fn encode_header(this_class: &str, super_class: Option<&str>, access_flags: u16) -> Vec<u8> {
    encode_class(this_class, super_class, &[], access_flags)
}

/// Like [`encode_header`], with an interfaces table.
pub fn encode_class(
    this_class: &str,
    super_class: Option<&str>,
    interfaces: &[&str],
    access_flags: u16,
) -> Vec<u8> {
    let mut pool = Vec::new();
    let mut next: u16 = 1;

    // A Long right after `this_class` keeps the two-slot path exercised.
    let this_index = push_class(&mut pool, &mut next, this_class);
    pool.push(5);
    pool.extend_from_slice(&0u64.to_be_bytes());
    next += 2;
    let super_index = super_class
        .map(|name| push_class(&mut pool, &mut next, name))
        .unwrap_or(0);
    let interface_indices: Vec<u16> = interfaces
        .iter()
        .map(|name| push_class(&mut pool, &mut next, name))
        .collect();

    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC.to_be_bytes());
    out.extend_from_slice(&0u16.to_be_bytes());
    out.extend_from_slice(&52u16.to_be_bytes());
    out.extend_from_slice(&next.to_be_bytes());
    out.extend_from_slice(&pool);

    out.extend_from_slice(&access_flags.to_be_bytes());
    out.extend_from_slice(&this_index.to_be_bytes());
    out.extend_from_slice(&super_index.to_be_bytes());
    out.extend_from_slice(&(interface_indices.len() as u16).to_be_bytes());
    for index in interface_indices {
        out.extend_from_slice(&index.to_be_bytes());
    }

    // fields, methods, attributes
    out.extend_from_slice(&[0, 0, 0, 0, 0, 0]);
    out
}

/// Append a Utf8 + Class pair and return the Class index.
fn push_class(pool: &mut Vec<u8>, next: &mut u16, name: &str) -> u16 {
    push_utf8(pool, name);
    pool.push(7);
    pool.extend_from_slice(&next.to_be_bytes());
    let class_index = *next + 1;
    *next += 2;
    class_index
}

fn push_utf8(out: &mut Vec<u8>, s: &str) {
    out.push(1);
    out.extend_from_slice(&(s.len() as u16).to_be_bytes());
    out.extend_from_slice(s.as_bytes());
}
