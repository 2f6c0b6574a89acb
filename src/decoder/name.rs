use std::io::Read;
use std::rc::Rc;

use crate::decoder::Decoder;
use crate::decoder::tables::{self, Child, NAMESPACE_ATTRIBUTE, NAME_FLAG, PREFIX_FLAG};
use crate::integer::{self, Tier};
use crate::octets::OctetReader;
use crate::qname::{NamespaceDecl, QName};
use crate::vocabulary::StringTable;
use crate::{Error, Result};

/// Reads `len` octets of UTF-8.
pub(super) fn read_utf8<R: Read>(r: &mut OctetReader<R>, len: usize) -> Result<Rc<str>> {
    let bytes = r.read_vec(len)?;
    String::from_utf8(bytes)
        .map(Rc::from)
        .map_err(|_| Error::InvalidUtf8 { offset: r.offset() })
}

/// Liest einen identifizierenden String: Literal (wird aufgenommen) oder Index.
pub(super) fn read_identifying<R: Read>(r: &mut OctetReader<R>, table: &mut StringTable) -> Result<Rc<str>> {
    let offset = r.offset();
    let b = r.read()?;
    if b & 0x80 == 0 {
        let tier = integer::length_tier_2nd(b).ok_or(Error::InvalidConstruct {
            octet: b,
            offset,
            context: table.name(),
        })?;
        let len = integer::decode_length_2nd(tier, b, r)?;
        let value = read_utf8(r, len)?;
        table.add(Rc::clone(&value));
        return Ok(value);
    }
    let tier = integer::index_tier_2nd(b).ok_or(Error::InvalidConstruct { octet: b, offset, context: table.name() })?;
    let index = integer::decode_index_2nd(tier, b, r)?;
    table.resolve(index)
}

impl<R: Read> Decoder<R> {
    fn read_literal_name(&mut self, flags: u8, offset: u64) -> Result<Rc<QName>> {
        if flags & (PREFIX_FLAG | NAME_FLAG) == PREFIX_FLAG {
            return Err(Error::InvalidConstruct { octet: flags, offset, context: "name literal with prefix but no namespace" });
        }
        let prefix = if flags & PREFIX_FLAG != 0 {
            Some(read_identifying(&mut self.input, &mut self.vocabulary.prefixes)?)
        } else {
            None
        };
        let uri = if flags & NAME_FLAG != 0 {
            read_identifying(&mut self.input, &mut self.vocabulary.namespace_names)?
        } else {
            Rc::from("")
        };
        let local = read_identifying(&mut self.input, &mut self.vocabulary.local_names)?;
        Ok(Rc::new(QName::from_parts(prefix, uri, local)))
    }

    /// Element name from its (already consumed) octet `b`.
    pub(super) fn read_element_name(&mut self, b: u8, offset: u64) -> Result<Rc<QName>> {
        match tables::CHILD[b as usize] {
            Child::Element(tier) => {
                let index = integer::decode_index_3rd(tier, b, &mut self.input)?;
                self.vocabulary.element_names.resolve(index)
            }
            Child::ElementLiteral => {
                let name = self.read_literal_name(b, offset)?;
                self.vocabulary.element_names.add(Rc::clone(&name));
                Ok(name)
            }
            _ => Err(Error::InvalidConstruct { octet: b, offset, context: "element name" }),
        }
    }

    pub(super) fn read_attribute_index(&mut self, tier: Tier, b: u8) -> Result<Rc<QName>> {
        let index = integer::decode_index_2nd(tier, b, &mut self.input)?;
        self.vocabulary.attribute_names.resolve(index)
    }

    pub(super) fn read_attribute_literal(&mut self, b: u8, offset: u64) -> Result<Rc<QName>> {
        let name = self.read_literal_name(b, offset)?;
        self.vocabulary.attribute_names.add(Rc::clone(&name));
        Ok(name)
    }

    /// Namespace attributes up to and including their `F0`.
    pub(super) fn read_namespace_attributes(&mut self) -> Result<Vec<NamespaceDecl>> {
        let mut decls = Vec::new();
        loop {
            let offset = self.input.offset();
            let b = self.input.read()?;
            if b == tables::TERMINATOR {
                return Ok(decls);
            }
            if b & 0xFC != NAMESPACE_ATTRIBUTE {
                return Err(Error::InvalidConstruct { octet: b, offset, context: "namespace attribute" });
            }
            let prefix = if b & PREFIX_FLAG != 0 {
                read_identifying(&mut self.input, &mut self.vocabulary.prefixes)?
            } else {
                Rc::from("")
            };
            let uri = if b & NAME_FLAG != 0 {
                read_identifying(&mut self.input, &mut self.vocabulary.namespace_names)?
            } else {
                Rc::from("")
            };
            decls.push(NamespaceDecl { prefix, uri });
        }
    }
}
