use std::rc::Rc;

use crate::encoder::Encoder;
use crate::integer;
use crate::octets::OctetWriter;
use crate::qname::{NamespaceDecl, QName};
use crate::vocabulary::StringTable;
use crate::{Error, Result};

pub(super) const ELEMENT_LITERAL: u8 = 0x3C;
pub(super) const ATTRIBUTE_LITERAL: u8 = 0x78;
pub(super) const NAMESPACE_ATTRIBUTE: u8 = 0xCC;
pub(super) const PREFIX_FLAG: u8 = 0x02;
pub(super) const NAME_FLAG: u8 = 0x01;
const IDENTIFYING_INDEX: u8 = 0x80;

/// Schreibt einen identifizierenden String: Index falls bekannt, sonst
/// Literal (Länge ab Bit 2) und Aufnahme in die Tabelle.
pub(super) fn write_identifying(out: &mut OctetWriter, table: &mut StringTable, value: &str) -> Result<()> {
    if let Some(index) = table.lookup(value) {
        return integer::encode_index_2nd(out, IDENTIFYING_INDEX, index);
    }
    if value.is_empty() {
        return Err(Error::InvalidName(format!("empty {} literal", table.name()).into()));
    }
    integer::encode_length_2nd(out, 0x00, value.len())?;
    out.write_all(value.as_bytes());
    table.add(Rc::from(value));
    Ok(())
}

fn check_name(name: &QName) -> Result<()> {
    if name.local_name.is_empty() {
        return Err(Error::InvalidName("empty local name".into()));
    }
    if name.prefix.is_some() && name.uri.is_empty() {
        return Err(Error::InvalidName(format!("prefix on '{name}' without namespace").into()));
    }
    Ok(())
}

impl Encoder {
    /// Element name on the 3rd bit of a fresh octet.
    pub(super) fn write_element_name(&mut self, name: &QName) -> Result<()> {
        if let Some(index) = self.vocabulary.element_names.find(name) {
            return integer::encode_index_3rd(&mut self.out, 0x00, index);
        }
        self.write_literal_name(ELEMENT_LITERAL, name)?;
        self.vocabulary.element_names.add(Rc::new(name.clone()));
        Ok(())
    }

    /// Attribute name on the 2nd bit of a fresh octet.
    pub(super) fn write_attribute_name(&mut self, name: &QName) -> Result<()> {
        if name.is_xmlns() {
            return Err(Error::InvalidName(
                format!("'{name}' must be passed as a namespace declaration").into(),
            ));
        }
        if let Some(index) = self.vocabulary.attribute_names.find(name) {
            return integer::encode_index_2nd(&mut self.out, 0x00, index);
        }
        self.write_literal_name(ATTRIBUTE_LITERAL, name)?;
        self.vocabulary.attribute_names.add(Rc::new(name.clone()));
        Ok(())
    }

    fn write_literal_name(&mut self, leading: u8, name: &QName) -> Result<()> {
        check_name(name)?;
        let mut b = leading;
        if name.prefix.is_some() {
            b |= PREFIX_FLAG;
        }
        if !name.uri.is_empty() {
            b |= NAME_FLAG;
        }
        self.out.write(b);
        if let Some(prefix) = &name.prefix {
            write_identifying(&mut self.out, &mut self.vocabulary.prefixes, prefix)?;
        }
        if !name.uri.is_empty() {
            write_identifying(&mut self.out, &mut self.vocabulary.namespace_names, &name.uri)?;
        }
        write_identifying(&mut self.out, &mut self.vocabulary.local_names, &name.local_name)
    }

    /// One namespace attribute (`0xCC | flags`, prefix, namespace name).
    pub(super) fn write_namespace_attribute(&mut self, decl: &NamespaceDecl) -> Result<()> {
        let mut b = NAMESPACE_ATTRIBUTE;
        if !decl.prefix.is_empty() {
            b |= PREFIX_FLAG;
        }
        if !decl.uri.is_empty() {
            b |= NAME_FLAG;
        }
        self.out.write(b);
        if !decl.prefix.is_empty() {
            write_identifying(&mut self.out, &mut self.vocabulary.prefixes, &decl.prefix)?;
        }
        if !decl.uri.is_empty() {
            write_identifying(&mut self.out, &mut self.vocabulary.namespace_names, &decl.uri)?;
        }
        Ok(())
    }
}
