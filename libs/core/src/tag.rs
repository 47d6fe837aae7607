//! A minimal named binary tag tree, the format the compacted mappings are shipped in.
//!
//! Everything is big-endian. A named tag is written as its type byte, a `u16`-length
//! UTF-8 name and its payload. Compounds are terminated by an `End` byte, lists carry
//! their element type and an `i32` length, int arrays just an `i32` length.
use std::io::{self, Write};

use byteorder::{BigEndian, WriteBytesExt};
use indexmap::IndexMap;
use failure::{Error, bail};
use serde_json::Value;

const END_ID: u8 = 0;
const BYTE_ID: u8 = 1;
const INT_ID: u8 = 3;
const STRING_ID: u8 = 8;
const LIST_ID: u8 = 9;
const COMPOUND_ID: u8 = 10;
const INT_ARRAY_ID: u8 = 11;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Tag {
    Byte(i8),
    Int(i32),
    String(String),
    IntArray(Vec<i32>),
    List(Vec<Tag>),
    Compound(CompoundTag),
}
impl Tag {
    #[inline]
    pub fn type_id(&self) -> u8 {
        match *self {
            Tag::Byte(_) => BYTE_ID,
            Tag::Int(_) => INT_ID,
            Tag::String(_) => STRING_ID,
            Tag::IntArray(_) => INT_ARRAY_ID,
            Tag::List(_) => LIST_ID,
            Tag::Compound(_) => COMPOUND_ID,
        }
    }
    #[inline]
    pub fn as_compound(&self) -> Option<&CompoundTag> {
        match *self {
            Tag::Compound(ref compound) => Some(compound),
            _ => None
        }
    }
    #[inline]
    pub fn as_int(&self) -> Option<i32> {
        match *self {
            Tag::Int(value) => Some(value),
            _ => None
        }
    }
    #[inline]
    pub fn as_byte(&self) -> Option<i8> {
        match *self {
            Tag::Byte(value) => Some(value),
            _ => None
        }
    }
    #[inline]
    pub fn as_int_array(&self) -> Option<&[i32]> {
        match *self {
            Tag::IntArray(ref values) => Some(values),
            _ => None
        }
    }
    /// Convert arbitrary json into a tag, for fields that are passed through unchanged.
    ///
    /// Arrays starting with a number become int arrays, `null` becomes the string `"null"`.
    pub fn from_json(value: &Value) -> Result<Tag, Error> {
        Ok(match *value {
            Value::Object(ref object) => {
                let mut compound = CompoundTag::new();
                for (key, value) in object {
                    compound.put(key.clone(), Tag::from_json(value)?);
                }
                Tag::Compound(compound)
            },
            Value::Array(ref elements) => {
                if elements.first().map_or(false, Value::is_number) {
                    let mut values = Vec::with_capacity(elements.len());
                    for element in elements {
                        match element.as_f64() {
                            Some(_) => values.push(json_to_int(element)),
                            None => bail!("Expected only numbers in int array, got {}", element)
                        }
                    }
                    Tag::IntArray(values)
                } else {
                    Tag::List(elements.iter()
                        .map(Tag::from_json)
                        .collect::<Result<Vec<Tag>, Error>>()?)
                }
            },
            Value::Number(_) => Tag::Int(json_to_int(value)),
            Value::String(ref s) => Tag::String(s.clone()),
            Value::Bool(b) => Tag::Byte(if b { 1 } else { 0 }),
            Value::Null => Tag::String("null".into()),
        })
    }
    fn write_payload<W: Write>(&self, out: &mut W) -> io::Result<()> {
        match *self {
            Tag::Byte(value) => out.write_i8(value),
            Tag::Int(value) => out.write_i32::<BigEndian>(value),
            Tag::String(ref s) => write_string(out, s),
            Tag::IntArray(ref values) => {
                write_length(out, values.len())?;
                for &value in values {
                    out.write_i32::<BigEndian>(value)?;
                }
                Ok(())
            },
            Tag::List(ref elements) => {
                let element_type = elements.first().map_or(END_ID, Tag::type_id);
                if let Some(mismatched) = elements.iter().find(|tag| tag.type_id() != element_type) {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!("List of type {} contains a tag of type {}", element_type, mismatched.type_id())
                    ))
                }
                out.write_u8(element_type)?;
                write_length(out, elements.len())?;
                for element in elements {
                    element.write_payload(out)?;
                }
                Ok(())
            },
            Tag::Compound(ref compound) => compound.write_payload(out),
        }
    }
}
fn json_to_int(value: &Value) -> i32 {
    value.as_i64()
        .map(|value| value as i32)
        .or_else(|| value.as_f64().map(|value| value as i32))
        .unwrap_or(0)
}
fn write_length<W: Write>(out: &mut W, length: usize) -> io::Result<()> {
    if length > i32::max_value() as usize {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("Length {} is too large", length)))
    }
    out.write_i32::<BigEndian>(length as i32)
}
fn write_string<W: Write>(out: &mut W, s: &str) -> io::Result<()> {
    if s.len() > u16::max_value() as usize {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, format!("String of {} bytes is too long", s.len())))
    }
    out.write_u16::<BigEndian>(s.len() as u16)?;
    out.write_all(s.as_bytes())
}
impl From<CompoundTag> for Tag {
    #[inline]
    fn from(compound: CompoundTag) -> Tag {
        Tag::Compound(compound)
    }
}

/// Named child tags, kept in insertion order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CompoundTag {
    entries: IndexMap<String, Tag>
}
impl CompoundTag {
    #[inline]
    pub fn new() -> CompoundTag {
        CompoundTag::default()
    }
    #[inline]
    pub fn put<K: Into<String>, T: Into<Tag>>(&mut self, key: K, tag: T) -> Option<Tag> {
        self.entries.insert(key.into(), tag.into())
    }
    #[inline]
    pub fn get(&self, key: &str) -> Option<&Tag> {
        self.entries.get(key)
    }
    #[inline]
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
    pub fn keys(&self) -> impl Iterator<Item=&str> {
        self.entries.keys().map(String::as_str)
    }
    pub fn iter(&self) -> impl Iterator<Item=(&str, &Tag)> {
        self.entries.iter().map(|(key, tag)| (key.as_str(), tag))
    }
    fn write_payload<W: Write>(&self, out: &mut W) -> io::Result<()> {
        for (key, tag) in &self.entries {
            out.write_u8(tag.type_id())?;
            write_string(out, key)?;
            tag.write_payload(out)?;
        }
        out.write_u8(END_ID)
    }
    /// Write this compound as an unnamed root tag.
    pub fn write<W: Write>(&self, out: &mut W) -> io::Result<()> {
        out.write_u8(COMPOUND_ID)?;
        write_string(out, "")?;
        self.write_payload(out)
    }
    pub fn to_bytes(&self) -> io::Result<Vec<u8>> {
        let mut buffer = Vec::with_capacity(256);
        self.write(&mut buffer)?;
        Ok(buffer)
    }
}

macro_rules! impl_tag_from {
    ($($target:ty => $variant:ident),*) => {
        $(impl From<$target> for Tag {
            #[inline]
            fn from(value: $target) -> Tag {
                Tag::$variant(value.into())
            }
        })*
    };
}
impl_tag_from!(i8 => Byte, i32 => Int, String => String, &str => String, Vec<i32> => IntArray, Vec<Tag> => List);

#[cfg(test)]
mod test {
    use super::*;
    use serde_json::json;

    #[test]
    fn write_simple_compound() {
        let mut root = CompoundTag::new();
        root.put("v", Tag::Int(1));
        let bytes = root.to_bytes().unwrap();
        assert_eq!(bytes, vec![
            COMPOUND_ID, 0, 0, // unnamed root
            INT_ID, 0, 1, b'v', 0, 0, 0, 1,
            END_ID
        ]);
    }
    #[test]
    fn write_arrays_and_lists() {
        let mut root = CompoundTag::new();
        root.put("at", vec![1i32, -1]);
        root.put("names", vec![Tag::from("a")]);
        root.put("empty", Vec::<Tag>::new());
        let bytes = root.to_bytes().unwrap();
        let expected: Vec<u8> = vec![
            COMPOUND_ID, 0, 0,
            INT_ARRAY_ID, 0, 2, b'a', b't', 0, 0, 0, 2, 0, 0, 0, 1, 0xFF, 0xFF, 0xFF, 0xFF,
            LIST_ID, 0, 5, b'n', b'a', b'm', b'e', b's', STRING_ID, 0, 0, 0, 1, 0, 1, b'a',
            LIST_ID, 0, 5, b'e', b'm', b'p', b't', b'y', END_ID, 0, 0, 0, 0,
            END_ID
        ];
        assert_eq!(bytes, expected);
    }
    #[test]
    fn mixed_list_is_rejected() {
        let mut root = CompoundTag::new();
        root.put("bad", vec![Tag::Int(1), Tag::from("a")]);
        assert!(root.to_bytes().is_err());
    }
    #[test]
    fn convert_json() {
        let tag = Tag::from_json(&json!({
            "ids": [3, 1, 2],
            "names": ["a", "b"],
            "flag": true,
            "missing": null,
            "count": 5
        })).unwrap();
        let compound = tag.as_compound().unwrap();
        assert_eq!(compound.get("ids").unwrap().as_int_array().unwrap(), &[3, 1, 2]);
        assert_eq!(compound.get("names"), Some(&Tag::List(vec![Tag::from("a"), Tag::from("b")])));
        assert_eq!(compound.get("flag").unwrap().as_byte(), Some(1));
        assert_eq!(compound.get("missing"), Some(&Tag::from("null")));
        assert_eq!(compound.get("count").unwrap().as_int(), Some(5));
        assert!(Tag::from_json(&json!([1, "a"])).is_err());
    }
}
