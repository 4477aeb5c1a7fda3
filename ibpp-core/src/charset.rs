//! Charsets of the text columns
//!
//! The connection charset (`lc_ctype`) decides how the bytes of the
//! text slots are decoded and encoded.
//!
//! [Reference](http://www.destructor.de/firebird/charsets.htm)

use encoding::{all, types::EncodingRef, DecoderTrap, EncoderTrap};
use std::{borrow::Cow, fmt, str::FromStr};

use crate::FbError;

/// A firebird charset, with the `encoding` codec for it. UTF-8 goes
/// through the std string functions
#[derive(Clone, Copy)]
pub struct Charset {
    name: &'static str,
    codec: Option<EncodingRef>,
}

impl Charset {
    /// Name of the charset on the server
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Text of a column
    pub fn decode<'a, B>(&self, bytes: B) -> Result<String, FbError>
    where
        B: Into<Cow<'a, [u8]>>,
    {
        let bytes = bytes.into();

        match self.codec {
            Some(codec) => codec.decode(&bytes, DecoderTrap::Strict).map_err(|e| {
                FbError::logic(
                    "Charset::Decode",
                    format!("Invalid {} text in a column: {}", self.name, e),
                )
            }),
            None => String::from_utf8(bytes.into_owned())
                .map_err(|e| FbError::logic("Charset::Decode", e.to_string())),
        }
    }

    /// Bytes of a parameter
    pub fn encode<'a, S>(&self, s: S) -> Result<Cow<'a, [u8]>, FbError>
    where
        S: Into<Cow<'a, str>>,
    {
        let s = s.into();

        let codec = match self.codec {
            Some(codec) => codec,
            None => {
                return Ok(match s {
                    Cow::Owned(s) => Cow::Owned(s.into_bytes()),
                    Cow::Borrowed(s) => Cow::Borrowed(s.as_bytes()),
                })
            }
        };

        codec
            .encode(&s, EncoderTrap::Strict)
            .map(Cow::Owned)
            .map_err(|e| {
                FbError::logic(
                    "Charset::Encode",
                    format!("Text not representable in {}: {}", self.name, e),
                )
            })
    }

    /// Charset for a `lc_ctype` name. Names without a codec, like `NONE`
    /// or `OCTETS`, are handled as UTF-8
    pub fn from_firebird_name(name: &str) -> Charset {
        name.parse().unwrap_or_else(|_| {
            log::debug!("No codec for the charset {}, using UTF8", name);
            UTF_8
        })
    }
}

/// Declares the known charsets: constant, server name, codec, then the
/// extra spellings accepted when parsing
macro_rules! charsets {
    ( $( $(#[$doc: meta])* $konst: ident => $name: literal, $codec: expr $(, $alias: literal )* ; )+ ) => {
        $(
            $(#[$doc])*
            pub const $konst: Charset = Charset {
                name: $name,
                codec: $codec,
            };
        )+

        /// Finds a charset by a spelling already lowercased and stripped
        /// of `_` and `-`
        fn lookup(key: &str) -> Option<Charset> {
            $(
                if key == normalize($name) $( || key == $alias )* {
                    return Some($konst);
                }
            )+
            None
        }
    };
}

charsets! {
    /// The default
    UTF_8 => "UTF8", None;
    /// Latin 1
    ISO_8859_1 => "ISO8859_1", Some(all::ISO_8859_1);
    ISO_8859_2 => "ISO8859_2", Some(all::ISO_8859_2);
    ISO_8859_3 => "ISO8859_3", Some(all::ISO_8859_3);
    ISO_8859_4 => "ISO8859_4", Some(all::ISO_8859_4);
    ISO_8859_5 => "ISO8859_5", Some(all::ISO_8859_5);
    ISO_8859_6 => "ISO8859_6", Some(all::ISO_8859_6);
    ISO_8859_7 => "ISO8859_7", Some(all::ISO_8859_7);
    ISO_8859_13 => "ISO8859_13", Some(all::ISO_8859_13);
    WIN_1250 => "WIN1250", Some(all::WINDOWS_1250);
    WIN_1251 => "WIN1251", Some(all::WINDOWS_1251);
    /// Western europe, the usual dialect 1 charset
    WIN_1252 => "WIN1252", Some(all::WINDOWS_1252);
    WIN_1253 => "WIN1253", Some(all::WINDOWS_1253);
    WIN_1254 => "WIN1254", Some(all::WINDOWS_1254);
    WIN_1256 => "WIN1256", Some(all::WINDOWS_1256);
    WIN_1257 => "WIN1257", Some(all::WINDOWS_1257);
    WIN_1258 => "WIN1258", Some(all::WINDOWS_1258);
    ASCII => "ASCII", Some(all::ASCII);
    KOI8_R => "KOI8R", Some(all::KOI8_R);
    KOI8_U => "KOI8U", Some(all::KOI8_U);
    EUC_JP => "EUCJ_0208", Some(all::EUC_JP), "eucjp";
    BIG5_2003 => "BIG_5", Some(all::BIG5_2003), "big52003";
}

fn normalize(name: &str) -> String {
    name.trim().to_lowercase().replace(['_', '-'], "")
}

impl Default for Charset {
    fn default() -> Self {
        UTF_8
    }
}

impl FromStr for Charset {
    type Err = FbError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        lookup(&normalize(s)).ok_or_else(|| {
            FbError::logic(
                "Charset::FromStr",
                format!("'{}' doesn't represent any charset", s),
            )
        })
    }
}

impl fmt::Debug for Charset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Charset").field(&self.name).finish()
    }
}

impl PartialEq for Charset {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn names() {
        assert_eq!(WIN_1252, "WIN1252".parse::<Charset>().unwrap());
        assert_eq!(ISO_8859_1, "iso8859_1".parse::<Charset>().unwrap());
        assert_eq!(EUC_JP, Charset::from_firebird_name("EUCJ_0208"));
        assert_eq!(BIG5_2003, Charset::from_firebird_name("big5-2003"));
        assert!("KLINGON".parse::<Charset>().is_err());

        assert_eq!(UTF_8, Charset::from_firebird_name("NONE"));
        assert_eq!(UTF_8, Charset::from_firebird_name("OCTETS"));
        assert_eq!("WIN1252", Charset::from_firebird_name("win1252").name());
    }

    #[test]
    fn round_trip() -> Result<(), FbError> {
        let text = "P\u{e3}o de a\u{e7}\u{fa}car";

        let bytes = ISO_8859_1.encode(text)?;
        assert_eq!(text.chars().count(), bytes.len());
        assert_eq!(text, ISO_8859_1.decode(bytes.into_owned())?);

        let bytes = UTF_8.encode(text)?;
        assert_eq!(text, UTF_8.decode(bytes.into_owned())?);

        assert!(UTF_8.decode(vec![0xff, 0xfe]).unwrap_err().is_logic());
        assert!(ASCII.encode("\u{e3}").is_err());

        Ok(())
    }
}
