//! FITS header cards: 80-byte records grouped in 2880-byte blocks.

use crate::errors::{MocError, MocResult};
use std::io::{ErrorKind, Read, Write};
use std::str;

pub(crate) const CARD_SIZE: usize = 80;
pub(crate) const FITS_BLOCK_SIZE: usize = 2880;
const MAX_HEADER_BLOCKS: usize = 1000;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Keyword {
    pub name: String,
    pub value: Option<KeywordValue>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum KeywordValue {
    Logical(bool),
    Integer(i64),
    String(String),
}

impl KeywordValue {
    pub fn as_logical(&self) -> Option<bool> {
        match self {
            Self::Logical(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

impl Keyword {
    pub fn end() -> Self {
        Self {
            name: "END".to_string(),
            value: None,
            comment: None,
        }
    }

    pub fn logical<S: Into<String>>(name: S, value: bool) -> Self {
        Self {
            name: name.into(),
            value: Some(KeywordValue::Logical(value)),
            comment: None,
        }
    }

    pub fn integer<S: Into<String>>(name: S, value: i64) -> Self {
        Self {
            name: name.into(),
            value: Some(KeywordValue::Integer(value)),
            comment: None,
        }
    }

    pub fn string<S: Into<String>>(name: S, value: &str) -> Self {
        Self {
            name: name.into(),
            value: Some(KeywordValue::String(value.to_string())),
            comment: None,
        }
    }

    pub fn with_comment<S: Into<String>>(mut self, comment: S) -> Self {
        self.comment = Some(comment.into());
        self
    }
}

/// Ordered keyword list of one HDU, without the `END` card.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Header {
    keywords: Vec<Keyword>,
}

impl Header {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_keyword(&mut self, keyword: Keyword) {
        self.keywords.push(keyword);
    }

    pub fn get_keyword(&self, name: &str) -> Option<&Keyword> {
        self.keywords.iter().find(|k| k.name == name)
    }

    pub fn get_keyword_value(&self, name: &str) -> Option<&KeywordValue> {
        self.get_keyword(name)?.value.as_ref()
    }

    pub fn integer(&self, name: &str) -> MocResult<Option<i64>> {
        match self.get_keyword_value(name) {
            None => Ok(None),
            Some(value) => value
                .as_integer()
                .map(Some)
                .ok_or_else(|| MocError::malformed(format!("{name} is not an integer"))),
        }
    }

    pub fn require_integer(&self, name: &str) -> MocResult<i64> {
        self.integer(name)?
            .ok_or_else(|| MocError::malformed(format!("missing {name} keyword")))
    }

    pub fn logical(&self, name: &str) -> MocResult<Option<bool>> {
        match self.get_keyword_value(name) {
            None => Ok(None),
            Some(value) => value
                .as_logical()
                .map(Some)
                .ok_or_else(|| MocError::malformed(format!("{name} is not a logical"))),
        }
    }

    pub fn string(&self, name: &str) -> Option<&str> {
        self.get_keyword_value(name)?.as_str()
    }

    /// Serializes the cards plus `END`, padded with spaces to a whole block.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(FITS_BLOCK_SIZE);
        for keyword in &self.keywords {
            bytes.extend_from_slice(&format_card(keyword));
        }
        bytes.extend_from_slice(&format_card(&Keyword::end()));
        pad_block(&mut bytes, b' ');
        bytes
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> MocResult<()> {
        writer.write_all(&self.to_bytes())?;
        Ok(())
    }

    /// Reads header blocks up to and including the one holding `END`.
    pub fn read_from<R: Read>(reader: &mut R) -> MocResult<Self> {
        let mut header = Header::new();
        let mut block = [0u8; FITS_BLOCK_SIZE];
        for _ in 0..MAX_HEADER_BLOCKS {
            read_block(reader, &mut block, "header")?;
            for chunk in block.chunks_exact(CARD_SIZE) {
                let mut raw = [0u8; CARD_SIZE];
                raw.copy_from_slice(chunk);
                match parse_card(&raw)? {
                    Card::End => return Ok(header),
                    Card::Blank => {}
                    Card::Keyword(keyword) => header.add_keyword(keyword),
                }
            }
        }
        Err(MocError::malformed("header has no END card"))
    }
}

/// Pads `bytes` to a multiple of [`FITS_BLOCK_SIZE`] with `fill`.
pub(crate) fn pad_block(bytes: &mut Vec<u8>, fill: u8) {
    let padding_needed = FITS_BLOCK_SIZE - (bytes.len() % FITS_BLOCK_SIZE);
    if padding_needed < FITS_BLOCK_SIZE {
        bytes.resize(bytes.len() + padding_needed, fill);
    }
}

/// `read_exact` with end of stream reported as a truncated payload.
fn read_block<R: Read>(reader: &mut R, buf: &mut [u8], what: &str) -> MocResult<()> {
    reader.read_exact(buf).map_err(|e| match e.kind() {
        ErrorKind::UnexpectedEof => MocError::malformed(format!("truncated {what}")),
        _ => MocError::Io(e),
    })
}

fn format_card(keyword: &Keyword) -> [u8; CARD_SIZE] {
    let mut card = [b' '; CARD_SIZE];

    let name_bytes = keyword.name.as_bytes();
    let name_len = name_bytes.len().min(8);
    card[0..name_len].copy_from_slice(&name_bytes[0..name_len]);

    if let Some(value) = &keyword.value {
        card[8] = b'=';
        card[9] = b' ';

        let value_str = match value {
            KeywordValue::Logical(b) => format!("{:>20}", if *b { "T" } else { "F" }),
            KeywordValue::Integer(i) => format!("{:>20}", i),
            KeywordValue::String(s) => {
                let truncated = if s.len() > 18 { &s[..18] } else { s };
                format!("'{:<8}'", truncated)
            }
        };
        let value_bytes = value_str.as_bytes();
        let value_len = value_bytes.len().min(20);
        card[10..10 + value_len].copy_from_slice(&value_bytes[0..value_len]);

        if let Some(comment) = &keyword.comment {
            card[31] = b'/';
            let comment_bytes = comment.as_bytes();
            let comment_len = comment_bytes.len().min(47);
            card[33..33 + comment_len].copy_from_slice(&comment_bytes[0..comment_len]);
        }
    }
    card
}

enum Card {
    End,
    Blank,
    Keyword(Keyword),
}

fn parse_card(raw: &[u8; CARD_SIZE]) -> MocResult<Card> {
    let card_str = str::from_utf8(raw)
        .ok()
        .filter(|s| s.is_ascii())
        .ok_or_else(|| MocError::malformed("non-ASCII header card"))?;

    let name = card_str[0..8].trim_end();
    if name == "END" {
        return Ok(Card::End);
    }
    if name.is_empty() {
        return Ok(Card::Blank);
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
    {
        return Err(MocError::malformed(format!("invalid keyword name '{name}'")));
    }

    let mut keyword = Keyword {
        name: name.to_string(),
        value: None,
        comment: None,
    };
    if &card_str[8..10] != "= " {
        // commentary card
        let text = card_str[8..].trim();
        if !text.is_empty() {
            keyword.comment = Some(text.to_string());
        }
        return Ok(Card::Keyword(keyword));
    }

    let (value_part, comment_part) = split_value_comment(&card_str[10..]);
    keyword.value = Some(parse_value(value_part.trim(), name)?);
    if let Some(comment) = comment_part.map(str::trim).filter(|c| !c.is_empty()) {
        keyword.comment = Some(comment.to_string());
    }
    Ok(Card::Keyword(keyword))
}

/// Splits at the first `/` outside a quoted string.
fn split_value_comment(rest: &str) -> (&str, Option<&str>) {
    let mut in_string = false;
    for (i, c) in rest.char_indices() {
        match c {
            '\'' => in_string = !in_string,
            '/' if !in_string => return (&rest[..i], Some(&rest[i + 1..])),
            _ => {}
        }
    }
    (rest, None)
}

fn parse_value(trimmed: &str, name: &str) -> MocResult<KeywordValue> {
    if trimmed == "T" {
        return Ok(KeywordValue::Logical(true));
    }
    if trimmed == "F" {
        return Ok(KeywordValue::Logical(false));
    }
    if trimmed.starts_with('\'') && trimmed.ends_with('\'') && trimmed.len() >= 2 {
        let content = &trimmed[1..trimmed.len() - 1];
        return Ok(KeywordValue::String(content.trim_end().replace("''", "'")));
    }
    trimmed
        .parse::<i64>()
        .map(KeywordValue::Integer)
        .map_err(|_| MocError::malformed(format!("unsupported value '{trimmed}' for {name}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn card_text(keyword: &Keyword) -> String {
        String::from_utf8(format_card(keyword).to_vec()).unwrap()
    }

    #[test]
    fn test_format_logical_card() {
        let text = card_text(&Keyword::logical("SIMPLE", true));
        assert_eq!(&text[0..30], "SIMPLE  =                    T");
        assert_eq!(text.len(), CARD_SIZE);
    }

    #[test]
    fn test_format_integer_card_with_comment() {
        let text = card_text(&Keyword::integer("ORDER", 12).with_comment("HEALPix order"));
        assert_eq!(&text[0..30], "ORDER   =                   12");
        assert_eq!(&text[31..46], "/ HEALPix order");
    }

    #[test]
    fn test_format_string_card() {
        let text = card_text(&Keyword::string("XTENSION", "BINTABLE"));
        assert_eq!(&text[0..20], "XTENSION= 'BINTABLE'");
    }

    #[test]
    fn test_card_round_trip() {
        for keyword in [
            Keyword::logical("EXTEND", false),
            Keyword::integer("NAXIS2", 123_456_789),
            Keyword::integer("MINORDER", -3),
            Keyword::string("TTYPE1", "NPIX_START"),
            Keyword::string("COORDSYS", "C").with_comment("frame"),
        ] {
            match parse_card(&format_card(&keyword)).unwrap() {
                Card::Keyword(parsed) => assert_eq!(parsed, keyword),
                _ => panic!("expected keyword card"),
            }
        }
    }

    #[test]
    fn test_parse_special_cards() {
        assert!(matches!(parse_card(&format_card(&Keyword::end())).unwrap(), Card::End));
        assert!(matches!(parse_card(&[b' '; CARD_SIZE]).unwrap(), Card::Blank));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let mut raw = [b' '; CARD_SIZE];
        raw[0..6].copy_from_slice(b"ORDER!");
        assert!(matches!(parse_card(&raw), Err(MocError::MalformedBinary(_))));

        let mut raw = [b' '; CARD_SIZE];
        raw[0..15].copy_from_slice(b"ORDER   = 1.5E3");
        assert!(matches!(parse_card(&raw), Err(MocError::MalformedBinary(_))));
    }

    #[test]
    fn test_header_block_round_trip() {
        let mut header = Header::new();
        header.add_keyword(Keyword::logical("SIMPLE", true));
        header.add_keyword(Keyword::integer("BITPIX", 8));
        header.add_keyword(Keyword::string("COORDSYS", "G"));
        let bytes = header.to_bytes();
        assert_eq!(bytes.len(), FITS_BLOCK_SIZE);

        let parsed = Header::read_from(&mut Cursor::new(bytes)).unwrap();
        assert_eq!(parsed, header);
        assert_eq!(parsed.require_integer("BITPIX").unwrap(), 8);
        assert_eq!(parsed.logical("SIMPLE").unwrap(), Some(true));
        assert_eq!(parsed.string("COORDSYS"), Some("G"));
        assert!(parsed.require_integer("NAXIS").is_err());
        assert!(parsed.integer("COORDSYS").is_err());
    }

    #[test]
    fn test_truncated_header() {
        let bytes = vec![b' '; 100];
        assert!(matches!(
            Header::read_from(&mut Cursor::new(bytes)),
            Err(MocError::MalformedBinary(_))
        ));
    }
}
