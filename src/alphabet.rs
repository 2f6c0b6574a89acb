//! Restricted alphabets: character strings packed at `n` bits per character.
//!
//! Ids 0 and 1 are the built-in numeric and date-time alphabets, ids from 16
//! upward index the vocabulary's restricted-alphabet table. `n` is the
//! smallest width with `2^n > alphabet size`; the all-ones code never names
//! a character and pads the final octet.

use crate::bitstream::{BitReader, BitWriter};
use crate::vocabulary::StringTable;
use crate::{Error, Result};

pub const NUMERIC: u8 = 0;
pub const DATE_TIME: u8 = 1;
/// First application-defined id; `id - APPLICATION_START` indexes the table.
pub const APPLICATION_START: u8 = 16;

pub const NUMERIC_CHARACTERS: &str = "0123456789-+.E ";
pub const DATE_TIME_CHARACTERS: &str = "0123456789-:TZ ";

/// Bits per character for an alphabet of `size` characters.
pub fn bits_per_character(size: usize) -> u8 {
    let mut n = 1u8;
    while (1usize << n) <= size {
        n += 1;
    }
    n
}

/// Characters of alphabet `id`.
pub fn resolve(id: u8, table: &StringTable) -> Result<Vec<char>> {
    match id {
        NUMERIC => Ok(NUMERIC_CHARACTERS.chars().collect()),
        DATE_TIME => Ok(DATE_TIME_CHARACTERS.chars().collect()),
        _ if id < APPLICATION_START => Err(Error::UnknownAlphabet(id)),
        _ => table
            .get((id - APPLICATION_START) as usize)
            .map(|a| a.chars().collect())
            .ok_or(Error::UnknownAlphabet(id)),
    }
}

/// Packs `text` using `alphabet`.
pub fn encode(alphabet: &[char], text: &str) -> Result<Vec<u8>> {
    if alphabet.len() < 2 {
        return Err(Error::unsupported("restricted alphabet with fewer than two characters"));
    }
    let n = bits_per_character(alphabet.len());
    let mut w = BitWriter::with_capacity((text.len() * n as usize).div_ceil(8));
    for c in text.chars() {
        let code = alphabet
            .iter()
            .position(|&a| a == c)
            .ok_or(Error::InvalidAlphabetCharacter(c))?;
        w.write_bits(code as u32, n);
    }
    w.pad_with_ones();
    Ok(w.into_vec())
}

/// Unpacks `octets` using `alphabet`.
pub fn decode(alphabet: &[char], octets: &[u8]) -> Result<String> {
    if alphabet.len() < 2 {
        return Err(Error::unsupported("restricted alphabet with fewer than two characters"));
    }
    let n = bits_per_character(alphabet.len());
    let terminator = (1u32 << n) - 1;
    let mut r = BitReader::new(octets);
    let mut out = String::with_capacity(octets.len() * 8 / n as usize);
    while r.remaining_bits() >= n as usize {
        let code = r.read_bits(n)?;
        if code == terminator {
            // Padding: nur im letzten Octet erlaubt
            if r.remaining_bits() >= 8 {
                return Err(Error::invalid_algorithm_data("restricted alphabet padding before final octet"));
            }
            break;
        }
        let c = alphabet.get(code as usize).ok_or_else(|| {
            Error::invalid_algorithm_data(format!("code {code} outside restricted alphabet of {}", alphabet.len()))
        })?;
        out.push(*c);
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numeric() -> Vec<char> {
        NUMERIC_CHARACTERS.chars().collect()
    }

    #[test]
    fn widths() {
        assert_eq!(bits_per_character(2), 2);
        assert_eq!(bits_per_character(3), 2);
        assert_eq!(bits_per_character(15), 4);
        assert_eq!(bits_per_character(16), 5);
    }

    #[test]
    fn numeric_packs_two_per_octet() {
        let bytes = encode(&numeric(), "12.5").unwrap();
        assert_eq!(bytes, vec![0x12, 0xC5]);
        assert_eq!(decode(&numeric(), &bytes).unwrap(), "12.5");
    }

    #[test]
    fn odd_length_is_padded_with_ones() {
        let bytes = encode(&numeric(), "-7").unwrap();
        assert_eq!(bytes, vec![0xA7]);
        let bytes = encode(&numeric(), "123").unwrap();
        assert_eq!(bytes, vec![0x12, 0x3F]);
        assert_eq!(decode(&numeric(), &bytes).unwrap(), "123");
    }

    #[test]
    fn date_time_round_trip() {
        let dt: Vec<char> = DATE_TIME_CHARACTERS.chars().collect();
        let text = "2024-05-01T12:30:00Z";
        assert_eq!(decode(&dt, &encode(&dt, text).unwrap()).unwrap(), text);
    }

    #[test]
    fn custom_alphabet_with_five_bits() {
        let alphabet: Vec<char> = "abcdefghijklmnopq".chars().collect();
        let text = "qpabc";
        let bytes = encode(&alphabet, text).unwrap();
        assert_eq!(bytes.len(), 4);
        assert_eq!(decode(&alphabet, &bytes).unwrap(), text);
    }

    #[test]
    fn foreign_character_is_rejected() {
        assert_eq!(encode(&numeric(), "1x"), Err(Error::InvalidAlphabetCharacter('x')));
    }

    #[test]
    fn early_padding_is_rejected() {
        assert!(decode(&numeric(), &[0xF1, 0x23]).is_err());
    }

    #[test]
    fn resolve_ids() {
        let mut table = StringTable::new("restricted alphabet");
        table.add("ab".into());
        assert_eq!(resolve(NUMERIC, &table).unwrap().len(), 15);
        assert_eq!(resolve(16, &table).unwrap(), vec!['a', 'b']);
        assert_eq!(resolve(5, &table), Err(Error::UnknownAlphabet(5)));
        assert_eq!(resolve(17, &table), Err(Error::UnknownAlphabet(17)));
    }
}
