//! Minimal Solidity ABI encoder for the handful of calls the providers make.

use alloy_primitives::{keccak256, Address, Bytes, U256};

/// A value to be ABI-encoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Address(Address),
    Uint(U256),
    Bytes(Bytes),
    /// Dynamic-length array `T[]`
    Array(Vec<Token>),
    Tuple(Vec<Token>),
}

impl Token {
    pub fn uint(value: u64) -> Self {
        Token::Uint(U256::from(value))
    }

    fn is_dynamic(&self) -> bool {
        match self {
            Token::Bytes(_) | Token::Array(_) => true,
            Token::Tuple(members) => members.iter().any(Token::is_dynamic),
            Token::Address(_) | Token::Uint(_) => false,
        }
    }

    fn head_size(&self) -> usize {
        match self {
            Token::Tuple(members) if !self.is_dynamic() => {
                members.iter().map(Token::head_size).sum()
            }
            _ => 32,
        }
    }

    fn encode_static(&self, out: &mut Vec<u8>) {
        match self {
            Token::Address(address) => {
                out.extend_from_slice(&[0u8; 12]);
                out.extend_from_slice(address.as_slice());
            }
            Token::Uint(value) => out.extend_from_slice(&value.to_be_bytes::<32>()),
            Token::Tuple(members) => members.iter().for_each(|m| m.encode_static(out)),
            Token::Bytes(_) | Token::Array(_) => self.encode_dynamic(out),
        }
    }

    fn encode_dynamic(&self, out: &mut Vec<u8>) {
        match self {
            Token::Bytes(data) => {
                out.extend_from_slice(&encode_word(data.len()));
                out.extend_from_slice(data);
                let padding = (32 - data.len() % 32) % 32;
                out.extend(std::iter::repeat(0u8).take(padding));
            }
            Token::Array(items) => {
                out.extend_from_slice(&encode_word(items.len()));
                encode_sequence(items, out);
            }
            Token::Tuple(members) => encode_sequence(members, out),
            Token::Address(_) | Token::Uint(_) => self.encode_static(out),
        }
    }
}

fn encode_word(value: usize) -> [u8; 32] {
    U256::from(value).to_be_bytes::<32>()
}

/// Head/tail encoding of a token sequence
fn encode_sequence(tokens: &[Token], out: &mut Vec<u8>) {
    let head_size: usize = tokens.iter().map(Token::head_size).sum();
    let mut head = Vec::with_capacity(head_size);
    let mut tail = Vec::new();

    for token in tokens {
        if token.is_dynamic() {
            head.extend_from_slice(&encode_word(head_size + tail.len()));
            token.encode_dynamic(&mut tail);
        } else {
            token.encode_static(&mut head);
        }
    }

    out.extend_from_slice(&head);
    out.extend_from_slice(&tail);
}

/// First four bytes of keccak256 of the canonical signature
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Head/tail encoding of `tokens` as a top-level tuple
pub fn encode(tokens: &[Token]) -> Vec<u8> {
    let mut out = Vec::new();
    encode_sequence(tokens, &mut out);
    out
}

/// Selector followed by the encoded arguments
pub fn encode_call(signature: &str, args: &[Token]) -> Bytes {
    let mut out = selector(signature).to_vec();
    out.extend(encode(args));
    Bytes::from(out)
}

/// Read the first return word as an unsigned integer
pub fn decode_uint(data: &[u8]) -> Option<U256> {
    data.get(..32).map(U256::from_be_slice)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn word(n: u64) -> String {
        format!("{:064x}", n)
    }

    #[test]
    fn test_selector() {
        assert_eq!(hex::encode(selector("transfer(address,uint256)")), "a9059cbb");
        assert_eq!(hex::encode(selector("refundETH()")), "12210e8a");
    }

    #[test]
    fn test_dynamic_head_tail_layout() {
        // sam(bytes,bool,uint256[]) with ("dave", true, [1, 2, 3])
        let call = encode_call(
            "sam(bytes,bool,uint256[])",
            &[
                Token::Bytes(Bytes::from_static(b"dave")),
                Token::uint(1u64),
                Token::Array(vec![Token::uint(1u64), Token::uint(2u64), Token::uint(3u64)]),
            ],
        );

        let expected = [
            "a5643bf2".to_string(),
            word(0x60),
            word(1),
            word(0xa0),
            word(4),
            format!("{:0<64}", hex::encode(b"dave")),
            word(3),
            word(1),
            word(2),
            word(3),
        ]
        .concat();
        assert_eq!(hex::encode(&call), expected);
    }

    #[test]
    fn test_static_tuple_is_inlined() {
        let encoded = encode(&[Token::Tuple(vec![
            Token::Address(Address::repeat_byte(0x11)),
            Token::uint(7u64),
        ])]);
        assert_eq!(encoded.len(), 64);
        assert_eq!(&encoded[12..32], Address::repeat_byte(0x11).as_slice());
        assert_eq!(decode_uint(&encoded[32..]), Some(U256::from(7u8)));
    }

    #[test]
    fn test_decode_uint_short_input() {
        assert_eq!(decode_uint(&[0u8; 31]), None);
    }
}
