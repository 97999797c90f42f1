// ABOUTME: Test-only in-memory format that records protocol calls as a flat token list.
// ABOUTME: Drives strategies through both the sequential and the index-driven decode paths.

use crate::descriptor::SerialDescriptor;
use crate::encoding::{CompositeDecoder, CompositeEncoder, Decoder, Encoder};
use crate::error::{Error, Result};
use crate::module::SerializersModule;
use crate::strategy::SerialStrategy;

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Char(char),
    Str(String),
    Null,
    NotNull,
    Enum(usize),
    Begin(String),
    Size(usize),
    End,
}

#[derive(Default)]
pub struct TokenEncoder {
    pub tokens: Vec<Token>,
    module: SerializersModule,
}

impl TokenEncoder {
    pub fn with_module(module: SerializersModule) -> Self {
        Self {
            tokens: Vec::new(),
            module,
        }
    }
}

impl Encoder for TokenEncoder {
    fn serializers_module(&self) -> &SerializersModule {
        &self.module
    }

    fn encode_bool(&mut self, value: bool) -> Result<()> {
        self.tokens.push(Token::Bool(value));
        Ok(())
    }

    fn encode_byte(&mut self, value: i8) -> Result<()> {
        self.tokens.push(Token::Byte(value));
        Ok(())
    }

    fn encode_short(&mut self, value: i16) -> Result<()> {
        self.tokens.push(Token::Short(value));
        Ok(())
    }

    fn encode_int(&mut self, value: i32) -> Result<()> {
        self.tokens.push(Token::Int(value));
        Ok(())
    }

    fn encode_long(&mut self, value: i64) -> Result<()> {
        self.tokens.push(Token::Long(value));
        Ok(())
    }

    fn encode_float(&mut self, value: f32) -> Result<()> {
        self.tokens.push(Token::Float(value));
        Ok(())
    }

    fn encode_double(&mut self, value: f64) -> Result<()> {
        self.tokens.push(Token::Double(value));
        Ok(())
    }

    fn encode_char(&mut self, value: char) -> Result<()> {
        self.tokens.push(Token::Char(value));
        Ok(())
    }

    fn encode_string(&mut self, value: &str) -> Result<()> {
        self.tokens.push(Token::Str(value.to_owned()));
        Ok(())
    }

    fn encode_null(&mut self) -> Result<()> {
        self.tokens.push(Token::Null);
        Ok(())
    }

    fn encode_not_null_mark(&mut self) -> Result<()> {
        self.tokens.push(Token::NotNull);
        Ok(())
    }

    fn encode_enum(&mut self, _descriptor: &SerialDescriptor, index: usize) -> Result<()> {
        self.tokens.push(Token::Enum(index));
        Ok(())
    }

    fn encode_inline(&mut self, _descriptor: &SerialDescriptor) -> Result<&mut dyn Encoder> {
        Ok(self)
    }

    fn begin_structure(&mut self, descriptor: &SerialDescriptor) -> Result<&mut dyn CompositeEncoder> {
        self.tokens.push(Token::Begin(descriptor.serial_name().to_owned()));
        Ok(self)
    }

    fn begin_collection(&mut self, descriptor: &SerialDescriptor, size: usize) -> Result<&mut dyn CompositeEncoder> {
        self.tokens.push(Token::Begin(descriptor.serial_name().to_owned()));
        self.tokens.push(Token::Size(size));
        Ok(self)
    }
}

impl CompositeEncoder for TokenEncoder {
    fn encode_element(&mut self, _descriptor: &SerialDescriptor, _index: usize) -> Result<bool> {
        Ok(true)
    }

    fn as_encoder(&mut self) -> &mut dyn Encoder {
        self
    }

    fn end_structure(&mut self, _descriptor: &SerialDescriptor) -> Result<()> {
        self.tokens.push(Token::End);
        Ok(())
    }
}

/// Reads tokens back. With `sequential` the decoder promises ordered
/// elements; otherwise it hands out ascending indices until `End`.
pub struct TokenDecoder {
    tokens: Vec<Token>,
    pos: usize,
    sequential: bool,
    indices: Vec<usize>,
    module: SerializersModule,
}

impl TokenDecoder {
    pub fn new(tokens: Vec<Token>, sequential: bool) -> Self {
        Self::with_module(tokens, sequential, SerializersModule::default())
    }

    pub fn with_module(tokens: Vec<Token>, sequential: bool, module: SerializersModule) -> Self {
        Self {
            tokens,
            pos: 0,
            sequential,
            indices: Vec::new(),
            module,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.pos == self.tokens.len()
    }

    fn next(&mut self) -> Result<Token> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| Error::decoding("unexpected end of tokens"))?;
        self.pos += 1;
        Ok(token)
    }

    fn unexpected(token: &Token, expected: &str) -> Error {
        Error::decoding(format!("expected {expected}, found {token:?}"))
    }
}

macro_rules! read_token {
    ($self:ident, $variant:ident, $expected:literal) => {
        match $self.next()? {
            Token::$variant(value) => Ok(value),
            other => Err(TokenDecoder::unexpected(&other, $expected)),
        }
    };
}

impl Decoder for TokenDecoder {
    fn serializers_module(&self) -> &SerializersModule {
        &self.module
    }

    fn decode_not_null_mark(&mut self) -> Result<bool> {
        match self.tokens.get(self.pos) {
            Some(Token::NotNull) => {
                self.pos += 1;
                Ok(true)
            }
            Some(Token::Null) => Ok(false),
            Some(other) => Err(Self::unexpected(other, "null mark")),
            None => Err(Error::decoding("unexpected end of tokens")),
        }
    }

    fn decode_null(&mut self) -> Result<()> {
        match self.next()? {
            Token::Null => Ok(()),
            other => Err(Self::unexpected(&other, "null")),
        }
    }

    fn decode_bool(&mut self) -> Result<bool> {
        read_token!(self, Bool, "bool")
    }

    fn decode_byte(&mut self) -> Result<i8> {
        read_token!(self, Byte, "byte")
    }

    fn decode_short(&mut self) -> Result<i16> {
        read_token!(self, Short, "short")
    }

    fn decode_int(&mut self) -> Result<i32> {
        read_token!(self, Int, "int")
    }

    fn decode_long(&mut self) -> Result<i64> {
        read_token!(self, Long, "long")
    }

    fn decode_float(&mut self) -> Result<f32> {
        read_token!(self, Float, "float")
    }

    fn decode_double(&mut self) -> Result<f64> {
        read_token!(self, Double, "double")
    }

    fn decode_char(&mut self) -> Result<char> {
        read_token!(self, Char, "char")
    }

    fn decode_string(&mut self) -> Result<String> {
        read_token!(self, Str, "string")
    }

    fn decode_enum(&mut self, _descriptor: &SerialDescriptor) -> Result<usize> {
        read_token!(self, Enum, "enum")
    }

    fn decode_inline(&mut self, _descriptor: &SerialDescriptor) -> Result<&mut dyn Decoder> {
        Ok(self)
    }

    fn begin_structure(&mut self, descriptor: &SerialDescriptor) -> Result<&mut dyn CompositeDecoder> {
        let name = read_token!(self, Begin, "structure start")?;
        if name != descriptor.serial_name() {
            return Err(Error::decoding(format!(
                "expected structure {}, found {name}",
                descriptor.serial_name()
            )));
        }
        self.indices.push(0);
        Ok(self)
    }
}

impl CompositeDecoder for TokenDecoder {
    fn decode_element_index(&mut self, _descriptor: &SerialDescriptor) -> Result<Option<usize>> {
        if let Some(Token::Size(_)) = self.tokens.get(self.pos) {
            self.pos += 1;
        }
        if let Some(Token::End) = self.tokens.get(self.pos) {
            return Ok(None);
        }
        let Some(index) = self.indices.last_mut() else {
            return Err(Error::serialization("no open structure"));
        };
        let current = *index;
        *index += 1;
        Ok(Some(current))
    }

    fn select_element(&mut self, _descriptor: &SerialDescriptor, index: usize) -> Result<&mut dyn Decoder> {
        // Index-driven reads must ask for the element last handed out.
        if !self.sequential {
            let current = self.indices.last().and_then(|next| next.checked_sub(1));
            if current != Some(index) {
                return Err(Error::decoding(format!(
                    "element {index} requested, but the current element is {current:?}"
                )));
            }
        }
        Ok(self)
    }

    fn end_structure(&mut self, _descriptor: &SerialDescriptor) -> Result<()> {
        self.indices.pop();
        match self.next()? {
            Token::End => Ok(()),
            other => Err(Self::unexpected(&other, "structure end")),
        }
    }

    fn as_module(&self) -> &SerializersModule {
        &self.module
    }

    fn decode_sequentially(&self) -> bool {
        self.sequential
    }

    fn decode_collection_size(&mut self, _descriptor: &SerialDescriptor) -> Result<Option<usize>> {
        match self.tokens.get(self.pos) {
            Some(Token::Size(size)) => {
                let size = *size;
                self.pos += 1;
                Ok(Some(size))
            }
            _ => Ok(None),
        }
    }
}

pub fn encode_tokens<T>(strategy: &dyn SerialStrategy<T>, value: &T) -> Result<Vec<Token>> {
    let mut encoder = TokenEncoder::default();
    strategy.serialize(&mut encoder, value)?;
    Ok(encoder.tokens)
}

pub fn decode_tokens<T>(strategy: &dyn SerialStrategy<T>, tokens: Vec<Token>, sequential: bool) -> Result<T> {
    let mut decoder = TokenDecoder::new(tokens, sequential);
    let value = strategy.deserialize(&mut decoder)?;
    if !decoder.is_exhausted() {
        return Err(Error::decoding("trailing tokens"));
    }
    Ok(value)
}
