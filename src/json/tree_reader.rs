// ABOUTME: Builds a JsonElement tree from the lexer with an explicit container stack.
// ABOUTME: Nesting depth is bounded only by memory, never by the call stack.

use super::element::{JsonArray, JsonElement, JsonObject, JsonPrimitive};
use super::lexer::{Lexer, Token};
use crate::error::Result;
use indexmap::IndexMap;
use log::trace;

const DEEP_NESTING: usize = 200;

enum Container {
    Array(Vec<JsonElement>),
    /// Entries read so far and the key of the value being read.
    Object(IndexMap<String, JsonElement>, String),
}

/// Reads one complete JSON value. Duplicate object keys keep the last value.
pub(crate) fn read_element(lexer: &mut Lexer<'_>, allow_trailing_comma: bool) -> Result<JsonElement> {
    let mut stack: Vec<Container> = Vec::new();
    loop {
        let mut value = match lexer.peek_next_token() {
            Token::String | Token::Other => read_primitive(lexer)?,
            Token::BeginObject => {
                lexer.consume_token(Token::BeginObject)?;
                reject_leading_comma(lexer)?;
                if lexer.can_consume_value() {
                    let key = read_key(lexer)?;
                    open(&mut stack, Container::Object(IndexMap::new(), key), lexer);
                    continue;
                }
                lexer.consume_token(Token::EndObject)?;
                JsonElement::Object(JsonObject::new())
            }
            Token::BeginList => {
                lexer.consume_token(Token::BeginList)?;
                reject_leading_comma(lexer)?;
                if lexer.can_consume_value() {
                    open(&mut stack, Container::Array(Vec::new()), lexer);
                    continue;
                }
                lexer.consume_token(Token::EndList)?;
                JsonElement::Array(JsonArray::new())
            }
            _ => return Err(lexer.unexpected_value_token()),
        };

        // Attach the finished value and close every container it completes.
        loop {
            match stack.pop() {
                None => return Ok(value),
                Some(Container::Array(mut items)) => {
                    items.push(value);
                    if next_entry(lexer, Token::EndList, "array", allow_trailing_comma)? {
                        stack.push(Container::Array(items));
                        break;
                    }
                    value = JsonElement::Array(JsonArray::from(items));
                }
                Some(Container::Object(mut entries, key)) => {
                    entries.insert(key, value);
                    if next_entry(lexer, Token::EndObject, "object", allow_trailing_comma)? {
                        let key = read_key(lexer)?;
                        stack.push(Container::Object(entries, key));
                        break;
                    }
                    value = JsonElement::Object(JsonObject::from(entries));
                }
            }
        }
    }
}

fn open(stack: &mut Vec<Container>, container: Container, lexer: &Lexer<'_>) {
    stack.push(container);
    if stack.len() == DEEP_NESTING {
        trace!("JSON tree nesting reached depth {DEEP_NESTING} at offset {}", lexer.position());
    }
}

fn reject_leading_comma(lexer: &mut Lexer<'_>) -> Result<()> {
    if lexer.peek_next_token() == Token::Comma {
        return Err(lexer.fail("Unexpected leading comma"));
    }
    Ok(())
}

fn read_primitive(lexer: &mut Lexer<'_>) -> Result<JsonElement> {
    let (content, quoted) = lexer.consume_literal()?;
    if !quoted && content == "null" {
        return Ok(JsonElement::Null);
    }
    let primitive = if quoted {
        JsonPrimitive::string(content)
    } else {
        JsonPrimitive::literal(content)
    };
    Ok(JsonElement::Primitive(primitive))
}

fn read_key(lexer: &mut Lexer<'_>) -> Result<String> {
    let key = lexer.consume_key_string()?.into_owned();
    lexer.consume_token(Token::Colon)?;
    Ok(key)
}

/// Consumes the separator after an entry. Returns true when another entry
/// follows and false once the closing token has been consumed.
fn next_entry(lexer: &mut Lexer<'_>, end: Token, entity: &str, allow_trailing_comma: bool) -> Result<bool> {
    match lexer.consume_next_token() {
        Token::Comma => {
            if lexer.peek_next_token() != end {
                return Ok(true);
            }
            if !allow_trailing_comma {
                return Err(lexer.invalid_trailing_comma(entity));
            }
            lexer.consume_token(end)?;
            Ok(false)
        }
        token if token == end => Ok(false),
        _ => Err(lexer.fail(format!("Expected end of the {entity} or comma"))),
    }
}
