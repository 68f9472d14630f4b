//! Reader for the dict/list cells found in ESPN play-by-play exports.
//!
//! Older exports store structured cells as Python literals
//! (`{'id': '412', 'text': 'End Period'}`), newer ones as JSON. Both are
//! accepted and returned as a `serde_json::Value`.

use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid literal at byte {position}: {reason}")]
pub struct LiteralError {
    pub position: usize,
    pub reason: &'static str,
}

/// Parses a Python or JSON literal into a JSON value
pub fn parse_literal(input: &str) -> Result<Value, LiteralError> {
    let mut parser = Parser {
        bytes: input.as_bytes(),
        input,
        pos: 0,
    };
    let value = parser.value()?;
    parser.skip_whitespace();
    if parser.pos != parser.bytes.len() {
        return Err(parser.error("trailing characters"));
    }
    Ok(value)
}

struct Parser<'a> {
    input: &'a str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn error(&self, reason: &'static str) -> LiteralError {
        LiteralError {
            position: self.pos,
            reason,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(b' ' | b'\t' | b'\n' | b'\r')) {
            self.pos += 1;
        }
    }

    fn expect(&mut self, byte: u8, reason: &'static str) -> Result<(), LiteralError> {
        self.skip_whitespace();
        if self.peek() == Some(byte) {
            self.pos += 1;
            Ok(())
        } else {
            Err(self.error(reason))
        }
    }

    fn value(&mut self) -> Result<Value, LiteralError> {
        self.skip_whitespace();
        match self.peek() {
            Some(b'{') => self.dict(),
            Some(b'[') => self.sequence(b'[', b']'),
            Some(b'(') => self.sequence(b'(', b')'),
            Some(quote @ (b'\'' | b'"')) => self.string(quote).map(Value::String),
            Some(b'-' | b'+' | b'.' | b'0'..=b'9') => self.number(),
            Some(b'a'..=b'z' | b'A'..=b'Z') => self.keyword(),
            Some(_) => Err(self.error("unexpected character")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn dict(&mut self) -> Result<Value, LiteralError> {
        self.expect(b'{', "expected '{'")?;
        let mut map = Map::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(b'}') {
                self.pos += 1;
                return Ok(Value::Object(map));
            }
            let key = match self.value()? {
                Value::String(key) => key,
                Value::Number(key) => key.to_string(),
                _ => return Err(self.error("unsupported dict key")),
            };
            self.expect(b':', "expected ':'")?;
            let value = self.value()?;
            map.insert(key, value);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {}
                _ => return Err(self.error("expected ',' or '}'")),
            }
        }
    }

    fn sequence(&mut self, open: u8, close: u8) -> Result<Value, LiteralError> {
        self.expect(open, "expected sequence")?;
        let mut items = Vec::new();
        loop {
            self.skip_whitespace();
            if self.peek() == Some(close) {
                self.pos += 1;
                return Ok(Value::Array(items));
            }
            items.push(self.value()?);
            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(byte) if byte == close => {}
                _ => return Err(self.error("expected ',' or end of sequence")),
            }
        }
    }

    fn string(&mut self, quote: u8) -> Result<String, LiteralError> {
        self.pos += 1;
        let mut out = String::new();
        let mut chars = self.input[self.pos..].char_indices();
        while let Some((offset, c)) = chars.next() {
            match c {
                '\\' => {
                    let Some((_, escaped)) = chars.next() else {
                        break;
                    };
                    match escaped {
                        'n' => out.push('\n'),
                        't' => out.push('\t'),
                        'r' => out.push('\r'),
                        other => out.push(other),
                    }
                }
                c if c as u32 == quote as u32 => {
                    self.pos += offset + 1;
                    return Ok(out);
                }
                c => out.push(c),
            }
        }
        self.pos = self.bytes.len();
        Err(self.error("unterminated string"))
    }

    fn number(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while matches!(
            self.peek(),
            Some(b'-' | b'+' | b'.' | b'e' | b'E' | b'0'..=b'9')
        ) {
            self.pos += 1;
        }
        let text = &self.input[start..self.pos];
        if let Ok(int) = text.parse::<i64>() {
            return Ok(Value::Number(int.into()));
        }
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .ok_or_else(|| self.error("invalid number"))
    }

    fn keyword(&mut self) -> Result<Value, LiteralError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b'a'..=b'z' | b'A'..=b'Z')) {
            self.pos += 1;
        }
        match &self.input[start..self.pos] {
            "True" | "true" => Ok(Value::Bool(true)),
            "False" | "false" => Ok(Value::Bool(false)),
            "None" | "null" => Ok(Value::Null),
            _ => Err(self.error("unknown keyword")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_python_dict() {
        let value = parse_literal("{'id': '412', 'text': 'End Period'}").unwrap();
        assert_eq!(value, json!({"id": "412", "text": "End Period"}));
    }

    #[test]
    fn test_participants_list() {
        let value =
            parse_literal("[{'athlete': {'id': '3975'}}, {'athlete': {'id': '4066'}}]").unwrap();
        assert_eq!(value[1]["athlete"]["id"], "4066");
    }

    #[test]
    fn test_json_input() {
        let value = parse_literal(r#"{"id": "1", "abbrev": true, "n": null}"#).unwrap();
        assert_eq!(value, json!({"id": "1", "abbrev": true, "n": null}));
    }

    #[test]
    fn test_python_keywords_and_numbers() {
        let value = parse_literal("[True, False, None, -3, 2.5]").unwrap();
        assert_eq!(value, json!([true, false, null, -3, 2.5]));
    }

    #[test]
    fn test_escaped_quote_inside_string() {
        let value = parse_literal(r"{'text': 'O\'Neal dunk'}").unwrap();
        assert_eq!(value["text"], "O'Neal dunk");
    }

    #[test]
    fn test_double_quoted_python_string() {
        let value = parse_literal(r#"{'text': "D'Angelo Russell makes layup"}"#).unwrap();
        assert_eq!(value["text"], "D'Angelo Russell makes layup");
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_literal("{'id': '412'").is_err());
        assert!(parse_literal("not a literal").is_err());
        assert!(parse_literal("{'id': 1} extra").is_err());
        assert!(parse_literal("").is_err());
    }
}
