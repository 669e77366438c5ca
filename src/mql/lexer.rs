use crate::error::{MqlError, MqlResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    // Keywords
    From,
    As,
    Join,
    On,
    Async,
    Where,
    Select,
    New,
    And,
    Or,
    Not,
    True,
    False,
    Null,

    // Identifiers and literals
    Identifier(String),
    Integer(i64),
    Float(f64),
    String(String),

    // Operators
    Equal,         // ==
    Assign,        // =
    NotEqual,      // !=
    LessThan,      // <
    LessThanEq,    // <=
    GreaterThan,   // >
    GreaterThanEq, // >=
    Plus,          // +
    Minus,         // - (only before a number literal)

    // Delimiters
    Dot,          // .
    DotQuestion,  // .? (null-safe segment)
    QuestionDot,  // ?. (null-safe segment)
    Comma,        // ,
    LeftBrace,    // {
    RightBrace,   // }
    LeftParen,    // (
    RightParen,   // )

    // Special
    Eof,
}

/// A token and the character offset where it starts.
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned {
    pub token: Token,
    pub position: usize,
}

pub struct Lexer {
    input: Vec<char>,
    position: usize,
    current_char: Option<char>,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        let chars: Vec<char> = input.chars().collect();
        let current_char = chars.first().copied();

        Self {
            input: chars,
            position: 0,
            current_char,
        }
    }

    fn advance(&mut self) {
        self.position += 1;
        self.current_char = self.input.get(self.position).copied();
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char {
            if ch.is_whitespace() {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_number(&mut self) -> MqlResult<Token> {
        let start = self.position;
        let mut num_str = String::new();
        let mut has_dot = false;

        if self.current_char == Some('-') {
            num_str.push('-');
            self.advance();
        }

        while let Some(ch) = self.current_char {
            if ch.is_ascii_digit() {
                num_str.push(ch);
                self.advance();
            } else if ch == '.' && !has_dot && self.peek_char().is_some_and(|c| c.is_ascii_digit())
            {
                has_dot = true;
                num_str.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        // `5select` is rejected rather than split into two tokens
        if let Some(rest) = self.read_abutting_word() {
            return Err(MqlError::parse(
                start,
                format!(
                    "Invalid number literal '{}{}': expected whitespace after number",
                    num_str, rest
                ),
            ));
        }

        if has_dot {
            num_str.parse::<f64>().map(Token::Float).map_err(|_| {
                MqlError::parse(start, format!("Invalid float number: {}", num_str))
            })
        } else {
            num_str.parse::<i64>().map(Token::Integer).map_err(|_| {
                MqlError::parse(start, format!("Invalid integer number: {}", num_str))
            })
        }
    }

    fn read_string(&mut self, quote: char) -> MqlResult<Token> {
        let start = self.position;
        self.advance(); // Skip opening quote

        let mut string = String::new();

        while let Some(ch) = self.current_char {
            if ch == quote {
                self.advance(); // Skip closing quote
                if let Some(rest) = self.read_abutting_word() {
                    return Err(MqlError::parse(
                        start,
                        format!(
                            "Invalid string literal {q}{}{q}{}: expected whitespace after string",
                            string,
                            rest,
                            q = quote
                        ),
                    ));
                }
                return Ok(Token::String(string));
            } else if ch == '\\' {
                self.advance();
                if let Some(escaped) = self.current_char {
                    string.push(match escaped {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        _ => escaped,
                    });
                    self.advance();
                }
            } else {
                string.push(ch);
                self.advance();
            }
        }

        Err(MqlError::parse(start, "Unterminated string"))
    }

    /// Consume an identifier glued to the end of a literal, if any.
    fn read_abutting_word(&mut self) -> Option<String> {
        match self.current_char {
            Some(ch) if ch.is_alphabetic() || ch == '_' => {
                let mut word = String::new();
                while let Some(c) = self.current_char {
                    if c.is_alphanumeric() || c == '_' {
                        word.push(c);
                        self.advance();
                    } else {
                        break;
                    }
                }
                Some(word)
            }
            _ => None,
        }
    }

    fn read_identifier(&mut self) -> Token {
        let mut ident = String::new();

        while let Some(ch) = self.current_char {
            if ch.is_alphanumeric() || ch == '_' {
                ident.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        match ident.to_lowercase().as_str() {
            "from" => Token::From,
            "as" => Token::As,
            "join" => Token::Join,
            "on" => Token::On,
            "async" => Token::Async,
            "where" => Token::Where,
            "select" => Token::Select,
            "new" => Token::New,
            "and" => Token::And,
            "or" => Token::Or,
            "not" => Token::Not,
            "true" => Token::True,
            "false" => Token::False,
            "null" => Token::Null,
            _ => Token::Identifier(ident),
        }
    }

    pub fn next_token(&mut self) -> MqlResult<Spanned> {
        self.skip_whitespace();

        let position = self.position;
        let token = match self.current_char {
            None => Token::Eof,
            Some(ch) => match ch {
                '"' | '\'' => self.read_string(ch)?,
                c if c.is_ascii_digit() => self.read_number()?,
                '-' if self.peek_char().is_some_and(|c| c.is_ascii_digit()) => {
                    self.read_number()?
                }
                '-' => {
                    self.advance();
                    Token::Minus
                }
                c if c.is_alphabetic() || c == '_' => self.read_identifier(),
                '=' => {
                    self.advance();
                    if self.current_char == Some('=') {
                        self.advance();
                        Token::Equal
                    } else {
                        Token::Assign
                    }
                }
                '!' => {
                    self.advance();
                    if self.current_char == Some('=') {
                        self.advance();
                        Token::NotEqual
                    } else {
                        return Err(MqlError::parse(
                            position,
                            "Unexpected character: '!' (use 'not' for negation)",
                        ));
                    }
                }
                '<' => {
                    self.advance();
                    if self.current_char == Some('=') {
                        self.advance();
                        Token::LessThanEq
                    } else {
                        Token::LessThan
                    }
                }
                '>' => {
                    self.advance();
                    if self.current_char == Some('=') {
                        self.advance();
                        Token::GreaterThanEq
                    } else {
                        Token::GreaterThan
                    }
                }
                '+' => {
                    self.advance();
                    Token::Plus
                }
                '.' => {
                    self.advance();
                    if self.current_char == Some('?') {
                        self.advance();
                        Token::DotQuestion
                    } else {
                        Token::Dot
                    }
                }
                '?' => {
                    self.advance();
                    if self.current_char == Some('.') {
                        self.advance();
                        Token::QuestionDot
                    } else {
                        return Err(MqlError::parse(position, "Unexpected character: '?'"));
                    }
                }
                ',' => {
                    self.advance();
                    Token::Comma
                }
                '{' => {
                    self.advance();
                    Token::LeftBrace
                }
                '}' => {
                    self.advance();
                    Token::RightBrace
                }
                '(' => {
                    self.advance();
                    Token::LeftParen
                }
                ')' => {
                    self.advance();
                    Token::RightParen
                }
                other => {
                    return Err(MqlError::parse(
                        position,
                        format!("Unexpected character: '{}'", other),
                    ));
                }
            },
        };

        Ok(Spanned { token, position })
    }

    pub fn tokenize(&mut self) -> MqlResult<Vec<Spanned>> {
        let mut tokens = Vec::new();

        loop {
            let spanned = self.next_token()?;
            let done = spanned.token == Token::Eof;
            tokens.push(spanned);
            if done {
                break;
            }
        }

        Ok(tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenize(input: &str) -> Vec<Token> {
        Lexer::new(input)
            .tokenize()
            .unwrap()
            .into_iter()
            .map(|s| s.token)
            .collect()
    }

    #[test]
    fn test_keywords() {
        assert_eq!(
            tokenize("from as join on async where select new"),
            vec![
                Token::From,
                Token::As,
                Token::Join,
                Token::On,
                Token::Async,
                Token::Where,
                Token::Select,
                Token::New,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_keywords_case_insensitive() {
        assert_eq!(tokenize("FROM")[0], Token::From);
        assert_eq!(tokenize("Select")[0], Token::Select);
        assert_eq!(tokenize("AND")[0], Token::And);
    }

    #[test]
    fn test_identifiers() {
        assert_eq!(
            tokenize("twitterId")[0],
            Token::Identifier("twitterId".to_string())
        );
        assert_eq!(
            tokenize("_private")[0],
            Token::Identifier("_private".to_string())
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(tokenize("123")[0], Token::Integer(123));
        assert_eq!(tokenize("2.5")[0], Token::Float(2.5));
    }

    #[test]
    fn test_strings() {
        assert_eq!(tokenize("\"hello\"")[0], Token::String("hello".to_string()));
        assert_eq!(tokenize("' '")[0], Token::String(" ".to_string()));
        assert_eq!(
            tokenize("\"quote\\\"here\"")[0],
            Token::String("quote\"here".to_string())
        );
    }

    #[test]
    fn test_comparison_operators() {
        assert_eq!(
            tokenize("== != < <= > >= ="),
            vec![
                Token::Equal,
                Token::NotEqual,
                Token::LessThan,
                Token::LessThanEq,
                Token::GreaterThan,
                Token::GreaterThanEq,
                Token::Assign,
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_null_safe_segments() {
        assert_eq!(
            tokenize("a.?b?.c.d"),
            vec![
                Token::Identifier("a".to_string()),
                Token::DotQuestion,
                Token::Identifier("b".to_string()),
                Token::QuestionDot,
                Token::Identifier("c".to_string()),
                Token::Dot,
                Token::Identifier("d".to_string()),
                Token::Eof
            ]
        );
    }

    #[test]
    fn test_positions() {
        let tokens = Lexer::new("from  persons").tokenize().unwrap();
        assert_eq!(tokens[0].position, 0);
        assert_eq!(tokens[1].position, 6);
        assert_eq!(tokens[2].position, 13);
    }

    #[test]
    fn test_error_unterminated_string() {
        let err = Lexer::new("\"abc").tokenize().unwrap_err();
        assert!(matches!(err, MqlError::Parse { position: 0, .. }));
    }

    #[test]
    fn test_error_keyword_abutting_number() {
        let err = Lexer::new("x < 5select").tokenize().unwrap_err();
        match err {
            MqlError::Parse { position, message } => {
                assert_eq!(position, 4);
                assert!(message.contains("5select"));
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
    }

    #[test]
    fn test_negative_numbers() {
        assert_eq!(tokenize("-7")[0], Token::Integer(-7));
        assert_eq!(tokenize("-0.25")[0], Token::Float(-0.25));
        assert_eq!(
            tokenize("-9223372036854775808")[0],
            Token::Integer(i64::MIN)
        );
        assert_eq!(
            tokenize("x<-1"),
            vec![
                Token::Identifier("x".to_string()),
                Token::LessThan,
                Token::Integer(-1),
                Token::Eof
            ]
        );
        assert_eq!(tokenize("- 1")[0], Token::Minus);
    }

    #[test]
    fn test_error_keyword_abutting_string() {
        let err = Lexer::new("x == 'a'select").tokenize().unwrap_err();
        match err {
            MqlError::Parse { position, message } => {
                assert_eq!(position, 5);
                assert!(message.contains("'a'select"));
            }
            other => panic!("Expected parse error, got {:?}", other),
        }
        assert_eq!(tokenize("'a')")[1], Token::RightParen);
    }

    #[test]
    fn test_error_unexpected_char() {
        let err = Lexer::new("a # b").tokenize().unwrap_err();
        assert!(matches!(err, MqlError::Parse { position: 2, .. }));
    }
}
