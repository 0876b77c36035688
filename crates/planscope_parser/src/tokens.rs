use planscope_error::{ExplainError, Result, Span};

use crate::keywords::{Keyword, keyword_from_str};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub value: String,
    /// Quote character if the word was quoted.
    pub quote: Option<char>,
    /// Keyword this word matches. Always None for quoted words.
    pub keyword: Option<Keyword>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Word(Word),
    /// Unparsed number.
    Number(String),
    SingleQuotedString(String),
    /// `=`
    Eq,
    /// `==`
    DoubleEq,
    /// `!=` or `<>`
    Neq,
    /// `<`
    Lt,
    /// `<=`
    LtEq,
    /// `>`
    Gt,
    /// `>=`
    GtEq,
    /// `+`
    Plus,
    /// `-`
    Minus,
    /// `*`
    Mul,
    /// `/`
    Div,
    /// `%`
    Mod,
    LeftParen,
    RightParen,
    Comma,
    Period,
    SemiColon,
}

impl Token {
    pub fn keyword(&self) -> Option<Keyword> {
        match self {
            Token::Word(w) => w.keyword,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenWithLocation {
    pub token: Token,
    /// Line the token starts on, 1-based.
    pub line: usize,
    /// Column the token starts on, 1-based.
    pub col: usize,
    /// Byte offset of the start of the token.
    pub offset: usize,
}

impl TokenWithLocation {
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.token.keyword() == Some(keyword)
    }

    pub fn keyword(&self) -> Option<Keyword> {
        self.token.keyword()
    }

    pub fn span(&self) -> Span {
        Span::new(self.line, self.col)
    }
}

#[derive(Debug)]
pub struct Tokenizer<'a> {
    query: &'a str,
    /// Byte offset of the next char.
    offset: usize,
    line: usize,
    col: usize,
}

impl<'a> Tokenizer<'a> {
    pub fn new(query: &'a str) -> Self {
        Tokenizer {
            query,
            offset: 0,
            line: 1,
            col: 1,
        }
    }

    pub fn tokenize(mut self) -> Result<Vec<TokenWithLocation>> {
        let mut toks = Vec::new();

        loop {
            self.skip_whitespace_and_comments();

            let (line, col, offset) = (self.line, self.col, self.offset);
            let token = match self.next_token()? {
                Some(tok) => tok,
                None => break,
            };

            toks.push(TokenWithLocation {
                token,
                line,
                col,
                offset,
            });
        }

        Ok(toks)
    }

    fn peek(&self) -> Option<char> {
        self.query[self.offset..].chars().next()
    }

    fn peek_nth(&self, n: usize) -> Option<char> {
        self.query[self.offset..].chars().nth(n)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.offset += c.len_utf8();
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn span(&self) -> Span {
        Span::new(self.line, self.col)
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match (self.peek(), self.peek_nth(1)) {
                (Some(c), _) if c.is_whitespace() => {
                    self.bump();
                }
                (Some('-'), Some('-')) => {
                    // Line comment, skip to end of line.
                    while let Some(c) = self.bump() {
                        if c == '\n' {
                            break;
                        }
                    }
                }
                _ => return,
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>> {
        let c = match self.peek() {
            Some(c) => c,
            None => return Ok(None),
        };

        let tok = match c {
            '=' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    Token::DoubleEq
                } else {
                    Token::Eq
                }
            }
            '!' => {
                let span = self.span();
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    Token::Neq
                } else {
                    return Err(ExplainError::parse_at("Expected '=' after '!'", span));
                }
            }
            '<' => {
                self.bump();
                match self.peek() {
                    Some('=') => {
                        self.bump();
                        Token::LtEq
                    }
                    Some('>') => {
                        self.bump();
                        Token::Neq
                    }
                    _ => Token::Lt,
                }
            }
            '>' => {
                self.bump();
                if self.peek() == Some('=') {
                    self.bump();
                    Token::GtEq
                } else {
                    Token::Gt
                }
            }
            '+' => self.single(Token::Plus),
            '-' => self.single(Token::Minus),
            '*' => self.single(Token::Mul),
            '/' => self.single(Token::Div),
            '%' => self.single(Token::Mod),
            '(' => self.single(Token::LeftParen),
            ')' => self.single(Token::RightParen),
            ',' => self.single(Token::Comma),
            ';' => self.single(Token::SemiColon),
            '.' => {
                if self.peek_nth(1).is_some_and(|c| c.is_ascii_digit()) {
                    Token::Number(self.take_number())
                } else {
                    self.single(Token::Period)
                }
            }
            '\'' => Token::SingleQuotedString(self.take_quoted('\'')?),
            '"' | '`' => {
                let value = self.take_quoted(c)?;
                Token::Word(Word {
                    value,
                    quote: Some(c),
                    keyword: None,
                })
            }
            c if c.is_ascii_digit() => Token::Number(self.take_number()),
            c if c.is_alphabetic() || c == '_' => {
                let start = self.offset;
                while self
                    .peek()
                    .is_some_and(|c| c.is_alphanumeric() || c == '_')
                {
                    self.bump();
                }
                let value = self.query[start..self.offset].to_string();
                let keyword = keyword_from_str(&value);
                Token::Word(Word {
                    value,
                    quote: None,
                    keyword,
                })
            }
            other => {
                return Err(ExplainError::parse_at(
                    format!("Unexpected character '{other}'"),
                    self.span(),
                ));
            }
        };

        Ok(Some(tok))
    }

    fn single(&mut self, tok: Token) -> Token {
        self.bump();
        tok
    }

    fn take_number(&mut self) -> String {
        let start = self.offset;
        let mut seen_dot = false;
        while let Some(c) = self.peek() {
            if c.is_ascii_digit() {
                self.bump();
            } else if c == '.' && !seen_dot {
                seen_dot = true;
                self.bump();
            } else {
                break;
            }
        }
        self.query[start..self.offset].to_string()
    }

    /// Take a quoted value. Doubling the quote character escapes it.
    fn take_quoted(&mut self, quote: char) -> Result<String> {
        let span = self.span();
        self.bump();

        let mut value = String::new();
        loop {
            match self.bump() {
                Some(c) if c == quote => {
                    if self.peek() == Some(quote) {
                        self.bump();
                        value.push(quote);
                    } else {
                        return Ok(value);
                    }
                }
                Some(c) => value.push(c),
                None => {
                    return Err(ExplainError::parse_at("Unterminated quoted string", span));
                }
            }
        }
    }
}
