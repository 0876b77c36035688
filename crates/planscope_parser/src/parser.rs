use planscope_error::{ExplainError, Result, Span};

use crate::ast::{
    AnalyzeTable,
    AstParseable,
    CreateTable,
    ExplainNode,
    Ident,
    Insert,
    QueryNode,
    RefreshTable,
    ResetVariable,
    SetVariable,
    ShowVariable,
};
use crate::keywords::Keyword;
use crate::statement::Statement;
use crate::tokens::{Token, TokenWithLocation, Tokenizer};

/// Parse a sql query into statements.
pub fn parse(sql: &str) -> Result<Vec<Statement>> {
    let toks = Tokenizer::new(sql).tokenize()?;
    Parser::with_tokens(sql, toks).parse_statements()
}

/// Parse exactly one statement.
pub fn parse_one(sql: &str) -> Result<Statement> {
    let mut statements = parse(sql)?;
    if statements.len() > 1 {
        return Err(ExplainError::parse(format!(
            "Expected a single statement, got {}",
            statements.len()
        )));
    }
    statements
        .pop()
        .ok_or_else(|| ExplainError::parse("Empty SQL statement"))
}

#[derive(Debug)]
pub struct Parser<'a> {
    sql: &'a str,
    toks: Vec<TokenWithLocation>,
    /// Index of token we should process next.
    pub(crate) idx: usize,
}

impl<'a> Parser<'a> {
    pub fn with_tokens(sql: &'a str, toks: Vec<TokenWithLocation>) -> Self {
        Parser { sql, toks, idx: 0 }
    }

    /// Parse any number of statements, including zero statements.
    ///
    /// Statements are expected to be delineated with a semicolon.
    pub fn parse_statements(&mut self) -> Result<Vec<Statement>> {
        let mut stmts = Vec::new();
        let mut expect_delimiter = false;

        loop {
            while self.consume_token(&Token::SemiColon) {
                expect_delimiter = false;
            }

            if self.peek().is_none() {
                // We're done.
                break;
            }

            if expect_delimiter {
                return Err(self.error_at_current("Expected end of statement"));
            }

            let statement = self.parse_statement()?;
            stmts.push(statement);
            expect_delimiter = true;
        }

        Ok(stmts)
    }

    /// Parse a single statement.
    pub fn parse_statement(&mut self) -> Result<Statement> {
        let tok = match self.peek() {
            Some(tok) => tok,
            None => return Err(ExplainError::parse("Empty SQL statement")),
        };

        let keyword = match &tok.token {
            Token::Word(word) => match word.keyword {
                Some(k) => k,
                None => {
                    return Err(ExplainError::parse_at(
                        format!("Expected a keyword, got {}", word.value),
                        tok.span(),
                    ));
                }
            },
            other => {
                return Err(ExplainError::parse_at(
                    format!("Expected a SQL statement, got {other:?}"),
                    tok.span(),
                ));
            }
        };

        match keyword {
            Keyword::SELECT => Ok(Statement::Query(QueryNode::parse(self)?)),
            Keyword::EXPLAIN => Ok(Statement::Explain(ExplainNode::parse(self)?)),
            Keyword::CREATE => Ok(Statement::CreateTable(CreateTable::parse(self)?)),
            Keyword::INSERT => Ok(Statement::Insert(Insert::parse(self)?)),
            Keyword::ANALYZE => Ok(Statement::AnalyzeTable(AnalyzeTable::parse(self)?)),
            Keyword::REFRESH => Ok(Statement::RefreshTable(RefreshTable::parse(self)?)),
            Keyword::SET => Ok(Statement::SetVariable(SetVariable::parse(self)?)),
            Keyword::RESET => Ok(Statement::ResetVariable(ResetVariable::parse(self)?)),
            Keyword::SHOW => Ok(Statement::ShowVariable(ShowVariable::parse(self)?)),
            other => Err(self.error_at_current(format!("Unexpected keyword: {other:?}"))),
        }
    }

    /// Source text from the given byte offset up to the end of the current
    /// statement.
    pub(crate) fn statement_source_from(&self, offset: usize) -> &'a str {
        let end = self.toks[self.idx..]
            .iter()
            .find(|t| t.token == Token::SemiColon)
            .map(|t| t.offset)
            .unwrap_or(self.sql.len());
        self.sql[offset..end].trim()
    }

    /// Parse a single keyword.
    pub fn parse_keyword(&mut self, keyword: Keyword) -> bool {
        let idx = self.idx;
        if let Some(tok) = self.next() {
            if tok.is_keyword(keyword) {
                return true;
            }
        }

        // Keyword doesn't match. Reset index and return.
        self.idx = idx;
        false
    }

    /// Parse an exact sequence of keywords.
    ///
    /// If the sequence doesn't match, idx is not changed, and false is
    /// returned.
    pub fn parse_keyword_sequence(&mut self, keywords: &[Keyword]) -> bool {
        let idx = self.idx;
        for keyword in keywords {
            if let Some(tok) = self.next() {
                if tok.is_keyword(*keyword) {
                    continue;
                }
            }

            // Keyword doesn't match. Reset index and return.
            self.idx = idx;
            return false;
        }
        true
    }

    pub fn expect_keyword(&mut self, keyword: Keyword) -> Result<()> {
        if self.parse_keyword(keyword) {
            return Ok(());
        }
        Err(self.error_at_current(format!("Expected {keyword:?}")))
    }

    pub fn expect_keyword_sequence(&mut self, keywords: &[Keyword]) -> Result<()> {
        if self.parse_keyword_sequence(keywords) {
            return Ok(());
        }
        let expected: Vec<_> = keywords.iter().map(|k| format!("{k:?}")).collect();
        Err(self.error_at_current(format!("Expected {}", expected.join(" "))))
    }

    /// Parse an optional alias.
    ///
    /// `AS <ident>` always parses an alias. A bare word is only treated as an
    /// alias if it isn't one of the reserved keywords.
    pub fn parse_alias(&mut self, reserved: &[Keyword]) -> Result<Option<Ident>> {
        if self.parse_keyword(Keyword::AS) {
            return Ok(Some(Ident::parse(self)?));
        }

        let tok = match self.peek() {
            Some(tok) => tok,
            None => return Ok(None),
        };

        match &tok.token {
            Token::Word(w) => match w.keyword {
                Some(kw) if reserved.contains(&kw) => Ok(None),
                _ => Ok(Some(Ident::parse(self)?)),
            },
            _ => Ok(None),
        }
    }

    /// Consume the next token if it matches expected.
    pub fn consume_token(&mut self, expected: &Token) -> bool {
        match self.peek() {
            Some(tok) if &tok.token == expected => {
                self.idx += 1;
                true
            }
            _ => false,
        }
    }

    pub fn expect_token(&mut self, expected: &Token) -> Result<()> {
        if self.consume_token(expected) {
            return Ok(());
        }
        Err(self.error_at_current(format!("Expected {expected:?}")))
    }

    /// Parse a comma separated list of items.
    pub fn parse_comma_separated<T>(
        &mut self,
        mut f: impl FnMut(&mut Parser<'a>) -> Result<T>,
    ) -> Result<Vec<T>> {
        let mut values = Vec::new();
        loop {
            values.push(f(self)?);
            if !self.consume_token(&Token::Comma) {
                break;
            }
        }
        Ok(values)
    }

    /// Get the next token, advancing the parser.
    pub fn next(&mut self) -> Option<&TokenWithLocation> {
        let tok = self.toks.get(self.idx)?;
        self.idx += 1;
        Some(tok)
    }

    /// Get the next token without advancing.
    pub fn peek(&self) -> Option<&TokenWithLocation> {
        self.toks.get(self.idx)
    }

    /// Get the token n positions ahead without advancing.
    pub fn peek_nth(&self, n: usize) -> Option<&TokenWithLocation> {
        self.toks.get(self.idx + n)
    }

    /// Span of the next token, or of the last token if we're at the end.
    pub fn current_span(&self) -> Option<Span> {
        self.toks
            .get(self.idx)
            .or_else(|| self.toks.last())
            .map(|t| t.span())
    }

    pub fn error_at_current(&self, msg: impl Into<String>) -> ExplainError {
        let msg = msg.into();
        match self.peek() {
            Some(tok) => {
                ExplainError::parse_at(format!("{msg}, found {:?}", tok.token), tok.span())
            }
            None => match self.current_span() {
                Some(span) => {
                    ExplainError::parse_at(format!("{msg}, found end of statement"), span)
                }
                None => ExplainError::parse(format!("{msg}, found end of statement")),
            },
        }
    }
}
