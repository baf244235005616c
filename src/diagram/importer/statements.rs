//! Splits a dump into statements, dropping comments and client-side
//! commands while keeping quoted text intact.

use crate::diagram::engine::Engine;

use super::ImportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub text: String,
    /// 1-based line on which the statement starts.
    pub line: usize,
}

pub fn split_statements(sql: &str, engine: Engine) -> Result<Vec<Statement>, ImportError> {
    Splitter::new(sql, engine).run()
}

struct Splitter<'a> {
    src: &'a [u8],
    engine: Engine,
    pos: usize,
    line: usize,
    delimiter: Vec<u8>,
    current: Vec<u8>,
    current_line: usize,
    statements: Vec<Statement>,
}

impl<'a> Splitter<'a> {
    fn new(sql: &'a str, engine: Engine) -> Self {
        Self {
            src: sql.as_bytes(),
            engine,
            pos: 0,
            line: 1,
            delimiter: b";".to_vec(),
            current: Vec::new(),
            current_line: 1,
            statements: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Statement>, ImportError> {
        while self.pos < self.src.len() {
            let byte = self.src[self.pos];

            if self.at_statement_start() {
                if byte.is_ascii_whitespace() {
                    self.advance_skip(1);
                    continue;
                }
                self.current_line = self.line;
                if byte == b'\\' && self.engine == Engine::Postgres {
                    // psql meta-command (\connect, \restrict ...), ends at newline
                    self.skip_line();
                    continue;
                }
                if self.engine == Engine::Mysql && self.starts_with_keyword(b"DELIMITER") {
                    self.change_delimiter()?;
                    continue;
                }
            }

            if self.src[self.pos..].starts_with(&self.delimiter) {
                let len = self.delimiter.len();
                self.advance_skip(len);
                self.finish_statement();
                continue;
            }

            match byte {
                b'-' if self.peek(1) == Some(b'-') => self.skip_line(),
                b'#' if self.engine == Engine::Mysql => self.skip_line(),
                b'/' if self.peek(1) == Some(b'*') => self.skip_block_comment()?,
                b'\'' => self.copy_quoted(b'\'', self.engine == Engine::Mysql, "string literal")?,
                b'"' => self.copy_quoted(b'"', false, "quoted identifier")?,
                b'`' => {
                    if self.engine == Engine::Postgres {
                        return Err(ImportError::new(
                            self.line,
                            "backtick-quoted identifiers are not valid PostgreSQL",
                        ));
                    }
                    self.copy_quoted(b'`', false, "quoted identifier")?;
                }
                b'$' if self.engine == Engine::Postgres => self.copy_dollar_quoted()?,
                _ => self.advance_copy(1),
            }
        }

        self.finish_statement();
        Ok(self.statements)
    }

    fn at_statement_start(&self) -> bool {
        self.current.iter().all(u8::is_ascii_whitespace)
    }

    fn peek(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn starts_with_keyword(&self, keyword: &[u8]) -> bool {
        let rest = &self.src[self.pos..];
        rest.len() > keyword.len()
            && rest[..keyword.len()].eq_ignore_ascii_case(keyword)
            && rest[keyword.len()].is_ascii_whitespace()
    }

    fn advance_copy(&mut self, len: usize) {
        let end = (self.pos + len).min(self.src.len());
        for &byte in &self.src[self.pos..end] {
            if byte == b'\n' {
                self.line += 1;
            }
            self.current.push(byte);
        }
        self.pos = end;
    }

    fn advance_skip(&mut self, len: usize) {
        let end = (self.pos + len).min(self.src.len());
        self.line += self.src[self.pos..end].iter().filter(|&&b| b == b'\n').count();
        self.pos = end;
    }

    fn skip_line(&mut self) {
        let rest = &self.src[self.pos..];
        let len = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
        self.advance_skip(len);
        self.current.push(b' ');
    }

    fn skip_block_comment(&mut self) -> Result<(), ImportError> {
        let start_line = self.line;
        let rest = &self.src[self.pos + 2..];
        let Some(close) = rest.windows(2).position(|window| window == b"*/") else {
            return Err(ImportError::new(start_line, "unterminated block comment"));
        };
        self.advance_skip(close + 4);
        self.current.push(b' ');
        Ok(())
    }

    /// Copies a quoted run. A doubled quote is an escaped quote; with
    /// `backslash_escapes` a backslash escapes the next byte.
    fn copy_quoted(
        &mut self,
        quote: u8,
        backslash_escapes: bool,
        what: &str,
    ) -> Result<(), ImportError> {
        let start_line = self.line;
        let mut i = self.pos + 1;
        loop {
            match self.src.get(i) {
                None => {
                    return Err(ImportError::new(start_line, format!("unterminated {what}")));
                }
                Some(&b'\\') if backslash_escapes => i += 2,
                Some(&b) if b == quote => {
                    if self.src.get(i + 1) == Some(&quote) {
                        i += 2;
                    } else {
                        break;
                    }
                }
                Some(_) => i += 1,
            }
        }
        let len = i + 1 - self.pos;
        self.advance_copy(len);
        Ok(())
    }

    fn copy_dollar_quoted(&mut self) -> Result<(), ImportError> {
        let rest = &self.src[self.pos + 1..];
        let tag_len = rest
            .iter()
            .position(|&b| !(b.is_ascii_alphanumeric() || b == b'_'))
            .unwrap_or(rest.len());
        let is_tag = rest.get(tag_len) == Some(&b'$')
            && rest.first().is_none_or(|b| !b.is_ascii_digit());
        if !is_tag {
            self.advance_copy(1);
            return Ok(());
        }

        let start_line = self.line;
        let opener = self.src[self.pos..self.pos + tag_len + 2].to_vec();
        let body = &self.src[self.pos + opener.len()..];
        let Some(close) = body
            .windows(opener.len())
            .position(|window| window == opener.as_slice())
        else {
            return Err(ImportError::new(start_line, "unterminated dollar-quoted string"));
        };
        let len = opener.len() * 2 + close;
        self.advance_copy(len);
        Ok(())
    }

    fn change_delimiter(&mut self) -> Result<(), ImportError> {
        let start = self.pos + "DELIMITER".len();
        let rest = &self.src[start..];
        let len = rest.iter().position(|&b| b == b'\n').unwrap_or(rest.len());
        let delimiter: Vec<u8> = rest[..len].trim_ascii().to_vec();
        if delimiter.is_empty() {
            return Err(ImportError::new(self.line, "DELIMITER without a delimiter"));
        }
        self.delimiter = delimiter;
        self.advance_skip("DELIMITER".len() + len);
        Ok(())
    }

    fn finish_statement(&mut self) {
        let text = String::from_utf8_lossy(&self.current).trim().to_string();
        self.current.clear();
        if !text.is_empty() {
            self.statements.push(Statement {
                text,
                line: self.current_line,
            });
        }
    }
}
