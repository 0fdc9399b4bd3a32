// Recursive descent SQL parser.
//
// Tokenizes the whole input first, then applies one parse function per
// statement kind. The accepted grammar is deliberately tiny:
//
//   CREATE TABLE name (col type, ...);
//   CREATE INDEX name ON table (column);
//   INSERT INTO name VALUES (v, ...);
//   SELECT * | col, ... FROM name [WHERE col = literal];
//
// The trailing semicolon is optional.

use crate::ast::*;
use crate::catalog::{Column, ColumnType};
use crate::error::{DbError, Result};
use crate::tokenizer::{Token, Tokenizer};
use crate::types::Value;

/// Parse a SQL string into a Statement.
pub fn parse(sql: &str) -> Result<Statement> {
    let tokens = Tokenizer::new(sql).tokenize()?;
    let mut parser = Parser { tokens, pos: 0 };
    let stmt = parser.parse_statement()?;
    parser.eat_if(&Token::Semicolon);
    parser.expect(&Token::Eof)?;
    Ok(stmt)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn current(&self) -> &Token {
        // tokenize() always terminates the stream with Eof.
        self.tokens.get(self.pos).unwrap_or(&Token::Eof)
    }

    fn advance(&mut self) -> Token {
        let token = self.current().clone();
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
        token
    }

    fn expect(&mut self, expected: &Token) -> Result<()> {
        if self.current() == expected {
            self.advance();
            Ok(())
        } else {
            Err(DbError::Parse(format!(
                "expected {:?}, got {:?}",
                expected,
                self.current()
            )))
        }
    }

    fn eat_if(&mut self, token: &Token) -> bool {
        if self.current() == token {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_ident(&mut self, what: &str) -> Result<String> {
        match self.advance() {
            Token::Ident(name) => Ok(name),
            other => Err(DbError::Parse(format!("expected {what}, got {other:?}"))),
        }
    }

    fn parse_statement(&mut self) -> Result<Statement> {
        match self.current() {
            Token::Create => self.parse_create(),
            Token::Insert => self.parse_insert().map(Statement::Insert),
            Token::Select => self.parse_select().map(Statement::Select),
            other => Err(DbError::Parse(format!("unexpected token: {other:?}"))),
        }
    }

    fn parse_create(&mut self) -> Result<Statement> {
        self.expect(&Token::Create)?;
        match self.advance() {
            Token::Table => self.parse_create_table().map(Statement::CreateTable),
            Token::Index => self.parse_create_index().map(Statement::CreateIndex),
            other => Err(DbError::Parse(format!(
                "expected TABLE or INDEX after CREATE, got {other:?}"
            ))),
        }
    }

    fn parse_create_table(&mut self) -> Result<CreateTableStmt> {
        let name = self.expect_ident("table name")?;
        self.expect(&Token::LeftParen)?;

        let mut columns = Vec::new();
        loop {
            let col_name = self.expect_ident("column name")?;
            let column_type = match self.advance() {
                Token::Int => ColumnType::Int,
                Token::Text => ColumnType::Text,
                other => {
                    return Err(DbError::Parse(format!(
                        "expected column type, got {other:?}"
                    )));
                }
            };
            columns.push(Column::new(col_name, column_type));

            if self.eat_if(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RightParen)?;
            break;
        }

        Ok(CreateTableStmt { name, columns })
    }

    fn parse_create_index(&mut self) -> Result<CreateIndexStmt> {
        let name = self.expect_ident("index name")?;
        self.expect(&Token::On)?;
        let table = self.expect_ident("table name")?;
        self.expect(&Token::LeftParen)?;
        let column = self.expect_ident("column name")?;
        self.expect(&Token::RightParen)?;
        Ok(CreateIndexStmt {
            name,
            table,
            column,
        })
    }

    fn parse_insert(&mut self) -> Result<InsertStmt> {
        self.expect(&Token::Insert)?;
        self.expect(&Token::Into)?;
        let table = self.expect_ident("table name")?;
        self.expect(&Token::Values)?;
        self.expect(&Token::LeftParen)?;

        let mut values = Vec::new();
        loop {
            values.push(self.parse_literal()?);
            if self.eat_if(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RightParen)?;
            break;
        }

        Ok(InsertStmt { table, values })
    }

    fn parse_select(&mut self) -> Result<SelectStmt> {
        self.expect(&Token::Select)?;

        let columns = if self.eat_if(&Token::Star) {
            vec!["*".to_string()]
        } else {
            let mut cols = vec![self.expect_ident("column name")?];
            while self.eat_if(&Token::Comma) {
                cols.push(self.expect_ident("column name")?);
            }
            cols
        };

        self.expect(&Token::From)?;
        let table = self.expect_ident("table name")?;

        let where_clause = if self.eat_if(&Token::Where) {
            let column = self.expect_ident("column name")?;
            self.expect(&Token::Eq)?;
            let value = self.parse_literal()?;
            Some(Condition { column, value })
        } else {
            None
        };

        Ok(SelectStmt {
            table,
            columns,
            where_clause,
        })
    }

    fn parse_literal(&mut self) -> Result<Value> {
        match self.advance() {
            Token::IntLiteral(i) => Ok(Value::Int(i)),
            Token::StringLiteral(s) => Ok(Value::Text(s)),
            other => Err(DbError::Parse(format!("expected literal, got {other:?}"))),
        }
    }
}
