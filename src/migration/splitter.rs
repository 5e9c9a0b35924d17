use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::{single_line, truncate_with_suffix};

/// Linha que separa as seções dos scripts de migração
pub const DEFAULT_SECTION_DELIMITER: &str = "-- =====================================================";

/// Como um script é dividido em unidades de execução
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// Um statement por `;` (fora de strings, comentários e corpos `$$`)
    #[default]
    Statements,
    /// Uma unidade por seção entre linhas delimitadoras
    Sections,
    /// O script inteiro em uma única chamada
    Whole,
}

impl SplitMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SplitMode::Statements => "statements",
            SplitMode::Sections => "sections",
            SplitMode::Whole => "whole",
        }
    }
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SplitMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "statements" | "statement" => Ok(SplitMode::Statements),
            "sections" | "section" => Ok(SplitMode::Sections),
            "whole" | "file" => Ok(SplitMode::Whole),
            other => Err(format!(
                "Invalid split mode '{}' (expected statements, sections or whole)",
                other
            )),
        }
    }
}

/// Unidade de execução extraída de um script
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Statement {
    /// Posição no script, a partir de 1
    pub index: usize,
    /// Linha do primeiro token SQL, a partir de 1
    pub line: usize,
    pub sql: String,
}

impl Statement {
    /// SQL em uma linha, truncado para logs
    pub fn preview(&self, max_bytes: usize) -> String {
        truncate_with_suffix(&single_line(&self.sql), max_bytes, "...")
    }
}

/// Divide o script conforme o modo escolhido
pub fn split(sql: &str, mode: SplitMode, section_delimiter: &str) -> Vec<Statement> {
    match mode {
        SplitMode::Statements => split_statements(sql),
        SplitMode::Sections => split_sections(sql, section_delimiter),
        SplitMode::Whole => whole(sql),
    }
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Code,
    SingleQuote,
    /// `E'...'`; o booleano indica um `\` pendente
    EscapeString(bool),
    DoubleQuote,
    LineComment,
    BlockComment(usize),
    Dollar(String),
}

/// Divide em statements terminados por `;`
///
/// Ignora `;` dentro de `'strings'`, `"identificadores"`, comentários `--` e
/// `/* */` (aninhados) e corpos `$$ ... $$` / `$tag$ ... $tag$`, então blocos
/// `DO $$ ... $$;` e funções PL/pgSQL chegam inteiros ao servidor.
///
/// Segmentos só com comentários ou espaços são descartados. O último
/// statement, se não terminar em `;`, recebe um.
pub fn split_statements(sql: &str) -> Vec<Statement> {
    scan(sql).statements
}

struct Scan {
    statements: Vec<Statement>,
    /// Por linha (posição 0 = linha 1): começa fora de strings, comentários e corpos `$$`
    code_lines: Vec<bool>,
}

fn scan(sql: &str) -> Scan {
    let bytes = sql.as_bytes();
    let mut statements = Vec::new();
    let mut code_lines = vec![true];
    let mut state = State::Code;
    let mut line = 1;

    // Início do primeiro token SQL do segmento atual e sua linha
    let mut code_start: Option<(usize, usize)> = None;

    let mut i = 0;
    while i < bytes.len() {
        let byte = bytes[i];
        let next = bytes.get(i + 1).copied();

        match &state {
            State::Code => match byte {
                b'-' if next == Some(b'-') => {
                    state = State::LineComment;
                    i += 2;
                    continue;
                }
                b'/' if next == Some(b'*') => {
                    state = State::BlockComment(1);
                    i += 2;
                    continue;
                }
                b';' => {
                    if let Some((start, first_line)) = code_start.take() {
                        statements.push(Statement {
                            index: statements.len() + 1,
                            line: first_line,
                            sql: sql[start..=i].trim_end().to_string(),
                        });
                    }
                }
                _ if byte.is_ascii_whitespace() => {}
                _ => {
                    if code_start.is_none() {
                        code_start = Some((i, line));
                    }

                    match byte {
                        b'\'' if escape_string_at(bytes, i) => state = State::EscapeString(false),
                        b'\'' => state = State::SingleQuote,
                        b'"' => state = State::DoubleQuote,
                        b'$' => {
                            if let Some(tag) = dollar_tag_at(bytes, i) {
                                i += tag.len();
                                state = State::Dollar(tag);
                                continue;
                            }
                        }
                        _ => {}
                    }
                }
            },
            State::SingleQuote => {
                if byte == b'\'' {
                    if next == Some(b'\'') {
                        i += 2;
                        continue;
                    }
                    state = State::Code;
                }
            }
            State::EscapeString(true) => state = State::EscapeString(false),
            State::EscapeString(false) => {
                if byte == b'\\' {
                    state = State::EscapeString(true);
                } else if byte == b'\'' {
                    if next == Some(b'\'') {
                        i += 2;
                        continue;
                    }
                    state = State::Code;
                }
            }
            State::DoubleQuote => {
                if byte == b'"' {
                    if next == Some(b'"') {
                        i += 2;
                        continue;
                    }
                    state = State::Code;
                }
            }
            State::LineComment => {
                if byte == b'\n' {
                    state = State::Code;
                }
            }
            State::BlockComment(depth) => {
                let depth = *depth;
                if byte == b'/' && next == Some(b'*') {
                    state = State::BlockComment(depth + 1);
                    i += 2;
                    continue;
                }
                if byte == b'*' && next == Some(b'/') {
                    state = if depth <= 1 { State::Code } else { State::BlockComment(depth - 1) };
                    i += 2;
                    continue;
                }
            }
            State::Dollar(tag) => {
                if bytes[i..].starts_with(tag.as_bytes()) {
                    i += tag.len();
                    state = State::Code;
                    continue;
                }
            }
        }

        if byte == b'\n' {
            line += 1;
            code_lines.push(state == State::Code);
        }
        i += 1;
    }

    if let Some((start, first_line)) = code_start {
        let rest = sql[start..].trim_end();
        // Um `;` no fim de um comentário de linha seria ignorado pelo servidor
        let sql = if state == State::LineComment {
            format!("{}\n;", rest)
        } else {
            format!("{};", rest)
        };
        statements.push(Statement {
            index: statements.len() + 1,
            line: first_line,
            sql,
        });
    }

    Scan { statements, code_lines }
}

/// `'` em `pos` abre uma string `E'...'` (com escapes `\`)
fn escape_string_at(bytes: &[u8], pos: usize) -> bool {
    if pos == 0 || !matches!(bytes[pos - 1], b'E' | b'e') {
        return false;
    }
    // `nome'...'` não é prefixo E
    pos < 2 || !is_identifier_byte(bytes[pos - 2])
}

fn is_identifier_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

/// Tag `$$` ou `$nome$` começando em `pos`, se houver
///
/// `$1` (parâmetro posicional) e `a$b` (identificador com `$`) não abrem
/// um corpo.
fn dollar_tag_at(bytes: &[u8], pos: usize) -> Option<String> {
    if pos > 0 && is_identifier_byte(bytes[pos - 1]) {
        return None;
    }

    let mut end = pos + 1;
    while end < bytes.len() {
        let byte = bytes[end];
        if byte == b'$' {
            let tag = &bytes[pos..=end];
            return std::str::from_utf8(tag).ok().map(str::to_string);
        }
        let valid = if end == pos + 1 {
            byte.is_ascii_alphabetic() || byte == b'_'
        } else {
            byte.is_ascii_alphanumeric() || byte == b'_'
        };
        if !valid {
            return None;
        }
        end += 1;
    }
    None
}

/// Divide nas linhas delimitadoras; cada seção vira uma unidade
///
/// Seções sem SQL (só o título em comentário, por exemplo) são descartadas.
/// Uma linha igual ao delimitador dentro de um corpo `$$`, string ou
/// comentário de bloco não corta a seção.
pub fn split_sections(sql: &str, delimiter: &str) -> Vec<Statement> {
    let delimiter = match delimiter.trim() {
        "" => DEFAULT_SECTION_DELIMITER,
        other => other,
    };
    let code_lines = scan(sql).code_lines;

    let mut sections: Vec<(usize, String)> = Vec::new();
    let mut current = String::new();
    let mut current_start = 1;

    for (number, text) in sql.lines().enumerate() {
        let in_code = code_lines.get(number).copied().unwrap_or(true);
        if in_code && text.trim_start().starts_with(delimiter) {
            sections.push((current_start, std::mem::take(&mut current)));
            current_start = number + 2;
            continue;
        }
        current.push_str(text);
        current.push('\n');
    }
    sections.push((current_start, current));

    sections
        .into_iter()
        .filter_map(|(start_line, text)| {
            let first = split_statements(&text).into_iter().next()?;
            Some((start_line + first.line - 1, text.trim().to_string()))
        })
        .enumerate()
        .map(|(pos, (line, sql))| Statement {
            index: pos + 1,
            line,
            sql,
        })
        .collect()
}

/// O script inteiro como uma unidade (nenhuma, se só houver comentários)
pub fn whole(sql: &str) -> Vec<Statement> {
    match split_statements(sql).first() {
        Some(first) => vec![Statement {
            index: 1,
            line: first.line,
            sql: sql.trim().to_string(),
        }],
        None => Vec::new(),
    }
}
