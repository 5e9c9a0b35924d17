/// Utilitários para manipulação segura de strings UTF-8

/// Trunca uma string de forma segura, garantindo que o índice não corte no meio de um caractere UTF-8
///
/// # Exemplo
/// ```
/// use vbsolution_ops::utils::string_utils::truncate_safe;
///
/// let sql = "INSERT INTO produtos (nome) VALUES ('Café');";
/// assert_eq!(truncate_safe(sql, 6), "INSERT");
/// ```
pub fn truncate_safe(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }

    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }

    &s[..end]
}

/// Trunca uma string e adiciona um sufixo (como "...") de forma segura
pub fn truncate_with_suffix(s: &str, max_bytes: usize, suffix: &str) -> String {
    let truncated = truncate_safe(s, max_bytes);
    if truncated.len() < s.len() {
        format!("{}{}", truncated, suffix)
    } else {
        truncated.to_string()
    }
}

/// Colapsa qualquer sequência de espaços/quebras de linha em um único espaço
pub fn single_line(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}
