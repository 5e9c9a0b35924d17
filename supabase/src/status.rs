//! Classificação de respostas pelo status HTTP

use serde::Serialize;

/// Status tratados como "falha esperada" em testes de RLS e validação
pub const EXPECTED_FAILURE_CODES: [u16; 4] = [400, 401, 403, 422];

/// Classe de uma resposta HTTP
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusClass {
    /// 2xx
    Success,
    /// 400, 401, 403 ou 422: a API recusou a operação de forma controlada
    ExpectedFailure,
    /// Qualquer outro código
    Unexpected,
}

impl StatusClass {
    pub fn from_status(status: u16) -> Self {
        if (200..300).contains(&status) {
            StatusClass::Success
        } else if EXPECTED_FAILURE_CODES.contains(&status) {
            StatusClass::ExpectedFailure
        } else {
            StatusClass::Unexpected
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, StatusClass::Success)
    }
}
