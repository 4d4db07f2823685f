use reqwest::StatusCode;
use serde::Deserialize;

use crate::storage::StoreError;

/// Error body the backend attaches to rejected requests.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error message
    #[serde(default)]
    pub message: Option<String>,
    /// Some endpoints use `error` instead of `message`
    #[serde(default)]
    pub error: Option<String>,
}

impl ErrorResponse {
    pub fn into_message(self) -> Option<String> {
        self.message.or(self.error).filter(|m| !m.trim().is_empty())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Rejected by server: {0}")]
    Rejected(String),

    #[error("Server error: HTTP {0}")]
    Server(StatusCode),

    #[error("Unexpected response shape: {0}")]
    DataShape(String),

    #[error("No default preset configured")]
    NoDefaultPreset,

    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("Storage error: {0}")]
    Storage(#[from] StoreError),
}

impl AppError {
    /// Whether this error means the stored credential is no longer accepted.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, AppError::Unauthorized(_))
    }

    /// Inline message shown to the user in place of the failed view.
    pub fn user_message(&self) -> String {
        match self {
            AppError::Network(_) => {
                "Não foi possível conectar ao servidor. Tente novamente mais tarde.".to_string()
            }
            AppError::Unauthorized(_) => {
                "Sessão expirada. Por favor, faça login novamente.".to_string()
            }
            AppError::NotAuthenticated => {
                "Usuário não autenticado. Por favor, faça login.".to_string()
            }
            AppError::NotFound(what) => format!("Não encontrado: {}", what),
            AppError::Validation(msg) | AppError::Rejected(msg) => msg.clone(),
            AppError::Server(_) => "Erro no servidor. Tente novamente mais tarde.".to_string(),
            AppError::DataShape(_) => "Resposta inesperada do servidor.".to_string(),
            AppError::NoDefaultPreset => "Nenhum preset padrão encontrado. Por favor, crie um \
                                          nas configurações de preset."
                .to_string(),
            AppError::Storage(err) => {
                tracing::error!("Storage error: {:?}", err);
                "Falha ao acessar o armazenamento local.".to_string()
            }
        }
    }
}

impl From<reqwest::Error> for AppError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AppError::DataShape(format!("response body could not be decoded: {}", err))
        } else {
            AppError::Network(err.to_string())
        }
    }
}
