use thiserror::Error;

#[derive(Debug, Error)]
pub enum DashError {
    #[error("Connexion au moteur de recherche impossible: {0}")]
    Connection(String),

    /// `name` is the query name once dispatch has tagged it, the index alias
    /// when the error comes straight from a backend.
    #[error("Échec de la requête {name}: {message}")]
    QueryExecution { name: String, message: String },

    #[error("Nombre de réponses incohérent: {expected} attendues, {actual} reçues")]
    ResponseCountMismatch { expected: usize, actual: usize },

    #[error("Erreur de sérialisation: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Réponse mal formée: {0}")]
    MalformedResponse(String),

    #[error("Paramètre invalide: {0}")]
    InvalidParameter(String),

    #[error("Erreur HTTP: {0}")]
    Http(#[from] reqwest::Error),
}

pub type Result<T> = std::result::Result<T, DashError>;

impl DashError {
    /// Tags a query failure with the caller's query name; the alias the
    /// backend reported moves into the message.
    pub(crate) fn for_query(self, query: &str) -> Self {
        match self {
            DashError::QueryExecution { name, message } if name != query => {
                DashError::QueryExecution {
                    name: query.to_string(),
                    message: format!("{} ({})", message, name),
                }
            }
            other => other,
        }
    }
}

impl serde::Serialize for DashError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
