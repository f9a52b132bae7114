//! Configuração do jobkeeper carregada a partir de `jobkeeper.toml`.
//!
//! A struct [`KeeperConfig`] contém todos os parâmetros configuráveis.
//! Valores não presentes no arquivo usam defaults sensíveis, então um arquivo
//! ausente equivale a [`KeeperConfig::default`]. As variáveis de ambiente têm
//! precedência sobre o arquivo para o token de acesso, o bucket e o projeto.

use std::path::Path;

use serde::Deserialize;

use crate::backend::firestore::FIRESTORE_URL;
use crate::backend::gcs::STORAGE_URL;
use crate::error::KeeperError;
use crate::reconcile::{DEFAULT_PREFIX, DEFAULT_SAMPLE_LIMIT, ReconcileOptions};

pub const DEFAULT_CONFIG_FILE: &str = "jobkeeper.toml";

/// Configuração de nível superior carregada de `jobkeeper.toml`.
#[derive(Debug, Clone, Deserialize)]
pub struct KeeperConfig {
    /// Bucket com os áudios gerados pelo pipeline.
    #[serde(default)]
    pub bucket: String,

    /// Prefixo (namespace) dos objetos de saída dos jobs.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Projeto dono do banco Firestore.
    #[serde(default)]
    pub project_id: String,

    /// Coleção do Firestore com um documento por job.
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Token OAuth (bearer); vazio significa sem autenticação (emuladores).
    #[serde(default)]
    pub access_token: String,

    #[serde(default = "default_storage_base_url")]
    pub storage_base_url: String,

    #[serde(default = "default_firestore_base_url")]
    pub firestore_base_url: String,

    /// URL que recebe as notificações via POST, se houver.
    #[serde(default)]
    pub webhook_url: Option<String>,

    /// Quantidade de chaves removidas listadas no resumo da reconciliação.
    #[serde(default = "default_sample_limit")]
    pub sample_limit: usize,

    /// Tamanho de página pedido às APIs de armazenamento e de registro.
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

// Valor padrão para o prefixo: "audiobooks/".
fn default_prefix() -> String {
    DEFAULT_PREFIX.to_string()
}

// Valor padrão para a coleção: "audiobook_jobs".
fn default_collection() -> String {
    "audiobook_jobs".to_string()
}

// Valor padrão para a URL do Cloud Storage: a API pública do Google.
fn default_storage_base_url() -> String {
    STORAGE_URL.to_string()
}

// Valor padrão para a URL do Firestore: a API pública do Google.
fn default_firestore_base_url() -> String {
    FIRESTORE_URL.to_string()
}

// Valor padrão para a amostra de chaves removidas: 10.
fn default_sample_limit() -> usize {
    DEFAULT_SAMPLE_LIMIT
}

// Valor padrão para o tamanho de página: 1000.
fn default_page_size() -> u32 {
    1000
}

impl Default for KeeperConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            prefix: default_prefix(),
            project_id: String::new(),
            collection: default_collection(),
            access_token: String::new(),
            storage_base_url: default_storage_base_url(),
            firestore_base_url: default_firestore_base_url(),
            webhook_url: None,
            sample_limit: default_sample_limit(),
            page_size: default_page_size(),
        }
    }
}

impl KeeperConfig {
    /// Carrega `path`, ou `jobkeeper.toml` no diretório atual quando nenhum
    /// caminho é informado. Só o arquivo implícito pode estar ausente.
    pub fn load(path: Option<&Path>) -> Result<Self, KeeperError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.exists() {
                    Self::from_file(path)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|name| std::env::var(name).ok());
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, KeeperError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(toml::from_str::<KeeperConfig>(&contents)?)
    }

    /// Aplica as variáveis de ambiente, lidas por `lookup`, sobre a configuração.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

        if let Some(token) =
            non_empty("JOBKEEPER_ACCESS_TOKEN").or_else(|| non_empty("GOOGLE_OAUTH_ACCESS_TOKEN"))
        {
            self.access_token = token;
        }
        if let Some(bucket) = non_empty("JOBKEEPER_BUCKET") {
            self.bucket = bucket;
        }
        if let Some(project) = non_empty("JOBKEEPER_PROJECT") {
            self.project_id = project;
        }
    }

    pub fn require_storage(&self) -> Result<(), KeeperError> {
        if self.bucket.trim().is_empty() {
            return Err(KeeperError::Config(
                "`bucket` is not set (config file or JOBKEEPER_BUCKET)".into(),
            ));
        }
        Ok(())
    }

    pub fn require_registry(&self) -> Result<(), KeeperError> {
        if self.project_id.trim().is_empty() {
            return Err(KeeperError::Config(
                "`project_id` is not set (config file or JOBKEEPER_PROJECT)".into(),
            ));
        }
        Ok(())
    }

    pub fn token(&self) -> Option<String> {
        Some(self.access_token.clone()).filter(|t| !t.is_empty())
    }

    pub fn reconcile_options(&self) -> ReconcileOptions {
        ReconcileOptions {
            prefix: self.prefix.clone(),
            sample_limit: self.sample_limit,
            dry_run: false,
        }
    }
}
