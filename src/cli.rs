//! Interface de linha de comando do jobkeeper baseada em clap.
//!
//! Define a struct [`Cli`] com subcomandos [`Command`] (reconcile, stats,
//! detect, detect-change) e flags globais (--config, --verbose).

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// jobkeeper: limpeza de órfãos, notificações de conclusão e estatísticas de jobs.
#[derive(Debug, Parser)]
#[command(name = "jobkeeper", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Caminho do arquivo de configuração (padrão: ./jobkeeper.toml).
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Habilita logs de depuração (verbose).
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Remove objetos armazenados cujo job não existe mais no registro.
    Reconcile {
        /// Substitui o prefixo de objetos configurado.
        #[arg(long)]
        prefix: Option<String>,

        /// Lista os órfãos sem removê-los.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
    },

    /// Conta os jobs por status.
    Stats,

    /// Decide se uma mudança de status merece uma notificação.
    Detect {
        #[arg(long)]
        job_id: String,

        /// Status anterior; omita quando o job acabou de ser criado.
        #[arg(long)]
        old: Option<String>,

        /// Status após a mudança.
        #[arg(long)]
        new: Option<String>,

        #[arg(long)]
        filename: Option<String>,

        /// Entrega o evento resultante aos destinos configurados.
        #[arg(long, default_value_t = false)]
        notify: bool,
    },

    /// Como `detect`, lendo um documento JSON de mudança (`-` para stdin).
    DetectChange {
        #[arg(long)]
        file: String,

        #[arg(long, default_value_t = false)]
        notify: bool,
    },
}

impl Command {
    /// Indica se o subcomando precisa do arquivo de configuração.
    ///
    /// A detecção pura não depende dele; só a entrega (`--notify`) depende.
    pub fn needs_config(&self) -> bool {
        match self {
            Command::Reconcile { .. } | Command::Stats => true,
            Command::Detect { notify, .. } | Command::DetectChange { notify, .. } => *notify,
        }
    }
}
