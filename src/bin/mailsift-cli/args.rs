use std::path::PathBuf;
use std::time::Duration;

use clap::{ArgAction, Parser};
use mailsift_lib::{MethodChoice, ValidationConfig, ValidationMethod, VerifierIdentity};

#[derive(Parser, Debug)]
#[command(
    name = "mailsift-cli",
    version,
    about = "Vérifie une liste d'adresses e-mail (syntaxe, MX, sonde SMTP)",
    after_help = "Exemples:\n  mailsift-cli -i adresses.txt -f gophish -o valides.csv\n  cat adresses.txt | mailsift-cli -m regex"
)]
pub struct Cli {
    /// adresses à vérifier (en plus de -i / stdin)
    pub emails: Vec<String>,

    /// fichier d'entrée (adresses séparées par des blancs); stdin si absent et pipé
    #[arg(short = 'i', long)]
    pub input: Option<PathBuf>,

    /// fichier de sortie des adresses valides (rien n'est écrit sans)
    #[arg(short = 'o', long)]
    pub output: Option<PathBuf>,

    /// format de sortie: list|gophish|json
    #[arg(short = 'f', long, default_value = "list")]
    pub format: String,

    /// méthode: regex|mx|smtp (inconnue -> smtp)
    #[arg(short = 'm', long, default_value = "smtp")]
    pub method: String,

    /// adresse utilisée pour MAIL FROM
    #[arg(long, default_value = "verifier@example.com")]
    pub verifier_email: String,

    /// domaine annoncé en EHLO/HELO
    #[arg(long, default_value = "example.com")]
    pub verifier_domain: String,

    /// tentatives par serveur (et par requête DNS)
    #[arg(long, default_value_t = 2)]
    pub attempts: u32,

    /// essaie les autres MX après un rejet permanent
    #[arg(long)]
    pub no_fail_fast: bool,

    /// désactive la détection des domaines catch-all
    #[arg(short = 'd', long)]
    pub disable_wildcard: bool,

    /// ne croit un 5xx que s'il désigne la boîte (550 user unknown, 5.1.1)
    #[arg(long)]
    pub safe_check: bool,

    /// port SMTP
    #[arg(long, default_value_t = 25)]
    pub port: u16,

    /// timeout connexion / lecture SMTP (ms)
    #[arg(long = "timeout-ms", default_value_t = 2_000)]
    pub timeout_ms: u64,

    /// timeout par requête DNS (ms)
    #[arg(long = "dns-timeout-ms", default_value_t = 2_000)]
    pub dns_timeout_ms: u64,

    /// nombre maximum de MX essayés
    #[arg(long, default_value_t = 5)]
    pub max_servers: usize,

    /// adresses vérifiées en parallèle
    #[arg(long, default_value_t = 1)]
    pub workers: usize,

    /// -v: diagnostics par adresse, -vv: logs de debug
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    pub fn parse() -> Self {
        <Self as Parser>::parse()
    }

    pub fn clap_command() -> clap::Command {
        <Self as clap::CommandFactory>::command()
    }

    pub fn method_choice(&self) -> MethodChoice {
        ValidationMethod::parse_with_fallback(&self.method)
    }

    pub fn to_config(&self, method: ValidationMethod) -> ValidationConfig {
        let timeout = Duration::from_millis(self.timeout_ms);
        ValidationConfig {
            method,
            verifier: VerifierIdentity::new(&self.verifier_email, &self.verifier_domain),
            connection_attempts: self.attempts,
            fail_fast: !self.no_fail_fast,
            wildcard_detection: !self.disable_wildcard,
            safe_check: self.safe_check,
            smtp_port: self.port,
            connect_timeout: timeout,
            response_timeout: timeout,
            dns_timeout: Duration::from_millis(self.dns_timeout_ms),
            max_servers: self.max_servers,
            workers: self.workers,
        }
    }
}
