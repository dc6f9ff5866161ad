//! Notarius command line tool

mod commands;
mod error;
mod settings;

use clap::{Parser, Subcommand};
use error::CliResult;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "notarius")]
#[command(about = "Notarius - signed envelopes, attestations and notarization")]
#[command(version)]
struct Cli {
    /// Trust policy file (TOML)
    #[arg(short, long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new P-384 signing key
    Generate {
        /// Key name, used for the output file names
        #[arg(short, long)]
        name: String,

        /// Output directory
        #[arg(short, long)]
        output: Option<String>,

        /// Environment variable holding the passphrase for the private key
        #[arg(long)]
        passphrase_env: Option<String>,
    },

    /// Create a document or contract envelope over a file, or co-sign one
    Sign {
        /// File to commit to
        #[arg(short, long, conflicts_with = "envelope")]
        file: Option<String>,

        /// Existing signed envelope to add a signature to
        #[arg(short, long)]
        envelope: Option<String>,

        /// Private key file (PKCS#8 PEM)
        #[arg(short, long)]
        key: String,

        /// Environment variable holding the key passphrase
        #[arg(long)]
        passphrase_env: Option<String>,

        /// Signer domain identity
        #[arg(short, long)]
        identity: String,

        /// Envelope type: document or contract
        #[arg(short = 't', long = "type", default_value = "document")]
        envelope_type: String,

        /// Envelope subtype, e.g. the file format
        #[arg(short, long, default_value = "file")]
        subtype: String,

        /// Output file for the signed envelope
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Seal a signed document or contract as the notary
    Notarize {
        #[arg(short, long)]
        envelope: String,

        /// Notary private key file
        #[arg(short, long)]
        key: String,

        #[arg(long)]
        passphrase_env: Option<String>,

        #[arg(short, long)]
        output: Option<String>,
    },

    /// Verify every signature of an envelope
    Verify {
        #[arg(short, long)]
        envelope: String,

        /// Original content to check against the envelope digest
        #[arg(long)]
        content: Option<String>,
    },

    /// Issue an attestation as the authority
    Attest {
        /// Authority private key file
        #[arg(short, long)]
        key: String,

        #[arg(long)]
        passphrase_env: Option<String>,

        /// Subject domain identity
        #[arg(short, long, required_unless_present = "request")]
        subject: Option<String>,

        /// Claim name, e.g. LegalName or Birthdate
        #[arg(long, required_unless_present = "request")]
        claim: Option<String>,

        /// Claim value; JSON object for ResidentialAddress, YYYY-MM-DD for Birthdate
        #[arg(long)]
        value: Option<String>,

        /// Full legal name a SubsetLegalName is checked against
        #[arg(long)]
        legal_name: Option<String>,

        /// Attestation request to issue from, instead of a single claim
        #[arg(short, long, conflicts_with_all = ["subject", "claim"])]
        request: Option<String>,

        /// Output file, or directory when issuing from a request
        #[arg(short, long)]
        output: Option<String>,
    },

    /// Create a signed request or instruction
    Request {
        #[arg(short, long)]
        key: String,

        #[arg(long)]
        passphrase_env: Option<String>,

        /// Requester domain identity
        #[arg(short, long)]
        identity: String,

        /// request or instruction
        #[arg(short = 't', long = "type", default_value = "instruction")]
        envelope_type: String,

        #[arg(short, long, default_value = "attestation")]
        subtype: String,

        /// Request data as a JSON object
        #[arg(short, long)]
        data: Option<String>,

        #[arg(short, long)]
        output: Option<String>,
    },

    /// Verify a received request: signatures, content, type and freshness
    CheckRequest {
        #[arg(short, long)]
        envelope: String,

        #[arg(short = 't', long = "type", default_value = "instruction")]
        envelope_type: String,

        #[arg(short, long, default_value = "attestation")]
        subtype: String,
    },
}

fn main() -> CliResult<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.config.as_deref();

    match cli.command {
        Commands::Generate {
            name,
            output,
            passphrase_env,
        } => {
            commands::generate::handle(name, output, passphrase_env)?;
        }
        Commands::Sign {
            file,
            envelope,
            key,
            passphrase_env,
            identity,
            envelope_type,
            subtype,
            output,
        } => {
            commands::sign::handle(commands::sign::SignArgs {
                file,
                envelope,
                key,
                passphrase_env,
                identity,
                envelope_type,
                sub_type: subtype,
                output,
            })?;
        }
        Commands::Notarize {
            envelope,
            key,
            passphrase_env,
            output,
        } => {
            commands::notarize::handle(config, envelope, key, passphrase_env, output)?;
        }
        Commands::Verify { envelope, content } => {
            commands::verify::handle(envelope, content)?;
        }
        Commands::Attest {
            key,
            passphrase_env,
            subject,
            claim,
            value,
            legal_name,
            request,
            output,
        } => {
            commands::attest::handle(
                config,
                commands::attest::AttestArgs {
                    key,
                    passphrase_env,
                    subject,
                    claim,
                    value,
                    legal_name,
                    request,
                    output,
                },
            )?;
        }
        Commands::Request {
            key,
            passphrase_env,
            identity,
            envelope_type,
            subtype,
            data,
            output,
        } => {
            commands::request::handle(
                config,
                commands::request::RequestArgs {
                    key,
                    passphrase_env,
                    identity,
                    envelope_type,
                    sub_type: subtype,
                    data,
                    output,
                },
            )?;
        }
        Commands::CheckRequest {
            envelope,
            envelope_type,
            subtype,
        } => {
            commands::check_request::handle(config, envelope, envelope_type, subtype)?;
        }
    }

    Ok(())
}
