//! Tessera CLI - hybrid post-quantum sealing and signing
//!
//! Usage:
//!   tessera self-test   - Self-test every compiled tier
//!   tessera keygen      - Generate a key pair
//!   tessera seal        - Seal a file for a recipient
//!   tessera open        - Open a sealed envelope
//!   tessera sign        - Sign a file
//!   tessera verify      - Verify a detached signature
//!
//! Keys are JSON (`<name>.key` holds the pair, `<name>.pub` the public half).
//! Envelopes use the binary wire format.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use tessera_crypto::{
    provider_for, provider_for_suite, CryptoPolicy, CryptoProvider, KeyMaterial, KeyPair, KeyRole, KeyUsage,
    ProviderTier, SealedEnvelope, SigningKeyHandle, TierGovernor,
};
use tracing::debug;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "tessera")]
#[command(version)]
#[command(about = "Hybrid post-quantum sealing and signing", long_about = None)]
struct Cli {
    /// Policy file (JSON)
    #[arg(long, global = true)]
    policy: Option<PathBuf>,

    /// Use this tier instead of the governor's choice
    #[arg(long, global = true, value_enum)]
    tier: Option<TierArg>,

    /// Use X-Wing on the native tier
    #[arg(long, global = true)]
    hybrid: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum TierArg {
    Native,
    Software,
    Classic,
}

impl From<TierArg> for ProviderTier {
    fn from(tier: TierArg) -> Self {
        match tier {
            TierArg::Native => ProviderTier::NativePqc,
            TierArg::Software => ProviderTier::SoftwarePqc,
            TierArg::Classic => ProviderTier::Classic,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum UsageArg {
    Exchange,
    Signing,
}

impl From<UsageArg> for KeyUsage {
    fn from(usage: UsageArg) -> Self {
        match usage {
            UsageArg::Exchange => KeyUsage::KeyExchange,
            UsageArg::Signing => KeyUsage::Signing,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Run the self-test on every compiled tier
    SelfTest,

    /// Generate a key pair
    Keygen {
        #[arg(long, value_enum, default_value = "exchange")]
        usage: UsageArg,

        /// Writes <NAME>.key and <NAME>.pub
        name: PathBuf,
    },

    /// Seal a file for a recipient
    Seal {
        /// Recipient public key (.pub)
        #[arg(long)]
        recipient: PathBuf,

        /// Context string both sides must agree on
        #[arg(long, default_value = "")]
        context: String,

        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Open a sealed envelope
    Open {
        /// Recipient key pair (.key)
        #[arg(long)]
        key: PathBuf,

        #[arg(long, default_value = "")]
        context: String,

        input: PathBuf,

        /// Defaults to stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Sign a file
    Sign {
        /// Signing key pair (.key)
        #[arg(long)]
        key: PathBuf,

        input: PathBuf,

        #[arg(short, long)]
        output: PathBuf,
    },

    /// Verify a detached signature
    Verify {
        /// Signer public key (.pub)
        #[arg(long)]
        key: PathBuf,

        input: PathBuf,

        #[arg(long)]
        signature: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let policy = load_policy(cli.policy.as_deref(), cli.hybrid)?;
    let tier = cli.tier.map(ProviderTier::from);
    debug!(
        minimum_tier = %policy.minimum_tier,
        hybrid = policy.prefer_hybrid_kem,
        forced_tier = ?tier,
        "policy loaded"
    );

    match cli.command {
        Commands::SelfTest => self_test(policy).await?,

        Commands::Keygen { usage, name } => {
            let provider = select_provider(tier, &policy)?;
            let pair = provider.generate_key_pair(usage.into())?;

            let key_path = name.with_extension("key");
            let pub_path = name.with_extension("pub");
            write_file(&key_path, &serde_json::to_vec_pretty(&pair)?).await?;
            write_file(&pub_path, &serde_json::to_vec_pretty(pair.public())?).await?;

            let fingerprint = hex::encode(&pair.public().as_bytes()[..8]);
            println!("{} {} key ({})", pair.suite(), pair.usage(), provider.provider_name());
            println!("  private: {}", key_path.display());
            println!("  public:  {}  [{fingerprint}]", pub_path.display());
        }

        Commands::Seal {
            recipient,
            context,
            input,
            output,
        } => {
            let recipient = read_public_key(&recipient).await?;
            let provider = provider_for_key(tier, &recipient, &policy)?;
            let plaintext = read_file(&input).await?;

            let envelope = provider.seal_envelope(&plaintext, &recipient, context.as_bytes())?;
            write_file(&output, &envelope.to_bytes()?).await?;
            println!(
                "sealed {} bytes for {} ({})",
                plaintext.len(),
                recipient.suite(),
                if envelope.is_hpke() { "hpke" } else { "kem-dem" }
            );
        }

        Commands::Open {
            key,
            context,
            input,
            output,
        } => {
            let (_, private) = read_key_pair(&key).await?.into_parts();
            let provider = provider_for_key(tier, &private, &policy)?;
            let envelope = SealedEnvelope::from_bytes(&read_file(&input).await?)?;

            let plaintext = provider.open_envelope(&envelope, &private, context.as_bytes())?;
            match output {
                Some(path) => write_file(&path, &plaintext).await?,
                None => {
                    use tokio::io::AsyncWriteExt;
                    let mut stdout = tokio::io::stdout();
                    stdout.write_all(&plaintext).await?;
                    stdout.flush().await?;
                }
            }
        }

        Commands::Sign { key, input, output } => {
            let (_, private) = read_key_pair(&key).await?.into_parts();
            let provider = provider_for_key(tier, &private, &policy)?;
            let data = read_file(&input).await?;

            let signature = provider.sign(&data, SigningKeyHandle::Raw(private))?;
            write_file(&output, &signature).await?;
            println!("signed {} with {}", input.display(), provider.provider_name());
        }

        Commands::Verify { key, input, signature } => {
            let public = read_public_key(&key).await?;
            let provider = provider_for_key(tier, &public, &policy)?;
            let data = read_file(&input).await?;
            let signature = read_file(&signature).await?;

            if !provider.verify(&data, &signature, &public)? {
                bail!("signature does not verify");
            }
            println!("signature OK ({})", public.suite());
        }
    }

    Ok(())
}

fn load_policy(path: Option<&Path>, hybrid: bool) -> anyhow::Result<CryptoPolicy> {
    let mut policy = match path {
        Some(path) => CryptoPolicy::load(path)?,
        None => CryptoPolicy::default(),
    };
    if hybrid {
        policy.prefer_hybrid_kem = true;
    }
    Ok(policy)
}

fn select_provider(tier: Option<ProviderTier>, policy: &CryptoPolicy) -> anyhow::Result<Box<dyn CryptoProvider>> {
    let provider = match tier {
        Some(tier) => provider_for(tier, policy)?,
        None => TierGovernor::new(policy.clone()).activate()?,
    };
    Ok(provider)
}

/// The key's suite decides the provider unless a tier is forced.
fn provider_for_key(
    tier: Option<ProviderTier>,
    key: &KeyMaterial,
    policy: &CryptoPolicy,
) -> anyhow::Result<Box<dyn CryptoProvider>> {
    let Some(tier) = tier else {
        return Ok(provider_for_suite(key.suite(), policy)?);
    };
    let provider = provider_for(tier, policy)?;
    if provider.active_suite() != key.suite() {
        bail!(
            "{} key cannot be used with the {} tier ({})",
            key.suite(),
            tier,
            provider.active_suite()
        );
    }
    Ok(provider)
}

async fn self_test(policy: CryptoPolicy) -> anyhow::Result<()> {
    let mut checks = Vec::new();
    for tier in ProviderTier::BY_PREFERENCE {
        let policy = policy.clone();
        checks.push((
            tier,
            tokio::task::spawn_blocking(move || {
                provider_for(tier, &policy)
                    .ok()
                    .map(|provider| (provider.provider_name(), provider.active_suite(), provider.self_test()))
            }),
        ));
    }

    for (tier, check) in checks {
        match check.await? {
            Some((name, suite, true)) => println!("  {tier:<13} {name:<17} {suite:<22} ok"),
            Some((name, suite, false)) => println!("  {tier:<13} {name:<17} {suite:<22} FAILED"),
            None => println!("  {tier:<13} not compiled"),
        }
    }

    let (active, minimum) = tokio::task::spawn_blocking(move || {
        let governor = TierGovernor::new(policy);
        let minimum = governor.policy().minimum_tier;
        governor.activate().map(|provider| (provider, minimum))
    })
    .await??;
    println!();
    println!(
        "active: {} ({}), minimum tier {minimum}",
        active.provider_name(),
        active.active_suite()
    );
    Ok(())
}

async fn read_file(path: &Path) -> anyhow::Result<Vec<u8>> {
    tokio::fs::read(path)
        .await
        .with_context(|| format!("reading {}", path.display()))
}

async fn write_file(path: &Path, contents: &[u8]) -> anyhow::Result<()> {
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("writing {}", path.display()))
}

async fn read_key_pair(path: &Path) -> anyhow::Result<KeyPair> {
    let json = read_file(path).await?;
    let pair: KeyPair =
        serde_json::from_slice(&json).with_context(|| format!("{} is not a key pair", path.display()))?;
    pair.validate()?;
    Ok(pair)
}

async fn read_public_key(path: &Path) -> anyhow::Result<KeyMaterial> {
    let json = read_file(path).await?;
    let key: KeyMaterial =
        serde_json::from_slice(&json).with_context(|| format!("{} is not a key file", path.display()))?;
    if key.role() != KeyRole::Public {
        bail!("{} holds a private key; pass the .pub file", path.display());
    }
    Ok(key)
}
