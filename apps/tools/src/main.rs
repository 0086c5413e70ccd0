use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use identity::{mint_token, TokenConfig};
use shared::domain::{Organization, OrganizationId, UserId, UserProfile};
use storage::{Storage, UserDirectory};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

#[derive(Parser, Debug)]
struct Cli {
    #[arg(long, env = "DATA_DIR", default_value = "./data")]
    data_dir: String,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    CreateUser {
        username: String,
        first_name: String,
        last_name: String,
    },
    CreateOrganization {
        owner_user_id: Uuid,
        name: String,
    },
    MintToken {
        user_id: Uuid,
        #[arg(long, env = "JWT_SECRET")]
        secret: String,
        #[arg(long, default_value_t = 3600)]
        ttl_seconds: i64,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let storage = Storage::open(&cli.data_dir).await?;

    match cli.command {
        Command::CreateUser {
            username,
            first_name,
            last_name,
        } => {
            let mut users = storage.load_users().await?;
            if users.iter().any(|u| u.username == username) {
                bail!("username '{username}' is already taken");
            }
            let user = UserProfile {
                id: UserId::new(),
                username,
                first_name,
                last_name,
            };
            let user_id = user.id;
            users.push(user);
            storage.save_users(&users).await?;
            println!("created user_id={user_id}");
        }
        Command::CreateOrganization {
            owner_user_id,
            name,
        } => {
            let owner = UserId(owner_user_id);
            if storage.find_user(owner).await?.is_none() {
                bail!("no user with id {owner}");
            }
            let mut organizations = storage.load_organizations().await?;
            let organization = Organization {
                id: OrganizationId::new(),
                name,
                user_id: owner,
            };
            let organization_id = organization.id;
            organizations.push(organization);
            storage.save_organizations(&organizations).await?;
            println!("created organization_id={organization_id}");
        }
        Command::MintToken {
            user_id,
            secret,
            ttl_seconds,
        } => {
            if secret.trim().is_empty() {
                bail!("a non-empty secret is required");
            }
            let user_id = UserId(user_id);
            let Some(user) = storage.find_user(user_id).await? else {
                bail!("no user with id {user_id}");
            };
            let cfg = TokenConfig {
                secret,
                ttl_seconds,
            };
            println!("{}", mint_token(&cfg, user_id, Some(&user.username))?);
        }
    }

    Ok(())
}
